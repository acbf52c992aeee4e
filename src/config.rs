use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub smoothing: SmoothingConfig,
    #[serde(default)]
    pub retarget: RetargetConfig,
}

/// センサーの設置姿勢
#[derive(Debug, Clone, Deserialize)]
pub struct SensorConfig {
    /// 床からの高さ（メートル）
    #[serde(default = "default_height")]
    pub height: f32,
    /// センサー原点をワールドのどこに置くか（センサー直下の床基準）
    #[serde(default = "default_center")]
    pub center: [f32; 3],
    /// 注視点（center基準）
    #[serde(default = "default_look_at")]
    pub look_at: [f32; 4],
    /// 座標軸反転行列の対角成分
    #[serde(default = "default_flip")]
    pub flip: [f32; 3],
}

fn default_height() -> f32 { 0.8 }
fn default_center() -> [f32; 3] { [0.0, 0.0, 0.0] }
fn default_look_at() -> [f32; 4] { [0.0, 0.8, 2.0, 1.0] }
fn default_flip() -> [f32; 3] { [-1.0, 1.0, -1.0] }

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            height: default_height(),
            center: default_center(),
            look_at: default_look_at(),
            flip: default_flip(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    /// 実機
    Device,
    /// 録画ファイル再生
    Emulator,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_mode")]
    pub mode: FeedMode,
    /// 再生する録画ファイル
    #[serde(default = "default_playback_path")]
    pub playback_path: String,
    /// 再生時の1フレームの間隔（ミリ秒）
    #[serde(default = "default_playback_interval_ms")]
    pub playback_interval_ms: f32,
    /// 実機ポーリングのタイムアウト（ミリ秒）
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
}

fn default_mode() -> FeedMode { FeedMode::Emulator }
fn default_playback_path() -> String { "recordings/playback0.json".to_string() }
fn default_playback_interval_ms() -> f32 { 33.3 }
fn default_poll_timeout_ms() -> u64 { 100 }

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            playback_path: default_playback_path(),
            playback_interval_ms: default_playback_interval_ms(),
            poll_timeout_ms: default_poll_timeout_ms(),
        }
    }
}

/// 関節位置の二重指数平滑化パラメータ
#[derive(Debug, Clone, Deserialize)]
pub struct SmoothingConfig {
    #[serde(default = "default_smoothing_enabled")]
    pub enabled: bool,
    /// 平滑化の強さ (0.0〜1.0未満)
    #[serde(default = "default_half")]
    pub smoothing: f32,
    /// トレンドの追従度
    #[serde(default = "default_half")]
    pub correction: f32,
    /// 何フレーム先を予測するか
    #[serde(default = "default_half")]
    pub prediction: f32,
    /// この半径（メートル）以内の揺れは抑え込む
    #[serde(default = "default_jitter_radius")]
    pub jitter_radius: f32,
    /// 予測値が生の値から離れてよい最大距離（メートル）
    #[serde(default = "default_max_deviation_radius")]
    pub max_deviation_radius: f32,
}

fn default_smoothing_enabled() -> bool { true }
fn default_half() -> f32 { 0.5 }
fn default_jitter_radius() -> f32 { 0.05 }
fn default_max_deviation_radius() -> f32 { 0.04 }

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            enabled: default_smoothing_enabled(),
            smoothing: default_half(),
            correction: default_half(),
            prediction: default_half(),
            jitter_radius: default_jitter_radius(),
            max_deviation_radius: default_max_deviation_radius(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetargetConfig {
    /// 操作するプレイヤー (0 or 1)
    #[serde(default)]
    pub player: usize,
    /// 更新するボーングループ名
    #[serde(default = "default_mask")]
    pub mask: Vec<String>,
    /// 回転の適用率 (0.0〜1.0)
    #[serde(default = "default_blend_weight")]
    pub blend_weight: f32,
    /// モデルが別のアニメーションで動いているか
    #[serde(default)]
    pub animated: bool,
}

fn default_mask() -> Vec<String> { vec!["all".to_string()] }
fn default_blend_weight() -> f32 { 1.0 }

impl Default for RetargetConfig {
    fn default() -> Self {
        Self {
            player: 0,
            mask: default_mask(),
            blend_weight: default_blend_weight(),
            animated: false,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config")?;
        Ok(config)
    }

    /// 読めなければデフォルト設定
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{:#}; using default config", e);
                Self::default()
            }
        }
    }
}
