pub mod device;
pub mod playback;
pub mod recording;

use anyhow::{bail, Context, Result};
use nalgebra::{Vector3, Vector4};
use std::time::Duration;

use crate::config::{Config, FeedMode, SensorConfig};
use crate::skeleton::{compute_bone_orientations, BoneOrientation, JointIndex, SkeletonData, SkeletonFrame};
use crate::tracker::JointSmoother;

pub use device::{DeviceFeed, SkeletonDevice};
pub use playback::PlaybackFeed;
pub use recording::{Recorder, Recording};

/// センサーの設置姿勢
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorMount {
    /// 床からの高さ（メートル）
    pub height: f32,
    /// センサー座標の原点をどこに置くか（センサー直下の床基準）
    pub center: Vector3<f32>,
    /// 注視点（center基準）
    pub look_at: Vector4<f32>,
}

impl SensorMount {
    pub fn from_config(config: &SensorConfig) -> Self {
        Self {
            height: config.height,
            center: Vector3::from(config.center),
            look_at: Vector4::from(config.look_at),
        }
    }

    /// 注視点から求めた俯仰角（度）。上向きが正
    pub fn tilt_degrees(&self) -> f32 {
        f32::atan2(
            self.look_at.y + self.center.y - self.height,
            self.look_at.z + self.center.z,
        )
        .to_degrees()
    }
}

impl Default for SensorMount {
    fn default() -> Self {
        Self::from_config(&SensorConfig::default())
    }
}

/// スケルトンデータの供給元（実機 or 録画再生）
///
/// `poll_skeleton` は1ティック内で何度呼ばれてもよい。新しいフレームが
/// あれば `end_tick` まで true を返し続ける。
pub trait SensorFeed {
    /// 新しいフレームがあれば true
    fn poll_skeleton(&mut self) -> bool;

    /// 最新のフレーム
    fn skeleton(&self) -> &SkeletonFrame;

    fn mount(&self) -> &SensorMount;

    /// ティック終了。ポーリングのラッチを解除する
    fn end_tick(&mut self) {}

    fn bone_orientations(&self, skeleton: &SkeletonData) -> [BoneOrientation; JointIndex::COUNT] {
        compute_bone_orientations(skeleton)
    }

    fn sensor_height(&self) -> f32 {
        self.mount().height
    }

    fn sensor_center(&self) -> Vector3<f32> {
        self.mount().center
    }

    fn look_at(&self) -> Vector4<f32> {
        self.mount().look_at
    }
}

impl<F: SensorFeed + ?Sized> SensorFeed for Box<F> {
    fn poll_skeleton(&mut self) -> bool {
        (**self).poll_skeleton()
    }

    fn skeleton(&self) -> &SkeletonFrame {
        (**self).skeleton()
    }

    fn mount(&self) -> &SensorMount {
        (**self).mount()
    }

    fn end_tick(&mut self) {
        (**self).end_tick()
    }

    fn bone_orientations(&self, skeleton: &SkeletonData) -> [BoneOrientation; JointIndex::COUNT] {
        (**self).bone_orientations(skeleton)
    }
}

/// 設定に従ってフィードを開く
///
/// 実機モードではドライバ `device` が必要。
pub fn open_feed(
    config: &Config,
    device: Option<Box<dyn SkeletonDevice>>,
) -> Result<Box<dyn SensorFeed>> {
    let mount = SensorMount::from_config(&config.sensor);

    match config.feed.mode {
        FeedMode::Emulator => {
            let interval = Duration::try_from_secs_f32(config.feed.playback_interval_ms / 1000.0)
                .context("Invalid playback interval")?;
            let feed = PlaybackFeed::open(mount, &config.feed.playback_path, interval)?;
            Ok(Box::new(feed))
        }
        FeedMode::Device => {
            let Some(device) = device else {
                bail!("Feed mode is \"device\" but no skeleton device driver is available");
            };
            let smoother = config
                .smoothing
                .enabled
                .then(|| JointSmoother::from_config(&config.smoothing));
            let timeout = Duration::from_millis(config.feed.poll_timeout_ms);
            Ok(Box::new(DeviceFeed::new(device, mount, timeout, smoother)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tilt_level() {
        let mount = SensorMount {
            height: 1.0,
            center: Vector3::new(0.0, 0.2, 0.0),
            look_at: Vector4::new(0.0, 0.8, 2.0, 1.0),
        };
        assert!(mount.tilt_degrees().abs() < 1e-5);
    }

    #[test]
    fn test_tilt_down() {
        let mount = SensorMount {
            height: 1.0,
            center: Vector3::zeros(),
            look_at: Vector4::new(0.0, 0.0, 1.0, 1.0),
        };
        assert!((mount.tilt_degrees() + 45.0).abs() < 1e-4);
    }

    #[test]
    fn test_device_mode_without_driver_fails() {
        let mut config = Config::default();
        config.feed.mode = FeedMode::Device;
        assert!(open_feed(&config, None).is_err());
    }

    #[test]
    fn test_emulator_mode_missing_file_fails() {
        let mut config = Config::default();
        config.feed.playback_path = "no/such/recording.json".to_string();
        assert!(open_feed(&config, None).is_err());
    }
}
