use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{SensorFeed, SensorMount};
use crate::skeleton::{BoneOrientation, JointIndex, SkeletonData, SkeletonFrame};

/// 録画データ（スケルトンフレームの列）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub frames: Vec<SkeletonFrame>,
}

impl Recording {
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).context("Failed to create recording directory")?;
        }
        let json = serde_json::to_string(self)?;
        fs::write(path, json).context("Failed to write recording file")?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read recording file {}", path.display()))?;
        let recording: Recording =
            serde_json::from_str(&content).context("Failed to parse recording file")?;
        Ok(recording)
    }
}

/// フィードを包んで、録画中に届いた新しいフレームを記録する
///
/// 1ティックにつき1フレームだけ記録する。停止するたびに
/// `<base><n>.json` を書き出し、`n` を進める。
pub struct Recorder<F> {
    inner: F,
    base_path: PathBuf,
    recording: bool,
    captured: bool,
    frames: Vec<SkeletonFrame>,
    file_count: usize,
}

impl<F: SensorFeed> Recorder<F> {
    pub fn new<P: Into<PathBuf>>(inner: F, base_path: P) -> Self {
        Self {
            inner,
            base_path: base_path.into(),
            recording: false,
            captured: false,
            frames: Vec::new(),
            file_count: 0,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn start(&mut self) {
        self.recording = true;
        self.frames.clear();
        info!("start recording");
    }

    /// 録画を止めてファイルに書き出す。録画していなければ None
    pub fn stop(&mut self) -> Result<Option<PathBuf>> {
        if !self.recording {
            return Ok(None);
        }
        self.recording = false;

        let mut name = self.base_path.clone().into_os_string();
        name.push(format!("{}.json", self.file_count));
        let path = PathBuf::from(name);

        let recording = Recording {
            frames: std::mem::take(&mut self.frames),
        };
        recording.save(&path)?;
        self.file_count += 1;
        info!(path = %path.display(), frames = recording.frames.len(), "stop recording");
        Ok(Some(path))
    }

    pub fn into_inner(self) -> F {
        self.inner
    }
}

impl<F: SensorFeed> SensorFeed for Recorder<F> {
    fn poll_skeleton(&mut self) -> bool {
        let new_skeleton = self.inner.poll_skeleton();
        if new_skeleton && self.recording && !self.captured {
            self.frames.push(self.inner.skeleton().clone());
            self.captured = true;
        }
        new_skeleton
    }

    fn skeleton(&self) -> &SkeletonFrame {
        self.inner.skeleton()
    }

    fn mount(&self) -> &SensorMount {
        self.inner.mount()
    }

    fn end_tick(&mut self) {
        self.captured = false;
        self.inner.end_tick();
    }

    fn bone_orientations(&self, skeleton: &SkeletonData) -> [BoneOrientation; JointIndex::COUNT] {
        self.inner.bone_orientations(skeleton)
    }
}
