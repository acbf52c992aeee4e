use anyhow::{bail, Result};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::info;

use super::recording::Recording;
use super::{SensorFeed, SensorMount};
use crate::skeleton::SkeletonFrame;

/// 録画したスケルトンフレームを実時間で再生するフィード
///
/// 開始からの経過時間を `interval` で割ったフレームを返し、末尾で先頭に戻る。
pub struct PlaybackFeed {
    mount: SensorMount,
    frames: Vec<SkeletonFrame>,
    interval: Duration,
    started: Instant,
    /// 経過フレーム数（ループ前）
    current: usize,
    new_skeleton: bool,
}

impl PlaybackFeed {
    pub fn new(mount: SensorMount, recording: Recording, interval: Duration) -> Result<Self> {
        if recording.frames.is_empty() {
            bail!("Recording has no frames");
        }
        if interval.is_zero() {
            bail!("Playback interval must be positive");
        }
        Ok(Self {
            mount,
            frames: recording.frames,
            interval,
            started: Instant::now(),
            current: 0,
            new_skeleton: false,
        })
    }

    /// 録画ファイルを読み込んで再生を始める
    pub fn open<P: AsRef<Path>>(mount: SensorMount, path: P, interval: Duration) -> Result<Self> {
        let recording = Recording::load(&path)?;
        info!(
            path = %path.as_ref().display(),
            frames = recording.frames.len(),
            "simulating skeleton playback"
        );
        Self::new(mount, recording, interval)
    }

    /// 別の録画に差し替えて先頭から再生する
    pub fn reload(&mut self, recording: Recording) -> Result<()> {
        if recording.frames.is_empty() {
            bail!("Recording has no frames");
        }
        self.frames = recording.frames;
        self.restart();
        Ok(())
    }

    pub fn restart(&mut self) {
        self.started = Instant::now();
        self.current = 0;
        self.new_skeleton = false;
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// 経過時間 `elapsed` 時点のフレームに進める
    fn advance_to(&mut self, elapsed: Duration) -> bool {
        let frame = (elapsed.as_secs_f64() / self.interval.as_secs_f64()).floor() as usize;
        if frame > self.current {
            self.current = frame;
            self.new_skeleton = true;
        }
        self.new_skeleton
    }
}

impl SensorFeed for PlaybackFeed {
    fn poll_skeleton(&mut self) -> bool {
        let elapsed = self.started.elapsed();
        self.advance_to(elapsed)
    }

    fn skeleton(&self) -> &SkeletonFrame {
        &self.frames[self.current % self.frames.len()]
    }

    fn mount(&self) -> &SensorMount {
        &self.mount
    }

    fn end_tick(&mut self) {
        self.new_skeleton = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_recording(count: usize) -> Recording {
        let frames = (0..count)
            .map(|i| SkeletonFrame {
                timestamp_ms: i as i64 * 33,
                frame_number: i as u32,
                ..SkeletonFrame::default()
            })
            .collect();
        Recording { frames }
    }

    fn make_feed(count: usize) -> PlaybackFeed {
        PlaybackFeed::new(SensorMount::default(), make_recording(count), Duration::from_millis(10))
            .unwrap()
    }

    #[test]
    fn test_empty_recording_rejected() {
        let result = PlaybackFeed::new(
            SensorMount::default(),
            Recording::default(),
            Duration::from_millis(10),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(PlaybackFeed::new(SensorMount::default(), make_recording(2), Duration::ZERO).is_err());
    }

    #[test]
    fn test_no_new_frame_before_interval() {
        let mut feed = make_feed(3);
        assert!(!feed.advance_to(Duration::from_millis(5)));
        assert_eq!(feed.skeleton().frame_number, 0);
    }

    #[test]
    fn test_advance_latches_until_end_tick() {
        let mut feed = make_feed(3);
        assert!(feed.advance_to(Duration::from_millis(12)));
        assert_eq!(feed.skeleton().frame_number, 1);
        // 同じティック内は true のまま
        assert!(feed.advance_to(Duration::from_millis(13)));
        feed.end_tick();
        assert!(!feed.advance_to(Duration::from_millis(14)));
    }

    #[test]
    fn test_playback_loops() {
        let mut feed = make_feed(3);
        assert!(feed.advance_to(Duration::from_millis(45)));
        // 4フレーム目 → 4 % 3 = 1
        assert_eq!(feed.skeleton().frame_number, 1);
    }

    #[test]
    fn test_reload_restarts() {
        let mut feed = make_feed(3);
        feed.advance_to(Duration::from_millis(25));
        feed.reload(make_recording(5)).unwrap();
        assert_eq!(feed.frame_count(), 5);
        assert_eq!(feed.skeleton().frame_number, 0);
        assert!(feed.reload(Recording::default()).is_err());
    }
}
