use anyhow::Result;
use std::time::Duration;
use tracing::warn;

use super::{SensorFeed, SensorMount};
use crate::skeleton::SkeletonFrame;
use crate::tracker::JointSmoother;

/// 実機ドライバとの境界
pub trait SkeletonDevice {
    /// 次のスケルトンフレームを最大 `timeout` 待つ。届かなければ None
    fn next_frame(&mut self, timeout: Duration) -> Result<Option<SkeletonFrame>>;
}

impl<D: SkeletonDevice + ?Sized> SkeletonDevice for Box<D> {
    fn next_frame(&mut self, timeout: Duration) -> Result<Option<SkeletonFrame>> {
        (**self).next_frame(timeout)
    }
}

/// 実機から読むフィード
///
/// 1ティックで最初の `poll_skeleton` だけがデバイスに問い合わせる。
/// 以降は同じ結果を返す。
pub struct DeviceFeed<D> {
    device: D,
    mount: SensorMount,
    timeout: Duration,
    smoother: Option<JointSmoother>,
    frame: SkeletonFrame,
    polled: bool,
    new_skeleton: bool,
}

impl<D: SkeletonDevice> DeviceFeed<D> {
    pub fn new(
        device: D,
        mount: SensorMount,
        timeout: Duration,
        smoother: Option<JointSmoother>,
    ) -> Self {
        Self {
            device,
            mount,
            timeout,
            smoother,
            frame: SkeletonFrame::default(),
            polled: false,
            new_skeleton: false,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }
}

impl<D: SkeletonDevice> SensorFeed for DeviceFeed<D> {
    fn poll_skeleton(&mut self) -> bool {
        if self.polled {
            return self.new_skeleton;
        }
        self.polled = true;

        match self.device.next_frame(self.timeout) {
            Ok(Some(mut frame)) => {
                if let Some(smoother) = self.smoother.as_mut() {
                    smoother.apply(&mut frame);
                }
                self.frame = frame;
                self.new_skeleton = true;
            }
            Ok(None) => {}
            Err(e) => warn!("skeleton poll failed: {:#}", e),
        }
        self.new_skeleton
    }

    fn skeleton(&self) -> &SkeletonFrame {
        &self.frame
    }

    fn mount(&self) -> &SensorMount {
        &self.mount
    }

    fn end_tick(&mut self) {
        self.polled = false;
        self.new_skeleton = false;
    }
}
