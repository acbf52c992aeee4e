use nalgebra::{Point3, Vector3};

use crate::config::SmoothingConfig;
use crate::skeleton::{JointIndex, JointTrackingState, SkeletonFrame, SKELETON_COUNT};

/// 関節ごとのフィルタ状態
#[derive(Debug, Clone, Copy, Default)]
struct JointHistory {
    raw: Vector3<f32>,
    filtered: Vector3<f32>,
    trend: Vector3<f32>,
    frame_count: u32,
}

/// Holt二重指数平滑化による関節位置フィルタ
///
/// 位置: ジッター半径内の揺れを抑えたうえで平滑化
/// トレンド: フレーム間差分を `correction` で追従
/// 出力: `prediction` フレーム先を予測し、生値から `max_deviation_radius` 以内に制限
pub struct JointSmoother {
    smoothing: f32,
    correction: f32,
    prediction: f32,
    jitter_radius: f32,
    max_deviation_radius: f32,
    history: [[JointHistory; JointIndex::COUNT]; SKELETON_COUNT],
}

impl JointSmoother {
    pub fn new(
        smoothing: f32,
        correction: f32,
        prediction: f32,
        jitter_radius: f32,
        max_deviation_radius: f32,
    ) -> Self {
        Self {
            // smoothing = 1.0 だと入力を一切反映しなくなる
            smoothing: smoothing.clamp(0.0, 0.99),
            correction: correction.clamp(0.0, 1.0),
            prediction: prediction.max(0.0),
            jitter_radius: jitter_radius.max(0.0),
            max_deviation_radius: max_deviation_radius.max(0.0),
            history: [[JointHistory::default(); JointIndex::COUNT]; SKELETON_COUNT],
        }
    }

    pub fn from_config(config: &SmoothingConfig) -> Self {
        Self::new(
            config.smoothing,
            config.correction,
            config.prediction,
            config.jitter_radius,
            config.max_deviation_radius,
        )
    }

    /// フレーム内の全スケルトンの関節位置を平滑化する
    pub fn apply(&mut self, frame: &mut SkeletonFrame) {
        for (slot, skeleton) in frame.skeletons.iter_mut().enumerate() {
            if !skeleton.is_tracked() {
                self.history[slot] = [JointHistory::default(); JointIndex::COUNT];
                continue;
            }
            for joint in 0..JointIndex::COUNT {
                let raw = skeleton.joint_positions[joint];
                let state = skeleton.joint_states[joint];
                skeleton.joint_positions[joint] =
                    self.filter_joint(slot, joint, raw, state);
            }
        }
    }

    fn filter_joint(
        &mut self,
        slot: usize,
        joint: usize,
        raw: Point3<f32>,
        state: JointTrackingState,
    ) -> Point3<f32> {
        let history = &mut self.history[slot][joint];

        if state == JointTrackingState::NotTracked {
            *history = JointHistory::default();
            return raw;
        }

        // 推定関節は半径を半分にして強めに抑える
        let (jitter_radius, max_deviation_radius) = if state == JointTrackingState::Inferred {
            (self.jitter_radius * 0.5, self.max_deviation_radius * 0.5)
        } else {
            (self.jitter_radius, self.max_deviation_radius)
        };

        let raw = raw.coords;
        let prev_filtered = history.filtered;
        let prev_trend = history.trend;

        let (filtered, trend) = match history.frame_count {
            0 => (raw, Vector3::zeros()),
            1 => {
                let filtered = (raw + history.raw) * 0.5;
                let diff = filtered - prev_filtered;
                let trend = diff * self.correction + prev_trend * (1.0 - self.correction);
                (filtered, trend)
            }
            _ => {
                let len = (raw - prev_filtered).norm();
                let damped_raw = if jitter_radius > 0.0 && len <= jitter_radius {
                    let t = len / jitter_radius;
                    raw * t + prev_filtered * (1.0 - t)
                } else {
                    raw
                };
                let filtered = damped_raw * (1.0 - self.smoothing)
                    + (prev_filtered + prev_trend) * self.smoothing;
                let diff = filtered - prev_filtered;
                let trend = diff * self.correction + prev_trend * (1.0 - self.correction);
                (filtered, trend)
            }
        };

        let mut predicted = filtered + trend * self.prediction;
        let deviation = (predicted - raw).norm();
        if deviation > max_deviation_radius && deviation > 0.0 {
            let t = max_deviation_radius / deviation;
            predicted = predicted * t + raw * (1.0 - t);
        }

        *history = JointHistory {
            raw,
            filtered,
            trend,
            frame_count: history.frame_count.saturating_add(1),
        };

        Point3::from(predicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::SkeletonTrackingState;

    fn approx_eq_point(a: &Point3<f32>, b: &Point3<f32>, eps: f32) -> bool {
        (a - b).norm() < eps
    }

    fn make_frame(head: Point3<f32>, state: JointTrackingState) -> SkeletonFrame {
        let mut frame = SkeletonFrame::default();
        let skeleton = &mut frame.skeletons[0];
        skeleton.tracking_state = SkeletonTrackingState::SkeletonTracked;
        skeleton.joint_positions[JointIndex::Head.index()] = head;
        skeleton.joint_states[JointIndex::Head.index()] = state;
        frame
    }

    fn head(frame: &SkeletonFrame) -> Point3<f32> {
        frame.skeletons[0].joint_position(JointIndex::Head)
    }

    #[test]
    fn test_first_frame_passthrough() {
        let mut s = JointSmoother::from_config(&SmoothingConfig::default());
        let p = Point3::new(0.1, 0.6, 2.0);
        let mut frame = make_frame(p, JointTrackingState::Tracked);
        s.apply(&mut frame);
        assert!(approx_eq_point(&head(&frame), &p, 1e-6));
    }

    #[test]
    fn test_stationary_joint_stays_put() {
        let mut s = JointSmoother::from_config(&SmoothingConfig::default());
        let p = Point3::new(-0.3, 0.2, 1.8);
        for _ in 0..10 {
            let mut frame = make_frame(p, JointTrackingState::Tracked);
            s.apply(&mut frame);
            assert!(approx_eq_point(&head(&frame), &p, 1e-5));
        }
    }

    #[test]
    fn test_output_within_max_deviation() {
        let mut s = JointSmoother::new(0.5, 0.5, 0.5, 0.05, 0.04);
        for i in 0..20 {
            let raw = Point3::new(i as f32 * 0.1, 0.0, 2.0);
            let mut frame = make_frame(raw, JointTrackingState::Tracked);
            s.apply(&mut frame);
            assert!((head(&frame) - raw).norm() <= 0.04 + 1e-5, "frame {}", i);
        }
    }

    #[test]
    fn test_small_jitter_is_damped() {
        let mut s = JointSmoother::new(0.0, 0.0, 0.0, 0.05, 1.0);
        let base = Point3::new(0.0, 1.0, 2.0);
        for _ in 0..3 {
            let mut frame = make_frame(base, JointTrackingState::Tracked);
            s.apply(&mut frame);
        }
        let jittered = Point3::new(0.01, 1.0, 2.0);
        let mut frame = make_frame(jittered, JointTrackingState::Tracked);
        s.apply(&mut frame);
        // 半径0.05に対して0.01の揺れ → 1/5だけ動く
        assert!(approx_eq_point(&head(&frame), &Point3::new(0.002, 1.0, 2.0), 1e-5));
    }

    #[test]
    fn test_untracked_skeleton_resets_history() {
        let mut s = JointSmoother::new(0.9, 0.5, 0.5, 0.05, 1.0);
        let mut frame = make_frame(Point3::new(0.0, 0.0, 2.0), JointTrackingState::Tracked);
        s.apply(&mut frame);

        let mut lost = SkeletonFrame::default();
        s.apply(&mut lost);

        let far = Point3::new(1.0, 1.0, 3.0);
        let mut frame = make_frame(far, JointTrackingState::Tracked);
        s.apply(&mut frame);
        assert!(approx_eq_point(&head(&frame), &far, 1e-6));
    }

    #[test]
    fn test_not_tracked_joint_passthrough() {
        let mut s = JointSmoother::new(0.9, 0.5, 0.5, 0.05, 1.0);
        let mut frame = make_frame(Point3::new(0.0, 0.0, 2.0), JointTrackingState::Tracked);
        s.apply(&mut frame);
        let p = Point3::new(0.5, 0.5, 2.5);
        let mut frame = make_frame(p, JointTrackingState::NotTracked);
        s.apply(&mut frame);
        assert_eq!(head(&frame), p);
    }
}
