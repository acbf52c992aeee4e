use nalgebra::{Point3, Vector3};
use tracing::debug;

use super::identity::IdentityTracker;
use super::space::SpaceTransformer;
use crate::sensor::SensorFeed;
use crate::skeleton::{
    BoneOrientation, JointIndex, JointTrackingState, SkeletonTrackingState, MAX_TRACKED,
    SKELETON_COUNT,
};

/// 論理プレイヤー1人分の処理済みスケルトン
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedSkeleton {
    /// ワールド座標
    pub positions: [Point3<f32>; JointIndex::COUNT],
    /// センサー座標
    pub raw_positions: [Point3<f32>; JointIndex::COUNT],
    /// ワールド座標での速度 (m/s)
    pub velocities: [Vector3<f32>; JointIndex::COUNT],
    pub orientations: [BoneOrientation; JointIndex::COUNT],
    pub states: [JointTrackingState; JointIndex::COUNT],
}

impl TrackedSkeleton {
    pub fn position(&self, joint: JointIndex) -> Point3<f32> {
        self.positions[joint.index()]
    }

    pub fn velocity(&self, joint: JointIndex) -> Vector3<f32> {
        self.velocities[joint.index()]
    }

    pub fn state(&self, joint: JointIndex) -> JointTrackingState {
        self.states[joint.index()]
    }

    pub fn is_tracked(&self, joint: JointIndex) -> bool {
        self.state(joint) != JointTrackingState::NotTracked
    }
}

impl Default for TrackedSkeleton {
    fn default() -> Self {
        Self {
            positions: [Point3::origin(); JointIndex::COUNT],
            raw_positions: [Point3::origin(); JointIndex::COUNT],
            velocities: [Vector3::zeros(); JointIndex::COUNT],
            orientations: [BoneOrientation::default(); JointIndex::COUNT],
            states: [JointTrackingState::NotTracked; JointIndex::COUNT],
        }
    }
}

/// フィードをポーリングし、プレイヤーごとのスケルトンを更新する
///
/// `poll` は1ティック内で何度呼んでもよく、最初の1回だけがフィードを
/// 読む。`end_tick` でラッチを解除する。新しいフレームが無いティックでは
/// 前回の値をそのまま保持する。
pub struct SkeletonFrameProcessor<F> {
    feed: F,
    space: SpaceTransformer,
    identity: IdentityTracker,
    /// 前フレームでの各プレイヤーのスロット
    assigned: [Option<usize>; MAX_TRACKED],
    slot_states: [SkeletonTrackingState; SKELETON_COUNT],
    skeletons: [TrackedSkeleton; MAX_TRACKED],
    last_timestamp_ms: Option<i64>,
    delta_time: f32,
    polled: bool,
    new_skeleton: bool,
}

impl<F: SensorFeed> SkeletonFrameProcessor<F> {
    /// `flip` はセンサー→ワールドの軸反転（対角成分）
    pub fn new(feed: F, flip: [f32; 3]) -> Self {
        let space = SpaceTransformer::from_mount(feed.mount(), flip);
        debug!(
            height = feed.sensor_height(),
            tilt = feed.mount().tilt_degrees(),
            "sensor to world transform ready"
        );
        Self {
            feed,
            space,
            identity: IdentityTracker::new(),
            assigned: [None; MAX_TRACKED],
            slot_states: [SkeletonTrackingState::NotTracked; SKELETON_COUNT],
            skeletons: [TrackedSkeleton::default(); MAX_TRACKED],
            last_timestamp_ms: None,
            delta_time: 0.0,
            polled: false,
            new_skeleton: false,
        }
    }

    /// 新しいフレームを処理したら true
    pub fn poll(&mut self) -> bool {
        if self.polled {
            return self.new_skeleton;
        }
        self.polled = true;

        self.new_skeleton = self.feed.poll_skeleton();
        if self.new_skeleton {
            self.process_frame();
        }
        self.new_skeleton
    }

    pub fn end_tick(&mut self) {
        self.polled = false;
        self.new_skeleton = false;
        self.feed.end_tick();
    }

    fn process_frame(&mut self) {
        let frame = self.feed.skeleton();

        self.delta_time = match self.last_timestamp_ms {
            Some(last) => (frame.timestamp_ms - last) as f32 / 1000.0,
            None => 0.0,
        };
        self.last_timestamp_ms = Some(frame.timestamp_ms);

        for (state, skeleton) in self.slot_states.iter_mut().zip(frame.skeletons.iter()) {
            *state = skeleton.tracking_state;
        }

        let players = self.identity.assign(&frame.tracked_slots());

        for (player, slot) in players.iter().enumerate() {
            let tracked = &mut self.skeletons[player];
            let Some(slot) = *slot else {
                // 位置は保持し、状態だけ未追跡にする
                tracked.states = [JointTrackingState::NotTracked; JointIndex::COUNT];
                continue;
            };

            let data = &frame.skeletons[slot];
            // 速度は同じ人物の連続フレーム間でだけ求める
            let same_person = self.assigned[player] == Some(slot);
            let dt = self.delta_time;
            let orientations = self.feed.bone_orientations(data);

            for joint in 0..JointIndex::COUNT {
                let raw = data.joint_positions[joint];
                let world = self.space.to_world(&raw);

                tracked.velocities[joint] = if same_person && dt > 0.0 {
                    (world - tracked.positions[joint]) / dt
                } else {
                    Vector3::zeros()
                };
                tracked.positions[joint] = world;
                tracked.raw_positions[joint] = raw;
                tracked.states[joint] = data.joint_states[joint];
                tracked.orientations[joint] = orientations[joint];
            }
        }

        self.assigned = players;
    }

    pub fn skeletons(&self) -> &[TrackedSkeleton; MAX_TRACKED] {
        &self.skeletons
    }

    pub fn skeleton(&self, player: usize) -> Option<&TrackedSkeleton> {
        self.skeletons.get(player)
    }

    /// 各プレイヤーに割り当てられたスロット
    pub fn players(&self) -> [Option<usize>; MAX_TRACKED] {
        self.assigned
    }

    pub fn is_player_tracked(&self, player: usize) -> bool {
        self.assigned.get(player).copied().flatten().is_some()
    }

    pub fn slot_states(&self) -> &[SkeletonTrackingState; SKELETON_COUNT] {
        &self.slot_states
    }

    /// 直近2フレームのタイムスタンプ差（秒）
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    pub fn space(&self) -> &SpaceTransformer {
        &self.space
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    pub fn feed_mut(&mut self) -> &mut F {
        &mut self.feed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::SensorMount;
    use crate::skeleton::SkeletonFrame;
    use nalgebra::{Vector3 as V3, Vector4};
    use std::collections::VecDeque;

    /// ティックごとに用意したフレーム（None はデータ無し）を返すフィード
    struct ScriptedFeed {
        mount: SensorMount,
        script: VecDeque<Option<SkeletonFrame>>,
        frame: SkeletonFrame,
        polled: bool,
        new_skeleton: bool,
        polls: usize,
    }

    impl ScriptedFeed {
        fn new(script: Vec<Option<SkeletonFrame>>) -> Self {
            Self {
                // 傾きなし、センサー直下が原点
                mount: SensorMount {
                    height: 1.0,
                    center: V3::zeros(),
                    look_at: Vector4::new(0.0, 1.0, 2.0, 1.0),
                },
                script: script.into(),
                frame: SkeletonFrame::default(),
                polled: false,
                new_skeleton: false,
                polls: 0,
            }
        }
    }

    impl SensorFeed for ScriptedFeed {
        fn poll_skeleton(&mut self) -> bool {
            self.polls += 1;
            if !self.polled {
                self.polled = true;
                if let Some(Some(frame)) = self.script.pop_front() {
                    self.frame = frame;
                    self.new_skeleton = true;
                }
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

    const NO_FLIP: [f32; 3] = [1.0, 1.0, 1.0];

    fn make_frame(timestamp_ms: i64, slots: &[(usize, f32)]) -> SkeletonFrame {
        let mut frame = SkeletonFrame {
            timestamp_ms,
            ..SkeletonFrame::default()
        };
        for &(slot, head_x) in slots {
            let skeleton = &mut frame.skeletons[slot];
            skeleton.tracking_state = SkeletonTrackingState::SkeletonTracked;
            for joint in JointIndex::ALL {
                skeleton.joint_states[joint.index()] = JointTrackingState::Tracked;
                skeleton.joint_positions[joint.index()] = Point3::new(0.0, 0.0, 2.0);
            }
            skeleton.joint_positions[JointIndex::Head.index()] = Point3::new(head_x, 0.5, 2.0);
        }
        frame
    }

    fn approx_eq_vec(a: &V3<f32>, b: &V3<f32>, eps: f32) -> bool {
        (a - b).norm() < eps
    }

    #[test]
    fn test_poll_is_idempotent_within_tick() {
        let feed = ScriptedFeed::new(vec![Some(make_frame(0, &[(1, 0.0)]))]);
        let mut processor = SkeletonFrameProcessor::new(feed, NO_FLIP);

        assert!(processor.poll());
        assert!(processor.poll());
        assert!(processor.poll());
        assert_eq!(processor.feed().polls, 1);
        assert_eq!(processor.players(), [Some(1), None]);

        processor.end_tick();
        assert!(!processor.poll());
        assert_eq!(processor.feed().polls, 2);
    }

    #[test]
    fn test_positions_in_world_space() {
        let feed = ScriptedFeed::new(vec![Some(make_frame(0, &[(2, 0.25)]))]);
        let mut processor = SkeletonFrameProcessor::new(feed, NO_FLIP);
        assert!(processor.poll());

        let player = &processor.skeletons()[0];
        assert_eq!(player.raw_positions[JointIndex::Head.index()], Point3::new(0.25, 0.5, 2.0));
        assert_eq!(player.position(JointIndex::Head), Point3::new(0.25, 1.5, 2.0));
        assert!(player.is_tracked(JointIndex::Head));
    }

    #[test]
    fn test_stale_data_kept_without_new_frame() {
        let feed = ScriptedFeed::new(vec![Some(make_frame(0, &[(0, 0.3)])), None]);
        let mut processor = SkeletonFrameProcessor::new(feed, NO_FLIP);
        assert!(processor.poll());
        let before = processor.skeletons()[0];
        processor.end_tick();

        assert!(!processor.poll());
        assert_eq!(processor.skeletons()[0], before);
        assert_eq!(processor.players(), [Some(0), None]);
    }

    #[test]
    fn test_velocity_from_timestamps() {
        let feed = ScriptedFeed::new(vec![
            Some(make_frame(1000, &[(0, 0.0)])),
            Some(make_frame(1100, &[(0, 0.1)])),
        ]);
        let mut processor = SkeletonFrameProcessor::new(feed, NO_FLIP);
        processor.poll();
        // 最初のフレームは速度 0
        assert_eq!(processor.skeletons()[0].velocity(JointIndex::Head), V3::zeros());
        processor.end_tick();

        processor.poll();
        assert!((processor.delta_time() - 0.1).abs() < 1e-6);
        let v = processor.skeletons()[0].velocity(JointIndex::Head);
        assert!(approx_eq_vec(&v, &V3::new(1.0, 0.0, 0.0), 1e-4));
        assert_eq!(processor.skeletons()[0].velocity(JointIndex::Spine), V3::zeros());
    }

    #[test]
    fn test_equal_timestamps_give_zero_velocity() {
        let feed = ScriptedFeed::new(vec![
            Some(make_frame(500, &[(0, 0.0)])),
            Some(make_frame(500, &[(0, 0.4)])),
        ]);
        let mut processor = SkeletonFrameProcessor::new(feed, NO_FLIP);
        processor.poll();
        processor.end_tick();
        processor.poll();

        assert_eq!(processor.delta_time(), 0.0);
        let v = processor.skeletons()[0].velocity(JointIndex::Head);
        assert!(v.iter().all(|c| c.is_finite()));
        assert_eq!(v, V3::zeros());
    }

    #[test]
    fn test_player_lost_marks_not_tracked() {
        let feed = ScriptedFeed::new(vec![
            Some(make_frame(0, &[(3, 0.1), (5, 0.2)])),
            Some(make_frame(33, &[(5, 0.2)])),
        ]);
        let mut processor = SkeletonFrameProcessor::new(feed, NO_FLIP);
        processor.poll();
        assert_eq!(processor.players(), [Some(3), Some(5)]);
        processor.end_tick();

        processor.poll();
        assert_eq!(processor.players(), [None, Some(5)]);
        assert!(!processor.is_player_tracked(0));
        assert!(!processor.skeletons()[0].is_tracked(JointIndex::Head));
        // 位置は最後の値のまま
        assert_eq!(processor.skeletons()[0].position(JointIndex::Head).x, 0.1);
        assert!(processor.skeletons()[1].is_tracked(JointIndex::Head));
        assert_eq!(processor.slot_states()[3], SkeletonTrackingState::NotTracked);
    }
}
