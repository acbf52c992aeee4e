use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use super::joint::{JointIndex, JointTrackingState, SkeletonTrackingState};

/// 1フレームに含まれるスケルトンスロット数
pub const SKELETON_COUNT: usize = 6;
/// 同時に骨格追跡できる人数
pub const MAX_TRACKED: usize = 2;

/// 1スロット分のスケルトンデータ（センサー座標系、メートル）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkeletonData {
    pub tracking_state: SkeletonTrackingState,
    /// センサーが振る追跡ID（同一人物なら複数フレームで一定）
    pub tracking_id: u32,
    pub user_index: u32,
    /// 重心位置
    pub position: Point3<f32>,
    pub joint_positions: [Point3<f32>; JointIndex::COUNT],
    pub joint_states: [JointTrackingState; JointIndex::COUNT],
    pub quality_flags: u32,
}

impl SkeletonData {
    pub fn joint_position(&self, joint: JointIndex) -> Point3<f32> {
        self.joint_positions[joint.index()]
    }

    pub fn joint_state(&self, joint: JointIndex) -> JointTrackingState {
        self.joint_states[joint.index()]
    }

    pub fn is_tracked(&self) -> bool {
        self.tracking_state == SkeletonTrackingState::SkeletonTracked
    }
}

impl Default for SkeletonData {
    fn default() -> Self {
        Self {
            tracking_state: SkeletonTrackingState::NotTracked,
            tracking_id: 0,
            user_index: 0,
            position: Point3::origin(),
            joint_positions: [Point3::origin(); JointIndex::COUNT],
            joint_states: [JointTrackingState::NotTracked; JointIndex::COUNT],
            quality_flags: 0,
        }
    }
}

/// センサーが1回のポーリングで返すスナップショット
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkeletonFrame {
    /// タイムスタンプ（ミリ秒）
    pub timestamp_ms: i64,
    pub frame_number: u32,
    /// 床平面 (a, b, c, d)
    pub floor_clip_plane: [f32; 4],
    pub skeletons: [SkeletonData; SKELETON_COUNT],
}

impl SkeletonFrame {
    /// 骨格追跡中のスロット番号（スロット順）
    pub fn tracked_slots(&self) -> Vec<usize> {
        self.skeletons
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_tracked())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn skeleton(&self, slot: usize) -> Option<&SkeletonData> {
        self.skeletons.get(slot)
    }
}

impl Default for SkeletonFrame {
    fn default() -> Self {
        Self {
            timestamp_ms: 0,
            frame_number: 0,
            floor_clip_plane: [0.0; 4],
            skeletons: std::array::from_fn(|_| SkeletonData::default()),
        }
    }
}
