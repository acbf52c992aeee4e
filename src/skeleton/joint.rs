use serde::{Deserialize, Serialize};

/// センサーの 20 関節インデックス
///
/// 並び順に意味がある: 四肢の途中の関節 `i` の子は `i + 1`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(usize)]
pub enum JointIndex {
    HipCenter = 0,
    Spine = 1,
    ShoulderCenter = 2,
    Head = 3,
    ShoulderLeft = 4,
    ElbowLeft = 5,
    WristLeft = 6,
    HandLeft = 7,
    ShoulderRight = 8,
    ElbowRight = 9,
    WristRight = 10,
    HandRight = 11,
    HipLeft = 12,
    KneeLeft = 13,
    AnkleLeft = 14,
    FootLeft = 15,
    HipRight = 16,
    KneeRight = 17,
    AnkleRight = 18,
    FootRight = 19,
}

impl JointIndex {
    pub const COUNT: usize = 20;

    pub const ALL: [JointIndex; JointIndex::COUNT] = [
        Self::HipCenter,
        Self::Spine,
        Self::ShoulderCenter,
        Self::Head,
        Self::ShoulderLeft,
        Self::ElbowLeft,
        Self::WristLeft,
        Self::HandLeft,
        Self::ShoulderRight,
        Self::ElbowRight,
        Self::WristRight,
        Self::HandRight,
        Self::HipLeft,
        Self::KneeLeft,
        Self::AnkleLeft,
        Self::FootLeft,
        Self::HipRight,
        Self::KneeRight,
        Self::AnkleRight,
        Self::FootRight,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// 四肢の末端（頭・手・足）
    pub fn is_limb_end(self) -> bool {
        matches!(
            self,
            Self::Head | Self::HandLeft | Self::HandRight | Self::FootLeft | Self::FootRight
        )
    }

    /// 四肢の根元（体幹から分岐する関節）
    pub fn is_branch_root(self) -> bool {
        matches!(
            self,
            Self::HipCenter | Self::ShoulderLeft | Self::ShoulderRight | Self::HipLeft | Self::HipRight
        )
    }

    /// センサーの骨格階層での親関節
    pub fn parent(self) -> Option<Self> {
        use JointIndex::*;
        match self {
            HipCenter => None,
            ShoulderLeft | ShoulderRight => Some(ShoulderCenter),
            HipLeft | HipRight => Some(HipCenter),
            _ => Self::from_index(self.index() - 1),
        }
    }

    /// 設定ファイル用の名前
    pub fn name(self) -> &'static str {
        use JointIndex::*;
        match self {
            HipCenter => "hip_center",
            Spine => "spine",
            ShoulderCenter => "shoulder_center",
            Head => "head",
            ShoulderLeft => "shoulder_left",
            ElbowLeft => "elbow_left",
            WristLeft => "wrist_left",
            HandLeft => "hand_left",
            ShoulderRight => "shoulder_right",
            ElbowRight => "elbow_right",
            WristRight => "wrist_right",
            HandRight => "hand_right",
            HipLeft => "hip_left",
            KneeLeft => "knee_left",
            AnkleLeft => "ankle_left",
            FootLeft => "foot_left",
            HipRight => "hip_right",
            KneeRight => "knee_right",
            AnkleRight => "ankle_right",
            FootRight => "foot_right",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|j| j.name() == name)
    }
}

/// 関節ごとの追跡状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JointTrackingState {
    #[default]
    NotTracked = 0,
    Inferred = 1,
    Tracked = 2,
}

impl From<u32> for JointTrackingState {
    fn from(value: u32) -> Self {
        match value {
            1 => JointTrackingState::Inferred,
            2 => JointTrackingState::Tracked,
            _ => JointTrackingState::NotTracked,
        }
    }
}

/// スケルトンスロットごとの追跡状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SkeletonTrackingState {
    #[default]
    NotTracked = 0,
    PositionOnly = 1,
    SkeletonTracked = 2,
}

impl From<u32> for SkeletonTrackingState {
    fn from(value: u32) -> Self {
        match value {
            1 => SkeletonTrackingState::PositionOnly,
            2 => SkeletonTrackingState::SkeletonTracked,
            _ => SkeletonTrackingState::NotTracked,
        }
    }
}
