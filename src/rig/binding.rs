use super::armature::NodeId;
use crate::skeleton::JointIndex;

/// 関節スロット20 + 向き決め用の末端スロット5
pub const RIG_SLOT_COUNT: usize = JointIndex::COUNT + 5;

/// リグ側のボーン名
///
/// 腰中心以外は対応する関節インデックスより1つ後ろのスロットに入る
/// （腰スロットを腰のオーバーライドに使うため）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RigBone {
    HipCenter,
    Spine,
    ShoulderCenter,
    CollarLeft,
    ShoulderLeft,
    ElbowLeft,
    WristLeft,
    CollarRight,
    ShoulderRight,
    ElbowRight,
    WristRight,
    HipOverride,
    HipLeft,
    KneeLeft,
    AnkleLeft,
    HipRight,
    KneeRight,
    AnkleRight,
    Head,
    HandLeft,
    HandRight,
    FootLeft,
    FootRight,
}

impl RigBone {
    pub const ALL: [RigBone; 23] = [
        Self::HipCenter,
        Self::Spine,
        Self::ShoulderCenter,
        Self::CollarLeft,
        Self::ShoulderLeft,
        Self::ElbowLeft,
        Self::WristLeft,
        Self::CollarRight,
        Self::ShoulderRight,
        Self::ElbowRight,
        Self::WristRight,
        Self::HipOverride,
        Self::HipLeft,
        Self::KneeLeft,
        Self::AnkleLeft,
        Self::HipRight,
        Self::KneeRight,
        Self::AnkleRight,
        Self::Head,
        Self::HandLeft,
        Self::HandRight,
        Self::FootLeft,
        Self::FootRight,
    ];

    /// スロット番号。0 と 16 は常に空き
    pub fn slot(self) -> usize {
        use RigBone::*;
        match self {
            HipCenter => 1,
            Spine => 2,
            ShoulderCenter => 3,
            CollarLeft => 4,
            ShoulderLeft => 5,
            ElbowLeft => 6,
            WristLeft => 7,
            CollarRight => 8,
            ShoulderRight => 9,
            ElbowRight => 10,
            WristRight => 11,
            HipOverride => 12,
            HipLeft => 13,
            KneeLeft => 14,
            AnkleLeft => 15,
            HipRight => 17,
            KneeRight => 18,
            AnkleRight => 19,
            Head => 20,
            HandLeft => 21,
            HandRight => 22,
            FootLeft => 23,
            FootRight => 24,
        }
    }

    pub fn name(self) -> &'static str {
        use RigBone::*;
        match self {
            HipCenter => "hip_center",
            Spine => "spine",
            ShoulderCenter => "shoulder_center",
            CollarLeft => "collar_left",
            ShoulderLeft => "shoulder_left",
            ElbowLeft => "elbow_left",
            WristLeft => "wrist_left",
            CollarRight => "collar_right",
            ShoulderRight => "shoulder_right",
            ElbowRight => "elbow_right",
            WristRight => "wrist_right",
            HipOverride => "hip_override",
            HipLeft => "hip_left",
            KneeLeft => "knee_left",
            AnkleLeft => "ankle_left",
            HipRight => "hip_right",
            KneeRight => "knee_right",
            AnkleRight => "ankle_right",
            Head => "head",
            HandLeft => "hand_left",
            HandRight => "hand_right",
            FootLeft => "foot_left",
            FootRight => "foot_right",
        }
    }
}

/// 関節スロット → リグのノード
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RigBinding {
    root: NodeId,
    slots: [Option<NodeId>; RIG_SLOT_COUNT],
}

impl RigBinding {
    /// `root` はリグ全体の基準ノード（向き・右方向の基準）
    pub fn new(root: NodeId) -> Self {
        Self {
            root,
            slots: [None; RIG_SLOT_COUNT],
        }
    }

    /// ボーン名でノードを探して割り当てる。見つからないボーンは空きのまま
    pub fn by_name<F>(root: NodeId, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<NodeId>,
    {
        let mut binding = Self::new(root);
        for bone in RigBone::ALL {
            if let Some(node) = lookup(bone.name()) {
                binding.bind(bone, node);
            }
        }
        binding
    }

    pub fn bind(&mut self, bone: RigBone, node: NodeId) -> &mut Self {
        self.slots[bone.slot()] = Some(node);
        self
    }

    pub fn unbind(&mut self, bone: RigBone) -> &mut Self {
        self.slots[bone.slot()] = None;
        self
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn bone(&self, bone: RigBone) -> Option<NodeId> {
        self.slots[bone.slot()]
    }

    /// 関節 `joint` で駆動されるノード
    pub fn joint(&self, joint: JointIndex) -> Option<NodeId> {
        self.slots[joint.index()]
    }

    pub fn slot(&self, slot: usize) -> Option<NodeId> {
        self.slots.get(slot).copied().flatten()
    }

    /// 四肢の末端手前のスロット (3, 7, 11, 15, 19) に対応する末端ノード
    pub fn extra_for(&self, joint: JointIndex) -> Option<NodeId> {
        let i = joint.index();
        if i % 4 != 3 {
            return None;
        }
        self.slot(JointIndex::COUNT + i / 4)
    }

    pub fn is_present(&self, slot: usize) -> bool {
        self.slot(slot).is_some()
    }

    /// 空きスロットのビットマスク
    pub fn null_mask(&self) -> u32 {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_none())
            .fold(0u32, |mask, (i, _)| mask | (1u32 << i))
    }

    /// 割り当て済みの関節スロット数（末端スロットは除く）
    pub fn bound_joint_count(&self) -> usize {
        self.slots[..JointIndex::COUNT].iter().filter(|s| s.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_are_unique_and_skip_reserved() {
        let mut seen = [false; RIG_SLOT_COUNT];
        for bone in RigBone::ALL {
            let slot = bone.slot();
            assert!(!seen[slot], "{:?}", bone);
            seen[slot] = true;
        }
        assert!(!seen[0]);
        assert!(!seen[16]);
    }

    #[test]
    fn test_joint_slot_convention() {
        let mut binding = RigBinding::new(NodeId(0));
        binding.bind(RigBone::HipCenter, NodeId(1)).bind(RigBone::HipOverride, NodeId(2));
        // 腰中心ノードは背骨関節で駆動される
        assert_eq!(binding.joint(JointIndex::Spine), Some(NodeId(1)));
        // 腰オーバーライドは左腰関節のスロット
        assert_eq!(binding.joint(JointIndex::HipLeft), Some(NodeId(2)));
        assert_eq!(binding.joint(JointIndex::HipCenter), None);
    }

    #[test]
    fn test_extra_for_limb_ends() {
        let mut binding = RigBinding::new(NodeId(0));
        binding.bind(RigBone::Head, NodeId(5)).bind(RigBone::FootRight, NodeId(9));
        assert_eq!(binding.extra_for(JointIndex::Head), Some(NodeId(5)));
        assert_eq!(binding.extra_for(JointIndex::FootRight), Some(NodeId(9)));
        assert_eq!(binding.extra_for(JointIndex::HandLeft), None);
        assert_eq!(binding.extra_for(JointIndex::ElbowLeft), None);
    }

    #[test]
    fn test_null_mask() {
        let mut binding = RigBinding::new(NodeId(0));
        assert_eq!(binding.null_mask(), (1u32 << RIG_SLOT_COUNT) - 1);
        binding.bind(RigBone::Spine, NodeId(3));
        assert_eq!(binding.null_mask() & (1 << 2), 0);
        assert!(binding.is_present(2));
        assert_eq!(binding.bound_joint_count(), 1);
        binding.unbind(RigBone::Spine);
        assert_eq!(binding.bound_joint_count(), 0);
    }

    #[test]
    fn test_by_name() {
        let binding = RigBinding::by_name(NodeId(0), |name| match name {
            "spine" => Some(NodeId(4)),
            "hand_left" => Some(NodeId(7)),
            _ => None,
        });
        assert_eq!(binding.bone(RigBone::Spine), Some(NodeId(4)));
        assert_eq!(binding.bone(RigBone::HandLeft), Some(NodeId(7)));
        assert_eq!(binding.bone(RigBone::Head), None);
    }
}
