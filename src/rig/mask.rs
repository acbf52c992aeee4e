use anyhow::{bail, Result};

use crate::skeleton::JointIndex;

/// 更新対象にするボーンの集合
///
/// インデックス `i` はリグスロット `i`（関節 `i-1` → `i` のボーンで駆動）を表す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoneMask([bool; JointIndex::COUNT]);

impl BoneMask {
    pub const NONE: Self = Self([false; JointIndex::COUNT]);

    /// 腰中心・右腰スロットにはリグのボーンが無いので含めない
    pub const ALL: Self = Self::of(&[
        JointIndex::Spine,
        JointIndex::ShoulderCenter,
        JointIndex::Head,
        JointIndex::ShoulderLeft,
        JointIndex::ElbowLeft,
        JointIndex::WristLeft,
        JointIndex::HandLeft,
        JointIndex::ShoulderRight,
        JointIndex::ElbowRight,
        JointIndex::WristRight,
        JointIndex::HandRight,
        JointIndex::HipLeft,
        JointIndex::KneeLeft,
        JointIndex::AnkleLeft,
        JointIndex::FootLeft,
        JointIndex::KneeRight,
        JointIndex::AnkleRight,
        JointIndex::FootRight,
    ]);

    pub const TORSO: Self = Self::of(&[JointIndex::Spine, JointIndex::ShoulderCenter, JointIndex::Head]);

    pub const LEFT_ARM: Self = Self::of(&[
        JointIndex::ShoulderLeft,
        JointIndex::ElbowLeft,
        JointIndex::WristLeft,
        JointIndex::HandLeft,
    ]);

    pub const RIGHT_ARM: Self = Self::of(&[
        JointIndex::ShoulderRight,
        JointIndex::ElbowRight,
        JointIndex::WristRight,
        JointIndex::HandRight,
    ]);

    /// 腰スロット (HipLeft) は腰の向きを担うので両脚に含める
    pub const LEFT_LEG: Self = Self::of(&[
        JointIndex::HipLeft,
        JointIndex::KneeLeft,
        JointIndex::AnkleLeft,
        JointIndex::FootLeft,
    ]);

    pub const RIGHT_LEG: Self = Self::of(&[
        JointIndex::HipLeft,
        JointIndex::KneeRight,
        JointIndex::AnkleRight,
        JointIndex::FootRight,
    ]);

    pub const R_ARM_CHEST: Self = Self::RIGHT_ARM.union(Self::of(&[JointIndex::Spine]));

    pub const NO_FEET: Self = Self::ALL.without(JointIndex::FootLeft).without(JointIndex::FootRight);

    pub const UPPER_BODY: Self = Self::of(&[
        JointIndex::Head,
        JointIndex::ElbowLeft,
        JointIndex::WristLeft,
        JointIndex::HandLeft,
        JointIndex::ElbowRight,
        JointIndex::WristRight,
        JointIndex::HandRight,
    ]);

    pub const fn of(joints: &[JointIndex]) -> Self {
        let mut bits = [false; JointIndex::COUNT];
        let mut i = 0;
        while i < joints.len() {
            bits[joints[i] as usize] = true;
            i += 1;
        }
        Self(bits)
    }

    pub const fn union(self, other: Self) -> Self {
        let mut bits = self.0;
        let mut i = 0;
        while i < JointIndex::COUNT {
            bits[i] = bits[i] || other.0[i];
            i += 1;
        }
        Self(bits)
    }

    pub const fn without(self, joint: JointIndex) -> Self {
        let mut bits = self.0;
        bits[joint as usize] = false;
        Self(bits)
    }

    pub fn contains(&self, joint: JointIndex) -> bool {
        self.0[joint.index()]
    }

    pub fn is_empty(&self) -> bool {
        !self.0.iter().any(|&b| b)
    }

    pub fn joints(&self) -> impl Iterator<Item = JointIndex> + '_ {
        JointIndex::ALL.into_iter().filter(|j| self.contains(*j))
    }

    /// グループ名
    pub fn from_group(name: &str) -> Option<Self> {
        let mask = match name {
            "none" => Self::NONE,
            "all" => Self::ALL,
            "torso" => Self::TORSO,
            "left_arm" => Self::LEFT_ARM,
            "right_arm" => Self::RIGHT_ARM,
            "left_leg" => Self::LEFT_LEG,
            "right_leg" => Self::RIGHT_LEG,
            "r_arm_chest" => Self::R_ARM_CHEST,
            "no_feet" => Self::NO_FEET,
            "upper_body" => Self::UPPER_BODY,
            _ => return None,
        };
        Some(mask)
    }

    /// グループ名・関節名のリストの和集合
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut mask = Self::NONE;
        for name in names {
            let name = name.as_ref();
            let part = match Self::from_group(name) {
                Some(group) => group,
                None => match JointIndex::from_name(name) {
                    Some(joint) => Self::of(&[joint]),
                    None => bail!("Unknown bone mask entry: {}", name),
                },
            };
            mask = mask.union(part);
        }
        Ok(mask)
    }
}

impl Default for BoneMask {
    fn default() -> Self {
        Self::ALL
    }
}
