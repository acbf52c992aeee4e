use anyhow::{bail, Result};
use nalgebra::{Point3, UnitQuaternion, Vector3};
use tracing::{debug, info};

use super::armature::{Armature, NodeId};
use super::binding::{RigBinding, RigBone, RIG_SLOT_COUNT};
use super::mask::BoneMask;
use crate::config::RetargetConfig;
use crate::math::{angle_deg, blend_from_identity, from_to_rotation, ortho_normalize, reject};
use crate::skeleton::{JointIndex, MAX_TRACKED};
use crate::tracker::TrackedSkeleton;

/// センサーの背骨は腰から約40度後ろに傾いて報告される
pub const SPINE_BACK_TILT_DEG: f32 = 40.0;

/// 毎フレームの更新条件
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetargetSettings {
    /// 論理プレイヤー (0 or 1)
    pub player: usize,
    pub mask: BoneMask,
    /// 0.0 で無効、1.0 で計算した回転をそのまま適用
    pub blend_weight: f32,
    /// false なら毎フレーム基本姿勢に戻してから回転する
    pub animated: bool,
}

impl RetargetSettings {
    pub fn from_config(config: &RetargetConfig) -> Result<Self> {
        if config.player >= MAX_TRACKED {
            bail!("Retarget player must be 0 or 1, got {}", config.player);
        }
        Ok(Self {
            player: config.player,
            mask: BoneMask::from_names(&config.mask)?,
            blend_weight: config.blend_weight,
            animated: config.animated,
        })
    }
}

impl Default for RetargetSettings {
    fn default() -> Self {
        Self {
            player: 0,
            mask: BoneMask::ALL,
            blend_weight: 1.0,
            animated: false,
        }
    }
}

/// 背骨更新前の腰の向き（ワールド座標）
struct HipReference {
    node: NodeId,
    up: Vector3<f32>,
    right: Vector3<f32>,
}

/// スケルトンの関節位置からリグのボーン回転を解く
///
/// 初期化時に基本姿勢の回転とボーン方向（ボーン空間）を記録し、以降は
/// 読み取り専用。各フレームで記録したボーン方向を目標方向へ向ける最短回転を
/// ローカル回転に右から掛ける。
#[derive(Debug, Clone)]
pub struct RigRetargeter {
    binding: RigBinding,
    base_rotation: [Option<UnitQuaternion<f32>>; JointIndex::COUNT],
    /// 方向が決まらない関節は None（更新しない）
    bone_dir: [Option<Vector3<f32>>; JointIndex::COUNT],
    /// 腰の右方向（腰オーバーライドのボーン空間）
    hip_right: Vector3<f32>,
    /// 胸の右方向（背骨関節ノードのボーン空間）
    chest_right: Vector3<f32>,
}

impl RigRetargeter {
    /// 基本姿勢のリグから回転・ボーン方向を記録する
    pub fn initialize<A: Armature>(armature: &A, binding: RigBinding) -> Result<Self> {
        if binding.bound_joint_count() == 0 {
            bail!("Rig has no joints bound");
        }
        let node_count = armature.node_count();
        if binding.root().0 >= node_count {
            bail!("Rig root node {} is not in the armature", binding.root().0);
        }
        for slot in 0..RIG_SLOT_COUNT {
            if let Some(node) = binding.slot(slot) {
                if node.0 >= node_count {
                    bail!("Rig slot {} refers to missing node {}", slot, node.0);
                }
            }
        }

        let pos = |node: NodeId| armature.world_position(node);
        let hip_override = binding.joint(JointIndex::HipLeft);
        let hip_left = binding.bone(RigBone::HipLeft);
        let hip_right_node = binding.bone(RigBone::HipRight);
        let spine_node = binding.joint(JointIndex::Spine);

        let mut hip_right = match (hip_override, hip_left, hip_right_node) {
            (Some(o), Some(l), Some(r)) => armature.inverse_transform_direction(o, &(pos(r) - pos(l))),
            _ => Vector3::zeros(),
        };
        let mut chest_right = match (
            spine_node,
            binding.bone(RigBone::ShoulderLeft),
            binding.bone(RigBone::ShoulderRight),
        ) {
            (Some(s), Some(l), Some(r)) => armature.inverse_transform_direction(s, &(pos(r) - pos(l))),
            _ => Vector3::zeros(),
        };

        let mut base_rotation = [None; JointIndex::COUNT];
        let mut bone_dir = [None; JointIndex::COUNT];

        for joint in JointIndex::ALL {
            let i = joint.index();
            let Some(node) = binding.joint(joint) else {
                continue;
            };
            base_rotation[i] = Some(armature.local_rotation(node));

            // ボーンが指す先のワールド位置
            let toward: Option<Point3<f32>> = if joint.is_limb_end() {
                binding.extra_for(joint).map(pos)
            } else if joint == JointIndex::HipLeft {
                match (hip_left, hip_right_node) {
                    (Some(l), Some(r)) => Some(Point3::from((pos(l).coords + pos(r).coords) * 0.5)),
                    _ => binding.slot(i + 1).map(pos),
                }
            } else {
                binding.slot(i + 1).map(pos)
            };
            let Some(toward) = toward else {
                debug!(joint = joint.name(), "no bone direction; joint will not be driven");
                continue;
            };

            let mut dir = toward - pos(node);
            if joint == JointIndex::Spine {
                let root_rotation = armature.world_rotation(binding.root());
                let up = root_rotation * Vector3::y();
                let right = root_rotation * Vector3::x_axis();
                let angle = angle_deg(&up, &dir);
                let correction = UnitQuaternion::from_axis_angle(
                    &right,
                    (angle - SPINE_BACK_TILT_DEG).to_radians(),
                );
                dir = correction * dir;
            }

            let local = armature.inverse_transform_direction(node, &dir);
            if local.norm_squared() > 0.0 && local.iter().all(|c| c.is_finite()) {
                bone_dir[i] = Some(local);
            } else {
                debug!(joint = joint.name(), "degenerate bone direction; joint will not be driven");
            }
        }

        if let Some(spine_dir) = bone_dir[JointIndex::Spine.index()] {
            chest_right = reject(&chest_right, &spine_dir);
        }
        if let Some(hip_dir) = bone_dir[JointIndex::HipLeft.index()] {
            let (dir, right) = ortho_normalize(&hip_dir, &hip_right);
            bone_dir[JointIndex::HipLeft.index()] = Some(dir);
            hip_right = right;
        }

        info!(
            joints = binding.bound_joint_count(),
            driven = bone_dir.iter().filter(|d| d.is_some()).count(),
            "rig retargeter initialized"
        );

        Ok(Self {
            binding,
            base_rotation,
            bone_dir,
            hip_right,
            chest_right,
        })
    }

    pub fn binding(&self) -> &RigBinding {
        &self.binding
    }

    /// ボーン空間でのボーン方向
    pub fn bone_direction(&self, joint: JointIndex) -> Option<Vector3<f32>> {
        self.bone_dir[joint.index()]
    }

    pub fn base_rotation(&self, joint: JointIndex) -> Option<UnitQuaternion<f32>> {
        self.base_rotation[joint.index()]
    }

    pub fn chest_right(&self) -> Vector3<f32> {
        self.chest_right
    }

    pub fn hip_right(&self) -> Vector3<f32> {
        self.hip_right
    }

    /// `settings.player` のスケルトンでリグを更新する。回転させた関節数を返す
    pub fn update<A: Armature>(
        &self,
        armature: &mut A,
        skeletons: &[TrackedSkeleton],
        settings: &RetargetSettings,
    ) -> usize {
        if settings.blend_weight <= 0.0 {
            return 0;
        }
        let Some(skeleton) = skeletons.get(settings.player) else {
            return 0;
        };

        let mut rotated = 0;
        for joint in JointIndex::ALL {
            if !settings.mask.contains(joint) {
                continue;
            }
            let Some(node) = self.binding.joint(joint) else {
                continue;
            };
            if self.rotate_joint(armature, node, joint, skeleton, settings) {
                rotated += 1;
            }
        }
        rotated
    }

    fn rotate_joint<A: Armature>(
        &self,
        armature: &mut A,
        node: NodeId,
        joint: JointIndex,
        skeleton: &TrackedSkeleton,
        settings: &RetargetSettings,
    ) -> bool {
        let i = joint.index();
        if !skeleton.is_tracked(joint) {
            return false;
        }
        let (Some(dir), Some(base)) = (self.bone_dir[i], self.base_rotation[i]) else {
            return false;
        };

        let hip_reference = if joint == JointIndex::Spine {
            self.hip_reference(armature)
        } else {
            None
        };

        if !settings.animated {
            armature.set_local_rotation(node, base);
        }

        let Some(target) = Self::target_direction(joint, skeleton) else {
            return false;
        };
        let root_rotation = armature.world_rotation(self.binding.root());
        let to_local = |armature: &A, v: Vector3<f32>| {
            armature.inverse_transform_direction(node, &(root_rotation * v))
        };

        let mut quat = from_to_rotation(&dir, &to_local(armature, target));

        // 背骨は肩、腰オーバーライドは腰の左右でひねりを合わせる
        let twist = match joint {
            JointIndex::Spine => Some((self.chest_right, JointIndex::ShoulderLeft, JointIndex::ShoulderRight)),
            JointIndex::HipLeft => Some((self.hip_right, JointIndex::HipLeft, JointIndex::HipRight)),
            _ => None,
        };
        if let Some((reference, left, right)) = twist {
            let across = skeleton.position(right) - skeleton.position(left);
            let across = reject(&to_local(armature, across), &dir);
            quat *= from_to_rotation(&reference, &across);
        }

        let quat = blend_from_identity(&quat, settings.blend_weight);
        let local = armature.local_rotation(node);
        armature.set_local_rotation(node, local * quat);

        // 背骨の回転で腰がずれないよう、腰オーバーライドを元の向きに戻す
        if let Some(hip) = hip_reference {
            if let Some(hip_dir) = self.bone_dir[JointIndex::HipLeft.index()] {
                Self::restore_bone(armature, hip.node, &hip_dir, &hip.up);
            }
            Self::restore_bone(armature, hip.node, &self.hip_right, &hip.right);
        }

        true
    }

    /// ワールド空間でのボーンの目標方向
    fn target_direction(joint: JointIndex, skeleton: &TrackedSkeleton) -> Option<Vector3<f32>> {
        let pos = |j: JointIndex| skeleton.position(j);
        match joint {
            JointIndex::HipLeft => {
                let mid = (pos(JointIndex::HipLeft).coords + pos(JointIndex::HipRight).coords) * 0.5;
                Some(mid - pos(JointIndex::HipCenter).coords)
            }
            JointIndex::ShoulderLeft | JointIndex::ShoulderRight => {
                Some(pos(joint) - pos(JointIndex::ShoulderCenter))
            }
            _ => {
                let previous = JointIndex::from_index(joint.index().checked_sub(1)?)?;
                Some(pos(joint) - pos(previous))
            }
        }
    }

    fn hip_reference<A: Armature>(&self, armature: &A) -> Option<HipReference> {
        let node = self.binding.joint(JointIndex::HipLeft)?;
        let left = armature.world_position(self.binding.bone(RigBone::HipLeft)?);
        let right = armature.world_position(self.binding.bone(RigBone::HipRight)?);
        let mid = Point3::from((left.coords + right.coords) * 0.5);
        Some(HipReference {
            node,
            up: mid - armature.world_position(node),
            right: right - left,
        })
    }

    /// ボーン空間の `dir` がワールド方向 `target` を向くよう回転を足す
    fn restore_bone<A: Armature>(
        armature: &mut A,
        node: NodeId,
        dir: &Vector3<f32>,
        target: &Vector3<f32>,
    ) {
        let target = armature.inverse_transform_direction(node, target);
        let quat = from_to_rotation(dir, &target);
        let local = armature.local_rotation(node);
        armature.set_local_rotation(node, local * quat);
    }
}
