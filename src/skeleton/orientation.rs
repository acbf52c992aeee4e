use nalgebra::{UnitQuaternion, Vector3};

use super::frame::SkeletonData;
use super::joint::{JointIndex, JointTrackingState};
use crate::math::from_to_rotation;

/// 関節ごとのボーン回転
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneOrientation {
    /// 親ボーン基準の回転
    pub local: UnitQuaternion<f32>,
    /// センサー座標系での回転
    pub absolute: UnitQuaternion<f32>,
}

impl Default for BoneOrientation {
    fn default() -> Self {
        Self {
            local: UnitQuaternion::identity(),
            absolute: UnitQuaternion::identity(),
        }
    }
}

/// 関節位置からボーン回転を求める
///
/// 各ボーンのY軸を親→子の向きに合わせる。ルート（腰中心）は
/// 左腰→右腰をX軸とする。未追跡の関節は親の回転を引き継ぐ。
pub fn compute_bone_orientations(skeleton: &SkeletonData) -> [BoneOrientation; JointIndex::COUNT] {
    let mut result = [BoneOrientation::default(); JointIndex::COUNT];

    for joint in JointIndex::ALL {
        let tracked = skeleton.joint_state(joint) != JointTrackingState::NotTracked;

        let Some(parent) = joint.parent() else {
            let across = skeleton.joint_position(JointIndex::HipRight)
                - skeleton.joint_position(JointIndex::HipLeft);
            let absolute = from_to_rotation(&Vector3::x(), &across);
            result[joint.index()] = BoneOrientation {
                local: absolute,
                absolute,
            };
            continue;
        };

        let parent_absolute = result[parent.index()].absolute;
        let absolute = if tracked {
            let bone = skeleton.joint_position(joint) - skeleton.joint_position(parent);
            from_to_rotation(&Vector3::y(), &bone)
        } else {
            parent_absolute
        };

        result[joint.index()] = BoneOrientation {
            local: parent_absolute.inverse() * absolute,
            absolute,
        };
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn straight_skeleton() -> SkeletonData {
        let mut data = SkeletonData::default();
        for joint in JointIndex::ALL {
            data.joint_states[joint.index()] = JointTrackingState::Tracked;
        }
        data.joint_positions[JointIndex::HipCenter.index()] = Point3::new(0.0, 0.0, 2.0);
        data.joint_positions[JointIndex::Spine.index()] = Point3::new(0.0, 0.2, 2.0);
        data.joint_positions[JointIndex::HipLeft.index()] = Point3::new(-0.1, -0.05, 2.0);
        data.joint_positions[JointIndex::HipRight.index()] = Point3::new(0.1, -0.05, 2.0);
        data.joint_positions[JointIndex::KneeLeft.index()] = Point3::new(0.3, -0.05, 2.0);
        data
    }

    #[test]
    fn test_absolute_points_along_bone() {
        let data = straight_skeleton();
        let bones = compute_bone_orientations(&data);

        // 腰→背骨は真上: 回転なし
        assert!(bones[JointIndex::Spine.index()].absolute.angle() < 1e-5);

        // 膝は左腰から +X 方向
        let knee = bones[JointIndex::KneeLeft.index()].absolute * Vector3::y();
        assert!((knee - Vector3::x()).norm() < 1e-5);
    }

    #[test]
    fn test_local_composes_to_absolute() {
        let data = straight_skeleton();
        let bones = compute_bone_orientations(&data);
        for joint in JointIndex::ALL {
            if let Some(parent) = joint.parent() {
                let composed = bones[parent.index()].absolute * bones[joint.index()].local;
                assert!(composed.angle_to(&bones[joint.index()].absolute) < 1e-4);
            }
        }
    }

    #[test]
    fn test_untracked_joint_inherits_parent() {
        let mut data = straight_skeleton();
        data.joint_states[JointIndex::KneeLeft.index()] = JointTrackingState::NotTracked;
        let bones = compute_bone_orientations(&data);
        let knee = bones[JointIndex::KneeLeft.index()];
        assert_eq!(knee.absolute, bones[JointIndex::HipLeft.index()].absolute);
        assert!(knee.local.angle() < 1e-6);
    }
}
