use anyhow::{Context, Result};
use nalgebra::{Point3, UnitQuaternion, Vector3};
use std::f32::consts::PI;

use super::armature::Hierarchy;
use super::binding::{RigBinding, RigBone};
use super::retarget::SPINE_BACK_TILT_DEG;
use crate::sensor::Recording;
use crate::skeleton::{JointIndex, JointTrackingState, SkeletonFrame, SkeletonTrackingState};
use crate::tracker::SpaceTransformer;

/// 基本姿勢での関節位置（ワールド座標、+X が体の左、+Z が正面）
pub fn bind_pose_joints() -> [Point3<f32>; JointIndex::COUNT] {
    let mut joints = [Point3::origin(); JointIndex::COUNT];
    let mut set = |joint: JointIndex, x: f32, y: f32, z: f32| {
        joints[joint.index()] = Point3::new(x, y, z);
    };
    set(JointIndex::HipCenter, 0.0, 1.0, 0.0);
    set(JointIndex::Spine, 0.0, 1.2, 0.0);
    set(JointIndex::ShoulderCenter, 0.0, 1.5, 0.0);
    set(JointIndex::Head, 0.0, 1.7, 0.0);
    for (side, sx) in [(0, 1.0), (1, -1.0)] {
        let arm = if side == 0 {
            [JointIndex::ShoulderLeft, JointIndex::ElbowLeft, JointIndex::WristLeft, JointIndex::HandLeft]
        } else {
            [JointIndex::ShoulderRight, JointIndex::ElbowRight, JointIndex::WristRight, JointIndex::HandRight]
        };
        for (joint, x) in arm.into_iter().zip([0.2, 0.45, 0.7, 0.8]) {
            set(joint, sx * x, 1.45, 0.0);
        }
        let leg = if side == 0 {
            [JointIndex::HipLeft, JointIndex::KneeLeft, JointIndex::AnkleLeft, JointIndex::FootLeft]
        } else {
            [JointIndex::HipRight, JointIndex::KneeRight, JointIndex::AnkleRight, JointIndex::FootRight]
        };
        for (joint, (y, z)) in leg.into_iter().zip([(0.95, 0.0), (0.5, 0.0), (0.08, 0.0), (0.0, 0.12)]) {
            set(joint, sx * 0.1, y, z);
        }
    }
    joints
}

/// デモ用の人型リグを基本姿勢で組み立てる
pub fn build_humanoid() -> Result<(Hierarchy, RigBinding)> {
    let joints = bind_pose_joints();
    let at = |joint: JointIndex| joints[joint.index()];

    let mut h = Hierarchy::new();
    let root = h.add_root("rig", Point3::origin());

    let hip_center = h.add_child_at(root, RigBone::HipCenter.name(), at(JointIndex::HipCenter))?;
    let spine = h.add_child_at(hip_center, RigBone::Spine.name(), at(JointIndex::Spine))?;
    let shoulder_center =
        h.add_child_at(spine, RigBone::ShoulderCenter.name(), at(JointIndex::ShoulderCenter))?;
    h.add_child_at(shoulder_center, RigBone::Head.name(), at(JointIndex::Head))?;

    let arms = [
        (
            RigBone::CollarLeft,
            [RigBone::ShoulderLeft, RigBone::ElbowLeft, RigBone::WristLeft, RigBone::HandLeft],
            [JointIndex::ShoulderLeft, JointIndex::ElbowLeft, JointIndex::WristLeft, JointIndex::HandLeft],
        ),
        (
            RigBone::CollarRight,
            [RigBone::ShoulderRight, RigBone::ElbowRight, RigBone::WristRight, RigBone::HandRight],
            [JointIndex::ShoulderRight, JointIndex::ElbowRight, JointIndex::WristRight, JointIndex::HandRight],
        ),
    ];
    for (collar, bones, positions) in arms {
        let mut parent = h.add_child_at(shoulder_center, collar.name(), at(JointIndex::ShoulderCenter))?;
        for (bone, joint) in bones.into_iter().zip(positions) {
            parent = h.add_child_at(parent, bone.name(), at(joint))?;
        }
    }

    let hip_override = h.add_child_at(hip_center, RigBone::HipOverride.name(), at(JointIndex::HipCenter))?;
    let legs = [
        (
            [RigBone::HipLeft, RigBone::KneeLeft, RigBone::AnkleLeft, RigBone::FootLeft],
            [JointIndex::HipLeft, JointIndex::KneeLeft, JointIndex::AnkleLeft, JointIndex::FootLeft],
        ),
        (
            [RigBone::HipRight, RigBone::KneeRight, RigBone::AnkleRight, RigBone::FootRight],
            [JointIndex::HipRight, JointIndex::KneeRight, JointIndex::AnkleRight, JointIndex::FootRight],
        ),
    ];
    for (bones, positions) in legs {
        let mut parent = hip_override;
        for (bone, joint) in bones.into_iter().zip(positions) {
            parent = h.add_child_at(parent, bone.name(), at(joint))?;
        }
    }

    let binding = RigBinding::by_name(root, |name| h.find(name));
    Ok((h, binding))
}

/// センサーと同じく腰→背骨を後ろに倒す。上半身は背骨と一緒に平行移動する
fn lean_spine_back(world: &mut [Point3<f32>; JointIndex::COUNT]) {
    let hip = world[JointIndex::HipCenter.index()];
    let spine = world[JointIndex::Spine.index()];
    let tilt = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -SPINE_BACK_TILT_DEG.to_radians());
    let offset = hip + tilt * (spine - hip) - spine;
    for joint in JointIndex::Spine.index()..=JointIndex::HandRight.index() {
        world[joint] += offset;
    }
}

/// 左腕を振るデモ用の録画を作る（センサー座標に戻して格納）
///
/// `frames` フレームで腕を1往復させる。
pub fn wave_recording(space: &SpaceTransformer, frames: usize, interval_ms: f32) -> Result<Recording> {
    let to_sensor = space
        .matrix()
        .try_inverse()
        .context("Sensor transform is not invertible")?;

    let bind = bind_pose_joints();
    let shoulder = bind[JointIndex::ShoulderLeft.index()];
    let arm = [
        (JointIndex::ElbowLeft, 0.25),
        (JointIndex::WristLeft, 0.5),
        (JointIndex::HandLeft, 0.6),
    ];

    let mut recording = Recording::default();
    for i in 0..frames {
        let phase = i as f32 / frames.max(1) as f32;
        // 水平 (0) から真上 (PI/2) まで上げ下げする
        let raise = 0.5 * PI * 0.5 * (1.0 - (2.0 * PI * phase).cos());

        let mut world = bind;
        for (joint, reach) in arm {
            world[joint.index()] =
                shoulder + Vector3::new(raise.cos(), raise.sin(), 0.0) * reach;
        }
        lean_spine_back(&mut world);

        let mut frame = SkeletonFrame {
            timestamp_ms: (i as f32 * interval_ms).round() as i64,
            frame_number: i as u32,
            ..SkeletonFrame::default()
        };
        let skeleton = &mut frame.skeletons[0];
        skeleton.tracking_state = SkeletonTrackingState::SkeletonTracked;
        skeleton.tracking_id = 1;
        for joint in JointIndex::ALL {
            skeleton.joint_positions[joint.index()] =
                to_sensor.transform_point(&world[joint.index()]);
            skeleton.joint_states[joint.index()] = JointTrackingState::Tracked;
        }
        skeleton.position = skeleton.joint_position(JointIndex::HipCenter);
        recording.frames.push(frame);
    }
    Ok(recording)
}
