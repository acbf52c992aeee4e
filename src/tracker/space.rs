use nalgebra::{Matrix4, Point3, Rotation3, Vector3, Vector4};

use crate::sensor::SensorMount;

/// センサー座標 → ワールド座標の固定アフィン変換
///
/// 平行移動 `(-cx, h - cy, -cz)` → X軸まわりに `-tilt` 回転 → 軸反転
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpaceTransformer {
    kinect_to_world: Matrix4<f32>,
}

impl SpaceTransformer {
    pub fn new(height: f32, center: Vector3<f32>, look_at: Vector4<f32>, flip: Matrix4<f32>) -> Self {
        let tilt = f32::atan2(look_at.y + center.y - height, look_at.z + center.z);

        let translation =
            Matrix4::new_translation(&Vector3::new(-center.x, height - center.y, -center.z));
        let rotation = Rotation3::from_axis_angle(&Vector3::x_axis(), -tilt).to_homogeneous();

        Self {
            kinect_to_world: flip * translation * rotation,
        }
    }

    /// `flip` は反転行列の対角成分
    pub fn from_mount(mount: &SensorMount, flip: [f32; 3]) -> Self {
        Self::new(
            mount.height,
            mount.center,
            mount.look_at,
            Matrix4::new_nonuniform_scaling(&Vector3::from(flip)),
        )
    }

    pub fn to_world(&self, sensor_point: &Point3<f32>) -> Point3<f32> {
        self.kinect_to_world.transform_point(sensor_point)
    }

    pub fn matrix(&self) -> &Matrix4<f32> {
        &self.kinect_to_world
    }
}

impl Default for SpaceTransformer {
    fn default() -> Self {
        Self {
            kinect_to_world: Matrix4::identity(),
        }
    }
}
