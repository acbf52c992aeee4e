use nalgebra::{Quaternion, Unit, UnitQuaternion, Vector3};

/// ゼロ長判定の閾値
const EPSILON: f32 = 1e-6;

/// 計算に使えるベクトルか（有限かつ非ゼロ長）
fn is_usable(v: &Vector3<f32>) -> bool {
    v.iter().all(|c| c.is_finite()) && v.norm_squared() > EPSILON * EPSILON
}

/// `v` に直交する任意の単位ベクトル
fn any_orthogonal(v: &Vector3<f32>) -> Unit<Vector3<f32>> {
    // vと最も平行でない軸との外積をとる
    let axis = if v.x.abs() < v.y.abs() && v.x.abs() < v.z.abs() {
        Vector3::x()
    } else if v.y.abs() < v.z.abs() {
        Vector3::y()
    } else {
        Vector3::z()
    };
    Unit::new_normalize(v.cross(&axis))
}

/// `from` を `to` に重ねる最短回転
///
/// ゼロ長・非有限のベクトルでは回転なし（単位クォータニオン）を返す。
/// 逆向きのベクトルは直交軸まわりの180度回転になる。
pub fn from_to_rotation(from: &Vector3<f32>, to: &Vector3<f32>) -> UnitQuaternion<f32> {
    if !is_usable(from) || !is_usable(to) {
        return UnitQuaternion::identity();
    }

    match UnitQuaternion::rotation_between(from, to) {
        Some(q) if q.coords.iter().all(|c| c.is_finite()) => q,
        _ if from.dot(to) < 0.0 => {
            UnitQuaternion::from_axis_angle(&any_orthogonal(from), std::f32::consts::PI)
        }
        _ => UnitQuaternion::identity(),
    }
}

/// 単位回転から `rotation` へ重み `weight` (0.0..=1.0) で補間する
///
/// NLERP。w < 0 なら符号を反転して最短経路をとる。
pub fn blend_from_identity(rotation: &UnitQuaternion<f32>, weight: f32) -> UnitQuaternion<f32> {
    let t = weight.clamp(0.0, 1.0);
    let q = rotation.quaternion();
    let sign = if q.w < 0.0 { -1.0 } else { 1.0 };

    let blended = Quaternion::new(
        (1.0 - t) + t * sign * q.w,
        t * sign * q.i,
        t * sign * q.j,
        t * sign * q.k,
    );
    UnitQuaternion::try_new(blended, EPSILON).unwrap_or_else(UnitQuaternion::identity)
}

/// `v` から `onto` 方向の成分を取り除く
pub fn reject(v: &Vector3<f32>, onto: &Vector3<f32>) -> Vector3<f32> {
    let len_sq = onto.norm_squared();
    if len_sq <= EPSILON * EPSILON {
        return *v;
    }
    v - onto * (v.dot(onto) / len_sq)
}

/// `normal` を正規化し、`tangent` をそれに直交する単位ベクトルにする
///
/// 正規化できない成分は入力のまま返す。
pub fn ortho_normalize(
    normal: &Vector3<f32>,
    tangent: &Vector3<f32>,
) -> (Vector3<f32>, Vector3<f32>) {
    let n = normal.try_normalize(EPSILON).unwrap_or(*normal);
    let t = reject(tangent, &n).try_normalize(EPSILON).unwrap_or(*tangent);
    (n, t)
}

/// 2ベクトル間の角度（度）
pub fn angle_deg(a: &Vector3<f32>, b: &Vector3<f32>) -> f32 {
    if !is_usable(a) || !is_usable(b) {
        return 0.0;
    }
    a.angle(b).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq_vec(a: &Vector3<f32>, b: &Vector3<f32>, eps: f32) -> bool {
        (a - b).norm() < eps
    }

    #[test]
    fn test_from_to_rotation_aligns() {
        let from = Vector3::new(0.0, 1.0, 0.0);
        let to = Vector3::new(1.0, 1.0, 0.0);
        let q = from_to_rotation(&from, &to);
        let rotated = q * from;
        assert!(approx_eq_vec(&rotated.normalize(), &to.normalize(), 1e-5));
    }

    #[test]
    fn test_from_to_rotation_zero_length_is_identity() {
        let q = from_to_rotation(&Vector3::zeros(), &Vector3::x());
        assert_eq!(q, UnitQuaternion::identity());
        let q = from_to_rotation(&Vector3::x(), &Vector3::zeros());
        assert_eq!(q, UnitQuaternion::identity());
    }

    #[test]
    fn test_from_to_rotation_nan_is_identity() {
        let q = from_to_rotation(&Vector3::new(f32::NAN, 0.0, 0.0), &Vector3::y());
        assert_eq!(q, UnitQuaternion::identity());
    }

    #[test]
    fn test_from_to_rotation_opposite() {
        let from = Vector3::new(0.0, 0.0, 1.0);
        let to = Vector3::new(0.0, 0.0, -1.0);
        let q = from_to_rotation(&from, &to);
        assert!(approx_eq_vec(&(q * from), &to, 1e-5));
    }

    #[test]
    fn test_blend_endpoints() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 1.2);
        let zero = blend_from_identity(&q, 0.0);
        let full = blend_from_identity(&q, 1.0);
        assert!(zero.angle() < 1e-6);
        assert!(full.angle_to(&q) < 1e-5);
    }

    #[test]
    fn test_blend_monotonic() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 2.5);
        let mut prev = 0.0;
        for i in 1..=10 {
            let w = i as f32 / 10.0;
            let angle = blend_from_identity(&q, w).angle();
            assert!(angle >= prev, "w={}: {} < {}", w, angle, prev);
            prev = angle;
        }
        assert!((prev - 2.5).abs() < 1e-4);
    }

    #[test]
    fn test_blend_clamps_weight() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.7);
        assert!(blend_from_identity(&q, -3.0).angle() < 1e-6);
        assert!(blend_from_identity(&q, 5.0).angle_to(&q) < 1e-5);
    }

    #[test]
    fn test_reject_removes_component() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        let r = reject(&v, &Vector3::new(0.0, 2.0, 0.0));
        assert!(approx_eq_vec(&r, &Vector3::new(1.0, 0.0, 3.0), 1e-6));
        // ゼロベクトルへの射影は何もしない
        assert_eq!(reject(&v, &Vector3::zeros()), v);
    }

    #[test]
    fn test_ortho_normalize() {
        let (n, t) = ortho_normalize(&Vector3::new(0.0, 3.0, 0.0), &Vector3::new(1.0, 1.0, 0.0));
        assert!(approx_eq_vec(&n, &Vector3::y(), 1e-6));
        assert!(approx_eq_vec(&t, &Vector3::x(), 1e-6));
    }

    #[test]
    fn test_angle_deg() {
        assert!((angle_deg(&Vector3::x(), &Vector3::y()) - 90.0).abs() < 1e-4);
        assert_eq!(angle_deg(&Vector3::zeros(), &Vector3::y()), 0.0);
    }
}
