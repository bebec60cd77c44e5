//! 坐标平面内的旋转（角度制，绕原点）

use glam::Vec3;

/// 在 XZ 平面内旋转（绕 Y 轴）
pub fn rotate_xz_by(v: Vec3, degrees: f32) -> Vec3 {
    let (sn, cs) = degrees.to_radians().sin_cos();
    Vec3::new(v.x * cs - v.z * sn, v.y, v.x * sn + v.z * cs)
}

/// 在 YZ 平面内旋转（绕 X 轴）
pub fn rotate_yz_by(v: Vec3, degrees: f32) -> Vec3 {
    let (sn, cs) = degrees.to_radians().sin_cos();
    Vec3::new(v.x, v.y * cs - v.z * sn, v.y * sn + v.z * cs)
}

/// 在 XY 平面内旋转（绕 Z 轴）
pub fn rotate_xy_by(v: Vec3, degrees: f32) -> Vec3 {
    let (sn, cs) = degrees.to_radians().sin_cos();
    Vec3::new(v.x * cs - v.y * sn, v.x * sn + v.y * cs, v.z)
}
