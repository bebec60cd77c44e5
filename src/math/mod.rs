//! 粒子系统使用的数学工具
//!
//! - `ranged` - 随机区间与随生命周期插值的参数
//! - `rotate` - 角度制的坐标平面旋转

pub mod ranged;
pub mod rotate;

pub use ranged::{Lerp, PickWithin, RangedParameter, Tween, ValueRange};
pub use rotate::{rotate_xy_by, rotate_xz_by, rotate_yz_by};

/// 除以生命周期前加上的小量，避免零长度生命周期时除零
pub const LIFETIME_EPSILON: f32 = 0.1;
