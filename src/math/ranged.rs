//! 随机区间参数
//!
//! 粒子的几乎所有物理量和视觉量都是一个随时间插值的随机区间：
//! 发射器开始时使用 `start` 区间，结束时使用 `end` 区间，中间线性混合。

use glam::{Vec2, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// 可线性插值的值
pub trait Lerp: Copy {
    /// `self·(1-f) + other·f`
    ///
    /// 使用这种写法而不是 `self + (other - self)·f`，保证 f=0 与 f=1 时精确返回端点。
    fn lerp_to(self, other: Self, f: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp_to(self, other: Self, f: f32) -> Self {
        // 端点相同时直接返回，常量参数在任意位置都精确
        if self == other {
            return self;
        }
        self * (1.0 - f) + other * f
    }
}

impl Lerp for Vec2 {
    fn lerp_to(self, other: Self, f: f32) -> Self {
        Vec2::new(self.x.lerp_to(other.x, f), self.y.lerp_to(other.y, f))
    }
}

impl Lerp for Vec3 {
    fn lerp_to(self, other: Self, f: f32) -> Self {
        Vec3::new(
            self.x.lerp_to(other.x, f),
            self.y.lerp_to(other.y, f),
            self.z.lerp_to(other.z, f),
        )
    }
}

/// 可在区间内均匀采样的值
pub trait PickWithin: Copy {
    /// 在 `[min, max]` 内均匀采样（逐分量）
    fn pick_within<R: Rng + ?Sized>(min: Self, max: Self, rng: &mut R) -> Self;
}

impl PickWithin for f32 {
    fn pick_within<R: Rng + ?Sized>(min: Self, max: Self, rng: &mut R) -> Self {
        // 零宽区间时 (max - min) 为 0，结果精确等于 min
        min + (max - min) * rng.gen::<f32>()
    }
}

impl PickWithin for Vec2 {
    fn pick_within<R: Rng + ?Sized>(min: Self, max: Self, rng: &mut R) -> Self {
        Vec2::new(
            f32::pick_within(min.x, max.x, rng),
            f32::pick_within(min.y, max.y, rng),
        )
    }
}

impl PickWithin for Vec3 {
    fn pick_within<R: Rng + ?Sized>(min: Self, max: Self, rng: &mut R) -> Self {
        Vec3::new(
            f32::pick_within(min.x, max.x, rng),
            f32::pick_within(min.y, max.y, rng),
            f32::pick_within(min.z, max.z, rng),
        )
    }
}

/// 闭区间 `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange<T> {
    pub min: T,
    pub max: T,
}

impl<T: Copy> ValueRange<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    /// 零宽区间
    pub fn constant(value: T) -> Self {
        Self {
            min: value,
            max: value,
        }
    }
}

impl<T: PickWithin> ValueRange<T> {
    /// 在区间内均匀采样
    pub fn pick_within<R: Rng + ?Sized>(&self, rng: &mut R) -> T {
        T::pick_within(self.min, self.max, rng)
    }
}

impl<T: Lerp> ValueRange<T> {
    fn interpolate(&self, other: &Self, f: f32) -> Self {
        Self {
            min: self.min.lerp_to(other.min, f),
            max: self.max.lerp_to(other.max, f),
        }
    }
}

impl<T: Copy + Default> Default for ValueRange<T> {
    fn default() -> Self {
        Self::constant(T::default())
    }
}

/// 随发射器生命周期变化的随机区间
///
/// `blend(0.0)` 精确等于 `start`，`blend(1.0)` 精确等于 `end`。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangedParameter<T> {
    pub start: ValueRange<T>,
    pub end: ValueRange<T>,
}

impl<T: Copy> RangedParameter<T> {
    pub fn new(start: ValueRange<T>, end: ValueRange<T>) -> Self {
        Self { start, end }
    }

    /// 整个生命周期使用同一个区间
    pub fn uniform(range: ValueRange<T>) -> Self {
        Self {
            start: range,
            end: range,
        }
    }

    /// 整个生命周期使用同一个值
    pub fn constant(value: T) -> Self {
        Self::uniform(ValueRange::constant(value))
    }
}

impl<T: Lerp> RangedParameter<T> {
    /// 计算生命周期位置 `fraction` 处的有效区间
    ///
    /// 调用方负责把 `fraction` 限制在 `[0, 1]`。
    pub fn blend(&self, fraction: f32) -> ValueRange<T> {
        self.start.interpolate(&self.end, fraction)
    }
}

impl<T: Copy + Default> Default for RangedParameter<T> {
    fn default() -> Self {
        Self::uniform(ValueRange::default())
    }
}

/// 起止两个确定值之间的插值（纹理透明度/缩放曲线、吸引器几何）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tween<T> {
    pub start: T,
    pub end: T,
}

impl<T: Copy> Tween<T> {
    pub fn new(start: T, end: T) -> Self {
        Self { start, end }
    }

    pub fn constant(value: T) -> Self {
        Self {
            start: value,
            end: value,
        }
    }
}

impl<T: Lerp> Tween<T> {
    pub fn blend(&self, fraction: f32) -> T {
        self.start.lerp_to(self.end, fraction)
    }
}

impl<T: Copy + Default> Default for Tween<T> {
    fn default() -> Self {
        Self::constant(T::default())
    }
}
