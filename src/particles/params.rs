//! 粒子与发射器参数

use super::animation::TileAnimation;
use super::texture::ParticleTextureSpec;
use crate::environment::MapNode;
use crate::impl_default;
use crate::math::{RangedParameter, Tween, ValueRange};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// 吸引器几何类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttractorKind {
    #[default]
    None,
    /// 朝一个点吸引
    Point,
    /// 朝一条直线吸引（原点 + 方向）
    Line,
    /// 朝一个平面吸引（原点 + 法线）
    Plane,
}

/// 单个粒子与发射器共用的参数，生成粒子时从发射器原样复制
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonParticleParams {
    pub collision_detection: bool,
    /// 碰撞后立即移除
    pub collision_removal: bool,
    /// 是否与可移动对象碰撞
    pub object_collision: bool,
    /// 只绕竖直轴朝向玩家
    pub vertical: bool,
    pub texture: ParticleTextureSpec,
    pub animation: TileAnimation,
    /// 自发光等级
    pub glow: u8,
    /// 使用节点外观（`None` 表示使用贴图）
    pub node: Option<MapNode>,
    /// 节点面：0 = 随机，1..=6 = 指定面
    pub node_tile: u8,
}

impl_default!(CommonParticleParams {
    collision_detection: false,
    collision_removal: false,
    object_collision: false,
    vertical: false,
    texture: ParticleTextureSpec::default(),
    animation: TileAnimation::None,
    glow: 0,
    node: None,
    node_tile: 0,
});

/// 单个粒子的具体参数（已采样）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleParameters {
    pub common: CommonParticleParams,
    pub pos: Vec3,
    pub vel: Vec3,
    pub acc: Vec3,
    /// 逐轴阻力
    pub drag: Vec3,
    /// 每步随机扰动速度
    pub jitter: ValueRange<Vec3>,
    /// 反弹系数
    pub bounce: ValueRange<f32>,
    /// 寿命（秒）
    pub expiration_time: f32,
    /// 尺寸（渲染单位）
    pub size: f32,
}

impl_default!(ParticleParameters {
    common: CommonParticleParams::default(),
    pos: Vec3::ZERO,
    vel: Vec3::ZERO,
    acc: Vec3::ZERO,
    drag: Vec3::ZERO,
    jitter: ValueRange::default(),
    bounce: ValueRange::default(),
    expiration_time: 1.0,
    size: 1.0,
});

/// 发射器参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleSpawnerParameters {
    pub common: CommonParticleParams,
    /// 发射总数（持续模式下为每秒期望数减一）
    pub amount: u16,
    /// 发射器寿命（秒），0 表示持续发射
    pub time: f32,

    pub pos: RangedParameter<Vec3>,
    pub vel: RangedParameter<Vec3>,
    pub acc: RangedParameter<Vec3>,
    pub drag: RangedParameter<Vec3>,
    /// 球面位置扰动半径
    pub radius: RangedParameter<Vec3>,
    pub jitter: RangedParameter<Vec3>,
    pub bounce: RangedParameter<f32>,
    pub exptime: RangedParameter<f32>,
    pub size: RangedParameter<f32>,
    /// 吸引强度（负数为排斥）
    pub attract: RangedParameter<f32>,

    pub attractor_kind: AttractorKind,
    pub attractor_origin: Tween<Vec3>,
    pub attractor_direction: Tween<Vec3>,
    /// 吸引器原点跟随的对象ID（0 = 无）
    pub attractor_attachment: u16,
    /// 吸引器方向跟随的对象ID（0 = 无）
    pub attractor_direction_attachment: u16,
    /// 粒子越过吸引器后消失
    pub attractor_kill: bool,

    /// 贴图池；为空时使用 `common.texture`
    pub texpool: Vec<ParticleTextureSpec>,
}

impl_default!(ParticleSpawnerParameters {
    common: CommonParticleParams::default(),
    amount: 1,
    time: 1.0,
    pos: RangedParameter::default(),
    vel: RangedParameter::default(),
    acc: RangedParameter::default(),
    drag: RangedParameter::default(),
    radius: RangedParameter::default(),
    jitter: RangedParameter::default(),
    bounce: RangedParameter::default(),
    exptime: RangedParameter::constant(1.0),
    size: RangedParameter::constant(1.0),
    attract: RangedParameter::default(),
    attractor_kind: AttractorKind::None,
    attractor_origin: Tween::default(),
    attractor_direction: Tween::default(),
    attractor_attachment: 0,
    attractor_direction_attachment: 0,
    attractor_kill: false,
    texpool: Vec::new(),
});

impl ParticleSpawnerParameters {
    /// 是否为持续发射模式
    pub fn is_continuous(&self) -> bool {
        self.time == 0.0
    }

    /// 尺寸区间是否被显式配置；否则保留粒子的默认尺寸
    pub fn has_configured_size(&self) -> bool {
        self.size.start.max > 0.0 || self.size.end.max > 0.0
    }

    /// 估计同时可见的最大粒子数
    pub fn estimate_max_particles(&self) -> usize {
        let amount = f32::from(self.amount);
        let estimate = if self.is_continuous() {
            let longest_life = self.exptime.start.max.max(self.exptime.end.max);
            amount * longest_life
        } else {
            let shortest_life = self.exptime.start.min.min(self.exptime.end.min);
            if shortest_life <= 0.0 {
                0.0
            } else {
                amount / (self.time / shortest_life)
            }
        };
        if estimate.is_finite() && estimate > 0.0 {
            estimate as usize
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_max_particles() {
        let mut p = ParticleSpawnerParameters {
            amount: 100,
            time: 10.0,
            exptime: RangedParameter::uniform(ValueRange::new(2.0, 4.0)),
            ..Default::default()
        };
        // 10 秒内最多 5 代，100 / 5 = 20
        assert_eq!(p.estimate_max_particles(), 20);

        p.time = 0.0;
        p.amount = 10;
        assert_eq!(p.estimate_max_particles(), 40);

        p.exptime = RangedParameter::constant(0.0);
        p.time = 1.0;
        assert_eq!(p.estimate_max_particles(), 0);
    }

    #[test]
    fn test_configured_size() {
        let mut p = ParticleSpawnerParameters::default();
        assert!(p.has_configured_size());
        p.size = RangedParameter::constant(0.0);
        assert!(!p.has_configured_size());
    }
}
