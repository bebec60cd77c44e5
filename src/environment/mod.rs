//! 外部协作者接口
//!
//! 粒子系统不直接依赖地图、碰撞或资源系统，只通过本模块定义的 trait 访问它们：
//!
//! - [`ClientEnvironment`] - 地图光照、昼夜比例、相机偏移、玩家视角、可移动对象
//! - [`CollisionResolver`] - 轴对齐包围盒的碰撞移动
//! - [`NodeDefManager`] - 内容定义（贴图、颜色、绘制类型）
//! - [`TextureSource`] - 按名称获取贴图
//!
//! 所有坐标都以节点为单位；只有粒子尺寸和渲染顶点使用 [`BS`] 缩放的渲染单位。

pub mod light;
pub mod node;

use glam::{IVec3, Mat4, UVec2, Vec3};
use std::sync::Arc;

pub use light::{blend_light, decode_light, LightBank, LIGHT_MAX, LIGHT_SUN};
pub use node::{Color, ContentFeatures, ContentId, DrawType, MapNode, TileLayer};

/// 每个节点对应的渲染单位
pub const BS: f32 = 10.0;

/// 贴图句柄
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TextureHandle {
    /// 资源系统分配的ID
    pub id: u32,
    /// 像素尺寸
    pub size: UVec2,
}

impl TextureHandle {
    pub fn new(id: u32, width: u32, height: u32) -> Self {
        Self {
            id,
            size: UVec2::new(width, height),
        }
    }
}

/// 本地玩家的视角信息
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerView {
    /// 位置（节点单位）
    pub position: Vec3,
    /// 偏航角（角度）
    pub yaw: f32,
    /// 俯仰角（角度）
    pub pitch: f32,
    /// 移动重力加速度（节点/秒²）
    pub movement_gravity: f32,
    /// 物理覆盖的重力倍率
    pub gravity_factor: f32,
}

impl Default for PlayerView {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            movement_gravity: 9.81,
            gravity_factor: 1.0,
        }
    }
}

/// 客户端环境查询
pub trait ClientEnvironment: Send + Sync {
    /// 节点光照；位置未加载时返回 `None`
    fn node_light(&self, pos: IVec3) -> Option<LightBank>;

    /// 昼夜比例（0 = 夜，1000 = 昼）
    fn day_night_ratio(&self) -> u32;

    /// 相机偏移（节点单位）
    fn camera_offset(&self) -> IVec3;

    /// 本地玩家
    fn player(&self) -> PlayerView;

    /// 可移动对象的绝对位置/旋转矩阵；对象未加载时返回 `None`
    fn object_transform(&self, id: u16) -> Option<Mat4>;

    /// 可移动对象的绝对位置
    fn object_position(&self, id: u16) -> Option<Vec3>;
}

/// 轴对齐包围盒（相对于粒子中心）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// 以原点为中心、半边长为 `half_extent` 的立方体
    pub fn cube(half_extent: f32) -> Self {
        Self {
            min: Vec3::splat(-half_extent),
            max: Vec3::splat(half_extent),
        }
    }
}

/// 碰撞移动的输入
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionMoveInput {
    pub collision_box: Aabb,
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub dtime: f32,
    /// 是否与可移动对象碰撞
    pub object_collision: bool,
}

/// 碰撞移动的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionMoveResult {
    /// 修正后的位置
    pub position: Vec3,
    /// 修正后的速度
    pub velocity: Vec3,
    pub collides: bool,
}

/// 碰撞解算器
pub trait CollisionResolver: Send + Sync {
    fn collision_move(&self, input: &CollisionMoveInput) -> CollisionMoveResult;
}

/// 内容定义查询
pub trait NodeDefManager: Send + Sync {
    fn get(&self, node: MapNode) -> ContentFeatures;
}

/// 贴图资源加载
pub trait TextureSource: Send + Sync {
    fn get_texture(&self, name: &str) -> TextureHandle;
}

/// 粒子系统需要的全部协作者
#[derive(Clone)]
pub struct ParticleContext {
    pub env: Arc<dyn ClientEnvironment>,
    pub collision: Arc<dyn CollisionResolver>,
    pub nodedef: Arc<dyn NodeDefManager>,
    pub textures: Arc<dyn TextureSource>,
}

impl ParticleContext {
    pub fn new(
        env: Arc<dyn ClientEnvironment>,
        collision: Arc<dyn CollisionResolver>,
        nodedef: Arc<dyn NodeDefManager>,
        textures: Arc<dyn TextureSource>,
    ) -> Self {
        Self {
            env,
            collision,
            nodedef,
            textures,
        }
    }
}

/// 将节点单位的位置取整到最近的节点坐标
pub fn float_to_node(pos: Vec3) -> IVec3 {
    (pos + Vec3::splat(0.5)).floor().as_ivec3()
}
