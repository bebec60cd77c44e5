//! 体素节点与内容定义

use super::TextureHandle;
use serde::{Deserialize, Serialize};

/// 内容ID
pub type ContentId = u16;

/// 地图上的一个体素节点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MapNode {
    /// 内容ID
    pub content: ContentId,
    /// 附加参数（调色板索引、朝向等，由内容定义解释）
    #[serde(default)]
    pub param2: u8,
}

impl MapNode {
    pub fn new(content: ContentId) -> Self {
        Self { content, param2: 0 }
    }
}

/// 8位 RGBA 颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// 归一化到 `[0, 1]`
    pub fn to_f32_array(self) -> [f32; 4] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
            f32::from(self.a) / 255.0,
        ]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// 节点绘制类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DrawType {
    #[default]
    Normal,
    /// 不可见节点（空气等），不产生任何粒子
    AirLike,
    Liquid,
    GlassLike,
    PlantLike,
    Mesh,
}

/// 节点某个面的贴图层
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TileLayer {
    /// 静态贴图
    pub texture: TextureHandle,
    /// 动画帧（非空表示动画贴图，粒子只取第一帧）
    pub frames: Vec<TextureHandle>,
    /// 贴图缩放（0 表示不缩放）
    pub scale: u8,
    /// 贴图自带的颜色，覆盖节点颜色
    pub color: Option<Color>,
}

impl TileLayer {
    /// 粒子使用的贴图：动画贴图取第一帧
    pub fn particle_texture(&self) -> &TextureHandle {
        self.frames.first().unwrap_or(&self.texture)
    }
}

/// 内容定义
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContentFeatures {
    pub draw_type: DrawType,
    /// 六个面：+Y, -Y, +X, -X, +Z, -Z
    pub tiles: [TileLayer; 6],
    /// 节点颜色（贴图无颜色时使用）
    pub color: Color,
}

impl ContentFeatures {
    pub fn is_airlike(&self) -> bool {
        self.draw_type == DrawType::AirLike
    }
}
