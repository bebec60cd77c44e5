//! 粒子外观：贴图、贴图子区域和基础颜色

use super::animation::TileAnimation;
use super::params::ParticleParameters;
use super::texture::ParticleTexture;
use crate::environment::{Color, ContentFeatures, TextureHandle, BS};
use glam::Vec2;
use rand::Rng;
use std::sync::Arc;

/// 粒子生成时确定的外观
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleAppearance {
    /// 带透明度/缩放曲线的贴图；节点粒子没有
    pub texture: Option<Arc<ParticleTexture>>,
    /// 实际绘制的贴图
    pub handle: TextureHandle,
    /// 贴图子区域左上角（归一化）
    pub texpos: Vec2,
    /// 贴图子区域尺寸（归一化）
    pub texsize: Vec2,
    pub color: Color,
}

impl ParticleAppearance {
    /// 使用整张贴图
    pub fn from_texture(texture: Arc<ParticleTexture>) -> Self {
        Self {
            handle: texture.handle.clone(),
            texture: Some(texture),
            texpos: Vec2::ZERO,
            texsize: Vec2::ONE,
            color: Color::WHITE,
        }
    }
}

/// 从节点内容定义推导粒子外观
///
/// 随机选择贴图上的一小块作为粒子图案，并把粒子尺寸设为随机的小尺寸。
/// 不可见（airlike）节点返回 `None`，不产生粒子。
pub fn node_particle_appearance<R: Rng + ?Sized>(
    features: &ContentFeatures,
    tile: u8,
    p: &mut ParticleParameters,
    rng: &mut R,
) -> Option<ParticleAppearance> {
    if features.is_airlike() {
        return None;
    }

    let texid = if (1..=6).contains(&tile) {
        usize::from(tile - 1)
    } else {
        rng.gen_range(0..=5)
    };
    let layer = &features.tiles[texid];
    p.common.animation = TileAnimation::None;

    let mut size = rng.gen_range(0..=8) as f32 / 64.0;
    p.size = BS * size;
    if layer.scale != 0 {
        size /= f32::from(layer.scale);
    }
    let texsize = Vec2::splat(size * 2.0);
    let texpos = Vec2::new(
        rng.gen_range(0..=64) as f32 / 64.0 - texsize.x,
        rng.gen_range(0..=64) as f32 / 64.0 - texsize.y,
    );

    Some(ParticleAppearance {
        texture: None,
        handle: layer.particle_texture().clone(),
        texpos,
        texsize,
        color: layer.color.unwrap_or(features.color),
    })
}
