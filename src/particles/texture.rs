//! 粒子贴图
//!
//! [`ParticleTextureSpec`] 是事件里携带的逻辑描述（贴图名 + 动画曲线），
//! [`ParticleTexture`] 是解析后的运行时贴图。发射器的贴图池和它生成的粒子
//! 通过 `Arc` 共同持有贴图，最后一个持有者释放时贴图随之释放。

use super::animation::TileAnimation;
use crate::environment::{TextureHandle, TextureSource};
use crate::math::Tween;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 混合模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Alpha,
    Add,
    Sub,
    Screen,
}

/// 贴图的逻辑描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleTextureSpec {
    pub name: String,
    /// 透明度随粒子寿命的变化
    pub alpha: Tween<f32>,
    /// 缩放随粒子寿命的变化
    pub scale: Tween<Vec2>,
    pub blend_mode: BlendMode,
    pub animation: TileAnimation,
}

impl Default for ParticleTextureSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            alpha: Tween::constant(1.0),
            scale: Tween::constant(Vec2::ONE),
            blend_mode: BlendMode::Alpha,
            animation: TileAnimation::None,
        }
    }
}

impl ParticleTextureSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// 已加载的粒子贴图
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleTexture {
    pub handle: TextureHandle,
    pub alpha: Tween<f32>,
    pub scale: Tween<Vec2>,
    pub blend_mode: BlendMode,
    pub animation: TileAnimation,
}

impl ParticleTexture {
    /// 通过贴图资源解析描述
    pub fn load(spec: &ParticleTextureSpec, source: &dyn TextureSource) -> Self {
        Self {
            handle: source.get_texture(&spec.name),
            alpha: spec.alpha,
            scale: spec.scale,
            blend_mode: spec.blend_mode,
            animation: spec.animation,
        }
    }

    pub fn is_animated(&self) -> bool {
        self.animation.is_animated()
    }
}

/// 发射器的共享贴图池
pub type TexturePool = Vec<Arc<ParticleTexture>>;

/// 构建贴图池：显式列表为空时使用后备贴图
pub fn build_texture_pool(
    texpool: &[ParticleTextureSpec],
    fallback: &ParticleTextureSpec,
    source: &dyn TextureSource,
) -> TexturePool {
    if texpool.is_empty() {
        vec![Arc::new(ParticleTexture::load(fallback, source))]
    } else {
        texpool
            .iter()
            .map(|spec| Arc::new(ParticleTexture::load(spec, source)))
            .collect()
    }
}
