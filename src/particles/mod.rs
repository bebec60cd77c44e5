//! 粒子系统
//!
//! - `params` - 粒子与发射器参数
//! - `particle` - 单个粒子的运动、碰撞、动画与光照
//! - `spawner` - 按计划或持续生成粒子的发射器
//! - `manager` - 发射器与粒子的所有者，处理事件并推进模拟
//! - `event` - 网络线程与模拟线程之间的事件
//! - `texture` / `animation` / `appearance` - 贴图、动画与外观

pub mod animation;
pub mod appearance;
pub mod event;
pub mod manager;
pub mod params;
pub mod particle;
pub mod spawner;
pub mod texture;

#[cfg(test)]
pub(crate) mod test_support;

pub use animation::{AnimationParams, TileAnimation};
pub use appearance::{node_particle_appearance, ParticleAppearance};
pub use event::{ParticleEvent, ParticleEventQueue};
pub use manager::{ParticleManager, ParticleStats};
pub use params::{AttractorKind, CommonParticleParams, ParticleParameters, ParticleSpawnerParameters};
pub use particle::Particle;
pub use spawner::{ParticleSink, ParticleSpawner, SpawnerShared};
pub use texture::{build_texture_pool, BlendMode, ParticleTexture, ParticleTextureSpec, TexturePool};
