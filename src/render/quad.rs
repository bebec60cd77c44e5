//! 粒子四边形

use crate::environment::{TextureHandle, BS};
use crate::particles::{BlendMode, Particle};
use glam::IVec3;

/// 四边形的两个三角形
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

/// 粒子顶点（对应着色器输入）
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticleVertex {
    /// 位置（渲染单位，已减去相机偏移）
    pub position: [f32; 3],
    /// 颜色（已包含光照和透明度）
    pub color: [f32; 4],
    /// 贴图坐标
    pub uv: [f32; 2],
}

/// 一个粒子的可绘制四边形
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleQuad {
    pub vertices: [ParticleVertex; 4],
    pub texture: TextureHandle,
    pub blend_mode: BlendMode,
}

impl ParticleQuad {
    pub fn from_particle(particle: &Particle, camera_offset: IVec3) -> Self {
        let center = particle.position() * BS - camera_offset.as_vec3() * BS;
        let color = particle.color().to_f32_array();
        let corners = particle.corners();
        let uvs = particle.uvs();
        let vertices = std::array::from_fn(|i| ParticleVertex {
            position: (center + corners[i]).to_array(),
            color,
            uv: uvs[i].to_array(),
        });
        Self {
            vertices,
            texture: particle.texture_handle().clone(),
            blend_mode: particle.blend_mode(),
        }
    }
}

/// 按贴图和混合模式分组前的扁平顶点列表
pub fn build_vertex_buffer(quads: &[ParticleQuad]) -> Vec<ParticleVertex> {
    quads.iter().flat_map(|quad| quad.vertices).collect()
}
