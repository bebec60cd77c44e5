//! 渲染适配
//!
//! 把粒子的模拟状态转换为与图形API无关的顶点数据：
//! 每个粒子一个四边形，顶点位置已减去相机偏移（渲染单位）。
//! 上传到GPU缓冲区由调用方完成，顶点结构可直接用 `bytemuck` 转换为字节。

pub mod quad;

pub use quad::{build_vertex_buffer, ParticleQuad, ParticleVertex, QUAD_INDICES};
