//! 统一错误处理模块
//!
//! 粒子系统对外暴露的错误类型。模拟过程本身不会失败：
//! 无效或缺失的数据一律降级处理（跳过生成、回退光照等），
//! 只有调用方可以纠正的情况才以错误返回。

use crate::config::ConfigError;
use thiserror::Error;

/// 粒子系统错误
#[derive(Error, Debug)]
pub enum ParticleError {
    #[error("Particle spawner {id} already exists")]
    DuplicateSpawner { id: u64 },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// 粒子系统结果类型别名
pub type ParticleResult<T> = Result<T, ParticleError>;
