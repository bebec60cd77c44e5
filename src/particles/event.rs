//! 粒子事件
//!
//! 网络线程把服务端消息转换为 [`ParticleEvent`]，可以直接调用
//! [`ParticleManager::handle_event`](super::ParticleManager::handle_event)，
//! 也可以推入 [`ParticleEventQueue`]，由模拟线程在下一次 `step` 开始时统一处理。

use super::params::{ParticleParameters, ParticleSpawnerParameters};
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

/// 粒子事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParticleEvent {
    /// 添加（或替换）发射器
    AddSpawner {
        id: u64,
        /// 附着的可移动对象（`None` 表示不附着）
        attached_id: Option<u16>,
        params: Box<ParticleSpawnerParameters>,
    },
    /// 删除发射器；其粒子继续存活直到自然过期
    DeleteSpawner { id: u64 },
    /// 生成单个粒子
    SpawnParticle { params: Box<ParticleParameters> },
}

/// 跨线程的事件队列
#[derive(Debug, Clone)]
pub struct ParticleEventQueue(pub(crate) Sender<ParticleEvent>);

impl ParticleEventQueue {
    /// 推入事件；管理器已释放时事件被丢弃
    pub fn push(&self, event: ParticleEvent) {
        if self.0.send(event).is_err() {
            tracing::warn!(target: "particles", "Dropping particle event, manager is gone");
        }
    }
}
