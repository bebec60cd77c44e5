//! 粒子管理器
//!
//! 管理器拥有全部发射器和粒子，由模拟线程调用 [`ParticleManager::step`]，
//! 由网络线程调用 [`ParticleManager::handle_event`]（或推入事件队列）。
//!
//! ## 并发
//!
//! 内部有两把锁：发射器锁保护发射器表、待释放集合和发射器随机数生成器；
//! 粒子锁保护粒子列表和粒子随机数生成器。持有发射器锁时可以获取粒子锁，
//! 反之不行。已删除但仍有存活粒子的发射器移入待释放集合，
//! 直到活跃计数归零才真正释放，因此粒子持有的父引用在其存活期间始终有效。

use super::appearance::{node_particle_appearance, ParticleAppearance};
use super::event::{ParticleEvent, ParticleEventQueue};
use super::params::{ParticleParameters, ParticleSpawnerParameters};
use super::particle::Particle;
use super::spawner::{ParticleSink, ParticleSpawner};
use super::texture::{build_texture_pool, ParticleTexture};
use crate::config::ParticleConfig;
use crate::core::{ParticleError, ParticleResult};
use crate::environment::{MapNode, ParticleContext};
use crate::render::ParticleQuad;
use crossbeam_channel::{unbounded, Receiver, Sender};
use glam::{IVec3, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// 挖掘时生成的节点粒子数
const DIGGING_PARTICLE_COUNT: usize = 16;

/// 粒子随机数种子与发射器种子的差异
const PARTICLE_SEED_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

/// 获取锁；锁中毒时继续使用内部数据
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// 管理器统计信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParticleStats {
    pub particles: usize,
    pub spawners: usize,
    /// 已删除但仍有存活粒子的发射器
    pub dying_spawners: usize,
    /// 累计释放的发射器
    pub spawners_freed: u64,
}

struct SpawnerRegistry {
    live: HashMap<u64, ParticleSpawner>,
    dying: Vec<ParticleSpawner>,
    rng: StdRng,
    freed: u64,
}

impl SpawnerRegistry {
    /// 移除发射器；仍有存活粒子时移入待释放集合
    fn retire(&mut self, spawner: ParticleSpawner) {
        if spawner.has_active() {
            self.dying.push(spawner);
        } else {
            self.freed += 1;
        }
    }
}

struct ParticleList {
    particles: Vec<Particle>,
    rng: StdRng,
}

/// 粒子列表及其锁
struct ParticleStore {
    inner: Mutex<ParticleList>,
}

impl ParticleStore {
    fn lock(&self) -> MutexGuard<'_, ParticleList> {
        lock(&self.inner)
    }
}

impl ParticleSink for ParticleStore {
    fn add_particle(&self, particle: Particle) {
        self.lock().particles.push(particle);
    }

    fn reserve_particle_space(&self, additional: usize) {
        if let Err(err) = self.lock().particles.try_reserve(additional) {
            tracing::trace!(
                target: "particles",
                "Skipping reservation of {} particles: {}",
                additional,
                err
            );
        }
    }
}

/// 粒子管理器
pub struct ParticleManager {
    ctx: ParticleContext,
    config: ParticleConfig,
    spawners: Mutex<SpawnerRegistry>,
    particles: ParticleStore,
    event_sender: Sender<ParticleEvent>,
    event_receiver: Receiver<ParticleEvent>,
}

impl ParticleManager {
    pub fn new(config: ParticleConfig, ctx: ParticleContext) -> Self {
        let (event_sender, event_receiver) = unbounded();
        let spawner_rng = make_rng(config.seed);
        let particle_rng = make_rng(config.seed.map(|seed| seed ^ PARTICLE_SEED_SALT));
        tracing::info!(
            target: "particles",
            "Particle manager created (cull radius {}, seeded: {})",
            config.cull_radius,
            config.seed.is_some()
        );
        Self {
            ctx,
            config,
            spawners: Mutex::new(SpawnerRegistry {
                live: HashMap::new(),
                dying: Vec::new(),
                rng: spawner_rng,
                freed: 0,
            }),
            particles: ParticleStore {
                inner: Mutex::new(ParticleList {
                    particles: Vec::new(),
                    rng: particle_rng,
                }),
            },
            event_sender,
            event_receiver,
        }
    }

    pub fn config(&self) -> &ParticleConfig {
        &self.config
    }

    pub fn context(&self) -> &ParticleContext {
        &self.ctx
    }

    /// 跨线程事件队列的发送端
    pub fn event_queue(&self) -> ParticleEventQueue {
        ParticleEventQueue(self.event_sender.clone())
    }

    /// 推进一帧：先处理排队的事件，再推进发射器，最后推进粒子
    pub fn step(&self, dtime: f32) {
        self.process_queued_events();
        self.step_spawners(dtime);
        self.step_particles(dtime);
    }

    /// 处理排队的事件，返回处理数量
    pub fn process_queued_events(&self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.event_receiver.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// 推进发射器并释放已无存活粒子的待释放发射器
    pub fn step_spawners(&self, dtime: f32) {
        let mut guard = lock(&self.spawners);
        let SpawnerRegistry {
            live,
            dying,
            rng,
            freed,
        } = &mut *guard;

        let dying_before = dying.len();
        dying.retain(ParticleSpawner::has_active);
        let released = dying_before - dying.len();
        if released > 0 {
            *freed += released as u64;
            tracing::trace!(target: "particles", "Freed {} dying particle spawners", released);
        }

        let mut expired = Vec::new();
        for (&id, spawner) in live.iter_mut() {
            if spawner.is_expired() {
                expired.push(id);
            } else {
                spawner.step(dtime, &self.ctx, self.config.cull_radius, &self.particles, rng);
            }
        }

        for id in expired {
            if let Some(spawner) = guard.live.remove(&id) {
                tracing::debug!(target: "particles", "Particle spawner {} expired", id);
                guard.retire(spawner);
            }
        }
    }

    /// 推进粒子，移除已过期的粒子
    pub fn step_particles(&self, dtime: f32) {
        let mut guard = self.particles.lock();
        let ParticleList { particles, rng } = &mut *guard;

        let mut i = 0;
        while i < particles.len() {
            if particles[i].is_expired() {
                particles.swap_remove(i).release();
            } else {
                particles[i].step(dtime, &self.ctx, rng);
                i += 1;
            }
        }
    }

    /// 使用管理器的随机数生成器创建发射器
    pub fn create_spawner(
        &self,
        params: ParticleSpawnerParameters,
        attached_id: Option<u16>,
    ) -> ParticleSpawner {
        let texpool = build_texture_pool(
            &params.texpool,
            &params.common.texture,
            self.ctx.textures.as_ref(),
        );
        let mut guard = lock(&self.spawners);
        ParticleSpawner::new(params, attached_id, texpool, &self.particles, &mut guard.rng)
    }

    /// 注册发射器；ID 已存在时返回错误，原发射器不受影响
    pub fn add_particle_spawner(&self, id: u64, spawner: ParticleSpawner) -> ParticleResult<()> {
        let mut guard = lock(&self.spawners);
        Self::insert_spawner(&mut guard, id, spawner)
    }

    fn insert_spawner(
        registry: &mut SpawnerRegistry,
        id: u64,
        spawner: ParticleSpawner,
    ) -> ParticleResult<()> {
        if registry.live.contains_key(&id) {
            tracing::error!(target: "particles", "Particle spawner {} already exists", id);
            return Err(ParticleError::DuplicateSpawner { id });
        }
        registry.live.insert(id, spawner);
        Ok(())
    }

    /// 删除发射器；ID 不存在时无操作
    pub fn delete_particle_spawner(&self, id: u64) {
        let mut guard = lock(&self.spawners);
        Self::remove_spawner(&mut guard, id);
    }

    fn remove_spawner(registry: &mut SpawnerRegistry, id: u64) {
        if let Some(spawner) = registry.live.remove(&id) {
            tracing::debug!(
                target: "particles",
                "Deleting particle spawner {} ({} particles still alive)",
                id,
                spawner.active_count()
            );
            registry.retire(spawner);
        }
    }

    /// 为即将到来的粒子预留容量
    pub fn reserve_particle_space(&self, additional: usize) {
        self.particles.reserve_particle_space(additional);
    }

    pub fn add_particle(&self, particle: Particle) {
        self.particles.add_particle(particle);
    }

    /// 处理一个粒子事件
    pub fn handle_event(&self, event: ParticleEvent) {
        match event {
            ParticleEvent::DeleteSpawner { id } => self.delete_particle_spawner(id),
            ParticleEvent::AddSpawner {
                id,
                attached_id,
                params,
            } => self.replace_spawner(id, attached_id, *params),
            ParticleEvent::SpawnParticle { params } => self.spawn_single(*params),
        }
    }

    /// 添加发射器；同 ID 的旧发射器先被删除
    fn replace_spawner(&self, id: u64, attached_id: Option<u16>, params: ParticleSpawnerParameters) {
        let texpool = build_texture_pool(
            &params.texpool,
            &params.common.texture,
            self.ctx.textures.as_ref(),
        );

        let mut guard = lock(&self.spawners);
        Self::remove_spawner(&mut guard, id);
        let spawner =
            ParticleSpawner::new(params, attached_id, texpool, &self.particles, &mut guard.rng);
        tracing::debug!(
            target: "particles",
            "Adding particle spawner {} (amount {}, time {})",
            id,
            spawner.remaining(),
            spawner.parameters().time
        );
        if let Err(err) = Self::insert_spawner(&mut guard, id, spawner) {
            tracing::error!(target: "particles", "Failed to add particle spawner {}: {}", id, err);
        }
    }

    fn spawn_single(&self, mut p: ParticleParameters) {
        let configured_size = p.size;

        let appearance = match p.common.node {
            Some(node) => {
                let features = self.ctx.nodedef.get(node);
                let mut guard = self.particles.lock();
                match node_particle_appearance(&features, p.common.node_tile, &mut p, &mut guard.rng)
                {
                    Some(appearance) => appearance,
                    None => return,
                }
            }
            None => {
                let texture = ParticleTexture::load(&p.common.texture, self.ctx.textures.as_ref());
                ParticleAppearance::from_texture(Arc::new(texture))
            }
        };

        if configured_size > 0.0 {
            p.size = configured_size;
        }
        p.common.animation.sync_with_lifetime(p.expiration_time);

        let particle = Particle::new(p, appearance, None, self.ctx.env.as_ref());
        self.add_particle(particle);
    }

    /// 挖掘节点时生成碎屑粒子
    pub fn add_digging_particles(&self, pos: IVec3, node: MapNode) {
        if self.ctx.nodedef.get(node).is_airlike() {
            return;
        }
        for _ in 0..DIGGING_PARTICLE_COUNT {
            self.add_node_particle(pos, node);
        }
    }

    /// 在节点位置生成一个受重力影响的碎屑粒子
    pub fn add_node_particle(&self, pos: IVec3, node: MapNode) {
        let features = self.ctx.nodedef.get(node);
        let player = self.ctx.env.player();

        let prepared = {
            let mut guard = self.particles.lock();
            let rng = &mut guard.rng;
            let mut p = ParticleParameters::default();
            node_particle_appearance(&features, 0, &mut p, rng).map(|appearance| {
                p.expiration_time = rng.gen_range(0..=100) as f32 / 100.0;
                p.vel = Vec3::new(
                    rng.gen_range(-1.5..1.5),
                    rng.gen_range(0.0..3.0),
                    rng.gen_range(-1.5..1.5),
                );
                p.acc = Vec3::new(0.0, -player.movement_gravity * player.gravity_factor, 0.0);
                p.pos = pos.as_vec3()
                    + Vec3::new(
                        rng.gen_range(0.0..0.5) - 0.25,
                        rng.gen_range(0.0..0.5) - 0.25,
                        rng.gen_range(0.0..0.5) - 0.25,
                    );
                (p, appearance)
            })
        };

        if let Some((p, appearance)) = prepared {
            let particle = Particle::new(p, appearance, None, self.ctx.env.as_ref());
            self.add_particle(particle);
        }
    }

    /// 清除全部发射器与粒子
    pub fn clear_all(&self) {
        let mut spawners = lock(&self.spawners);
        let mut particles = self.particles.lock();
        let removed_spawners = spawners.live.len() + spawners.dying.len();
        spawners.freed += removed_spawners as u64;
        spawners.live.clear();
        spawners.dying.clear();
        let removed_particles = particles.particles.len();
        particles.particles.clear();
        tracing::debug!(
            target: "particles",
            "Cleared {} particle spawners and {} particles",
            removed_spawners,
            removed_particles
        );
    }

    pub fn particle_count(&self) -> usize {
        self.particles.lock().particles.len()
    }

    pub fn spawner_count(&self) -> usize {
        lock(&self.spawners).live.len()
    }

    pub fn dying_spawner_count(&self) -> usize {
        lock(&self.spawners).dying.len()
    }

    pub fn has_spawner(&self, id: u64) -> bool {
        lock(&self.spawners).live.contains_key(&id)
    }

    /// 发射器仍存活的子粒子数
    pub fn active_particles(&self, id: u64) -> Option<usize> {
        lock(&self.spawners)
            .live
            .get(&id)
            .map(ParticleSpawner::active_count)
    }

    /// 发射器的进程内序列号
    pub fn spawner_serial(&self, id: u64) -> Option<u64> {
        lock(&self.spawners).live.get(&id).map(ParticleSpawner::serial)
    }

    /// 列表中父发射器序列号为 `serial` 的粒子数
    pub fn particles_from(&self, serial: u64) -> usize {
        self.particles
            .lock()
            .particles
            .iter()
            .filter(|p| p.parent_serial() == Some(serial))
            .count()
    }

    pub fn stats(&self) -> ParticleStats {
        let spawners = lock(&self.spawners);
        let particles = self.particles.lock();
        ParticleStats {
            particles: particles.particles.len(),
            spawners: spawners.live.len(),
            dying_spawners: spawners.dying.len(),
            spawners_freed: spawners.freed,
        }
    }

    /// 生成全部粒子的渲染四边形
    pub fn collect_quads(&self) -> Vec<ParticleQuad> {
        let camera_offset = self.ctx.env.camera_offset();
        self.particles
            .lock()
            .particles
            .iter()
            .map(|particle| ParticleQuad::from_particle(particle, camera_offset))
            .collect()
    }
}
