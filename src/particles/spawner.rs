//! 粒子发射器
//!
//! 发射器按参数在一段时间内（或持续地）生成粒子。有限模式下，创建时
//! 预先抽样 `amount + 1` 个发射时刻；持续模式下每一步按概率发射。
//!
//! 发射器与其生成的粒子之间通过 [`SpawnerShared`] 关联：发射器持有 `Arc`，
//! 粒子持有 `Weak`。粒子被移除时递减活跃计数，管理器据此决定何时真正释放
//! 已删除的发射器。

use super::appearance::{node_particle_appearance, ParticleAppearance};
use super::params::{AttractorKind, ParticleParameters, ParticleSpawnerParameters};
use super::particle::Particle;
use super::texture::TexturePool;
use crate::environment::ParticleContext;
use crate::math::{rotate_xy_by, rotate_xz_by, rotate_yz_by, LIFETIME_EPSILON};
use glam::{Mat4, Vec3};
use rand::Rng;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

/// 预留粒子空间时在估计值上乘的系数
const RESERVE_FACTOR: f32 = 1.2;

/// 单个发射器预留容量的上限
const MAX_RESERVED_PARTICLES: usize = u16::MAX as usize;

/// 发射器与其粒子共享的状态
#[derive(Debug)]
pub struct SpawnerShared {
    serial: u64,
    active: AtomicUsize,
}

impl SpawnerShared {
    fn new() -> Self {
        Self {
            serial: NEXT_SERIAL.fetch_add(1, Ordering::Relaxed),
            active: AtomicUsize::new(0),
        }
    }

    /// 进程内唯一的序列号（与服务端分配的发射器ID无关）
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// 仍存活的子粒子数
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    fn increment_active(&self) {
        self.active.fetch_add(1, Ordering::AcqRel);
    }

    /// 递减活跃计数，到零为止
    pub(crate) fn decrement_active(&self) {
        let _ = self
            .active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }
}

/// 接收新粒子的容器
pub trait ParticleSink {
    fn add_particle(&self, particle: Particle);

    /// 为即将到来的粒子预留容量
    fn reserve_particle_space(&self, additional: usize);
}

/// 粒子发射器
#[derive(Debug)]
pub struct ParticleSpawner {
    p: ParticleSpawnerParameters,
    attached_id: Option<u16>,
    texpool: TexturePool,
    spawn_times: Vec<f32>,
    time: f32,
    shared: Arc<SpawnerShared>,
}

impl ParticleSpawner {
    /// 创建发射器，抽样发射时刻并通知容器预留空间
    pub fn new<R: Rng + ?Sized>(
        p: ParticleSpawnerParameters,
        attached_id: Option<u16>,
        texpool: TexturePool,
        sink: &dyn ParticleSink,
        rng: &mut R,
    ) -> Self {
        let hint = (p.estimate_max_particles() as f32 * RESERVE_FACTOR)
            .min(MAX_RESERVED_PARTICLES as f32);
        sink.reserve_particle_space(hint as usize);

        let spawn_times = if p.is_continuous() {
            Vec::new()
        } else {
            (0..=p.amount).map(|_| rng.gen::<f32>() * p.time).collect()
        };

        Self {
            p,
            attached_id,
            texpool,
            spawn_times,
            time: 0.0,
            shared: Arc::new(SpawnerShared::new()),
        }
    }

    /// 推进一帧，按需发射粒子
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        dtime: f32,
        ctx: &ParticleContext,
        cull_radius: f32,
        sink: &dyn ParticleSink,
        rng: &mut R,
    ) {
        self.time += dtime;

        // 附着对象未加载时照常消耗发射计划，只是不生成粒子
        let mut unloaded = false;
        let mut attachment = None;
        if let Some(id) = self.attached_id {
            match ctx.env.object_transform(id) {
                Some(transform) => attachment = Some(transform),
                None => unloaded = true,
            }
        }

        if self.p.is_continuous() {
            if unloaded {
                return;
            }
            for _ in 0..=self.p.amount {
                if rng.gen::<f32>() < dtime {
                    self.spawn_particle(ctx, cull_radius, attachment.as_ref(), sink, rng);
                }
            }
            return;
        }

        let now = self.time;
        let mut due = 0usize;
        self.spawn_times.retain(|&t| {
            let is_due = t <= now;
            if is_due {
                due += 1;
            }
            !is_due
        });
        for _ in 0..due {
            if self.p.amount == 0 {
                break;
            }
            self.p.amount -= 1;
            if !unloaded {
                self.spawn_particle(ctx, cull_radius, attachment.as_ref(), sink, rng);
            }
        }
    }

    /// 生成一个粒子；被剔除或无法确定外观时返回 `false`
    fn spawn_particle<R: Rng + ?Sized>(
        &self,
        ctx: &ParticleContext,
        cull_radius: f32,
        attachment: Option<&Mat4>,
        sink: &dyn ParticleSink,
        rng: &mut R,
    ) -> bool {
        let p = &self.p;
        let fac = if p.is_continuous() {
            0.0
        } else {
            (self.time / (p.time + LIFETIME_EPSILON)).clamp(0.0, 1.0)
        };

        let r_pos = p.pos.blend(fac);
        let r_vel = p.vel.blend(fac);
        let r_acc = p.acc.blend(fac);
        let r_drag = p.drag.blend(fac);
        let r_radius = p.radius.blend(fac);
        let r_exp = p.exptime.blend(fac);
        let r_size = p.size.blend(fac);
        let attract = p.attract.blend(fac).pick_within(rng);
        let mut attractor_origin = p.attractor_origin.blend(fac);
        let mut attractor_direction = p.attractor_direction.blend(fac);

        let mut pos = r_pos.pick_within(rng);
        let sphere_radius = r_radius.pick_within(rng);

        if let Some(transform) = attachment {
            pos = transform.transform_point3(pos) + ctx.env.camera_offset().as_vec3();
        }

        let player = ctx.env.player();
        if pos.distance_squared(player.position) > cull_radius * cull_radius {
            return false;
        }

        let mut pp = ParticleParameters {
            pos,
            vel: r_vel.pick_within(rng),
            acc: r_acc.pick_within(rng),
            drag: r_drag.pick_within(rng),
            jitter: p.jitter.blend(fac),
            bounce: p.bounce.blend(fac),
            expiration_time: r_exp.pick_within(rng),
            common: p.common.clone(),
            ..Default::default()
        };

        if let Some(transform) = attachment {
            pp.vel = transform.transform_vector3(pp.vel);
            pp.acc = transform.transform_vector3(pp.acc);
        }

        if p.attractor_attachment != 0 {
            if let Some(origin) = ctx.env.object_position(p.attractor_attachment) {
                attractor_origin += origin;
            }
        }
        if p.attractor_direction_attachment != 0 {
            if let Some(transform) = ctx.env.object_transform(p.attractor_direction_attachment) {
                attractor_direction = transform.transform_vector3(attractor_direction);
            }
        }

        // 按半径各分量缩放，得到椭球形偏移
        if sphere_radius != Vec3::ZERO {
            let ofs = sphere_offset(sphere_radius.length(), rng);
            pp.pos += ofs * normalize_or_zero(sphere_radius);
        }

        if p.attractor_kind != AttractorKind::None && attract != 0.0 {
            let (outward, distance) =
                attractor_pull(p.attractor_kind, pp.pos, attractor_origin, attractor_direction);
            let speed = attract.abs() * distance;
            let mut pull = outward * speed;
            if attract > 0.0 && speed > 0.0 {
                pull = -pull;
                if p.attractor_kill {
                    let arrival = distance / speed;
                    if arrival < pp.expiration_time {
                        pp.expiration_time = arrival;
                    }
                }
            }
            pp.vel += pull;
        }

        let appearance = match pp.common.node {
            Some(node) => {
                let features = ctx.nodedef.get(node);
                match node_particle_appearance(&features, pp.common.node_tile, &mut pp, rng) {
                    Some(appearance) => appearance,
                    None => return false,
                }
            }
            None => {
                let texture = match self.texpool.len() {
                    0 => return false,
                    1 => self.texpool[0].clone(),
                    n => self.texpool[rng.gen_range(0..n)].clone(),
                };
                if texture.is_animated() {
                    pp.common.animation = texture.animation;
                }
                ParticleAppearance::from_texture(texture)
            }
        };
        pp.common.animation.sync_with_lifetime(pp.expiration_time);

        if p.has_configured_size() {
            pp.size = r_size.pick_within(rng);
        }

        self.shared.increment_active();
        sink.add_particle(Particle::new(
            pp,
            appearance,
            Some(Arc::downgrade(&self.shared)),
            ctx.env.as_ref(),
        ));
        true
    }

    /// 有限模式下，寿命已到且发射计划已耗尽
    pub fn is_expired(&self) -> bool {
        !self.p.is_continuous() && self.time >= self.p.time && self.spawn_times.is_empty()
    }

    /// 仍存活的子粒子数
    pub fn active_count(&self) -> usize {
        self.shared.active()
    }

    pub fn has_active(&self) -> bool {
        self.active_count() > 0
    }

    pub fn serial(&self) -> u64 {
        self.shared.serial()
    }

    /// 尚未到期的发射时刻
    pub fn schedule(&self) -> &[f32] {
        &self.spawn_times
    }

    /// 剩余发射数
    pub fn remaining(&self) -> u16 {
        self.p.amount
    }

    pub fn elapsed(&self) -> f32 {
        self.time
    }

    pub fn attached_id(&self) -> Option<u16> {
        self.attached_id
    }

    pub fn parameters(&self) -> &ParticleSpawnerParameters {
        &self.p
    }
}

/// 长度为 `radius`、方向随机的偏移
fn sphere_offset<R: Rng + ?Sized>(radius: f32, rng: &mut R) -> Vec3 {
    let ofs = Vec3::new(radius, 0.0, 0.0);
    let ofs = rotate_xz_by(ofs, rng.gen_range(0.0..360.0));
    let ofs = rotate_yz_by(ofs, rng.gen_range(0.0..360.0));
    rotate_xy_by(ofs, rng.gen_range(0.0..360.0))
}

/// 接近零时返回零向量的归一化
fn normalize_or_zero(v: Vec3) -> Vec3 {
    if v.length_squared() > f32::EPSILON * f32::EPSILON {
        v.normalize()
    } else {
        Vec3::ZERO
    }
}

/// 吸引器的"远离"方向与粒子到吸引器的距离
///
/// 吸引时沿返回方向的反方向加速，排斥时沿返回方向加速。
fn attractor_pull(kind: AttractorKind, pos: Vec3, origin: Vec3, direction: Vec3) -> (Vec3, f32) {
    match kind {
        AttractorKind::None => (Vec3::ZERO, 0.0),
        AttractorKind::Point => (normalize_or_zero(pos - origin), pos.distance(origin)),
        AttractorKind::Line => {
            let line_dir = normalize_or_zero(direction);
            let closest = origin + line_dir * (pos - origin).dot(line_dir);
            (normalize_or_zero(pos - closest), pos.distance(closest))
        }
        AttractorKind::Plane => {
            let normal = normalize_or_zero(direction);
            let side = normal.dot(origin - pos);
            let toward = if side == 0.0 {
                normal
            } else {
                normal * side.signum()
            };
            (-toward, normal.dot(pos - origin).abs())
        }
    }
}
