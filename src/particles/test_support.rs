//! 单元测试共用的协作者替身

use super::particle::Particle;
use super::spawner::ParticleSink;
use crate::environment::{
    ClientEnvironment, CollisionMoveInput, CollisionMoveResult, CollisionResolver, Color,
    ContentFeatures, DrawType, LightBank, MapNode, NodeDefManager, ParticleContext, PlayerView,
    TextureHandle, TextureSource, TileLayer,
};
use glam::{IVec3, Mat4, Vec3};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// 内容ID 0 为空气，其余为普通节点
pub const AIR: MapNode = MapNode {
    content: 0,
    param2: 0,
};
pub const STONE: MapNode = MapNode {
    content: 1,
    param2: 0,
};

#[derive(Default)]
pub struct TestEnv {
    player: Mutex<PlayerView>,
    objects: Mutex<HashMap<u16, Mat4>>,
}

impl TestEnv {
    pub fn set_object(&self, id: u16, transform: Mat4) {
        self.objects.lock().unwrap().insert(id, transform);
    }
}

impl ClientEnvironment for TestEnv {
    fn node_light(&self, _pos: IVec3) -> Option<LightBank> {
        None
    }

    fn day_night_ratio(&self) -> u32 {
        1000
    }

    fn camera_offset(&self) -> IVec3 {
        IVec3::ZERO
    }

    fn player(&self) -> PlayerView {
        *self.player.lock().unwrap()
    }

    fn object_transform(&self, id: u16) -> Option<Mat4> {
        self.objects.lock().unwrap().get(&id).copied()
    }

    fn object_position(&self, id: u16) -> Option<Vec3> {
        self.object_transform(id).map(|m| m.w_axis.truncate())
    }
}

pub struct NoCollision;

impl CollisionResolver for NoCollision {
    fn collision_move(&self, input: &CollisionMoveInput) -> CollisionMoveResult {
        CollisionMoveResult {
            position: input.position + input.velocity * input.dtime,
            velocity: input.velocity + input.acceleration * input.dtime,
            collides: false,
        }
    }
}

pub struct TestNodeDefs;

impl NodeDefManager for TestNodeDefs {
    fn get(&self, node: MapNode) -> ContentFeatures {
        if node == AIR {
            return ContentFeatures {
                draw_type: DrawType::AirLike,
                ..Default::default()
            };
        }
        let mut features = ContentFeatures {
            color: Color::rgba(128, 128, 128, 255),
            ..Default::default()
        };
        for (i, tile) in features.tiles.iter_mut().enumerate() {
            *tile = TileLayer {
                texture: TextureHandle::new(100 + i as u32, 16, 16),
                ..Default::default()
            };
        }
        features
    }
}

/// 按名称长度分配贴图ID
pub struct TestTextures;

impl TextureSource for TestTextures {
    fn get_texture(&self, name: &str) -> TextureHandle {
        TextureHandle::new(name.len() as u32, 16, 16)
    }
}

pub fn test_context() -> (ParticleContext, Arc<TestEnv>) {
    let env = Arc::new(TestEnv::default());
    let ctx = ParticleContext::new(
        env.clone(),
        Arc::new(NoCollision),
        Arc::new(TestNodeDefs),
        Arc::new(TestTextures),
    );
    (ctx, env)
}

/// 收集粒子的容器
#[derive(Default)]
pub struct CollectingSink {
    particles: Mutex<Vec<Particle>>,
    reserved: AtomicUsize,
}

impl CollectingSink {
    pub fn len(&self) -> usize {
        self.particles.lock().unwrap().len()
    }

    pub fn reserved(&self) -> usize {
        self.reserved.load(Ordering::Relaxed)
    }

    pub fn take(&self) -> Vec<Particle> {
        std::mem::take(&mut *self.particles.lock().unwrap())
    }
}

impl ParticleSink for CollectingSink {
    fn add_particle(&self, particle: Particle) {
        self.particles.lock().unwrap().push(particle);
    }

    fn reserve_particle_space(&self, additional: usize) {
        self.reserved.fetch_add(additional, Ordering::Relaxed);
    }
}
