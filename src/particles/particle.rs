//! 单个粒子的模拟状态
//!
//! 粒子本身只保存模拟状态（位置、速度、颜色、四边形顶点），
//! 由 [`crate::render`] 中的适配器读取并转换为可绘制的数据。

use super::appearance::ParticleAppearance;
use super::spawner::SpawnerShared;
use super::texture::{BlendMode, ParticleTexture};
use super::params::ParticleParameters;
use crate::environment::{
    blend_light, decode_light, float_to_node, Aabb, ClientEnvironment, CollisionMoveInput, Color,
    ParticleContext, PlayerView, TextureHandle, BS, LIGHT_SUN,
};
use crate::math::{rotate_xz_by, rotate_yz_by, LIFETIME_EPSILON};
use glam::{Vec2, Vec3};
use rand::Rng;
use std::sync::{Arc, Weak};

/// 碰撞移除时写入的寿命哨兵值，保证下一次检查时粒子已过期
const FORCED_EXPIRATION: f32 = -1.0;

/// 粒子
#[derive(Debug)]
pub struct Particle {
    p: ParticleParameters,
    pos: Vec3,
    velocity: Vec3,
    acceleration: Vec3,
    time: f32,
    expiration: f32,
    collision_box: Aabb,

    animation_frame: u32,
    animation_time: f32,

    alpha: f32,
    base_color: Color,
    color: Color,

    texture: Option<Arc<ParticleTexture>>,
    texture_handle: TextureHandle,
    texpos: Vec2,
    texsize: Vec2,

    /// 相对粒子中心的四边形顶点（渲染单位）
    corners: [Vec3; 4],
    uvs: [Vec2; 4],

    /// 发射器的非拥有引用；发射器的延迟释放保证其在粒子存活期间有效
    parent: Option<Weak<SpawnerShared>>,
}

impl Particle {
    /// 创建粒子并立即计算初始光照与顶点
    pub fn new(
        p: ParticleParameters,
        appearance: ParticleAppearance,
        parent: Option<Weak<SpawnerShared>>,
        env: &dyn ClientEnvironment,
    ) -> Self {
        let half = p.size / 2.0 / BS;
        let mut particle = Self {
            pos: p.pos,
            velocity: p.vel,
            acceleration: p.acc,
            time: 0.0,
            expiration: p.expiration_time,
            collision_box: Aabb::cube(half),
            animation_frame: 0,
            animation_time: 0.0,
            alpha: 1.0,
            base_color: appearance.color,
            color: appearance.color,
            texture: appearance.texture,
            texture_handle: appearance.handle,
            texpos: appearance.texpos,
            texsize: appearance.texsize,
            corners: [Vec3::ZERO; 4],
            uvs: [Vec2::ZERO; 4],
            parent,
            p,
        };
        particle.update_alpha();
        particle.update_light(env);
        particle.update_vertices(&env.player());
        particle
    }

    /// 推进一帧
    pub fn step<R: Rng + ?Sized>(&mut self, dtime: f32, ctx: &ParticleContext, rng: &mut R) {
        self.time += dtime;

        // 阻力按比例衰减速度，系数不小于零，因此速度不会越过零点
        let damping = (Vec3::ONE - self.p.drag * dtime).max(Vec3::ZERO);
        self.velocity = self.velocity * damping + self.p.jitter.pick_within(rng) * dtime;

        if self.p.common.collision_detection {
            self.step_with_collision(dtime, ctx, rng);
        } else {
            self.pos += (self.velocity + self.acceleration * 0.5 * dtime) * dtime;
            self.velocity += self.acceleration * dtime;
        }

        self.step_animation(dtime);
        self.update_alpha();
        self.update_light(ctx.env.as_ref());
        self.update_vertices(&ctx.env.player());
    }

    fn step_with_collision<R: Rng + ?Sized>(
        &mut self,
        dtime: f32,
        ctx: &ParticleContext,
        rng: &mut R,
    ) {
        let input = CollisionMoveInput {
            collision_box: self.collision_box,
            position: self.pos,
            velocity: self.velocity,
            acceleration: self.acceleration,
            dtime,
            object_collision: self.p.common.object_collision,
        };
        let result = ctx.collision.collision_move(&input);
        let bounciness = self.p.bounce.pick_within(rng);

        if result.collides && self.p.common.collision_removal {
            self.expiration = FORCED_EXPIRATION;
        } else if result.collides && bounciness > 0.0 {
            self.pos = result.position;
            self.velocity = bounce_velocity(self.velocity, result.velocity, bounciness);
        } else {
            self.pos = result.position;
            self.velocity = result.velocity;
        }
    }

    fn step_animation(&mut self, dtime: f32) {
        let Some(params) = self
            .p
            .common
            .animation
            .determine_params(self.texture_handle.size)
        else {
            return;
        };
        if params.frame_length <= 0.0 {
            return;
        }
        self.animation_time += dtime;
        // 逐帧扣减而不是清零，低帧率下不会跳帧
        while self.animation_time > params.frame_length {
            self.animation_frame = self.animation_frame.wrapping_add(1);
            self.animation_time -= params.frame_length;
        }
    }

    /// 生命周期位置，限制在 `[0, 1]`
    fn lifetime_fraction(&self) -> f32 {
        (self.time / (self.expiration + LIFETIME_EPSILON)).clamp(0.0, 1.0)
    }

    fn update_alpha(&mut self) {
        let fraction = self.lifetime_fraction();
        self.alpha = self
            .texture
            .as_ref()
            .map_or(1.0, |texture| texture.alpha.blend(fraction));
    }

    fn update_light(&mut self, env: &dyn ClientEnvironment) {
        let ratio = env.day_night_ratio();
        let light = match env.node_light(float_to_node(self.pos)) {
            Some(bank) => bank.blend(ratio),
            None => blend_light(ratio, LIGHT_SUN, 0),
        };
        let light = u32::from(decode_light(light.saturating_add(self.p.common.glow)));
        let channel = |base: u8| (light * u32::from(base) / 255) as u8;
        self.color = Color::rgba(
            channel(self.base_color.r),
            channel(self.base_color.g),
            channel(self.base_color.b),
            (self.alpha * 255.0).clamp(0.0, 255.0) as u8,
        );
    }

    fn update_vertices(&mut self, player: &PlayerView) {
        let fraction = self.lifetime_fraction();
        let scale = self
            .texture
            .as_ref()
            .map_or(Vec2::ONE, |texture| texture.scale.blend(fraction));

        let texsize = self.texture_handle.size;
        let (uv0, uv1) = match self.p.common.animation.determine_params(texsize) {
            Some(params) if texsize.x > 0 && texsize.y > 0 => {
                let coord = self
                    .p
                    .common
                    .animation
                    .texture_coords(texsize, self.animation_frame);
                let frame = params.frame_size.as_vec2() / texsize.as_vec2();
                let uv0 = self.texpos + coord;
                (uv0, uv0 + frame * self.texsize)
            }
            _ => (self.texpos, self.texpos + self.texsize),
        };

        let half = self.p.size * 0.5;
        let hx = half * scale.x;
        let hy = half * scale.y;
        let corners = [
            Vec3::new(-hx, -hy, 0.0),
            Vec3::new(hx, -hy, 0.0),
            Vec3::new(hx, hy, 0.0),
            Vec3::new(-hx, hy, 0.0),
        ];
        self.uvs = [
            Vec2::new(uv0.x, uv1.y),
            Vec2::new(uv1.x, uv1.y),
            Vec2::new(uv1.x, uv0.y),
            Vec2::new(uv0.x, uv0.y),
        ];

        let vertical = self.p.common.vertical;
        let to_player = player.position - self.pos;
        let facing = to_player.z.atan2(to_player.x).to_degrees() + 90.0;
        self.corners = corners.map(|corner| {
            if vertical {
                rotate_xz_by(corner, facing)
            } else {
                rotate_xz_by(rotate_yz_by(corner, player.pitch), player.yaw)
            }
        });
    }

    /// 释放粒子，归还父发射器的活跃计数
    pub(crate) fn release(self) {
        if let Some(parent) = &self.parent {
            let shared = parent.upgrade();
            debug_assert!(shared.is_some(), "particle outlived its spawner");
            if let Some(shared) = shared {
                shared.decrement_active();
            }
        }
    }

    pub fn is_expired(&self) -> bool {
        self.time >= self.expiration
    }

    /// 父发射器的序列号
    pub fn parent_serial(&self) -> Option<u64> {
        self.parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|shared| shared.serial())
    }

    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    pub fn parameters(&self) -> &ParticleParameters {
        &self.p
    }

    pub fn position(&self) -> Vec3 {
        self.pos
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn elapsed(&self) -> f32 {
        self.time
    }

    pub fn expiration(&self) -> f32 {
        self.expiration
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn animation_frame(&self) -> u32 {
        self.animation_frame
    }

    pub fn texture_handle(&self) -> &TextureHandle {
        &self.texture_handle
    }

    pub fn texture(&self) -> Option<&Arc<ParticleTexture>> {
        self.texture.as_ref()
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.texture
            .as_ref()
            .map_or(BlendMode::Alpha, |texture| texture.blend_mode)
    }

    pub fn corners(&self) -> &[Vec3; 4] {
        &self.corners
    }

    pub fn uvs(&self) -> &[Vec2; 4] {
        &self.uvs
    }
}

/// 只反转入射速度中绝对值最大的分量
///
/// 其余分量沿用碰撞解算器修正后的速度；没有唯一最大分量时整体反转。
fn bounce_velocity(incoming: Vec3, resolved: Vec3, bounciness: f32) -> Vec3 {
    let a = incoming.abs();
    let mut v = resolved;
    if a.y > a.x && a.y > a.z {
        v.y = -incoming.y * bounciness;
    } else if a.x > a.y && a.x > a.z {
        v.x = -incoming.x * bounciness;
    } else if a.z > a.y && a.z > a.x {
        v.z = -incoming.z * bounciness;
    } else {
        v = -incoming * bounciness;
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{
        CollisionMoveResult, CollisionResolver, ContentFeatures, LightBank, MapNode,
        NodeDefManager, TextureSource,
    };
    use crate::math::{Tween, ValueRange};
    use crate::particles::animation::TileAnimation;
    use glam::{IVec3, Mat4};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Mutex;

    struct TestEnv {
        light: Option<LightBank>,
        player: PlayerView,
    }

    impl ClientEnvironment for TestEnv {
        fn node_light(&self, _pos: IVec3) -> Option<LightBank> {
            self.light
        }
        fn day_night_ratio(&self) -> u32 {
            1000
        }
        fn camera_offset(&self) -> IVec3 {
            IVec3::ZERO
        }
        fn player(&self) -> PlayerView {
            self.player
        }
        fn object_transform(&self, _id: u16) -> Option<Mat4> {
            None
        }
        fn object_position(&self, _id: u16) -> Option<Vec3> {
            None
        }
    }

    /// 按预设结果回应的碰撞解算器，记录收到的输入
    struct ScriptedCollision {
        result: Box<dyn Fn(&CollisionMoveInput) -> CollisionMoveResult + Send + Sync>,
        calls: Mutex<Vec<CollisionMoveInput>>,
    }

    impl CollisionResolver for ScriptedCollision {
        fn collision_move(&self, input: &CollisionMoveInput) -> CollisionMoveResult {
            self.calls.lock().unwrap().push(*input);
            (self.result)(input)
        }
    }

    struct NoNodes;

    impl NodeDefManager for NoNodes {
        fn get(&self, _node: MapNode) -> ContentFeatures {
            ContentFeatures::default()
        }
    }

    struct NoTextures;

    impl TextureSource for NoTextures {
        fn get_texture(&self, _name: &str) -> TextureHandle {
            TextureHandle::default()
        }
    }

    fn context(
        light: Option<LightBank>,
        collision: impl Fn(&CollisionMoveInput) -> CollisionMoveResult + Send + Sync + 'static,
    ) -> (ParticleContext, Arc<ScriptedCollision>) {
        let collision = Arc::new(ScriptedCollision {
            result: Box::new(collision),
            calls: Mutex::new(Vec::new()),
        });
        let ctx = ParticleContext::new(
            Arc::new(TestEnv {
                light,
                player: PlayerView {
                    position: Vec3::new(0.0, 0.0, 10.0),
                    ..Default::default()
                },
            }),
            collision.clone(),
            Arc::new(NoNodes),
            Arc::new(NoTextures),
        );
        (ctx, collision)
    }

    fn passthrough(input: &CollisionMoveInput) -> CollisionMoveResult {
        CollisionMoveResult {
            position: input.position,
            velocity: input.velocity,
            collides: false,
        }
    }

    fn plain_appearance() -> ParticleAppearance {
        ParticleAppearance {
            texture: None,
            handle: TextureHandle::new(1, 16, 16),
            texpos: Vec2::ZERO,
            texsize: Vec2::ONE,
            color: Color::WHITE,
        }
    }

    #[test]
    fn test_expires_on_final_tick() {
        let (ctx, _) = context(None, passthrough);
        let params = ParticleParameters {
            expiration_time: 2.0,
            ..Default::default()
        };
        let mut particle = Particle::new(params, plain_appearance(), None, ctx.env.as_ref());
        let mut rng = StdRng::seed_from_u64(0);

        for expected_elapsed in [0.5, 1.0, 1.5] {
            particle.step(0.5, &ctx, &mut rng);
            assert_eq!(particle.elapsed(), expected_elapsed);
            assert!(!particle.is_expired());
        }
        particle.step(0.5, &ctx, &mut rng);
        assert_eq!(particle.elapsed(), 2.0);
        assert!(particle.is_expired());
    }

    #[test]
    fn test_free_motion_integration() {
        let (ctx, collision) = context(None, passthrough);
        let params = ParticleParameters {
            vel: Vec3::new(1.0, 0.0, 0.0),
            acc: Vec3::new(0.0, -2.0, 0.0),
            expiration_time: 10.0,
            ..Default::default()
        };
        let mut particle = Particle::new(params, plain_appearance(), None, ctx.env.as_ref());
        let mut rng = StdRng::seed_from_u64(0);
        particle.step(0.5, &ctx, &mut rng);

        // pos += (v + a·dt/2)·dt
        assert!((particle.position() - Vec3::new(0.5, -0.25, 0.0)).length() < 1e-6);
        assert!((particle.velocity() - Vec3::new(1.0, -1.0, 0.0)).length() < 1e-6);
        assert!(collision.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_drag_never_crosses_zero() {
        let (ctx, _) = context(None, passthrough);
        let params = ParticleParameters {
            vel: Vec3::new(2.0, -4.0, 1.0),
            drag: Vec3::new(0.5, 0.5, 100.0),
            expiration_time: 10.0,
            ..Default::default()
        };
        let mut particle = Particle::new(params, plain_appearance(), None, ctx.env.as_ref());
        let mut rng = StdRng::seed_from_u64(0);
        particle.step(1.0, &ctx, &mut rng);

        let v = particle.velocity();
        assert!((v.x - 1.0).abs() < 1e-6);
        assert!((v.y + 2.0).abs() < 1e-6);
        assert_eq!(v.z, 0.0);
    }

    #[test]
    fn test_bounce_inverts_dominant_y_only() {
        let resolved = Vec3::new(0.7, 0.0, -0.3);
        let (ctx, collision) = context(None, move |input| CollisionMoveResult {
            position: input.position + Vec3::new(0.0, 0.1, 0.0),
            velocity: resolved,
            collides: true,
        });
        let mut params = ParticleParameters {
            vel: Vec3::new(1.0, -5.0, 0.5),
            bounce: ValueRange::constant(0.5),
            expiration_time: 10.0,
            ..Default::default()
        };
        params.common.collision_detection = true;
        let mut particle = Particle::new(params, plain_appearance(), None, ctx.env.as_ref());
        let mut rng = StdRng::seed_from_u64(0);
        particle.step(0.1, &ctx, &mut rng);

        let v = particle.velocity();
        assert_eq!(v.x, resolved.x);
        assert_eq!(v.z, resolved.z);
        assert!((v.y - 2.5).abs() < 1e-6);
        assert!((particle.position().y - 0.1).abs() < 1e-6);
        assert_eq!(collision.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_bounce_without_strict_maximum_inverts_all() {
        let incoming = Vec3::new(2.0, 2.0, 1.0);
        assert_eq!(
            bounce_velocity(incoming, Vec3::ZERO, 0.5),
            Vec3::new(-1.0, -1.0, -0.5)
        );
        assert_eq!(
            bounce_velocity(Vec3::new(-3.0, 1.0, 2.0), Vec3::ONE, 1.0),
            Vec3::new(3.0, 1.0, 1.0)
        );
    }

    #[test]
    fn test_collision_removal_forces_expiration() {
        let (ctx, _) = context(None, |input| CollisionMoveResult {
            position: input.position + Vec3::ONE,
            velocity: Vec3::ZERO,
            collides: true,
        });
        let mut params = ParticleParameters {
            pos: Vec3::new(1.0, 2.0, 3.0),
            expiration_time: 10.0,
            ..Default::default()
        };
        params.common.collision_detection = true;
        params.common.collision_removal = true;
        let mut particle = Particle::new(params, plain_appearance(), None, ctx.env.as_ref());
        let mut rng = StdRng::seed_from_u64(0);
        particle.step(0.1, &ctx, &mut rng);

        assert!(particle.is_expired());
        assert_eq!(particle.position(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_collision_without_bounce_adopts_resolver() {
        let (ctx, _) = context(None, |_| CollisionMoveResult {
            position: Vec3::new(4.0, 5.0, 6.0),
            velocity: Vec3::new(0.0, 0.0, 1.0),
            collides: true,
        });
        let mut params = ParticleParameters {
            vel: Vec3::new(0.0, -3.0, 0.0),
            expiration_time: 10.0,
            ..Default::default()
        };
        params.common.collision_detection = true;
        let mut particle = Particle::new(params, plain_appearance(), None, ctx.env.as_ref());
        let mut rng = StdRng::seed_from_u64(0);
        particle.step(0.1, &ctx, &mut rng);

        assert_eq!(particle.position(), Vec3::new(4.0, 5.0, 6.0));
        assert_eq!(particle.velocity(), Vec3::new(0.0, 0.0, 1.0));
        assert!(!particle.is_expired());
    }

    #[test]
    fn test_light_falls_back_to_sky_light() {
        let (ctx, _) = context(None, passthrough);
        let appearance = ParticleAppearance {
            color: Color::rgba(255, 128, 0, 255),
            ..plain_appearance()
        };
        let particle = Particle::new(
            ParticleParameters::default(),
            appearance,
            None,
            ctx.env.as_ref(),
        );
        // 全白天的阳光解码为最大亮度
        assert_eq!(particle.color(), Color::rgba(255, 128, 0, 255));

        let (dark_ctx, _) = context(Some(LightBank::new(0, 0)), passthrough);
        let particle = Particle::new(
            ParticleParameters::default(),
            plain_appearance(),
            None,
            dark_ctx.env.as_ref(),
        );
        assert_eq!(particle.color(), Color::rgba(8, 8, 8, 255));
    }

    #[test]
    fn test_glow_brightens() {
        let (ctx, _) = context(Some(LightBank::new(0, 0)), passthrough);
        let mut params = ParticleParameters::default();
        params.common.glow = 14;
        let particle = Particle::new(params, plain_appearance(), None, ctx.env.as_ref());
        assert_eq!(particle.color().r, 255);
    }

    #[test]
    fn test_alpha_follows_texture_curve() {
        let (ctx, _) = context(None, passthrough);
        let texture = Arc::new(ParticleTexture {
            handle: TextureHandle::new(1, 16, 16),
            alpha: Tween::new(1.0, 0.0),
            scale: Tween::constant(Vec2::ONE),
            blend_mode: BlendMode::Add,
            animation: TileAnimation::None,
        });
        let params = ParticleParameters {
            expiration_time: 0.9,
            ..Default::default()
        };
        let mut particle = Particle::new(
            params,
            ParticleAppearance::from_texture(texture),
            None,
            ctx.env.as_ref(),
        );
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(particle.alpha(), 1.0);
        particle.step(0.5, &ctx, &mut rng);
        // 0.5 / (0.9 + 0.1) = 0.5
        assert!((particle.alpha() - 0.5).abs() < 1e-6);
        assert_eq!(particle.blend_mode(), BlendMode::Add);
    }

    #[test]
    fn test_animation_advances_without_skipping() {
        let (ctx, _) = context(None, passthrough);
        let mut params = ParticleParameters {
            expiration_time: 10.0,
            ..Default::default()
        };
        params.common.animation = TileAnimation::VerticalFrames {
            aspect_w: 1,
            aspect_h: 1,
            length: 1.0,
        };
        let appearance = ParticleAppearance {
            handle: TextureHandle::new(1, 16, 64),
            ..plain_appearance()
        };
        let mut particle = Particle::new(params, appearance, None, ctx.env.as_ref());
        let mut rng = StdRng::seed_from_u64(0);

        // 每帧 0.25 秒，一次 0.6 秒的步进推进两帧
        particle.step(0.6, &ctx, &mut rng);
        assert_eq!(particle.animation_frame(), 2);
        let uvs = particle.uvs();
        assert!((uvs[3].y - 0.5).abs() < 1e-6);
        assert!((uvs[0].y - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_vertical_quad_stays_upright() {
        let (ctx, _) = context(None, passthrough);
        let mut params = ParticleParameters {
            size: 2.0,
            ..Default::default()
        };
        params.common.vertical = true;
        let particle = Particle::new(params, plain_appearance(), None, ctx.env.as_ref());
        for corner in particle.corners() {
            assert!((corner.y.abs() - 1.0).abs() < 1e-6);
        }
    }
}
