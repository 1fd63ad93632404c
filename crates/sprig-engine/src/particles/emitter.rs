use std::f32::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::coords::Vec2;
use crate::paint::Color;

/// Region new particles appear in, centered on the emitter position.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SpawnShape {
    Point,
    /// Uniform over the disc.
    Circle { radius: f32 },
    /// Uniform over the rectangle.
    Rect { size: Vec2 },
}

impl SpawnShape {
    fn sample(self, rng: &mut impl Rng) -> Vec2 {
        match self {
            SpawnShape::Point => Vec2::zero(),
            SpawnShape::Circle { radius } => {
                let r = radius * rng.random::<f32>().sqrt();
                Vec2::from_angle(rng.random_range(0.0..TAU)) * r
            }
            SpawnShape::Rect { size } => Vec2::new(
                (rng.random::<f32>() - 0.5) * size.x,
                (rng.random::<f32>() - 0.5) * size.y,
            ),
        }
    }
}

/// Emission parameters. Pairs are `(min, max)` ranges sampled per particle.
#[derive(Debug, Clone, PartialEq)]
pub struct EmitterConfig {
    /// Particles per second while emitting.
    pub rate: f32,
    pub max_particles: usize,
    pub lifetime: (f32, f32),
    pub speed: (f32, f32),
    /// Center of the emission cone, radians.
    pub direction: f32,
    /// Full width of the emission cone, radians.
    pub spread: f32,
    pub acceleration: Vec2,
    pub angular_velocity: (f32, f32),
    pub start_scale: f32,
    pub end_scale: f32,
    pub start_color: Color,
    pub end_color: Color,
    pub shape: SpawnShape,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            rate: 10.0,
            max_particles: 256,
            lifetime: (1.0, 1.0),
            speed: (50.0, 50.0),
            direction: -std::f32::consts::FRAC_PI_2,
            spread: TAU,
            acceleration: Vec2::zero(),
            angular_velocity: (0.0, 0.0),
            start_scale: 1.0,
            end_scale: 1.0,
            start_color: Color::WHITE,
            end_color: Color::WHITE.with_alpha(0),
            shape: SpawnShape::Point,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    pub rotation: f32,
    pub angular_velocity: f32,
    pub scale: f32,
    pub color: Color,
    pub age: f32,
    pub lifetime: f32,
}

impl Particle {
    /// Fraction of the lifetime elapsed, in `[0, 1]`.
    #[inline]
    pub fn progress(&self) -> f32 {
        if self.lifetime <= 0.0 { 1.0 } else { (self.age / self.lifetime).clamp(0.0, 1.0) }
    }
}

/// Pool of particles fed by a rate accumulator.
///
/// Positions are in the emitter's parent space: moving the emitter only
/// affects where new particles spawn.
#[derive(Debug)]
pub struct ParticleEmitter {
    config: EmitterConfig,
    position: Vec2,
    particles: Vec<Particle>,
    accumulator: f32,
    emitting: bool,
    rng: StdRng,
}

impl ParticleEmitter {
    pub fn new(config: EmitterConfig) -> Self {
        Self::with_rng(config, StdRng::from_rng(&mut rand::rng()))
    }

    /// Deterministic emitter for replays and tests.
    pub fn with_seed(config: EmitterConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: EmitterConfig, rng: StdRng) -> Self {
        Self {
            particles: Vec::with_capacity(config.max_particles),
            config,
            position: Vec2::zero(),
            accumulator: 0.0,
            emitting: true,
            rng,
        }
    }

    #[inline]
    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    #[inline]
    pub fn config_mut(&mut self) -> &mut EmitterConfig {
        &mut self.config
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    #[inline]
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    #[inline]
    pub fn start(&mut self) {
        self.emitting = true;
    }

    /// Stops emission; live particles keep updating until they expire.
    #[inline]
    pub fn stop(&mut self) {
        self.emitting = false;
        self.accumulator = 0.0;
    }

    #[inline]
    pub fn is_emitting(&self) -> bool {
        self.emitting
    }

    #[inline]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
        self.accumulator = 0.0;
    }

    /// Advances live particles by `dt` seconds, drops expired ones, then emits.
    pub fn update(&mut self, dt: f32) {
        let cfg = &self.config;
        for p in &mut self.particles {
            p.age += dt;
            p.velocity += p.acceleration * dt;
            p.position += p.velocity * dt;
            p.rotation += p.angular_velocity * dt;
            let t = p.progress();
            p.scale = cfg.start_scale + (cfg.end_scale - cfg.start_scale) * t;
            p.color = cfg.start_color.lerp(cfg.end_color, t);
        }
        self.particles.retain(|p| p.age < p.lifetime);

        if self.emitting && self.config.rate > 0.0 {
            self.accumulator += self.config.rate * dt;
            let due = self.accumulator.floor();
            self.accumulator -= due;
            self.burst(due as usize);
        }
    }

    /// Spawns up to `count` particles now; returns how many fit in the pool.
    pub fn burst(&mut self, count: usize) -> usize {
        let room = self.config.max_particles.saturating_sub(self.particles.len());
        let count = count.min(room);
        for _ in 0..count {
            let particle = self.spawn();
            self.particles.push(particle);
        }
        count
    }

    fn spawn(&mut self) -> Particle {
        let cfg = &self.config;
        let rng = &mut self.rng;
        let half = cfg.spread * 0.5;
        let angle = cfg.direction + sample(rng, (-half, half));
        let speed = sample(rng, cfg.speed);
        Particle {
            position: self.position + cfg.shape.sample(rng),
            velocity: Vec2::from_angle(angle) * speed,
            acceleration: cfg.acceleration,
            rotation: 0.0,
            angular_velocity: sample(rng, cfg.angular_velocity),
            scale: cfg.start_scale,
            color: cfg.start_color,
            age: 0.0,
            lifetime: sample(rng, cfg.lifetime),
        }
    }
}

fn sample(rng: &mut impl Rng, (lo, hi): (f32, f32)) -> f32 {
    if hi > lo { rng.random_range(lo..hi) } else { lo }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmitterConfig {
        EmitterConfig { rate: 10.0, lifetime: (2.0, 2.0), ..EmitterConfig::default() }
    }

    #[test]
    fn rate_accumulates_fractional_particles() {
        let mut e = ParticleEmitter::with_seed(config(), 7);
        e.update(0.05);
        assert_eq!(e.len(), 0);
        e.update(0.05);
        assert_eq!(e.len(), 1);
        e.update(0.5);
        assert_eq!(e.len(), 6);
    }

    #[test]
    fn pool_is_capped() {
        let cfg = EmitterConfig { max_particles: 3, ..config() };
        let mut e = ParticleEmitter::with_seed(cfg, 1);
        assert_eq!(e.burst(10), 3);
        e.update(1.0);
        assert_eq!(e.len(), 3);
    }

    #[test]
    fn particles_expire_and_stop_halts_emission() {
        let mut e = ParticleEmitter::with_seed(config(), 3);
        e.burst(4);
        e.stop();
        e.update(1.0);
        assert_eq!(e.len(), 4);
        e.update(1.5);
        assert!(e.is_empty());
    }

    #[test]
    fn motion_and_color_follow_lifetime() {
        let cfg = EmitterConfig {
            speed: (10.0, 10.0),
            direction: 0.0,
            spread: 0.0,
            acceleration: Vec2::new(0.0, 4.0),
            start_scale: 1.0,
            end_scale: 3.0,
            start_color: Color::rgba(0, 0, 0, 255),
            end_color: Color::rgba(200, 0, 0, 255),
            ..config()
        };
        let mut e = ParticleEmitter::with_seed(cfg, 11);
        e.stop();
        e.burst(1);
        e.update(1.0);

        let p = e.particles()[0];
        assert!((p.velocity - Vec2::new(10.0, 4.0)).length() < 1e-4);
        assert!((p.position - Vec2::new(10.0, 4.0)).length() < 1e-4);
        assert!((p.scale - 2.0).abs() < 1e-5);
        assert_eq!(p.color.r(), 100);
    }

    #[test]
    fn spawn_shapes_stay_inside_their_bounds() {
        let shapes = [
            SpawnShape::Circle { radius: 5.0 },
            SpawnShape::Rect { size: Vec2::new(10.0, 4.0) },
        ];
        for shape in shapes {
            let cfg = EmitterConfig { shape, max_particles: 500, ..config() };
            let mut e = ParticleEmitter::with_seed(cfg, 42);
            e.set_position(Vec2::new(100.0, 100.0));
            e.burst(500);
            for p in e.particles() {
                let d = p.position - Vec2::new(100.0, 100.0);
                match shape {
                    SpawnShape::Circle { radius } => assert!(d.length() <= radius + 1e-4),
                    SpawnShape::Rect { size } => {
                        assert!(d.x.abs() <= size.x / 2.0 && d.y.abs() <= size.y / 2.0)
                    }
                    SpawnShape::Point => unreachable!(),
                }
            }
        }
    }

    #[test]
    fn same_seed_same_particles() {
        let mut a = ParticleEmitter::with_seed(config(), 99);
        let mut b = ParticleEmitter::with_seed(config(), 99);
        a.burst(5);
        b.burst(5);
        assert_eq!(a.particles(), b.particles());
    }
}
