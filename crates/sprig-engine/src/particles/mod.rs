//! CPU particle emitters drawn as batched sprites.

mod emitter;

pub use emitter::{EmitterConfig, Particle, ParticleEmitter, SpawnShape};
