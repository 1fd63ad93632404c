//! Sprig engine crate.
//!
//! Batched 2D rendering over an abstract GPU device: sprite and shape
//! batchers, a 2D transform stack, stencil masks, custom shader templates,
//! tilemaps and particles.

pub mod device;
pub mod time;

pub mod logging;
pub mod coords;
pub mod paint;
pub mod buffer;
pub mod transform;
pub mod shader;
pub mod geometry;
pub mod render;
pub mod tilemap;
pub mod particles;
