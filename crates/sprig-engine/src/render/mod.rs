//! Batched rendering.
//!
//! Primitives go through one of two regions:
//! - [`SpriteRegion`]: textured quads, batched across up to the device's
//!   texture-unit count and drawn through a shared index buffer
//! - [`GraphicRegion`]: untextured shapes, drawn one per call
//!
//! [`Renderer`] owns both, routes each draw, and flushes only when the
//! region, the shader, the uniform bag, the texture list or the buffer
//! capacity forces it.
//!
//! Convention:
//! - CPU geometry is in pixels (top-left origin, +Y down)
//! - vertex shaders convert to clip space using the `uResolution` uniform

mod graphic;
mod options;
pub mod region;
mod renderer;
mod sprite;
mod stats;
pub mod texture;

pub use graphic::{GraphicRegion, GraphicVertex, GRAPHIC_LAYOUT};
pub use options::DrawOptions;
pub use region::{FlushContext, Region, RegionKind};
pub use renderer::{RenderError, Renderer, RendererInit, DEFAULT_MAX_QUADS, MAX_MASK_DEPTH};
pub use sprite::{SpriteRegion, SpriteVertex, SPRITE_LAYOUT};
pub use stats::RenderStats;
pub use texture::{ImageLoader, LoadError, Texture, TextureCache, TextureLoad};
