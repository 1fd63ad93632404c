//! Coordinate and geometry types shared across the renderer, geometry builders
//! and tilemaps.
//!
//! Canonical CPU space:
//! - Pixels, origin top-left
//! - +X right, +Y down
//!
//! Vertex shaders convert to clip space using a resolution uniform.

mod rect;
mod vec2;
mod viewport;

pub use rect::Rect;
pub use vec2::Vec2;
pub use viewport::Viewport;
