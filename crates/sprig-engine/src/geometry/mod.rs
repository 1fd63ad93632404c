//! CPU-side geometry builders feeding the graphic region.
//!
//! All builders work in the primitive's local box `[0, size]` and return
//! points ready to be mapped through the transform stack.

mod polyline;
mod shapes;

pub use polyline::{miter_join, polyline_triangles, Join, LineStyle, MAX_MITER_SCALE};
pub use shapes::{circle_points, circle_segments, rect_points};
