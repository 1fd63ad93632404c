//! Grid and isometric tile layers.
//!
//! Planning (which tiles to draw, in which order) is separate from drawing so
//! it can be tested without a device; the renderer turns a [`TilePlan`] into
//! sprites.

mod layer;
mod plan;
mod tileset;

pub use layer::{TileLayer, TileShape};
pub use plan::{plan_layer, TileDrawItem, TilePlan, YSortEntry};
pub use tileset::{TileDescriptor, TileId, TileSet};
