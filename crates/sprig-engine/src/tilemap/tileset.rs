use std::collections::HashMap;

use crate::coords::{Rect, Vec2};
use crate::render::Texture;

pub type TileId = u32;

/// How one tile id is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct TileDescriptor {
    pub texture: Texture,
    /// Normalized texture region.
    pub uv: Rect,
    /// Draw size; the tileset cell size when `None`.
    pub size: Option<Vec2>,
    /// Added to the tile's row position to get its Y-sort key.
    pub y_sort_offset: f32,
    /// Positional adjustment from the cell origin, e.g. to bottom-align tall tiles.
    pub offset: Vec2,
}

impl TileDescriptor {
    pub fn new(texture: Texture, uv: Rect) -> Self {
        Self { texture, uv, size: None, y_sort_offset: 0.0, offset: Vec2::zero() }
    }

    pub fn with_size(mut self, size: Vec2) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_y_sort_offset(mut self, offset: f32) -> Self {
        self.y_sort_offset = offset;
        self
    }

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }
}

/// Cell size plus the id → descriptor table.
#[derive(Debug, Clone)]
pub struct TileSet {
    pub tile_width: f32,
    pub tile_height: f32,
    tiles: HashMap<TileId, TileDescriptor>,
}

impl TileSet {
    pub fn new(tile_width: f32, tile_height: f32) -> Self {
        Self { tile_width, tile_height, tiles: HashMap::new() }
    }

    /// Registers every cell of a grid atlas, row-major, starting at `first_id`.
    ///
    /// Cells are `tile_width x tile_height` texels; partial cells at the right
    /// and bottom edges are skipped.
    pub fn from_atlas(texture: &Texture, tile_width: f32, tile_height: f32, first_id: TileId) -> Self {
        let mut set = Self::new(tile_width, tile_height);
        let size = texture.size();
        if tile_width <= 0.0 || tile_height <= 0.0 || size.x <= 0.0 || size.y <= 0.0 {
            return set;
        }
        let columns = (size.x / tile_width).floor() as u32;
        let rows = (size.y / tile_height).floor() as u32;
        let (du, dv) = (tile_width / size.x, tile_height / size.y);

        let mut id = first_id;
        for row in 0..rows {
            for column in 0..columns {
                let uv = Rect::new(column as f32 * du, row as f32 * dv, du, dv);
                set.insert(id, TileDescriptor::new(texture.clone(), uv));
                id += 1;
            }
        }
        set
    }

    #[inline]
    pub fn tile_size(&self) -> Vec2 {
        Vec2::new(self.tile_width, self.tile_height)
    }

    pub fn insert(&mut self, id: TileId, descriptor: TileDescriptor) -> Option<TileDescriptor> {
        self.tiles.insert(id, descriptor)
    }

    #[inline]
    pub fn get(&self, id: TileId) -> Option<&TileDescriptor> {
        self.tiles.get(&id)
    }

    #[inline]
    pub fn get_mut(&mut self, id: TileId) -> Option<&mut TileDescriptor> {
        self.tiles.get_mut(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::ImageData;

    #[test]
    fn atlas_cells_are_row_major() {
        let tex = Texture::from_image(ImageData::solid(64, 32, [255; 4]));
        let set = TileSet::from_atlas(&tex, 16.0, 16.0, 1);
        assert_eq!(set.len(), 8);
        assert_eq!(set.get(1).unwrap().uv, Rect::new(0.0, 0.0, 0.25, 0.5));
        assert_eq!(set.get(6).unwrap().uv, Rect::new(0.25, 0.5, 0.25, 0.5));
        assert!(set.get(0).is_none());
    }
}
