use crate::coords::Vec2;

use super::TileId;

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum TileShape {
    #[default]
    Square,
    /// Diamond tiles in staggered rows: each row is half a tile high and odd
    /// rows shift right by half a tile.
    Isometric,
}

/// Row-major grid of optional tile ids.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    columns: usize,
    rows: usize,
    tiles: Vec<Option<TileId>>,
    pub shape: TileShape,
}

impl TileLayer {
    pub fn new(columns: usize, rows: usize, shape: TileShape) -> Self {
        Self { columns, rows, tiles: vec![None; columns * rows], shape }
    }

    /// Builds a layer from row-major ids where `0` means empty.
    pub fn from_ids(columns: usize, ids: &[TileId], shape: TileShape) -> Self {
        let rows = if columns == 0 { 0 } else { ids.len().div_ceil(columns) };
        let mut tiles: Vec<Option<TileId>> =
            ids.iter().map(|&id| if id == 0 { None } else { Some(id) }).collect();
        tiles.resize(columns * rows, None);
        Self { columns, rows, tiles, shape }
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn get(&self, column: usize, row: usize) -> Option<TileId> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        self.tiles[row * self.columns + column]
    }

    pub fn set(&mut self, column: usize, row: usize, tile: Option<TileId>) {
        if column < self.columns && row < self.rows {
            self.tiles[row * self.columns + column] = tile;
        }
    }

    /// Vertical distance between consecutive rows.
    #[inline]
    pub fn row_height(&self, tile_size: Vec2) -> f32 {
        match self.shape {
            TileShape::Square => tile_size.y,
            TileShape::Isometric => tile_size.y * 0.5,
        }
    }

    /// Top-left of the cell's bounding box in layer-local pixels.
    pub fn tile_to_local(&self, column: usize, row: usize, tile_size: Vec2) -> Vec2 {
        let (c, r) = (column as f32, row as f32);
        match self.shape {
            TileShape::Square => Vec2::new(c * tile_size.x, r * tile_size.y),
            TileShape::Isometric => {
                let stagger = if row % 2 == 1 { tile_size.x * 0.5 } else { 0.0 };
                Vec2::new(c * tile_size.x + stagger, r * tile_size.y * 0.5)
            }
        }
    }

    /// Cell containing a layer-local point, `None` outside the grid.
    pub fn local_to_tile(&self, p: Vec2, tile_size: Vec2) -> Option<(usize, usize)> {
        let (column, row) = local_to_cell(self.shape, p, tile_size);
        if column < 0 || row < 0 {
            return None;
        }
        let (column, row) = (column as usize, row as usize);
        (column < self.columns && row < self.rows).then_some((column, row))
    }
}

/// Unbounded cell coordinates of `p`.
///
/// Isometric: the point is first located in a full-height box of an even row,
/// then the four box corners outside the diamond are handed to the odd-row
/// neighbours around it.
fn local_to_cell(shape: TileShape, p: Vec2, tile_size: Vec2) -> (i64, i64) {
    let (tw, th) = (tile_size.x, tile_size.y);
    match shape {
        TileShape::Square => ((p.x / tw).floor() as i64, (p.y / th).floor() as i64),
        TileShape::Isometric => {
            let (gx, gy) = ((p.x / tw).floor(), (p.y / th).floor());
            let (fx, fy) = (p.x / tw - gx, p.y / th - gy);
            let (column, row) = (gx as i64, gy as i64 * 2);
            if fx + fy < 0.5 {
                (column - 1, row - 1)
            } else if fx - fy > 0.5 {
                (column, row - 1)
            } else if fy - fx > 0.5 {
                (column - 1, row + 1)
            } else if fx + fy > 1.5 {
                (column, row + 1)
            } else {
                (column, row)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TILE: Vec2 = Vec2::new(64.0, 32.0);

    #[test]
    fn square_mapping_is_floor_division() {
        let layer = TileLayer::new(10, 10, TileShape::Square);
        assert_eq!(layer.tile_to_local(2, 3, TILE), Vec2::new(128.0, 96.0));
        assert_eq!(layer.local_to_tile(Vec2::new(130.0, 127.0), TILE), Some((2, 3)));
        assert_eq!(layer.local_to_tile(Vec2::new(-1.0, 0.0), TILE), None);
        assert_eq!(layer.local_to_tile(Vec2::new(640.0, 0.0), TILE), None);
    }

    #[test]
    fn isometric_rows_are_staggered() {
        let layer = TileLayer::new(10, 10, TileShape::Isometric);
        assert_eq!(layer.tile_to_local(0, 1, TILE), Vec2::new(32.0, 16.0));
        assert_eq!(layer.tile_to_local(2, 2, TILE), Vec2::new(128.0, 32.0));
        assert_eq!(layer.row_height(TILE), 16.0);
    }

    #[test]
    fn isometric_centers_map_back_to_their_tile() {
        let layer = TileLayer::new(10, 10, TileShape::Isometric);
        for row in 1..9 {
            for column in 1..9 {
                let center = layer.tile_to_local(column, row, TILE) + TILE * 0.5;
                assert_eq!(layer.local_to_tile(center, TILE), Some((column, row)), "{column},{row}");
            }
        }
    }

    #[test]
    fn isometric_box_corners_belong_to_odd_neighbours() {
        let layer = TileLayer::new(10, 10, TileShape::Isometric);
        // box of (2, 2) spans x 128..192, y 32..64
        assert_eq!(layer.local_to_tile(Vec2::new(130.0, 34.0), TILE), Some((1, 1)));
        assert_eq!(layer.local_to_tile(Vec2::new(190.0, 34.0), TILE), Some((2, 1)));
        assert_eq!(layer.local_to_tile(Vec2::new(130.0, 62.0), TILE), Some((1, 3)));
        assert_eq!(layer.local_to_tile(Vec2::new(190.0, 62.0), TILE), Some((2, 3)));
        assert_eq!(layer.local_to_tile(Vec2::new(160.0, 48.0), TILE), Some((2, 2)));
    }

    #[test]
    fn from_ids_treats_zero_as_empty() {
        let layer = TileLayer::from_ids(3, &[1, 0, 2, 3], TileShape::Square);
        assert_eq!(layer.rows(), 2);
        assert_eq!(layer.get(1, 0), None);
        assert_eq!(layer.get(0, 1), Some(3));
        assert_eq!(layer.get(2, 1), None);
    }
}
