use std::ops::Range;

use crate::coords::Vec2;

use super::{TileId, TileLayer, TileSet, TileShape};

/// Caller-supplied drawable sorted in with the grid, identified by `key`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct YSortEntry {
    pub y_sort: f32,
    pub key: usize,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TileDrawItem {
    Tile {
        column: usize,
        row: usize,
        tile: TileId,
        /// Layer-local top-left, descriptor offset included.
        position: Vec2,
    },
    Extra {
        key: usize,
    },
}

/// Paint-ordered draw list for one layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TilePlan {
    pub columns: Range<usize>,
    pub rows: Range<usize>,
    pub items: Vec<TileDrawItem>,
}

/// Plans the tiles of `layer` intersecting the visible rectangle, widened by
/// `margin` cells on every side, interleaved with `extras`.
///
/// Rows go top to bottom. Within a row, grid tiles (keyed by row position
/// plus their descriptor's Y-sort offset) and the extras bucketed into that
/// row by `floor(y_sort / row_height)` are emitted in ascending Y-sort order;
/// ties keep grid tiles first, left to right. Extras outside the visible rows
/// land in the nearest visible one. Tile ids missing from the tileset are
/// skipped.
pub fn plan_layer(
    layer: &TileLayer,
    tileset: &TileSet,
    visible_origin: Vec2,
    visible_size: Vec2,
    margin: usize,
    extras: &[YSortEntry],
) -> TilePlan {
    let tile = tileset.tile_size();
    let row_height = layer.row_height(tile);
    if tile.x <= 0.0 || row_height <= 0.0 {
        return TilePlan::default();
    }
    let margin = margin as i64;

    let (stagger, overhang) = match layer.shape {
        TileShape::Square => (0.0, 0),
        // odd rows sit half a tile right; a diamond spans two rows
        TileShape::Isometric => (tile.x * 0.5, 1),
    };
    let columns = clamp_range(
        ((visible_origin.x - stagger) / tile.x).floor() as i64 - margin,
        ((visible_origin.x + visible_size.x) / tile.x).ceil() as i64 + margin,
        layer.columns(),
    );
    let rows = clamp_range(
        (visible_origin.y / row_height).floor() as i64 - margin - overhang,
        ((visible_origin.y + visible_size.y) / row_height).ceil() as i64 + margin,
        layer.rows(),
    );

    let mut items = Vec::new();
    if rows.is_empty() {
        let mut sorted = extras.to_vec();
        sorted.sort_by(|a, b| a.y_sort.total_cmp(&b.y_sort));
        items.extend(sorted.iter().map(|e| TileDrawItem::Extra { key: e.key }));
        return TilePlan { columns, rows, items };
    }

    let mut buckets: Vec<Vec<(f32, TileDrawItem)>> = vec![Vec::new(); rows.len()];
    for row in rows.clone() {
        let bucket = &mut buckets[row - rows.start];
        for column in columns.clone() {
            let Some(id) = layer.get(column, row) else { continue };
            let Some(descriptor) = tileset.get(id) else { continue };
            let cell = layer.tile_to_local(column, row, tile);
            bucket.push((
                cell.y + descriptor.y_sort_offset,
                TileDrawItem::Tile { column, row, tile: id, position: cell + descriptor.offset },
            ));
        }
    }

    let last = (rows.end - 1) as i64;
    for extra in extras {
        let row = ((extra.y_sort / row_height).floor() as i64).clamp(rows.start as i64, last);
        buckets[row as usize - rows.start].push((extra.y_sort, TileDrawItem::Extra { key: extra.key }));
    }

    for bucket in &mut buckets {
        bucket.sort_by(|a, b| a.0.total_cmp(&b.0));
        items.extend(bucket.iter().map(|(_, item)| *item));
    }

    TilePlan { columns, rows, items }
}

fn clamp_range(start: i64, end: i64, len: usize) -> Range<usize> {
    let len = len as i64;
    let start = start.clamp(0, len);
    let end = end.clamp(start, len);
    start as usize..end as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Rect;
    use crate::device::ImageData;
    use crate::render::Texture;
    use crate::tilemap::TileDescriptor;

    fn tileset() -> TileSet {
        let tex = Texture::from_image(ImageData::solid(1, 1, [255; 4]));
        let mut set = TileSet::new(32.0, 32.0);
        set.insert(1, TileDescriptor::new(tex.clone(), Rect::unit()));
        set.insert(2, TileDescriptor::new(tex, Rect::unit()).with_y_sort_offset(20.0));
        set
    }

    fn extra_keys(plan: &TilePlan) -> Vec<usize> {
        plan.items
            .iter()
            .filter_map(|i| match i {
                TileDrawItem::Extra { key } => Some(*key),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn extras_in_one_row_are_sorted_by_y() {
        let layer = TileLayer::from_ids(2, &[1, 1], TileShape::Square);
        let extras = [
            YSortEntry { y_sort: 5.0, key: 0 },
            YSortEntry { y_sort: 15.0, key: 1 },
            YSortEntry { y_sort: 10.0, key: 2 },
        ];
        let plan = plan_layer(&layer, &tileset(), Vec2::zero(), Vec2::new(64.0, 32.0), 0, &extras);
        let ys: Vec<f32> = extra_keys(&plan).iter().map(|&k| extras[k].y_sort).collect();
        assert_eq!(ys, [5.0, 10.0, 15.0]);
        // ground tiles (y_sort 0) come first
        assert!(matches!(plan.items[0], TileDrawItem::Tile { column: 0, .. }));
        assert!(matches!(plan.items[1], TileDrawItem::Tile { column: 1, .. }));
    }

    #[test]
    fn y_sort_offset_interleaves_tiles_with_extras() {
        let layer = TileLayer::from_ids(1, &[2], TileShape::Square);
        let extras = [YSortEntry { y_sort: 10.0, key: 7 }, YSortEntry { y_sort: 25.0, key: 8 }];
        let plan = plan_layer(&layer, &tileset(), Vec2::zero(), Vec2::new(32.0, 32.0), 0, &extras);
        assert_eq!(plan.items.len(), 3);
        assert_eq!(plan.items[0], TileDrawItem::Extra { key: 7 });
        assert!(matches!(plan.items[1], TileDrawItem::Tile { tile: 2, .. }));
        assert_eq!(plan.items[2], TileDrawItem::Extra { key: 8 });
    }

    #[test]
    fn rows_are_emitted_top_to_bottom() {
        let layer = TileLayer::from_ids(1, &[1, 1, 1], TileShape::Square);
        let extras = [YSortEntry { y_sort: 40.0, key: 0 }];
        let plan = plan_layer(&layer, &tileset(), Vec2::zero(), Vec2::new(32.0, 96.0), 0, &extras);
        let order: Vec<String> = plan
            .items
            .iter()
            .map(|i| match i {
                TileDrawItem::Tile { row, .. } => format!("t{row}"),
                TileDrawItem::Extra { key } => format!("e{key}"),
            })
            .collect();
        assert_eq!(order, ["t0", "t1", "e0", "t2"]);
    }

    #[test]
    fn visible_range_is_culled_with_margin() {
        let layer = TileLayer::new(100, 100, TileShape::Square);
        let set = tileset();
        let plan = plan_layer(&layer, &set, Vec2::new(320.0, 640.0), Vec2::new(64.0, 64.0), 0, &[]);
        assert_eq!(plan.columns, 10..12);
        assert_eq!(plan.rows, 20..22);

        let plan = plan_layer(&layer, &set, Vec2::new(320.0, 640.0), Vec2::new(64.0, 64.0), 2, &[]);
        assert_eq!(plan.columns, 8..14);
        assert_eq!(plan.rows, 18..24);

        // clamped at the grid edges
        let plan = plan_layer(&layer, &set, Vec2::new(-100.0, 3100.0), Vec2::new(64.0, 500.0), 1, &[]);
        assert_eq!(plan.columns, 0..0);
        assert_eq!(plan.rows, 95..100);
    }

    #[test]
    fn isometric_rows_use_half_height() {
        let layer = TileLayer::new(20, 40, TileShape::Isometric);
        let plan = plan_layer(&layer, &tileset(), Vec2::new(0.0, 160.0), Vec2::new(64.0, 64.0), 0, &[]);
        // row height 16: rows 10..14, plus one row of diamond overhang above
        assert_eq!(plan.rows, 9..14);
        assert_eq!(plan.columns, 0..2);
    }

    #[test]
    fn extras_outside_visible_rows_are_clamped() {
        let layer = TileLayer::new(4, 10, TileShape::Square);
        let extras = [YSortEntry { y_sort: -50.0, key: 1 }, YSortEntry { y_sort: 9999.0, key: 2 }];
        let plan = plan_layer(&layer, &tileset(), Vec2::new(0.0, 64.0), Vec2::new(32.0, 32.0), 0, &extras);
        assert_eq!(plan.rows, 2..3);
        assert_eq!(extra_keys(&plan), [1, 2]);
    }
}
