use std::f32::consts::TAU;

use crate::coords::Vec2;

/// Corners of `[0, size]` in fan order: top-left, top-right, bottom-right,
/// bottom-left.
#[inline]
pub fn rect_points(size: Vec2) -> [Vec2; 4] {
    [
        Vec2::zero(),
        Vec2::new(size.x, 0.0),
        size,
        Vec2::new(0.0, size.y),
    ]
}

/// Perimeter segment count that keeps edges around 4 px long, within [12, 128].
pub fn circle_segments(radius: f32) -> usize {
    let perimeter = TAU * radius.abs();
    ((perimeter / 4.0).ceil() as usize).clamp(12, 128)
}

/// Triangle-fan points of a circle inscribed in `[0, 2r]`.
///
/// The first point is the center `(r, r)`; the perimeter follows and repeats
/// its first point to close the fan, so the result has `segments + 2` points.
pub fn circle_points(radius: f32, segments: usize) -> Vec<Vec2> {
    let segments = segments.max(3);
    let center = Vec2::splat(radius);
    let mut points = Vec::with_capacity(segments + 2);
    points.push(center);
    for i in 0..=segments {
        let angle = TAU * (i % segments) as f32 / segments as f32;
        points.push(center + Vec2::from_angle(angle) * radius);
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_corners_in_fan_order() {
        let pts = rect_points(Vec2::new(4.0, 2.0));
        assert_eq!(pts[0], Vec2::zero());
        assert_eq!(pts[2], Vec2::new(4.0, 2.0));
        assert_eq!(pts[3], Vec2::new(0.0, 2.0));
    }

    #[test]
    fn circle_is_centered_in_its_box_and_closed() {
        let pts = circle_points(5.0, 16);
        assert_eq!(pts.len(), 18);
        assert_eq!(pts[0], Vec2::new(5.0, 5.0));
        assert_eq!(pts[1], pts[17]);
        for p in &pts[1..] {
            assert!((p.distance(pts[0]) - 5.0).abs() < 1e-4);
            assert!(p.x >= -1e-4 && p.x <= 10.0 + 1e-4);
        }
    }

    #[test]
    fn segment_count_scales_with_radius() {
        assert_eq!(circle_segments(1.0), 12);
        assert!(circle_segments(50.0) > circle_segments(20.0));
        assert_eq!(circle_segments(10_000.0), 128);
    }
}
