use std::f32::consts::PI;

use crate::coords::Vec2;

/// Longest miter, as a multiple of the half line width.
pub const MAX_MITER_SCALE: f32 = 4.0;

/// Direction cosine below which two segments count as a reversal.
const REVERSAL_COS: f32 = -0.999;

const CAP_SEGMENTS: usize = 10;

/// Offset direction at a polyline vertex.
///
/// The stroke edges pass through `point ± normal * scale * width / 2`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Join {
    pub normal: Vec2,
    pub scale: f32,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LineStyle {
    pub width: f32,
    /// Connect the last point back to the first.
    pub closed: bool,
    /// Half-circle caps on the two ends of an open line.
    pub round_cap: bool,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self { width: 1.0, closed: false, round_cap: false }
    }
}

/// Miter join at `cur` between segments `prev → cur` and `cur → next`.
///
/// The normal bisects the two segment normals and is scaled by
/// `1 / cos(half angle)`, capped at [`MAX_MITER_SCALE`]. A near-reversal
/// falls back to the incoming segment's normal with scale 1.
pub fn miter_join(prev: Vec2, cur: Vec2, next: Vec2) -> Join {
    let d_prev = (cur - prev).normalize();
    let d_next = (next - cur).normalize();
    let n_prev = d_prev.perp();

    if d_prev.dot(d_next) < REVERSAL_COS {
        return Join { normal: n_prev, scale: 1.0 };
    }

    let normal = (n_prev + d_next.perp()).normalize();
    let cos_half = normal.dot(n_prev);
    let scale = if cos_half > 0.0 { (1.0 / cos_half).min(MAX_MITER_SCALE) } else { 1.0 };
    Join { normal, scale }
}

/// Expands a polyline into a triangle list (three points per triangle).
///
/// Consecutive duplicate points are ignored. Fewer than two distinct points
/// produce nothing.
pub fn polyline_triangles(points: &[Vec2], style: &LineStyle) -> Vec<Vec2> {
    let mut pts: Vec<Vec2> = Vec::with_capacity(points.len());
    for &p in points {
        if pts.last() != Some(&p) {
            pts.push(p);
        }
    }
    if style.closed && pts.len() > 2 && pts.first() == pts.last() {
        pts.pop();
    }
    let n = pts.len();
    if n < 2 {
        return Vec::new();
    }

    let closed = style.closed && n > 2;
    let half = style.width * 0.5;

    let offsets: Vec<Vec2> = (0..n)
        .map(|i| {
            let join = if closed {
                miter_join(pts[(i + n - 1) % n], pts[i], pts[(i + 1) % n])
            } else if i == 0 {
                Join { normal: (pts[1] - pts[0]).normalize().perp(), scale: 1.0 }
            } else if i == n - 1 {
                Join { normal: (pts[i] - pts[i - 1]).normalize().perp(), scale: 1.0 }
            } else {
                miter_join(pts[i - 1], pts[i], pts[i + 1])
            };
            join.normal * (join.scale * half)
        })
        .collect();

    let segments = if closed { n } else { n - 1 };
    let caps = if style.round_cap && !closed { 2 * CAP_SEGMENTS * 3 } else { 0 };
    let mut out = Vec::with_capacity(segments * 6 + caps);

    for i in 0..segments {
        let j = (i + 1) % n;
        let (la, ra) = (pts[i] + offsets[i], pts[i] - offsets[i]);
        let (lb, rb) = (pts[j] + offsets[j], pts[j] - offsets[j]);
        out.extend_from_slice(&[la, ra, lb, ra, rb, lb]);
    }

    if caps > 0 {
        let start_normal = (pts[1] - pts[0]).normalize().perp();
        // sweeping +π from the normal passes through the backward direction
        push_cap(&mut out, pts[0], start_normal, half, 1.0);
        let end_normal = (pts[n - 1] - pts[n - 2]).normalize().perp();
        push_cap(&mut out, pts[n - 1], end_normal, half, -1.0);
    }

    out
}

fn push_cap(out: &mut Vec<Vec2>, center: Vec2, normal: Vec2, radius: f32, sweep: f32) {
    let start = normal.angle();
    let at = |k: usize| {
        let angle = start + sweep * PI * k as f32 / CAP_SEGMENTS as f32;
        center + Vec2::from_angle(angle) * radius
    };
    for k in 0..CAP_SEGMENTS {
        out.extend_from_slice(&[center, at(k), at(k + 1)]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── joins ─────────────────────────────────────────────────────────────

    #[test]
    fn straight_joint_has_unit_scale() {
        let j = miter_join(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(20.0, 0.0));
        assert!((j.scale - 1.0).abs() < 1e-6);
        assert!((j.normal - Vec2::new(0.0, 1.0)).length() < 1e-6);
    }

    #[test]
    fn right_angle_scale_is_sqrt2() {
        let j = miter_join(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(10.0, 10.0));
        assert!((j.scale - 2f32.sqrt()).abs() < 1e-5);
        assert!((j.normal.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn reversal_falls_back_to_segment_normal() {
        let j = miter_join(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(0.0, 0.001));
        assert_eq!(j.scale, 1.0);
        assert!((j.normal - Vec2::new(0.0, 1.0)).length() < 1e-6);
    }

    #[test]
    fn sharp_angles_are_capped() {
        // ~170° turn: raw miter would be ~11.5
        let j = miter_join(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(0.0, 1.76));
        assert!(j.scale <= MAX_MITER_SCALE);
        assert_eq!(j.scale, MAX_MITER_SCALE);
        for k in 1..90 {
            let a = k as f32 * 0.035;
            let next = Vec2::new(10.0, 0.0) + Vec2::from_angle(a) * 5.0;
            assert!(miter_join(Vec2::zero(), Vec2::new(10.0, 0.0), next).scale <= MAX_MITER_SCALE);
        }
    }

    // ── strokes ───────────────────────────────────────────────────────────

    #[test]
    fn open_line_emits_two_triangles_per_segment() {
        let pts = [Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(10.0, 10.0)];
        let tris = polyline_triangles(&pts, &LineStyle { width: 2.0, ..LineStyle::default() });
        assert_eq!(tris.len(), 12);
        // first segment edges sit one unit off the centerline
        assert_eq!(tris[0], Vec2::new(0.0, 1.0));
        assert_eq!(tris[1], Vec2::new(0.0, -1.0));
    }

    #[test]
    fn round_caps_add_two_fans() {
        let pts = [Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0)];
        let style = LineStyle { width: 4.0, round_cap: true, ..LineStyle::default() };
        let tris = polyline_triangles(&pts, &style);
        assert_eq!(tris.len(), 6 + 2 * 10 * 3);
        // start cap bulges backwards, end cap forwards
        let start_cap = &tris[6..36];
        assert!(start_cap.iter().all(|p| p.x <= 1e-4));
        assert!(start_cap.iter().any(|p| (p.x + 2.0).abs() < 1e-4));
        let end_cap = &tris[36..];
        assert!(end_cap.iter().all(|p| p.x >= 10.0 - 1e-4));
    }

    #[test]
    fn closed_path_wraps_the_seam() {
        let square = [
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
        ];
        let style = LineStyle { width: 2.0, closed: true, round_cap: true };
        let tris = polyline_triangles(&square, &style);
        assert_eq!(tris.len(), 4 * 6);
        // first vertex is mitered (corner offset along the diagonal)
        assert!((tris[0] - Vec2::new(1.0, 1.0)).length() < 1e-4);
    }

    #[test]
    fn degenerate_input_is_empty() {
        assert!(polyline_triangles(&[], &LineStyle::default()).is_empty());
        let same = [Vec2::new(1.0, 1.0), Vec2::new(1.0, 1.0)];
        assert!(polyline_triangles(&same, &LineStyle::default()).is_empty());
    }
}
