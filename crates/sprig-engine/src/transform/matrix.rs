use crate::coords::Vec2;

/// 3x2 affine matrix.
///
/// Maps a local point as
/// `x' = a·x + c·y + tx`, `y' = b·x + d·y + ty`.
///
/// Composition operations (`translate`, `rotate`, `scale`) right-multiply, so
/// they act in the current local frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Transform {
    pub const IDENTITY: Transform = Transform { a: 1.0, b: 0.0, c: 0.0, d: 1.0, tx: 0.0, ty: 0.0 };

    #[inline]
    pub const fn new(a: f32, b: f32, c: f32, d: f32, tx: f32, ty: f32) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    #[inline]
    pub fn translate(&mut self, x: f32, y: f32) {
        self.tx += self.a * x + self.c * y;
        self.ty += self.b * x + self.d * y;
    }

    /// Rotates by `angle` radians (clockwise on screen, +Y down).
    pub fn rotate(&mut self, angle: f32) {
        if angle == 0.0 {
            return;
        }
        let (sin, cos) = angle.sin_cos();
        let Transform { a, b, c, d, .. } = *self;
        self.a = a * cos + c * sin;
        self.b = b * cos + d * sin;
        self.c = c * cos - a * sin;
        self.d = d * cos - b * sin;
    }

    #[inline]
    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.a *= sx;
        self.b *= sx;
        self.c *= sy;
        self.d *= sy;
    }

    /// `self · rhs`: applies `rhs` first, then `self`.
    pub fn multiply(&self, rhs: &Transform) -> Transform {
        Transform {
            a: self.a * rhs.a + self.c * rhs.b,
            b: self.b * rhs.a + self.d * rhs.b,
            c: self.a * rhs.c + self.c * rhs.d,
            d: self.b * rhs.c + self.d * rhs.d,
            tx: self.a * rhs.tx + self.c * rhs.ty + self.tx,
            ty: self.b * rhs.tx + self.d * rhs.ty + self.ty,
        }
    }

    #[inline]
    pub fn determinant(&self) -> f32 {
        self.a * self.d - self.b * self.c
    }

    /// Maps a local point to global space.
    #[inline]
    pub fn apply(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            self.a * p.x + self.c * p.y + self.tx,
            self.b * p.x + self.d * p.y + self.ty,
        )
    }

    /// Maps a direction (no translation).
    #[inline]
    pub fn apply_vector(&self, v: Vec2) -> Vec2 {
        Vec2::new(self.a * v.x + self.c * v.y, self.b * v.x + self.d * v.y)
    }

    /// Algebraic inverse. A zero determinant yields non-finite components.
    pub fn inverse(&self) -> Transform {
        let inv = 1.0 / self.determinant();
        Transform {
            a: self.d * inv,
            b: -self.b * inv,
            c: -self.c * inv,
            d: self.a * inv,
            tx: (self.c * self.ty - self.d * self.tx) * inv,
            ty: (self.b * self.tx - self.a * self.ty) * inv,
        }
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.tx, self.ty)
    }

    /// Rotation of the X basis vector, radians.
    #[inline]
    pub fn rotation(&self) -> f32 {
        self.b.atan2(self.a)
    }

    /// Decomposed scale. A negative Y scale reports a reflection.
    pub fn scale_factors(&self) -> Vec2 {
        let sx = self.a.hypot(self.b);
        if sx == 0.0 {
            return Vec2::new(0.0, self.c.hypot(self.d));
        }
        Vec2::new(sx, self.determinant() / sx)
    }

    #[inline]
    pub fn set_position(&mut self, p: Vec2) {
        self.tx = p.x;
        self.ty = p.y;
    }

    /// Recomposes with `angle`, keeping the decomposed scale.
    pub fn set_rotation(&mut self, angle: f32) {
        let scale = self.scale_factors();
        self.compose(angle, scale);
    }

    /// Recomposes with `scale`, keeping the decomposed rotation.
    pub fn set_scale(&mut self, scale: Vec2) {
        let angle = self.rotation();
        self.compose(angle, scale);
    }

    fn compose(&mut self, angle: f32, scale: Vec2) {
        let (sin, cos) = angle.sin_cos();
        self.a = scale.x * cos;
        self.b = scale.x * sin;
        self.c = -scale.y * sin;
        self.d = scale.y * cos;
    }
}

impl Default for Transform {
    fn default() -> Self {
        Transform::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn translate_then_apply_origin() {
        let mut t = Transform::IDENTITY;
        t.translate(10.0, 20.0);
        assert_eq!(t.apply(Vec2::zero()), Vec2::new(10.0, 20.0));
    }

    #[test]
    fn operations_act_in_local_frame() {
        let mut t = Transform::IDENTITY;
        t.translate(100.0, 0.0);
        t.rotate(FRAC_PI_2);
        t.scale(2.0, 2.0);
        // local +X is global +Y after a quarter turn, doubled
        assert!(close(t.apply(Vec2::new(1.0, 0.0)), Vec2::new(100.0, 2.0)));
    }

    #[test]
    fn inverse_round_trips_points() {
        let mut t = Transform::IDENTITY;
        t.translate(13.0, -7.0);
        t.rotate(0.7);
        t.scale(3.0, -0.5);
        let inv = t.inverse();
        for p in [Vec2::new(0.0, 0.0), Vec2::new(5.0, 9.0), Vec2::new(-40.0, 2.5)] {
            assert!(close(inv.apply(t.apply(p)), p));
        }
        let id = t.multiply(&inv);
        assert!(close(id.apply(Vec2::new(3.0, 4.0)), Vec2::new(3.0, 4.0)));
    }

    #[test]
    fn degenerate_inverse_is_not_finite() {
        let mut t = Transform::IDENTITY;
        t.scale(0.0, 1.0);
        assert!(!t.inverse().apply(Vec2::new(1.0, 1.0)).is_finite());
    }

    #[test]
    fn decomposition_matches_composition() {
        let mut t = Transform::IDENTITY;
        t.translate(4.0, 5.0);
        t.rotate(0.3);
        t.scale(2.0, 3.0);
        assert!((t.rotation() - 0.3).abs() < 1e-5);
        assert!(close(t.scale_factors(), Vec2::new(2.0, 3.0)));
        assert_eq!(t.position(), Vec2::new(4.0, 5.0));
    }

    #[test]
    fn setters_preserve_other_components() {
        let mut t = Transform::IDENTITY;
        t.translate(4.0, 5.0);
        t.rotate(0.3);
        t.scale(2.0, 3.0);

        t.set_rotation(-1.0);
        assert!((t.rotation() + 1.0).abs() < 1e-5);
        assert!(close(t.scale_factors(), Vec2::new(2.0, 3.0)));
        assert_eq!(t.position(), Vec2::new(4.0, 5.0));

        t.set_scale(Vec2::new(0.5, 0.25));
        assert!((t.rotation() + 1.0).abs() < 1e-5);
        assert!(close(t.scale_factors(), Vec2::new(0.5, 0.25)));
    }
}
