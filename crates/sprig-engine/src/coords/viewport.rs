/// Drawable size in device pixels.
///
/// Vertex shaders receive this as `uResolution` and map pixel positions to
/// clip space with it.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    /// Size as a vector, for arithmetic against positions.
    #[inline]
    pub fn size(self) -> super::Vec2 {
        super::Vec2::new(self.width, self.height)
    }
}
