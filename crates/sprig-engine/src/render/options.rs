use crate::coords::{Rect, Vec2};
use crate::device::DrawMode;
use crate::paint::{Color, Fill};
use crate::shader::{CustomShader, UniformBag};
use crate::transform::{Origin, TransformOptions};

/// Everything a primitive draw call accepts besides its geometry.
///
/// Fields a primitive has no use for are ignored (a rect ignores `uv`, a
/// sprite ignores `draw_mode`).
#[derive(Debug, Clone, Default)]
pub struct DrawOptions {
    pub transform: TransformOptions,
    /// Overrides the primitive's natural size (sprites: the texture region).
    pub size: Option<Vec2>,
    /// Normalized texture region; the whole texture when `None`.
    pub uv: Option<Rect>,
    pub fill: Fill,
    pub shader: Option<CustomShader>,
    pub uniforms: UniformBag,
    /// Graphic primitives only; each primitive picks its own when `None`.
    pub draw_mode: Option<DrawMode>,
}

impl DrawOptions {
    pub fn at(x: f32, y: f32) -> Self {
        Self { transform: TransformOptions::at(x, y), ..Self::default() }
    }

    pub fn with_transform(mut self, transform: TransformOptions) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.transform.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, sx: f32, sy: f32) -> Self {
        self.transform.scale = Vec2::new(sx, sy);
        self
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.transform.origin = Some(origin);
        self
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.size = Some(Vec2::new(width, height));
        self
    }

    pub fn with_uv(mut self, uv: Rect) -> Self {
        self.uv = Some(uv);
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.fill = Fill::Solid(color);
        self
    }

    pub fn with_fill(mut self, fill: Fill) -> Self {
        self.fill = fill;
        self
    }

    pub fn with_shader(mut self, shader: CustomShader) -> Self {
        self.shader = Some(shader);
        self
    }

    pub fn with_uniforms(mut self, uniforms: UniformBag) -> Self {
        self.uniforms = uniforms;
        self
    }

    pub fn with_draw_mode(mut self, mode: DrawMode) -> Self {
        self.draw_mode = Some(mode);
        self
    }
}
