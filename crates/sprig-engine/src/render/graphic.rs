use std::mem::size_of;
use std::rc::Rc;

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};

use crate::buffer::GpuBuffer;
use crate::coords::Vec2;
use crate::device::{AttribType, BufferTarget, DrawMode, GpuDevice, UniformData, VertexAttribute};
use crate::paint::Fill;
use crate::shader::{template, CustomShader, ShaderProgram, ShaderSnippet, UniformBag};

use super::region::{FlushContext, Region};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct GraphicVertex {
    pub position: [f32; 2],
    pub color: u32,
}

const GRAPHIC_STRIDE: u32 = size_of::<GraphicVertex>() as u32;

pub const GRAPHIC_LAYOUT: [VertexAttribute; 2] = [
    VertexAttribute {
        name: "aPosition",
        components: 2,
        ty: AttribType::F32,
        normalized: false,
        stride: GRAPHIC_STRIDE,
        offset: 0,
    },
    VertexAttribute {
        name: "aColor",
        components: 4,
        ty: AttribType::U8,
        normalized: true,
        stride: GRAPHIC_STRIDE,
        offset: 8,
    },
];

/// Single-shape region for untextured geometry.
///
/// Each shape fills the buffer on its own and is drawn right away with a
/// non-indexed draw. The draw mode is chosen per shape and falls back to a
/// triangle fan after every draw.
#[derive(Debug)]
pub struct GraphicRegion {
    vertices: GpuBuffer<GraphicVertex>,
    default_program: Rc<ShaderProgram>,
    shader: Option<CustomShader>,
    uniforms: UniformBag,
    mode: DrawMode,
}

impl GraphicRegion {
    pub fn new(device: &mut dyn GpuDevice) -> Result<Self> {
        let source = template::graphic_source(&ShaderSnippet::default(), &ShaderSnippet::default());
        let program = ShaderProgram::compile(device, &source.vertex, &source.fragment)
            .context("failed to build the default graphic shader")?;
        Ok(Self {
            vertices: GpuBuffer::new(device, BufferTarget::Vertex, 64)?,
            default_program: Rc::new(program),
            shader: None,
            uniforms: UniformBag::new(),
            mode: DrawMode::default(),
        })
    }

    #[inline]
    pub fn mode(&self) -> DrawMode {
        self.mode
    }

    /// Falls back to the built-in program if `shader` is the one entered.
    pub fn forget_shader(&mut self, shader: &CustomShader) {
        if self.shader.as_ref() == Some(shader) {
            self.shader = None;
        }
    }

    fn program(&self) -> &Rc<ShaderProgram> {
        match &self.shader {
            Some(custom) => custom.program(),
            None => &self.default_program,
        }
    }

    /// Draws one shape from global-space `points`, colored per vertex by `fill`.
    pub fn draw_shape(
        &mut self,
        ctx: &mut FlushContext<'_>,
        points: &[Vec2],
        fill: &Fill,
        mode: DrawMode,
        uniforms: &UniformBag,
    ) {
        if points.is_empty() {
            return;
        }
        self.vertices.clear();
        self.vertices.reserve(points.len());
        for (i, p) in points.iter().enumerate() {
            self.vertices.push(GraphicVertex { position: [p.x, p.y], color: fill.at(i).packed() });
        }
        self.mode = mode;
        if *uniforms != self.uniforms {
            self.uniforms = uniforms.clone();
        }
        self.render(ctx);
        ctx.stats.shapes += 1;
    }
}

impl Region for GraphicRegion {
    fn enter(&mut self, ctx: &mut FlushContext<'_>, shader: Option<&CustomShader>) {
        self.shader = shader.cloned();
        self.vertices.clear();
        self.mode = DrawMode::default();
        self.program().bind(ctx.device);
    }

    fn render(&mut self, ctx: &mut FlushContext<'_>) {
        if self.vertices.is_empty() {
            return;
        }
        let program = Rc::clone(self.program());
        program.bind(ctx.device);

        self.vertices.upload_if_dirty(ctx.device);
        self.vertices.bind(ctx.device);
        program.set_attributes(ctx.device, &GRAPHIC_LAYOUT);

        if let Some(loc) = program.uniform("uResolution") {
            ctx.device
                .set_uniform(loc, UniformData::Float(&[ctx.resolution.x, ctx.resolution.y]));
        }
        program.set_uniforms(ctx.device, &self.uniforms, 0, ctx.warnings);

        let count = self.vertices.len() as u32;
        ctx.device.draw_arrays(self.mode, 0, count);

        ctx.stats.draw_calls += 1;
        ctx.stats.flushes += 1;
        ctx.stats.vertices += count;
        log::trace!("graphic flush: {count} vertices as {:?}", self.mode);

        self.vertices.clear();
        self.mode = DrawMode::default();
    }

    #[inline]
    fn has_pending_content(&self) -> bool {
        !self.vertices.is_empty()
    }

    #[inline]
    fn is_shader_changed(&self, shader: Option<&CustomShader>) -> bool {
        self.shader.as_ref() != shader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessDevice;
    use crate::logging::WarnOnce;
    use crate::paint::Color;
    use crate::render::RenderStats;

    #[test]
    fn each_shape_is_one_draw_and_mode_resets() {
        let mut dev = HeadlessDevice::new(4);
        let mut warnings = WarnOnce::new();
        let mut stats = RenderStats::default();
        let mut region = GraphicRegion::new(&mut dev).unwrap();
        {
            let mut ctx = FlushContext {
                device: &mut dev,
                resolution: Vec2::new(10.0, 10.0),
                warnings: &mut warnings,
                stats: &mut stats,
            };
            region.enter(&mut ctx, None);
            let tri = [Vec2::zero(), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)];
            let fill = Fill::PerVertex(vec![Color::rgb(255, 0, 0), Color::rgb(0, 255, 0)]);
            region.draw_shape(&mut ctx, &tri, &fill, DrawMode::Triangles, &UniformBag::new());
            assert_eq!(region.mode(), DrawMode::TriangleFan);
            assert!(!region.has_pending_content());
            region.draw_shape(&mut ctx, &tri, &Fill::default(), DrawMode::TriangleFan, &UniformBag::new());
        }

        let draws: Vec<_> = dev.draw_calls().cloned().collect();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].mode, DrawMode::Triangles);
        assert!(!draws[0].indexed);
        assert_eq!(draws[0].count, 3);
        assert_eq!(draws[1].mode, DrawMode::TriangleFan);

        // per-vertex colors wrap: third vertex takes the first color
        let v: GraphicVertex = bytemuck::pod_read_unaligned(&draws[0].vertex_data[24..36]);
        assert_eq!(v.color, Color::rgb(255, 0, 0).packed());
        assert_eq!(stats.shapes, 2);
        assert_eq!(stats.draw_calls, 2);
    }
}
