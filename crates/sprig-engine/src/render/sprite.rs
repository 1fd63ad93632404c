use std::mem::size_of;
use std::rc::Rc;

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};

use crate::buffer::{GpuBuffer, QuadIndexBuffer};
use crate::coords::{Rect, Vec2};
use crate::device::{
    AttribType, BufferTarget, DrawMode, GpuDevice, UniformData, VertexAttribute,
};
use crate::paint::Color;
use crate::shader::{template, CustomShader, ShaderProgram, ShaderSnippet, UniformBag, UniformValue};

use super::region::{FlushContext, Region};
use super::Texture;

// ── vertex ────────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SpriteVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    /// Slot in the batch's texture list, as a float for GLSL ES 1.00.
    pub texture_id: f32,
    /// Packed RGBA8, read as normalized `u8x4`.
    pub color: u32,
}

const SPRITE_STRIDE: u32 = size_of::<SpriteVertex>() as u32;

pub const SPRITE_LAYOUT: [VertexAttribute; 4] = [
    VertexAttribute {
        name: "aPosition",
        components: 2,
        ty: AttribType::F32,
        normalized: false,
        stride: SPRITE_STRIDE,
        offset: 0,
    },
    VertexAttribute {
        name: "aTexCoord",
        components: 2,
        ty: AttribType::F32,
        normalized: false,
        stride: SPRITE_STRIDE,
        offset: 8,
    },
    VertexAttribute {
        name: "aTextureId",
        components: 1,
        ty: AttribType::F32,
        normalized: false,
        stride: SPRITE_STRIDE,
        offset: 16,
    },
    VertexAttribute {
        name: "aColor",
        components: 4,
        ty: AttribType::U8,
        normalized: true,
        stride: SPRITE_STRIDE,
        offset: 20,
    },
];

// ── region ────────────────────────────────────────────────────────────────

/// Multi-texture quad batcher.
///
/// Every sprite is 4 vertices drawn through the shared quad index buffer.
/// A batch flushes when:
/// - a new texture does not fit the texture-unit budget (the list restarts at slot 0)
/// - the quad capacity of the index buffer is reached
/// - the custom uniform bag changes
/// - the renderer switches region or shader, or the frame ends
///
/// The texture list survives flushes that are not caused by texture overflow,
/// so slots assigned before a capacity flush stay valid.
#[derive(Debug)]
pub struct SpriteRegion {
    vertices: GpuBuffer<SpriteVertex>,
    indices: QuadIndexBuffer,
    default_program: Rc<ShaderProgram>,
    shader: Option<CustomShader>,

    texture_units: u32,
    sampler_units: Vec<i32>,
    textures: Vec<Texture>,
    /// Per unit: needs a bind before the next draw.
    pending: Vec<bool>,

    uniforms: UniformBag,
    /// Units kept free for texture values of `uniforms`.
    reserved_units: u32,

    quads: usize,
}

impl SpriteRegion {
    pub fn new(device: &mut dyn GpuDevice, texture_units: u32, max_quads: usize) -> Result<Self> {
        let source = template::sprite_source(
            texture_units,
            &ShaderSnippet::default(),
            &ShaderSnippet::default(),
        );
        let program = ShaderProgram::compile(device, &source.vertex, &source.fragment)
            .context("failed to build the default sprite shader")?;
        let indices = QuadIndexBuffer::new(device, max_quads)?;
        let vertices = GpuBuffer::new(device, BufferTarget::Vertex, 4 * max_quads.min(256))?;

        Ok(Self {
            vertices,
            indices,
            default_program: Rc::new(program),
            shader: None,
            texture_units,
            sampler_units: (0..texture_units as i32).collect(),
            textures: Vec::with_capacity(texture_units as usize),
            pending: vec![true; texture_units as usize],
            uniforms: UniformBag::new(),
            reserved_units: 0,
            quads: 0,
        })
    }

    #[inline]
    pub fn quads(&self) -> usize {
        self.quads
    }

    #[inline]
    pub fn max_quads(&self) -> usize {
        self.indices.max_quads()
    }

    /// Textures referenced by the current batch, in slot order.
    #[inline]
    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }

    /// Slots available to sprite textures under the current uniform bag.
    #[inline]
    pub fn texture_budget(&self) -> u32 {
        self.texture_units.saturating_sub(self.reserved_units).max(1)
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

    /// Slot of `texture` in the current batch, appending it when new.
    ///
    /// A texture that does not fit flushes the batch and restarts the list.
    pub fn use_texture(&mut self, ctx: &mut FlushContext<'_>, texture: &Texture) -> u32 {
        if let Some(slot) = self.textures.iter().position(|t| t.ptr_eq(texture)) {
            return slot as u32;
        }
        if self.textures.len() >= self.texture_budget() as usize {
            self.render(ctx);
            self.textures.clear();
        }
        self.textures.push(texture.clone());
        let slot = self.textures.len() - 1;
        self.pending[slot] = true;
        slot as u32
    }

    /// Draws the batch if it samples `texture`, then drops the texture list.
    ///
    /// Returns whether `texture` was referenced.
    pub fn evict(&mut self, ctx: &mut FlushContext<'_>, texture: &Texture) -> bool {
        if !self.textures.iter().any(|t| t.ptr_eq(texture)) {
            return false;
        }
        self.render(ctx);
        self.textures.clear();
        self.invalidate_units();
        true
    }

    /// Makes `uniforms` the bag of the current batch, flushing on change.
    pub fn set_uniforms(&mut self, ctx: &mut FlushContext<'_>, uniforms: &UniformBag) {
        if *uniforms == self.uniforms {
            return;
        }
        self.render(ctx);
        self.uniforms = uniforms.clone();
        self.reserved_units = uniforms
            .iter()
            .filter(|(_, v)| matches!(v, UniformValue::Texture(_)))
            .count() as u32;
        if self.textures.len() > self.texture_budget() as usize {
            self.textures.clear();
        }
    }

    /// Appends one quad. `corners` are global positions in the order
    /// top-left, top-right, bottom-right, bottom-left; `uv` is normalized.
    pub fn push_quad(
        &mut self,
        ctx: &mut FlushContext<'_>,
        corners: [Vec2; 4],
        uv: Rect,
        slot: u32,
        colors: [Color; 4],
    ) {
        if self.quads >= self.indices.max_quads() {
            self.render(ctx);
        }

        let (u0, v0) = (uv.origin.x, uv.origin.y);
        let (u1, v1) = (u0 + uv.size.x, v0 + uv.size.y);
        let uvs = [[u0, v0], [u1, v0], [u1, v1], [u0, v1]];

        self.vertices.reserve(4);
        for i in 0..4 {
            self.vertices.push(SpriteVertex {
                position: [corners[i].x, corners[i].y],
                uv: uvs[i],
                texture_id: slot as f32,
                color: colors[i].packed(),
            });
        }
        self.quads += 1;
        ctx.stats.sprites += 1;
    }

    /// Forces every unit to be rebound before the next draw.
    pub fn invalidate_units(&mut self) {
        self.pending.fill(true);
    }

    fn bind_textures(&mut self, ctx: &mut FlushContext<'_>) {
        // an upload lands on the active unit, so finish them all before binding
        let mut created = self.uniforms.upload_textures(ctx.device);
        for texture in &self.textures {
            created |= texture.upload_if_pending(ctx.device);
        }
        if created {
            self.pending.fill(true);
        }

        for (slot, texture) in self.textures.iter().enumerate() {
            if !self.pending[slot] {
                continue;
            }
            match texture.ensure_uploaded(ctx.device) {
                Ok(id) => {
                    ctx.device.bind_texture(slot as u32, id);
                    self.pending[slot] = false;
                }
                Err(err) => {
                    ctx.warnings.warn(format!("sprite texture unavailable: {err:#}"));
                }
            }
        }
    }
}

impl Region for SpriteRegion {
    fn enter(&mut self, ctx: &mut FlushContext<'_>, shader: Option<&CustomShader>) {
        self.shader = shader.cloned();
        self.vertices.clear();
        self.quads = 0;
        // other programs may have used any unit since the last batch
        self.invalidate_units();
        self.program().bind(ctx.device);
    }

    fn render(&mut self, ctx: &mut FlushContext<'_>) {
        if self.quads == 0 {
            return;
        }
        let program = Rc::clone(self.program());
        program.bind(ctx.device);

        self.vertices.upload_if_dirty(ctx.device);
        self.vertices.bind(ctx.device);
        program.set_attributes(ctx.device, &SPRITE_LAYOUT);
        self.indices.bind(ctx.device);

        if let Some(loc) = program.uniform("uResolution") {
            ctx.device
                .set_uniform(loc, UniformData::Float(&[ctx.resolution.x, ctx.resolution.y]));
        }
        if let Some(loc) = program.uniform("uTextures") {
            ctx.device.set_uniform(loc, UniformData::IntArray(&self.sampler_units));
        }

        self.bind_textures(ctx);
        let first_free = self.textures.len() as u32;
        let next = program.set_uniforms(ctx.device, &self.uniforms, first_free, ctx.warnings);
        // units used by uniform textures no longer hold sprite textures
        for unit in first_free..next.min(self.texture_units) {
            self.pending[unit as usize] = true;
        }

        let count = (self.quads * 6) as u32;
        ctx.device
            .draw_elements(DrawMode::Triangles, count, self.indices.index_type(), 0);

        ctx.stats.draw_calls += 1;
        ctx.stats.flushes += 1;
        ctx.stats.indices += count;
        ctx.stats.vertices += (self.quads * 4) as u32;
        log::trace!("sprite flush: {} quads, {} textures", self.quads, self.textures.len());

        self.vertices.clear();
        self.quads = 0;
    }

    #[inline]
    fn has_pending_content(&self) -> bool {
        self.quads > 0
    }

    #[inline]
    fn is_shader_changed(&self, shader: Option<&CustomShader>) -> bool {
        self.shader.as_ref() != shader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{HeadlessDevice, ImageData};
    use crate::logging::WarnOnce;
    use crate::render::RenderStats;

    struct Harness {
        dev: HeadlessDevice,
        warnings: WarnOnce,
        stats: RenderStats,
    }

    impl Harness {
        fn new(units: u32) -> Self {
            Self { dev: HeadlessDevice::new(units), warnings: WarnOnce::new(), stats: RenderStats::default() }
        }

        fn ctx(&mut self) -> FlushContext<'_> {
            FlushContext {
                device: &mut self.dev,
                resolution: Vec2::new(100.0, 100.0),
                warnings: &mut self.warnings,
                stats: &mut self.stats,
            }
        }
    }

    fn texture() -> Texture {
        Texture::from_image(ImageData::solid(2, 2, [255; 4]))
    }

    fn quad(region: &mut SpriteRegion, ctx: &mut FlushContext<'_>, tex: &Texture) -> u32 {
        let slot = region.use_texture(ctx, tex);
        let corners = [Vec2::zero(), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0)];
        region.push_quad(ctx, corners, Rect::unit(), slot, [Color::WHITE; 4]);
        slot
    }

    #[test]
    fn vertex_layout_matches_struct() {
        assert_eq!(size_of::<SpriteVertex>(), 24);
        assert_eq!(SPRITE_LAYOUT[3].offset as usize, std::mem::offset_of!(SpriteVertex, color));
    }

    #[test]
    fn repeated_texture_reuses_its_slot() {
        let mut h = Harness::new(4);
        let mut region = SpriteRegion::new(&mut h.dev, 4, 64).unwrap();
        let (a, b) = (texture(), texture());
        let mut ctx = h.ctx();
        region.enter(&mut ctx, None);
        assert_eq!(quad(&mut region, &mut ctx, &a), 0);
        assert_eq!(quad(&mut region, &mut ctx, &b), 1);
        assert_eq!(quad(&mut region, &mut ctx, &a), 0);
        assert_eq!(region.textures().len(), 2);
        assert_eq!(h.stats.flushes, 0);
    }

    #[test]
    fn texture_overflow_flushes_and_restarts_at_slot_zero() {
        let mut h = Harness::new(2);
        let mut region = SpriteRegion::new(&mut h.dev, 2, 64).unwrap();
        let texs = [texture(), texture(), texture()];
        let mut ctx = h.ctx();
        region.enter(&mut ctx, None);
        let slots: Vec<u32> = texs.iter().map(|t| quad(&mut region, &mut ctx, t)).collect();
        assert_eq!(slots, [0, 1, 0]);
        assert_eq!(ctx.stats.flushes, 1);
        region.render(&mut ctx);
        assert_eq!(h.stats.flushes, 2);
        assert_eq!(h.stats.indices, 18);
    }

    #[test]
    fn quad_capacity_flush_keeps_slots() {
        let mut h = Harness::new(4);
        let mut region = SpriteRegion::new(&mut h.dev, 4, 2).unwrap();
        let (a, b) = (texture(), texture());
        let mut ctx = h.ctx();
        region.enter(&mut ctx, None);
        quad(&mut region, &mut ctx, &a);
        quad(&mut region, &mut ctx, &b);
        // third quad overflows the index buffer
        assert_eq!(quad(&mut region, &mut ctx, &b), 1);
        assert_eq!(ctx.stats.flushes, 1);
        assert_eq!(region.quads(), 1);
    }

    #[test]
    fn uniform_change_flushes() {
        let mut h = Harness::new(4);
        let mut region = SpriteRegion::new(&mut h.dev, 4, 64).unwrap();
        let a = texture();
        let mut ctx = h.ctx();
        region.enter(&mut ctx, None);
        let bag = UniformBag::new().with("uTime", 1.0_f32);

        region.set_uniforms(&mut ctx, &bag);
        quad(&mut region, &mut ctx, &a);
        region.set_uniforms(&mut ctx, &bag);
        quad(&mut region, &mut ctx, &a);
        assert_eq!(ctx.stats.flushes, 0);

        region.set_uniforms(&mut ctx, &UniformBag::new().with("uTime", 2.0_f32));
        assert_eq!(ctx.stats.flushes, 1);
    }

    #[test]
    fn uniform_textures_reserve_units() {
        let mut h = Harness::new(3);
        let mut region = SpriteRegion::new(&mut h.dev, 3, 64).unwrap();
        let mut ctx = h.ctx();
        region.enter(&mut ctx, None);
        region.set_uniforms(&mut ctx, &UniformBag::new().with("uMask", texture()));
        assert_eq!(region.texture_budget(), 2);
    }

    #[test]
    fn flush_binds_each_slot_and_draws_indexed() {
        let mut h = Harness::new(4);
        let mut region = SpriteRegion::new(&mut h.dev, 4, 64).unwrap();
        let (a, b) = (texture(), texture());
        {
            let mut ctx = h.ctx();
            region.enter(&mut ctx, None);
            quad(&mut region, &mut ctx, &a);
            quad(&mut region, &mut ctx, &b);
            region.render(&mut ctx);
        }
        let draw = h.dev.draw_calls().last().cloned().unwrap();
        assert!(draw.indexed);
        assert_eq!(draw.count, 12);
        assert_eq!(draw.units[0], a.id());
        assert_eq!(draw.units[1], b.id());

        // vertex 4 belongs to the second quad and samples slot 1
        let vertex: SpriteVertex = bytemuck::pod_read_unaligned(&draw.vertex_data[4 * 24..5 * 24]);
        assert_eq!(vertex.texture_id, 1.0);
        assert!(!region.has_pending_content());
    }
}
