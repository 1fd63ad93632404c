use std::rc::Rc;

use anyhow::{ensure, Context};
use thiserror::Error;

use crate::coords::{Rect, Vec2, Viewport};
use crate::device::{DrawMode, GpuDevice, ImageData, StencilMode, StencilOp};
use crate::geometry::{circle_points, circle_segments, polyline_triangles, rect_points, LineStyle};
use crate::logging::WarnOnce;
use crate::paint::Color;
use crate::particles::ParticleEmitter;
use crate::shader::{template, CustomShader, ShaderError, ShaderKind, ShaderProgram, ShaderSnippet, UniformBag};
use crate::tilemap::{plan_layer, TileDrawItem, TileLayer, TileSet, YSortEntry};
use crate::time::{FrameClock, FrameTime};
use crate::transform::{apply_transform, apply_transform_after, TransformError, TransformStack};

use super::graphic::GraphicRegion;
use super::region::{FlushContext, Region, RegionKind};
use super::sprite::SpriteRegion;
use super::{DrawOptions, RenderStats, Texture};

/// Default sprite batch capacity, just under the 16-bit index limit.
pub const DEFAULT_MAX_QUADS: usize = 16383;

/// Stencil values are 8-bit; each open mask uses one level.
pub const MAX_MASK_DEPTH: usize = u8::MAX as usize;

/// Off-diagonal magnitude under which a transform counts as axis-aligned.
const ROTATION_EPSILON: f32 = 1e-6;

const TILEMAP_ROTATION_WARNING: &str =
    "tilemap layers cannot be rotated; the enclosing rotation was reset to 0";

/// Initialization parameters for the renderer.
#[derive(Debug, Clone)]
pub struct RendererInit {
    /// Sprite quads per batch before a capacity flush.
    pub max_quads: usize,

    /// Upper bound on the texture units a sprite batch may use.
    ///
    /// `None` takes everything the device reports.
    pub max_texture_units: Option<u32>,

    pub clear_color: Color,

    /// Extra tile rows and columns drawn beyond the visible area.
    pub tile_margin: usize,

    /// Initial drawable size; see [`Renderer::resize`].
    pub viewport: Viewport,
}

impl Default for RendererInit {
    fn default() -> Self {
        Self {
            max_quads: DEFAULT_MAX_QUADS,
            max_texture_units: None,
            clear_color: Color::BLACK,
            tile_margin: 1,
            viewport: Viewport::new(800.0, 600.0),
        }
    }
}

/// Caller-discipline and per-draw errors.
///
/// Everything here leaves the renderer usable; nothing is drawn for the
/// failing call.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("draw issued outside start_render/end_render")]
    OutsideFrame,

    #[error("end_mask without a matching begin_mask")]
    MaskUnderflow,

    #[error("mask nesting is limited to {MAX_MASK_DEPTH} levels")]
    MaskOverflow,

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("{actual:?} shader cannot draw a {expected:?} primitive")]
    ShaderMismatch { expected: ShaderKind, actual: ShaderKind },
}

type MaskFn<D> = Rc<dyn Fn(&mut Renderer<D>) -> Result<(), RenderError>>;

/// Frame orchestrator.
///
/// Owns the device, both regions, the transform stack and the mask stack.
/// Draws are routed to the sprite or graphic region; switching region or
/// shader flushes whatever the previous one accumulated.
///
/// Frame shape:
/// - `start_render` clears color and stencil and resets per-frame state
/// - `render_*` calls, `begin_mask`/`end_mask` pairs
/// - `end_render` flushes
pub struct Renderer<D: GpuDevice> {
    device: D,
    sprite: SpriteRegion,
    graphic: GraphicRegion,
    active: Option<RegionKind>,

    transforms: TransformStack,
    masks: Vec<MaskFn<D>>,

    clock: FrameClock,
    warnings: WarnOnce,
    stats: RenderStats,

    viewport: Viewport,
    clear_color: Color,
    tile_margin: usize,
    texture_units: u32,
    in_frame: bool,
}

impl<D: GpuDevice> Renderer<D> {
    pub fn new(mut device: D, init: RendererInit) -> anyhow::Result<Self> {
        let RendererInit { max_quads, max_texture_units, clear_color, tile_margin, viewport } = init;

        let available = device.max_texture_units();
        ensure!(available > 0, "device exposes no texture units");
        let texture_units = max_texture_units.map_or(available, |cap| cap.min(available)).max(1);

        let sprite = SpriteRegion::new(&mut device, texture_units, max_quads)
            .context("failed to create the sprite region")?;
        let graphic = GraphicRegion::new(&mut device).context("failed to create the graphic region")?;

        log::debug!(
            "renderer ready: {texture_units}/{available} texture units, {max_quads} quads per batch, {}x{} viewport",
            viewport.width,
            viewport.height
        );

        Ok(Self {
            device,
            sprite,
            graphic,
            active: None,
            transforms: TransformStack::new(),
            masks: Vec::new(),
            clock: FrameClock::new(),
            warnings: WarnOnce::new(),
            stats: RenderStats::default(),
            viewport,
            clear_color,
            tile_margin,
            texture_units,
            in_frame: false,
        })
    }

    // ── accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn device(&self) -> &D {
        &self.device
    }

    #[inline]
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    #[inline]
    pub fn transforms(&self) -> &TransformStack {
        &self.transforms
    }

    #[inline]
    pub fn transforms_mut(&mut self) -> &mut TransformStack {
        &mut self.transforms
    }

    /// Counters of the current (or last finished) frame.
    #[inline]
    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    #[inline]
    pub fn warnings(&self) -> &WarnOnce {
        &self.warnings
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Texture units a sprite batch may use.
    #[inline]
    pub fn texture_units(&self) -> u32 {
        self.texture_units
    }

    #[inline]
    pub fn mask_depth(&self) -> usize {
        self.masks.len()
    }

    #[inline]
    pub fn is_in_frame(&self) -> bool {
        self.in_frame
    }

    #[inline]
    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    /// Sets the drawable size. Geometry already batched is drawn first with
    /// the old size.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.quit_current_region();
        self.viewport = Viewport::new(width, height);
        if !self.viewport.is_valid() {
            log::warn!("renderer resized to an empty viewport ({width}x{height})");
        }
        if self.in_frame {
            self.apply_viewport();
        }
    }

    // ── frame ─────────────────────────────────────────────────────────────

    /// Opens a frame and returns the time elapsed since the previous one.
    pub fn start_render(&mut self) -> FrameTime {
        if self.in_frame {
            self.warnings.warn("start_render called before end_render");
            self.quit_current_region();
        }
        let time = self.clock.tick();

        self.stats.reset();
        self.transforms.reset();
        self.masks.clear();
        self.active = None;

        self.apply_viewport();
        self.device.set_stencil(StencilMode::Disabled);
        self.device.clear(self.clear_color, true);

        self.in_frame = true;
        time
    }

    /// Flushes the active region and closes the frame.
    ///
    /// Masks left open are reported and discarded.
    pub fn end_render(&mut self) -> Result<(), RenderError> {
        self.ensure_frame()?;
        self.quit_current_region();

        if !self.masks.is_empty() {
            self.warnings.warn(format!("{} mask(s) still open at end_render", self.masks.len()));
            self.masks.clear();
            self.device.set_stencil(StencilMode::Disabled);
        }
        if self.transforms.depth() != 1 {
            self.warnings.warn(format!(
                "transform stack left at depth {} at end_render",
                self.transforms.depth()
            ));
        }

        self.in_frame = false;
        log::trace!("frame done: {:?}", self.stats);
        Ok(())
    }

    // ── primitives ────────────────────────────────────────────────────────

    /// Draws `texture` (or its `uv` region) as one batched quad.
    ///
    /// The quad's natural size is the texel size of the region; `opts.size`
    /// overrides it. `opts.fill` tints the four corners (top-left, top-right,
    /// bottom-right, bottom-left).
    pub fn render_sprite(&mut self, texture: &Texture, opts: &DrawOptions) -> Result<(), RenderError> {
        self.activate(RegionKind::Sprite, opts.shader.as_ref())?;

        let uv = opts.uv.unwrap_or_else(Rect::unit);
        let size = opts.size.unwrap_or_else(|| texture.size().mul_elem(uv.size));
        let offset = apply_transform(&mut self.transforms, &opts.transform, size);

        let corners = rect_points(size).map(|p| self.transforms.apply(p + offset));
        let colors = [0, 1, 2, 3].map(|i| opts.fill.at(i));
        self.push_sprite(texture, corners, uv, colors, &opts.uniforms);

        apply_transform_after(&mut self.transforms, &opts.transform)?;
        Ok(())
    }

    /// Draws caller-built geometry in local space as one shape.
    ///
    /// The origin resolves against the bounding box of `points`; `opts.size`
    /// replaces the box size but keeps its top-left corner. The mode defaults
    /// to a triangle fan.
    pub fn render_graphic(&mut self, points: &[Vec2], opts: &DrawOptions) -> Result<(), RenderError> {
        let bounds = shape_bounds(points, opts);
        self.draw_shape(points, bounds, DrawMode::TriangleFan, opts)
    }

    /// Filled axis-aligned rectangle covering `[0, size]` in local space.
    pub fn render_rect(&mut self, size: Vec2, opts: &DrawOptions) -> Result<(), RenderError> {
        let bounds = Rect::from_origin_size(Vec2::zero(), size);
        self.draw_shape(&rect_points(size), bounds, DrawMode::TriangleFan, opts)
    }

    /// Filled circle whose bounding box is `[0, 2 * radius]` in local space.
    pub fn render_circle(&mut self, radius: f32, opts: &DrawOptions) -> Result<(), RenderError> {
        let points = circle_points(radius, circle_segments(radius));
        let bounds = Rect::from_origin_size(Vec2::zero(), Vec2::splat(radius * 2.0));
        self.draw_shape(&points, bounds, DrawMode::TriangleFan, opts)
    }

    /// Stroked polyline, expanded to triangles with miter joins.
    pub fn render_line(
        &mut self,
        points: &[Vec2],
        style: &LineStyle,
        opts: &DrawOptions,
    ) -> Result<(), RenderError> {
        let triangles = polyline_triangles(points, style);
        // the stroke, not just the centerline, defines the box
        let bounds = shape_bounds(&triangles, opts);
        self.draw_shape(&triangles, bounds, DrawMode::Triangles, opts)
    }

    /// Draws the visible part of `layer`, interleaving `extras` by Y-sort.
    ///
    /// `draw_extra` is called with each extra's key while the layer transform
    /// is applied, so extras draw in layer-local space. Layers cannot be
    /// rotated: a rotated transform is reset to axis-aligned and warned once.
    pub fn render_tilemap<F>(
        &mut self,
        layer: &TileLayer,
        tileset: &TileSet,
        opts: &DrawOptions,
        extras: &[YSortEntry],
        mut draw_extra: F,
    ) -> Result<(), RenderError>
    where
        F: FnMut(&mut Self, usize) -> Result<(), RenderError>,
    {
        self.ensure_frame()?;
        let tile = tileset.tile_size();
        let extent = Vec2::new(layer.columns() as f32 * tile.x, layer.rows() as f32 * layer.row_height(tile));
        let size = opts.size.unwrap_or(extent);
        let offset = apply_transform(&mut self.transforms, &opts.transform, size);

        let top = *self.transforms.top();
        if top.b.abs() > ROTATION_EPSILON || top.c.abs() > ROTATION_EPSILON {
            self.warnings.warn(TILEMAP_ROTATION_WARNING);
            self.transforms.set_global_rotation(0.0);
        }

        let inverse = self.transforms.inverse();
        let a = inverse.apply(Vec2::zero());
        let b = inverse.apply(self.viewport.size());
        let visible_origin = a.min(b) - offset;
        let visible_size = a.max(b) - a.min(b);

        let plan = plan_layer(layer, tileset, visible_origin, visible_size, self.tile_margin, extras);
        log::trace!(
            "tilemap: columns {:?}, rows {:?}, {} items",
            plan.columns,
            plan.rows,
            plan.items.len()
        );

        let mut result = Ok(());
        for item in &plan.items {
            match *item {
                TileDrawItem::Tile { tile: id, position, .. } => {
                    let Some(desc) = tileset.get(id) else { continue };
                    if let Err(err) = self.activate(RegionKind::Sprite, opts.shader.as_ref()) {
                        result = Err(err);
                        break;
                    }
                    let cell = desc.size.unwrap_or(tile);
                    let corners = rect_points(cell).map(|p| self.transforms.apply(p + position + offset));
                    let colors = [0, 1, 2, 3].map(|i| opts.fill.at(i));
                    self.push_sprite(&desc.texture, corners, desc.uv, colors, &opts.uniforms);
                }
                TileDrawItem::Extra { key } => {
                    if let Err(err) = draw_extra(self, key) {
                        result = Err(err);
                        break;
                    }
                }
            }
        }

        apply_transform_after(&mut self.transforms, &opts.transform)?;
        result
    }

    /// Draws every live particle of `emitter` as a sprite of `texture`.
    ///
    /// Each particle is centered on its position, scaled and rotated by its
    /// own state and tinted by its color times `opts.fill`.
    pub fn render_particles(
        &mut self,
        emitter: &ParticleEmitter,
        texture: &Texture,
        opts: &DrawOptions,
    ) -> Result<(), RenderError> {
        self.activate(RegionKind::Sprite, opts.shader.as_ref())?;

        let uv = opts.uv.unwrap_or_else(Rect::unit);
        let size = opts.size.unwrap_or_else(|| texture.size().mul_elem(uv.size));
        let offset = apply_transform(&mut self.transforms, &opts.transform, Vec2::zero());

        for particle in emitter.particles() {
            let half = size * (0.5 * particle.scale);
            let corners = rect_points(size * particle.scale).map(|p| {
                let local = (p - half).rotate(particle.rotation) + particle.position + offset;
                self.transforms.apply(local)
            });
            let colors = [0, 1, 2, 3].map(|i| particle.color * opts.fill.at(i));
            self.push_sprite(texture, corners, uv, colors, &opts.uniforms);
        }

        apply_transform_after(&mut self.transforms, &opts.transform)?;
        Ok(())
    }

    // ── masks ─────────────────────────────────────────────────────────────

    /// Restricts drawing to the area `draw` covers, intersected with any
    /// mask already open.
    ///
    /// `draw` runs with color writes off and is kept until the matching
    /// [`end_mask`](Self::end_mask), which runs it again to remove the mask.
    pub fn begin_mask<F>(&mut self, draw: F) -> Result<(), RenderError>
    where
        F: Fn(&mut Self) -> Result<(), RenderError> + 'static,
    {
        self.ensure_frame()?;
        let depth = self.masks.len();
        if depth >= MAX_MASK_DEPTH {
            return Err(RenderError::MaskOverflow);
        }
        let draw: MaskFn<D> = Rc::new(draw);
        let result = self.stencil_pass(depth as u8, StencilOp::Increment, &draw);
        self.masks.push(draw);
        result
    }

    /// Closes the innermost mask.
    pub fn end_mask(&mut self) -> Result<(), RenderError> {
        self.ensure_frame()?;
        let draw = self.masks.pop().ok_or(RenderError::MaskUnderflow)?;
        let depth = (self.masks.len() + 1) as u8;
        self.stencil_pass(depth, StencilOp::Decrement, &draw)
    }

    /// Runs `draw` into the stencil on pixels at `reference`, then tests
    /// against the resulting depth.
    fn stencil_pass(&mut self, reference: u8, op: StencilOp, draw: &MaskFn<D>) -> Result<(), RenderError> {
        self.quit_current_region();
        self.device.set_stencil(StencilMode::Write { reference, op });
        let result = draw(self);
        self.quit_current_region();

        let depth = match op {
            StencilOp::Increment => reference + 1,
            StencilOp::Decrement => reference - 1,
        };
        let mode = if depth == 0 { StencilMode::Disabled } else { StencilMode::Test { reference: depth } };
        self.device.set_stencil(mode);
        result
    }

    // ── resources ─────────────────────────────────────────────────────────

    /// Uploads `image` now and returns a drawable texture.
    pub fn create_texture(&mut self, image: ImageData) -> anyhow::Result<Texture> {
        let id = self
            .device
            .create_texture(&image)
            .with_context(|| format!("failed to create a {}x{} texture", image.width, image.height))?;
        // the upload replaced whatever the sprite batch had on the active unit
        self.sprite.invalidate_units();
        Ok(Texture::uploaded(id, image.width, image.height))
    }

    /// Frees the device texture. Batches that still sample it are drawn first.
    pub fn delete_texture(&mut self, texture: &Texture) {
        {
            let (sprite, _, mut ctx) = self.parts();
            sprite.evict(&mut ctx, texture);
        }
        texture.release(&mut self.device);
    }

    /// Builds a shader of `kind` from the built-in template plus snippets.
    pub fn create_custom_shader(
        &mut self,
        kind: ShaderKind,
        vertex: &ShaderSnippet,
        fragment: &ShaderSnippet,
    ) -> Result<CustomShader, ShaderError> {
        let source = match kind {
            ShaderKind::Sprite => template::sprite_source(self.texture_units, vertex, fragment),
            ShaderKind::Graphic => template::graphic_source(vertex, fragment),
        };
        let program = ShaderProgram::compile(&mut self.device, &source.vertex, &source.fragment)?;
        log::debug!("custom {kind:?} shader compiled ({:?})", program.id());
        Ok(CustomShader::new(kind, program))
    }

    /// Deletes the program behind `shader`.
    ///
    /// Pending geometry drawn with it is flushed first. The program survives
    /// while other clones of the handle exist; the return value tells whether
    /// it was freed.
    pub fn delete_custom_shader(&mut self, shader: CustomShader) -> bool {
        let in_use = match self.active {
            Some(kind) => !self.with_region(kind, |r, _| r.is_shader_changed(Some(&shader))),
            None => false,
        };
        if in_use {
            self.quit_current_region();
        }
        self.sprite.forget_shader(&shader);
        self.graphic.forget_shader(&shader);

        match shader.into_program() {
            Some(program) => {
                log::debug!("custom shader {:?} deleted", program.id());
                program.delete(&mut self.device);
                true
            }
            None => false,
        }
    }

    // ── internals ─────────────────────────────────────────────────────────

    fn ensure_frame(&self) -> Result<(), RenderError> {
        if self.in_frame { Ok(()) } else { Err(RenderError::OutsideFrame) }
    }

    fn apply_viewport(&mut self) {
        let Viewport { width, height } = self.viewport;
        self.device.set_viewport(0, 0, width as i32, height as i32);
    }

    /// Disjoint borrows of both regions and the flush state.
    fn parts(&mut self) -> (&mut SpriteRegion, &mut GraphicRegion, FlushContext<'_>) {
        let ctx = FlushContext {
            device: &mut self.device,
            resolution: self.viewport.size(),
            warnings: &mut self.warnings,
            stats: &mut self.stats,
        };
        (&mut self.sprite, &mut self.graphic, ctx)
    }

    fn with_region<R>(
        &mut self,
        kind: RegionKind,
        f: impl FnOnce(&mut dyn Region, &mut FlushContext<'_>) -> R,
    ) -> R {
        let (sprite, graphic, mut ctx) = self.parts();
        let region: &mut dyn Region = match kind {
            RegionKind::Sprite => sprite,
            RegionKind::Graphic => graphic,
        };
        f(region, &mut ctx)
    }

    /// Flushes and leaves the active region.
    fn quit_current_region(&mut self) {
        if let Some(kind) = self.active.take() {
            self.with_region(kind, |region, ctx| {
                region.render(ctx);
                region.exit(ctx);
            });
        }
    }

    /// Makes `kind` the active region with `shader`, switching only when the
    /// region or the shader differ.
    fn activate(&mut self, kind: RegionKind, shader: Option<&CustomShader>) -> Result<(), RenderError> {
        self.ensure_frame()?;
        let expected = shader_kind(kind);
        if let Some(actual) = shader.map(CustomShader::kind).filter(|k| *k != expected) {
            return Err(RenderError::ShaderMismatch { expected, actual });
        }

        let switch = match self.active {
            Some(active) if active == kind => self.with_region(kind, |r, _| r.is_shader_changed(shader)),
            _ => true,
        };
        if switch {
            self.quit_current_region();
            self.with_region(kind, |region, ctx| region.enter(ctx, shader));
            self.active = Some(kind);
        }
        Ok(())
    }

    fn push_sprite(
        &mut self,
        texture: &Texture,
        corners: [Vec2; 4],
        uv: Rect,
        colors: [Color; 4],
        uniforms: &UniformBag,
    ) {
        let (sprite, _, mut ctx) = self.parts();
        sprite.set_uniforms(&mut ctx, uniforms);
        let slot = sprite.use_texture(&mut ctx, texture);
        sprite.push_quad(&mut ctx, corners, uv, slot, colors);
    }

    fn draw_shape(
        &mut self,
        points: &[Vec2],
        bounds: Rect,
        default_mode: DrawMode,
        opts: &DrawOptions,
    ) -> Result<(), RenderError> {
        self.activate(RegionKind::Graphic, opts.shader.as_ref())?;

        let offset = apply_transform(&mut self.transforms, &opts.transform, bounds.size) - bounds.origin;
        let global: Vec<Vec2> = points.iter().map(|&p| self.transforms.apply(p + offset)).collect();
        let mode = opts.draw_mode.unwrap_or(default_mode);
        {
            let (_, graphic, mut ctx) = self.parts();
            graphic.draw_shape(&mut ctx, &global, &opts.fill, mode, &opts.uniforms);
        }

        apply_transform_after(&mut self.transforms, &opts.transform)?;
        Ok(())
    }
}

fn shape_bounds(points: &[Vec2], opts: &DrawOptions) -> Rect {
    let bounds = Rect::bounding(points);
    match opts.size {
        Some(size) => Rect::from_origin_size(bounds.origin, size),
        None => bounds,
    }
}

fn shader_kind(kind: RegionKind) -> ShaderKind {
    match kind {
        RegionKind::Sprite => ShaderKind::Sprite,
        RegionKind::Graphic => ShaderKind::Graphic,
    }
}

impl<D: GpuDevice + std::fmt::Debug> std::fmt::Debug for Renderer<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("device", &self.device)
            .field("active", &self.active)
            .field("mask_depth", &self.masks.len())
            .field("viewport", &self.viewport)
            .field("texture_units", &self.texture_units)
            .field("in_frame", &self.in_frame)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
