use anyhow::Result;

use crate::paint::Color;

use super::types::{
    BufferId, BufferTarget, DrawMode, ImageData, IndexType, ProgramId, ShaderId, ShaderStage,
    StencilMode, TextureId, UniformData, UniformLocation, VertexAttribute,
};

/// Capability set the rendering core needs from a GPU API.
///
/// The model is a bind-then-operate state machine (WebGL/GL style): buffer
/// uploads act on the buffer bound to a target, uniform uploads act on the
/// program in use, texture binds act on a numbered texture unit.
///
/// Creation methods return errors; per-frame operations are infallible from
/// the core's point of view and backends log what they cannot do.
pub trait GpuDevice {
    /// Number of texture units a fragment shader can sample in one draw.
    fn max_texture_units(&self) -> u32;

    // ── buffers ───────────────────────────────────────────────────────────

    fn create_buffer(&mut self) -> Result<BufferId>;

    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferId);

    /// (Re)allocates the bound buffer to `size` bytes and writes `data` at 0.
    fn buffer_data(&mut self, target: BufferTarget, size: usize, data: &[u8]);

    /// Writes `data` at `offset` into the bound buffer's existing storage.
    fn buffer_sub_data(&mut self, target: BufferTarget, offset: usize, data: &[u8]);

    // ── shaders ───────────────────────────────────────────────────────────

    /// Compiles one stage. The error is the backend's info log.
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String>;

    /// Links two compiled stages. The error is the backend's info log.
    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, String>;

    fn delete_shader(&mut self, shader: ShaderId);

    fn delete_program(&mut self, program: ProgramId);

    fn use_program(&mut self, program: ProgramId);

    /// Location of an active attribute, `None` when the program does not use it.
    fn attrib_location(&mut self, program: ProgramId, name: &str) -> Option<u32>;

    /// Location of an active uniform, `None` when the program does not use it.
    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    /// Points attribute `location` at the bound vertex buffer and enables it.
    fn vertex_attrib_pointer(&mut self, location: u32, attribute: &VertexAttribute);

    /// Uploads a uniform value to the program in use.
    fn set_uniform(&mut self, location: UniformLocation, data: UniformData<'_>);

    // ── textures ──────────────────────────────────────────────────────────

    /// Uploads `image` into a new texture.
    ///
    /// As in GL, the new texture is left bound to the active unit, which is
    /// the unit of the last [`bind_texture`](Self::bind_texture).
    fn create_texture(&mut self, image: &ImageData) -> Result<TextureId>;

    fn bind_texture(&mut self, unit: u32, texture: TextureId);

    fn delete_texture(&mut self, texture: TextureId);

    // ── fixed-function state ──────────────────────────────────────────────

    fn set_viewport(&mut self, x: i32, y: i32, width: i32, height: i32);

    /// `None` disables the scissor test. Rect is `[x, y, width, height]`.
    fn set_scissor(&mut self, rect: Option<[i32; 4]>);

    fn set_stencil(&mut self, mode: StencilMode);

    /// Clears the color buffer to `color`, and the stencil buffer to 0 when asked.
    fn clear(&mut self, color: Color, stencil: bool);

    // ── draws ─────────────────────────────────────────────────────────────

    /// Draws `count` indices from the bound index buffer starting at byte `offset`.
    fn draw_elements(&mut self, mode: DrawMode, count: u32, index_type: IndexType, offset: usize);

    fn draw_arrays(&mut self, mode: DrawMode, first: u32, count: u32);
}
