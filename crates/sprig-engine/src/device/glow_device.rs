use anyhow::{anyhow, Context, Result};
use glow::HasContext;

use crate::paint::Color;

use super::gpu::GpuDevice;
use super::types::{
    AttribType, BufferId, BufferTarget, DrawMode, ImageData, IndexType, ProgramId, ShaderId,
    ShaderStage, StencilMode, StencilOp, TextureId, UniformData, UniformLocation, VertexAttribute,
};

/// [`GpuDevice`] over a `glow` context (WebGL2 in the browser, GL 3.x natively).
///
/// Handles are indices into slot tables holding the native objects. Every GL
/// call is `unsafe` in glow; the invariant upheld here is that the context
/// passed to [`GlowDevice::new`] stays current on this thread for the
/// device's lifetime.
pub struct GlowDevice {
    gl: glow::Context,
    vao: Option<glow::VertexArray>,
    texture_units: u32,

    buffers: Vec<Option<glow::Buffer>>,
    shaders: Vec<Option<glow::Shader>>,
    programs: Vec<Option<glow::Program>>,
    textures: Vec<Option<glow::Texture>>,
    uniforms: Vec<glow::UniformLocation>,
}

impl GlowDevice {
    /// Wraps a current context and sets up the state the batchers rely on
    /// (one vertex array object, straight-alpha blending).
    pub fn new(gl: glow::Context) -> Result<Self> {
        // SAFETY: the caller hands over a current context.
        let (vao, texture_units) = unsafe {
            let vao = gl
                .create_vertex_array()
                .map_err(|e| anyhow!(e))
                .context("failed to create vertex array object")?;
            gl.bind_vertex_array(Some(vao));

            gl.enable(glow::BLEND);
            gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);

            let units = gl.get_parameter_i32(glow::MAX_TEXTURE_IMAGE_UNITS);
            (vao, units.max(0) as u32)
        };
        anyhow::ensure!(texture_units > 0, "GL context reports no texture units");
        log::debug!("glow device ready ({texture_units} texture units)");

        Ok(Self {
            gl,
            vao: Some(vao),
            texture_units,
            buffers: Vec::new(),
            shaders: Vec::new(),
            programs: Vec::new(),
            textures: Vec::new(),
            uniforms: Vec::new(),
        })
    }

    /// Underlying context, for host-side work (resizing the canvas, reading pixels).
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    fn buffer(&self, id: BufferId) -> Option<glow::Buffer> {
        self.buffers.get(id.raw() as usize).copied().flatten()
    }

    fn shader(&self, id: ShaderId) -> Option<glow::Shader> {
        self.shaders.get(id.raw() as usize).copied().flatten()
    }

    fn program(&self, id: ProgramId) -> Option<glow::Program> {
        self.programs.get(id.raw() as usize).copied().flatten()
    }

    fn texture(&self, id: TextureId) -> Option<glow::Texture> {
        self.textures.get(id.raw() as usize).copied().flatten()
    }
}

impl Drop for GlowDevice {
    fn drop(&mut self) {
        // SAFETY: same context as at construction.
        unsafe {
            for b in self.buffers.drain(..).flatten() {
                self.gl.delete_buffer(b);
            }
            for t in self.textures.drain(..).flatten() {
                self.gl.delete_texture(t);
            }
            for p in self.programs.drain(..).flatten() {
                self.gl.delete_program(p);
            }
            for s in self.shaders.drain(..).flatten() {
                self.gl.delete_shader(s);
            }
            if let Some(vao) = self.vao.take() {
                self.gl.delete_vertex_array(vao);
            }
        }
    }
}

fn gl_target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Vertex => glow::ARRAY_BUFFER,
        BufferTarget::Index => glow::ELEMENT_ARRAY_BUFFER,
    }
}

fn gl_mode(mode: DrawMode) -> u32 {
    match mode {
        DrawMode::Triangles => glow::TRIANGLES,
        DrawMode::TriangleFan => glow::TRIANGLE_FAN,
        DrawMode::TriangleStrip => glow::TRIANGLE_STRIP,
        DrawMode::Lines => glow::LINES,
        DrawMode::LineStrip => glow::LINE_STRIP,
    }
}

fn gl_attrib_type(ty: AttribType) -> u32 {
    match ty {
        AttribType::F32 => glow::FLOAT,
        AttribType::U8 => glow::UNSIGNED_BYTE,
        AttribType::U16 => glow::UNSIGNED_SHORT,
        AttribType::U32 => glow::UNSIGNED_INT,
    }
}

impl GpuDevice for GlowDevice {
    fn max_texture_units(&self) -> u32 {
        self.texture_units
    }

    fn create_buffer(&mut self) -> Result<BufferId> {
        // SAFETY: context is current (see type docs); same for every block below.
        let buffer = unsafe { self.gl.create_buffer() }
            .map_err(|e| anyhow!(e))
            .context("failed to create GL buffer")?;
        self.buffers.push(Some(buffer));
        Ok(BufferId::from_raw((self.buffers.len() - 1) as u32))
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferId) {
        let native = self.buffer(buffer);
        unsafe { self.gl.bind_buffer(gl_target(target), native) }
    }

    fn buffer_data(&mut self, target: BufferTarget, size: usize, data: &[u8]) {
        let t = gl_target(target);
        unsafe {
            self.gl.buffer_data_size(t, size as i32, glow::DYNAMIC_DRAW);
            if !data.is_empty() {
                self.gl.buffer_sub_data_u8_slice(t, 0, data);
            }
        }
    }

    fn buffer_sub_data(&mut self, target: BufferTarget, offset: usize, data: &[u8]) {
        unsafe {
            self.gl
                .buffer_sub_data_u8_slice(gl_target(target), offset as i32, data)
        }
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String> {
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        let shader = unsafe {
            let shader = self.gl.create_shader(kind)?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            if !self.gl.get_shader_compile_status(shader) {
                let info = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                return Err(info);
            }
            shader
        };
        self.shaders.push(Some(shader));
        Ok(ShaderId::from_raw((self.shaders.len() - 1) as u32))
    }

    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, String> {
        let (Some(vs), Some(fs)) = (self.shader(vertex), self.shader(fragment)) else {
            return Err("unknown shader handle".to_owned());
        };
        let program = unsafe {
            let program = self.gl.create_program()?;
            self.gl.attach_shader(program, vs);
            self.gl.attach_shader(program, fs);
            self.gl.link_program(program);
            self.gl.detach_shader(program, vs);
            self.gl.detach_shader(program, fs);
            if !self.gl.get_program_link_status(program) {
                let info = self.gl.get_program_info_log(program);
                self.gl.delete_program(program);
                return Err(info);
            }
            program
        };
        self.programs.push(Some(program));
        Ok(ProgramId::from_raw((self.programs.len() - 1) as u32))
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        if let Some(native) = self.shaders.get_mut(shader.raw() as usize).and_then(Option::take) {
            unsafe { self.gl.delete_shader(native) }
        }
    }

    fn delete_program(&mut self, program: ProgramId) {
        if let Some(native) = self.programs.get_mut(program.raw() as usize).and_then(Option::take) {
            unsafe { self.gl.delete_program(native) }
        }
    }

    fn use_program(&mut self, program: ProgramId) {
        let native = self.program(program);
        unsafe { self.gl.use_program(native) }
    }

    fn attrib_location(&mut self, program: ProgramId, name: &str) -> Option<u32> {
        let native = self.program(program)?;
        unsafe { self.gl.get_attrib_location(native, name) }
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let native = self.program(program)?;
        let location = unsafe { self.gl.get_uniform_location(native, name) }?;
        self.uniforms.push(location);
        Some(UniformLocation::from_raw((self.uniforms.len() - 1) as u32))
    }

    fn vertex_attrib_pointer(&mut self, location: u32, attribute: &VertexAttribute) {
        unsafe {
            self.gl.enable_vertex_attrib_array(location);
            self.gl.vertex_attrib_pointer_f32(
                location,
                attribute.components as i32,
                gl_attrib_type(attribute.ty),
                attribute.normalized,
                attribute.stride as i32,
                attribute.offset as i32,
            );
        }
    }

    fn set_uniform(&mut self, location: UniformLocation, data: UniformData<'_>) {
        let Some(loc) = self.uniforms.get(location.raw() as usize) else {
            log::warn!("glow: unknown uniform location {location:?}");
            return;
        };
        let loc = Some(loc);
        unsafe {
            match data {
                UniformData::Float(&[x]) => self.gl.uniform_1_f32(loc, x),
                UniformData::Float(&[x, y]) => self.gl.uniform_2_f32(loc, x, y),
                UniformData::Float(&[x, y, z]) => self.gl.uniform_3_f32(loc, x, y, z),
                UniformData::Float(&[x, y, z, w]) => self.gl.uniform_4_f32(loc, x, y, z, w),
                UniformData::Int(&[x]) => self.gl.uniform_1_i32(loc, x),
                UniformData::Int(&[x, y]) => self.gl.uniform_2_i32(loc, x, y),
                UniformData::Int(&[x, y, z]) => self.gl.uniform_3_i32(loc, x, y, z),
                UniformData::Int(&[x, y, z, w]) => self.gl.uniform_4_i32(loc, x, y, z, w),
                UniformData::IntArray(v) => self.gl.uniform_1_i32_slice(loc, v),
                UniformData::Mat3(m) => self.gl.uniform_matrix_3_f32_slice(loc, false, m),
                UniformData::Mat4(m) => self.gl.uniform_matrix_4_f32_slice(loc, false, m),
                UniformData::Float(v) => log::warn!("glow: float uniform of width {}", v.len()),
                UniformData::Int(v) => log::warn!("glow: int uniform of width {}", v.len()),
            }
        }
    }

    fn create_texture(&mut self, image: &ImageData) -> Result<TextureId> {
        let texture = unsafe {
            let texture = self
                .gl
                .create_texture()
                .map_err(|e| anyhow!(e))
                .context("failed to create GL texture")?;
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                image.width as i32,
                image.height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(&image.pixels)),
            );
            texture
        };
        self.textures.push(Some(texture));
        Ok(TextureId::from_raw((self.textures.len() - 1) as u32))
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        let native = self.texture(texture);
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(glow::TEXTURE_2D, native);
        }
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if let Some(native) = self.textures.get_mut(texture.raw() as usize).and_then(Option::take) {
            unsafe { self.gl.delete_texture(native) }
        }
    }

    fn set_viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn set_scissor(&mut self, rect: Option<[i32; 4]>) {
        unsafe {
            match rect {
                Some([x, y, w, h]) => {
                    self.gl.enable(glow::SCISSOR_TEST);
                    self.gl.scissor(x, y, w, h);
                }
                None => self.gl.disable(glow::SCISSOR_TEST),
            }
        }
    }

    fn set_stencil(&mut self, mode: StencilMode) {
        unsafe {
            match mode {
                StencilMode::Disabled => {
                    self.gl.disable(glow::STENCIL_TEST);
                    self.gl.color_mask(true, true, true, true);
                }
                StencilMode::Write { reference, op } => {
                    let op = match op {
                        StencilOp::Increment => glow::INCR,
                        StencilOp::Decrement => glow::DECR,
                    };
                    self.gl.enable(glow::STENCIL_TEST);
                    self.gl.color_mask(false, false, false, false);
                    self.gl.stencil_func(glow::EQUAL, reference as i32, 0xff);
                    self.gl.stencil_op(glow::KEEP, glow::KEEP, op);
                }
                StencilMode::Test { reference } => {
                    self.gl.enable(glow::STENCIL_TEST);
                    self.gl.color_mask(true, true, true, true);
                    self.gl.stencil_func(glow::EQUAL, reference as i32, 0xff);
                    self.gl.stencil_op(glow::KEEP, glow::KEEP, glow::KEEP);
                }
            }
        }
    }

    fn clear(&mut self, color: Color, stencil: bool) {
        let mut mask = glow::COLOR_BUFFER_BIT;
        if stencil {
            mask |= glow::STENCIL_BUFFER_BIT;
        }
        unsafe {
            self.gl.clear_color(
                color.r() as f32 / 255.0,
                color.g() as f32 / 255.0,
                color.b() as f32 / 255.0,
                color.a() as f32 / 255.0,
            );
            self.gl.clear_stencil(0);
            self.gl.clear(mask);
        }
    }

    fn draw_elements(&mut self, mode: DrawMode, count: u32, index_type: IndexType, offset: usize) {
        let ty = match index_type {
            IndexType::U16 => glow::UNSIGNED_SHORT,
            IndexType::U32 => glow::UNSIGNED_INT,
        };
        unsafe {
            self.gl
                .draw_elements(gl_mode(mode), count as i32, ty, offset as i32)
        }
    }

    fn draw_arrays(&mut self, mode: DrawMode, first: u32, count: u32) {
        unsafe {
            self.gl
                .draw_arrays(gl_mode(mode), first as i32, count as i32)
        }
    }
}
