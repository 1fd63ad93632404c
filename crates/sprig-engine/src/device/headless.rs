use std::collections::HashMap;

use anyhow::{bail, Result};

use crate::paint::Color;

use super::gpu::GpuDevice;
use super::types::{
    BufferId, BufferTarget, DrawMode, ImageData, IndexType, ProgramId, ShaderId, ShaderStage,
    StencilMode, TextureId, UniformData, UniformLocation, VertexAttribute,
};

/// Owned copy of an uploaded uniform value.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedUniform {
    Float(Vec<f32>),
    Int(Vec<i32>),
    IntArray(Vec<i32>),
    Mat3([f32; 9]),
    Mat4([f32; 16]),
}

impl From<UniformData<'_>> for RecordedUniform {
    fn from(data: UniformData<'_>) -> Self {
        match data {
            UniformData::Float(v) => RecordedUniform::Float(v.to_vec()),
            UniformData::Int(v) => RecordedUniform::Int(v.to_vec()),
            UniformData::IntArray(v) => RecordedUniform::IntArray(v.to_vec()),
            UniformData::Mat3(m) => RecordedUniform::Mat3(*m),
            UniformData::Mat4(m) => RecordedUniform::Mat4(*m),
        }
    }
}

/// Snapshot of device state at a draw call.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub mode: DrawMode,
    /// Index count for indexed draws, vertex count otherwise.
    pub count: u32,
    pub indexed: bool,
    pub program: Option<ProgramId>,
    /// Texture bound to each unit when the draw was issued.
    pub units: Vec<Option<TextureId>>,
    /// Full contents of the bound vertex buffer.
    pub vertex_data: Vec<u8>,
    pub stencil: StencilMode,
}

/// One recorded device operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    CreateBuffer(BufferId),
    BufferData { target: BufferTarget, buffer: BufferId, size: usize, written: usize },
    BufferSubData { target: BufferTarget, buffer: BufferId, offset: usize, written: usize },
    UseProgram(ProgramId),
    BindTexture { unit: u32, texture: TextureId },
    CreateTexture(TextureId),
    DeleteTexture(TextureId),
    SetStencil(StencilMode),
    Clear { stencil: bool },
    Draw(DrawCall),
}

#[derive(Debug)]
struct HeadlessProgram {
    sources: String,
    attributes: HashMap<String, u32>,
}

/// GPU-less [`GpuDevice`] that records everything it is asked to do.
///
/// Buffer contents are kept, so draw calls can be inspected down to the vertex
/// bytes. Attribute and uniform names resolve when they appear in the linked
/// sources.
#[derive(Debug)]
pub struct HeadlessDevice {
    texture_units: u32,
    calls: Vec<DeviceCall>,

    buffers: Vec<Option<Vec<u8>>>,
    bound_vertex: Option<BufferId>,
    bound_index: Option<BufferId>,

    shaders: Vec<Option<(ShaderStage, String)>>,
    programs: Vec<Option<HeadlessProgram>>,
    current_program: Option<ProgramId>,

    uniform_names: Vec<(ProgramId, String)>,
    uniforms: HashMap<(ProgramId, String), RecordedUniform>,

    textures: Vec<Option<(u32, u32)>>,
    units: Vec<Option<TextureId>>,
    active_unit: u32,
    stencil: StencilMode,

    fail_compile_marker: Option<String>,
    fail_texture_creation: bool,
}

impl HeadlessDevice {
    pub fn new(texture_units: u32) -> Self {
        Self {
            texture_units,
            calls: Vec::new(),
            buffers: Vec::new(),
            bound_vertex: None,
            bound_index: None,
            shaders: Vec::new(),
            programs: Vec::new(),
            current_program: None,
            uniform_names: Vec::new(),
            uniforms: HashMap::new(),
            textures: Vec::new(),
            units: vec![None; texture_units as usize],
            active_unit: 0,
            stencil: StencilMode::Disabled,
            fail_compile_marker: None,
            fail_texture_creation: false,
        }
    }

    /// Makes every shader whose source contains `marker` fail to compile.
    pub fn fail_compile_containing(mut self, marker: impl Into<String>) -> Self {
        self.fail_compile_marker = Some(marker.into());
        self
    }

    /// Makes texture creation fail.
    pub fn fail_texture_creation(mut self) -> Self {
        self.fail_texture_creation = true;
        self
    }

    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn draw_calls(&self) -> impl Iterator<Item = &DrawCall> {
        self.calls.iter().filter_map(|c| match c {
            DeviceCall::Draw(d) => Some(d),
            _ => None,
        })
    }

    pub fn live_textures(&self) -> usize {
        self.textures.iter().filter(|t| t.is_some()).count()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.iter().filter(|p| p.is_some()).count()
    }

    /// Texture currently bound to `unit`.
    pub fn bound_texture(&self, unit: u32) -> Option<TextureId> {
        self.units.get(unit as usize).copied().flatten()
    }

    pub fn buffer_contents(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(buffer.raw() as usize)?.as_deref()
    }

    /// Last value uploaded to `name` in `program`.
    pub fn uniform(&self, program: ProgramId, name: &str) -> Option<&RecordedUniform> {
        self.uniforms.get(&(program, name.to_owned()))
    }

    pub fn current_program(&self) -> Option<ProgramId> {
        self.current_program
    }

    pub fn stencil(&self) -> StencilMode {
        self.stencil
    }

    fn bound(&self, target: BufferTarget) -> Option<BufferId> {
        match target {
            BufferTarget::Vertex => self.bound_vertex,
            BufferTarget::Index => self.bound_index,
        }
    }

    fn bound_storage(&mut self, target: BufferTarget) -> Option<(BufferId, &mut Vec<u8>)> {
        let id = self.bound(target)?;
        let storage = self.buffers.get_mut(id.raw() as usize)?.as_mut()?;
        Some((id, storage))
    }

    fn draw_snapshot(&self, mode: DrawMode, count: u32, indexed: bool) -> DrawCall {
        let vertex_data = self
            .bound_vertex
            .and_then(|b| self.buffer_contents(b))
            .map(<[u8]>::to_vec)
            .unwrap_or_default();
        DrawCall {
            mode,
            count,
            indexed,
            program: self.current_program,
            units: self.units.clone(),
            vertex_data,
            stencil: self.stencil,
        }
    }
}

fn slot<T>(slots: &mut Vec<Option<T>>, value: T) -> u32 {
    slots.push(Some(value));
    (slots.len() - 1) as u32
}

impl GpuDevice for HeadlessDevice {
    fn max_texture_units(&self) -> u32 {
        self.texture_units
    }

    fn create_buffer(&mut self) -> Result<BufferId> {
        let id = BufferId::from_raw(slot(&mut self.buffers, Vec::new()));
        self.calls.push(DeviceCall::CreateBuffer(id));
        Ok(id)
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferId) {
        match target {
            BufferTarget::Vertex => self.bound_vertex = Some(buffer),
            BufferTarget::Index => self.bound_index = Some(buffer),
        }
    }

    fn buffer_data(&mut self, target: BufferTarget, size: usize, data: &[u8]) {
        let Some((buffer, storage)) = self.bound_storage(target) else {
            log::warn!("headless: buffer_data with nothing bound to {target:?}");
            return;
        };
        storage.clear();
        storage.resize(size, 0);
        let n = data.len().min(size);
        storage[..n].copy_from_slice(&data[..n]);
        self.calls.push(DeviceCall::BufferData { target, buffer, size, written: n });
    }

    fn buffer_sub_data(&mut self, target: BufferTarget, offset: usize, data: &[u8]) {
        let Some((buffer, storage)) = self.bound_storage(target) else {
            log::warn!("headless: buffer_sub_data with nothing bound to {target:?}");
            return;
        };
        let end = (offset + data.len()).min(storage.len());
        let n = end.saturating_sub(offset);
        storage[offset..end].copy_from_slice(&data[..n]);
        self.calls.push(DeviceCall::BufferSubData { target, buffer, offset, written: n });
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String> {
        if let Some(marker) = &self.fail_compile_marker {
            if source.contains(marker.as_str()) {
                return Err(format!("ERROR: 0:1: '{marker}' : syntax error"));
            }
        }
        Ok(ShaderId::from_raw(slot(&mut self.shaders, (stage, source.to_owned()))))
    }

    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, String> {
        let stage_of = |id: ShaderId| {
            self.shaders
                .get(id.raw() as usize)
                .and_then(Option::as_ref)
                .map(|(stage, src)| (*stage, src.clone()))
        };
        let (Some((ShaderStage::Vertex, vs)), Some((ShaderStage::Fragment, fs))) =
            (stage_of(vertex), stage_of(fragment))
        else {
            return Err("link failed: expected one vertex and one fragment shader".to_owned());
        };
        let program = HeadlessProgram {
            sources: format!("{vs}\n{fs}"),
            attributes: HashMap::new(),
        };
        Ok(ProgramId::from_raw(slot(&mut self.programs, program)))
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        if let Some(s) = self.shaders.get_mut(shader.raw() as usize) {
            *s = None;
        }
    }

    fn delete_program(&mut self, program: ProgramId) {
        if let Some(p) = self.programs.get_mut(program.raw() as usize) {
            *p = None;
        }
    }

    fn use_program(&mut self, program: ProgramId) {
        self.current_program = Some(program);
        self.calls.push(DeviceCall::UseProgram(program));
    }

    fn attrib_location(&mut self, program: ProgramId, name: &str) -> Option<u32> {
        let p = self.programs.get_mut(program.raw() as usize)?.as_mut()?;
        if !p.sources.contains(name) {
            return None;
        }
        let next = p.attributes.len() as u32;
        Some(*p.attributes.entry(name.to_owned()).or_insert(next))
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let p = self.programs.get(program.raw() as usize)?.as_ref()?;
        if !p.sources.contains(name) {
            return None;
        }
        let key = (program, name.to_owned());
        let index = match self.uniform_names.iter().position(|k| *k == key) {
            Some(i) => i,
            None => {
                self.uniform_names.push(key);
                self.uniform_names.len() - 1
            }
        };
        Some(UniformLocation::from_raw(index as u32))
    }

    fn vertex_attrib_pointer(&mut self, _location: u32, _attribute: &VertexAttribute) {}

    fn set_uniform(&mut self, location: UniformLocation, data: UniformData<'_>) {
        let Some(key) = self.uniform_names.get(location.raw() as usize).cloned() else {
            log::warn!("headless: unknown uniform location {location:?}");
            return;
        };
        self.uniforms.insert(key, data.into());
    }

    fn create_texture(&mut self, image: &ImageData) -> Result<TextureId> {
        if self.fail_texture_creation {
            bail!("headless: texture creation disabled");
        }
        let id = TextureId::from_raw(slot(&mut self.textures, (image.width, image.height)));
        // GL uploads through the active unit and leaves the new texture bound there
        if let Some(u) = self.units.get_mut(self.active_unit as usize) {
            *u = Some(id);
        }
        self.calls.push(DeviceCall::CreateTexture(id));
        Ok(id)
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        if let Some(u) = self.units.get_mut(unit as usize) {
            *u = Some(texture);
        }
        self.active_unit = unit;
        self.calls.push(DeviceCall::BindTexture { unit, texture });
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if let Some(t) = self.textures.get_mut(texture.raw() as usize) {
            *t = None;
        }
        for u in self.units.iter_mut().filter(|u| **u == Some(texture)) {
            *u = None;
        }
        self.calls.push(DeviceCall::DeleteTexture(texture));
    }

    fn set_viewport(&mut self, _x: i32, _y: i32, _width: i32, _height: i32) {}

    fn set_scissor(&mut self, _rect: Option<[i32; 4]>) {}

    fn set_stencil(&mut self, mode: StencilMode) {
        self.stencil = mode;
        self.calls.push(DeviceCall::SetStencil(mode));
    }

    fn clear(&mut self, _color: Color, stencil: bool) {
        self.calls.push(DeviceCall::Clear { stencil });
    }

    fn draw_elements(&mut self, mode: DrawMode, count: u32, _index_type: IndexType, _offset: usize) {
        let call = self.draw_snapshot(mode, count, true);
        self.calls.push(DeviceCall::Draw(call));
    }

    fn draw_arrays(&mut self, mode: DrawMode, _first: u32, count: u32) {
        let call = self.draw_snapshot(mode, count, false);
        self.calls.push(DeviceCall::Draw(call));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_data_writes_into_existing_storage() {
        let mut dev = HeadlessDevice::new(4);
        let buf = dev.create_buffer().unwrap();
        dev.bind_buffer(BufferTarget::Vertex, buf);
        dev.buffer_data(BufferTarget::Vertex, 8, &[1, 2]);
        dev.buffer_sub_data(BufferTarget::Vertex, 4, &[9, 9]);
        assert_eq!(dev.buffer_contents(buf).unwrap(), &[1, 2, 0, 0, 9, 9, 0, 0]);
    }

    #[test]
    fn names_resolve_only_when_present_in_sources() {
        let mut dev = HeadlessDevice::new(4);
        let vs = dev.compile_shader(ShaderStage::Vertex, "attribute vec2 aPos;").unwrap();
        let fs = dev.compile_shader(ShaderStage::Fragment, "uniform float uTime;").unwrap();
        let p = dev.link_program(vs, fs).unwrap();
        assert!(dev.attrib_location(p, "aPos").is_some());
        assert!(dev.attrib_location(p, "aMissing").is_none());
        let loc = dev.uniform_location(p, "uTime").unwrap();
        dev.set_uniform(loc, UniformData::Float(&[0.5]));
        assert_eq!(dev.uniform(p, "uTime"), Some(&RecordedUniform::Float(vec![0.5])));
    }

    #[test]
    fn created_texture_lands_on_the_active_unit() {
        let mut dev = HeadlessDevice::new(4);
        let image = ImageData::solid(1, 1, [255; 4]);
        let a = dev.create_texture(&image).unwrap();
        assert_eq!(dev.bound_texture(0), Some(a));
        dev.bind_texture(2, a);
        let b = dev.create_texture(&image).unwrap();
        assert_eq!(dev.bound_texture(2), Some(b));
        assert_eq!(dev.bound_texture(0), Some(a));
    }

    #[test]
    fn compile_failure_is_injectable() {
        let mut dev = HeadlessDevice::new(4).fail_compile_containing("BROKEN");
        assert!(dev.compile_shader(ShaderStage::Vertex, "void main() { BROKEN }").is_err());
        assert!(dev.compile_shader(ShaderStage::Vertex, "void main() {}").is_ok());
    }
}
