use std::cell::{Ref, RefCell};
use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::device::{
    GpuDevice, ProgramId, ShaderStage, UniformData, UniformLocation, VertexAttribute,
};
use crate::logging::WarnOnce;

use super::{UniformBag, UniformValue};

#[derive(Debug, Clone, Error)]
pub enum ShaderError {
    #[error("{stage:?} shader failed to compile: {log}\n{}", numbered(.code))]
    Compile {
        stage: ShaderStage,
        log: String,
        code: String,
    },
    #[error("shader program failed to link: {log}")]
    Link { log: String },
}

fn numbered(code: &str) -> String {
    code.lines()
        .enumerate()
        .map(|(i, line)| format!("{:>4} | {line}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Kind of a declaration found by [`parse_declarations`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Declaration {
    Attribute,
    Uniform,
}

static DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(attribute|uniform)\s+(?:(?:lowp|mediump|highp)\s+)?\w+\s+(\w+)\s*(?:\[[^\]]*\])?\s*;",
    )
    .expect("declaration pattern is valid")
});

/// Scans GLSL source for `attribute` / `uniform` declarations.
///
/// Pattern matching on the text, not a parser: one declaration per statement,
/// array suffixes are dropped from the name.
pub fn parse_declarations(source: &str) -> Vec<(Declaration, String)> {
    DECLARATION
        .captures_iter(source)
        .map(|c| {
            let kind = match &c[1] {
                "attribute" => Declaration::Attribute,
                _ => Declaration::Uniform,
            };
            (kind, c[2].to_owned())
        })
        .collect()
}

/// Linked program plus the locations of everything its sources declare.
///
/// Names the driver reports as inactive (declared but unused) are skipped and
/// later lookups for them return `None`.
#[derive(Debug)]
pub struct ShaderProgram {
    id: ProgramId,
    attributes: HashMap<String, u32>,
    uniforms: HashMap<String, UniformLocation>,
    layout: RefCell<Vec<VertexAttribute>>,
}

impl ShaderProgram {
    pub fn compile(
        device: &mut dyn GpuDevice,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, ShaderError> {
        let vs = device
            .compile_shader(ShaderStage::Vertex, vertex_source)
            .map_err(|log| ShaderError::Compile {
                stage: ShaderStage::Vertex,
                log,
                code: vertex_source.to_owned(),
            })?;
        let fs = match device.compile_shader(ShaderStage::Fragment, fragment_source) {
            Ok(fs) => fs,
            Err(log) => {
                device.delete_shader(vs);
                return Err(ShaderError::Compile {
                    stage: ShaderStage::Fragment,
                    log,
                    code: fragment_source.to_owned(),
                });
            }
        };

        let linked = device.link_program(vs, fs);
        device.delete_shader(vs);
        device.delete_shader(fs);
        let id = linked.map_err(|log| ShaderError::Link { log })?;

        let mut program = Self {
            id,
            attributes: HashMap::new(),
            uniforms: HashMap::new(),
            layout: RefCell::new(Vec::new()),
        };
        program.parse_shader(device, vertex_source);
        program.parse_shader(device, fragment_source);
        log::debug!(
            "shader program {:?}: {} attributes, {} uniforms",
            id,
            program.attributes.len(),
            program.uniforms.len()
        );
        Ok(program)
    }

    /// Resolves locations for every declaration in `source`.
    fn parse_shader(&mut self, device: &mut dyn GpuDevice, source: &str) {
        for (kind, name) in parse_declarations(source) {
            match kind {
                Declaration::Attribute => {
                    if let Some(loc) = device.attrib_location(self.id, &name) {
                        self.attributes.insert(name, loc);
                    }
                }
                Declaration::Uniform => {
                    if self.uniforms.contains_key(&name) {
                        continue;
                    }
                    if let Some(loc) = device.uniform_location(self.id, &name) {
                        self.uniforms.insert(name, loc);
                    }
                }
            }
        }
    }

    #[inline]
    pub fn id(&self) -> ProgramId {
        self.id
    }

    #[inline]
    pub fn bind(&self, device: &mut dyn GpuDevice) {
        device.use_program(self.id);
    }

    #[inline]
    pub fn attribute(&self, name: &str) -> Option<u32> {
        self.attributes.get(name).copied()
    }

    #[inline]
    pub fn uniform(&self, name: &str) -> Option<UniformLocation> {
        self.uniforms.get(name).copied()
    }

    /// Layout passed to the last [`set_attributes`](Self::set_attributes).
    #[inline]
    pub fn layout(&self) -> Ref<'_, [VertexAttribute]> {
        Ref::map(self.layout.borrow(), Vec::as_slice)
    }

    /// Points every resolved attribute of `layout` at the bound vertex buffer.
    pub fn set_attributes(&self, device: &mut dyn GpuDevice, layout: &[VertexAttribute]) {
        for attribute in layout {
            if let Some(loc) = self.attribute(attribute.name) {
                device.vertex_attrib_pointer(loc, attribute);
            }
        }
        let mut current = self.layout.borrow_mut();
        if current.as_slice() != layout {
            *current = layout.to_vec();
        }
    }

    /// Uploads `uniforms` to this program, which must be in use.
    ///
    /// Texture values take units starting at `first_free_unit`; the returned
    /// value is the next free unit, so several bags can share one draw.
    /// Unknown names, units beyond the device budget, and textures that fail
    /// to upload are reported once and skipped.
    pub fn set_uniforms(
        &self,
        device: &mut dyn GpuDevice,
        uniforms: &UniformBag,
        first_free_unit: u32,
        warnings: &mut WarnOnce,
    ) -> u32 {
        // creating a texture rebinds the active unit, so nothing is bound until all exist
        uniforms.upload_textures(device);
        let mut unit = first_free_unit;
        for (name, value) in uniforms.iter() {
            let Some(loc) = self.uniform(name) else {
                warnings.warn(format!("uniform `{name}` is not an active uniform of the shader; skipped"));
                continue;
            };
            let data = match value {
                UniformValue::Float(v) => UniformData::Float(std::slice::from_ref(v)),
                UniformValue::Int(v) => UniformData::Int(std::slice::from_ref(v)),
                UniformValue::Bool(b) => {
                    device.set_uniform(loc, UniformData::Int(&[*b as i32]));
                    continue;
                }
                UniformValue::Vec2(v) => UniformData::Float(v),
                UniformValue::Vec3(v) => UniformData::Float(v),
                UniformValue::Vec4(v) => UniformData::Float(v),
                UniformValue::IVec2(v) => UniformData::Int(v),
                UniformValue::IVec3(v) => UniformData::Int(v),
                UniformValue::IVec4(v) => UniformData::Int(v),
                UniformValue::Mat3(m) => UniformData::Mat3(m),
                UniformValue::Mat4(m) => UniformData::Mat4(m),
                UniformValue::Texture(texture) => {
                    if unit >= device.max_texture_units() {
                        warnings.warn(format!(
                            "uniform `{name}`: no texture unit left (budget {}); skipped",
                            device.max_texture_units()
                        ));
                        continue;
                    }
                    match texture.ensure_uploaded(device) {
                        Ok(id) => {
                            device.bind_texture(unit, id);
                            device.set_uniform(loc, UniformData::Int(&[unit as i32]));
                            unit += 1;
                        }
                        Err(err) => {
                            warnings.warn(format!("uniform `{name}`: texture unavailable ({err:#}); skipped"));
                        }
                    }
                    continue;
                }
            };
            device.set_uniform(loc, data);
        }
        unit
    }

    pub fn delete(self, device: &mut dyn GpuDevice) {
        device.delete_program(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{HeadlessDevice, ImageData, RecordedUniform};
    use crate::render::Texture;

    const VS: &str = "attribute vec2 aPosition;\nattribute highp float aTextureId;\nuniform vec2 uResolution;\nvoid main() {}";
    const FS: &str = "precision mediump float;\nuniform sampler2D uTextures[4];\nuniform float uTime;\nuniform sampler2D uMask;\nvoid main() {}";

    fn program(dev: &mut HeadlessDevice) -> ShaderProgram {
        ShaderProgram::compile(dev, VS, FS).unwrap()
    }

    // ── parsing ───────────────────────────────────────────────────────────

    #[test]
    fn declarations_are_found_with_qualifiers_and_arrays() {
        let found = parse_declarations(VS);
        assert_eq!(
            found,
            vec![
                (Declaration::Attribute, "aPosition".to_owned()),
                (Declaration::Attribute, "aTextureId".to_owned()),
                (Declaration::Uniform, "uResolution".to_owned()),
            ]
        );
        let names: Vec<_> = parse_declarations(FS).into_iter().map(|(_, n)| n).collect();
        assert_eq!(names, ["uTextures", "uTime", "uMask"]);
    }

    #[test]
    fn locations_are_resolved_after_link() {
        let mut dev = HeadlessDevice::new(4);
        let p = program(&mut dev);
        assert!(p.attribute("aPosition").is_some());
        assert!(p.uniform("uTextures").is_some());
        assert!(p.uniform("uMissing").is_none());
    }

    // ── errors ────────────────────────────────────────────────────────────

    #[test]
    fn compile_error_carries_numbered_source() {
        let mut dev = HeadlessDevice::new(4).fail_compile_containing("uTime");
        let err = ShaderProgram::compile(&mut dev, VS, FS).unwrap_err();
        assert!(matches!(err, ShaderError::Compile { stage: ShaderStage::Fragment, .. }));
        let msg = err.to_string();
        assert!(msg.contains("   3 | uniform float uTime;"), "{msg}");
    }

    // ── uniforms ──────────────────────────────────────────────────────────

    #[test]
    fn uniforms_dispatch_by_variant() {
        let mut dev = HeadlessDevice::new(4);
        let p = program(&mut dev);
        p.bind(&mut dev);
        let bag = UniformBag::new()
            .with("uTime", 0.5_f32)
            .with("uResolution", UniformValue::IVec2([3, 4]));
        let mut warnings = WarnOnce::new();
        let next = p.set_uniforms(&mut dev, &bag, 2, &mut warnings);

        assert_eq!(next, 2);
        assert_eq!(dev.uniform(p.id(), "uTime"), Some(&RecordedUniform::Float(vec![0.5])));
        assert_eq!(dev.uniform(p.id(), "uResolution"), Some(&RecordedUniform::Int(vec![3, 4])));
        assert!(warnings.is_empty());
    }

    #[test]
    fn textures_take_consecutive_units() {
        let mut dev = HeadlessDevice::new(4);
        let p = program(&mut dev);
        let tex = Texture::from_image(ImageData::solid(1, 1, [255; 4]));
        let bag = UniformBag::new().with("uMask", tex.clone());
        let mut warnings = WarnOnce::new();

        assert_eq!(p.set_uniforms(&mut dev, &bag, 1, &mut warnings), 2);
        assert_eq!(dev.uniform(p.id(), "uMask"), Some(&RecordedUniform::Int(vec![1])));
        assert!(tex.id().is_some());

        // budget exhausted: skipped with a warning, counter unchanged
        assert_eq!(p.set_uniforms(&mut dev, &bag, 4, &mut warnings), 4);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn unknown_uniform_warns_once() {
        let mut dev = HeadlessDevice::new(4);
        let p = program(&mut dev);
        let bag = UniformBag::new().with("uNope", true);
        let mut warnings = WarnOnce::new();
        p.set_uniforms(&mut dev, &bag, 0, &mut warnings);
        p.set_uniforms(&mut dev, &bag, 0, &mut warnings);
        assert_eq!(warnings.len(), 1);
    }
}
