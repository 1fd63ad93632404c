use crate::device::GpuDevice;
use crate::render::Texture;

/// Value of one custom uniform.
///
/// Integer and float vectors are distinct variants, so a `[1.0, 2.0]` never
/// gets uploaded as an `ivec2` by accident.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    /// Uploaded as an int, 0 or 1.
    Bool(bool),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    IVec2([i32; 2]),
    IVec3([i32; 3]),
    IVec4([i32; 4]),
    /// Column-major.
    Mat3([f32; 9]),
    /// Column-major.
    Mat4([f32; 16]),
    /// Bound to the next free texture unit; the sampler uniform receives the unit.
    Texture(Texture),
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        UniformValue::Bool(v)
    }
}

impl From<[f32; 2]> for UniformValue {
    fn from(v: [f32; 2]) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(v: [f32; 3]) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<[f32; 4]> for UniformValue {
    fn from(v: [f32; 4]) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Texture> for UniformValue {
    fn from(t: Texture) -> Self {
        UniformValue::Texture(t)
    }
}

/// Ordered set of named uniform values attached to a draw.
///
/// Order matters for texture uniforms: they take texture units in insertion
/// order. Setting an existing name replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformBag {
    entries: Vec<(String, UniformValue)>,
}

impl UniformBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<UniformValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<UniformValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniformValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Uploads every texture value that is not on the device yet.
    ///
    /// Returns whether a device texture was created. Failures are left for
    /// the bind to report.
    pub fn upload_textures(&self, device: &mut dyn GpuDevice) -> bool {
        let mut created = false;
        for (_, value) in &self.entries {
            if let UniformValue::Texture(texture) = value {
                created |= texture.upload_if_pending(device);
            }
        }
        created
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_in_place() {
        let mut bag = UniformBag::new().with("uA", 1.0_f32).with("uB", 2_i32);
        bag.set("uA", true);
        let names: Vec<_> = bag.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["uA", "uB"]);
        assert_eq!(bag.get("uA"), Some(&UniformValue::Bool(true)));
    }

    #[test]
    fn equality_tracks_values() {
        let a = UniformBag::new().with("uTime", 0.5_f32);
        let b = UniformBag::new().with("uTime", 0.5_f32);
        let c = UniformBag::new().with("uTime", 0.75_f32);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
