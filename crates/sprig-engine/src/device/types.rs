use anyhow::ensure;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// Wraps a backend-assigned slot index.
            #[inline]
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }
    };
}

handle!(
    /// Device buffer handle.
    BufferId
);
handle!(
    /// Compiled (unlinked) shader stage handle.
    ShaderId
);
handle!(
    /// Linked program handle.
    ProgramId
);
handle!(
    /// Device texture handle.
    TextureId
);
handle!(
    /// Resolved uniform location within one program.
    UniformLocation
);

/// Buffer binding point.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferTarget {
    Vertex,
    Index,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Component type of a vertex attribute.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AttribType {
    F32,
    U8,
    U16,
    U32,
}

impl AttribType {
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            AttribType::F32 | AttribType::U32 => 4,
            AttribType::U16 => 2,
            AttribType::U8 => 1,
        }
    }
}

/// Primitive assembly mode for a draw call.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum DrawMode {
    Triangles,
    #[default]
    TriangleFan,
    TriangleStrip,
    Lines,
    LineStrip,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum IndexType {
    U16,
    U32,
}

impl IndexType {
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// One entry of an interleaved vertex layout.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    pub name: &'static str,
    pub components: u32,
    pub ty: AttribType,
    pub normalized: bool,
    /// Bytes between consecutive vertices.
    pub stride: u32,
    /// Byte offset of this attribute within a vertex.
    pub offset: u32,
}

/// Value payload for a uniform upload.
///
/// `Float` and `Int` pick the uniform width from the slice length (1..=4).
/// `IntArray` uploads an array of scalars, which is how sampler arrays are set.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformData<'a> {
    Float(&'a [f32]),
    Int(&'a [i32]),
    IntArray(&'a [i32]),
    Mat3(&'a [f32; 9]),
    Mat4(&'a [f32; 16]),
}

/// Stencil configuration used for nested masking.
///
/// Masks of depth `n` mark their pixels with stencil value `n`. Content drawn
/// under `Test { reference: n }` only lands on pixels inside all `n` masks.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum StencilMode {
    #[default]
    Disabled,
    /// Color writes off; pixels equal to `reference` get `op` applied.
    Write { reference: u8, op: StencilOp },
    /// Color writes on; only pixels equal to `reference` pass.
    Test { reference: u8 },
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StencilOp {
    Increment,
    Decrement,
}

/// Decoded RGBA8 image, row-major, top row first.
///
/// Decoding from file formats happens outside the core; this is the only
/// shape texture creation accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ImageData {
    /// Validates that `pixels` holds exactly `width * height` RGBA texels.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> anyhow::Result<Self> {
        ensure!(width > 0 && height > 0, "image has zero size ({width}x{height})");
        let expected = width as usize * height as usize * 4;
        ensure!(
            pixels.len() == expected,
            "image {width}x{height} needs {expected} bytes, got {}",
            pixels.len()
        );
        Ok(Self { width, height, pixels })
    }

    /// A single-color image, handy as a placeholder or a "white" texture.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self { width, height, pixels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_size_is_validated() {
        assert!(ImageData::new(2, 2, vec![0; 16]).is_ok());
        assert!(ImageData::new(2, 2, vec![0; 15]).is_err());
        assert!(ImageData::new(0, 2, Vec::new()).is_err());
    }

    #[test]
    fn solid_fills_every_texel() {
        let img = ImageData::solid(3, 2, [1, 2, 3, 4]);
        assert_eq!(img.pixels.len(), 24);
        assert_eq!(&img.pixels[20..24], &[1, 2, 3, 4]);
    }
}
