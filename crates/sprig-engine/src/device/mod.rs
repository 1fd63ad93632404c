//! GPU device capability set.
//!
//! The core never talks to a graphics API directly. Everything it needs
//! (buffers, shader programs, attribute/uniform locations, textures and
//! texture units, viewport/scissor/stencil state, indexed and array draws) is
//! expressed by [`GpuDevice`]. Two backends ship with the crate:
//! - [`GlowDevice`]: WebGL2 in the browser, OpenGL elsewhere, through `glow`
//! - [`HeadlessDevice`]: records every call without a GPU (tests, validation)

mod glow_device;
mod gpu;
mod headless;
mod types;

pub use glow_device::GlowDevice;
pub use gpu::GpuDevice;
pub use headless::{DeviceCall, DrawCall, HeadlessDevice, RecordedUniform};
pub use types::{
    AttribType, BufferId, BufferTarget, DrawMode, ImageData, IndexType, ProgramId, ShaderId,
    ShaderStage, StencilMode, StencilOp, TextureId, UniformData, UniformLocation, VertexAttribute,
};
