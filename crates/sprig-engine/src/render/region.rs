use crate::coords::Vec2;
use crate::device::GpuDevice;
use crate::logging::WarnOnce;
use crate::shader::CustomShader;

use super::RenderStats;

/// Renderer state a region needs while drawing.
///
/// Built from disjoint borrows of the renderer, so a region can flush while
/// the renderer still owns everything.
pub struct FlushContext<'a> {
    pub device: &'a mut dyn GpuDevice,
    /// Drawable size in pixels, uploaded as `uResolution`.
    pub resolution: Vec2,
    pub warnings: &'a mut WarnOnce,
    pub stats: &'a mut RenderStats,
}

/// Batching accumulator for one primitive family.
///
/// Lifecycle: `enter` (bind a shader, reset accumulation), any number of
/// appends, `render` (upload and draw what accumulated, if anything), `exit`.
/// A region may `render` on its own in between when it runs out of capacity.
pub trait Region {
    /// Activates the region with `shader`, or its built-in program for `None`.
    fn enter(&mut self, ctx: &mut FlushContext<'_>, shader: Option<&CustomShader>);

    /// Flushes accumulated geometry. No-op when nothing is pending.
    fn render(&mut self, ctx: &mut FlushContext<'_>);

    fn exit(&mut self, _ctx: &mut FlushContext<'_>) {}

    fn has_pending_content(&self) -> bool;

    /// Whether drawing with `shader` needs a different program than the active one.
    fn is_shader_changed(&self, shader: Option<&CustomShader>) -> bool;
}

/// Selects the region a primitive goes through.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RegionKind {
    Sprite,
    Graphic,
}
