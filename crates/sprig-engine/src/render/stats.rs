/// Per-frame counters, reset by `start_render`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Device draw calls of any kind, mask passes included.
    pub draw_calls: u32,
    /// Batches flushed by the sprite and graphic regions.
    pub flushes: u32,
    /// Indices consumed by indexed (sprite) draws.
    pub indices: u32,
    /// Vertices uploaded for drawing.
    pub vertices: u32,
    /// Sprites accepted by the sprite region.
    pub sprites: u32,
    /// Shapes drawn by the graphic region.
    pub shapes: u32,
}

impl RenderStats {
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
