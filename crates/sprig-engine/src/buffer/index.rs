use anyhow::{ensure, Result};

use crate::device::{BufferTarget, GpuDevice, IndexType};

use super::GpuBuffer;

/// Highest quad count whose vertices are addressable with 16-bit indices.
pub const MAX_U16_QUADS: usize = (u16::MAX as usize + 1) / 4;

/// Indices per quad: two triangles.
pub const INDICES_PER_QUAD: usize = 6;

/// Precomputed index buffer for quad batches.
///
/// Quad `q` uses vertices `4q..4q+4` (top-left, top-right, bottom-right,
/// bottom-left) and indices `[0, 1, 2, 0, 2, 3]` offset by `4q`. Built and
/// uploaded once, then shared by every sprite batch.
#[derive(Debug)]
pub struct QuadIndexBuffer {
    buffer: GpuBuffer<u16>,
    max_quads: usize,
}

impl QuadIndexBuffer {
    pub fn new(device: &mut dyn GpuDevice, max_quads: usize) -> Result<Self> {
        ensure!(
            (1..=MAX_U16_QUADS).contains(&max_quads),
            "quad capacity must be in 1..={MAX_U16_QUADS}, got {max_quads}"
        );
        let mut buffer = GpuBuffer::new(device, BufferTarget::Index, max_quads * INDICES_PER_QUAD)?;
        buffer.reserve(max_quads * INDICES_PER_QUAD);
        for q in 0..max_quads {
            let base = (q * 4) as u16;
            buffer.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        buffer.upload_if_dirty(device);
        log::debug!("quad index buffer: {max_quads} quads");
        Ok(Self { buffer, max_quads })
    }

    #[inline]
    pub fn max_quads(&self) -> usize {
        self.max_quads
    }

    #[inline]
    pub fn index_type(&self) -> IndexType {
        IndexType::U16
    }

    #[inline]
    pub fn indices(&self) -> &[u16] {
        self.buffer.as_slice()
    }

    #[inline]
    pub fn bind(&self, device: &mut dyn GpuDevice) {
        self.buffer.bind(device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessDevice;

    #[test]
    fn indices_follow_quad_pattern() {
        let mut dev = HeadlessDevice::new(4);
        let ib = QuadIndexBuffer::new(&mut dev, 3).unwrap();
        assert_eq!(
            ib.indices(),
            &[0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7, 8, 9, 10, 8, 10, 11]
        );
    }

    #[test]
    fn capacity_bounded_by_u16_range() {
        let mut dev = HeadlessDevice::new(4);
        assert!(QuadIndexBuffer::new(&mut dev, MAX_U16_QUADS).is_ok());
        assert!(QuadIndexBuffer::new(&mut dev, MAX_U16_QUADS + 1).is_err());
        assert!(QuadIndexBuffer::new(&mut dev, 0).is_err());
    }

    #[test]
    fn uploaded_once_at_construction() {
        let mut dev = HeadlessDevice::new(4);
        let ib = QuadIndexBuffer::new(&mut dev, 2).unwrap();
        let bytes = dev.buffer_contents(ib.buffer.id()).unwrap();
        assert_eq!(bytes.len(), 2 * INDICES_PER_QUAD * 2);
    }
}
