use anyhow::{Context, Result};
use bytemuck::Pod;

use crate::device::{BufferId, BufferTarget, GpuDevice};

use super::GrowableBuffer;

/// What [`GpuBuffer::upload_if_dirty`] did.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Upload {
    /// Nothing pushed since the last upload.
    Skipped,
    /// Device storage was reallocated to the full capacity.
    Full { bytes: usize },
    /// Only the used prefix was written into existing storage.
    Partial { bytes: usize },
}

/// [`GrowableBuffer`] mirrored into one device buffer.
///
/// Upload policy:
/// - capacity grew past the device-side size → reallocate device storage to
///   exactly the current capacity and write the used elements
/// - otherwise → write only `[0, len)` into the existing storage
#[derive(Debug)]
pub struct GpuBuffer<T: Pod> {
    cpu: GrowableBuffer<T>,
    id: BufferId,
    target: BufferTarget,
    dirty: bool,
    /// Capacity (in elements) of the device-side storage; 0 before first upload.
    device_capacity: usize,
}

impl<T: Pod> GpuBuffer<T> {
    pub fn new(device: &mut dyn GpuDevice, target: BufferTarget, capacity: usize) -> Result<Self> {
        let id = device
            .create_buffer()
            .with_context(|| format!("failed to create {target:?} buffer"))?;
        Ok(Self {
            cpu: GrowableBuffer::with_capacity(capacity),
            id,
            target,
            dirty: false,
            device_capacity: 0,
        })
    }

    #[inline]
    pub fn id(&self) -> BufferId {
        self.id
    }

    #[inline]
    pub fn reserve(&mut self, additional: usize) -> bool {
        self.cpu.reserve(additional)
    }

    #[inline]
    pub fn push(&mut self, value: T) {
        self.cpu.push(value);
        self.dirty = true;
    }

    #[inline]
    pub fn extend_from_slice(&mut self, values: &[T]) {
        self.cpu.extend_from_slice(values);
        self.dirty = true;
    }

    #[inline]
    pub fn pop(&mut self, n: usize) {
        self.cpu.pop(n);
        self.dirty = true;
    }

    #[inline]
    pub fn clear(&mut self) {
        self.cpu.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cpu.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cpu.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.cpu.capacity()
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.cpu.as_slice()
    }

    /// Binds the device buffer to its target.
    #[inline]
    pub fn bind(&self, device: &mut dyn GpuDevice) {
        device.bind_buffer(self.target, self.id);
    }

    /// Binds and uploads pending elements according to the upload policy.
    pub fn upload_if_dirty(&mut self, device: &mut dyn GpuDevice) -> Upload {
        if !self.dirty {
            return Upload::Skipped;
        }
        self.bind(device);

        let elem = GrowableBuffer::<T>::element_size();
        let used = self.cpu.as_bytes();
        let upload = if self.cpu.capacity() > self.device_capacity {
            let size = self.cpu.capacity() * elem;
            device.buffer_data(self.target, size, used);
            self.device_capacity = self.cpu.capacity();
            Upload::Full { bytes: size }
        } else {
            device.buffer_sub_data(self.target, 0, used);
            Upload::Partial { bytes: used.len() }
        };

        self.dirty = false;
        upload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceCall, HeadlessDevice};

    fn push_n(buf: &mut GpuBuffer<f32>, n: usize) {
        buf.reserve(n);
        for i in 0..n {
            buf.push(i as f32);
        }
    }

    #[test]
    fn clean_buffer_skips_upload() {
        let mut dev = HeadlessDevice::new(4);
        let mut buf = GpuBuffer::<f32>::new(&mut dev, BufferTarget::Vertex, 8).unwrap();
        assert_eq!(buf.upload_if_dirty(&mut dev), Upload::Skipped);
    }

    #[test]
    fn first_upload_allocates_full_capacity() {
        let mut dev = HeadlessDevice::new(4);
        let mut buf = GpuBuffer::<f32>::new(&mut dev, BufferTarget::Vertex, 8).unwrap();
        push_n(&mut buf, 3);
        assert_eq!(buf.upload_if_dirty(&mut dev), Upload::Full { bytes: 32 });
        assert!(!buf.is_dirty());
        assert_eq!(dev.buffer_contents(buf.id()).unwrap().len(), 32);
    }

    #[test]
    fn refill_within_capacity_is_partial() {
        let mut dev = HeadlessDevice::new(4);
        let mut buf = GpuBuffer::<f32>::new(&mut dev, BufferTarget::Vertex, 8).unwrap();
        push_n(&mut buf, 8);
        buf.upload_if_dirty(&mut dev);

        buf.clear();
        push_n(&mut buf, 2);
        assert_eq!(buf.upload_if_dirty(&mut dev), Upload::Partial { bytes: 8 });
        assert!(matches!(
            dev.calls().last(),
            Some(DeviceCall::BufferSubData { offset: 0, written: 8, .. })
        ));
    }

    #[test]
    fn growth_past_device_size_reallocates() {
        let mut dev = HeadlessDevice::new(4);
        let mut buf = GpuBuffer::<f32>::new(&mut dev, BufferTarget::Vertex, 4).unwrap();
        push_n(&mut buf, 4);
        buf.upload_if_dirty(&mut dev);
        push_n(&mut buf, 1);
        assert_eq!(buf.upload_if_dirty(&mut dev), Upload::Full { bytes: 32 });
        let contents = dev.buffer_contents(buf.id()).unwrap();
        let floats: Vec<f32> = contents[..20]
            .chunks_exact(4)
            .map(bytemuck::pod_read_unaligned)
            .collect();
        assert_eq!(floats, [0.0, 1.0, 2.0, 3.0, 0.0]);
    }
}
