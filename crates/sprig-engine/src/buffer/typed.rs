use bytemuck::Pod;

const MIN_CAPACITY: usize = 16;

/// Resizable element stream with doubling growth.
///
/// Invariant: `len() <= capacity()`. Writers call [`reserve`](Self::reserve)
/// before pushing; `push` past the reserved capacity is a caller bug
/// (debug-asserted, and still memory-safe in release because the backing
/// `Vec` grows on its own).
#[derive(Debug, Clone)]
pub struct GrowableBuffer<T: Pod> {
    data: Vec<T>,
    capacity: usize,
}

impl<T: Pod> GrowableBuffer<T> {
    pub fn new() -> Self {
        Self::with_capacity(MIN_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Ensures room for `additional` more elements, doubling the capacity until
    /// it suffices. Existing elements keep their values and indices.
    ///
    /// Returns `true` when the capacity changed.
    pub fn reserve(&mut self, additional: usize) -> bool {
        let needed = self.data.len() + additional;
        if needed <= self.capacity {
            return false;
        }
        let mut capacity = self.capacity;
        while capacity < needed {
            capacity *= 2;
        }
        self.data.reserve_exact(capacity - self.data.len());
        log::trace!("growable buffer: {} -> {} elements", self.capacity, capacity);
        self.capacity = capacity;
        true
    }

    #[inline]
    pub fn push(&mut self, value: T) {
        debug_assert!(self.data.len() < self.capacity, "push without reserve");
        self.data.push(value);
    }

    #[inline]
    pub fn extend_from_slice(&mut self, values: &[T]) {
        debug_assert!(self.data.len() + values.len() <= self.capacity, "extend without reserve");
        self.data.extend_from_slice(values);
    }

    /// Drops the last `n` elements (clamped to the current length).
    #[inline]
    pub fn pop(&mut self, n: usize) {
        let len = self.data.len().saturating_sub(n);
        self.data.truncate(len);
    }

    /// Empties the buffer without releasing capacity.
    #[inline]
    pub fn clear(&mut self) {
        self.data.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Used elements as raw bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    #[inline]
    pub fn element_size() -> usize {
        std::mem::size_of::<T>()
    }
}

impl<T: Pod> Default for GrowableBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}
