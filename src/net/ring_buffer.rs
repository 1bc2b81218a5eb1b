//! Bounded circular byte store. Two monotonically increasing cursors;
//! readable count = written - read; all indexing is modulo the fixed
//! capacity. Never resized after construction.

pub struct RingBuffer {
    data: Box<[u8]>,
    read: usize,
    written: usize,
}

impl RingBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0);
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            read: 0,
            written: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Bytes buffered and not yet consumed.
    pub fn readable(&self) -> usize {
        self.written - self.read
    }

    pub fn writable(&self) -> usize {
        self.capacity() - self.readable()
    }

    pub fn pop_front(&mut self) -> Option<u8> {
        if self.readable() == 0 {
            return None;
        }
        let byte = self.data[self.read % self.capacity()];
        self.read += 1;
        Some(byte)
    }

    /// Largest contiguous writable slice starting at the write cursor; may
    /// be shorter than `writable()` when the free space wraps around.
    pub fn write_region(&mut self) -> &mut [u8] {
        let capacity = self.capacity();
        let start = self.written % capacity;
        let contiguous = (capacity - start).min(self.writable());
        &mut self.data[start..start + contiguous]
    }

    /// Marks `n` bytes of the write region as filled.
    pub fn commit(&mut self, n: usize) {
        debug_assert!(n <= self.writable());
        self.written += n;
    }
}
