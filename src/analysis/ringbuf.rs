//! Fixed-capacity ring buffer
//!
//! Backs the analyzer's rolling signal windows and the console waveform
//! history. The zero-initialized backing array is deliberately reachable via
//! [`CircularBuffer::raw`]: window statistics are taken over the full array,
//! cold start included.

/// Ring buffer of fixed capacity with an oldest-to-newest view
#[derive(Debug, Clone)]
pub struct CircularBuffer<T> {
    arr: Vec<T>,
    idx: usize,
    full: bool,
}

impl<T: Clone + Default> CircularBuffer<T> {
    /// Create a buffer holding `capacity` elements, default-initialized
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be nonzero");
        Self {
            arr: vec![T::default(); capacity],
            idx: 0,
            full: false,
        }
    }

    /// Overwrite the oldest slot with `v`
    pub fn append(&mut self, v: T) {
        self.arr[self.idx] = v;
        let next = self.idx + 1;
        if !self.full && next == self.arr.len() {
            self.full = true;
        }
        self.idx = next % self.arr.len();
    }

    /// True once every slot has been written at least once
    pub fn full(&self) -> bool {
        self.full
    }

    pub fn capacity(&self) -> usize {
        self.arr.len()
    }

    /// Number of values written, saturating at capacity
    pub fn len(&self) -> usize {
        if self.full { self.arr.len() } else { self.idx }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position the next append will write
    pub fn write_index(&self) -> usize {
        self.idx
    }

    /// The backing array in storage order, unwritten slots included
    pub fn raw(&self) -> &[T] {
        &self.arr
    }

    /// Written values, oldest to newest
    pub fn ordered(&self) -> Vec<T> {
        if self.full {
            let mut out = Vec::with_capacity(self.arr.len());
            out.extend_from_slice(&self.arr[self.idx..]);
            out.extend_from_slice(&self.arr[..self.idx]);
            out
        } else {
            self.arr[..self.idx].to_vec()
        }
    }
}
