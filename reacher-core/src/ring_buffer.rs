//! Fixed-capacity FIFO buffer.

/// A FIFO buffer holding at most `capacity` items.
///
/// Pushing into a full buffer evicts the oldest item. Storage is allocated
/// once and written in a circular manner.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    capacity: usize,
    /// Index of the next write.
    i: usize,
    size: usize,
    buf: Vec<T>,
}

impl<T> RingBuffer<T> {
    /// Constructs an empty buffer.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity of RingBuffer must be positive");
        Self {
            capacity,
            i: 0,
            size: 0,
            buf: Vec::with_capacity(capacity),
        }
    }

    /// The maximum number of items.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The number of items currently held.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if the buffer holds no item.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Appends an item and returns the evicted one, if any.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.buf.len() < self.capacity {
            self.buf.push(item);
            None
        } else {
            Some(std::mem::replace(&mut self.buf[self.i], item))
        };
        self.i = (self.i + 1) % self.capacity;
        self.size = self.buf.len();
        evicted
    }

    /// The most recently pushed item.
    pub fn last(&self) -> Option<&T> {
        if self.is_empty() {
            None
        } else {
            let ix = (self.i + self.capacity - 1) % self.capacity;
            self.buf.get(ix)
        }
    }

    /// Iterates from the oldest to the newest item.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        let start = if self.size < self.capacity { 0 } else { self.i };
        (0..self.size).map(move |k| &self.buf[(start + k) % self.capacity])
    }

    /// Iterates over at most `n` of the newest items, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &T> {
        let skip = self.size.saturating_sub(n);
        self.iter().skip(skip)
    }
}
