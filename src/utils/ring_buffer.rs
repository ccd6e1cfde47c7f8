/// Fixed-capacity circular buffer. Pushing into a full buffer overwrites the
/// oldest element; memory never grows past `capacity` slots.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<Option<T>>,
    /// Index of the slot the next push writes to.
    head: usize,
    len: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends `value`, returning the evicted element when the buffer was full.
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = self.slots[self.head].replace(value);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        evicted
    }

    pub fn latest(&self) -> Option<&T> {
        self.iter_newest().next()
    }

    /// Iterates from the most recently pushed element to the oldest.
    pub fn iter_newest(&self) -> impl Iterator<Item = &T> + '_ {
        let capacity = self.capacity();
        (1..=self.len).filter_map(move |offset| {
            let idx = (self.head + capacity - offset) % capacity;
            self.slots[idx].as_ref()
        })
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Snapshot of the buffer, newest first.
    pub fn to_vec_newest(&self) -> Vec<T> {
        self.iter_newest().cloned().collect()
    }
}
