/// Bounds applied to a staging map.
///
/// Both bounds default to 0, which means unbounded. When both are set,
/// a complete put waits until it satisfies both at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    /// Maximum number of complete entries. 0 = unbounded.
    pub capacity: usize,
    /// Maximum aggregate bytes across complete and incomplete tuples.
    /// 0 = unbounded.
    pub memory_limit: usize,
}

impl Options {
    /// Unbounded options.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_memory_limit(mut self, memory_limit: usize) -> Self {
        self.memory_limit = memory_limit;
        self
    }

    pub fn has_capacity(&self) -> bool {
        self.capacity > 0
    }

    pub fn has_memory_limit(&self) -> bool {
        self.memory_limit > 0
    }

    /// True if producers can ever block on a complete put.
    pub fn is_bounded(&self) -> bool {
        self.has_capacity() || self.has_memory_limit()
    }
}
