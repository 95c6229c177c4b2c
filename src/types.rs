use std::sync::Arc;

use bytes::Bytes;

/// A complete entry: one value per slot, `arity` slots.
pub type Tuple<V> = Vec<V>;

/// An entry under assembly. `None` slots have not been supplied yet.
pub type IncompleteTuple<V> = Vec<Option<V>>;

/// Byte-size accounting for staged values.
///
/// The memory limit of a staging map is measured in whatever this returns,
/// summed over every value held (complete and incomplete tuples alike).
/// The map never inspects values beyond this.
pub trait ByteSize {
    /// Number of payload bytes this value accounts for.
    fn byte_size(&self) -> usize;
}

impl<T: Copy> ByteSize for [T] {
    fn byte_size(&self) -> usize {
        size_of_val(self)
    }
}

impl<T: Copy> ByteSize for Vec<T> {
    fn byte_size(&self) -> usize {
        self.as_slice().byte_size()
    }
}

impl ByteSize for str {
    fn byte_size(&self) -> usize {
        self.len()
    }
}

impl ByteSize for String {
    fn byte_size(&self) -> usize {
        self.len()
    }
}

impl ByteSize for Bytes {
    fn byte_size(&self) -> usize {
        self.len()
    }
}

impl<T: ByteSize + ?Sized> ByteSize for &T {
    fn byte_size(&self) -> usize {
        (**self).byte_size()
    }
}

impl<T: ByteSize + ?Sized> ByteSize for Box<T> {
    fn byte_size(&self) -> usize {
        (**self).byte_size()
    }
}

// Shared payloads are charged in full to every map that holds them.
impl<T: ByteSize + ?Sized> ByteSize for Arc<T> {
    fn byte_size(&self) -> usize {
        (**self).byte_size()
    }
}

/// Total bytes of a sequence of values.
pub fn tuple_bytes<'a, V, I>(values: I) -> usize
where
    V: ByteSize + 'a,
    I: IntoIterator<Item = &'a V>,
{
    values.into_iter().map(ByteSize::byte_size).sum()
}
