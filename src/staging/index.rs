use crate::error::{Error, Result};
use crate::types::{IncompleteTuple, Tuple};

/// Check that `indices` is strictly decreasing.
///
/// Call sites hand slot indices over highest-first, so `[2, 1, 0]` and
/// `[3, 1]` are valid while `[1, 2]` and `[2, 2]` are not. An empty or
/// single-element set is trivially ordered.
pub fn check_index_ordering(indices: &[usize]) -> Result<()> {
    match indices.windows(2).find(|pair| pair[0] <= pair[1]) {
        None => Ok(()),
        Some(pair) => Err(Error::invalid(format!(
            "Indices are not strictly decreasing: {} is followed by {}",
            pair[0], pair[1]
        ))),
    }
}

/// Check that every index falls in `[0, arity)`.
pub fn check_bounds(indices: &[usize], arity: usize) -> Result<()> {
    match indices.iter().find(|&&index| index >= arity) {
        None => Ok(()),
        Some(index) => Err(Error::invalid(format!(
            "Index '{index}' was out of bounds '{arity}'"
        ))),
    }
}

/// Check that none of `indices` is already filled in `slots`.
pub fn check_unfilled<V>(indices: &[usize], slots: &IncompleteTuple<V>) -> Result<()> {
    match indices.iter().find(|&&index| slots[index].is_some()) {
        None => Ok(()),
        Some(index) => Err(Error::invalid(format!(
            "The value for index '{index}' was already initialized"
        ))),
    }
}

/// A fresh incomplete tuple with every slot empty.
pub fn empty_slots<V>(arity: usize) -> IncompleteTuple<V> {
    (0..arity).map(|_| None).collect()
}

/// Write `values` into `slots` at the matching positions of `indices`.
/// Bounds and fill state must already be checked.
pub fn fill<V>(slots: &mut IncompleteTuple<V>, indices: &[usize], values: Vec<V>) {
    for (&index, value) in indices.iter().zip(values) {
        slots[index] = Some(value);
    }
}

pub fn is_complete<V>(slots: &IncompleteTuple<V>) -> bool {
    slots.iter().all(Option::is_some)
}

/// Collapse a fully populated incomplete tuple.
pub fn into_tuple<V>(slots: IncompleteTuple<V>) -> Tuple<V> {
    debug_assert!(is_complete(&slots));
    slots.into_iter().flatten().collect()
}
