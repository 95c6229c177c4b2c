pub mod index;

use std::fmt;
use std::marker::PhantomData;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::layout::{EntryMap, Layout, Unordered};
use crate::options::Options;
use crate::types::{tuple_bytes, ByteSize, IncompleteTuple, Tuple};

/// Point-in-time view of a staging map's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Complete entries visible to consumers.
    pub size: usize,
    /// Keys still being assembled from partial puts.
    pub incomplete_size: usize,
    /// Bytes held across complete and incomplete tuples.
    pub current_bytes: usize,
    pub capacity: usize,
    pub memory_limit: usize,
}

struct State<K, V, L: Layout<K>> {
    map: L::Map<Tuple<V>>,
    incomplete: L::Map<IncompleteTuple<V>>,
    current_bytes: usize,
    // Parked consumers, split by predicate: waiting on one key vs any key.
    keyed_waiters: usize,
    any_waiters: usize,
    _marker: PhantomData<fn() -> (K, V, L)>,
}

/// A bounded, blocking map from keys to fixed-arity tuples.
///
/// Producers `put` tuples, either whole or a few slots at a time. A key
/// assembled from partial puts stays invisible until its last slot is
/// filled. Consumers block in `get` / `pop` until their key shows up, or in
/// `popitem` until anything shows up.
///
/// Two independent bounds throttle producers:
///   - `capacity`: max complete entries (0 = unbounded)
///   - `memory_limit`: max bytes across every tuple held, complete or not
///     (0 = unbounded)
///
/// Per-key lifecycle:
/// ```text
///   absent ──partial put──► incomplete ──last slot──► complete ──get/pop/popitem──► absent
///     └────────────────────────full put──────────────────┘
/// ```
///
/// One mutex guards all state. Blocking calls wait on a condvar and
/// re-check their predicate every time they wake. There is no timeout or
/// cancellation: a wait that can never be satisfied blocks forever.
pub struct StagingMap<K, V, L = Unordered>
where
    L: Layout<K>,
{
    arity: usize,
    options: Options,
    state: Mutex<State<K, V, L>>,
    // Consumers: "key present" / "map non-empty".
    not_empty: Condvar,
    // Producers: capacity and/or memory headroom.
    not_full: Condvar,
}

impl<K, V, L> StagingMap<K, V, L>
where
    K: fmt::Debug,
    V: ByteSize,
    L: Layout<K>,
{
    /// Create a map whose tuples have `arity` slots.
    ///
    /// `capacity` bounds complete entries, `memory_limit` bounds bytes;
    /// 0 disables either bound.
    pub fn new(arity: usize, capacity: usize, memory_limit: usize) -> Self {
        let options = Options::new()
            .with_capacity(capacity)
            .with_memory_limit(memory_limit);
        Self::with_options(arity, options)
    }

    pub fn with_options(arity: usize, options: Options) -> Self {
        debug!(
            arity,
            capacity = options.capacity,
            memory_limit = options.memory_limit,
            layout = L::NAME,
            "staging map created"
        );
        StagingMap {
            arity,
            options,
            state: Mutex::new(State {
                map: Default::default(),
                incomplete: Default::default(),
                current_bytes: 0,
                keyed_waiters: 0,
                any_waiters: 0,
                _marker: PhantomData,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Stage `values` under `key` at slot positions `indices`.
    ///
    /// `indices` must be strictly decreasing (highest slot first) and pair
    /// up one-to-one with `values`. Supplying all `arity` slots makes a
    /// complete put; anything less is a partial put that is merged into the
    /// key's incomplete tuple, and the tuple becomes visible once every slot
    /// is filled.
    ///
    /// Blocks while the map is at capacity (complete puts only) or while
    /// the bytes would not fit under the memory limit. Unbounded maps never
    /// block here.
    ///
    /// # Errors
    /// - `InvalidArgument`: index/value count mismatch, indices not strictly
    ///   decreasing, index out of range, slot already filled, empty partial
    ///   put, or the key is already staged.
    /// - `ResourceExhausted`: the values alone exceed the memory limit.
    ///
    /// On error the map is left untouched.
    pub fn put(&self, key: K, indices: &[usize], values: Vec<V>) -> Result<()> {
        if indices.len() != values.len() {
            return Err(Error::invalid(format!(
                "Mismatch between {} indices and {} values for key {key:?}",
                indices.len(),
                values.len()
            )));
        }
        index::check_index_ordering(indices)?;
        index::check_bounds(indices, self.arity)?;

        let bytes = tuple_bytes(&values);
        self.check_memory_limit(bytes)?;

        if indices.len() == self.arity {
            self.put_complete(key, indices, values, bytes)
        } else {
            self.put_incomplete(key, indices, values, bytes)
        }
    }

    /// Block until `key` is complete, then remove and return its tuple.
    ///
    /// **This is an evicting read.** The entry is gone afterwards exactly as
    /// with [`pop`](Self::pop); there is no non-destructive peek.
    pub fn get(&self, key: &K) -> Tuple<V> {
        self.take(key, "get")
    }

    /// Block until `key` is complete, then remove and return its tuple.
    pub fn pop(&self, key: &K) -> Tuple<V> {
        self.take(key, "pop")
    }

    /// Block until any key is complete, then remove and return it.
    ///
    /// The ordered layout hands out the lowest key; the unordered layout
    /// whichever key its table yields first.
    pub fn popitem(&self) -> (K, Tuple<V>) {
        let mut state = self.state.lock();

        if state.map.is_empty() {
            trace!("popitem waiting for any entry");
            state.any_waiters += 1;
            while state.map.is_empty() {
                self.not_empty.wait(&mut state);
            }
            state.any_waiters -= 1;
        }

        let Some((key, tuple)) = state.map.pop_first() else {
            unreachable!("map is non-empty after wait");
        };
        self.release(&mut state, &tuple);
        trace!(?key, current_bytes = state.current_bytes, "popitem");
        (key, tuple)
    }

    /// Drop every complete and incomplete entry and reset the byte count.
    /// Every blocked producer is woken.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        let dropped = state.map.len();
        let dropped_incomplete = state.incomplete.len();

        state.map.clear();
        state.incomplete.clear();
        state.current_bytes = 0;

        debug!(dropped, dropped_incomplete, "staging map cleared");
        if self.options.is_bounded() {
            self.not_full.notify_all();
        }
    }

    /// Number of complete entries.
    pub fn size(&self) -> usize {
        self.state.lock().map.len()
    }

    /// Number of keys with an incomplete tuple.
    pub fn incomplete_size(&self) -> usize {
        self.state.lock().incomplete.len()
    }

    /// Bytes currently held, complete and incomplete tuples together.
    pub fn current_bytes(&self) -> usize {
        self.state.lock().current_bytes
    }

    pub fn stats(&self) -> Stats {
        let state = self.state.lock();
        Stats {
            size: state.map.len(),
            incomplete_size: state.incomplete.len(),
            current_bytes: state.current_bytes,
            capacity: self.options.capacity,
            memory_limit: self.options.memory_limit,
        }
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn capacity(&self) -> usize {
        self.options.capacity
    }

    pub fn memory_limit(&self) -> usize {
        self.options.memory_limit
    }

    pub fn options(&self) -> Options {
        self.options
    }

    fn check_memory_limit(&self, bytes: usize) -> Result<()> {
        if self.options.has_memory_limit() && bytes > self.options.memory_limit {
            warn!(
                bytes,
                memory_limit = self.options.memory_limit,
                "tuple larger than memory limit rejected"
            );
            return Err(Error::ResourceExhausted {
                bytes,
                limit: self.options.memory_limit,
            });
        }
        Ok(())
    }

    fn would_exceed_memory_limit(&self, state: &State<K, V, L>, bytes: usize) -> bool {
        self.options.has_memory_limit()
            && bytes + state.current_bytes > self.options.memory_limit
    }

    fn is_capacity_full(&self, state: &State<K, V, L>) -> bool {
        self.options.has_capacity() && state.map.len() >= self.options.capacity
    }

    // Wait predicate for a complete put: both bounds at once.
    fn has_room(&self, state: &State<K, V, L>, bytes: usize) -> bool {
        !self.is_capacity_full(state) && !self.would_exceed_memory_limit(state, bytes)
    }

    fn key_staged(state: &State<K, V, L>, key: &K) -> bool {
        state.map.contains_key(key) || state.incomplete.contains_key(key)
    }

    fn put_complete(&self, key: K, indices: &[usize], values: Vec<V>, bytes: usize) -> Result<()> {
        let mut state = self.state.lock();

        if self.options.is_bounded() && !self.has_room(&state, bytes) {
            trace!(?key, bytes, "put waiting for room");
            while !self.has_room(&state, bytes) {
                self.not_full.wait(&mut state);
            }
        }

        if Self::key_staged(&state, &key) {
            self.pass_on_wakeup();
            return Err(Error::invalid(format!("Key {key:?} is already staged")));
        }

        let mut slots = index::empty_slots(self.arity);
        index::fill(&mut slots, indices, values);

        state.current_bytes += bytes;
        trace!(?key, bytes, current_bytes = state.current_bytes, "put complete tuple");
        state.map.insert(key, index::into_tuple(slots));
        self.notify_removers(&state);
        Ok(())
    }

    fn put_incomplete(
        &self,
        key: K,
        indices: &[usize],
        values: Vec<V>,
        bytes: usize,
    ) -> Result<()> {
        if indices.is_empty() {
            return Err(Error::invalid(format!(
                "Partial put for key {key:?} supplied no indices"
            )));
        }

        let mut guard = self.state.lock();

        if self.would_exceed_memory_limit(&guard, bytes) {
            trace!(?key, bytes, "partial put waiting for memory");
            while self.would_exceed_memory_limit(&guard, bytes) {
                self.not_full.wait(&mut guard);
            }
        }

        let state = &mut *guard;
        if state.map.contains_key(&key) {
            self.pass_on_wakeup();
            return Err(Error::invalid(format!("Key {key:?} is already complete")));
        }

        let Some(present) = state.incomplete.get_mut(&key) else {
            let mut slots = index::empty_slots(self.arity);
            index::fill(&mut slots, indices, values);
            state.current_bytes += bytes;
            trace!(?key, ?indices, bytes, "partial put started tuple");
            state.incomplete.insert(key, slots);
            return Ok(());
        };

        if let Err(e) = index::check_unfilled(indices, present) {
            self.pass_on_wakeup();
            return Err(e);
        }
        index::fill(present, indices, values);
        let complete = index::is_complete(present);
        state.current_bytes += bytes;
        trace!(?key, ?indices, bytes, complete, "partial put filled slots");

        if complete {
            // Bytes were admitted slot by slot; promotion skips the bounds.
            if let Some(slots) = state.incomplete.remove(&key) {
                debug!(?key, "incomplete tuple promoted");
                state.map.insert(key, index::into_tuple(slots));
                self.notify_removers(state);
            }
        }
        Ok(())
    }

    fn take(&self, key: &K, op: &'static str) -> Tuple<V> {
        let mut state = self.state.lock();

        if !state.map.contains_key(key) {
            trace!(?key, op, "waiting for key");
            state.keyed_waiters += 1;
            while !state.map.contains_key(key) {
                self.not_empty.wait(&mut state);
            }
            state.keyed_waiters -= 1;
        }

        let Some(tuple) = state.map.remove(key) else {
            unreachable!("key is present after wait");
        };
        self.release(&mut state, &tuple);
        trace!(?key, op, current_bytes = state.current_bytes, "entry removed");
        tuple
    }

    // Account for a removed tuple and let producers re-check their bounds.
    fn release(&self, state: &mut State<K, V, L>, tuple: &Tuple<V>) {
        let bytes = tuple_bytes(tuple);
        debug_assert!(state.current_bytes >= bytes);
        state.current_bytes = state.current_bytes.saturating_sub(bytes);
        self.notify_inserters_if_bounded();
    }

    // A newly visible entry satisfies at most one popitem waiter, but keyed
    // waiters each watch their own key, so any of them might be the one.
    fn notify_removers(&self, state: &State<K, V, L>) {
        if state.keyed_waiters > 0 {
            self.not_empty.notify_all();
        } else if state.any_waiters > 0 {
            self.not_empty.notify_one();
        }
    }

    // Capacity waiters all share one predicate, so one freed slot wakes one.
    // Memory waiters need different headroom; wake them all to re-check.
    fn notify_inserters_if_bounded(&self) {
        if self.options.has_memory_limit() {
            self.not_full.notify_all();
        } else if self.options.has_capacity() {
            self.not_full.notify_one();
        }
    }

    // A producer that was woken but then failed validation hands its
    // wakeup to the next one.
    fn pass_on_wakeup(&self) {
        if self.options.is_bounded() {
            self.not_full.notify_one();
        }
    }
}

impl<K, V, L> fmt::Debug for StagingMap<K, V, L>
where
    L: Layout<K>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("StagingMap")
            .field("layout", &L::NAME)
            .field("arity", &self.arity)
            .field("capacity", &self.options.capacity)
            .field("memory_limit", &self.options.memory_limit)
            .field("size", &state.map.len())
            .field("incomplete_size", &state.incomplete.len())
            .field("current_bytes", &state.current_bytes)
            .finish()
    }
}
