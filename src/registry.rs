//! Named, shared staging maps.
//!
//! Producers and consumers that never see each other find the same
//! [`StagingMap`] by `(container, name)`. The first caller creates it,
//! everyone after that gets a clone of the same `Arc`. A map lives until it
//! is removed from the registry and the last handle is dropped.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::layout::{Layout, Unordered};
use crate::options::Options;
use crate::staging::StagingMap;
use crate::types::ByteSize;

/// Container used when the caller passes an empty container name.
pub const DEFAULT_CONTAINER: &str = "localhost";

type Handle<K, V, L> = Arc<StagingMap<K, V, L>>;

pub struct Registry<K, V, L = Unordered>
where
    L: Layout<K>,
{
    maps: Mutex<HashMap<(String, String), Handle<K, V, L>>>,
}

impl<K, V, L> Registry<K, V, L>
where
    K: fmt::Debug,
    V: ByteSize,
    L: Layout<K>,
{
    pub fn new() -> Self {
        Registry {
            maps: Mutex::new(HashMap::new()),
        }
    }

    /// Return the map registered under `(container, name)`, creating it with
    /// `create` if there is none.
    ///
    /// The registry lock is held across `create`, so concurrent callers for
    /// the same name observe exactly one instance. If `create` fails nothing
    /// is registered and its error is returned.
    pub fn lookup_or_create<F>(
        &self,
        container: &str,
        name: &str,
        create: F,
    ) -> Result<Handle<K, V, L>>
    where
        F: FnOnce() -> Result<StagingMap<K, V, L>>,
    {
        let key = resource_key(container, name);
        let mut maps = self.maps.lock();

        if let Some(map) = maps.get(&key) {
            return Ok(Arc::clone(map));
        }

        let map = Arc::new(create()?);
        debug!(container = %key.0, name = %key.1, "registered staging map");
        maps.insert(key, Arc::clone(&map));
        Ok(map)
    }

    /// [`lookup_or_create`](Self::lookup_or_create) with a map built from
    /// `arity` and `options`.
    pub fn lookup_or_create_with(
        &self,
        container: &str,
        name: &str,
        arity: usize,
        options: Options,
    ) -> Handle<K, V, L> {
        let mut maps = self.maps.lock();
        let key = resource_key(container, name);
        let map = maps.entry(key).or_insert_with_key(|(container, name)| {
            debug!(%container, %name, arity, "registered staging map");
            Arc::new(StagingMap::with_options(arity, options))
        });
        Arc::clone(map)
    }

    pub fn lookup(&self, container: &str, name: &str) -> Option<Handle<K, V, L>> {
        self.maps.lock().get(&resource_key(container, name)).cloned()
    }

    /// Unregister a map. Existing handles keep working.
    pub fn remove(&self, container: &str, name: &str) -> Option<Handle<K, V, L>> {
        let removed = self.maps.lock().remove(&resource_key(container, name));
        if removed.is_some() {
            debug!(container, name, "unregistered staging map");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.maps.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.lock().is_empty()
    }
}

impl<K, V, L> Default for Registry<K, V, L>
where
    K: fmt::Debug,
    V: ByteSize,
    L: Layout<K>,
{
    fn default() -> Self {
        Self::new()
    }
}

fn resource_key(container: &str, name: &str) -> (String, String) {
    let container = if container.is_empty() {
        DEFAULT_CONTAINER
    } else {
        container
    };
    (container.to_string(), name.to_string())
}
