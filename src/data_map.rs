use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

/// Application state shared by every request, one value per type.
#[derive(Clone, Default)]
pub(crate) struct DataMap {
    inner: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl DataMap {
    pub fn new() -> DataMap {
        DataMap::default()
    }

    pub fn insert<T: Send + Sync + 'static>(&mut self, val: T) {
        self.inner.insert(TypeId::of::<T>(), Arc::new(val));
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.inner.get(&TypeId::of::<T>()).and_then(|v| v.downcast_ref::<T>())
    }
}

impl Debug for DataMap {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "DataMap {{ entries: {} }}", self.inner.len())
    }
}

/// The per-request key/value side channel.
///
/// Cloning a `Keys` hands out another reference to the same store, so a task spawned by a
/// handler can keep reading and writing it after the handler returns.
#[derive(Clone, Default)]
pub struct Keys {
    inner: Arc<RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>>,
}

impl Keys {
    pub fn new() -> Keys {
        Keys::default()
    }

    /// Stores `val` under `key`, replacing any previous value.
    pub fn set<K: Into<String>, V: Send + Sync + 'static>(&self, key: K, val: V) {
        self.inner.write().insert(key.into(), Arc::new(val));
    }

    /// Returns a copy of the value under `key` if it exists and has type `V`.
    pub fn get<V: Clone + Send + Sync + 'static>(&self, key: &str) -> Option<V> {
        self.inner.read().get(key).and_then(|v| v.downcast_ref::<V>()).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.read().contains_key(key)
    }

    pub fn remove(&self, key: &str) -> bool {
        self.inner.write().remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl Debug for Keys {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let keys = self.inner.read();
        f.debug_set().entries(keys.keys()).finish()
    }
}
