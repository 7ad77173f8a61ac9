use std::borrow::Borrow;
use std::cell::UnsafeCell;
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};

/// An insert only map where items can only be returned by copying the values. Because no
/// reference into the map ever escapes, inserting through a shared reference is sound.
pub(crate) struct FrozenCopyMap<K, V, S = RandomState> {
    map: UnsafeCell<HashMap<K, V, S>>,
}

impl<K: Eq + Hash, V: Copy, S: BuildHasher> FrozenCopyMap<K, V, S> {
    pub(crate) fn insert_copy(&self, k: K, v: V) -> Option<V> {
        // SAFE: no reference into the map is handed out, see `get_copy`
        unsafe {
            let map = self.map.get();
            (*map).insert(k, v)
        }
    }

    pub(crate) fn get_copy<Q>(&self, k: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        // SAFE: the value is copied out before the borrow of the map ends
        unsafe {
            let map = self.map.get();
            (*map).get(k).copied()
        }
    }
}

impl<K, V, S: Default> Default for FrozenCopyMap<K, V, S> {
    fn default() -> Self {
        Self {
            map: UnsafeCell::new(HashMap::with_hasher(S::default())),
        }
    }
}
