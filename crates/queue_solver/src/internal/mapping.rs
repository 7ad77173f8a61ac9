use crate::internal::arena::ArenaId;
use std::cmp;
use std::marker::PhantomData;

const VALUES_PER_CHUNK: usize = 128;

/// A `Mapping<TId, TValue>` holds a collection of `TValue`s that can be addressed by `TId`s. You
/// can think of it as a `HashMap<TId, TValue>`, optimized for the case in which the ids are
/// contiguous, which is the case for ids handed out by an arena.
#[derive(Clone)]
pub(crate) struct Mapping<TId, TValue> {
    chunks: Vec<[Option<TValue>; VALUES_PER_CHUNK]>,
    len: usize,
    _phantom: PhantomData<TId>,
}

impl<TId: ArenaId, TValue> Default for Mapping<TId, TValue> {
    fn default() -> Self {
        Self::new()
    }
}

impl<TId: ArenaId, TValue> Mapping<TId, TValue> {
    pub(crate) fn new() -> Self {
        Self::with_capacity(1)
    }

    /// Constructs a new mapping with slots for `n` values pre-allocated.
    pub(crate) fn with_capacity(n: usize) -> Self {
        let n = cmp::max(1, n);
        let n_chunks = (n - 1) / VALUES_PER_CHUNK + 1;
        let mut chunks = Vec::new();
        chunks.resize_with(n_chunks, || std::array::from_fn(|_| None));
        Self {
            chunks,
            len: 0,
            _phantom: PhantomData,
        }
    }

    const fn chunk_and_offset(id: usize) -> (usize, usize) {
        (id / VALUES_PER_CHUNK, id % VALUES_PER_CHUNK)
    }

    /// Insert a value for the given id, replacing any previous value.
    pub(crate) fn insert(&mut self, id: TId, value: TValue) {
        let index = id.to_usize();
        let (chunk, offset) = Self::chunk_and_offset(index);
        if chunk >= self.chunks.len() {
            self.chunks
                .resize_with(chunk + 1, || std::array::from_fn(|_| None));
        }
        if self.chunks[chunk][offset].replace(value).is_none() {
            self.len += 1;
        }
    }

    /// Get the value associated with the id, if any.
    pub(crate) fn get(&self, id: TId) -> Option<&TValue> {
        let (chunk, offset) = Self::chunk_and_offset(id.to_usize());
        self.chunks.get(chunk)?[offset].as_ref()
    }

    /// Get a mutable reference to the value associated with the id, if any.
    pub(crate) fn get_mut(&mut self, id: TId) -> Option<&mut TValue> {
        let (chunk, offset) = Self::chunk_and_offset(id.to_usize());
        self.chunks.get_mut(chunk)?[offset].as_mut()
    }

    /// Returns the number of mapped items
    pub(crate) fn len(&self) -> usize {
        self.len
    }
}
