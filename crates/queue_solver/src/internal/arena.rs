use std::cell::{Cell, UnsafeCell};
use std::cmp;
use std::marker::PhantomData;
use std::ops::Index;

const CHUNK_SIZE: usize = 128;

/// An `Arena<TId, TValue>` owns a collection of `TValue`s and hands out `TId`s that refer to them.
///
/// Values are stored in fixed size chunks that are never reallocated, so a reference into the
/// arena stays valid while new values are appended through a shared reference. Values can never
/// be removed or modified once allocated, which is what makes the ids cheap, copyable handles
/// that many resolver queues can hold at the same time.
pub(crate) struct Arena<TId: ArenaId, TValue> {
    chunks: UnsafeCell<Vec<Vec<TValue>>>,
    len: Cell<usize>,
    phantom: PhantomData<TId>,
}

impl<TId: ArenaId, TValue> Default for Arena<TId, TValue> {
    fn default() -> Self {
        Self::new()
    }
}

impl<TId: ArenaId, TValue> Arena<TId, TValue> {
    /// Constructs a new, empty arena.
    pub(crate) fn new() -> Self {
        Arena::with_capacity(1)
    }

    /// Constructs a new arena with room for `n` values before a new chunk has to be allocated.
    pub(crate) fn with_capacity(n: usize) -> Self {
        let n = cmp::max(1, n);
        let n_chunks = n.div_ceil(CHUNK_SIZE);
        let mut chunks = Vec::new();
        chunks.resize_with(n_chunks, || Vec::with_capacity(CHUNK_SIZE));
        Self {
            chunks: UnsafeCell::from(chunks),
            len: Cell::new(0),
            phantom: PhantomData,
        }
    }

    /// Returns the number of values stored in the arena.
    pub(crate) fn len(&self) -> usize {
        self.len.get()
    }

    /// Stores `value` in the arena and returns the id that refers to it.
    pub(crate) fn alloc(&self, value: TValue) -> TId {
        let id = self.len.get();
        let (chunk_idx, _) = Self::chunk_and_offset(id);
        // SAFE: existing chunks are never reallocated because they are created with a capacity of
        // `CHUNK_SIZE` and never grow beyond it, so outstanding references remain valid.
        let chunks = unsafe { &mut *self.chunks.get() };
        if chunk_idx >= chunks.len() {
            chunks.resize_with(chunks.len() + 1, || Vec::with_capacity(CHUNK_SIZE));
        }
        chunks[chunk_idx].push(value);
        self.len.set(id + 1);
        TId::from_usize(id)
    }

    /// Returns an iterator over the ids and values in allocation order.
    pub(crate) fn iter(&self) -> ArenaIter<'_, TId, TValue> {
        ArenaIter {
            arena: self,
            index: 0,
        }
    }

    fn chunk_and_offset(index: usize) -> (usize, usize) {
        (index / CHUNK_SIZE, index % CHUNK_SIZE)
    }
}

impl<TId: ArenaId, TValue> Index<TId> for Arena<TId, TValue> {
    type Output = TValue;

    fn index(&self, index: TId) -> &Self::Output {
        let index = index.to_usize();
        assert!(index < self.len(), "id does not belong to this arena");
        let (chunk, offset) = Self::chunk_and_offset(index);
        // SAFE: the index was checked against the length above
        unsafe {
            let chunks = self.chunks.get();
            (&(*chunks)).get_unchecked(chunk).get_unchecked(offset)
        }
    }
}

/// A trait indicating that the type can be transformed to `usize` and back
pub(crate) trait ArenaId {
    fn from_usize(x: usize) -> Self;
    fn to_usize(self) -> usize;
}

/// An iterator over the elements of an [`Arena`].
pub(crate) struct ArenaIter<'a, TId: ArenaId, TValue> {
    arena: &'a Arena<TId, TValue>,
    index: usize,
}

impl<'a, TId: ArenaId, TValue> Iterator for ArenaIter<'a, TId, TValue> {
    type Item = (TId, &'a TValue);

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.arena.len() {
            return None;
        }
        let id = TId::from_usize(self.index);
        self.index += 1;
        let value = &self.arena[TId::from_usize(self.index - 1)];
        Some((id, value))
    }
}
