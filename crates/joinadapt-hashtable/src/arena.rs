//! Arena-backed multi-value map for single-writer builds.
//!
//! Every value is one `Entry` appended to an entry store made of slices that
//! double in capacity up to `MAX_SLICE_LEN`. Entries of the same key form a
//! backwards linked list through `next`; the key map only stores the head.
//! Nothing is ever moved once written, so addresses stay valid for the life
//! of the map.

use std::collections::HashMap;

use joinadapt_core::RowPtr;

use crate::error::{Error, Result};
use crate::HashTable;

const INITIAL_SLICE_LEN: usize = 64;
const MAX_SLICE_LEN: usize = 8 * 1024;

// Guard rails for sizing from a cardinality estimate. Estimates from stats
// are rough, so they are scaled down first and then bounded by multiples of
// the chunk size.
const EST_COUNT_DIVISOR: u64 = 8;
const EST_COUNT_MAX_FACTOR: usize = 10 * 1024;
const EST_COUNT_MIN_FACTOR: usize = 8;

/// Address of an entry: slice index plus offset within the slice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryAddr {
    slice_idx: u32,
    offset: u32,
}

impl EntryAddr {
    /// Terminator. Slot {0,0} is taken by a dummy entry at construction.
    pub const NULL: EntryAddr = EntryAddr {
        slice_idx: 0,
        offset: 0,
    };
}

#[derive(Debug, Clone, Copy, Default)]
struct Entry {
    ptr: RowPtr,
    next: EntryAddr,
}

#[derive(Debug)]
struct EntryStore {
    slices: Vec<Vec<Entry>>,
}

fn slice_len(slice_idx: usize) -> usize {
    // 64 << 16 is far past the cap; bounding the shift avoids overflow.
    (INITIAL_SLICE_LEN << slice_idx.min(16)).min(MAX_SLICE_LEN)
}

impl EntryStore {
    fn new() -> Self {
        let mut first = Vec::with_capacity(INITIAL_SLICE_LEN);
        // Reserve {0,0} so EntryAddr::default() never names a real entry.
        first.push(Entry::default());
        Self {
            slices: vec![first],
        }
    }

    fn put(&mut self, entry: Entry) -> Result<EntryAddr> {
        let mut slice_idx = self.slices.len() - 1;
        if self.slices[slice_idx].len() >= slice_len(slice_idx) {
            slice_idx += 1;
            self.slices.push(Vec::with_capacity(slice_len(slice_idx)));
        }
        let slice = &mut self.slices[slice_idx];
        let addr = EntryAddr {
            slice_idx: u32::try_from(slice_idx)
                .map_err(|_| Error::Invariant("entry store exceeds u32 slices".into()))?,
            offset: slice.len() as u32,
        };
        slice.push(entry);
        Ok(addr)
    }

    fn get(&self, addr: EntryAddr) -> Option<&Entry> {
        self.slices
            .get(addr.slice_idx as usize)
            .and_then(|s| s.get(addr.offset as usize))
    }
}

/// Multi-value map from key hash to row pointers. Not thread-safe for writes.
#[derive(Debug)]
pub struct ArenaMap {
    store: EntryStore,
    heads: HashMap<u64, EntryAddr>,
    length: usize,
}

impl ArenaMap {
    /// `est_count` pre-sizes the key map; 0 if unknown.
    pub fn new(est_count: usize) -> Self {
        Self {
            store: EntryStore::new(),
            heads: HashMap::with_capacity(est_count),
            length: 0,
        }
    }

    /// Key-map capacity to use for a build of `est_cardinality` rows.
    ///
    /// Scaled down by the divisor, capped at `max_chunk_size * 10240`, and
    /// dropped to 0 below `max_chunk_size * 8`.
    pub fn sized_capacity(est_cardinality: u64, max_chunk_size: usize) -> usize {
        let est = usize::try_from(est_cardinality / EST_COUNT_DIVISOR).unwrap_or(usize::MAX);
        let est = est.min(max_chunk_size.saturating_mul(EST_COUNT_MAX_FACTOR));
        if est < max_chunk_size.saturating_mul(EST_COUNT_MIN_FACTOR) {
            0
        } else {
            est
        }
    }

    pub fn num_slices(&self) -> usize {
        self.store.slices.len()
    }

    pub fn num_keys(&self) -> usize {
        self.heads.len()
    }
}

impl HashTable for ArenaMap {
    fn name(&self) -> &'static str {
        "arena_map"
    }

    fn put(&mut self, key: u64, ptr: RowPtr) -> Result<()> {
        let next = self.heads.get(&key).copied().unwrap_or(EntryAddr::NULL);
        let addr = self.store.put(Entry { ptr, next })?;
        self.heads.insert(key, addr);
        self.length += 1;
        Ok(())
    }

    fn get(&self, key: u64) -> Result<Vec<RowPtr>> {
        let mut ptrs = Vec::new();
        let mut addr = self.heads.get(&key).copied().unwrap_or(EntryAddr::NULL);
        while addr != EntryAddr::NULL {
            let entry = self.store.get(addr).ok_or_else(|| {
                Error::Invariant(format!("dangling arena address {:?}", addr))
            })?;
            ptrs.push(entry.ptr);
            addr = entry.next;
        }
        // The list is newest-first; callers expect insertion order.
        ptrs.reverse();
        Ok(ptrs)
    }

    fn len(&self) -> usize {
        self.length
    }
}
