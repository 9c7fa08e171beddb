//! Striped concurrent multi-value map.
//!
//! Layout:
//!
//! ```text
//! StripedMap
//! ├── chains: Vec<Mutex<BucketChain>>   [2^B]  // one lock per chain
//! └── stats:  Mutex<MapStats>                  // aggregate counters only
//!
//! BucketChain
//! ├── buckets: Vec<Bucket>   // [0] primary, [1..] overflow, in chain order
//! └── used: usize            // occupied slots; the next free slot is `used`
//!
//! Bucket (BUCKET_CNT slots)
//! ├── tophash: [u8; 8]       // high 8 bits of the mixed key
//! ├── keys:    [u64; 8]
//! └── values:  [ValueChain; 8]
//! ```
//!
//! Locking: a chain's mutex is held for the whole of any mutation of that
//! chain and no two chain locks are ever held together. The stats lock is
//! taken only after the chain lock is released.

use std::sync::Mutex;

use joinadapt_core::{fnv64, RowPtr};

use crate::error::{Error, Result};
use crate::{ConcurrentInsert, HashTable};

/// Slots per bucket.
pub const BUCKET_CNT: usize = 8;

/// Inline values per value node.
pub const VALUE_CNT: usize = 2;

/// Average keys per chain the table is sized for.
pub const LOAD_FACTOR: u64 = 20;

/// Upper bound on B so a wild cardinality estimate cannot pre-allocate
/// an unbounded chain array.
pub const MAX_BUCKET_BITS: u32 = 20;

#[derive(Debug, Clone, Copy, Default)]
struct ValueNode {
    vals: [RowPtr; VALUE_CNT],
}

/// Values of one key: an inline node, then overflow nodes, filled in order.
#[derive(Debug, Default)]
struct ValueChain {
    first: ValueNode,
    overflow: Vec<ValueNode>,
    len: usize,
}

impl ValueChain {
    fn push(&mut self, ptr: RowPtr) {
        let node = self.len / VALUE_CNT;
        let slot = self.len % VALUE_CNT;
        if node == 0 {
            self.first.vals[slot] = ptr;
        } else {
            if node > self.overflow.len() {
                self.overflow.push(ValueNode::default());
            }
            self.overflow[node - 1].vals[slot] = ptr;
        }
        self.len += 1;
    }

    fn collect(&self) -> Vec<RowPtr> {
        std::iter::once(&self.first)
            .chain(self.overflow.iter())
            .flat_map(|n| n.vals.iter().copied())
            .take(self.len)
            .collect()
    }
}

#[derive(Debug, Default)]
struct Bucket {
    tophash: [u8; BUCKET_CNT],
    keys: [u64; BUCKET_CNT],
    values: [ValueChain; BUCKET_CNT],
}

#[derive(Debug)]
struct BucketChain {
    buckets: Vec<Bucket>,
    used: usize,
    count: u64,
}

impl BucketChain {
    fn new() -> Self {
        Self {
            buckets: vec![Bucket::default()],
            used: 0,
            count: 0,
        }
    }

    fn find(&self, key: u64, tag: u8) -> Option<(usize, usize)> {
        (0..self.used)
            .map(|i| (i / BUCKET_CNT, i % BUCKET_CNT))
            .find(|&(b, s)| {
                let bucket = &self.buckets[b];
                bucket.tophash[s] == tag && bucket.keys[s] == key
            })
    }

    /// Insert under the chain lock. Returns true if an overflow bucket was added.
    fn insert(&mut self, key: u64, tag: u8, ptr: RowPtr) -> Result<bool> {
        self.count += 1;
        if let Some((b, s)) = self.find(key, tag) {
            self.buckets[b].values[s].push(ptr);
            return Ok(false);
        }

        let (b, s) = (self.used / BUCKET_CNT, self.used % BUCKET_CNT);
        let nbuckets = self.buckets.len();
        let bucket = self.buckets.get_mut(b).ok_or_else(|| {
            Error::Invariant(format!(
                "insert cursor at bucket {} but chain holds {} buckets",
                b, nbuckets
            ))
        })?;
        bucket.tophash[s] = tag;
        bucket.keys[s] = key;
        bucket.values[s].push(ptr);
        self.used += 1;

        // Keep a free slot at the cursor at all times.
        if self.used % BUCKET_CNT == 0 {
            self.buckets.push(Bucket::default());
            return Ok(true);
        }
        Ok(false)
    }

    fn get(&self, key: u64, tag: u8) -> Vec<RowPtr> {
        self.find(key, tag)
            .map(|(b, s)| self.buckets[b].values[s].collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct MapStats {
    /// Live cells (stored values).
    count: u64,
    noverflow: u64,
}

/// Key mixer applied before bucket addressing.
pub type KeyMixer = fn(u64) -> u64;

pub struct StripedMap {
    chains: Vec<Mutex<BucketChain>>,
    bits: u32,
    stats: Mutex<MapStats>,
    mixer: KeyMixer,
}

impl std::fmt::Debug for StripedMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripedMap")
            .field("bits", &self.bits)
            .field("len", &self.len())
            .field("overflow_buckets", &self.overflow_buckets())
            .finish()
    }
}

/// Smallest B with `2^B * LOAD_FACTOR >= hint`, capped at `MAX_BUCKET_BITS`.
pub fn bucket_bits_for(hint: u64) -> u32 {
    let mut bits = 0;
    while bits < MAX_BUCKET_BITS && (1u64 << bits) * LOAD_FACTOR < hint {
        bits += 1;
    }
    bits
}

impl StripedMap {
    /// Create a map sized for `hint` expected keys.
    pub fn new(hint: u64) -> Self {
        Self::with_hasher(hint, fnv64)
    }

    /// Create a map with a custom key mixer (e.g. to force collisions).
    pub fn with_hasher(hint: u64, mixer: KeyMixer) -> Self {
        let bits = bucket_bits_for(hint);
        let chains = (0..1usize << bits)
            .map(|_| Mutex::new(BucketChain::new()))
            .collect();
        Self {
            chains,
            bits,
            stats: Mutex::new(MapStats::default()),
            mixer,
        }
    }

    pub fn bucket_bits(&self) -> u32 {
        self.bits
    }

    pub fn num_chains(&self) -> usize {
        self.chains.len()
    }

    pub fn overflow_buckets(&self) -> u64 {
        self.read_stats().noverflow
    }

    fn read_stats(&self) -> MapStats {
        match self.stats.lock() {
            Ok(stats) => *stats,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Chain index and tag for `key`.
    fn locate(&self, key: u64) -> (usize, u8) {
        let hash = (self.mixer)(key);
        let mask = (1u64 << self.bits) - 1;
        ((hash & mask) as usize, (hash >> 56) as u8)
    }

    fn chain(&self, idx: usize) -> Result<&Mutex<BucketChain>> {
        self.chains
            .get(idx)
            .ok_or_else(|| Error::Invariant(format!("chain {} out of range", idx)))
    }

    fn record_insert(&self, chain: usize, grew: bool) -> Result<()> {
        let mut stats = self
            .stats
            .lock()
            .map_err(|_| Error::Invariant("striped map stats lock poisoned".into()))?;
        stats.count += 1;
        if grew {
            stats.noverflow += 1;
            #[cfg(feature = "tracing")]
            tracing::trace!(chain, overflow = stats.noverflow, "striped map chain overflowed");
        }
        #[cfg(not(feature = "tracing"))]
        let _ = chain;
        Ok(())
    }
}

impl ConcurrentInsert for StripedMap {
    fn put_shared(&self, key: u64, ptr: RowPtr) -> Result<()> {
        let (idx, tag) = self.locate(key);
        let grew = {
            let mut chain = self
                .chain(idx)?
                .lock()
                .map_err(|_| Error::Invariant(format!("chain {} lock poisoned", idx)))?;
            chain.insert(key, tag, ptr)?
        };
        self.record_insert(idx, grew)
    }
}

impl HashTable for StripedMap {
    fn name(&self) -> &'static str {
        "striped_map"
    }

    fn put(&mut self, key: u64, ptr: RowPtr) -> Result<()> {
        // Exclusive access: no need to take the chain lock.
        let (idx, tag) = self.locate(key);
        let grew = self
            .chains
            .get_mut(idx)
            .ok_or_else(|| Error::Invariant(format!("chain {} out of range", idx)))?
            .get_mut()
            .map_err(|_| Error::Invariant(format!("chain {} lock poisoned", idx)))?
            .insert(key, tag, ptr)?;
        self.record_insert(idx, grew)
    }

    fn get(&self, key: u64) -> Result<Vec<RowPtr>> {
        let (idx, tag) = self.locate(key);
        let chain = self
            .chain(idx)?
            .lock()
            .map_err(|_| Error::Invariant(format!("chain {} lock poisoned", idx)))?;
        Ok(chain.get(key, tag))
    }

    fn len(&self) -> usize {
        self.read_stats().count as usize
    }

    fn concurrent(&self) -> Option<&dyn ConcurrentInsert> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_bits_follow_load_factor() {
        assert_eq!(bucket_bits_for(0), 0);
        assert_eq!(bucket_bits_for(20), 0);
        assert_eq!(bucket_bits_for(21), 1);
        assert_eq!(bucket_bits_for(1000), 6); // 64 * 20 = 1280
        assert_eq!(bucket_bits_for(u64::MAX), MAX_BUCKET_BITS);
    }

    #[test]
    fn value_chain_grows_overflow_nodes_in_order() {
        let mut chain = ValueChain::default();
        for i in 0..5 {
            chain.push(RowPtr::new(0, i));
        }
        assert_eq!(chain.overflow.len(), 2);
        let rows: Vec<u32> = chain.collect().iter().map(|p| p.row_idx).collect();
        assert_eq!(rows, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn full_bucket_appends_overflow() {
        let mut chain = BucketChain::new();
        let mut grew = 0;
        for k in 0..(BUCKET_CNT as u64 * 2) {
            if chain.insert(k, 0, RowPtr::new(0, k as u32)).unwrap() {
                grew += 1;
            }
        }
        assert_eq!(grew, 2);
        assert_eq!(chain.buckets.len(), 3);
        assert_eq!(chain.get(BUCKET_CNT as u64 + 3, 0), vec![RowPtr::new(0, 11)]);
    }
}
