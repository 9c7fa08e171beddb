#![forbid(unsafe_code)]
//! joinadapt-hashtable: the lookup structures a hash join builds its inner
//! side into.
//!
//! Two engines implement one contract (`HashTable`):
//! - `StripedMap`: 2^B independently locked bucket chains; safe for many
//!   concurrent writers via `ConcurrentInsert`.
//! - `ArenaMap`: one key map over an append-only entry arena; single writer.
//!
//! `HashContainer` is written once against the trait and never special-cases
//! which engine was selected.

pub mod arena;
pub mod container;
pub mod error;
pub mod striped;

pub use arena::ArenaMap;
pub use container::HashContainer;
pub use error::{Error, Result};
pub use striped::StripedMap;

use joinadapt_core::RowPtr;

/// Contract shared by every hash table engine.
///
/// Keys are 64-bit row-key hashes; values are row pointers into storage the
/// table does not own. A key may carry many values.
pub trait HashTable: Send + Sync {
    /// Stable engine name, for logs and diagnostics.
    fn name(&self) -> &'static str;

    fn put(&mut self, key: u64, ptr: RowPtr) -> Result<()>;

    /// All values stored under `key`, empty if absent.
    fn get(&self, key: u64) -> Result<Vec<RowPtr>>;

    /// Number of stored row pointers (not distinct keys).
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shared-insert handle for multi-writer builds. `None` means the engine
    /// is single-writer and must be built with concurrency 1.
    fn concurrent(&self) -> Option<&dyn ConcurrentInsert> {
        None
    }
}

/// Insertion through a shared reference, for engines that lock internally.
pub trait ConcurrentInsert: Sync {
    fn put_shared(&self, key: u64, ptr: RowPtr) -> Result<()>;
}
