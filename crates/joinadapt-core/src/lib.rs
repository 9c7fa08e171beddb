#![forbid(unsafe_code)]
//! joinadapt-core: the row/chunk model and join-key hashing shared by the
//! hash tables, the adaptor, and the join operator.
//!
//! Row storage here is deliberately simple (`Vec<Scalar>` columns). The hash
//! tables never copy rows; they only hold `RowPtr` indirections into a
//! `ChunkList` owned by the hash container.

pub mod error;
pub mod hash;
pub mod prelude;
pub mod schema;
pub mod types;

pub use error::{Error, Result};
pub use hash::{fnv64, hash_row_keys, hash_value, keys_equal, values_equal, HashContext, KeyHash};
pub use types::{ChunkList, Column, Row, RowBatch, RowPtr, Scalar};
