//! Convenient re-exports for downstream crates.

pub use crate::error::{Error, Result};
pub use crate::hash::{hash_row_keys, hash_value, keys_equal, values_equal, HashContext, KeyHash};
pub use crate::schema::{DataType, Field, Schema};
pub use crate::types::{ChunkList, Column, Row, RowBatch, RowPtr, Scalar};
