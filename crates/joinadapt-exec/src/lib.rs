#![forbid(unsafe_code)]
//! joinadapt-exec: the hash join operator that adaptive strategies are
//! applied to.
//!
//! Typical use:
//! 1) `Adaptor::init_adaptor(&registry, HASH_JOIN, &ctx)`
//! 2) `HashJoinExec::open_with(&mut adaptor)` decides and binds a table
//! 3) `HashJoinExec::run_to_end()` builds, then probes every outer chunk

pub mod error;
pub mod hash_join;

pub use error::{ExecError, Result};
pub use hash_join::{HashJoinExec, JoinStats};
