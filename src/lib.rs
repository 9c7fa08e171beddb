#![forbid(unsafe_code)]
//! joinadapt: adaptive build-side strategies for a parallel hash join.
//!
//! Facade over the workspace crates so benches and downstream users can depend
//! on a single package.

pub use joinadapt_adaptor as adaptor;
pub use joinadapt_core as core;
pub use joinadapt_exec as exec;
pub use joinadapt_hashtable as hashtable;
