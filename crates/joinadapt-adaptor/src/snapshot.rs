//! Point-in-time inputs to one adaptation decision.

use joinadapt_core::Scalar;
use serde::{Deserialize, Serialize};

/// Hardware state. Rates are fractions in `[0, 1]`; memory is in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HardwareSnapshot {
    pub cpu_usage_rate: f64,
    pub mem_usage_rate: f64,
    pub mem_capacity: f64,
    pub available_memory: f64,
}

/// Statistics of one inner join key column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyStats {
    pub null_count: i64,
    /// `None` when the catalog has no histogram row for the column.
    pub distinct_count: Option<i64>,
    pub most_common_values: Vec<Scalar>,
    pub most_common_counts: Vec<i64>,
}

/// Statistical profile of the build side, one `KeyStats` per join key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub keys: Vec<KeyStats>,
    pub relation_tuple_count: i64,
}
