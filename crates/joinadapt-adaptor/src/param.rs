//! Parameter generation: hardware state plus statistics of the build side.

use std::sync::Arc;

use joinadapt_core::Scalar;
use serde::{Deserialize, Serialize};

use crate::catalog::StatsCatalog;
use crate::error::{AdaptError, Result};
use crate::hardware::HardwareProbe;
use crate::snapshot::{HardwareSnapshot, KeyStats, StatsSnapshot};

pub trait ParamGenerator: Send {
    fn system_state(&self) -> Result<HardwareSnapshot>;
    fn statistics(&self) -> Result<StatsSnapshot>;
}

/// Base table on the build side of a hash join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InnerRelation {
    pub table_id: i64,
    pub table_name: String,
    /// Column ids (histogram ids) of the join keys.
    pub key_columns: Vec<i64>,
}

pub struct HashJoinParamGenerator {
    catalog: Arc<dyn StatsCatalog>,
    hardware: Arc<dyn HardwareProbe>,
    inner: Option<InnerRelation>,
    analyze: bool,
}

fn int_cell(row: &[Scalar], idx: usize, query: &str) -> Result<i64> {
    row.get(idx).and_then(Scalar::as_i64).ok_or_else(|| {
        AdaptError::Catalog(format!("column {} of {} is not an integer", idx, query))
    })
}

impl HashJoinParamGenerator {
    pub fn new(
        catalog: Arc<dyn StatsCatalog>,
        hardware: Arc<dyn HardwareProbe>,
        inner: Option<InnerRelation>,
        analyze: bool,
    ) -> Self {
        Self {
            catalog,
            hardware,
            inner,
            analyze,
        }
    }

    fn key_stats(&self, table_id: i64, hist_id: i64) -> Result<KeyStats> {
        let mut stats = KeyStats::default();

        let top_n = format!(
            "select value, count from stats_top_n where table_id = {} and hist_id = {}",
            table_id, hist_id
        );
        for row in self.catalog.execute(&top_n)? {
            let value = row
                .first()
                .cloned()
                .ok_or_else(|| AdaptError::Catalog(format!("empty row from {}", top_n)))?;
            stats.most_common_values.push(value);
            stats.most_common_counts.push(int_cell(&row, 1, &top_n)?);
        }

        let histogram = format!(
            "select distinct_count, null_count from stats_histograms where table_id = {} and hist_id = {}",
            table_id, hist_id
        );
        if let Some(row) = self.catalog.execute(&histogram)?.first() {
            stats.distinct_count = Some(int_cell(row, 0, &histogram)?);
            stats.null_count = int_cell(row, 1, &histogram)?;
        }
        Ok(stats)
    }
}

impl ParamGenerator for HashJoinParamGenerator {
    fn system_state(&self) -> Result<HardwareSnapshot> {
        self.hardware.sample()
    }

    /// Statistics of the inner relation's join keys. Empty when the inner
    /// side is not a base table.
    fn statistics(&self) -> Result<StatsSnapshot> {
        let Some(inner) = &self.inner else {
            return Ok(StatsSnapshot::default());
        };

        if self.analyze {
            self.catalog
                .execute(&format!("analyze table {}", inner.table_name))?;
        }

        let keys = inner
            .key_columns
            .iter()
            .map(|&hist_id| self.key_stats(inner.table_id, hist_id))
            .collect::<Result<Vec<_>>>()?;

        let meta = format!("select count from stats_meta where table_id = {}", inner.table_id);
        let relation_tuple_count = match self.catalog.execute(&meta)?.first() {
            Some(row) => int_cell(row, 0, &meta)?,
            None => 0,
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            table = %inner.table_name,
            keys = keys.len(),
            relation_tuple_count,
            "read build-side statistics"
        );
        Ok(StatsSnapshot {
            keys,
            relation_tuple_count,
        })
    }
}
