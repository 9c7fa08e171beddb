//! Statistics catalog: the query surface the parameter generator reads
//! column statistics through.
//!
//! `MemoryCatalog` keeps base tables and their derived statistics in process.
//! It answers a fixed set of statements:
//!
//! ```text
//! analyze table <name>
//! select value, count from stats_top_n where table_id = <t> and hist_id = <c>
//! select distinct_count, null_count from stats_histograms where table_id = <t> and hist_id = <c>
//! select count from stats_meta where table_id = <t>
//! ```
//!
//! `hist_id` is the zero-based column position.

use std::collections::HashMap;
use std::sync::Mutex;

use joinadapt_core::{hash_value, values_equal, RowBatch, Scalar};

use crate::error::{AdaptError, Result};

/// Most common values kept per column by `analyze`.
pub const TOP_N: usize = 100;

pub trait StatsCatalog: Send + Sync {
    /// Run one statement and return its result rows.
    fn execute(&self, sql: &str) -> Result<Vec<Vec<Scalar>>>;
}

#[derive(Debug, Clone, Default)]
struct ColumnStats {
    distinct_count: i64,
    null_count: i64,
    top_n: Vec<(Scalar, i64)>,
}

#[derive(Debug)]
struct Table {
    id: i64,
    name: String,
    data: RowBatch,
}

#[derive(Debug, Default)]
struct CatalogState {
    tables: Vec<Table>,
    columns: HashMap<(i64, i64), ColumnStats>,
    row_counts: HashMap<i64, i64>,
    analyze_count: u64,
}

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    state: Mutex<CatalogState>,
}

fn column_stats(values: &[Scalar]) -> ColumnStats {
    // Values are grouped the way the join compares keys.
    let mut slots: HashMap<u64, Vec<usize>> = HashMap::new();
    let mut distinct: Vec<(Scalar, i64)> = Vec::new();
    let mut null_count = 0;
    for v in values {
        let Some(hash) = hash_value(v) else {
            null_count += 1;
            continue;
        };
        let bucket = slots.entry(hash).or_default();
        let slot = match bucket.iter().copied().find(|&i| values_equal(&distinct[i].0, v)) {
            Some(i) => i,
            None => {
                distinct.push((v.clone(), 0));
                bucket.push(distinct.len() - 1);
                distinct.len() - 1
            }
        };
        distinct[slot].1 += 1;
    }
    let distinct_count = distinct.len() as i64;
    // Stable sort keeps first-appearance order among equal counts.
    distinct.sort_by(|a, b| b.1.cmp(&a.1));
    distinct.truncate(TOP_N);
    ColumnStats {
        distinct_count,
        null_count,
        top_n: distinct,
    }
}

/// Parse `k = v and k = v ...` into integer filters.
fn parse_filters(clause: &str) -> Result<HashMap<String, i64>> {
    let mut filters = HashMap::new();
    for cond in clause.split(" and ") {
        let (k, v) = cond
            .split_once('=')
            .ok_or_else(|| AdaptError::Catalog(format!("unsupported condition: {}", cond)))?;
        let v = v
            .trim()
            .parse::<i64>()
            .map_err(|_| AdaptError::Catalog(format!("non-integer filter value in: {}", cond)))?;
        filters.insert(k.trim().to_string(), v);
    }
    Ok(filters)
}

fn filter(filters: &HashMap<String, i64>, key: &str) -> Result<i64> {
    filters
        .get(key)
        .copied()
        .ok_or_else(|| AdaptError::Catalog(format!("missing filter on {}", key)))
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, CatalogState>> {
        self.state
            .lock()
            .map_err(|_| AdaptError::Catalog("catalog lock poisoned".into()))
    }

    /// Register (or replace) a base table. Statistics stay stale until the
    /// next `analyze table`.
    pub fn register_table(&self, id: i64, name: impl Into<String>, data: RowBatch) -> Result<()> {
        let name = name.into();
        let mut state = self.lock()?;
        state.tables.retain(|t| t.id != id && t.name != name);
        state.tables.push(Table { id, name, data });
        Ok(())
    }

    /// Number of `analyze table` statements executed so far.
    pub fn analyze_count(&self) -> u64 {
        match self.state.lock() {
            Ok(state) => state.analyze_count,
            Err(poisoned) => poisoned.into_inner().analyze_count,
        }
    }

    fn analyze(&self, name: &str) -> Result<()> {
        let mut state = self.lock()?;
        let table = state
            .tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| AdaptError::Catalog(format!("unknown table {}", name)))?;
        let id = table.id;
        let rows = table.data.num_rows() as i64;
        let stats: Vec<ColumnStats> = table
            .data
            .columns
            .iter()
            .map(|c| column_stats(&c.values))
            .collect();

        state.columns.retain(|(t, _), _| *t != id);
        for (hist_id, col) in stats.into_iter().enumerate() {
            state.columns.insert((id, hist_id as i64), col);
        }
        state.row_counts.insert(id, rows);
        state.analyze_count += 1;
        #[cfg(feature = "tracing")]
        tracing::debug!(table = name, table_id = id, rows, "analyzed table");
        Ok(())
    }

    fn select(&self, head: &str, filters: &HashMap<String, i64>) -> Result<Vec<Vec<Scalar>>> {
        let state = self.lock()?;
        let table_id = filter(filters, "table_id")?;
        match head {
            "select value, count from stats_top_n" => {
                let hist_id = filter(filters, "hist_id")?;
                Ok(state
                    .columns
                    .get(&(table_id, hist_id))
                    .map(|c| {
                        c.top_n
                            .iter()
                            .map(|(v, n)| vec![v.clone(), Scalar::I64(*n)])
                            .collect()
                    })
                    .unwrap_or_default())
            }
            "select distinct_count, null_count from stats_histograms" => {
                let hist_id = filter(filters, "hist_id")?;
                Ok(state
                    .columns
                    .get(&(table_id, hist_id))
                    .map(|c| {
                        vec![vec![
                            Scalar::I64(c.distinct_count),
                            Scalar::I64(c.null_count),
                        ]]
                    })
                    .unwrap_or_default())
            }
            "select count from stats_meta" => Ok(state
                .row_counts
                .get(&table_id)
                .map(|n| vec![vec![Scalar::I64(*n)]])
                .unwrap_or_default()),
            other => Err(AdaptError::Catalog(format!("unsupported query: {}", other))),
        }
    }
}

impl StatsCatalog for MemoryCatalog {
    fn execute(&self, sql: &str) -> Result<Vec<Vec<Scalar>>> {
        let normalized = sql
            .trim()
            .trim_end_matches(';')
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let lower = normalized.to_ascii_lowercase();

        if lower.starts_with("analyze table ") {
            let name = normalized["analyze table ".len()..].trim();
            if name.is_empty() || name.contains(' ') {
                return Err(AdaptError::Catalog(format!("bad analyze target in: {}", sql)));
            }
            self.analyze(name)?;
            return Ok(Vec::new());
        }

        match lower.split_once(" where ") {
            Some((head, clause)) => self.select(head, &parse_filters(clause)?),
            None => Err(AdaptError::Catalog(format!("unsupported statement: {}", sql))),
        }
    }
}
