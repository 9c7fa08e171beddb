//! Inner equi-join over a hash table chosen by the adaptor.
//!
//! The first unit of work builds the table from all inner chunks; it returns
//! only once every build worker has finished. Every unit after that probes
//! one outer chunk. Output rows are the outer columns followed by the inner
//! columns.

use std::collections::VecDeque;

use joinadapt_adaptor::{Adaptor, JoinOperator, Strategy};
use joinadapt_core::{HashContext, RowBatch};
use joinadapt_hashtable::{HashContainer, HashTable};
use serde::Serialize;

use crate::error::{ExecError, Result};

const DEFAULT_MAX_CHUNK_SIZE: usize = 1024;

/// Row counters for one join run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JoinStats {
    pub build_rows: usize,
    pub skipped_null_rows: usize,
    pub probe_rows: usize,
    pub output_rows: usize,
}

pub struct HashJoinExec {
    inner: Vec<RowBatch>,
    outer: VecDeque<RowBatch>,
    inner_ctx: HashContext,
    outer_ctx: HashContext,
    output_names: Vec<String>,
    max_chunk_size: usize,
    container: Option<HashContainer>,
    build_concurrency: usize,
    built: bool,
    strategy: Option<Strategy>,
    stats: JoinStats,
}

impl HashJoinExec {
    /// `inner` is the build side, `outer` the probe side. Each context names
    /// its side's column types and key columns.
    pub fn new(
        inner: Vec<RowBatch>,
        outer: Vec<RowBatch>,
        inner_ctx: HashContext,
        outer_ctx: HashContext,
    ) -> Self {
        let empty = RowBatch::default();
        let output_names = RowBatch::joined_names(
            outer.first().unwrap_or(&empty),
            inner.first().unwrap_or(&empty),
        );
        Self {
            inner,
            outer: outer.into(),
            inner_ctx,
            outer_ctx,
            output_names,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            container: None,
            build_concurrency: 1,
            built: false,
            strategy: None,
            stats: JoinStats::default(),
        }
    }

    pub fn with_max_chunk_size(mut self, max_chunk_size: usize) -> Self {
        self.max_chunk_size = max_chunk_size.max(1);
        self
    }

    /// Rows on the build side.
    pub fn inner_rows(&self) -> u64 {
        self.inner.iter().map(|c| c.num_rows() as u64).sum()
    }

    /// Decide a strategy through `adaptor` and bind its table.
    ///
    /// Sampling or catalog failures fall back to the default strategy,
    /// sized for the build side's row count.
    pub fn open_with(&mut self, adaptor: &mut Adaptor) -> Result<Strategy> {
        let strategy = adaptor.adapt_or_default(self.inner_rows())?;
        strategy.init(self)?;
        self.strategy = Some(strategy.clone());
        Ok(strategy)
    }

    /// Run the join to completion and return all output rows.
    pub fn run_to_end(&mut self) -> Result<RowBatch> {
        let strategy = self
            .strategy
            .clone()
            .ok_or_else(|| ExecError::Exec("hash join run before open".into()))?;
        let mut out = RowBatch::with_column_names(self.output_names.clone());
        while strategy.exec(self, &mut out)? {}
        Ok(out)
    }

    pub fn strategy(&self) -> Option<&Strategy> {
        self.strategy.as_ref()
    }

    pub fn build_concurrency(&self) -> usize {
        self.build_concurrency
    }

    pub fn container(&self) -> Option<&HashContainer> {
        self.container.as_ref()
    }

    pub fn stats(&self) -> JoinStats {
        self.stats
    }

    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }

    fn build(&mut self) -> Result<()> {
        let container = self
            .container
            .as_mut()
            .ok_or_else(|| ExecError::Exec("hash join executed before a table was bound".into()))?;
        let chunks = std::mem::take(&mut self.inner);
        container.build_parallel(chunks, self.build_concurrency)?;
        self.built = true;
        self.stats.build_rows = container.num_rows();
        self.stats.skipped_null_rows = container.skipped_null_rows();
        #[cfg(feature = "tracing")]
        tracing::info!(
            table = container.table_name(),
            rows = container.num_rows(),
            entries = container.len(),
            skipped_null_rows = container.skipped_null_rows(),
            workers = self.build_concurrency,
            "hash join build finished"
        );
        Ok(())
    }

    fn probe(&mut self, chunk: &RowBatch, out: &mut RowBatch) -> Result<()> {
        let container = self
            .container
            .as_ref()
            .ok_or_else(|| ExecError::Exec("hash join probed before a table was bound".into()))?;
        if out.num_columns() == 0 {
            *out = RowBatch::with_column_names(self.output_names.clone());
        }
        for idx in 0..chunk.num_rows() {
            let Some(probe) = chunk.row(idx) else {
                break;
            };
            for matched in container.get_matched_rows(probe, &self.outer_ctx)? {
                let mut values = probe.to_values();
                values.extend(matched.to_values());
                out.push_row(values)?;
                self.stats.output_rows += 1;
            }
        }
        self.stats.probe_rows += chunk.num_rows();
        Ok(())
    }
}

impl JoinOperator for HashJoinExec {
    type Error = ExecError;

    fn name(&self) -> &'static str {
        "hash_join"
    }

    fn bind_hash_table(&mut self, table: Box<dyn HashTable>, build_concurrency: usize) -> Result<()> {
        if self.built {
            return Err(ExecError::Exec("hash table already built".into()));
        }
        if self.inner_ctx.key_cols.len() != self.outer_ctx.key_cols.len() {
            return Err(ExecError::Exec(format!(
                "inner side has {} key columns but outer side has {}",
                self.inner_ctx.key_cols.len(),
                self.outer_ctx.key_cols.len()
            )));
        }
        self.container = Some(HashContainer::new(table, self.inner_ctx.clone()));
        self.build_concurrency = build_concurrency.max(1);
        Ok(())
    }

    fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    fn exec_unit(&mut self, out: &mut RowBatch) -> Result<bool> {
        if !self.built {
            self.build()?;
        }
        let Some(chunk) = self.outer.pop_front() else {
            return Ok(false);
        };
        self.probe(&chunk, out)?;
        if self.outer.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::info!(
                probe_rows = self.stats.probe_rows,
                output_rows = self.stats.output_rows,
                "hash join probe finished"
            );
            return Ok(false);
        }
        Ok(true)
    }
}
