//! Strategies: how an operator's hash table is built.

use joinadapt_core::RowBatch;
use joinadapt_hashtable::{ArenaMap, HashTable, StripedMap};
use serde::{Deserialize, Serialize};

use crate::error::AdaptError;

/// Minimum writer count for a striped build.
const MIN_STRIPED_CONCURRENCY: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyKind {
    /// Shared striped map filled by several writers.
    StripedMap { build_concurrency: usize },
    /// Single-writer arena map.
    ArenaMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    pub name: String,
    pub kind: StrategyKind,
    /// Cardinality hint used to pre-size the table. Set per decision.
    #[serde(default)]
    pub est_cardinality: u64,
}

/// An operator a strategy can be applied to.
///
/// Operators that cannot host a hash table keep the default
/// `bind_hash_table`, so handing them a hash-table strategy fails.
pub trait JoinOperator {
    type Error: From<AdaptError>;

    fn name(&self) -> &'static str;

    fn bind_hash_table(
        &mut self,
        table: Box<dyn HashTable>,
        build_concurrency: usize,
    ) -> Result<(), Self::Error> {
        let _ = (table, build_concurrency);
        Err(AdaptError::Mismatch(format!(
            "operator {} cannot host a hash table",
            self.name()
        ))
        .into())
    }

    /// Rows per output chunk; also bounds arena pre-sizing.
    fn max_chunk_size(&self) -> usize;

    /// Run one unit of work, appending output to `out`. Returns whether more
    /// output may follow.
    fn exec_unit(&mut self, out: &mut RowBatch) -> Result<bool, Self::Error>;
}

impl Strategy {
    pub fn new(name: impl Into<String>, kind: StrategyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            est_cardinality: 0,
        }
    }

    /// Copy of this strategy carrying a cardinality hint.
    pub fn sized_for(&self, est_cardinality: u64) -> Self {
        Self {
            est_cardinality,
            ..self.clone()
        }
    }

    /// Writers this strategy builds with.
    pub fn build_concurrency(&self) -> usize {
        match self.kind {
            StrategyKind::StripedMap { build_concurrency } => {
                build_concurrency.max(MIN_STRIPED_CONCURRENCY)
            }
            StrategyKind::ArenaMap => 1,
        }
    }

    /// Build the table this strategy calls for and bind it to `op`.
    pub fn init<O: JoinOperator + ?Sized>(&self, op: &mut O) -> Result<(), O::Error> {
        let table: Box<dyn HashTable> = match self.kind {
            StrategyKind::StripedMap { .. } => Box::new(StripedMap::new(self.est_cardinality)),
            StrategyKind::ArenaMap => Box::new(ArenaMap::new(ArenaMap::sized_capacity(
                self.est_cardinality,
                op.max_chunk_size(),
            ))),
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(
            strategy = %self.name,
            table = table.name(),
            operator = op.name(),
            est_cardinality = self.est_cardinality,
            build_concurrency = self.build_concurrency(),
            "binding hash table"
        );
        op.bind_hash_table(table, self.build_concurrency())
    }

    /// Drive one unit of `op`'s work.
    pub fn exec<O: JoinOperator + ?Sized>(
        &self,
        op: &mut O,
        out: &mut RowBatch,
    ) -> Result<bool, O::Error> {
        op.exec_unit(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Projection;

    impl JoinOperator for Projection {
        type Error = AdaptError;

        fn name(&self) -> &'static str {
            "projection"
        }

        fn max_chunk_size(&self) -> usize {
            1024
        }

        fn exec_unit(&mut self, _out: &mut RowBatch) -> Result<bool, AdaptError> {
            Ok(false)
        }
    }

    #[test]
    fn non_join_operator_rejects_hash_table_strategies() {
        let strategy = Strategy::new("arena", StrategyKind::ArenaMap);
        let err = strategy.init(&mut Projection).unwrap_err();
        assert!(matches!(err, AdaptError::Mismatch(_)));
    }

    #[test]
    fn striped_concurrency_is_floored() {
        let s = Strategy::new(
            "striped",
            StrategyKind::StripedMap {
                build_concurrency: 1,
            },
        );
        assert_eq!(s.build_concurrency(), 2);
        assert_eq!(s.sized_for(99).est_cardinality, 99);
        assert_eq!(s.est_cardinality, 0);
    }
}
