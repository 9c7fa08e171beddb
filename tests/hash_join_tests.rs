//! Hash join end-to-end over adaptor-chosen strategies

use joinadapt_adaptor::config::{STRATEGY_ARENA, STRATEGY_STRIPED};
use joinadapt_adaptor::{
    AdaptConfig, AdaptContext, Adaptor, FixedProbe, InnerRelation, JoinOperator, MemoryCatalog,
    Registry, Strategy, StrategyKind, HASH_JOIN,
};
use joinadapt_core::schema::DataType;
use joinadapt_core::{Column, HashContext, RowBatch, Scalar};
use joinadapt_exec::{ExecError, HashJoinExec};
use std::sync::Arc;

fn inner_chunks(keys: &[Option<i64>], per_chunk: usize) -> Vec<RowBatch> {
    keys.chunks(per_chunk)
        .enumerate()
        .map(|(c, part)| {
            RowBatch::new(vec![
                Column::new(
                    "id",
                    part.iter()
                        .map(|k| k.map(Scalar::I64).unwrap_or(Scalar::Null))
                        .collect(),
                ),
                Column::new(
                    "name",
                    (0..part.len())
                        .map(|i| Scalar::Str(format!("inner-{}-{}", c, i)))
                        .collect(),
                ),
            ])
        })
        .collect()
}

fn outer_chunks(keys: &[Option<i64>], per_chunk: usize) -> Vec<RowBatch> {
    keys.chunks(per_chunk)
        .map(|part| {
            RowBatch::new(vec![
                Column::new(
                    "id",
                    part.iter()
                        .map(|k| k.map(Scalar::I64).unwrap_or(Scalar::Null))
                        .collect(),
                ),
                Column::new(
                    "qty",
                    part.iter()
                        .map(|k| Scalar::I64(k.unwrap_or(-1) * 10))
                        .collect(),
                ),
            ])
        })
        .collect()
}

fn inner_ctx() -> HashContext {
    HashContext::new(vec![DataType::Int64, DataType::Utf8], vec![0])
}

fn outer_ctx() -> HashContext {
    HashContext::new(vec![DataType::Int64, DataType::Int64], vec![0])
}

fn sample_inner() -> Vec<Option<i64>> {
    (0..200)
        .map(|i| if i % 17 == 0 { None } else { Some(i % 23) })
        .collect()
}

fn sample_outer() -> Vec<Option<i64>> {
    (0..90)
        .map(|i| if i % 11 == 0 { None } else { Some(i % 30) })
        .collect()
}

fn run_with(strategy: Strategy) -> (RowBatch, usize) {
    let mut join = HashJoinExec::new(
        inner_chunks(&sample_inner(), 16),
        outer_chunks(&sample_outer(), 8),
        inner_ctx(),
        outer_ctx(),
    );
    strategy.init(&mut join).expect("bind table");
    let mut out = RowBatch::default();
    while strategy.exec(&mut join, &mut out).expect("exec") {}
    (out, join.build_concurrency())
}

fn sorted_rows(batch: &RowBatch) -> Vec<String> {
    let mut rows: Vec<String> = (0..batch.num_rows())
        .map(|i| format!("{:?}", batch.row(i).unwrap().to_values()))
        .collect();
    rows.sort();
    rows
}

fn expected_rows() -> usize {
    let inner = sample_inner();
    sample_outer()
        .iter()
        .flatten()
        .map(|o| inner.iter().flatten().filter(|i| *i == o).count())
        .sum()
}

#[test]
fn test_both_engines_produce_identical_results() {
    let striped = Strategy::new(
        STRATEGY_STRIPED,
        StrategyKind::StripedMap {
            build_concurrency: 4,
        },
    )
    .sized_for(200);
    let arena = Strategy::new(STRATEGY_ARENA, StrategyKind::ArenaMap).sized_for(200);

    let (striped_out, striped_workers) = run_with(striped);
    let (arena_out, arena_workers) = run_with(arena);

    assert_eq!(striped_workers, 4);
    assert_eq!(arena_workers, 1);
    assert_eq!(striped_out.num_rows(), expected_rows());
    assert_eq!(sorted_rows(&striped_out), sorted_rows(&arena_out));
}

#[test]
fn test_output_layout_is_outer_then_inner() {
    let (out, _) = run_with(Strategy::new(STRATEGY_ARENA, StrategyKind::ArenaMap));
    let names: Vec<&str> = out.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "qty", "id_right", "name"]);
    for i in 0..out.num_rows() {
        let row = out.row(i).unwrap();
        assert_eq!(row.value(0), row.value(2), "row {} joined on unequal keys", i);
        assert!(!row.is_null(0));
    }
}

#[test]
fn test_open_with_adaptor_runs_end_to_end() {
    let inner = inner_chunks(&sample_inner(), 16);
    let mut all = RowBatch::default();
    for chunk in &inner {
        all.append(chunk.clone()).unwrap();
    }
    let catalog = Arc::new(MemoryCatalog::new());
    catalog.register_table(3, "items", all).unwrap();
    let ctx = AdaptContext {
        catalog,
        hardware: Arc::new(FixedProbe::rates(0.2, 0.2)),
        inner: Some(InnerRelation {
            table_id: 3,
            table_name: "items".into(),
            key_columns: vec![0],
        }),
        config: Arc::new(AdaptConfig::default()),
    };
    let mut adaptor = Adaptor::new();
    adaptor
        .init_adaptor(&Registry::with_defaults(), HASH_JOIN, &ctx)
        .unwrap();

    let mut join = HashJoinExec::new(inner, outer_chunks(&sample_outer(), 8), inner_ctx(), outer_ctx());
    let strategy = join.open_with(&mut adaptor).expect("open");
    assert_eq!(join.strategy(), Some(&strategy));

    let out = join.run_to_end().expect("run");
    assert_eq!(out.num_rows(), expected_rows());
    let stats = join.stats();
    assert_eq!(stats.output_rows, expected_rows());
    assert_eq!(stats.probe_rows, 90);
    assert_eq!(stats.build_rows, 200);
    assert_eq!(stats.skipped_null_rows, 12);
    assert_eq!(
        join.container().map(|c| c.len()),
        Some(200 - 12),
        "null-key rows must not be inserted"
    );
}

#[test]
fn test_exec_before_bind_fails() {
    let mut join = HashJoinExec::new(
        inner_chunks(&[Some(1)], 4),
        outer_chunks(&[Some(1)], 4),
        inner_ctx(),
        outer_ctx(),
    );
    let mut out = RowBatch::default();
    assert!(matches!(join.exec_unit(&mut out), Err(ExecError::Exec(_))));
    assert!(matches!(join.run_to_end(), Err(ExecError::Exec(_))));
}

#[test]
fn test_empty_outer_side_yields_no_rows() {
    let mut join = HashJoinExec::new(
        inner_chunks(&[Some(1), Some(2)], 4),
        Vec::new(),
        inner_ctx(),
        outer_ctx(),
    );
    let strategy = Strategy::new(STRATEGY_ARENA, StrategyKind::ArenaMap);
    strategy.init(&mut join).unwrap();
    let mut out = RowBatch::default();
    assert!(!strategy.exec(&mut join, &mut out).unwrap());
    assert_eq!(out.num_rows(), 0);
    assert_eq!(join.stats().build_rows, 2);
}
