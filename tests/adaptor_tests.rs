//! Adaptor lifecycle and end-to-end decisions

use joinadapt_adaptor::config::{STRATEGY_ARENA, STRATEGY_STRIPED};
use joinadapt_adaptor::registry::GeneratorPair;
use joinadapt_adaptor::{
    AdaptConfig, AdaptContext, AdaptError, Adaptor, AdaptorState, FixedProbe, HardwareProbe,
    HardwareSnapshot, HashJoinParamGenerator, HashJoinSceneGenerator, InnerRelation,
    MemoryCatalog, ParamGenerator, Registry, StatsCatalog, StrategyKind, HASH_JOIN,
};
use joinadapt_core::{Column, RowBatch, Scalar};
use std::sync::Arc;

const TABLE_ID: i64 = 11;

struct BrokenCatalog;

impl StatsCatalog for BrokenCatalog {
    fn execute(&self, sql: &str) -> joinadapt_adaptor::Result<Vec<Vec<Scalar>>> {
        Err(AdaptError::Catalog(format!("connection refused: {}", sql)))
    }
}

struct BrokenProbe;

impl HardwareProbe for BrokenProbe {
    fn sample(&self) -> joinadapt_adaptor::Result<HardwareSnapshot> {
        Err(AdaptError::Param("no sensors".into()))
    }
}

fn catalog_with_keys(keys: &[i64]) -> Arc<MemoryCatalog> {
    let catalog = Arc::new(MemoryCatalog::new());
    catalog
        .register_table(
            TABLE_ID,
            "orders",
            RowBatch::new(vec![Column::new(
                "k",
                keys.iter().map(|k| Scalar::I64(*k)).collect(),
            )]),
        )
        .expect("register table");
    catalog
}

fn context(catalog: Arc<dyn StatsCatalog>, cpu: f64, mem: f64) -> AdaptContext {
    AdaptContext {
        catalog,
        hardware: Arc::new(FixedProbe::rates(cpu, mem)),
        inner: Some(InnerRelation {
            table_id: TABLE_ID,
            table_name: "orders".into(),
            key_columns: vec![0],
        }),
        config: Arc::new(AdaptConfig::default()),
    }
}

fn ready_adaptor(ctx: &AdaptContext) -> Adaptor {
    let mut adaptor = Adaptor::new();
    adaptor
        .init_adaptor(&Registry::with_defaults(), HASH_JOIN, ctx)
        .expect("init adaptor");
    adaptor
}

#[test]
fn test_skewed_keys_choose_single_writer_arena() {
    let ctx = context(catalog_with_keys(&[1, 1, 1, 1, 5]), 0.3, 0.3);
    let mut adaptor = ready_adaptor(&ctx);

    let strategy = adaptor.adapt().expect("adapt");
    assert_eq!(strategy.name, STRATEGY_ARENA);
    assert_eq!(strategy.kind, StrategyKind::ArenaMap);
    assert_eq!(strategy.build_concurrency(), 1);
    let json = serde_json::to_value(&strategy).expect("serialize strategy");
    assert_eq!(json["kind"]["type"], "arena_map");

    // Counts [4, 1] give a population variance of 2.25.
    let scene = adaptor.last_scene().expect("scene recorded");
    assert_eq!(scene.balance_degree.low, 2.25);
    assert_eq!(scene.balance_degree.high, 2.25);
    assert_eq!(scene.est_cardinality, 2);
    assert_eq!(adaptor.state(), AdaptorState::Decided);
}

#[test]
fn test_uniform_keys_choose_concurrent_striped_map() {
    let ctx = context(catalog_with_keys(&[1, 2, 3, 4, 5]), 0.3, 0.3);
    let mut adaptor = ready_adaptor(&ctx);

    let strategy = adaptor.adapt().expect("adapt");
    assert_eq!(strategy.name, STRATEGY_STRIPED);
    assert!(strategy.build_concurrency() > 1);
    assert_eq!(strategy.est_cardinality, 5);
    assert_eq!(adaptor.strategy(), Some(&strategy));
}

#[test]
fn test_failed_adapt_clears_previous_decision() {
    let catalog = catalog_with_keys(&[1, 2, 3, 4, 5]);
    let ctx = context(catalog.clone(), 0.3, 0.3);
    let mut adaptor = ready_adaptor(&ctx);
    adaptor.adapt().expect("first adapt");
    assert_eq!(adaptor.state(), AdaptorState::Decided);

    // Same id under a new name: analyzing "orders" now fails.
    catalog
        .register_table(TABLE_ID, "renamed", RowBatch::default())
        .expect("replace table");
    let err = adaptor.adapt().unwrap_err();
    assert!(matches!(err, AdaptError::Catalog(_)));
    assert_eq!(adaptor.strategy(), None);
    assert!(adaptor.last_scene().is_none());
    assert_eq!(adaptor.state(), AdaptorState::Ready);
}

#[test]
fn test_adapt_before_init_is_config_error() {
    let mut adaptor = Adaptor::new();
    assert_eq!(adaptor.state(), AdaptorState::Uninitialized);
    assert!(matches!(adaptor.adapt(), Err(AdaptError::Config(_))));
    assert!(matches!(
        adaptor.adapt_or_default(10),
        Err(AdaptError::Config(_))
    ));
}

#[test]
fn test_unregistered_name_fails_init() {
    let ctx = context(catalog_with_keys(&[1]), 0.3, 0.3);
    let mut adaptor = Adaptor::new();
    let err = adaptor
        .init_adaptor(&Registry::with_defaults(), "merge_join", &ctx)
        .unwrap_err();
    assert!(matches!(err, AdaptError::Config(msg) if msg.contains("no such registered name")));
    assert_eq!(adaptor.state(), AdaptorState::Uninitialized);
}

#[test]
fn test_init_rejects_partial_mapping() {
    let mut config = AdaptConfig::default();
    config.mapping.pop();
    let mut ctx = context(catalog_with_keys(&[1]), 0.3, 0.3);
    ctx.config = Arc::new(config);
    let mut adaptor = Adaptor::new();
    assert!(matches!(
        adaptor.init_adaptor(&Registry::with_defaults(), HASH_JOIN, &ctx),
        Err(AdaptError::Config(_))
    ));
}

#[test]
fn test_catalog_failure_aborts_adapt_but_default_recovers() {
    let ctx = context(Arc::new(BrokenCatalog), 0.3, 0.3);
    let mut adaptor = ready_adaptor(&ctx);

    let err = adaptor.adapt().unwrap_err();
    assert!(err.is_input_error());
    assert!(matches!(err, AdaptError::Catalog(_)));
    assert_eq!(adaptor.state(), AdaptorState::Ready);

    let fallback = adaptor.adapt_or_default(500).expect("fallback");
    assert_eq!(fallback.name, STRATEGY_STRIPED);
    assert_eq!(fallback.est_cardinality, 500);
    assert!(adaptor.last_scene().is_none());
    assert_eq!(adaptor.state(), AdaptorState::Decided);
}

#[test]
fn test_hardware_failure_is_recoverable() {
    let mut ctx = context(catalog_with_keys(&[1, 2]), 0.3, 0.3);
    ctx.hardware = Arc::new(BrokenProbe);
    let mut adaptor = ready_adaptor(&ctx);
    assert!(matches!(adaptor.adapt(), Err(AdaptError::Param(_))));
    assert!(adaptor.adapt_or_default(0).is_ok());
}

#[test]
fn test_statistics_analyze_once_per_call() {
    let catalog = catalog_with_keys(&[1, 1, 2]);
    let inner = InnerRelation {
        table_id: TABLE_ID,
        table_name: "orders".into(),
        key_columns: vec![0],
    };
    let hw: Arc<dyn HardwareProbe> = Arc::new(FixedProbe::default());

    let analyzing = HashJoinParamGenerator::new(catalog.clone(), hw.clone(), Some(inner.clone()), true);
    analyzing.statistics().expect("stats");
    assert_eq!(catalog.analyze_count(), 1);
    let stats = analyzing.statistics().expect("stats");
    assert_eq!(catalog.analyze_count(), 2);
    assert_eq!(stats.relation_tuple_count, 3);
    assert_eq!(stats.keys[0].most_common_counts, vec![2, 1]);
    assert_eq!(stats.keys[0].distinct_count, Some(2));

    let passive = HashJoinParamGenerator::new(catalog.clone(), hw, Some(inner), false);
    passive.statistics().expect("stats");
    assert_eq!(catalog.analyze_count(), 2);
}

#[test]
fn test_non_base_inner_yields_empty_statistics() {
    let catalog = Arc::new(BrokenCatalog);
    let generator =
        HashJoinParamGenerator::new(catalog, Arc::new(FixedProbe::default()), None, true);
    let stats = generator.statistics().expect("no catalog access");
    assert!(stats.keys.is_empty());
    assert_eq!(stats.relation_tuple_count, 0);
}

#[test]
fn test_custom_registration_replaces_default() {
    let ctx = context(catalog_with_keys(&[1, 1, 1, 1, 5]), 0.3, 0.3);
    let mut registry = Registry::with_defaults();
    // Same generators, but statistics are never consulted.
    registry.register(HASH_JOIN, |ctx: &AdaptContext| -> GeneratorPair {
        (
            Box::new(HashJoinParamGenerator::new(
                ctx.catalog.clone(),
                ctx.hardware.clone(),
                None,
                false,
            )),
            Box::new(HashJoinSceneGenerator),
        )
    });

    let mut adaptor = Adaptor::new();
    adaptor.init_adaptor(&registry, HASH_JOIN, &ctx).unwrap();
    let strategy = adaptor.adapt().unwrap();
    // Unknown balance matches no library scene.
    assert!(adaptor.last_scene().is_some());
    assert_eq!(strategy.name, STRATEGY_STRIPED);
}
