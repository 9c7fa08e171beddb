//! joinadapt CLI: inspect adaptation decisions and run adaptive hash joins.

mod load;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use joinadapt_adaptor::{
    AdaptConfig, AdaptContext, Adaptor, FixedProbe, HardwareProbe, InnerRelation, MemoryCatalog,
    Registry, SysinfoProbe, HASH_JOIN,
};
use joinadapt_core::prelude::{Column, DataType, HashContext, RowBatch, Scalar};
use joinadapt_exec::HashJoinExec;
use serde_json::json;
use tracing_subscriber::EnvFilter;

const INNER_TABLE_ID: i64 = 1;

#[derive(Parser)]
#[command(name = "joinadapt")]
#[command(about = "Adaptive hash-join build strategies", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the strategy chosen for a build side with the given join keys
    Adapt {
        /// Comma-separated integer join keys of the build side
        #[arg(long, value_delimiter = ',', required = true)]
        keys: Vec<i64>,

        /// CPU usage rate in [0, 1] (sampled from the host when omitted)
        #[arg(long)]
        cpu: Option<f64>,

        /// Memory usage rate in [0, 1] (sampled from the host when omitted)
        #[arg(long)]
        mem: Option<f64>,
    },

    /// Join two CSV files on a shared key column
    Join {
        /// Build-side CSV file
        #[arg(long)]
        inner: PathBuf,

        /// Probe-side CSV file
        #[arg(long)]
        outer: PathBuf,

        /// Join key column, present in both files
        #[arg(long)]
        key: String,

        /// Rows per loaded chunk (overrides config)
        #[arg(long)]
        chunk_rows: Option<usize>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Adapt { keys, cpu, mem } => run_adapt(keys, cpu, mem),
        Commands::Join {
            inner,
            outer,
            key,
            chunk_rows,
        } => run_join(&inner, &outer, &key, chunk_rows),
    };
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn hardware_probe(cpu: Option<f64>, mem: Option<f64>) -> Arc<dyn HardwareProbe> {
    match (cpu, mem) {
        (None, None) => Arc::new(SysinfoProbe),
        (cpu, mem) => Arc::new(FixedProbe::rates(cpu.unwrap_or(0.0), mem.unwrap_or(0.0))),
    }
}

fn run_adapt(
    keys: Vec<i64>,
    cpu: Option<f64>,
    mem: Option<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(AdaptConfig::from_env());
    let rows = keys.len() as u64;

    let catalog = Arc::new(MemoryCatalog::new());
    catalog.register_table(
        INNER_TABLE_ID,
        "inner",
        RowBatch::new(vec![Column::new(
            "k",
            keys.into_iter().map(Scalar::I64).collect(),
        )]),
    )?;

    let ctx = AdaptContext {
        catalog,
        hardware: hardware_probe(cpu, mem),
        inner: Some(InnerRelation {
            table_id: INNER_TABLE_ID,
            table_name: "inner".into(),
            key_columns: vec![0],
        }),
        config,
    };
    let mut adaptor = Adaptor::new();
    adaptor.init_adaptor(&Registry::with_defaults(), HASH_JOIN, &ctx)?;
    let strategy = adaptor.adapt_or_default(rows)?;

    let scene = adaptor.last_scene().map(|s| {
        json!({
            "balance_degree": s.balance_degree,
            "cpu_usage": s.cpu_usage,
            "mem_usage": s.mem_usage,
            "est_cardinality": s.est_cardinality,
        })
    });
    let out = json!({
        "scene": scene,
        "strategy": strategy,
        "build_concurrency": strategy.build_concurrency(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn run_join(
    inner_path: &Path,
    outer_path: &Path,
    key: &str,
    chunk_rows: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(AdaptConfig::from_env());
    let chunk_rows = chunk_rows.unwrap_or(config.max_chunk_size).max(1);

    let inner = load::read_csv(inner_path, chunk_rows)?;
    let outer = load::read_csv(outer_path, chunk_rows)?;
    let inner_key = inner.key_index(key)?;
    let outer_key = outer.key_index(key)?;
    match (inner.key_type(inner_key), outer.key_type(outer_key)) {
        (Some(a), Some(b)) if key_types_compatible(a, b) => {}
        (a, b) => {
            return Err(format!(
                "key column {} is {:?} on the inner side but {:?} on the outer side",
                key, a, b
            )
            .into())
        }
    }

    let inner_ctx = HashContext::new(inner.schema.types(), vec![inner_key]);
    let outer_ctx = HashContext::new(outer.schema.types(), vec![outer_key]);

    let table_name = inner_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("inner")
        .to_string();
    let catalog = Arc::new(MemoryCatalog::new());
    catalog.register_table(INNER_TABLE_ID, table_name.clone(), inner.concat()?)?;

    let ctx = AdaptContext {
        catalog,
        hardware: Arc::new(SysinfoProbe),
        inner: Some(InnerRelation {
            table_id: INNER_TABLE_ID,
            table_name,
            key_columns: vec![inner_key as i64],
        }),
        config: config.clone(),
    };
    let mut adaptor = Adaptor::new();
    adaptor.init_adaptor(&Registry::with_defaults(), HASH_JOIN, &ctx)?;

    let mut join = HashJoinExec::new(inner.chunks, outer.chunks, inner_ctx, outer_ctx)
        .with_max_chunk_size(config.max_chunk_size);
    let strategy = join.open_with(&mut adaptor)?;
    let output = join.run_to_end()?;

    let out = json!({
        "rows": output.num_rows(),
        "columns": join.output_names(),
        "strategy": strategy,
        "build_concurrency": join.build_concurrency(),
        "stats": join.stats(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn key_types_compatible(a: DataType, b: DataType) -> bool {
    use DataType::*;
    matches!(
        (a, b),
        (Int32 | Int64, Int32 | Int64) | (Float32 | Float64, Float32 | Float64)
    ) || a == b
}
