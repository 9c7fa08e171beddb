//! Adaptor configuration: scene library, strategy library, their mapping and
//! the tuning knobs the default library is built from.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::mapper::Mapper;
use crate::scene::{Interval, Scene, UNBOUNDED};
use crate::strategy::{Strategy, StrategyKind};

pub const SCENE_MEMORY_PRESSURE: &str = "memory_pressure";
pub const SCENE_BALANCED: &str = "balanced";
pub const SCENE_SKEWED: &str = "skewed";

pub const STRATEGY_STRIPED: &str = "striped_map";
pub const STRATEGY_ARENA: &str = "arena_map";

/// Strategies configured for one library scene, most preferred first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneStrategies {
    pub scene: String,
    pub strategies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptConfig {
    /// Matched in order; the first containing scene wins.
    pub scenes: Vec<Scene>,

    /// The first entry doubles as the default strategy.
    pub strategies: Vec<Strategy>,

    pub mapping: Vec<SceneStrategies>,

    /// Balance degree separating the balanced and skewed scenes.
    ///
    /// The balance degree is the variance of raw most-common-value counts,
    /// so it grows with the square of the counts: MCV counts of 95..=105
    /// already give 10. The default of 1.0 keeps only near-exact uniformity
    /// on the striped map, and `[4, 1]` (variance 2.25) on the arena. Tables
    /// with large per-value counts need a higher threshold
    /// (`JOINADAPT_SKEW_THRESHOLD`).
    pub skew_threshold: f64,

    /// Memory usage rate at which the memory-pressure scene starts.
    pub memory_pressure_threshold: f64,

    /// Writers used by the striped strategy.
    pub striped_build_concurrency: usize,

    /// Rows per output chunk of the join operator.
    pub max_chunk_size: usize,

    /// Refresh catalog statistics before reading them.
    pub analyze_before_read: bool,
}

impl Default for AdaptConfig {
    fn default() -> Self {
        Self::with_thresholds(1.0, 0.85, 4)
    }
}

impl AdaptConfig {
    /// Default library built around the given knobs.
    ///
    /// Scenes, in match order:
    /// - `memory_pressure`: any balance (unknown included), mem in
    ///   `[memory_pressure_threshold, 1]` -> arena
    /// - `balanced`: balance in `[0, skew_threshold]` -> striped
    /// - `skewed`: balance in `[skew_threshold, UNBOUNDED]` -> arena
    pub fn with_thresholds(
        skew_threshold: f64,
        memory_pressure_threshold: f64,
        striped_build_concurrency: usize,
    ) -> Self {
        let any_rate = Interval::new(0.0, 1.0);
        let scenes = vec![
            Scene::library(
                SCENE_MEMORY_PRESSURE,
                Interval::new(0.0, UNBOUNDED),
                any_rate,
                Interval::new(memory_pressure_threshold, 1.0),
            ),
            Scene::library(
                SCENE_BALANCED,
                Interval::new(0.0, skew_threshold),
                any_rate,
                any_rate,
            ),
            Scene::library(
                SCENE_SKEWED,
                Interval::new(skew_threshold, UNBOUNDED),
                any_rate,
                any_rate,
            ),
        ];
        let strategies = vec![
            Strategy::new(
                STRATEGY_STRIPED,
                StrategyKind::StripedMap {
                    build_concurrency: striped_build_concurrency,
                },
            ),
            Strategy::new(STRATEGY_ARENA, StrategyKind::ArenaMap),
        ];
        let mapping = [
            (SCENE_MEMORY_PRESSURE, STRATEGY_ARENA),
            (SCENE_BALANCED, STRATEGY_STRIPED),
            (SCENE_SKEWED, STRATEGY_ARENA),
        ]
        .into_iter()
        .map(|(scene, strategy)| SceneStrategies {
            scene: scene.to_string(),
            strategies: vec![strategy.to_string()],
        })
        .collect();

        Self {
            scenes,
            strategies,
            mapping,
            skew_threshold,
            memory_pressure_threshold,
            striped_build_concurrency,
            max_chunk_size: 1024,
            analyze_before_read: true,
        }
    }

    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `JOINADAPT_SKEW_THRESHOLD`: balance degree where skew starts
    /// - `JOINADAPT_MEM_PRESSURE`: memory usage rate where pressure starts
    /// - `JOINADAPT_BUILD_CONCURRENCY`: striped build writers
    /// - `JOINADAPT_MAX_CHUNK_SIZE`: rows per output chunk
    /// - `JOINADAPT_ANALYZE`: `true`/`false`, refresh stats before reading
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut skew = defaults.skew_threshold;
        let mut pressure = defaults.memory_pressure_threshold;
        let mut concurrency = defaults.striped_build_concurrency;

        if let Ok(s) = std::env::var("JOINADAPT_SKEW_THRESHOLD") {
            if let Ok(v) = s.parse::<f64>() {
                skew = v;
            }
        }

        if let Ok(s) = std::env::var("JOINADAPT_MEM_PRESSURE") {
            if let Ok(v) = s.parse::<f64>() {
                pressure = v;
            }
        }

        if let Ok(s) = std::env::var("JOINADAPT_BUILD_CONCURRENCY") {
            if let Ok(v) = s.parse::<usize>() {
                concurrency = v;
            }
        }

        let mut cfg = Self::with_thresholds(skew, pressure, concurrency);

        if let Ok(s) = std::env::var("JOINADAPT_MAX_CHUNK_SIZE") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.max_chunk_size = v;
            }
        }

        if let Ok(s) = std::env::var("JOINADAPT_ANALYZE") {
            if let Ok(v) = s.parse::<bool>() {
                cfg.analyze_before_read = v;
            }
        }

        cfg
    }

    /// Check that every library scene maps to known strategies.
    pub fn validate(&self) -> Result<()> {
        Mapper::new(self).map(|_| ())
    }
}
