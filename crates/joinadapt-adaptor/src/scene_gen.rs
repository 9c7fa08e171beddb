//! Scene generation: fold a hardware snapshot and build-side statistics into
//! a generated scene.

use crate::scene::{Interval, Scene, SceneKind, SceneSnapshot};
use crate::snapshot::{HardwareSnapshot, StatsSnapshot};

pub const GENERATED_SCENE: &str = "generated";

pub trait SceneGenerator: Send {
    fn gen_scene(&self, hw: &HardwareSnapshot, stats: &StatsSnapshot) -> Scene;
}

/// Population variance of `counts`, or `None` for an empty list.
///
/// Higher values mean a more skewed key distribution.
pub fn balance_degree(counts: &[i64]) -> Option<f64> {
    if counts.is_empty() {
        return None;
    }
    let n = counts.len() as f64;
    let (sum, sum_sq) = counts.iter().fold((0.0, 0.0), |(s, sq), &c| {
        let c = c as f64;
        (s + c, sq + c * c)
    });
    let mean = sum / n;
    // Cancellation can leave a tiny negative residue.
    Some((sum_sq / n - mean * mean).max(0.0))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HashJoinSceneGenerator;

impl SceneGenerator for HashJoinSceneGenerator {
    fn gen_scene(&self, hw: &HardwareSnapshot, stats: &StatsSnapshot) -> Scene {
        let degrees: Vec<f64> = stats
            .keys
            .iter()
            .filter_map(|k| balance_degree(&k.most_common_counts))
            .collect();
        let balance = match (
            degrees.iter().copied().reduce(f64::min),
            degrees.iter().copied().reduce(f64::max),
        ) {
            (Some(low), Some(high)) => Interval::new(low, high),
            _ => Interval::unknown(),
        };

        let est_cardinality = stats
            .keys
            .iter()
            .filter_map(|k| k.distinct_count)
            .max()
            .unwrap_or(stats.relation_tuple_count)
            .max(0) as u64;

        let scene = Scene {
            name: GENERATED_SCENE.to_string(),
            kind: SceneKind::Generated,
            balance_degree: balance,
            cpu_usage: Interval::point(hw.cpu_usage_rate),
            mem_usage: Interval::point(hw.mem_usage_rate),
            est_cardinality,
            snapshot: Some(SceneSnapshot {
                hardware: *hw,
                stats: stats.clone(),
            }),
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(
            balance_low = balance.low,
            balance_high = balance.high,
            cpu = hw.cpu_usage_rate,
            mem = hw.mem_usage_rate,
            est_cardinality,
            "generated scene"
        );
        scene
    }
}
