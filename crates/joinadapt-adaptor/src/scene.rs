//! Scenes: named regions of (balance degree, CPU usage, memory usage) space.

use serde::{Deserialize, Serialize};

use crate::snapshot::{HardwareSnapshot, StatsSnapshot};

/// Upper bound of a library axis that accepts any value at or above its
/// low end, including an unknown measure.
pub const UNBOUNDED: f64 = f64::MAX;

/// Closed interval `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub low: f64,
    pub high: f64,
}

impl Interval {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub const fn point(v: f64) -> Self {
        Self { low: v, high: v }
    }

    /// Range used when a measure could not be computed. Its infinite upper
    /// bound keeps it out of every finite library interval; only an axis
    /// spanning `[0, UNBOUNDED]` accepts it.
    pub const fn unknown() -> Self {
        Self {
            low: 0.0,
            high: f64::INFINITY,
        }
    }

    /// Inclusive containment. Comparisons involving NaN are false, so a NaN
    /// bound never matches.
    pub fn contains(&self, other: &Interval) -> bool {
        let high_ok = if self.high == UNBOUNDED {
            !other.high.is_nan()
        } else {
            other.high <= self.high
        };
        self.low <= other.low && high_ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneKind {
    /// Produced from live measurements; carries a snapshot.
    Generated,
    /// Configured in the scene library.
    Library,
}

/// The measurements a generated scene was derived from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub hardware: HardwareSnapshot,
    pub stats: StatsSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    pub kind: SceneKind,
    pub balance_degree: Interval,
    pub cpu_usage: Interval,
    pub mem_usage: Interval,
    #[serde(default)]
    pub est_cardinality: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SceneSnapshot>,
}

impl Scene {
    /// A library scene covering the given ranges.
    pub fn library(
        name: impl Into<String>,
        balance_degree: Interval,
        cpu_usage: Interval,
        mem_usage: Interval,
    ) -> Self {
        Self {
            name: name.into(),
            kind: SceneKind::Library,
            balance_degree,
            cpu_usage,
            mem_usage,
            est_cardinality: 0,
            snapshot: None,
        }
    }

    /// Whether every range of `other` lies inside the matching range of
    /// `self`.
    pub fn contains(&self, other: &Scene) -> bool {
        self.balance_degree.contains(&other.balance_degree)
            && self.cpu_usage.contains(&other.cpu_usage)
            && self.mem_usage.contains(&other.mem_usage)
    }
}
