//! Hardware probes.

use sysinfo::System;

use crate::error::{AdaptError, Result};
use crate::snapshot::HardwareSnapshot;

pub trait HardwareProbe: Send + Sync {
    fn sample(&self) -> Result<HardwareSnapshot>;
}

/// Reads host CPU and memory usage through `sysinfo`.
///
/// Each sample blocks for sysinfo's minimum CPU update interval, since CPU
/// usage is the delta between two refreshes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysinfoProbe;

impl HardwareProbe for SysinfoProbe {
    fn sample(&self) -> Result<HardwareSnapshot> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(AdaptError::Param(
                "hardware sampling is not supported on this platform".into(),
            ));
        }

        let mut sys = System::new();
        sys.refresh_cpu();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        sys.refresh_cpu();
        sys.refresh_memory();

        let total = sys.total_memory();
        if total == 0 {
            return Err(AdaptError::Param("total memory reported as zero".into()));
        }
        let cpu = f64::from(sys.global_cpu_info().cpu_usage()) / 100.0;
        let snapshot = HardwareSnapshot {
            cpu_usage_rate: cpu.clamp(0.0, 1.0),
            mem_usage_rate: (sys.used_memory() as f64 / total as f64).clamp(0.0, 1.0),
            mem_capacity: total as f64,
            available_memory: sys.available_memory() as f64,
        };
        #[cfg(feature = "tracing")]
        tracing::trace!(
            cpu = snapshot.cpu_usage_rate,
            mem = snapshot.mem_usage_rate,
            "sampled hardware"
        );
        Ok(snapshot)
    }
}

/// Returns the same snapshot on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedProbe(pub HardwareSnapshot);

impl FixedProbe {
    /// A probe reporting the given CPU and memory usage rates.
    pub fn rates(cpu_usage_rate: f64, mem_usage_rate: f64) -> Self {
        Self(HardwareSnapshot {
            cpu_usage_rate,
            mem_usage_rate,
            ..HardwareSnapshot::default()
        })
    }
}

impl HardwareProbe for FixedProbe {
    fn sample(&self) -> Result<HardwareSnapshot> {
        Ok(self.0)
    }
}
