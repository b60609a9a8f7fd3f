// Fleet report: everything the dashboard renders, in one serializable value.

use serde::{Deserialize, Serialize};

use super::{DiskEntry, LoadEntry, MachineSummary, TimeBucket};

/// Record counts per thermal class over the whole history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThermalDistribution {
    pub nominal: usize,
    /// Warning and High.
    pub warning: usize,
    pub critical: usize,
    /// Heavy and Unknown.
    pub other: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum FleetAlert {
    CriticalThermal { records: usize },
    HighGpuUsage { samples: usize },
    HighPower { peak_watts: f64 },
    Healthy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetReport {
    pub generated_at: String,
    pub total_records: usize,
    /// History lines that could not be parsed.
    pub skipped_lines: usize,
    pub unique_machines: usize,
    pub peak_power: f64,
    pub high_gpu_samples: usize,
    pub thermal: ThermalDistribution,
    pub alerts: Vec<FleetAlert>,
    /// Ascending by bucket key.
    pub timeline: Vec<TimeBucket>,
    /// Fleet priority order.
    pub machines: Vec<MachineSummary>,
    pub top_load: Vec<LoadEntry>,
    pub least_disk: Vec<DiskEntry>,
}

impl FleetReport {
    pub fn is_empty(&self) -> bool {
        self.total_records == 0
    }
}
