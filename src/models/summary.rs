// Per-machine summaries and the top-N views built from each machine's latest sample.

use serde::{Deserialize, Serialize};

use super::{NormalizedSnapshot, ThermalPressure};

/// Whole-history summary for one hostname.
/// Means are 0 when the machine never reported the field; that is not an observed zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineSummary {
    pub hostname: String,
    pub serial_number: Option<String>,
    pub record_count: usize,
    pub mean_power: f64,
    pub mean_gpu_busy: f64,
    pub mean_cpu_usage: f64,
    pub mean_cpu_sys: f64,
    pub mean_cpu_user: f64,
    /// Mean 1-minute load average.
    pub mean_load: f64,
    /// Read plus write operations per second.
    pub mean_disk_iops: f64,
    /// Most frequent thermal state; ties go to the state seen first.
    pub thermal_pressure: ThermalPressure,
    pub thermal_priority: u8,
    /// `collected_at` of the latest sample.
    pub last_seen: String,
    pub disk_used_pct: Option<f64>,
    pub disk_free_gib: Option<f64>,
    pub disk_total_gib: Option<f64>,
    pub latest: NormalizedSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadEntry {
    pub rank: usize,
    pub hostname: String,
    pub load_short: Option<f64>,
    pub load_middle: Option<f64>,
    pub load_long: Option<f64>,
    pub cpu_usage: Option<f64>,
    pub last_seen: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskEntry {
    pub rank: usize,
    pub hostname: String,
    pub disk_used_pct: Option<f64>,
    pub disk_free_gib: Option<f64>,
    pub disk_total_gib: Option<f64>,
    pub thermal_pressure: ThermalPressure,
    pub last_seen: String,
}
