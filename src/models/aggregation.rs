// Time bucket: one row per collection minute across the whole fleet.

use serde::{Deserialize, Serialize};

/// A fresh machine ranked by 1-minute load within one bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadLeader {
    pub hostname: String,
    pub load_short: f64,
    pub device_timestamp: i64,
}

/// Aggregates for one minute-truncated `collected_at` key.
/// Means fall back to 0 when no sample in the bucket carries the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBucket {
    pub key: String,
    pub sample_count: usize,
    pub mean_power: f64,
    /// Percent, after applying the collector's GPU scale.
    pub mean_gpu_busy: f64,
    pub mean_load_short: f64,
    pub mean_load_middle: f64,
    pub mean_load_long: f64,
    pub mean_cpu_usage: f64,
    pub thermal_issues: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub load_leaders: Vec<LoadLeader>,
}
