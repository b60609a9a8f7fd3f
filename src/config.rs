use serde::Deserialize;

use crate::models::{GpuBusyScale, ThermalPressure};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub log: LogConfig,
    #[serde(default)]
    pub normalize: NormalizeConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Append-only JSON Lines history file.
    pub path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NormalizeConfig {
    /// Unit the collector used for `gpu_busy`.
    #[serde(default)]
    pub gpu_busy_scale: GpuBusyScale,
}

/// Divisor for bucket mean power and mean GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeanDenominator {
    /// Samples that carry the field.
    #[default]
    Present,
    /// Every sample in the bucket; missing values count as zero.
    Bucket,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregationConfig {
    #[serde(default)]
    pub mean_denominator: MeanDenominator,
    /// Thermal states counted as a bucket's thermal issues.
    #[serde(default = "default_thermal_issue_states")]
    pub thermal_issue_states: Vec<ThermalPressure>,
    /// Only the most recent N records (by `collected_at`) feed the timeline. Unbounded when unset.
    #[serde(default)]
    pub trend_window_records: Option<usize>,
    #[serde(default)]
    pub leaders: LeaderConfig,
}

fn default_thermal_issue_states() -> Vec<ThermalPressure> {
    vec![
        ThermalPressure::Warning,
        ThermalPressure::High,
        ThermalPressure::Critical,
    ]
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            mean_denominator: MeanDenominator::default(),
            thermal_issue_states: default_thermal_issue_states(),
            trend_window_records: None,
            leaders: LeaderConfig::default(),
        }
    }
}

/// Per-bucket top machines by 1-minute load, restricted to machines that reported recently.
#[derive(Debug, Clone, Deserialize)]
pub struct LeaderConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_leader_count")]
    pub count: usize,
    /// Device timestamps older than this (relative to now) are stale.
    #[serde(default = "default_freshness_window_secs")]
    pub freshness_window_secs: u64,
}

fn default_leader_count() -> usize {
    3
}

fn default_freshness_window_secs() -> u64 {
    2 * 3600
}

impl Default for LeaderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            count: default_leader_count(),
            freshness_window_secs: default_freshness_window_secs(),
        }
    }
}

/// Which clock decides a machine's latest sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecencyKey {
    #[default]
    CollectedAt,
    DeviceTimestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankingConfig {
    #[serde(default)]
    pub recency_key: RecencyKey,
    #[serde(default = "default_top_count")]
    pub top_load_count: usize,
    #[serde(default = "default_top_count")]
    pub top_disk_count: usize,
}

fn default_top_count() -> usize {
    10
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            recency_key: RecencyKey::default(),
            top_load_count: default_top_count(),
            top_disk_count: default_top_count(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    /// A GPU sample above this percentage counts as high usage.
    #[serde(default = "default_high_gpu_percent")]
    pub high_gpu_percent: f64,
    /// Raise the GPU alert when high-usage samples exceed this count.
    #[serde(default = "default_high_gpu_sample_limit")]
    pub high_gpu_sample_limit: usize,
    #[serde(default = "default_peak_power_watts")]
    pub peak_power_watts: f64,
    /// The fleet is healthy when there are no critical records and fewer high-GPU samples than this.
    #[serde(default = "default_healthy_high_gpu_limit")]
    pub healthy_high_gpu_limit: usize,
}

fn default_high_gpu_percent() -> f64 {
    80.0
}

fn default_high_gpu_sample_limit() -> usize {
    10
}

fn default_peak_power_watts() -> f64 {
    15.0
}

fn default_healthy_high_gpu_limit() -> usize {
    5
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            high_gpu_percent: default_high_gpu_percent(),
            high_gpu_sample_limit: default_high_gpu_sample_limit(),
            peak_power_watts: default_peak_power_watts(),
            healthy_high_gpu_limit: default_healthy_high_gpu_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    pub html_path: String,
    #[serde(default)]
    pub json_path: Option<String>,
    /// Machine rows above this mean power are flagged.
    #[serde(default = "default_row_high_power_watts")]
    pub high_power_watts: f64,
    /// Machine rows above this mean GPU percentage are flagged.
    #[serde(default = "default_row_high_gpu_percent")]
    pub high_gpu_percent: f64,
}

fn default_row_high_power_watts() -> f64 {
    8.0
}

fn default_row_high_gpu_percent() -> f64 {
    50.0
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.log.path.is_empty(), "log.path must be non-empty");
        anyhow::ensure!(
            !self.report.html_path.is_empty(),
            "report.html_path must be non-empty"
        );
        if let Some(json_path) = &self.report.json_path {
            anyhow::ensure!(
                !json_path.is_empty(),
                "report.json_path must be non-empty when set"
            );
        }
        anyhow::ensure!(
            !self
                .aggregation
                .thermal_issue_states
                .contains(&ThermalPressure::Unknown),
            "aggregation.thermal_issue_states contains an unknown state (expected Nominal, Warning, High, Heavy or Critical)"
        );
        if let Some(window) = self.aggregation.trend_window_records {
            anyhow::ensure!(
                window > 0,
                "aggregation.trend_window_records must be > 0 when set, got {}",
                window
            );
        }
        if self.aggregation.leaders.enabled {
            anyhow::ensure!(
                self.aggregation.leaders.count > 0,
                "aggregation.leaders.count must be > 0, got {}",
                self.aggregation.leaders.count
            );
            anyhow::ensure!(
                self.aggregation.leaders.freshness_window_secs > 0,
                "aggregation.leaders.freshness_window_secs must be > 0, got {}",
                self.aggregation.leaders.freshness_window_secs
            );
        }
        anyhow::ensure!(
            self.ranking.top_load_count > 0,
            "ranking.top_load_count must be > 0, got {}",
            self.ranking.top_load_count
        );
        anyhow::ensure!(
            self.ranking.top_disk_count > 0,
            "ranking.top_disk_count must be > 0, got {}",
            self.ranking.top_disk_count
        );
        for (key, value) in [
            ("alerts.high_gpu_percent", self.alerts.high_gpu_percent),
            ("alerts.peak_power_watts", self.alerts.peak_power_watts),
            ("report.high_power_watts", self.report.high_power_watts),
            ("report.high_gpu_percent", self.report.high_gpu_percent),
        ] {
            anyhow::ensure!(
                value.is_finite() && value >= 0.0,
                "{} must be a non-negative number, got {}",
                key,
                value
            );
        }
        Ok(())
    }
}
