// Fleet report: runs normalize -> bucket -> rank over the history and adds
// fleet-wide statistics and alerts for the dashboard.

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use crate::aggregation;
use crate::config::{AlertConfig, AppConfig};
use crate::history_log::LogContents;
use crate::models::{
    FleetAlert, FleetReport, NormalizedSnapshot, ThermalDistribution, ThermalPressure,
};
use crate::normalize;
use crate::ranking;

#[instrument(skip_all, fields(snapshots = contents.snapshots.len(), skipped = contents.errors.len()))]
pub fn build_report(contents: &LogContents, config: &AppConfig, now: DateTime<Utc>) -> FleetReport {
    let snapshots = normalize::normalize_all(&contents.snapshots, &config.normalize);

    let timeline = match config.aggregation.trend_window_records {
        Some(limit) => {
            let window = aggregation::recent_window(&snapshots, limit);
            aggregation::bucket(&window, &config.aggregation, now)
        }
        None => aggregation::bucket(&snapshots, &config.aggregation, now),
    };

    let summaries = ranking::summarize(&snapshots, config.ranking.recency_key);
    let top_load = ranking::top_load(&summaries, config.ranking.top_load_count);
    let least_disk = ranking::least_disk_free(&summaries, config.ranking.top_disk_count);
    let mut machines = summaries;
    ranking::sort_by_priority(&mut machines);

    let thermal = thermal_distribution(&snapshots);
    let peak_power = snapshots
        .iter()
        .filter_map(|s| s.package_watts)
        .fold(0.0, f64::max);
    let high_gpu_samples = snapshots
        .iter()
        .filter_map(|s| s.gpu_busy_percent())
        .filter(|gpu| *gpu > config.alerts.high_gpu_percent)
        .count();
    let alerts = if snapshots.is_empty() {
        Vec::new()
    } else {
        fleet_alerts(&thermal, high_gpu_samples, peak_power, &config.alerts)
    };

    let report = FleetReport {
        generated_at: now.to_rfc3339(),
        total_records: snapshots.len(),
        skipped_lines: contents.errors.len(),
        unique_machines: machines.len(),
        peak_power,
        high_gpu_samples,
        thermal,
        alerts,
        timeline,
        machines,
        top_load,
        least_disk,
    };
    info!(
        records = report.total_records,
        machines = report.unique_machines,
        buckets = report.timeline.len(),
        alerts = report.alerts.len(),
        "built fleet report"
    );
    report
}

pub fn thermal_distribution(snapshots: &[NormalizedSnapshot]) -> ThermalDistribution {
    let mut dist = ThermalDistribution::default();
    for s in snapshots {
        match s.thermal_pressure {
            ThermalPressure::Nominal => dist.nominal += 1,
            ThermalPressure::Warning | ThermalPressure::High => dist.warning += 1,
            ThermalPressure::Critical => dist.critical += 1,
            ThermalPressure::Heavy | ThermalPressure::Unknown => dist.other += 1,
        }
    }
    dist
}

pub fn fleet_alerts(
    thermal: &ThermalDistribution,
    high_gpu_samples: usize,
    peak_power: f64,
    config: &AlertConfig,
) -> Vec<FleetAlert> {
    let mut alerts = Vec::new();
    if thermal.critical > 0 {
        alerts.push(FleetAlert::CriticalThermal {
            records: thermal.critical,
        });
    }
    if high_gpu_samples > config.high_gpu_sample_limit {
        alerts.push(FleetAlert::HighGpuUsage {
            samples: high_gpu_samples,
        });
    }
    if peak_power > config.peak_power_watts {
        alerts.push(FleetAlert::HighPower {
            peak_watts: peak_power,
        });
    }
    if thermal.critical == 0 && high_gpu_samples < config.healthy_high_gpu_limit {
        alerts.push(FleetAlert::Healthy);
    }
    alerts
}
