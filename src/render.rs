// Dashboard sinks: the fleet report as an HTML page (tera) and as pretty JSON.
// Numbers are formatted here so the template only prints strings.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;
use tracing::{info, instrument};

use crate::config::ReportConfig;
use crate::models::{
    FleetAlert, FleetReport, MINUTE_KEY_LEN, MachineSummary, ThermalPressure, TimeBucket,
};
use crate::version;

const DASHBOARD_TEMPLATE: &str = include_str!("../templates/dashboard.html");
const DASHBOARD_NAME: &str = "dashboard.html";
const MISSING: &str = "n/a";
/// Most recent buckets shown in the load leaders table.
const LEADER_BUCKETS: usize = 24;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template: {0}")]
    Template(#[from] tera::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Serialize)]
struct DashboardView {
    version: String,
    generated_at: String,
    has_data: bool,
    total_records: usize,
    skipped_lines: usize,
    unique_machines: usize,
    peak_power: String,
    high_gpu_samples: usize,
    thermal_nominal: usize,
    thermal_warning: usize,
    thermal_critical: usize,
    thermal_other: usize,
    alerts: Vec<AlertView>,
    machines: Vec<MachineRow>,
    top_load: Vec<LoadRow>,
    least_disk: Vec<DiskRow>,
    leaders: Vec<LeaderRow>,
    timeline_json: String,
}

#[derive(Serialize)]
struct AlertView {
    level: &'static str,
    message: String,
}

#[derive(Serialize)]
struct MachineRow {
    hostname: String,
    thermal: &'static str,
    status_class: &'static str,
    row_class: String,
    power: String,
    gpu: String,
    cpu: String,
    load: String,
    disk_used: String,
    disk_free: String,
    disk_iops: String,
    records: usize,
    last_seen: String,
}

#[derive(Serialize)]
struct LoadRow {
    rank: usize,
    hostname: String,
    load_short: String,
    load_middle: String,
    load_long: String,
    cpu: String,
    last_seen: String,
}

#[derive(Serialize)]
struct LeaderRow {
    minute: String,
    rank: usize,
    hostname: String,
    load_short: String,
}

#[derive(Serialize)]
struct DiskRow {
    rank: usize,
    hostname: String,
    disk_used: String,
    disk_free: String,
    disk_total: String,
    thermal: &'static str,
    status_class: &'static str,
    last_seen: String,
}

pub fn render_html(report: &FleetReport, config: &ReportConfig) -> Result<String, RenderError> {
    let view = dashboard_view(report, config)?;
    let mut tera = Tera::default();
    tera.add_raw_template(DASHBOARD_NAME, DASHBOARD_TEMPLATE)?;
    let context = Context::from_serialize(&view)?;
    Ok(tera.render(DASHBOARD_NAME, &context)?)
}

pub fn render_json(report: &FleetReport) -> Result<String, RenderError> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Writes the HTML page and, when configured, the JSON report.
#[instrument(skip_all, fields(html_path = %config.html_path))]
pub fn write_outputs(report: &FleetReport, config: &ReportConfig) -> Result<(), RenderError> {
    let html = render_html(report, config)?;
    write_file(Path::new(&config.html_path), &html)?;
    if let Some(json_path) = &config.json_path {
        let json = render_json(report)?;
        write_file(Path::new(json_path), &json)?;
    }
    info!(
        has_data = !report.is_empty(),
        json = config.json_path.is_some(),
        "wrote dashboard"
    );
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<(), RenderError> {
    let io_error = |source: std::io::Error| RenderError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
    }
    std::fs::write(path, contents).map_err(io_error)
}

fn dashboard_view(report: &FleetReport, config: &ReportConfig) -> Result<DashboardView, RenderError> {
    // Timeline goes into a <script> block; keep "</" from closing it early.
    let timeline_json = serde_json::to_string(&report.timeline)?.replace("</", "<\\/");

    Ok(DashboardView {
        version: version::label(),
        generated_at: report.generated_at.clone(),
        has_data: !report.is_empty(),
        total_records: report.total_records,
        skipped_lines: report.skipped_lines,
        unique_machines: report.unique_machines,
        peak_power: format!("{:.1}", report.peak_power),
        high_gpu_samples: report.high_gpu_samples,
        thermal_nominal: report.thermal.nominal,
        thermal_warning: report.thermal.warning,
        thermal_critical: report.thermal.critical,
        thermal_other: report.thermal.other,
        alerts: report.alerts.iter().map(alert_view).collect(),
        machines: report
            .machines
            .iter()
            .map(|m| machine_row(m, config))
            .collect(),
        top_load: report
            .top_load
            .iter()
            .map(|e| LoadRow {
                rank: e.rank,
                hostname: e.hostname.clone(),
                load_short: fixed(e.load_short, 2),
                load_middle: fixed(e.load_middle, 2),
                load_long: fixed(e.load_long, 2),
                cpu: fixed(e.cpu_usage, 1),
                last_seen: minute(&e.last_seen),
            })
            .collect(),
        least_disk: report
            .least_disk
            .iter()
            .map(|e| DiskRow {
                rank: e.rank,
                hostname: e.hostname.clone(),
                disk_used: fixed(e.disk_used_pct, 1),
                disk_free: fixed(e.disk_free_gib, 1),
                disk_total: fixed(e.disk_total_gib, 1),
                thermal: e.thermal_pressure.as_str(),
                status_class: status_class(e.thermal_pressure),
                last_seen: minute(&e.last_seen),
            })
            .collect(),
        leaders: leader_rows(&report.timeline),
        timeline_json,
    })
}

/// Newest buckets first; buckets without fresh leaders are left out.
fn leader_rows(timeline: &[TimeBucket]) -> Vec<LeaderRow> {
    timeline
        .iter()
        .rev()
        .filter(|b| !b.load_leaders.is_empty())
        .take(LEADER_BUCKETS)
        .flat_map(|b| {
            b.load_leaders.iter().enumerate().map(move |(i, l)| LeaderRow {
                minute: minute(&b.key),
                rank: i + 1,
                hostname: l.hostname.clone(),
                load_short: format!("{:.2}", l.load_short),
            })
        })
        .collect()
}

fn machine_row(m: &MachineSummary, config: &ReportConfig) -> MachineRow {
    let mut flags = Vec::new();
    if m.mean_power > config.high_power_watts {
        flags.push("high-power");
    }
    if m.mean_gpu_busy > config.high_gpu_percent {
        flags.push("high-gpu");
    }
    MachineRow {
        hostname: m.hostname.clone(),
        thermal: m.thermal_pressure.as_str(),
        status_class: status_class(m.thermal_pressure),
        row_class: flags.join(" "),
        power: format!("{:.2}", m.mean_power),
        gpu: format!("{:.1}", m.mean_gpu_busy),
        cpu: format!("{:.1}", m.mean_cpu_usage),
        load: format!("{:.2}", m.mean_load),
        disk_used: fixed(m.disk_used_pct, 1),
        disk_free: fixed(m.disk_free_gib, 1),
        disk_iops: format!("{:.0}", m.mean_disk_iops),
        records: m.record_count,
        last_seen: minute(&m.last_seen),
    }
}

fn alert_view(alert: &FleetAlert) -> AlertView {
    match alert {
        FleetAlert::CriticalThermal { records } => AlertView {
            level: "critical",
            message: format!("{records} sample(s) report critical thermal pressure"),
        },
        FleetAlert::HighGpuUsage { samples } => AlertView {
            level: "warning",
            message: format!("{samples} sample(s) above the high GPU threshold"),
        },
        FleetAlert::HighPower { peak_watts } => AlertView {
            level: "warning",
            message: format!("peak package power {peak_watts:.1} W"),
        },
        FleetAlert::Healthy => AlertView {
            level: "healthy",
            message: "all machines within normal parameters".to_string(),
        },
    }
}

fn status_class(thermal: ThermalPressure) -> &'static str {
    match thermal {
        ThermalPressure::Critical => "status-critical",
        ThermalPressure::Warning | ThermalPressure::High => "status-warning",
        _ => "status-nominal",
    }
}

fn fixed(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => MISSING.to_string(),
    }
}

fn minute(collected_at: &str) -> String {
    collected_at.chars().take(MINUTE_KEY_LEN).collect::<String>().replace('T', " ")
}
