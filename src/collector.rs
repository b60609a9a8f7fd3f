// Datatable import: turn an already-fetched usage_stats datatables response into
// raw history records and append them. Values are stored as received; the
// normalizer decides what they mean when the log is read.

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::history_log::{HistoryLog, LogError};
use crate::models::{FieldValue, RawSnapshot};

/// `collected_at` format written by the collector (local time, microseconds).
pub const COLLECTED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Columns requested by the scheduled collector, in response order.
pub const DEFAULT_COLUMNS: &[&str] = &[
    "machine.serial_number",
    "machine.hostname",
    "usage_stats.timestamp",
    "usage_stats.thermal_pressure",
    "usage_stats.package_watts",
    "usage_stats.gpu_busy",
    "usage_stats.freq_hz",
    "usage_stats.freq_ratio",
    "usage_stats.gpu_freq_mhz",
    "usage_stats.backlight",
    "usage_stats.keyboard_backlight",
    "usage_stats.ibyte_rate",
    "usage_stats.obyte_rate",
    "usage_stats.rbytes_per_s",
    "usage_stats.wbytes_per_s",
    "usage_stats.cpu_idle",
    "usage_stats.cpu_sys",
    "usage_stats.cpu_user",
    "usage_stats.load_avg",
    "diskreport.totalsize",
    "diskreport.freespace",
    "diskreport.percentage",
];

pub fn default_columns() -> Vec<String> {
    DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect()
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("datatables API error: {0}")]
    Api(String),
    #[error("invalid datatables response: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Log(#[from] LogError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatatableResponse {
    #[serde(default)]
    pub data: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    pub records_filtered: Option<u64>,
    #[serde(default)]
    pub records_total: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl DatatableResponse {
    /// Reported record count, falling back to the number of rows.
    pub fn record_count(&self) -> usize {
        self.records_filtered
            .or(self.records_total)
            .map(|n| n as usize)
            .unwrap_or(self.data.len())
    }
}

pub fn parse_response(body: &str) -> Result<DatatableResponse, ImportError> {
    let response: DatatableResponse = serde_json::from_str(body)?;
    if let Some(error) = &response.error {
        return Err(ImportError::Api(error.clone()));
    }
    Ok(response)
}

/// One RawSnapshot per row. Rows without a string hostname are skipped.
pub fn snapshots_from_response<S: AsRef<str>>(
    response: &DatatableResponse,
    columns: &[S],
    collected_at: &str,
) -> Vec<RawSnapshot> {
    let mut out = Vec::with_capacity(response.data.len());
    for (row_idx, row) in response.data.iter().enumerate() {
        let mut snapshot = RawSnapshot {
            collected_at: collected_at.to_string(),
            ..RawSnapshot::default()
        };
        let mut hostname = None;
        for (column, cell) in columns.iter().zip(row.iter()) {
            let column = column.as_ref();
            if column == "machine.hostname" {
                hostname = cell.as_str().map(str::to_string);
                continue;
            }
            assign(&mut snapshot, column, FieldValue::from_json(cell));
        }
        match hostname {
            Some(h) if !h.is_empty() => {
                snapshot.hostname = h;
                out.push(snapshot);
            }
            _ => warn!(row = row_idx, "skipping datatables row without hostname"),
        }
    }
    out
}

/// Parses a response body, converts its rows and appends them to the history log.
#[instrument(skip(body, columns, log))]
pub fn import<S: AsRef<str>>(
    body: &str,
    columns: &[S],
    log: &HistoryLog,
    collected_at: &str,
) -> Result<usize, ImportError> {
    let response = parse_response(body)?;
    let snapshots = snapshots_from_response(&response, columns, collected_at);
    let appended = log.append(&snapshots)?;
    info!(
        reported = response.record_count(),
        appended, "imported datatables response"
    );
    Ok(appended)
}

fn assign(snapshot: &mut RawSnapshot, column: &str, value: Option<FieldValue>) {
    let slot = match column {
        "machine.serial_number" => &mut snapshot.serial_number,
        "usage_stats.timestamp" => &mut snapshot.device_timestamp,
        "usage_stats.thermal_pressure" => &mut snapshot.thermal_pressure,
        "usage_stats.package_watts" => &mut snapshot.package_watts,
        "usage_stats.gpu_busy" => &mut snapshot.gpu_busy,
        "usage_stats.cpu_idle" => &mut snapshot.cpu_idle,
        "usage_stats.cpu_sys" => &mut snapshot.cpu_sys,
        "usage_stats.cpu_user" => &mut snapshot.cpu_user,
        "usage_stats.load_avg" => &mut snapshot.load_avg,
        "usage_stats.rops_per_s" => &mut snapshot.rops_per_s,
        "usage_stats.wops_per_s" => &mut snapshot.wops_per_s,
        "diskreport.totalsize" => &mut snapshot.disk_total,
        "diskreport.freespace" => &mut snapshot.disk_free,
        "diskreport.percentage" => &mut snapshot.disk_used_pct,
        _ => return,
    };
    *slot = value;
}
