// Snapshot models: raw history log lines and their typed (normalized) form.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Length of a minute-resolution ISO timestamp prefix (`YYYY-MM-DDTHH:MM`).
pub const MINUTE_KEY_LEN: usize = 16;

/// A loosely-typed field as stored in the history log.
/// Collector versions disagree on types, so anything the API sent is accepted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl FieldValue {
    /// Converts a datatables cell; JSON null is treated as absent.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Number(n) => Some(
                n.as_f64()
                    .map(FieldValue::Number)
                    .unwrap_or_else(|| FieldValue::Other(value.clone())),
            ),
            serde_json::Value::String(s) => Some(FieldValue::Text(s.clone())),
            other => Some(FieldValue::Other(other.clone())),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Number(v)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

/// One line of the history log: a single machine sample at one collection run.
/// Only `collected_at` and `hostname` are required; every metric may be absent or malformed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSnapshot {
    /// Ingest-side clock (ISO-8601), not the device clock.
    pub collected_at: String,
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<FieldValue>,
    /// Device-reported Unix seconds. Early collectors wrote this as `timestamp`.
    #[serde(default, alias = "timestamp", skip_serializing_if = "Option::is_none")]
    pub device_timestamp: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermal_pressure: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_watts: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_busy: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_idle: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_sys: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_user: Option<FieldValue>,
    /// Combined `"1m, 5m, 15m"` load string as delivered by the API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_avg: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_short: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_middle: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_long: Option<FieldValue>,
    /// Bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_total: Option<FieldValue>,
    /// Bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_free: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_used_pct: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rops_per_s: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wops_per_s: Option<FieldValue>,
}

impl RawSnapshot {
    /// Field-by-field decode of an already parsed JSON object. Fields with an unexpected
    /// shape become absent instead of failing the record; only `collected_at` and
    /// `hostname` must be strings. `device_timestamp` wins over `timestamp` when both are set.
    pub fn from_object(map: &serde_json::Map<String, serde_json::Value>) -> Option<Self> {
        let field = |key: &str| map.get(key).and_then(FieldValue::from_json);
        Some(Self {
            collected_at: map.get("collected_at")?.as_str()?.to_string(),
            hostname: map.get("hostname")?.as_str()?.to_string(),
            serial_number: field("serial_number"),
            device_timestamp: field("device_timestamp").or_else(|| field("timestamp")),
            thermal_pressure: field("thermal_pressure"),
            package_watts: field("package_watts"),
            gpu_busy: field("gpu_busy"),
            cpu_idle: field("cpu_idle"),
            cpu_sys: field("cpu_sys"),
            cpu_user: field("cpu_user"),
            load_avg: field("load_avg"),
            load_short: field("load_short"),
            load_middle: field("load_middle"),
            load_long: field("load_long"),
            disk_total: field("disk_total"),
            disk_free: field("disk_free"),
            disk_used_pct: field("disk_used_pct"),
            rops_per_s: field("rops_per_s"),
            wops_per_s: field("wops_per_s"),
        })
    }
}

/// Device thermal pressure as reported by the OS; unrecognized values map to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThermalPressure {
    Nominal,
    Warning,
    High,
    Heavy,
    Critical,
    #[serde(other)]
    Unknown,
}

impl ThermalPressure {
    /// Exact match against the known vocabulary.
    pub fn parse(s: &str) -> Self {
        match s {
            "Nominal" => ThermalPressure::Nominal,
            "Warning" => ThermalPressure::Warning,
            "High" => ThermalPressure::High,
            "Heavy" => ThermalPressure::Heavy,
            "Critical" => ThermalPressure::Critical,
            _ => ThermalPressure::Unknown,
        }
    }

    /// Fleet priority weight: Critical 3, Warning/High 2, Unknown 0, anything else 1.
    pub fn priority(self) -> u8 {
        match self {
            ThermalPressure::Critical => 3,
            ThermalPressure::Warning | ThermalPressure::High => 2,
            ThermalPressure::Unknown => 0,
            ThermalPressure::Nominal | ThermalPressure::Heavy => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ThermalPressure::Nominal => "Nominal",
            ThermalPressure::Warning => "Warning",
            ThermalPressure::High => "High",
            ThermalPressure::Heavy => "Heavy",
            ThermalPressure::Critical => "Critical",
            ThermalPressure::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ThermalPressure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a collector reported `gpu_busy`: a 0-1 fraction or an already scaled 0-100 percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuBusyScale {
    Fraction,
    #[default]
    Percent,
}

impl GpuBusyScale {
    pub fn to_percent(self, value: f64) -> f64 {
        match self {
            GpuBusyScale::Fraction => value * 100.0,
            GpuBusyScale::Percent => value,
        }
    }
}

/// Typed snapshot. `None` means missing, which is never the same as an observed zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedSnapshot {
    pub collected_at: String,
    pub hostname: String,
    pub serial_number: Option<String>,
    /// Device clock in Unix seconds; `None` when absent or zero.
    pub device_timestamp: Option<i64>,
    pub thermal_pressure: ThermalPressure,
    pub package_watts: Option<f64>,
    /// Raw value as collected; interpret through `gpu_busy_scale`.
    pub gpu_busy: Option<f64>,
    pub gpu_busy_scale: GpuBusyScale,
    pub cpu_idle: Option<f64>,
    pub cpu_sys: Option<f64>,
    pub cpu_user: Option<f64>,
    pub load_short: Option<f64>,
    pub load_middle: Option<f64>,
    pub load_long: Option<f64>,
    pub disk_total_gib: Option<f64>,
    pub disk_free_gib: Option<f64>,
    pub disk_used_pct: Option<f64>,
    pub rops_per_s: Option<f64>,
    pub wops_per_s: Option<f64>,
}

impl NormalizedSnapshot {
    /// Snapshot with only identity set and every metric missing.
    pub fn empty(hostname: impl Into<String>, collected_at: impl Into<String>) -> Self {
        Self {
            collected_at: collected_at.into(),
            hostname: hostname.into(),
            serial_number: None,
            device_timestamp: None,
            thermal_pressure: ThermalPressure::Unknown,
            package_watts: None,
            gpu_busy: None,
            gpu_busy_scale: GpuBusyScale::default(),
            cpu_idle: None,
            cpu_sys: None,
            cpu_user: None,
            load_short: None,
            load_middle: None,
            load_long: None,
            disk_total_gib: None,
            disk_free_gib: None,
            disk_used_pct: None,
            rops_per_s: None,
            wops_per_s: None,
        }
    }

    pub fn gpu_busy_percent(&self) -> Option<f64> {
        self.gpu_busy.map(|v| self.gpu_busy_scale.to_percent(v))
    }

    /// CPU usage as `100 - idle`.
    pub fn cpu_usage(&self) -> Option<f64> {
        self.cpu_idle.map(|idle| 100.0 - idle)
    }

    /// `collected_at` truncated to the minute (`YYYY-MM-DDTHH:MM`); shorter strings are returned whole.
    pub fn collected_minute(&self) -> &str {
        match self.collected_at.char_indices().nth(MINUTE_KEY_LEN) {
            Some((idx, _)) => &self.collected_at[..idx],
            None => &self.collected_at,
        }
    }
}
