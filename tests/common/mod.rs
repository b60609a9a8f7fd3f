// Shared test helpers
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use fleetwatch::config::AppConfig;
use fleetwatch::models::*;

pub const TEST_CONFIG: &str = r#"
[log]
path = "history.jsonl"

[report]
html_path = "dashboard.html"
"#;

pub fn test_config() -> AppConfig {
    AppConfig::load_from_str(TEST_CONFIG).expect("test config")
}

/// Fixed "now" for leader freshness: 2025-01-01T12:00:00Z.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
}

pub fn raw(hostname: &str, collected_at: &str) -> RawSnapshot {
    RawSnapshot {
        collected_at: collected_at.to_string(),
        hostname: hostname.to_string(),
        ..RawSnapshot::default()
    }
}

pub fn snapshot(hostname: &str, collected_at: &str) -> NormalizedSnapshot {
    NormalizedSnapshot::empty(hostname, collected_at)
}

/// Normalized sample with the fields most tests care about.
pub fn sample(
    hostname: &str,
    collected_at: &str,
    thermal: ThermalPressure,
    watts: Option<f64>,
    gpu: Option<f64>,
) -> NormalizedSnapshot {
    NormalizedSnapshot {
        thermal_pressure: thermal,
        package_watts: watts,
        gpu_busy: gpu,
        ..snapshot(hostname, collected_at)
    }
}

pub fn with_load(mut s: NormalizedSnapshot, short: f64, middle: f64, long: f64) -> NormalizedSnapshot {
    s.load_short = Some(short);
    s.load_middle = Some(middle);
    s.load_long = Some(long);
    s
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
