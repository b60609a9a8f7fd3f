// Model serialization tests (raw snake_case lines, camelCase report JSON)

mod common;

use common::*;
use fleetwatch::models::*;

#[test]
fn test_raw_snapshot_accepts_timestamp_alias() {
    let line = r#"{"collected_at":"2024-01-01T10:00","hostname":"a","timestamp":1704103200}"#;
    let raw: RawSnapshot = serde_json::from_str(line).unwrap();
    assert_eq!(raw.device_timestamp, Some(FieldValue::Number(1704103200.0)));
}

#[test]
fn test_raw_snapshot_omits_absent_fields() {
    let json = serde_json::to_string(&raw("a", "2024-01-01T10:00")).unwrap();
    assert_eq!(json, r#"{"collected_at":"2024-01-01T10:00","hostname":"a"}"#);
}

#[test]
fn test_raw_snapshot_ignores_unknown_keys() {
    let line = r#"{"collected_at":"2024-01-01T10:00","hostname":"a","freq_hz":"3.2 GHz"}"#;
    assert!(serde_json::from_str::<RawSnapshot>(line).is_ok());
}

#[test]
fn test_field_value_from_json_null_is_absent() {
    assert_eq!(FieldValue::from_json(&serde_json::Value::Null), None);
    assert_eq!(
        FieldValue::from_json(&serde_json::json!("5%")),
        Some(FieldValue::Text("5%".into()))
    );
    assert_eq!(
        FieldValue::from_json(&serde_json::json!(true)),
        Some(FieldValue::Other(serde_json::json!(true)))
    );
}

#[test]
fn test_thermal_priority() {
    assert_eq!(ThermalPressure::Critical.priority(), 3);
    assert_eq!(ThermalPressure::Warning.priority(), 2);
    assert_eq!(ThermalPressure::High.priority(), 2);
    assert_eq!(ThermalPressure::Heavy.priority(), 1);
    assert_eq!(ThermalPressure::Nominal.priority(), 1);
    assert_eq!(ThermalPressure::Unknown.priority(), 0);
}

#[test]
fn test_thermal_deserializes_unknown_state() {
    let t: ThermalPressure = serde_json::from_str("\"Fair\"").unwrap();
    assert_eq!(t, ThermalPressure::Unknown);
    assert_eq!(ThermalPressure::Critical.to_string(), "Critical");
}

#[test]
fn test_collected_minute_truncates() {
    assert_eq!(
        snapshot("a", "2024-01-01T10:00:59.123456").collected_minute(),
        "2024-01-01T10:00"
    );
    assert_eq!(snapshot("a", "2024-01-01").collected_minute(), "2024-01-01");
}

#[test]
fn test_normalized_snapshot_serialization_camel_case() {
    let s = sample("a", "2024-01-01T10:00", ThermalPressure::High, Some(4.0), Some(0.3));
    let json = serde_json::to_string(&s).unwrap();
    assert!(json.contains("\"collectedAt\""));
    assert!(json.contains("\"packageWatts\":4.0"));
    assert!(json.contains("\"thermalPressure\":\"High\""));
    assert!(json.contains("\"gpuBusyScale\":\"percent\""));
    let back: NormalizedSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, s);
}

#[test]
fn test_time_bucket_omits_empty_leaders() {
    let bucket = TimeBucket {
        key: "2024-01-01T10:00".into(),
        sample_count: 1,
        mean_power: 1.0,
        mean_gpu_busy: 0.0,
        mean_load_short: 0.0,
        mean_load_middle: 0.0,
        mean_load_long: 0.0,
        mean_cpu_usage: 0.0,
        thermal_issues: 0,
        load_leaders: vec![],
    };
    let json = serde_json::to_string(&bucket).unwrap();
    assert!(json.contains("\"sampleCount\":1"));
    assert!(!json.contains("loadLeaders"));
}

#[test]
fn test_fleet_alert_tagged_serialization() {
    let json = serde_json::to_string(&FleetAlert::HighPower { peak_watts: 20.5 }).unwrap();
    assert_eq!(json, r#"{"kind":"highPower","peakWatts":20.5}"#);
    let healthy = serde_json::to_string(&FleetAlert::Healthy).unwrap();
    assert_eq!(healthy, r#"{"kind":"healthy"}"#);
}
