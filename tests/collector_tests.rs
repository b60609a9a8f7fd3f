// Datatables import tests: response parsing, column mapping, append to history

use fleetwatch::collector::{
    self, COLLECTED_AT_FORMAT, DEFAULT_COLUMNS, ImportError, default_columns, parse_response,
    snapshots_from_response,
};
use fleetwatch::history_log::HistoryLog;
use fleetwatch::models::FieldValue;
use tempfile::TempDir;

const COLUMNS: &[&str] = &[
    "machine.serial_number",
    "machine.hostname",
    "usage_stats.timestamp",
    "usage_stats.thermal_pressure",
    "usage_stats.package_watts",
    "usage_stats.gpu_busy",
    "usage_stats.cpu_idle",
    "usage_stats.load_avg",
    "diskreport.freespace",
];

const RESPONSE: &str = r#"{
    "draw": 1,
    "recordsTotal": 3,
    "recordsFiltered": 3,
    "data": [
        ["C02AAA", "mac-01", 1704103200, "Nominal", 5.5, 0.12, "91.0%", "1.0, 2.0, 3.0", 123456789],
        ["C02BBB", null, 1704103200, "Warning", 7.0, 0.5, "50%", "2.0, 2.0, 2.0", 1],
        ["C02CCC", "mac-03", null, "Critical", "9.1", null, "10%", "4.0, 4.0, 4.0", null]
    ]
}"#;

#[test]
fn test_default_columns_include_hostname() {
    assert!(DEFAULT_COLUMNS.contains(&"machine.hostname"));
    assert_eq!(default_columns().len(), DEFAULT_COLUMNS.len());
}

#[test]
fn test_parse_response_record_count() {
    let response = parse_response(RESPONSE).unwrap();
    assert_eq!(response.data.len(), 3);
    assert_eq!(response.record_count(), 3);
}

#[test]
fn test_parse_response_api_error() {
    let err = parse_response(r#"{"error":"Unauthorized"}"#).unwrap_err();
    assert!(matches!(err, ImportError::Api(ref msg) if msg == "Unauthorized"));
}

#[test]
fn test_parse_response_invalid_json() {
    let err = parse_response("<html>login</html>").unwrap_err();
    assert!(matches!(err, ImportError::Json(_)));
}

#[test]
fn test_rows_without_hostname_are_skipped() {
    let response = parse_response(RESPONSE).unwrap();
    let snapshots = snapshots_from_response(&response, COLUMNS, "2024-01-01T10:00:00.000000");
    let hosts: Vec<&str> = snapshots.iter().map(|s| s.hostname.as_str()).collect();
    assert_eq!(hosts, vec!["mac-01", "mac-03"]);
}

#[test]
fn test_columns_map_to_raw_fields() {
    let response = parse_response(RESPONSE).unwrap();
    let snapshots = snapshots_from_response(&response, COLUMNS, "2024-01-01T10:00:00.000000");
    let first = &snapshots[0];
    assert_eq!(first.collected_at, "2024-01-01T10:00:00.000000");
    assert_eq!(first.serial_number, Some(FieldValue::from("C02AAA")));
    assert_eq!(first.device_timestamp, Some(FieldValue::Number(1704103200.0)));
    assert_eq!(first.thermal_pressure, Some(FieldValue::from("Nominal")));
    assert_eq!(first.cpu_idle, Some(FieldValue::from("91.0%")));
    assert_eq!(first.load_avg, Some(FieldValue::from("1.0, 2.0, 3.0")));
    assert_eq!(first.disk_free, Some(FieldValue::Number(123456789.0)));

    let third = &snapshots[1];
    assert_eq!(third.device_timestamp, None);
    assert_eq!(third.gpu_busy, None);
    assert_eq!(third.package_watts, Some(FieldValue::from("9.1")));
}

#[test]
fn test_unknown_columns_are_ignored() {
    let response = parse_response(r#"{"data":[["mac-01", 123, "x"]]}"#).unwrap();
    let columns = ["machine.hostname", "usage_stats.freq_hz", "usage_stats.backlight"];
    let snapshots = snapshots_from_response(&response, &columns, "2024-01-01T10:00");
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].hostname, "mac-01");
}

#[test]
fn test_import_appends_to_history() {
    let dir = TempDir::new().unwrap();
    let log = HistoryLog::new(dir.path().join("history.jsonl"));
    let appended = collector::import(RESPONSE, COLUMNS, &log, "2024-01-01T10:00:00.000000").unwrap();
    assert_eq!(appended, 2);
    let again = collector::import(RESPONSE, COLUMNS, &log, "2024-01-01T10:05:00.000000").unwrap();
    assert_eq!(again, 2);

    let contents = log.read().unwrap();
    assert_eq!(contents.snapshots.len(), 4);
    assert_eq!(contents.snapshots[3].collected_at, "2024-01-01T10:05:00.000000");
}

#[test]
fn test_import_api_error_leaves_history_untouched() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.jsonl");
    let log = HistoryLog::new(&path);
    let err = collector::import(r#"{"error":"session expired"}"#, COLUMNS, &log, "t").unwrap_err();
    assert!(matches!(err, ImportError::Api(_)));
    assert!(!path.exists());
}

#[test]
fn test_collected_at_format_has_minute_prefix() {
    let at = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_micro_opt(10, 0, 5, 42)
        .unwrap()
        .format(COLLECTED_AT_FORMAT)
        .to_string();
    assert_eq!(at, "2024-01-01T10:00:05.000042");
    assert_eq!(&at[..16], "2024-01-01T10:00");
}
