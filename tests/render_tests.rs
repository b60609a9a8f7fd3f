// Dashboard rendering tests: HTML states, JSON output, file sinks

mod common;

use common::*;
use fleetwatch::config::ReportConfig;
use fleetwatch::history_log::LogContents;
use fleetwatch::models::*;
use fleetwatch::render::{render_html, render_json, write_outputs};
use fleetwatch::report::build_report;
use tempfile::TempDir;

fn report_config(dir: &TempDir, json: bool) -> ReportConfig {
    let mut config = test_config().report;
    config.html_path = dir.path().join("out").join("dashboard.html").display().to_string();
    if json {
        config.json_path = Some(dir.path().join("out").join("report.json").display().to_string());
    }
    config
}

fn fleet_report(lines: &[&str]) -> FleetReport {
    let contents = fleetwatch::history_log::parse_lines(lines.join("\n").as_bytes()).unwrap();
    build_report(&contents, &test_config(), fixed_now())
}

#[test]
fn test_empty_report_renders_no_data_state() {
    let report = build_report(&LogContents::default(), &test_config(), fixed_now());
    let html = render_html(&report, &test_config().report).unwrap();
    assert!(html.contains("id=\"no-data\""));
    assert!(!html.contains("machinesTable"));
}

#[test]
fn test_report_renders_machine_rows() {
    let report = fleet_report(&[
        r#"{"collected_at":"2024-01-01T10:00","hostname":"cool-mac","package_watts":2.0,"thermal_pressure":"Nominal"}"#,
        r#"{"collected_at":"2024-01-01T10:00","hostname":"hot-mac","package_watts":12.0,"gpu_busy":70,"thermal_pressure":"Critical"}"#,
    ]);
    let html = render_html(&report, &test_config().report).unwrap();
    assert!(!html.contains("id=\"no-data\""));
    assert!(html.contains("cool-mac"));
    assert!(html.contains("class=\"high-power high-gpu\""));
    assert!(html.contains("class=\"status-critical\">Critical"));
    let hot = html.find("hot-mac").unwrap();
    let cool = html.find("cool-mac").unwrap();
    assert!(hot < cool);
}

#[test]
fn test_missing_values_render_as_not_available() {
    let report = fleet_report(&[r#"{"collected_at":"2024-01-01T10:00","hostname":"a"}"#]);
    let html = render_html(&report, &test_config().report).unwrap();
    assert!(html.contains("n/a"));
}

#[test]
fn test_hostnames_are_escaped() {
    let report = fleet_report(&[
        r#"{"collected_at":"2024-01-01T10:00","hostname":"<script>alert(1)</script>"}"#,
    ]);
    let html = render_html(&report, &test_config().report).unwrap();
    assert!(!html.contains("<script>alert(1)</script>"));
}

#[test]
fn test_render_json_uses_camel_case() {
    let report = fleet_report(&[r#"{"collected_at":"2024-01-01T10:00","hostname":"a","package_watts":3.0}"#]);
    let json = render_json(&report).unwrap();
    assert!(json.contains("\"totalRecords\": 1"));
    let back: FleetReport = serde_json::from_str(&json).unwrap();
    assert_eq!(back, report);
}

#[test]
fn test_write_outputs_creates_html_and_json() {
    let dir = TempDir::new().unwrap();
    let config = report_config(&dir, true);
    let report = fleet_report(&[r#"{"collected_at":"2024-01-01T10:00","hostname":"a"}"#]);
    write_outputs(&report, &config).unwrap();
    let html = std::fs::read_to_string(&config.html_path).unwrap();
    assert!(html.contains("<!DOCTYPE html>"));
    assert!(html.contains(&fleetwatch::version::label()));
    let json = std::fs::read_to_string(config.json_path.as_ref().unwrap()).unwrap();
    assert!(json.contains("\"uniqueMachines\": 1"));
}

#[test]
fn test_write_outputs_without_json_path() {
    let dir = TempDir::new().unwrap();
    let config = report_config(&dir, false);
    let report = build_report(&LogContents::default(), &test_config(), fixed_now());
    write_outputs(&report, &config).unwrap();
    assert!(std::path::Path::new(&config.html_path).exists());
    assert!(!dir.path().join("out").join("report.json").exists());
}

#[test]
fn test_load_leaders_table_only_when_enabled() {
    let ts = fixed_now().timestamp();
    let lines = [
        format!(r#"{{"collected_at":"2024-01-01T10:00","hostname":"busy-mac","load_avg":"7.5, 1, 1","device_timestamp":{ts}}}"#),
        format!(r#"{{"collected_at":"2024-01-01T10:00","hostname":"stale-mac","load_avg":"9.0, 1, 1","device_timestamp":{}}}"#, ts - 3 * 3600),
    ];
    let contents = fleetwatch::history_log::parse_lines(lines.join("\n").as_bytes()).unwrap();

    let disabled = build_report(&contents, &test_config(), fixed_now());
    let html = render_html(&disabled, &test_config().report).unwrap();
    assert!(!html.contains("loadLeadersTable"));

    let mut config = test_config();
    config.aggregation.leaders.enabled = true;
    let enabled = build_report(&contents, &config, fixed_now());
    let html = render_html(&enabled, &config.report).unwrap();
    assert!(html.contains("loadLeadersTable"));
    let table = &html[html.find("loadLeadersTable").unwrap()..html.find("<script>").unwrap()];
    assert!(table.contains("busy-mac"));
    assert!(table.contains("7.50"));
    assert!(table.contains("2024-01-01 10:00"));
    assert!(!table.contains("stale-mac"));
}
