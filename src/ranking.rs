// Fleet ranking: per-machine summaries over the whole history, priority order, top-N views.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::{debug, instrument};

use crate::aggregation::mean_f64;
use crate::config::{RankingConfig, RecencyKey};
use crate::models::{DiskEntry, LoadEntry, MachineSummary, NormalizedSnapshot, ThermalPressure};

/// Summaries in fleet priority order.
pub fn rank(snapshots: &[NormalizedSnapshot], config: &RankingConfig) -> Vec<MachineSummary> {
    let mut summaries = summarize(snapshots, config.recency_key);
    sort_by_priority(&mut summaries);
    summaries
}

/// One summary per hostname, in order of first appearance.
#[instrument(skip_all, fields(snapshots = snapshots.len()))]
pub fn summarize(snapshots: &[NormalizedSnapshot], recency: RecencyKey) -> Vec<MachineSummary> {
    let mut groups: Vec<Vec<&NormalizedSnapshot>> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for s in snapshots {
        match index.get(s.hostname.as_str()) {
            Some(&i) => groups[i].push(s),
            None => {
                index.insert(s.hostname.as_str(), groups.len());
                groups.push(vec![s]);
            }
        }
    }

    let summaries: Vec<MachineSummary> = groups
        .iter()
        .filter_map(|records| summarize_machine(records, recency))
        .collect();
    debug!(machines = summaries.len(), "summarized machines");
    summaries
}

/// Thermal priority desc, then mean power desc, then mean GPU desc. Stable.
pub fn sort_by_priority(summaries: &mut [MachineSummary]) {
    summaries.sort_by(|a, b| {
        b.thermal_priority
            .cmp(&a.thermal_priority)
            .then_with(|| b.mean_power.total_cmp(&a.mean_power))
            .then_with(|| b.mean_gpu_busy.total_cmp(&a.mean_gpu_busy))
    });
}

/// Highest 1-minute load from each machine's latest sample; machines without one go last.
pub fn top_load(summaries: &[MachineSummary], n: usize) -> Vec<LoadEntry> {
    let mut latest: Vec<&MachineSummary> = summaries.iter().collect();
    latest.sort_by(|a, b| present_first(a.latest.load_short, b.latest.load_short, Ordering::Greater));
    latest
        .into_iter()
        .take(n)
        .enumerate()
        .map(|(i, m)| LoadEntry {
            rank: i + 1,
            hostname: m.hostname.clone(),
            load_short: m.latest.load_short,
            load_middle: m.latest.load_middle,
            load_long: m.latest.load_long,
            cpu_usage: m.latest.cpu_usage(),
            last_seen: m.last_seen.clone(),
        })
        .collect()
}

/// Least free disk from each machine's latest sample; machines without a reading go last.
pub fn least_disk_free(summaries: &[MachineSummary], n: usize) -> Vec<DiskEntry> {
    let mut latest: Vec<&MachineSummary> = summaries.iter().collect();
    latest.sort_by(|a, b| present_first(a.disk_free_gib, b.disk_free_gib, Ordering::Less));
    latest
        .into_iter()
        .take(n)
        .enumerate()
        .map(|(i, m)| DiskEntry {
            rank: i + 1,
            hostname: m.hostname.clone(),
            disk_used_pct: m.disk_used_pct,
            disk_free_gib: m.disk_free_gib,
            disk_total_gib: m.disk_total_gib,
            thermal_pressure: m.latest.thermal_pressure,
            last_seen: m.last_seen.clone(),
        })
        .collect()
}

fn summarize_machine(
    records: &[&NormalizedSnapshot],
    recency: RecencyKey,
) -> Option<MachineSummary> {
    let first = *records.first()?;
    let mut latest = first;
    for &r in &records[1..] {
        if is_more_recent(r, latest, recency) {
            latest = r;
        }
    }

    let watts: Vec<f64> = records.iter().filter_map(|r| r.package_watts).collect();
    let gpu: Vec<f64> = records.iter().filter_map(|r| r.gpu_busy_percent()).collect();
    let cpu_idle: Vec<f64> = records.iter().filter_map(|r| r.cpu_idle).collect();
    let cpu_sys: Vec<f64> = records.iter().filter_map(|r| r.cpu_sys).collect();
    let cpu_user: Vec<f64> = records.iter().filter_map(|r| r.cpu_user).collect();
    let load: Vec<f64> = records.iter().filter_map(|r| r.load_short).collect();
    let read_ops: Vec<f64> = records.iter().filter_map(|r| r.rops_per_s).collect();
    let write_ops: Vec<f64> = records.iter().filter_map(|r| r.wops_per_s).collect();

    let mean_cpu_usage = if cpu_idle.is_empty() {
        0.0
    } else {
        100.0 - mean_f64(&cpu_idle)
    };
    let iops_samples = read_ops.len().max(write_ops.len());
    let mean_disk_iops = if iops_samples == 0 {
        0.0
    } else {
        (read_ops.iter().sum::<f64>() + write_ops.iter().sum::<f64>()) / (iops_samples as f64)
    };

    let thermal_pressure = thermal_mode(records);
    let serial_number = latest
        .serial_number
        .clone()
        .or_else(|| records.iter().rev().find_map(|r| r.serial_number.clone()));

    Some(MachineSummary {
        hostname: first.hostname.clone(),
        serial_number,
        record_count: records.len(),
        mean_power: mean_f64(&watts),
        mean_gpu_busy: mean_f64(&gpu),
        mean_cpu_usage,
        mean_cpu_sys: mean_f64(&cpu_sys),
        mean_cpu_user: mean_f64(&cpu_user),
        mean_load: mean_f64(&load),
        mean_disk_iops,
        thermal_pressure,
        thermal_priority: thermal_pressure.priority(),
        last_seen: latest.collected_at.clone(),
        disk_used_pct: latest.disk_used_pct,
        disk_free_gib: latest.disk_free_gib,
        disk_total_gib: latest.disk_total_gib,
        latest: latest.clone(),
    })
}

/// Later input wins ties, so an unordered log still picks the last-appended sample.
fn is_more_recent(
    candidate: &NormalizedSnapshot,
    current: &NormalizedSnapshot,
    recency: RecencyKey,
) -> bool {
    match recency {
        RecencyKey::CollectedAt => candidate.collected_at >= current.collected_at,
        RecencyKey::DeviceTimestamp => {
            (candidate.device_timestamp, &candidate.collected_at)
                >= (current.device_timestamp, &current.collected_at)
        }
    }
}

/// Most frequent state; ties resolve to the state encountered first.
fn thermal_mode(records: &[&NormalizedSnapshot]) -> ThermalPressure {
    let mut counts: Vec<(ThermalPressure, usize)> = Vec::new();
    for r in records {
        match counts.iter_mut().find(|(t, _)| *t == r.thermal_pressure) {
            Some((_, n)) => *n += 1,
            None => counts.push((r.thermal_pressure, 1)),
        }
    }
    let mut best = (ThermalPressure::Unknown, 0);
    for (t, n) in counts {
        if n > best.1 {
            best = (t, n);
        }
    }
    best.0
}

/// Orders present values by `direction` (Greater = descending) and puts `None` last.
fn present_first(a: Option<f64>, b: Option<f64>, direction: Ordering) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => match direction {
            Ordering::Greater => y.total_cmp(&x),
            _ => x.total_cmp(&y),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
