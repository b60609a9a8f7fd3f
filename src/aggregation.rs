// Time-bucketed aggregation: group samples by collection minute across the fleet.
// Pure functions; `now` is passed in so leader freshness is reproducible.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::config::{AggregationConfig, LeaderConfig, MeanDenominator};
use crate::models::{LoadLeader, NormalizedSnapshot, TimeBucket};

/// One bucket per distinct minute key, ascending by key.
#[instrument(skip_all, fields(snapshots = snapshots.len()))]
pub fn bucket(
    snapshots: &[NormalizedSnapshot],
    config: &AggregationConfig,
    now: DateTime<Utc>,
) -> Vec<TimeBucket> {
    let mut by_minute: BTreeMap<&str, Vec<&NormalizedSnapshot>> = BTreeMap::new();
    for s in snapshots {
        by_minute.entry(s.collected_minute()).or_default().push(s);
    }

    let buckets: Vec<TimeBucket> = by_minute
        .into_iter()
        .filter_map(|(key, group)| aggregate_bucket(key, &group, config, now))
        .collect();
    debug!(buckets = buckets.len(), "bucketed snapshots by minute");
    buckets
}

/// Aggregates the samples of one minute into a TimeBucket. `None` for an empty group.
pub fn aggregate_bucket(
    key: &str,
    group: &[&NormalizedSnapshot],
    config: &AggregationConfig,
    now: DateTime<Utc>,
) -> Option<TimeBucket> {
    if group.is_empty() {
        return None;
    }

    let watts: Vec<f64> = group.iter().filter_map(|s| s.package_watts).collect();
    let gpu: Vec<f64> = group.iter().filter_map(|s| s.gpu_busy_percent()).collect();
    let load_short: Vec<f64> = group.iter().filter_map(|s| s.load_short).collect();
    let load_middle: Vec<f64> = group.iter().filter_map(|s| s.load_middle).collect();
    let load_long: Vec<f64> = group.iter().filter_map(|s| s.load_long).collect();
    let cpu_usage: Vec<f64> = group.iter().filter_map(|s| s.cpu_usage()).collect();

    let thermal_issues = group
        .iter()
        .filter(|s| config.thermal_issue_states.contains(&s.thermal_pressure))
        .count();

    let load_leaders = if config.leaders.enabled {
        load_leaders(group, &config.leaders, now)
    } else {
        Vec::new()
    };

    Some(TimeBucket {
        key: key.to_string(),
        sample_count: group.len(),
        mean_power: mean_with(&watts, group.len(), config.mean_denominator),
        mean_gpu_busy: mean_with(&gpu, group.len(), config.mean_denominator),
        mean_load_short: mean_f64(&load_short),
        mean_load_middle: mean_f64(&load_middle),
        mean_load_long: mean_f64(&load_long),
        mean_cpu_usage: mean_f64(&cpu_usage),
        thermal_issues,
        load_leaders,
    })
}

/// The most recent `limit` samples by `collected_at` (stable for equal keys).
pub fn recent_window(snapshots: &[NormalizedSnapshot], limit: usize) -> Vec<NormalizedSnapshot> {
    let mut sorted: Vec<&NormalizedSnapshot> = snapshots.iter().collect();
    sorted.sort_by(|a, b| a.collected_at.cmp(&b.collected_at));
    let skip = sorted.len().saturating_sub(limit);
    sorted.into_iter().skip(skip).cloned().collect()
}

/// Top machines in one bucket by `load_short`, considering only machines whose device
/// clock is within the freshness window. A machine seen twice in the bucket counts once,
/// with its last sample.
fn load_leaders<'a>(
    group: &[&'a NormalizedSnapshot],
    config: &LeaderConfig,
    now: DateTime<Utc>,
) -> Vec<LoadLeader> {
    let cutoff = now.timestamp() - config.freshness_window_secs as i64;

    let mut latest: Vec<&'a NormalizedSnapshot> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    for &s in group {
        match index.get(s.hostname.as_str()) {
            Some(&i) => latest[i] = s,
            None => {
                index.insert(s.hostname.as_str(), latest.len());
                latest.push(s);
            }
        }
    }

    let mut leaders: Vec<LoadLeader> = latest
        .into_iter()
        .filter_map(|s| {
            let device_timestamp = s.device_timestamp.filter(|ts| *ts >= cutoff)?;
            Some(LoadLeader {
                hostname: s.hostname.clone(),
                load_short: s.load_short?,
                device_timestamp,
            })
        })
        .collect();
    leaders.sort_by(|a, b| b.load_short.total_cmp(&a.load_short));
    leaders.truncate(config.count);
    leaders
}

fn mean_with(present: &[f64], bucket_len: usize, denominator: MeanDenominator) -> f64 {
    match denominator {
        MeanDenominator::Present => mean_f64(present),
        MeanDenominator::Bucket => {
            if bucket_len == 0 {
                return 0.0;
            }
            present.iter().sum::<f64>() / (bucket_len as f64)
        }
    }
}

pub(crate) fn mean_f64(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    v.iter().sum::<f64>() / (v.len() as f64)
}
