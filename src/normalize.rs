// Field normalizer: the only place raw history values are coerced into typed fields.
// Every coercion failure becomes `None`; nothing here can reject a record.

use crate::config::NormalizeConfig;
use crate::models::{FieldValue, NormalizedSnapshot, RawSnapshot, ThermalPressure};

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

pub fn normalize(raw: &RawSnapshot, config: &NormalizeConfig) -> NormalizedSnapshot {
    let (load_short, load_middle, load_long) = match raw.load_avg.as_ref() {
        Some(combined) => match text(combined).and_then(load_triplet) {
            Some([short, middle, long]) => (Some(short), Some(middle), Some(long)),
            None => (None, None, None),
        },
        None => (
            number(raw.load_short.as_ref()),
            number(raw.load_middle.as_ref()),
            number(raw.load_long.as_ref()),
        ),
    };

    NormalizedSnapshot {
        collected_at: raw.collected_at.clone(),
        hostname: raw.hostname.clone(),
        serial_number: raw.serial_number.as_ref().and_then(identifier),
        device_timestamp: epoch_seconds(raw.device_timestamp.as_ref()),
        thermal_pressure: thermal(raw.thermal_pressure.as_ref()),
        package_watts: number(raw.package_watts.as_ref()),
        gpu_busy: number(raw.gpu_busy.as_ref()),
        gpu_busy_scale: config.gpu_busy_scale,
        cpu_idle: percent(raw.cpu_idle.as_ref()),
        cpu_sys: percent(raw.cpu_sys.as_ref()),
        cpu_user: percent(raw.cpu_user.as_ref()),
        load_short,
        load_middle,
        load_long,
        disk_total_gib: number(raw.disk_total.as_ref()).map(bytes_to_gib),
        disk_free_gib: number(raw.disk_free.as_ref()).map(bytes_to_gib),
        disk_used_pct: percent(raw.disk_used_pct.as_ref()),
        rops_per_s: number(raw.rops_per_s.as_ref()),
        wops_per_s: number(raw.wops_per_s.as_ref()),
    }
}

pub fn normalize_all(raws: &[RawSnapshot], config: &NormalizeConfig) -> Vec<NormalizedSnapshot> {
    raws.iter().map(|raw| normalize(raw, config)).collect()
}

/// Percentage field, e.g. `"42.5%"`, `" 7 % "` or a bare number.
pub fn percent(value: Option<&FieldValue>) -> Option<f64> {
    match value? {
        FieldValue::Number(n) => finite(*n),
        FieldValue::Text(s) => {
            let trimmed = s.trim();
            let digits = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
            digits.parse::<f64>().ok().and_then(finite)
        }
        FieldValue::Other(_) => None,
    }
}

/// Plain numeric field; numeric strings are accepted after trimming.
pub fn number(value: Option<&FieldValue>) -> Option<f64> {
    match value? {
        FieldValue::Number(n) => finite(*n),
        FieldValue::Text(s) => s.trim().parse::<f64>().ok().and_then(finite),
        FieldValue::Other(_) => None,
    }
}

/// Splits `"1m, 5m, 15m"` into its first three values. All or nothing: a short or
/// partly unparsable string yields `None` rather than a mix of values and gaps.
pub fn load_triplet(s: &str) -> Option<[f64; 3]> {
    let mut parts = s.split(',');
    let mut out = [0.0; 3];
    for slot in out.iter_mut() {
        *slot = parts.next()?.trim().parse::<f64>().ok().and_then(finite)?;
    }
    Some(out)
}

/// Device clock in Unix seconds; zero, negative or unparsable is unknown.
pub fn epoch_seconds(value: Option<&FieldValue>) -> Option<i64> {
    let secs = match value? {
        FieldValue::Number(n) => finite(*n)?,
        FieldValue::Text(s) => s.trim().parse::<f64>().ok().and_then(finite)?,
        FieldValue::Other(_) => return None,
    };
    (secs > 0.0).then_some(secs as i64)
}

pub fn thermal(value: Option<&FieldValue>) -> ThermalPressure {
    value
        .and_then(text)
        .map(ThermalPressure::parse)
        .unwrap_or(ThermalPressure::Unknown)
}

pub fn bytes_to_gib(bytes: f64) -> f64 {
    bytes / BYTES_PER_GIB
}

fn identifier(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        FieldValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text(value: &FieldValue) -> Option<&str> {
    match value {
        FieldValue::Text(s) => Some(s.as_str()),
        _ => None,
    }
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}
