// Append-only JSON Lines history of fleet snapshots.
// Reads tolerate bad lines (skipped and reported); writes only ever append.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::models::RawSnapshot;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("history log {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A history line that is not a valid snapshot record. Recoverable: the line is skipped.
#[derive(Debug, Error)]
#[error("line {line}: {source}")]
pub struct ParseError {
    /// 1-based line number.
    pub line: usize,
    #[source]
    pub source: serde_json::Error,
}

/// Parsed history: snapshots in file order plus the lines that were skipped.
#[derive(Debug, Default)]
pub struct LogContents {
    pub snapshots: Vec<RawSnapshot>,
    pub errors: Vec<ParseError>,
}

pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every non-blank line. A missing file reads as empty.
    #[instrument(skip(self), fields(log = "history", operation = "read", path = %self.path.display()))]
    pub fn read(&self) -> Result<LogContents, LogError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("history log not found; treating as empty");
                return Ok(LogContents::default());
            }
            Err(e) => return Err(self.io_error(e)),
        };
        let contents = parse_lines(BufReader::new(file)).map_err(|e| self.io_error(e))?;
        info!(
            snapshots = contents.snapshots.len(),
            skipped = contents.errors.len(),
            "read history log"
        );
        Ok(contents)
    }

    /// Appends one compact JSON line per snapshot, creating the file if needed.
    #[instrument(skip(self, snapshots), fields(log = "history", operation = "append", snapshots_count = snapshots.len()))]
    pub fn append(&self, snapshots: &[RawSnapshot]) -> Result<usize, LogError> {
        if snapshots.is_empty() {
            return Ok(0);
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;

        let mut writer = BufWriter::new(file);
        for s in snapshots {
            let line = serde_json::to_string(s)?;
            writeln!(writer, "{}", line).map_err(|e| self.io_error(e))?;
        }
        writer.flush().map_err(|e| self.io_error(e))?;
        info!(appended = snapshots.len(), "appended snapshots to history log");
        Ok(snapshots.len())
    }

    fn io_error(&self, source: io::Error) -> LogError {
        LogError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Parses JSON Lines from any reader. Blank lines are ignored; lines that are not a
/// snapshot record (including invalid UTF-8 or a truncated tail) become `ParseError`s.
/// Only reader I/O failures are returned as `Err`.
pub fn parse_lines<R: BufRead>(reader: R) -> io::Result<LogContents> {
    let mut contents = LogContents::default();
    for (idx, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match parse_record(&line) {
            Ok(snapshot) => contents.snapshots.push(snapshot),
            Err(source) => {
                let err = ParseError {
                    line: idx + 1,
                    source,
                };
                warn!(error = %err, "skipping unparsable history line");
                contents.errors.push(err);
            }
        }
    }
    Ok(contents)
}

/// Strict decode first, then a lenient retry so a single bad field only loses that field.
/// The strict error is kept when the line is not a JSON object with string
/// `collected_at` and `hostname`.
fn parse_record(line: &[u8]) -> Result<RawSnapshot, serde_json::Error> {
    let strict = match serde_json::from_slice::<RawSnapshot>(line) {
        Ok(snapshot) => return Ok(snapshot),
        Err(e) => e,
    };
    let Ok(text) = std::str::from_utf8(line) else {
        return Err(strict);
    };
    let value: serde_json::Value = match serde_json::from_str(&null_non_finite(text)) {
        Ok(v) => v,
        Err(_) => return Err(strict),
    };
    match value.as_object().and_then(RawSnapshot::from_object) {
        Some(snapshot) => {
            debug!(error = %strict, "recovered history line with malformed fields");
            Ok(snapshot)
        }
        None => Err(strict),
    }
}

/// Replaces bare number tokens that do not fit a finite f64 (`1e400`, `NaN`,
/// `Infinity`, `-Infinity`) with `null`. String contents are left alone.
fn null_non_finite(line: &str) -> String {
    let bytes = line.as_bytes();
    let mut out = String::with_capacity(line.len());
    let mut copied = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }
            b'-' | b'0'..=b'9' | b'N' | b'I' => {
                let start = i;
                while i < bytes.len() && is_number_byte(bytes[i]) {
                    i += 1;
                }
                if is_non_finite(&line[start..i]) {
                    out.push_str(&line[copied..start]);
                    out.push_str("null");
                    copied = i;
                }
            }
            _ => i += 1,
        }
    }
    out.push_str(&line[copied..]);
    out
}

fn is_number_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'+' | b'.')
}

fn is_non_finite(token: &str) -> bool {
    match token {
        "NaN" | "Infinity" | "-Infinity" => true,
        _ => token.parse::<f64>().is_ok_and(|v| !v.is_finite()),
    }
}
