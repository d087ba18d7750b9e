//! # Timestamped-record replay.
//!
//! Replays a recorded dataset (newline-delimited JSON, one record per line)
//! into a context as delayed events: inter-record gaps are derived from a
//! timestamp field inside each record and compressed by a time scale, so an
//! hour of recorded history can play back in seconds.
//!
//! Pathological gaps are capped at two wall-clock hours (at scale 1) so a
//! quiet stretch in the dataset does not stall playback.
//!
//! ## Example
//! ```no_run
//! use rulefire::{Manager, ReplayOptions, replay_file};
//!
//! let mgr = Manager::with_defaults();
//! let opts = ReplayOptions {
//!     event_key: "tweet".to_string(),
//!     time_scale: 1000.0,
//!     ..ReplayOptions::default()
//! };
//! let fired = replay_file(mgr.global_context(), "tweets.jsonl", &opts).unwrap();
//! println!("scheduled {fired} records");
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use thiserror::Error;

use crate::engine::ContextRef;
use crate::error::FireError;
use crate::rules::Args;

/// Cap on a single inter-record gap, in recorded seconds (2 hours).
const GAP_CAP_SECS: f64 = 2.0 * 60.0 * 60.0;

/// Options controlling a replay.
#[derive(Clone, Debug)]
pub struct ReplayOptions {
    /// Event key fired for every record.
    pub event_key: String,
    /// Recorded seconds per playback second (1000 plays an hour in 3.6 s).
    pub time_scale: f64,
    /// Stop after this many records.
    pub limit: Option<usize>,
    /// Record field holding the timestamp.
    pub timestamp_field: String,
    /// `chrono` format string for the timestamp field.
    pub timestamp_format: String,
}

impl Default for ReplayOptions {
    /// Defaults match the Twitter-style datasets the replay was built for:
    /// `created_at` in `"%a %b %d %H:%M:%S %z %Y"` format, scale 1000,
    /// event key `"record"`, no limit.
    fn default() -> Self {
        Self {
            event_key: "record".to_string(),
            time_scale: 1000.0,
            limit: None,
            timestamp_field: "created_at".to_string(),
            timestamp_format: "%a %b %d %H:%M:%S %z %Y".to_string(),
        }
    }
}

/// # Errors produced while replaying a dataset.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ReplayError {
    /// Opening or reading the dataset failed.
    #[error("replay i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// A line was not valid JSON.
    #[error("replay line {line} is not valid JSON: {source}")]
    Json {
        /// 1-based line number.
        line: usize,
        /// The decode failure.
        source: serde_json::Error,
    },

    /// A record lacks the configured timestamp field.
    #[error("replay record {line} is missing timestamp field {field:?}")]
    MissingField {
        /// 1-based record number.
        line: usize,
        /// The configured field name.
        field: String,
    },

    /// A record's timestamp did not match the configured format.
    #[error("replay record {line} has unparseable timestamp {value:?}")]
    Timestamp {
        /// 1-based record number.
        line: usize,
        /// The offending field value.
        value: String,
    },

    /// Scheduling a record was rejected by argument validation.
    #[error(transparent)]
    Fire(#[from] FireError),
}

/// Schedules every record in `records` into `ctx`, returning how many were
/// fired.
pub fn replay_records(
    ctx: &ContextRef,
    records: impl IntoIterator<Item = Value>,
    opts: &ReplayOptions,
) -> Result<usize, ReplayError> {
    let mut begin: Option<DateTime<FixedOffset>> = None;
    let mut last: Option<DateTime<FixedOffset>> = None;
    let mut fired = 0usize;

    for (idx, record) in records.into_iter().enumerate() {
        if opts.limit.is_some_and(|limit| fired >= limit) {
            break;
        }
        let stamp = parse_timestamp(&record, idx + 1, opts)?;

        let delay = match (begin, last) {
            (Some(begin_at), Some(last_at)) => {
                Some(scaled_delay(begin_at, last_at, stamp, opts.time_scale))
            }
            _ => {
                begin = Some(stamp);
                None
            }
        };
        last = Some(stamp);

        ctx.fire(&opts.event_key, Args::one(record), delay)?;
        fired += 1;
    }
    Ok(fired)
}

/// Schedules every line of a newline-delimited JSON file into `ctx`.
///
/// Reads synchronously; call it from setup code or a blocking task.
pub fn replay_file(
    ctx: &ContextRef,
    path: impl AsRef<Path>,
    opts: &ReplayOptions,
) -> Result<usize, ReplayError> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: Value =
            serde_json::from_str(&line).map_err(|source| ReplayError::Json {
                line: idx + 1,
                source,
            })?;
        records.push(record);
    }
    replay_records(ctx, records, opts)
}

/// Playback delay for a record, measured from "now" at scheduling time.
///
/// The base delay is the distance from the first record, scaled. When the
/// gap since the previous record exceeds the cap, the delay is recomputed
/// from the previous record plus the capped gap, so playback resumes after
/// at most `GAP_CAP_SECS / time_scale` seconds.
fn scaled_delay(
    begin: DateTime<FixedOffset>,
    last: DateTime<FixedOffset>,
    current: DateTime<FixedOffset>,
    time_scale: f64,
) -> Duration {
    let since_begin = seconds_between(begin, current);
    let since_last = seconds_between(last, current);

    let mut delay = since_begin / time_scale;
    if since_last > GAP_CAP_SECS {
        delay = (seconds_between(begin, last) + GAP_CAP_SECS) / time_scale;
    }
    Duration::from_secs_f64(delay.max(0.0))
}

fn seconds_between(from: DateTime<FixedOffset>, to: DateTime<FixedOffset>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

fn parse_timestamp(
    record: &Value,
    line: usize,
    opts: &ReplayOptions,
) -> Result<DateTime<FixedOffset>, ReplayError> {
    let raw = record
        .get(&opts.timestamp_field)
        .and_then(Value::as_str)
        .ok_or_else(|| ReplayError::MissingField {
            line,
            field: opts.timestamp_field.clone(),
        })?;
    DateTime::parse_from_str(raw, &opts.timestamp_format).map_err(|_| ReplayError::Timestamp {
        line,
        value: raw.to_string(),
    })
}
