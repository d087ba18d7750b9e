//! # Raw socket ingestion: line-delimited JSON → events.
//!
//! Connects to a plain stream socket carrying one JSON object per line:
//!
//! ```text
//! {"key": "button1", "data": {"button": "button1"}}
//! ```
//!
//! Partial lines are buffered until a newline arrives. Lines that are not
//! valid JSON, or that lack `key` or `data`, are silently dropped (with a
//! debug log). Each decoded line is forwarded into the engine through a
//! supplied fire-like sink.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::engine::Manager;
use crate::rules::Args;

/// Fire-like callback invoked for every decoded `(key, data)` line.
pub type FireSink = Arc<dyn Fn(&str, Value) + Send + Sync>;

/// # Errors produced by datastream ingestion.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConnectError {
    /// Connecting or reading the stream failed.
    #[error("datastream i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

impl ConnectError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConnectError::Io(_) => "connect_io",
        }
    }
}

/// Builds the conventional sink over a manager: fires the key globally with
/// the line's data as one positional argument; validation failures are
/// logged, never propagated to the stream reader.
pub fn manager_sink(manager: &Arc<Manager>) -> FireSink {
    let manager = Arc::clone(manager);
    Arc::new(move |key: &str, data: Value| {
        if let Err(err) = manager.fire_global(key, Args::one(data), None) {
            tracing::warn!(key, label = err.as_label(), %err, "datastream fire rejected");
        }
    })
}

/// Decodes one line into `(key, data)`.
///
/// Returns `None` for anything that is not a JSON object with a string
/// `"key"` and a `"data"` member — such lines are dropped.
pub fn decode_frame(line: &[u8]) -> Option<(String, Value)> {
    let line = trim_line(line);
    if line.is_empty() {
        return None;
    }
    let parsed: Value = match serde_json::from_slice(line) {
        Ok(v) => v,
        Err(err) => {
            tracing::debug!(%err, "dropping malformed datastream line");
            return None;
        }
    };
    let Value::Object(mut map) = parsed else {
        tracing::debug!("dropping non-object datastream line");
        return None;
    };
    let key = match map.get("key").and_then(Value::as_str) {
        Some(k) => k.to_string(),
        None => {
            tracing::debug!("dropping datastream line without a string key");
            return None;
        }
    };
    let Some(data) = map.remove("data") else {
        tracing::debug!(key, "dropping datastream line without data");
        return None;
    };
    Some((key, data))
}

/// Reads `reader` to EOF, forwarding every decoded line into `sink`.
///
/// Bytes after the last newline are buffered until the next read completes
/// the line; a trailing unterminated line at EOF is discarded, matching the
/// wire contract that every frame ends in `\n`.
pub async fn read_datastream<R>(mut reader: R, sink: &FireSink) -> Result<(), ConnectError>
where
    R: AsyncRead + Unpin,
{
    let mut buffer: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buffer.extend_from_slice(&chunk[..n]);

        while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=pos).collect();
            if let Some((key, data)) = decode_frame(&line) {
                sink(&key, data);
            }
        }
    }
}

/// Connects to `addr` and ingests its line-delimited JSON until the peer
/// closes the connection.
pub async fn connect_datastream(
    addr: impl ToSocketAddrs,
    sink: FireSink,
) -> Result<(), ConnectError> {
    let stream = TcpStream::connect(addr).await?;
    read_datastream(stream, &sink).await
}

fn trim_line(line: &[u8]) -> &[u8] {
    let mut line = line;
    while let [rest @ .., last] = line {
        if *last == b'\n' || *last == b'\r' {
            line = rest;
        } else {
            break;
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use tokio::io::AsyncWriteExt;

    fn collecting_sink() -> (FireSink, Arc<Mutex<Vec<(String, Value)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink: FireSink = {
            let seen = Arc::clone(&seen);
            Arc::new(move |key: &str, data: Value| {
                seen.lock().unwrap().push((key.to_string(), data));
            })
        };
        (sink, seen)
    }

    #[test]
    fn decodes_well_formed_frames() {
        let (key, data) = decode_frame(br#"{"key": "k", "data": {"x": 1}}"#).unwrap();
        assert_eq!(key, "k");
        assert_eq!(data, json!({"x": 1}));

        // data may be any JSON value, including null.
        let (_, data) = decode_frame(br#"{"key": "k", "data": null}"#).unwrap();
        assert_eq!(data, Value::Null);
    }

    #[test]
    fn drops_malformed_frames() {
        assert!(decode_frame(b"").is_none());
        assert!(decode_frame(b"not json").is_none());
        assert!(decode_frame(br#""just a string""#).is_none());
        assert!(decode_frame(br#"{"data": 1}"#).is_none(), "missing key");
        assert!(decode_frame(br#"{"key": "k"}"#).is_none(), "missing data");
        assert!(decode_frame(br#"{"key": 5, "data": 1}"#).is_none(), "non-string key");
    }

    #[tokio::test]
    async fn buffers_partial_lines_across_reads() {
        let (sink, seen) = collecting_sink();
        let (mut tx, rx) = tokio::io::duplex(64);

        let reader = tokio::spawn(async move { read_datastream(rx, &sink).await });

        // One frame split over two writes, then two frames in one write.
        tx.write_all(br#"{"key": "a", "da"#).await.unwrap();
        tx.write_all(b"ta\": 1}\n").await.unwrap();
        tx.write_all(b"{\"key\": \"b\", \"data\": 2}\ngarbage\n")
            .await
            .unwrap();
        drop(tx);

        reader.await.unwrap().unwrap();
        let seen = seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![("a".to_string(), json!(1)), ("b".to_string(), json!(2))]
        );
    }

    #[tokio::test]
    async fn manager_sink_fires_globally() {
        use crate::rules::{ArgShape, HandlerFn, HandlerRef, Param};

        let mgr = Manager::with_defaults();
        let h: HandlerRef = HandlerFn::arc(
            "h",
            ArgShape::data([Param::required("data")]),
            |ctx, args| async move {
                ctx.set("seen", args.first().cloned().unwrap_or(Value::Null));
                Ok(())
            },
        );
        mgr.event("line", &h).unwrap();
        let tick: HandlerRef =
            HandlerFn::arc("tick", ArgShape::ContextOnly, |_ctx, _args| async { Ok(()) });
        mgr.event("tick", &tick).unwrap();

        let sink = manager_sink(&mgr);
        sink("line", json!("payload"));
        // A context-only key rejects the positional payload; the failure
        // stays inside the sink.
        sink("tick", json!(1));

        assert_eq!(mgr.drain_due().await.unwrap(), 1);
        assert_eq!(mgr.global_context().get("seen"), Some(json!("payload")));
    }
}
