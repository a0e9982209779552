//! Integration tests for the global logging setup.
//!
//! The global subscriber can be installed once per process, so everything that
//! depends on it lives in a single test.

use async_trait::async_trait;
use bridge_traits::error::Result as SinkResult;
use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{init_logging, redact_if_sensitive, LogFormat, LoggingConfig};
use core_runtime::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct CollectingSink {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for CollectingSink {
    async fn log(&self, entry: LogEntry) -> SinkResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Debug
    }
}

#[tokio::test]
async fn test_global_logging_forwards_to_sink_once() {
    let sink = Arc::new(CollectingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_logger_sink(sink.clone());

    init_logging(config.clone()).expect("first initialization succeeds");

    tracing::info!(
        target: "core_sync",
        song_id = "isrc-42",
        prompt = %redact_if_sensitive("prompt", "late night drive"),
        "song pushed"
    );
    // Outside the workspace filter.
    tracing::info!(target: "hyper", "connection reused");

    // Entries are delivered on spawned tasks inside a runtime.
    for _ in 0..50 {
        if !sink.entries.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    {
        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "song pushed");
        assert_eq!(
            entries[0].fields.get("prompt").map(String::as_str),
            Some("[REDACTED]")
        );
    }

    let second = init_logging(config);
    assert!(matches!(second, Err(Error::Logging(_))));
}
