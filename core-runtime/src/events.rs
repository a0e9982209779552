//! # Event Bus System
//!
//! Typed, broadcast-based notifications emitted by the sync coordinator and
//! the analysis pipeline.
//!
//! ## Overview
//!
//! - **Event Types**: [`CoreEvent`] wraps one enum per emitting component
//! - **EventBus**: cloneable handle over a `tokio::sync::broadcast` channel
//! - **EventStream**: receiver wrapper with an optional predicate
//!
//! ```text
//! ┌──────────────────┐   emit   ┌───────────┐  subscribe  ┌────────────┐
//! │ Sync Coordinator ├─────────>│           ├────────────>│ Subscriber │
//! └──────────────────┘          │ EventBus  │             └────────────┘
//! ┌──────────────────┐   emit   │           │  subscribe  ┌────────────┐
//! │Analysis Pipeline ├─────────>│           ├────────────>│ Subscriber │
//! └──────────────────┘          └───────────┘             └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
//!
//! let bus = EventBus::new(16);
//! let mut subscriber = bus.subscribe();
//!
//! bus.emit(CoreEvent::Sync(SyncEvent::SongPushed {
//!     song_id: "isrc-1".to_string(),
//! }))
//! .ok();
//!
//! assert!(subscriber.try_recv().is_ok());
//! ```
//!
//! Emitting with no subscribers returns an error; emitters discard it with
//! `.ok()` since nobody listening is a normal condition.
//!
//! Slow subscribers that fall more than the channel capacity behind receive
//! `RecvError::Lagged(n)` and continue from the oldest buffered event.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast::{self, error::RecvError, error::SendError, Receiver};

/// Default event buffer size per subscriber.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Sync(SyncEvent),
    Analysis(AnalysisEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Analysis(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(SyncEvent::PullFailed { .. }) => EventSeverity::Error,
            CoreEvent::Sync(SyncEvent::SongFailed { .. })
            | CoreEvent::Analysis(AnalysisEvent::SongFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::PushCompleted { .. })
            | CoreEvent::Sync(SyncEvent::PullCompleted { .. })
            | CoreEvent::Analysis(AnalysisEvent::Completed { .. })
            | CoreEvent::Analysis(AnalysisEvent::Cancelled { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Sync Events
// ============================================================================

/// Events emitted while pushing local changes or pulling the remote library.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// A push batch started.
    PushStarted {
        /// Songs whose status was not `Synced` when the batch began.
        pending: u64,
    },
    /// A pending upload was acknowledged by the remote.
    SongPushed { song_id: String },
    /// A pending delete was acknowledged and the song purged locally.
    SongDeleted { song_id: String },
    /// A single push or delete failed; the song keeps its status.
    SongFailed {
        song_id: String,
        message: String,
        /// Whether retrying on the next sync can succeed.
        recoverable: bool,
    },
    /// A push batch finished (possibly with per-song failures).
    PushCompleted {
        pushed: u64,
        deleted: u64,
        failed: u64,
        duration_ms: u64,
    },
    /// Remote data was fetched and merged.
    PullCompleted {
        fetched: u64,
        created: u64,
        replaced: u64,
        skipped: u64,
    },
    /// The remote fetch failed; nothing was applied.
    PullFailed { message: String },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::PushStarted { .. } => "Push of pending changes started",
            SyncEvent::SongPushed { .. } => "Song uploaded",
            SyncEvent::SongDeleted { .. } => "Song deleted remotely",
            SyncEvent::SongFailed { .. } => "Song sync failed",
            SyncEvent::PushCompleted { .. } => "Push of pending changes completed",
            SyncEvent::PullCompleted { .. } => "Remote library merged",
            SyncEvent::PullFailed { .. } => "Remote library fetch failed",
        }
    }
}

// ============================================================================
// Analysis Events
// ============================================================================

/// Events emitted by a batch analysis run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AnalysisEvent {
    Started {
        total: u64,
    },
    Progress {
        analyzed: u64,
        total: u64,
        /// Progress percentage (0-100).
        percent: u8,
    },
    /// Classification or tag attachment failed for one song; the batch goes on.
    SongFailed {
        song_id: String,
        message: String,
    },
    Completed {
        analyzed: u64,
        failed: u64,
    },
    Cancelled {
        analyzed: u64,
        /// Songs left unanalyzed by the cancellation.
        remaining: u64,
    },
}

impl AnalysisEvent {
    fn description(&self) -> &str {
        match self {
            AnalysisEvent::Started { .. } => "Analysis started",
            AnalysisEvent::Progress { .. } => "Analysis in progress",
            AnalysisEvent::SongFailed { .. } => "Song analysis failed",
            AnalysisEvent::Completed { .. } => "Analysis completed",
            AnalysisEvent::Cancelled { .. } => "Analysis cancelled",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast handle shared by every emitter and subscriber.
///
/// Cloning is cheap; all clones publish to the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event, returning how many subscribers received it.
    ///
    /// Fails only when there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates an independent receiver for all future events.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Subscribes through an [`EventStream`].
    pub fn stream(&self) -> EventStream {
        EventStream::new(self.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` that skips events not matching its predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus};
///
/// let bus = EventBus::new(16);
/// let analysis_only = bus
///     .stream()
///     .filter(|event| matches!(event, CoreEvent::Analysis(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`/`try_recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events
    /// and `RecvError::Closed` once every sender has been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv); `None` when nothing is buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.accepts(&event) => return Some(Ok(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pushed(id: &str) -> CoreEvent {
        CoreEvent::Sync(SyncEvent::SongPushed {
            song_id: id.to_string(),
        })
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_errors() {
        let bus = EventBus::new(8);
        assert!(bus.emit(pushed("a")).is_err());
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_event() {
        let bus = EventBus::new(8);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        assert_eq!(bus.emit(pushed("a")).unwrap(), 2);

        assert_eq!(first.recv().await.unwrap(), pushed("a"));
        assert_eq!(second.recv().await.unwrap(), pushed("a"));
    }

    #[tokio::test]
    async fn test_stream_filter_skips_other_events() {
        let bus = EventBus::new(8);
        let mut stream = bus
            .stream()
            .filter(|event| matches!(event, CoreEvent::Analysis(_)));

        bus.emit(pushed("a")).unwrap();
        bus.emit(CoreEvent::Analysis(AnalysisEvent::Started { total: 3 }))
            .unwrap();

        let event = stream.recv().await.unwrap();
        assert_eq!(event, CoreEvent::Analysis(AnalysisEvent::Started { total: 3 }));
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber_reports_skipped_events() {
        let bus = EventBus::new(2);
        let mut stream = bus.stream();

        for i in 0..5 {
            bus.emit(pushed(&i.to_string())).unwrap();
        }

        match stream.try_recv() {
            Some(Err(RecvError::Lagged(n))) => assert_eq!(n, 3),
            other => panic!("expected lag, got {:?}", other),
        }
        assert_eq!(stream.try_recv().unwrap().unwrap(), pushed("3"));
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(
            CoreEvent::Sync(SyncEvent::PullFailed {
                message: "offline".into()
            })
            .severity(),
            EventSeverity::Error
        );
        assert_eq!(
            CoreEvent::Analysis(AnalysisEvent::SongFailed {
                song_id: "s".into(),
                message: "bad json".into()
            })
            .severity(),
            EventSeverity::Warning
        );
        assert_eq!(
            CoreEvent::Analysis(AnalysisEvent::Completed {
                analyzed: 1,
                failed: 0
            })
            .severity(),
            EventSeverity::Info
        );
        assert_eq!(pushed("a").severity(), EventSeverity::Debug);
        assert!(EventSeverity::Error > EventSeverity::Warning);
    }

    #[test]
    fn test_event_serialization_shape() {
        let json = serde_json::to_value(pushed("isrc-9")).unwrap();
        assert_eq!(json["type"], "Sync");
        assert_eq!(json["payload"]["event"], "SongPushed");
        assert_eq!(json["payload"]["song_id"], "isrc-9");

        let back: CoreEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.description(), "Song uploaded");
    }
}
