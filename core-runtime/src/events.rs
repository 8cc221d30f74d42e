//! # Event Bus System
//!
//! Typed session events and the broadcast bus used to fan them out to UI
//! listeners.
//!
//! ## Overview
//!
//! Every playback session exposes three independent channels:
//! - **Progress**: position/duration/buffering snapshots, polled while someone listens
//! - **Tracks**: normalized video/audio/subtitle track lists
//! - **Cues**: the currently visible subtitle text
//!
//! Each channel is an [`EventBus`] over its own payload type, built on
//! `tokio::sync::broadcast`. [`SessionEvent`] is the tagged envelope a UI
//! transport serializes when it multiplexes the channels over one pipe.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   emit    ┌──────────────────┐  subscribe  ┌────────────┐
//! │   Session   ├──────────>│ EventBus<Progress>├───────────>│ Listener A │
//! │ (control    │           └──────────────────┘             └────────────┘
//! │  context)   │   emit    ┌──────────────────┐  subscribe  ┌────────────┐
//! │             ├──────────>│ EventBus<Tracks>  ├───────────>│ Listener B │
//! └─────────────┘           └──────────────────┘             └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, ProgressEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus: EventBus<ProgressEvent> = EventBus::new(16);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(ProgressEvent::default()).ok();
//! assert_eq!(rx.recv().await.unwrap().position_ms, 0);
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for each event channel.
///
/// Subscribers that can't keep up will receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Session Event Payloads
// ============================================================================

/// Playback progress snapshot.
///
/// `is_playing` reflects what the listener should show: it stays `false`
/// while audio is suppressed waiting for the first frame, even if the engine
/// already runs. `error` is set only on the single snapshot emitted for a
/// fatal playback error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub position_ms: u64,
    /// `0` while unknown.
    pub duration_ms: u64,
    pub buffered_position_ms: u64,
    pub is_buffering: bool,
    pub is_playing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressEvent {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// One normalized track as shown to the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    /// Stable identity: `"h:w:b"` for video, `"g:t"` for audio/subtitles.
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub selected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forced: Option<bool>,
}

/// Full track list of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackListEvent {
    pub video: Vec<TrackInfo>,
    pub audio: Vec<TrackInfo>,
    pub subtitle: Vec<TrackInfo>,
}

/// Currently visible subtitle text, lines joined with `\n`. Empty when no
/// cue is shown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CueEvent {
    pub text: String,
}

/// Tagged envelope for transports that carry all channels over one pipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum SessionEvent {
    Progress(ProgressEvent),
    Tracks(TrackListEvent),
    Cues(CueEvent),
}

impl SessionEvent {
    /// Name of the channel the event belongs to.
    pub fn channel(&self) -> &'static str {
        match self {
            SessionEvent::Progress(_) => "progress",
            SessionEvent::Tracks(_) => "tracks",
            SessionEvent::Cues(_) => "cues",
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            SessionEvent::Progress(p) if p.is_error() => EventSeverity::Error,
            SessionEvent::Tracks(_) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

impl From<ProgressEvent> for SessionEvent {
    fn from(event: ProgressEvent) -> Self {
        SessionEvent::Progress(event)
    }
}

impl From<TrackListEvent> for SessionEvent {
    fn from(event: TrackListEvent) -> Self {
        SessionEvent::Tracks(event)
    }
}

impl From<CueEvent> for SessionEvent {
    fn from(event: CueEvent) -> Self {
        SessionEvent::Cues(event)
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
// Event Bus
// ============================================================================

/// Broadcast channel for one event type.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
///
/// Dropping the last `EventBus` clone closes the channel; receivers then get
/// `RecvError::Closed`.
pub struct EventBus<T> {
    sender: broadcast::Sender<T>,
}

impl<T: Clone> EventBus<T> {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   Must be greater than zero.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are no active subscribers.
    pub fn emit(&self, event: T) -> Result<usize, SendError<T>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<T> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<T: Clone> Default for EventBus<T> {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T> fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.sender.receiver_count())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
