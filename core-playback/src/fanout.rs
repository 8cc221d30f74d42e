//! # Event Fan-Out
//!
//! Per-session broadcast of progress, track list and cue events.
//!
//! Each channel can be subscribed independently. A new subscription first
//! yields the current snapshot, then live events. Emitting on a channel
//! nobody listens to is a silent no-op. Progress is polled by the session
//! only while [`FanOut::has_progress_listeners`] holds.

use bridge_traits::{EngineState, MediaEngine, MediaSessionState, MediaSessionStatus};
use core_runtime::events::{
    CueEvent, EventBus, ProgressEvent, Receiver, RecvError, SessionEvent, TrackListEvent,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::trace;
use uuid::Uuid;

/// Identity of one subscription, unique across sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Progress,
    Tracks,
    Cues,
}

type DropHook = Box<dyn FnOnce(SubscriptionId) + Send>;

/// Receiving end of one channel subscription.
///
/// Dropping it unsubscribes.
pub struct Subscription<T> {
    id: SubscriptionId,
    channel: Channel,
    receiver: Receiver<T>,
    initial: Option<T>,
    on_drop: Option<DropHook>,
}

impl<T: Clone> Subscription<T> {
    fn new(id: SubscriptionId, channel: Channel, receiver: Receiver<T>, initial: T) -> Self {
        Self {
            id,
            channel,
            receiver,
            initial: Some(initial),
            on_drop: None,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Next event; the snapshot taken at subscription comes first.
    ///
    /// Returns `RecvError::Closed` once the session is destroyed.
    pub async fn recv(&mut self) -> Result<T, RecvError> {
        if let Some(initial) = self.initial.take() {
            return Ok(initial);
        }
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Result<T, TryRecvError> {
        if let Some(initial) = self.initial.take() {
            return Ok(initial);
        }
        self.receiver.try_recv()
    }

    /// Run `hook` with the subscription id when this subscription is dropped.
    pub(crate) fn on_drop(mut self, hook: impl FnOnce(SubscriptionId) + Send + 'static) -> Self {
        self.on_drop = Some(Box::new(hook));
        self
    }
}

impl<T: Clone + Into<SessionEvent>> Subscription<T> {
    /// Like [`recv`](Self::recv), wrapped in the envelope transports use
    /// when several channels share one pipe.
    pub async fn recv_event(&mut self) -> Result<SessionEvent, RecvError> {
        self.recv().await.map(Into::into)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(hook) = self.on_drop.take() {
            hook(self.id);
        }
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("channel", &self.channel)
            .finish()
    }
}

/// The three channels of one session and their live subscriptions.
#[derive(Debug)]
pub struct FanOut {
    progress: EventBus<ProgressEvent>,
    tracks: EventBus<TrackListEvent>,
    cues: EventBus<CueEvent>,
    subscriptions: HashMap<SubscriptionId, Channel>,
}

impl FanOut {
    pub fn new(capacity: usize) -> Self {
        Self {
            progress: EventBus::new(capacity),
            tracks: EventBus::new(capacity),
            cues: EventBus::new(capacity),
            subscriptions: HashMap::new(),
        }
    }

    pub fn subscribe_progress(&mut self, initial: ProgressEvent) -> Subscription<ProgressEvent> {
        let id = self.register(Channel::Progress);
        Subscription::new(id, Channel::Progress, self.progress.subscribe(), initial)
    }

    pub fn subscribe_tracks(&mut self, initial: TrackListEvent) -> Subscription<TrackListEvent> {
        let id = self.register(Channel::Tracks);
        Subscription::new(id, Channel::Tracks, self.tracks.subscribe(), initial)
    }

    pub fn subscribe_cues(&mut self, initial: CueEvent) -> Subscription<CueEvent> {
        let id = self.register(Channel::Cues);
        Subscription::new(id, Channel::Cues, self.cues.subscribe(), initial)
    }

    fn register(&mut self, channel: Channel) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.subscriptions.insert(id, channel);
        id
    }

    /// Forget a subscription. Returns its channel if it was known.
    pub fn unsubscribe(&mut self, id: &SubscriptionId) -> Option<Channel> {
        self.subscriptions.remove(id)
    }

    pub fn has_progress_listeners(&self) -> bool {
        self.progress.subscriber_count() > 0
            && self
                .subscriptions
                .values()
                .any(|channel| *channel == Channel::Progress)
    }

    pub fn listener_count(&self, channel: Channel) -> usize {
        match channel {
            Channel::Progress => self.progress.subscriber_count(),
            Channel::Tracks => self.tracks.subscriber_count(),
            Channel::Cues => self.cues.subscriber_count(),
        }
    }

    pub fn emit_progress(&self, event: ProgressEvent) -> bool {
        deliver(&self.progress, Channel::Progress, event)
    }

    pub fn emit_tracks(&self, event: TrackListEvent) -> bool {
        deliver(&self.tracks, Channel::Tracks, event)
    }

    pub fn emit_cues(&self, event: CueEvent) -> bool {
        deliver(&self.cues, Channel::Cues, event)
    }
}

fn deliver<T: Clone>(bus: &EventBus<T>, channel: Channel, event: T) -> bool {
    match bus.emit(event) {
        Ok(_) => true,
        Err(_) => {
            trace!(?channel, "Dropping event without listeners");
            false
        }
    }
}

// ============================================================================
// Snapshots
// ============================================================================

/// Current progress of `engine`. `is_playing` is the listener-facing value
/// (false while audio is suppressed).
pub fn progress_snapshot(engine: &dyn MediaEngine, is_playing: bool) -> ProgressEvent {
    ProgressEvent {
        position_ms: millis(engine.position()),
        duration_ms: engine.duration().map(millis).unwrap_or(0),
        buffered_position_ms: millis(engine.buffered_position()),
        is_buffering: engine.state() == EngineState::Buffering,
        is_playing,
        error: None,
    }
}

/// The one-off snapshot emitted for a fatal error.
pub fn error_snapshot(engine: &dyn MediaEngine, message: String) -> ProgressEvent {
    ProgressEvent {
        position_ms: millis(engine.position()),
        duration_ms: engine.duration().map(millis).unwrap_or(0),
        buffered_position_ms: 0,
        is_buffering: false,
        is_playing: false,
        error: Some(message),
    }
}

/// System media session state mirroring a progress snapshot.
pub fn media_session_state(progress: &ProgressEvent, speed: f32) -> MediaSessionState {
    let status = if progress.is_buffering {
        MediaSessionStatus::Buffering
    } else if progress.is_playing {
        MediaSessionStatus::Playing
    } else {
        MediaSessionStatus::Paused
    };
    MediaSessionState {
        status,
        position: std::time::Duration::from_millis(progress.position_ms),
        speed: if progress.is_playing { speed } else { 0.0 },
    }
}

fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn subscription_yields_snapshot_first() {
        let mut fanout = FanOut::new(8);
        let mut sub = fanout.subscribe_cues(CueEvent {
            text: "now".to_string(),
        });

        fanout.emit_cues(CueEvent {
            text: "later".to_string(),
        });

        assert_eq!(sub.try_recv().unwrap().text, "now");
        assert_eq!(sub.try_recv().unwrap().text, "later");
        assert!(matches!(sub.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn emit_without_listeners_is_silent() {
        let fanout = FanOut::new(8);
        assert!(!fanout.emit_progress(ProgressEvent::default()));
        assert!(!fanout.emit_tracks(TrackListEvent::default()));
    }

    #[test]
    fn progress_listeners_track_subscriptions() {
        let mut fanout = FanOut::new(8);
        assert!(!fanout.has_progress_listeners());

        let a = fanout.subscribe_progress(ProgressEvent::default());
        let b = fanout.subscribe_progress(ProgressEvent::default());
        let _tracks = fanout.subscribe_tracks(TrackListEvent::default());
        assert!(fanout.has_progress_listeners());
        assert_eq!(fanout.listener_count(Channel::Progress), 2);

        assert_eq!(fanout.unsubscribe(&a.id()), Some(Channel::Progress));
        drop(a);
        assert!(fanout.has_progress_listeners());

        fanout.unsubscribe(&b.id());
        assert!(!fanout.has_progress_listeners());
        assert_eq!(fanout.unsubscribe(&b.id()), None);
    }

    #[test]
    fn dropped_receiver_counts_as_gone() {
        let mut fanout = FanOut::new(8);
        let sub = fanout.subscribe_progress(ProgressEvent::default());
        drop(sub);
        assert!(!fanout.has_progress_listeners());
    }

    #[test]
    fn drop_hook_runs_once() {
        let mut fanout = FanOut::new(8);
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);

        let sub = fanout
            .subscribe_tracks(TrackListEvent::default())
            .on_drop(move |_| flag.store(true, Ordering::SeqCst));
        assert!(!fired.load(Ordering::SeqCst));
        drop(sub);
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn media_session_mirrors_progress() {
        let playing = ProgressEvent {
            position_ms: 1500,
            is_playing: true,
            ..Default::default()
        };
        let state = media_session_state(&playing, 1.5);
        assert_eq!(state.status, MediaSessionStatus::Playing);
        assert_eq!(state.speed, 1.5);

        let buffering = ProgressEvent {
            is_buffering: true,
            ..Default::default()
        };
        let state = media_session_state(&buffering, 1.5);
        assert_eq!(state.status, MediaSessionStatus::Buffering);
        assert_eq!(state.speed, 0.0);

        let state = media_session_state(&ProgressEvent::default(), 1.0);
        assert_eq!(state.status, MediaSessionStatus::Paused);
    }

    #[tokio::test]
    async fn events_carry_their_channel() {
        let mut fanout = FanOut::new(8);
        let mut cues = fanout.subscribe_cues(CueEvent::default());
        let mut progress = fanout.subscribe_progress(ProgressEvent::default());

        assert_eq!(cues.recv_event().await.unwrap().channel(), "cues");
        assert_eq!(progress.recv_event().await.unwrap().channel(), "progress");
    }

    #[tokio::test]
    async fn closed_after_fanout_dropped() {
        let mut fanout = FanOut::new(8);
        let mut sub = fanout.subscribe_progress(ProgressEvent::default());
        drop(fanout);

        assert!(sub.recv().await.is_ok());
        assert!(matches!(sub.recv().await, Err(RecvError::Closed)));
    }
}
