//! # Timers and Event Marshalling
//!
//! Everything that happens "later" in a session (the first-frame fallback,
//! progress polling, session retry backoff, delayed track refreshes) is a
//! cancelable timer created through a [`Scheduler`]. A firing timer never
//! touches the session directly: it posts a [`TimerMessage`] back to the
//! control loop, which checks the session key and task id before acting.
//!
//! The scheduler also hands out the [`EngineEventSink`] each engine reports
//! through, so engine callbacks from arbitrary threads end up on the same
//! control queue.

use bridge_traits::{ControllerId, EngineEvent, EngineEventSink};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::controller::ControlMessage;

/// Identity of one incarnation of a session.
///
/// The epoch changes every time a session is created for the same controller
/// id, so messages aimed at a destroyed session are recognized as stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub controller_id: ControllerId,
    pub epoch: u64,
}

impl SessionKey {
    pub fn new(controller_id: ControllerId, epoch: u64) -> Self {
        Self {
            controller_id,
            epoch,
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.controller_id, self.epoch)
    }
}

/// Unique id of one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Force playback when no first frame arrives in time.
    Fallback,
    /// Emit a progress snapshot and re-arm.
    ProgressTick,
    /// Session-level retry after a fatal error.
    Retry,
    /// Re-send the track list after a video selection.
    TrackRefresh,
}

/// Posted to the control loop when a timer fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerMessage {
    pub key: SessionKey,
    pub kind: TimerKind,
    pub task: TaskId,
}

/// Cancel handle of a scheduled timer.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    task: TaskId,
    token: CancellationToken,
}

impl TimerHandle {
    pub fn new(task: TaskId, token: CancellationToken) -> Self {
        Self { task, token }
    }

    pub fn task(&self) -> TaskId {
        self.task
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Source of timers and engine sinks for the registry.
pub trait Scheduler: Send + Sync {
    /// Deliver a [`TimerMessage`] for `key` after `delay` unless cancelled.
    fn schedule(&self, delay: Duration, key: SessionKey, kind: TimerKind) -> TimerHandle;

    /// Sink the engine of session `key` reports through.
    fn engine_sink(&self, key: SessionKey) -> Arc<dyn EngineEventSink>;
}

/// [`Scheduler`] backed by tokio tasks posting into the control queue.
///
/// `schedule` must be called from within a tokio runtime.
pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<ControlMessage>,
    next_task: AtomicU64,
}

impl TokioScheduler {
    pub fn new(tx: mpsc::UnboundedSender<ControlMessage>) -> Self {
        Self {
            tx,
            next_task: AtomicU64::new(1),
        }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, key: SessionKey, kind: TimerKind) -> TimerHandle {
        let task = TaskId(self.next_task.fetch_add(1, Ordering::Relaxed));
        let token = CancellationToken::new();
        let child = token.clone();
        let tx = self.tx.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = child.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let message = ControlMessage::Timer(TimerMessage { key, kind, task });
                    if tx.send(message).is_err() {
                        trace!(?kind, "Timer fired after controller shutdown");
                    }
                }
            }
        });

        TimerHandle::new(task, token)
    }

    fn engine_sink(&self, key: SessionKey) -> Arc<dyn EngineEventSink> {
        Arc::new(ControlSink {
            key,
            tx: self.tx.clone(),
        })
    }
}

/// Forwards engine callbacks into the control queue, tagged with the session key.
struct ControlSink {
    key: SessionKey,
    tx: mpsc::UnboundedSender<ControlMessage>,
}

impl EngineEventSink for ControlSink {
    fn deliver(&self, event: EngineEvent) {
        let message = ControlMessage::Engine {
            key: self.key.clone(),
            event,
        };
        if self.tx.send(message).is_err() {
            trace!(session = %self.key, "Engine event after controller shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SessionKey {
        SessionKey::new(ControllerId::Numeric(1), 1)
    }

    #[tokio::test(start_paused = true)]
    async fn timer_posts_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = TokioScheduler::new(tx);

        let handle = scheduler.schedule(Duration::from_millis(700), key(), TimerKind::Fallback);

        tokio::time::sleep(Duration::from_millis(699)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(2)).await;
        match rx.try_recv() {
            Ok(ControlMessage::Timer(message)) => {
                assert_eq!(message.task, handle.task());
                assert_eq!(message.kind, TimerKind::Fallback);
                assert_eq!(message.key, key());
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = TokioScheduler::new(tx);

        let handle = scheduler.schedule(Duration::from_millis(500), key(), TimerKind::ProgressTick);
        handle.cancel();
        assert!(handle.is_cancelled());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn task_ids_are_unique() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let scheduler = TokioScheduler::new(tx);

        let a = scheduler.schedule(Duration::from_secs(1), key(), TimerKind::Retry);
        let b = scheduler.schedule(Duration::from_secs(1), key(), TimerKind::Retry);
        assert_ne!(a.task(), b.task());
        a.cancel();
        b.cancel();
    }

    #[test]
    fn engine_sink_tags_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = TokioScheduler::new(tx);

        scheduler
            .engine_sink(key())
            .deliver(EngineEvent::FirstFrameRendered);

        match rx.try_recv() {
            Ok(ControlMessage::Engine { key: k, event }) => {
                assert_eq!(k, key());
                assert_eq!(event, EngineEvent::FirstFrameRendered);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }
}
