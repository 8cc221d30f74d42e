//! # Playback Session Controller
//!
//! Shares one media engine per logical controller between any number of
//! presenters and keeps playback coherent while surfaces come and go.
//!
//! ## Overview
//!
//! This crate handles:
//! - Session lifetime keyed by controller id, with reference counting and
//!   multiple presenters (the last attached one is bound)
//! - Audio suppression until the first video frame renders, with a fallback
//!   timer for engines that never report it
//! - Load-error retry policy and error-driven automatic retry
//! - Track identity normalization for video, audio and subtitle selection
//! - Per-session fan-out of progress, track list and cue events
//! - The command surface exposed to UI transports
//!
//! ## Layout
//!
//! - [`registry::SessionRegistry`] - Synchronous session map; owns every [`session::Session`]
//! - [`controller::SessionController`] - Async handle; serializes all work on one control task
//! - [`suppression::Suppression`] - Pure first-frame state machine returning [`suppression::Effect`]s
//! - [`scheduler::Scheduler`] - Cancellable timers and engine callback marshaling

pub mod commands;
pub mod controller;
pub mod error;
pub mod fanout;
pub mod registry;
pub mod retry;
pub mod scheduler;
pub mod session;
pub mod source;
pub mod suppression;
pub mod tracks;

pub use commands::{CommandContext, CommandReply, PlayerCommand};
pub use controller::{ControlMessage, SessionController};
pub use error::{PlaybackError, Result};
pub use fanout::{Channel, Subscription, SubscriptionId};
pub use registry::{AcquireRequest, SessionInfo, SessionRegistry};
pub use retry::RetryPolicy;
pub use scheduler::{Scheduler, SessionKey, TaskId, TimerHandle, TimerKind, TimerMessage, TokioScheduler};
pub use source::{DrmSource, InitArgs, MediaSource};
pub use suppression::{Effect, EngineSnapshot, Phase, Suppression};
pub use tracks::{GroupTrackId, VideoTrackId};
