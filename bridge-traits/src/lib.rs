//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the playback session controller and
//! the platform-specific pieces it drives. Each trait represents a capability
//! the core requires but that is implemented differently per platform (an
//! ExoPlayer-backed engine on Android, an AVPlayer-backed engine on iOS, ...).
//!
//! ## Traits
//!
//! ### Media Engine
//! - [`MediaEngine`](engine::MediaEngine) - Imperative player commands and state queries
//! - [`EngineFactory`](engine::EngineFactory) - Creates one engine per logical controller
//! - [`EngineEventSink`](engine::EngineEventSink) - Receives asynchronous engine callbacks
//! - [`LoadErrorPolicy`](engine::LoadErrorPolicy) - Consulted by the engine loader on load failures
//!
//! ### UI Surfaces
//! - [`Presenter`](presenter::Presenter) - A rendering surface that can show the engine's video
//!
//! ### Host Integration
//! - [`HostWindow`](host::HostWindow) - Picture-in-picture and other window-level requests
//! - [`MediaSessionPublisher`](host::MediaSessionPublisher) - System media session / lock screen state
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Capabilities, not platforms
//!
//! The core never branches on the host platform. Engines describe what they
//! can do through [`EngineCapabilities`](engine::EngineCapabilities) and the
//! core adapts (e.g. peak-bitrate video selection instead of rendition
//! overrides, or emulated looping when the engine has no repeat mode).
//!
//! ## Threading
//!
//! Engine callbacks may arrive on any thread. Implementations hand them to the
//! [`EngineEventSink`](engine::EngineEventSink) they were created with; the core
//! marshals them onto its single control context before applying them.
//! All traits therefore require `Send + Sync`.
//!
//! ## Example
//!
//! ```ignore
//! use bridge_traits::engine::{EngineFactory, EngineEventSink, LoadErrorPolicy, MediaEngine};
//! use bridge_traits::{ControllerId, Result};
//! use std::sync::Arc;
//!
//! struct ExoEngineFactory;
//!
//! impl EngineFactory for ExoEngineFactory {
//!     fn create(
//!         &self,
//!         controller_id: &ControllerId,
//!         events: Arc<dyn EngineEventSink>,
//!         load_policy: Arc<dyn LoadErrorPolicy>,
//!     ) -> Result<Box<dyn MediaEngine>> {
//!         // Build the native player and wire its listener to `events`
//!         todo!()
//!     }
//! }
//! ```

pub mod engine;
pub mod error;
pub mod host;
pub mod ids;
pub mod logging;
pub mod presenter;

pub use error::{BridgeError, Result};

// Re-export commonly used types
pub use engine::{
    Cue, DrmConfiguration, DrmScheme, EngineCapabilities, EngineError, EngineEvent,
    EngineEventSink, EngineFactory, EngineState, LoadErrorPolicy, MediaEngine, MediaItem,
    TrackFormat, TrackGroup, TrackKind, TrackOverride, TrackSelectionParameters,
    VideoSelectionMode, VideoSize,
};
pub use host::{AspectRatio, HostWindow, MediaSessionPublisher, MediaSessionState, MediaSessionStatus};
pub use ids::{ControllerId, PresenterId};
pub use logging::{LogEntry, LogLevel, LoggerSink};
pub use presenter::{BoxFit, Presenter};
