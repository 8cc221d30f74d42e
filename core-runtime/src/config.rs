//! # Core Configuration Module
//!
//! Provides configuration for the playback session controller.
//!
//! ## Overview
//!
//! Two kinds of configuration live here:
//!
//! - [`PlaybackOptions`] - per-session retry settings sent by the UI with
//!   every acquisition (camelCase JSON, every field optional).
//! - [`ControllerConfig`] - process-wide wiring built once by the host with
//!   a builder that fails fast when a required bridge is missing.
//!
//! ## Required Dependencies
//!
//! - `EngineFactory` - creates the native engine of every new session
//!
//! ## Optional Dependencies
//!
//! - `MediaSessionPublisher` - mirrors playback state to the system media session
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::ControllerConfig;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = ControllerConfig::builder()
//!     .engine_factory(Arc::new(ExoEngineFactory::new(context)))
//!     .media_session(Arc::new(AndroidMediaSession::new(context)))
//!     .progress_interval(Duration::from_millis(250))
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::ControllerConfig;
//!
//! // Panics: no engine factory was provided
//! let config = ControllerConfig::builder()
//!     .build()
//!     .expect("Should fail - missing engine factory");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{EngineFactory, MediaSessionPublisher};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Playback Options
// ============================================================================

/// Retry settings of one session.
///
/// Replaced wholesale on every acquisition of the session, so the most recent
/// acquirer decides how future load failures are retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackOptions {
    /// Maximum number of retries per load. Any negative value means unlimited.
    ///
    /// Default: 3.
    #[serde(default = "default_max_retry_count")]
    pub max_retry_count: i32,

    /// Delay before the first retry; retry `n` waits `n` times this value.
    ///
    /// Default: 1000 ms.
    #[serde(default = "default_initial_retry_delay_ms")]
    pub initial_retry_delay_ms: u64,

    /// Upper bound for the retry delay.
    ///
    /// Default: 10000 ms.
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,

    /// When `false`, load errors are never retried.
    ///
    /// Default: true.
    #[serde(default = "default_auto_retry")]
    pub auto_retry: bool,

    /// Accepted for forward compatibility; not acted upon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rebuffer_timeout_ms: Option<u64>,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            max_retry_count: default_max_retry_count(),
            initial_retry_delay_ms: default_initial_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
            auto_retry: default_auto_retry(),
            rebuffer_timeout_ms: None,
        }
    }
}

impl PlaybackOptions {
    /// Options that never retry.
    pub fn no_retry() -> Self {
        Self {
            auto_retry: false,
            ..Self::default()
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_retry_count < 0
    }

    pub fn initial_retry_delay(&self) -> Duration {
        Duration::from_millis(self.initial_retry_delay_ms)
    }

    pub fn max_retry_delay(&self) -> Duration {
        Duration::from_millis(self.max_retry_delay_ms)
    }

    /// Parse options from an untyped JSON value.
    ///
    /// `null` or a missing map yields the defaults; fields of the wrong type
    /// are an error.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value.clone())
            .map_err(|e| Error::Config(format!("Invalid playback options: {}", e)))
    }
}

// Default Functions (for serde)

fn default_max_retry_count() -> i32 {
    3
}

fn default_initial_retry_delay_ms() -> u64 {
    1000
}

fn default_max_retry_delay_ms() -> u64 {
    10_000
}

fn default_auto_retry() -> bool {
    true
}

// ============================================================================
// Controller Configuration
// ============================================================================

/// Delay after `play()` on a ready engine before playback is forced even if
/// no first frame was reported.
pub const DEFAULT_FIRST_FRAME_FALLBACK: Duration = Duration::from_millis(700);

/// Progress polling interval while at least one listener is subscribed.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Peak video bitrate while data saver is on.
pub const DEFAULT_DATA_SAVER_BITRATE: u32 = 800_000;

/// Delays after a video track selection at which the track list is re-sent.
pub const DEFAULT_TRACK_REFRESH_DELAYS: [Duration; 2] =
    [Duration::from_millis(100), Duration::from_millis(300)];

/// Process-wide configuration of the session controller.
///
/// Use [`ControllerConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct ControllerConfig {
    /// Creates the engine of each new session (required)
    pub engine_factory: Arc<dyn EngineFactory>,

    /// System media session (optional)
    pub media_session: Option<Arc<dyn MediaSessionPublisher>>,

    pub first_frame_fallback: Duration,

    pub progress_interval: Duration,

    pub track_refresh_delays: Vec<Duration>,

    /// Peak bitrate (bits per second) applied by data saver
    pub data_saver_bitrate: u32,

    /// Buffer size of each per-session event channel
    pub event_buffer_size: usize,

    /// Retry failed sessions automatically using their `PlaybackOptions`,
    /// on top of the loader-level retries performed inside the engine.
    pub session_auto_retry: bool,
}

impl std::fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerConfig")
            .field("engine_factory", &"EngineFactory { ... }")
            .field(
                "media_session",
                &self
                    .media_session
                    .as_ref()
                    .map(|_| "MediaSessionPublisher { ... }"),
            )
            .field("first_frame_fallback", &self.first_frame_fallback)
            .field("progress_interval", &self.progress_interval)
            .field("track_refresh_delays", &self.track_refresh_delays)
            .field("data_saver_bitrate", &self.data_saver_bitrate)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("session_auto_retry", &self.session_auto_retry)
            .finish()
    }
}

impl ControllerConfig {
    pub fn builder() -> ControllerConfigBuilder {
        ControllerConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// This checks:
    /// - Timer intervals are non-zero
    /// - Data saver bitrate is non-zero
    /// - Event buffer size is non-zero
    pub fn validate(&self) -> Result<()> {
        if self.first_frame_fallback.is_zero() {
            return Err(Error::Config(
                "First frame fallback must be greater than 0 ms".to_string(),
            ));
        }

        if self.progress_interval.is_zero() {
            return Err(Error::Config(
                "Progress interval must be greater than 0 ms".to_string(),
            ));
        }

        if self.data_saver_bitrate == 0 {
            return Err(Error::Config(
                "Data saver bitrate must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn engine_factory_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "EngineFactory".to_string(),
        message: "An EngineFactory is required to create native players. \
                 Android: inject an ExoPlayer-backed factory. \
                 iOS: inject an AVPlayer-backed factory."
            .to_string(),
    }
}

/// Builder for constructing [`ControllerConfig`] instances.
#[derive(Default)]
pub struct ControllerConfigBuilder {
    engine_factory: Option<Arc<dyn EngineFactory>>,
    media_session: Option<Arc<dyn MediaSessionPublisher>>,
    first_frame_fallback: Option<Duration>,
    progress_interval: Option<Duration>,
    track_refresh_delays: Option<Vec<Duration>>,
    data_saver_bitrate: Option<u32>,
    event_buffer_size: Option<usize>,
    session_auto_retry: bool,
}

impl ControllerConfigBuilder {
    /// Sets the engine factory (required).
    pub fn engine_factory(mut self, factory: Arc<dyn EngineFactory>) -> Self {
        self.engine_factory = Some(factory);
        self
    }

    /// Sets the system media session publisher.
    pub fn media_session(mut self, publisher: Arc<dyn MediaSessionPublisher>) -> Self {
        self.media_session = Some(publisher);
        self
    }

    pub fn first_frame_fallback(mut self, delay: Duration) -> Self {
        self.first_frame_fallback = Some(delay);
        self
    }

    pub fn progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = Some(interval);
        self
    }

    /// Replaces the delays at which the track list is re-sent after a video
    /// selection. An empty list disables the refresh.
    pub fn track_refresh_delays(mut self, delays: Vec<Duration>) -> Self {
        self.track_refresh_delays = Some(delays);
        self
    }

    pub fn data_saver_bitrate(mut self, bitrate: u32) -> Self {
        self.data_saver_bitrate = Some(bitrate);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn session_auto_retry(mut self, enabled: bool) -> Self {
        self.session_auto_retry = enabled;
        self
    }

    /// Builds the final `ControllerConfig` instance.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] if no engine factory was provided
    /// - [`Error::Config`] if a value is out of range
    pub fn build(self) -> Result<ControllerConfig> {
        let engine_factory = self
            .engine_factory
            .ok_or_else(engine_factory_missing_error)?;

        let config = ControllerConfig {
            engine_factory,
            media_session: self.media_session,
            first_frame_fallback: self
                .first_frame_fallback
                .unwrap_or(DEFAULT_FIRST_FRAME_FALLBACK),
            progress_interval: self.progress_interval.unwrap_or(DEFAULT_PROGRESS_INTERVAL),
            track_refresh_delays: self
                .track_refresh_delays
                .unwrap_or_else(|| DEFAULT_TRACK_REFRESH_DELAYS.to_vec()),
            data_saver_bitrate: self.data_saver_bitrate.unwrap_or(DEFAULT_DATA_SAVER_BITRATE),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            session_auto_retry: self.session_auto_retry,
        };

        config.validate()?;

        Ok(config)
    }
}
