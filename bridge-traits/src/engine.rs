//! Media engine bridge traits and supporting types.
//!
//! The engine is the native decode/render/network component (ExoPlayer,
//! AVPlayer, ...). The core treats it as a black box that accepts
//! fire-and-forget commands, answers cheap state queries and reports changes
//! through an [`EngineEventSink`].

use crate::error::Result;
use crate::ids::ControllerId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

/// Coarse playback state reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    /// No media prepared, or the engine failed and dropped its resources.
    Idle,
    /// Waiting for data before playback can continue.
    Buffering,
    /// Able to play immediately from the current position.
    Ready,
    /// Reached the end of the media.
    Ended,
}

/// Fatal error reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineError {
    /// Short engine-specific code name (e.g. `ERROR_CODE_IO_NETWORK_CONNECTION_FAILED`).
    pub code: Option<String>,
    /// Human-readable description.
    pub message: Option<String>,
}

impl EngineError {
    pub fn new(code: Option<String>, message: Option<String>) -> Self {
        Self { code, message }
    }

    /// The text surfaced to the UI: code name first, then message.
    pub fn display_message(&self) -> String {
        self.code
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "Playback error".to_string())
    }
}

/// A single subtitle cue as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cue {
    pub text: Option<String>,
}

impl Cue {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

/// Asynchronous engine callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    StateChanged(EngineState),
    IsPlayingChanged(bool),
    FirstFrameRendered,
    TracksChanged,
    CuesChanged(Vec<Cue>),
    Error(EngineError),
}

/// Media kind of a track group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
    Subtitle,
}

/// Format of one track inside a group, normalized from the engine's own
/// descriptors. Unknown numeric values are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackFormat {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub bitrate: Option<u32>,
    pub label: Option<String>,
    pub language: Option<String>,
    pub codecs: Option<String>,
    pub forced: bool,
    pub supported: bool,
    pub selected: bool,
}

/// A group of alternative tracks of the same kind.
///
/// For adaptive video a group holds the renditions of one stream. The index
/// of a group is its position in [`MediaEngine::track_groups`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackGroup {
    pub kind: TrackKind,
    pub supported: bool,
    pub tracks: Vec<TrackFormat>,
}

/// Width/height pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoSize {
    pub width: u32,
    pub height: u32,
}

impl VideoSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Forces the engine to pick specific tracks of one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackOverride {
    pub kind: TrackKind,
    pub group_index: usize,
    pub track_indices: Vec<usize>,
}

impl TrackOverride {
    pub fn single(kind: TrackKind, group_index: usize, track_index: usize) -> Self {
        Self {
            kind,
            group_index,
            track_indices: vec![track_index],
        }
    }
}

/// Track selection constraints pushed to the engine as a whole.
///
/// The core owns the authoritative copy and re-applies it after every change,
/// so engines only need to translate it into their native parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackSelectionParameters {
    pub overrides: Vec<TrackOverride>,
    pub max_video_size: Option<VideoSize>,
    pub max_video_bitrate: Option<u32>,
    pub disabled_kinds: BTreeSet<TrackKind>,
}

impl TrackSelectionParameters {
    pub fn clear_overrides_of_kind(&mut self, kind: TrackKind) -> &mut Self {
        self.overrides.retain(|o| o.kind != kind);
        self
    }

    /// Install an override, replacing any existing override for the same group.
    pub fn set_override(&mut self, track_override: TrackOverride) -> &mut Self {
        self.overrides.retain(|o| {
            !(o.kind == track_override.kind && o.group_index == track_override.group_index)
        });
        self.overrides.push(track_override);
        self
    }

    pub fn override_for(&self, kind: TrackKind) -> Option<&TrackOverride> {
        self.overrides.iter().find(|o| o.kind == kind)
    }

    pub fn set_max_video_size(&mut self, size: Option<VideoSize>) -> &mut Self {
        self.max_video_size = size;
        self
    }

    pub fn set_max_video_bitrate(&mut self, bitrate: Option<u32>) -> &mut Self {
        self.max_video_bitrate = bitrate;
        self
    }

    pub fn set_kind_disabled(&mut self, kind: TrackKind, disabled: bool) -> &mut Self {
        if disabled {
            self.disabled_kinds.insert(kind);
        } else {
            self.disabled_kinds.remove(&kind);
        }
        self
    }

    pub fn is_kind_disabled(&self, kind: TrackKind) -> bool {
        self.disabled_kinds.contains(&kind)
    }
}

/// How an engine lets callers pin a video rendition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoSelectionMode {
    /// Group/track overrides plus size and bitrate clamps (ExoPlayer style).
    #[default]
    RenditionOverride,
    /// Only a peak bitrate cap is available (AVPlayer style).
    PeakBitrate,
}

/// Capabilities an engine reports to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineCapabilities {
    pub video_selection: VideoSelectionMode,
    /// Engine loops by itself when repeat is enabled.
    pub native_repeat: bool,
    pub picture_in_picture: bool,
}

impl Default for EngineCapabilities {
    fn default() -> Self {
        Self {
            video_selection: VideoSelectionMode::RenditionOverride,
            native_repeat: true,
            picture_in_picture: true,
        }
    }
}

/// Content protection scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrmScheme {
    Widevine,
    ClearKey,
}

/// DRM parameters resolved by the core, ready for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrmConfiguration {
    pub scheme: DrmScheme,
    pub license_uri: Option<String>,
    pub request_headers: HashMap<String, String>,
}

/// One playable item handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub uri: String,
    pub headers: HashMap<String, String>,
    pub drm: Option<DrmConfiguration>,
    /// Hint to tune buffering for live streams.
    pub is_live: bool,
}

/// Consulted by the engine's network loader on each failed load.
pub trait LoadErrorPolicy: Send + Sync {
    /// Delay before retrying the load, or `None` to give up.
    /// `error_count` is 1-based.
    fn retry_delay(&self, error_count: u32) -> Option<Duration>;

    /// Lower bound for per-loadable retries, or `None` for the engine default.
    fn minimum_loadable_retry_count(&self) -> Option<u32>;
}

/// Receives engine callbacks. May be called from any thread.
pub trait EngineEventSink: Send + Sync {
    fn deliver(&self, event: EngineEvent);
}

/// Imperative surface of one native player.
///
/// Commands are fire-and-forget: they must not block waiting for the engine
/// to reach the requested state. Queries must be cheap.
pub trait MediaEngine: Send + Sync {
    fn capabilities(&self) -> EngineCapabilities;

    /// Replace the playlist. Does not prepare.
    fn set_media_items(&self, items: Vec<MediaItem>);

    /// Start (or restart after an error) loading the current playlist.
    fn prepare(&self) -> Result<()>;

    fn play(&self);

    fn pause(&self);

    fn set_play_when_ready(&self, play_when_ready: bool);

    fn seek_to(&self, position: Duration);

    fn set_speed(&self, speed: f32);

    fn set_repeat(&self, repeat: bool);

    /// Output volume, `0.0..=1.0`.
    fn set_volume(&self, volume: f32);

    fn apply_track_selection(&self, parameters: &TrackSelectionParameters);

    /// Release native resources. No other call follows.
    fn release(&self);

    fn state(&self) -> EngineState;

    fn is_playing(&self) -> bool;

    fn play_when_ready(&self) -> bool;

    fn volume(&self) -> f32;

    fn speed(&self) -> f32;

    fn position(&self) -> Duration;

    /// `None` while unknown (live streams, not yet prepared).
    fn duration(&self) -> Option<Duration>;

    fn buffered_position(&self) -> Duration;

    fn track_groups(&self) -> Vec<TrackGroup>;

    fn current_cues(&self) -> Vec<Cue>;

    fn video_size(&self) -> Option<VideoSize>;
}

/// Creates engines for new sessions.
pub trait EngineFactory: Send + Sync {
    fn create(
        &self,
        controller_id: &ControllerId,
        events: Arc<dyn EngineEventSink>,
        load_policy: Arc<dyn LoadErrorPolicy>,
    ) -> Result<Box<dyn MediaEngine>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_error_prefers_code_name() {
        let err = EngineError::new(
            Some("ERROR_CODE_IO_BAD_HTTP_STATUS".into()),
            Some("Response code: 404".into()),
        );
        assert_eq!(err.display_message(), "ERROR_CODE_IO_BAD_HTTP_STATUS");

        let err = EngineError::new(None, Some("Response code: 404".into()));
        assert_eq!(err.display_message(), "Response code: 404");

        assert_eq!(EngineError::new(None, None).display_message(), "Playback error");
    }

    #[test]
    fn set_override_replaces_same_group() {
        let mut params = TrackSelectionParameters::default();
        params
            .set_override(TrackOverride::single(TrackKind::Audio, 2, 0))
            .set_override(TrackOverride::single(TrackKind::Audio, 2, 1));

        assert_eq!(params.overrides.len(), 1);
        assert_eq!(params.override_for(TrackKind::Audio).unwrap().track_indices, vec![1]);

        params.clear_overrides_of_kind(TrackKind::Audio);
        assert!(params.override_for(TrackKind::Audio).is_none());
    }

    #[test]
    fn kind_disable_toggles() {
        let mut params = TrackSelectionParameters::default();
        params.set_kind_disabled(TrackKind::Subtitle, true);
        assert!(params.is_kind_disabled(TrackKind::Subtitle));
        params.set_kind_disabled(TrackKind::Subtitle, false);
        assert!(!params.is_kind_disabled(TrackKind::Subtitle));
    }
}
