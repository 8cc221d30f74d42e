//! Media sources and initialization arguments as sent by the UI.
//!
//! Sources arrive as loose JSON maps; they are deserialized here and resolved
//! into the engine's [`MediaItem`]s, including DRM license configuration.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bridge_traits::{ControllerId, DrmConfiguration, DrmScheme, MediaItem, PresenterId};
use core_runtime::config::PlaybackOptions;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use crate::error::{PlaybackError, Result};

/// One playable source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaSource {
    pub url: String,
    /// HTTP headers for every media request. Non-string values are dropped.
    #[serde(default, deserialize_with = "string_map")]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub drm: Option<DrmSource>,
    #[serde(default)]
    pub is_live: bool,
}

/// DRM description of a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrmSource {
    /// `widevine` or `clearkey`, case-insensitive.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub license_url: Option<String>,
    #[serde(default)]
    pub content_id: Option<String>,
    /// Inline ClearKey JSON (`{"keys":[...]}`).
    #[serde(default)]
    pub clear_key: Option<String>,
    #[serde(default, deserialize_with = "string_map")]
    pub headers: HashMap<String, String>,
}

fn string_map<'de, D>(deserializer: D) -> std::result::Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<HashMap<String, Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| match v {
            Value::String(s) => Some((k, s)),
            _ => None,
        })
        .collect())
}

impl MediaSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
            drm: None,
            is_live: false,
        }
    }

    /// Parse a source map. `null` means "no source".
    pub fn from_json(value: &Value) -> Result<Option<Self>> {
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value.clone())?))
    }

    pub fn to_media_item(&self) -> MediaItem {
        MediaItem {
            uri: self.url.clone(),
            headers: self.headers.clone(),
            drm: self.drm.as_ref().and_then(DrmSource::resolve),
            is_live: self.is_live,
        }
    }
}

impl DrmSource {
    /// Resolve into an engine DRM configuration, or `None` when the scheme is
    /// unknown or lacks what it needs.
    pub fn resolve(&self) -> Option<DrmConfiguration> {
        match self.kind.to_ascii_lowercase().as_str() {
            "widevine" => {
                let license_uri = self.license_url.clone()?;
                let mut request_headers = HashMap::new();
                if let Some(content_id) = &self.content_id {
                    request_headers.insert("Content-ID".to_string(), content_id.clone());
                }
                request_headers.extend(self.headers.clone());
                Some(DrmConfiguration {
                    scheme: DrmScheme::Widevine,
                    license_uri: Some(license_uri),
                    request_headers,
                })
            }
            "clearkey" => {
                let license_uri = match &self.clear_key {
                    Some(json) => Some(clear_key_data_uri(json)),
                    None => self.license_url.clone(),
                };
                Some(DrmConfiguration {
                    scheme: DrmScheme::ClearKey,
                    license_uri,
                    request_headers: self.headers.clone(),
                })
            }
            other => {
                warn!(scheme = other, "Ignoring unsupported DRM scheme");
                None
            }
        }
    }
}

/// Inline ClearKey license served from a `data:` URI.
pub fn clear_key_data_uri(json: &str) -> String {
    format!("data:application/json;base64,{}", STANDARD.encode(json.as_bytes()))
}

// ============================================================================
// Initialization Arguments
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInitArgs {
    #[serde(default = "default_true")]
    auto_play: bool,
    #[serde(default, rename = "loop")]
    looping: bool,
    #[serde(default)]
    start_position_ms: i64,
    #[serde(default)]
    start_auto_play: Option<bool>,
    #[serde(default)]
    data_saver: bool,
    #[serde(default)]
    playlist: Option<Vec<Value>>,
    #[serde(default)]
    playback_options: Value,
    #[serde(default)]
    controller_id: Option<ControllerId>,
}

fn default_true() -> bool {
    true
}

/// Arguments a presenter sends when it acquires a session.
///
/// Only the first acquisition of a session applies `playlist`, `loop`,
/// `startPositionMs`, `startAutoPlay` and `dataSaver`; `playbackOptions` is
/// applied by every acquisition.
#[derive(Debug, Clone, PartialEq)]
pub struct InitArgs {
    pub auto_play: bool,
    pub looping: bool,
    pub start_position_ms: u64,
    pub start_auto_play: bool,
    pub data_saver: bool,
    pub playlist: Vec<MediaSource>,
    pub playback_options: PlaybackOptions,
    pub controller_id: Option<ControllerId>,
}

impl Default for InitArgs {
    fn default() -> Self {
        Self {
            auto_play: true,
            looping: false,
            start_position_ms: 0,
            start_auto_play: true,
            data_saver: false,
            playlist: Vec::new(),
            playback_options: PlaybackOptions::default(),
            controller_id: None,
        }
    }
}

impl InitArgs {
    /// Parse the creation arguments map. `null` yields the defaults.
    ///
    /// Playlist entries that are not valid sources are skipped.
    pub fn from_json(value: &Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        let raw: RawInitArgs = serde_json::from_value(value.clone())?;

        let playlist = raw
            .playlist
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value::<MediaSource>(entry) {
                Ok(source) => Some(source),
                Err(e) => {
                    warn!(index, error = %e, "Skipping invalid playlist entry");
                    None
                }
            })
            .collect();

        Ok(Self {
            auto_play: raw.auto_play,
            looping: raw.looping,
            start_position_ms: u64::try_from(raw.start_position_ms).unwrap_or(0),
            start_auto_play: raw.start_auto_play.unwrap_or(raw.auto_play),
            data_saver: raw.data_saver,
            playlist,
            playback_options: PlaybackOptions::from_json(&raw.playback_options)
                .map_err(PlaybackError::from)?,
            controller_id: raw.controller_id,
        })
    }

    pub fn with_playlist(mut self, playlist: Vec<MediaSource>) -> Self {
        self.playlist = playlist;
        self
    }

    pub fn with_auto_play(mut self, auto_play: bool) -> Self {
        self.auto_play = auto_play;
        self.start_auto_play = auto_play;
        self
    }

    pub fn with_playback_options(mut self, options: PlaybackOptions) -> Self {
        self.playback_options = options;
        self
    }

    /// The controller id to share, defaulting to the presenter's own id.
    pub fn controller_id_or(&self, presenter: PresenterId) -> ControllerId {
        self.controller_id
            .clone()
            .unwrap_or(ControllerId::Numeric(presenter.0 as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn source_parsing_drops_non_string_headers() {
        let source = MediaSource::from_json(&json!({
            "url": "https://cdn.example.com/master.m3u8",
            "headers": {"Referer": "https://app.example.com", "X-Retry": 3},
            "isLive": true
        }))
        .unwrap()
        .unwrap();

        assert_eq!(source.headers.len(), 1);
        assert_eq!(source.headers["Referer"], "https://app.example.com");
        assert!(source.is_live);
        assert!(MediaSource::from_json(&Value::Null).unwrap().is_none());
    }

    #[test]
    fn source_without_url_is_invalid() {
        let err = MediaSource::from_json(&json!({"headers": {}})).unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");
    }

    #[test]
    fn widevine_requires_license_url() {
        let mut drm = DrmSource {
            kind: "Widevine".to_string(),
            license_url: None,
            content_id: Some("movie-1".to_string()),
            clear_key: None,
            headers: HashMap::from([("X-Token".to_string(), "t".to_string())]),
        };
        assert!(drm.resolve().is_none());

        drm.license_url = Some("https://license.example.com".to_string());
        let config = drm.resolve().unwrap();
        assert_eq!(config.scheme, DrmScheme::Widevine);
        assert_eq!(config.request_headers["Content-ID"], "movie-1");
        assert_eq!(config.request_headers["X-Token"], "t");
    }

    #[test]
    fn clear_key_inline_json_becomes_data_uri() {
        let drm: DrmSource = serde_json::from_value(json!({
            "type": "clearkey",
            "clearKey": "{\"keys\":[]}",
            "licenseUrl": "https://ignored.example.com"
        }))
        .unwrap();

        let config = drm.resolve().unwrap();
        assert_eq!(config.scheme, DrmScheme::ClearKey);
        assert_eq!(
            config.license_uri.as_deref(),
            Some("data:application/json;base64,eyJrZXlzIjpbXX0=")
        );
    }

    #[test]
    fn clear_key_falls_back_to_license_url() {
        let drm: DrmSource = serde_json::from_value(json!({
            "type": "clearkey",
            "licenseUrl": "https://keys.example.com"
        }))
        .unwrap();
        assert_eq!(
            drm.resolve().unwrap().license_uri.as_deref(),
            Some("https://keys.example.com")
        );
    }

    #[test]
    fn unknown_drm_scheme_is_dropped() {
        let source: MediaSource = serde_json::from_value(json!({
            "url": "https://cdn.example.com/a.mpd",
            "drm": {"type": "playready", "licenseUrl": "https://x"}
        }))
        .unwrap();
        assert!(source.to_media_item().drm.is_none());
    }

    #[test]
    fn init_args_defaults() {
        let args = InitArgs::from_json(&json!({})).unwrap();
        assert!(args.auto_play);
        assert!(args.start_auto_play);
        assert!(!args.looping);
        assert_eq!(args.start_position_ms, 0);
        assert_eq!(args.playback_options, PlaybackOptions::default());
        assert_eq!(InitArgs::from_json(&Value::Null).unwrap(), InitArgs::default());
    }

    #[test]
    fn init_args_start_auto_play_follows_auto_play() {
        let args = InitArgs::from_json(&json!({"autoPlay": false})).unwrap();
        assert!(!args.start_auto_play);

        let args = InitArgs::from_json(&json!({"autoPlay": false, "startAutoPlay": true})).unwrap();
        assert!(args.start_auto_play);
    }

    #[test]
    fn init_args_skip_invalid_playlist_entries() {
        let args = InitArgs::from_json(&json!({
            "playlist": [
                {"url": "https://cdn.example.com/1.m3u8"},
                {"headers": {}},
                42,
                {"url": "https://cdn.example.com/2.m3u8"}
            ],
            "loop": true,
            "startPositionMs": 15000,
            "controllerId": "hero",
            "playbackOptions": {"maxRetryCount": -1}
        }))
        .unwrap();

        assert_eq!(args.playlist.len(), 2);
        assert!(args.looping);
        assert_eq!(args.start_position_ms, 15_000);
        assert_eq!(args.controller_id, Some(ControllerId::from("hero")));
        assert!(args.playback_options.is_unlimited());
    }

    #[test]
    fn init_args_wrong_types_are_rejected() {
        let err = InitArgs::from_json(&json!({"autoPlay": "yes"})).unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");

        let err = InitArgs::from_json(&json!({"playbackOptions": {"autoRetry": 1}})).unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[test]
    fn controller_id_defaults_to_presenter() {
        let args = InitArgs::default();
        assert_eq!(args.controller_id_or(PresenterId(7)), ControllerId::Numeric(7));
    }
}
