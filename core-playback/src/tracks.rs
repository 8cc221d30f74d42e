//! # Track Identity Normalization
//!
//! Turns engine track groups into the UI's flat track lists and maps UI
//! track identities back onto [`TrackSelectionParameters`].
//!
//! ## Identities
//!
//! - Video: `"<height>:<width>:<bitrate>"`, unknown values written as `0`.
//!   Video identities are content based because adaptive renditions are
//!   frequently regrouped by the engine.
//! - Audio and subtitles: `"<groupIndex>:<trackIndex>"`, where the group
//!   index counts over *all* engine track groups, not only groups of the
//!   same kind.
//!
//! Identities that fail to parse, or that no longer match a track, are
//! ignored: selecting them leaves the current selection untouched.

use bridge_traits::{
    Cue, TrackFormat, TrackGroup, TrackKind, TrackOverride, TrackSelectionParameters,
    VideoSelectionMode, VideoSize,
};
use core_runtime::events::{TrackInfo, TrackListEvent};
use std::fmt;
use std::str::FromStr;

/// Content-based identity of a video rendition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VideoTrackId {
    pub height: u32,
    pub width: u32,
    pub bitrate: u32,
}

impl VideoTrackId {
    pub fn from_format(format: &TrackFormat) -> Self {
        Self {
            height: format.height.unwrap_or(0),
            width: format.width.unwrap_or(0),
            bitrate: format.bitrate.unwrap_or(0),
        }
    }
}

impl fmt::Display for VideoTrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.height, self.width, self.bitrate)
    }
}

impl FromStr for VideoTrackId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let (Some(h), Some(w), Some(b), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(());
        };
        Ok(Self {
            height: h.trim().parse().map_err(|_| ())?,
            width: w.trim().parse().map_err(|_| ())?,
            bitrate: b.trim().parse().map_err(|_| ())?,
        })
    }
}

/// Positional identity of an audio or subtitle track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupTrackId {
    pub group: usize,
    pub track: usize,
}

impl fmt::Display for GroupTrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.track)
    }
}

impl FromStr for GroupTrackId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (group, track) = s.split_once(':').ok_or(())?;
        Ok(Self {
            group: group.trim().parse().map_err(|_| ())?,
            track: track.trim().parse().map_err(|_| ())?,
        })
    }
}

// ============================================================================
// Collection
// ============================================================================

/// Video renditions, supported groups and tracks only.
///
/// When `manual` names a selected identity, `selected` marks that rendition;
/// otherwise the engine's own selection flag is reported.
pub fn video_tracks(groups: &[TrackGroup], manual: Option<&VideoTrackId>) -> Vec<TrackInfo> {
    let mut tracks = Vec::new();
    for group in groups
        .iter()
        .filter(|g| g.kind == TrackKind::Video && g.supported)
    {
        for format in group.tracks.iter().filter(|t| t.supported) {
            let id = VideoTrackId::from_format(format);
            let selected = match manual {
                Some(manual) => *manual == id,
                None => format.selected,
            };
            tracks.push(TrackInfo {
                id: id.to_string(),
                label: video_label(format),
                language: None,
                selected,
                bitrate: format.bitrate,
                width: format.width,
                height: format.height,
                forced: None,
            });
        }
    }
    tracks
}

pub fn audio_tracks(groups: &[TrackGroup]) -> Vec<TrackInfo> {
    collect_positional(groups, TrackKind::Audio, |format, index| {
        format
            .label
            .clone()
            .or_else(|| format.codecs.clone())
            .unwrap_or_else(|| format!("Audio {}", index + 1))
    })
}

pub fn subtitle_tracks(groups: &[TrackGroup]) -> Vec<TrackInfo> {
    collect_positional(groups, TrackKind::Subtitle, |format, index| {
        format
            .label
            .clone()
            .unwrap_or_else(|| format!("Sub {}", index + 1))
    })
}

fn collect_positional<F>(groups: &[TrackGroup], kind: TrackKind, label: F) -> Vec<TrackInfo>
where
    F: Fn(&TrackFormat, usize) -> String,
{
    let mut tracks = Vec::new();
    for (group_index, group) in groups.iter().enumerate() {
        if group.kind != kind {
            continue;
        }
        for (track_index, format) in group.tracks.iter().enumerate() {
            let id = GroupTrackId {
                group: group_index,
                track: track_index,
            };
            tracks.push(TrackInfo {
                id: id.to_string(),
                label: label(format, track_index),
                language: format.language.clone(),
                selected: format.selected,
                forced: (kind == TrackKind::Subtitle).then_some(format.forced),
                ..Default::default()
            });
        }
    }
    tracks
}

pub fn track_list(groups: &[TrackGroup], manual_video: Option<&VideoTrackId>) -> TrackListEvent {
    TrackListEvent {
        video: video_tracks(groups, manual_video),
        audio: audio_tracks(groups),
        subtitle: subtitle_tracks(groups),
    }
}

/// `"720p • 2.5 Mbps • <label>"`, parts omitted when unknown, `"HD"` if
/// nothing is known.
pub fn video_label(format: &TrackFormat) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(height) = format.height.filter(|h| *h > 0) {
        parts.push(format!("{}p", height));
    }

    if let Some(bitrate) = format.bitrate.filter(|b| *b > 0) {
        let mbps = f64::from(bitrate) / 1_000_000.0;
        if mbps >= 10.0 {
            parts.push(format!("{:.0} Mbps", mbps));
        } else {
            parts.push(format!("{:.1} Mbps", mbps));
        }
    }

    if let Some(label) = format.label.as_deref().map(str::trim) {
        if !label.is_empty() && !parts.iter().any(|p| p == label) {
            parts.push(label.to_string());
        }
    }

    if parts.is_empty() {
        return "HD".to_string();
    }
    parts.join(" • ")
}

/// Trimmed, non-empty cue texts joined by newlines.
pub fn cue_text(cues: &[Cue]) -> String {
    cues.iter()
        .filter_map(|cue| cue.text.as_deref())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Selection
// ============================================================================

/// Result of a video selection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoSelection {
    Selected(VideoTrackId),
    Cleared,
    /// The identity did not parse or matched no supported rendition.
    Ignored,
}

/// Apply a video selection to `params`.
///
/// `bitrate_cap` is the cap to fall back to when the selection is cleared
/// (the data saver cap, or `None`).
pub fn select_video(
    params: &mut TrackSelectionParameters,
    groups: &[TrackGroup],
    id: Option<&str>,
    mode: VideoSelectionMode,
    bitrate_cap: Option<u32>,
) -> VideoSelection {
    let Some(id) = id.filter(|id| !id.is_empty()) else {
        params
            .clear_overrides_of_kind(TrackKind::Video)
            .set_max_video_size(None)
            .set_max_video_bitrate(bitrate_cap);
        return VideoSelection::Cleared;
    };

    let Ok(target) = id.parse::<VideoTrackId>() else {
        return VideoSelection::Ignored;
    };

    let Some((group_index, track_index)) = find_video(groups, &target) else {
        return VideoSelection::Ignored;
    };

    let bitrate = (target.bitrate > 0).then_some(target.bitrate).or(bitrate_cap);

    match mode {
        VideoSelectionMode::RenditionOverride => {
            let size = (target.width > 0 && target.height > 0)
                .then(|| VideoSize::new(target.width, target.height));
            params
                .clear_overrides_of_kind(TrackKind::Video)
                .set_max_video_size(size)
                .set_max_video_bitrate(bitrate)
                .set_override(TrackOverride::single(
                    TrackKind::Video,
                    group_index,
                    track_index,
                ));
        }
        VideoSelectionMode::PeakBitrate => {
            params.set_max_video_bitrate(bitrate);
        }
    }

    VideoSelection::Selected(target)
}

fn find_video(groups: &[TrackGroup], target: &VideoTrackId) -> Option<(usize, usize)> {
    groups
        .iter()
        .enumerate()
        .filter(|(_, g)| g.kind == TrackKind::Video && g.supported)
        .find_map(|(group_index, group)| {
            group
                .tracks
                .iter()
                .position(|t| t.supported && VideoTrackId::from_format(t) == *target)
                .map(|track_index| (group_index, track_index))
        })
}

/// Apply an audio or subtitle selection to `params`. Returns `false` when
/// the request was ignored.
///
/// Selecting a subtitle re-enables the subtitle kind; clearing subtitles
/// disables it so the engine renders none.
pub fn select_positional(
    params: &mut TrackSelectionParameters,
    groups: &[TrackGroup],
    kind: TrackKind,
    id: Option<&str>,
) -> bool {
    let Some(id) = id.filter(|id| !id.is_empty()) else {
        params.clear_overrides_of_kind(kind);
        if kind == TrackKind::Subtitle {
            params.set_kind_disabled(kind, true);
        }
        return true;
    };

    let Ok(target) = id.parse::<GroupTrackId>() else {
        return false;
    };

    let Some(group) = groups.get(target.group) else {
        return false;
    };
    if group.kind != kind || target.track >= group.tracks.len() {
        return false;
    }

    if kind == TrackKind::Subtitle {
        params.set_kind_disabled(kind, false);
    }
    params
        .clear_overrides_of_kind(kind)
        .set_override(TrackOverride::single(kind, target.group, target.track));
    true
}
