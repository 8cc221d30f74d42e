//! # Command Surface
//!
//! Typed form of the method calls a presenter sends for its session.
//!
//! UI transports deliver `(method, arguments)` pairs; [`PlayerCommand::from_method_call`]
//! turns them into a [`PlayerCommand`], filling in the documented defaults for
//! missing arguments. A command fails only itself: parse errors and command
//! errors leave the session untouched.
//!
//! | Method | Arguments | Reply |
//! |--------|-----------|-------|
//! | `play`, `pause` | - | ack |
//! | `seekTo` | `millis` (default 0) | ack |
//! | `setSpeed` | `speed` (default 1.0) | ack |
//! | `setLooping` | `loop` (default false) | ack |
//! | `setBoxFit` | `fit` (default `contain`) | ack |
//! | `retry` | - | ack, `NO_URL`, `RETRY_FAILED` |
//! | `getVideoTracks`, `getAudioTracks`, `getSubtitleTracks` | - | track list |
//! | `setVideoTrack`, `setAudioTrack`, `setSubtitleTrack` | `id` (null clears) | ack |
//! | `enterPip` | - | bool |
//! | `setDataSaver` | `enable` (default false) | ack |
//! | `loadMediaSource` | `source`, `autoPlay` (default false) | ack |
//! | `dispose` | - | ack |

use bridge_traits::{BoxFit, HostWindow, PresenterId};
use core_runtime::events::TrackInfo;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{PlaybackError, Result};
use crate::session::Session;
use crate::source::MediaSource;

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Play,
    Pause,
    SeekTo(Duration),
    SetSpeed(f32),
    SetLooping(bool),
    SetBoxFit(BoxFit),
    Retry,
    GetVideoTracks,
    SetVideoTrack(Option<String>),
    GetAudioTracks,
    SetAudioTrack(Option<String>),
    GetSubtitleTracks,
    SetSubtitleTrack(Option<String>),
    EnterPip,
    SetDataSaver(bool),
    /// `source: None` is accepted and does nothing.
    LoadMediaSource {
        source: Option<MediaSource>,
        auto_play: bool,
    },
    /// Release the issuing presenter's hold on the session.
    Dispose,
}

// Argument shapes. Every field is optional; `null` counts as missing.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SeekArgs {
    millis: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SpeedArgs {
    speed: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoopArgs {
    #[serde(rename = "loop")]
    looping: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FitArgs {
    fit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TrackArgs {
    id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DataSaverArgs {
    enable: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LoadArgs {
    source: Value,
    auto_play: Option<bool>,
}

fn parse_args<T: DeserializeOwned + Default>(args: &Value) -> Result<T> {
    if args.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(args.clone())?)
}

impl PlayerCommand {
    /// Parse a method call. Unknown methods fail with `NOT_IMPLEMENTED`,
    /// arguments of the wrong type with `INVALID_ARGUMENT`.
    pub fn from_method_call(method: &str, args: &Value) -> Result<Self> {
        let command = match method {
            "play" => PlayerCommand::Play,
            "pause" => PlayerCommand::Pause,
            "seekTo" => {
                let args: SeekArgs = parse_args(args)?;
                let millis = args.millis.unwrap_or(0).max(0) as u64;
                PlayerCommand::SeekTo(Duration::from_millis(millis))
            }
            "setSpeed" => {
                let args: SpeedArgs = parse_args(args)?;
                PlayerCommand::SetSpeed(args.speed.unwrap_or(1.0) as f32)
            }
            "setLooping" => {
                let args: LoopArgs = parse_args(args)?;
                PlayerCommand::SetLooping(args.looping.unwrap_or(false))
            }
            "setBoxFit" => {
                let args: FitArgs = parse_args(args)?;
                PlayerCommand::SetBoxFit(
                    args.fit.as_deref().map(BoxFit::from_wire).unwrap_or_default(),
                )
            }
            "retry" => PlayerCommand::Retry,
            "getVideoTracks" => PlayerCommand::GetVideoTracks,
            "setVideoTrack" => PlayerCommand::SetVideoTrack(parse_args::<TrackArgs>(args)?.id),
            "getAudioTracks" => PlayerCommand::GetAudioTracks,
            "setAudioTrack" => PlayerCommand::SetAudioTrack(parse_args::<TrackArgs>(args)?.id),
            "getSubtitleTracks" => PlayerCommand::GetSubtitleTracks,
            "setSubtitleTrack" => {
                PlayerCommand::SetSubtitleTrack(parse_args::<TrackArgs>(args)?.id)
            }
            "enterPip" => PlayerCommand::EnterPip,
            "setDataSaver" => {
                let args: DataSaverArgs = parse_args(args)?;
                PlayerCommand::SetDataSaver(args.enable.unwrap_or(false))
            }
            "loadMediaSource" => {
                let args: LoadArgs = parse_args(args)?;
                PlayerCommand::LoadMediaSource {
                    source: MediaSource::from_json(&args.source)?,
                    auto_play: args.auto_play.unwrap_or(false),
                }
            }
            "dispose" => PlayerCommand::Dispose,
            other => return Err(PlaybackError::NotImplemented(other.to_string())),
        };
        Ok(command)
    }

    /// Wire name of the command.
    pub fn method(&self) -> &'static str {
        match self {
            PlayerCommand::Play => "play",
            PlayerCommand::Pause => "pause",
            PlayerCommand::SeekTo(_) => "seekTo",
            PlayerCommand::SetSpeed(_) => "setSpeed",
            PlayerCommand::SetLooping(_) => "setLooping",
            PlayerCommand::SetBoxFit(_) => "setBoxFit",
            PlayerCommand::Retry => "retry",
            PlayerCommand::GetVideoTracks => "getVideoTracks",
            PlayerCommand::SetVideoTrack(_) => "setVideoTrack",
            PlayerCommand::GetAudioTracks => "getAudioTracks",
            PlayerCommand::SetAudioTrack(_) => "setAudioTrack",
            PlayerCommand::GetSubtitleTracks => "getSubtitleTracks",
            PlayerCommand::SetSubtitleTrack(_) => "setSubtitleTrack",
            PlayerCommand::EnterPip => "enterPip",
            PlayerCommand::SetDataSaver(_) => "setDataSaver",
            PlayerCommand::LoadMediaSource { .. } => "loadMediaSource",
            PlayerCommand::Dispose => "dispose",
        }
    }

    /// Run the command against `session`. `Dispose` is handled by the
    /// registry before dispatch and is acknowledged here without effect.
    pub(crate) fn apply(self, session: &mut Session, ctx: &CommandContext) -> Result<CommandReply> {
        let reply = match self {
            PlayerCommand::Play => {
                session.play();
                CommandReply::Ack
            }
            PlayerCommand::Pause => {
                session.pause();
                CommandReply::Ack
            }
            PlayerCommand::SeekTo(position) => {
                session.seek_to(position);
                CommandReply::Ack
            }
            PlayerCommand::SetSpeed(speed) => {
                session.set_speed(speed);
                CommandReply::Ack
            }
            PlayerCommand::SetLooping(looping) => {
                session.set_looping(looping);
                CommandReply::Ack
            }
            PlayerCommand::SetBoxFit(fit) => {
                session.set_box_fit(ctx.presenter, fit);
                CommandReply::Ack
            }
            PlayerCommand::Retry => {
                session.retry()?;
                CommandReply::Ack
            }
            PlayerCommand::GetVideoTracks => CommandReply::Tracks(session.video_tracks()),
            PlayerCommand::SetVideoTrack(id) => {
                session.select_video_track(id.as_deref());
                CommandReply::Ack
            }
            PlayerCommand::GetAudioTracks => CommandReply::Tracks(session.audio_tracks()),
            PlayerCommand::SetAudioTrack(id) => {
                session.select_audio_track(id.as_deref());
                CommandReply::Ack
            }
            PlayerCommand::GetSubtitleTracks => CommandReply::Tracks(session.subtitle_tracks()),
            PlayerCommand::SetSubtitleTrack(id) => {
                session.select_subtitle_track(id.as_deref());
                CommandReply::Ack
            }
            PlayerCommand::EnterPip => {
                CommandReply::Bool(session.enter_picture_in_picture(ctx.host_window.as_ref()))
            }
            PlayerCommand::SetDataSaver(enable) => {
                session.set_data_saver(enable);
                CommandReply::Ack
            }
            PlayerCommand::LoadMediaSource { source, auto_play } => {
                if let Some(source) = source {
                    session.load_media_source(source, auto_play)?;
                }
                CommandReply::Ack
            }
            PlayerCommand::Dispose => CommandReply::Ack,
        };
        Ok(reply)
    }
}

/// Result of a successful command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandReply {
    Ack,
    Tracks(Vec<TrackInfo>),
    Bool(bool),
}

impl CommandReply {
    /// Wire form: `null`, an array of track maps, or a boolean.
    pub fn to_json(&self) -> Value {
        match self {
            CommandReply::Ack => Value::Null,
            CommandReply::Tracks(tracks) => serde_json::to_value(tracks).unwrap_or_default(),
            CommandReply::Bool(value) => Value::Bool(*value),
        }
    }
}

/// Who issued a command, and the host surface it came from.
#[derive(Clone)]
pub struct CommandContext {
    pub presenter: PresenterId,
    pub host_window: Option<Arc<dyn HostWindow>>,
}

impl CommandContext {
    pub fn new(presenter: PresenterId) -> Self {
        Self {
            presenter,
            host_window: None,
        }
    }

    pub fn with_host_window(mut self, host_window: Arc<dyn HostWindow>) -> Self {
        self.host_window = Some(host_window);
        self
    }
}

impl fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("presenter", &self.presenter)
            .field("host_window", &self.host_window.as_ref().map(|_| "HostWindow { ... }"))
            .finish()
    }
}
