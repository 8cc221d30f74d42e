//! Host window and system media session abstractions.
//!
//! These are passed explicitly to the core; there is no process-wide
//! "current window" lookup.

use crate::error::Result;
use crate::ids::ControllerId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Aspect ratio used when requesting picture-in-picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectRatio {
    pub numerator: u32,
    pub denominator: u32,
}

impl AspectRatio {
    pub fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::new(16, 9)
    }
}

/// Window-level requests that need the foreground host surface.
pub trait HostWindow: Send + Sync {
    fn supports_picture_in_picture(&self) -> bool;

    /// Ask the host to enter picture-in-picture. `Ok(false)` means the host
    /// declined (not possible right now).
    fn enter_picture_in_picture(&self, aspect_ratio: AspectRatio) -> Result<bool>;
}

/// Playback status mirrored into the system media session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaSessionStatus {
    Buffering,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MediaSessionState {
    pub status: MediaSessionStatus,
    pub position: Duration,
    /// Current speed while playing, `0.0` otherwise.
    pub speed: f32,
}

/// System media session (lock screen, headset buttons, notification).
pub trait MediaSessionPublisher: Send + Sync {
    fn activate(&self, controller_id: &ControllerId);

    fn update(&self, controller_id: &ControllerId, state: MediaSessionState);

    fn deactivate(&self, controller_id: &ControllerId);
}
