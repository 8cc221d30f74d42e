//! # Playback Error Types
//!
//! Error types for session and command handling.
//!
//! Every error maps to a stable wire code through [`PlaybackError::code`],
//! which is what UI transports report back to callers.

use bridge_traits::{BridgeError, ControllerId};
use thiserror::Error;

/// Errors that can occur while driving playback sessions.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Command Errors
    // ========================================================================
    /// No session is registered for the controller id.
    #[error("Unknown controller: {0}")]
    UnknownController(ControllerId),

    /// The command name is not recognized.
    #[error("Method not implemented: {0}")]
    NotImplemented(String),

    /// A command argument has the wrong type or shape.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// `retry` was requested before any media source was loaded.
    #[error("No previous URL to retry")]
    NoSource,

    /// The engine refused to prepare the current media again.
    #[error("Retry failed: {0}")]
    RetryFailed(String),

    // ========================================================================
    // Engine / Host Errors
    // ========================================================================
    /// The engine factory could not create a native player.
    #[error("Failed to create engine: {0}")]
    EngineCreation(#[source] BridgeError),

    /// A bridge call failed.
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    // ========================================================================
    // Runtime Errors
    // ========================================================================
    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    /// The control loop has shut down.
    #[error("Session controller is shut down")]
    ControllerClosed,

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Stable wire code reported to the UI.
    pub fn code(&self) -> &'static str {
        match self {
            PlaybackError::UnknownController(_) => "UNKNOWN_CONTROLLER",
            PlaybackError::NotImplemented(_) => "NOT_IMPLEMENTED",
            PlaybackError::InvalidArgument(_) => "INVALID_ARGUMENT",
            PlaybackError::NoSource => "NO_URL",
            PlaybackError::RetryFailed(_) => "RETRY_FAILED",
            PlaybackError::EngineCreation(_) => "ENGINE_UNAVAILABLE",
            PlaybackError::Bridge(_) => "BRIDGE_ERROR",
            PlaybackError::Config(_) => "CONFIG_ERROR",
            PlaybackError::ControllerClosed => "CONTROLLER_CLOSED",
            PlaybackError::Internal(_) => "INTERNAL",
        }
    }

    /// Returns `true` if the same request may succeed later without changes.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::RetryFailed(_)
                | PlaybackError::EngineCreation(_)
                | PlaybackError::Bridge(BridgeError::HostUnavailable(_))
        )
    }

    /// Returns `true` if the caller sent a malformed or unsupported request.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::NotImplemented(_)
                | PlaybackError::InvalidArgument(_)
                | PlaybackError::UnknownController(_)
                | PlaybackError::NoSource
        )
    }
}

impl From<serde_json::Error> for PlaybackError {
    fn from(err: serde_json::Error) -> Self {
        PlaybackError::InvalidArgument(err.to_string())
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes() {
        assert_eq!(PlaybackError::NoSource.code(), "NO_URL");
        assert_eq!(PlaybackError::RetryFailed("x".into()).code(), "RETRY_FAILED");
        assert_eq!(
            PlaybackError::InvalidArgument("millis".into()).code(),
            "INVALID_ARGUMENT"
        );
        assert_eq!(
            PlaybackError::NotImplemented("toggleFullscreen".into()).code(),
            "NOT_IMPLEMENTED"
        );
        assert_eq!(
            PlaybackError::UnknownController(ControllerId::Numeric(3)).code(),
            "UNKNOWN_CONTROLLER"
        );
    }

    #[test]
    fn classification() {
        assert!(PlaybackError::RetryFailed("codec".into()).is_transient());
        assert!(!PlaybackError::NoSource.is_transient());
        assert!(PlaybackError::NoSource.is_caller_error());
        assert!(!PlaybackError::ControllerClosed.is_caller_error());
    }

    #[test]
    fn json_errors_are_invalid_arguments() {
        let err: PlaybackError = serde_json::from_str::<u32>("\"x\"").unwrap_err().into();
        assert_eq!(err.code(), "INVALID_ARGUMENT");
    }
}
