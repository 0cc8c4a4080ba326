//! Playback error types.

use std::fmt;

/// Transient failure while querying a plugin object.
///
/// Never surfaced to the orchestrator: the backend reads it as "not ready yet".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginError {
    /// Property exists but the plugin has not initialised it
    NotInitialized(&'static str),
    /// Plugin object not reachable (not embedded, crashed, blocked)
    Unavailable,
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginError::NotInitialized(prop) => write!(f, "Plugin property not initialized: {}", prop),
            PluginError::Unavailable => write!(f, "Plugin object unavailable"),
        }
    }
}

impl std::error::Error for PluginError {}

/// Fatal playback error, reported through PLAYBACK_ERROR.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// Bootstrap polling ran out of attempts
    MaxAttemptsReached { attempts: u32 },
    /// Native media element error (MediaError code)
    Media { code: u16, message: String },
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackError::MaxAttemptsReached { .. } => write!(f, "Max number of attempts reached"),
            PlaybackError::Media { code, message } => write!(f, "Media error {}: {}", code, message),
        }
    }
}

impl std::error::Error for PlaybackError {}
