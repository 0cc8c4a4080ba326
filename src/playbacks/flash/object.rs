//! Boundary to the embedded plugin object.
//!
//! The plugin lives outside the process (browser plugin, external shell); the
//! backend only talks to it through [`PluginObject`]. Getters can fail while the
//! plugin is still starting up, which the backend reads as "not ready yet".

use crate::core::error::PluginError;

/// Playback state as reported by the plugin's `getState()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    Idle,
    Playing,
    PlayingBuffering,
    Paused,
    Ended,
}

impl PluginState {
    /// Parse the plugin's state string. Unknown strings -> None.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "IDLE" => Some(Self::Idle),
            "PLAYING" => Some(Self::Playing),
            "PLAYING_BUFFERING" => Some(Self::PlayingBuffering),
            "PAUSED" => Some(Self::Paused),
            "ENDED" => Some(Self::Ended),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Playing => "PLAYING",
            Self::PlayingBuffering => "PLAYING_BUFFERING",
            Self::Paused => "PAUSED",
            Self::Ended => "ENDED",
        }
    }
}

/// Scriptable surface of the plugin object.
///
/// Commands are fire-and-forget. The plugin answers asynchronously through
/// `<uid>:statechanged`, `<uid>:timeupdate`, `<uid>:progress` and
/// `<uid>:flashready` on the process mediator.
pub trait PluginObject: Send {
    /// Scripting interface is up (`playerPlay` is callable)
    fn is_interactive(&self) -> bool;

    fn resize(&mut self, width: &str, height: &str);

    /// Load `src` and start playing
    fn play(&mut self, src: &str);

    fn resume(&mut self);

    fn pause(&mut self);

    fn stop(&mut self);

    fn seek(&mut self, seconds: f64);

    /// 0-100
    fn set_volume(&mut self, value: u8);

    fn state(&self) -> Result<PluginState, PluginError>;

    fn position(&self) -> Result<f64, PluginError>;

    fn duration(&self) -> Result<f64, PluginError>;

    fn bytes_loaded(&self) -> Result<u64, PluginError>;

    fn bytes_total(&self) -> Result<u64, PluginError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plugin_state() {
        assert_eq!(PluginState::parse("PLAYING_BUFFERING"), Some(PluginState::PlayingBuffering));
        assert_eq!(PluginState::parse("ENDED").map(PluginState::as_str), Some("ENDED"));
        assert_eq!(PluginState::parse("playing"), None);
    }
}
