//! Playback trait - uniform command/lifecycle surface over every media backend.
//!
//! Backends:
//! - FlashPlayback: plugin object, polling bootstrap with bounded retries
//! - Html5Playback: native `<video>` element, synchronous native events
//! - NoOpPlayback: diagnostic "no signal" fallback
//!
//! Backends are stored as [`PlaybackKind`](crate::playbacks::PlaybackKind) and
//! selected at construction time by capability query, never by type hierarchy.
//!
//! ## Deferred commands
//!
//! Every mutating command checks readiness first. Before READY the command is
//! parked in the backend's [`PendingQueue`](super::pending::PendingQueue) and
//! re-run once, in issue order, when READY fires.

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::clock::{Clock, SystemClock};
use super::events::PlaybackEmitter;
use super::mediator::Mediator;
use super::state::PlaybackState;
use crate::platform::Platform;

/// Default bootstrap check interval
pub const BOOTSTRAP_INTERVAL_MS: u64 = 50;

/// Default bootstrap attempt ceiling
pub const MAX_ATTEMPTS: u32 = 60;

/// Kind of stream behind the playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackType {
    Vod,
    Live,
    /// Nothing playable (no-signal backend)
    #[serde(rename = "no_op")]
    NoOp,
}

impl PlaybackType {
    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackType::Vod => "vod",
            PlaybackType::Live => "live",
            PlaybackType::NoOp => "no_op",
        }
    }
}

/// Construction options handed over by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlaybackOptions {
    /// Media resource URL
    pub src: String,
    /// Base URL the plugin binary is served from
    pub base_url: String,
    pub auto_play: bool,
    /// Scopes the instance's private mediator topics
    pub unique_id: String,
    /// Page location, read for URL-embedded start offsets (`?t=1m30s`)
    pub page_url: Option<String>,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            src: String::new(),
            base_url: String::new(),
            auto_play: false,
            unique_id: uuid::Uuid::new_v4().to_string(),
            page_url: None,
        }
    }
}

impl PlaybackOptions {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            ..Self::default()
        }
    }

    pub fn with_auto_play(mut self, auto_play: bool) -> Self {
        self.auto_play = auto_play;
        self
    }

    pub fn with_unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = unique_id.into();
        self
    }

    pub fn with_page_url(mut self, page_url: impl Into<String>) -> Self {
        self.page_url = Some(page_url.into());
        self
    }
}

/// Bootstrap tuning for polling backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub bootstrap_interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            bootstrap_interval_ms: BOOTSTRAP_INTERVAL_MS,
            max_attempts: MAX_ATTEMPTS,
        }
    }
}

/// Shared services every backend is built with.
#[derive(Clone)]
pub struct PlaybackContext {
    pub mediator: Mediator,
    pub clock: Arc<dyn Clock>,
    pub platform: Platform,
    pub config: PlaybackConfig,
}

impl std::fmt::Debug for PlaybackContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackContext")
            .field("mediator", &self.mediator)
            .field("platform", &self.platform)
            .field("config", &self.config)
            .finish()
    }
}

impl PlaybackContext {
    /// Real clock, default config
    pub fn new(mediator: Mediator, platform: Platform) -> Self {
        Self {
            mediator,
            clock: Arc::new(SystemClock::new()),
            platform,
            config: PlaybackConfig::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: PlaybackConfig) -> Self {
        self.config = config;
        self
    }
}

/// Media control layout a backend asks for (PLAYBACK_SETTINGSUPDATE).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub default: Vec<String>,
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub seek_enabled: bool,
}

impl Settings {
    /// Seekbar, play/pause, position/duration, fullscreen and volume
    pub fn vod() -> Self {
        fn owned(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }
        Self {
            default: owned(&["seekbar"]),
            left: owned(&["playpause", "position", "duration"]),
            right: owned(&["fullscreen", "volume"]),
            seek_enabled: true,
        }
    }
}

/// Uniform playback contract.
///
/// The state is read-only from outside: only the backend moves it, through its
/// [`Lifecycle`](super::state::Lifecycle).
#[enum_dispatch]
pub trait Playback {
    /// Backend name stamped on emitted events ("flash", "html5_video", "no_op")
    fn name(&self) -> &'static str;

    /// Instance id scoping private mediator topics
    fn unique_id(&self) -> &str;

    fn state(&self) -> PlaybackState;

    /// Readiness latch
    fn is_ready(&self) -> bool;

    /// Public event surface
    fn events(&self) -> &PlaybackEmitter;

    /// Media control layout
    fn settings(&self) -> &Settings;

    fn play(&mut self);

    fn pause(&mut self);

    fn stop(&mut self);

    /// Seek to a percentage (0-100) of the duration
    fn seek(&mut self, percent: f64);

    /// Seek to an absolute position
    fn seek_seconds(&mut self, seconds: f64);

    /// Volume 0-100
    fn volume(&mut self, value: u8);

    /// Media duration in seconds, 0 while unknown
    fn duration(&self) -> f64;

    fn playback_type(&self) -> PlaybackType;

    fn is_playing(&self) -> bool {
        self.is_ready() && self.state().is_playing()
    }

    fn is_high_definition_in_use(&self) -> bool {
        false
    }

    /// Pump timers and internal signals. Called from the host update loop.
    fn tick(&mut self) {}

    /// Cancel timers, drop mediator registrations and listeners.
    /// Idempotent; the instance ignores every command afterwards.
    fn destroy(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_camel_case_json() {
        let options: PlaybackOptions = serde_json::from_str(
            r#"{"src": "clip.mp4", "autoPlay": true, "uniqueId": "p1", "baseUrl": "http://cdn"}"#,
        )
        .unwrap();
        assert_eq!(options.src, "clip.mp4");
        assert!(options.auto_play);
        assert_eq!(options.unique_id, "p1");
        assert_eq!(options.page_url, None);
    }

    #[test]
    fn test_options_default_unique_ids_differ() {
        let a = PlaybackOptions::new("a.mp4");
        let b = PlaybackOptions::new("a.mp4");
        assert_ne!(a.unique_id, b.unique_id);
    }

    #[test]
    fn test_vod_settings() {
        let settings = Settings::vod();
        assert_eq!(settings.default, vec!["seekbar"]);
        assert!(settings.seek_enabled);
        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["seekEnabled"], true);
    }

    #[test]
    fn test_playback_type_str() {
        assert_eq!(PlaybackType::Vod.as_str(), "vod");
        assert_eq!(serde_json::to_string(&PlaybackType::Vod).unwrap(), "\"vod\"");
    }
}
