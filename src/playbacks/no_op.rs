//! "No signal" fallback backend.
//!
//! Selected when nothing else can play the resource. Ready from the start,
//! never leaves IDLE and ignores every command.

use log::{debug, info};

use crate::core::events::PlaybackEmitter;
use crate::core::playback::{Playback, PlaybackOptions, PlaybackType, Settings};
use crate::core::state::{Lifecycle, PlaybackState, Transition};

pub const NAME: &str = "no_op";

/// Accepts anything
pub fn can_play(_resource: &serde_json::Value) -> bool {
    true
}

#[derive(Debug)]
pub struct NoOpPlayback {
    options: PlaybackOptions,
    lifecycle: Lifecycle,
    events: PlaybackEmitter,
    settings: Settings,
}

impl NoOpPlayback {
    pub fn new(options: PlaybackOptions) -> Self {
        let mut lifecycle = Lifecycle::new();
        lifecycle.apply(Transition::BootstrapSucceeded);
        lifecycle.mark_ready();
        info!("NoOpPlayback[{}]: nothing can play {:?}", options.unique_id, options.src);
        Self {
            options,
            lifecycle,
            events: PlaybackEmitter::new(NAME),
            settings: Settings::default(),
        }
    }

    fn ignore(&self, command: &str) {
        debug!("NoOpPlayback[{}]: {} ignored", self.options.unique_id, command);
    }
}

impl Playback for NoOpPlayback {
    fn name(&self) -> &'static str {
        NAME
    }

    fn unique_id(&self) -> &str {
        &self.options.unique_id
    }

    fn state(&self) -> PlaybackState {
        self.lifecycle.state()
    }

    fn is_ready(&self) -> bool {
        self.lifecycle.is_ready()
    }

    fn events(&self) -> &PlaybackEmitter {
        &self.events
    }

    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn play(&mut self) {
        self.ignore("play");
    }

    fn pause(&mut self) {
        self.ignore("pause");
    }

    fn stop(&mut self) {
        self.ignore("stop");
    }

    fn seek(&mut self, _percent: f64) {
        self.ignore("seek");
    }

    fn seek_seconds(&mut self, _seconds: f64) {
        self.ignore("seek_seconds");
    }

    fn volume(&mut self, _value: u8) {
        self.ignore("volume");
    }

    fn duration(&self) -> f64 {
        0.0
    }

    fn playback_type(&self) -> PlaybackType {
        PlaybackType::NoOp
    }

    fn destroy(&mut self) {
        self.events.off_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_can_play_anything() {
        assert!(can_play(&json!(null)));
        assert!(can_play(&json!(42)));
        assert!(can_play(&json!("clip.mkv")));
    }

    #[test]
    fn test_ignores_commands() {
        let mut pb = NoOpPlayback::new(PlaybackOptions::new("clip.mkv"));
        assert!(pb.is_ready());
        pb.play();
        pb.seek(50.0);
        pb.volume(10);
        assert_eq!(pb.state(), PlaybackState::Idle);
        assert!(!pb.is_playing());
        assert!(pb.events().poll().is_empty());
        assert_eq!(pb.playback_type(), PlaybackType::NoOp);
        assert!(pb.settings().default.is_empty());
    }
}
