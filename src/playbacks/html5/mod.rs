//! Native `<video>` element backend.
//!
//! No polling: the element reports `loadedmetadata` once it can accept
//! commands, and every other change arrives as a [`NativeEvent`] the host
//! forwards to [`Html5Playback::handle_event`].

pub mod scripted;

use log::{debug, info, warn};

use crate::core::error::PlaybackError;
use crate::core::events::{ErrorInfo, PlaybackEmitter, PlaybackEvent};
use crate::core::pending::{Command, PendingQueue, WakeOn};
use crate::core::playback::{Playback, PlaybackOptions, PlaybackType, Settings};
use crate::core::state::{Lifecycle, Outcome, PlaybackState, Transition};
use crate::platform::Platform;
use crate::utils::media::{HTML5_EXTS, has_extension};
use crate::utils::seek_string_to_seconds;

pub use scripted::{ElementCall, ScriptedElement};

pub const NAME: &str = "html5_video";

/// Scriptable surface of the media element
pub trait MediaElement: Send {
    fn set_src(&mut self, src: &str);

    fn play(&mut self);

    fn pause(&mut self);

    fn current_time(&self) -> f64;

    fn set_current_time(&mut self, seconds: f64);

    /// NaN until metadata is loaded, +inf for live streams
    fn duration(&self) -> f64;

    /// 0.0-1.0
    fn set_volume(&mut self, volume: f64);

    /// End of the last buffered range in seconds
    fn buffered_end(&self) -> f64;
}

/// DOM media events the backend reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum NativeEvent {
    LoadedMetadata,
    Playing,
    Pause,
    Waiting,
    TimeUpdate,
    Progress,
    Ended,
    /// `MediaError` code and message
    Error { code: u16, message: String },
}

/// Capability query: string URL with a native extension, `<video>` available.
pub fn can_play(resource: &serde_json::Value, platform: &Platform) -> bool {
    if !platform.supports_native_video {
        return false;
    }
    match resource.as_str() {
        Some(url) if !url.is_empty() => has_extension(url, HTML5_EXTS),
        _ => false,
    }
}

pub struct Html5Playback {
    options: PlaybackOptions,
    element: Box<dyn MediaElement>,
    lifecycle: Lifecycle,
    pending: PendingQueue,
    events: PlaybackEmitter,
    settings: Settings,
    destroyed: bool,
}

impl std::fmt::Debug for Html5Playback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Html5Playback")
            .field("unique_id", &self.options.unique_id)
            .field("state", &self.lifecycle.state())
            .field("ready", &self.lifecycle.is_ready())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl Html5Playback {
    pub fn new(options: PlaybackOptions, mut element: Box<dyn MediaElement>) -> Self {
        element.set_src(&options.src);
        info!("Html5Playback[{}]: created for {}", options.unique_id, options.src);
        Self {
            options,
            element,
            lifecycle: Lifecycle::new(),
            pending: PendingQueue::new(),
            events: PlaybackEmitter::new(NAME),
            settings: Settings::vod(),
            destroyed: false,
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Feed one DOM event.
    pub fn handle_event(&mut self, event: NativeEvent) {
        if self.destroyed || self.lifecycle.is_errored() {
            return;
        }

        match event {
            NativeEvent::LoadedMetadata => self.metadata_loaded(),
            NativeEvent::Playing => {
                if self.lifecycle.apply(Transition::BufferReplenished).is_accepted() {
                    self.events.trigger(PlaybackEvent::BufferFull);
                    self.wake(WakeOn::BufferFull);
                }
            }
            NativeEvent::Waiting => {
                if let Outcome::Changed { .. } = self.lifecycle.apply(Transition::BufferingDetected) {
                    self.events.trigger(PlaybackEvent::Buffering);
                }
            }
            // Paused from the native controls
            NativeEvent::Pause => {
                if let Outcome::Changed { .. } = self.lifecycle.apply(Transition::Pause) {
                    self.events.trigger(PlaybackEvent::Pause);
                }
            }
            NativeEvent::TimeUpdate => {
                self.events.trigger(PlaybackEvent::TimeUpdate {
                    position: self.element.current_time(),
                    duration: self.duration(),
                });
            }
            NativeEvent::Progress => {
                if matches!(
                    self.lifecycle.state(),
                    PlaybackState::Playing | PlaybackState::PlayingBuffering | PlaybackState::Paused
                ) {
                    self.events.trigger(PlaybackEvent::Progress {
                        start: 0.0,
                        loaded: self.element.buffered_end(),
                        total: self.duration(),
                    });
                }
            }
            NativeEvent::Ended => {
                if self.lifecycle.apply(Transition::ReportedEnded).is_accepted() {
                    self.events.trigger(PlaybackEvent::Ended);
                    self.events.trigger(PlaybackEvent::TimeUpdate {
                        position: 0.0,
                        duration: self.duration(),
                    });
                }
            }
            NativeEvent::Error { code, message } => {
                let error = PlaybackError::Media { code, message };
                warn!("Html5Playback[{}]: {}", self.options.unique_id, error);
                self.lifecycle.apply(Transition::Failed);
                self.pending.clear();
                self.events.trigger(PlaybackEvent::Error(ErrorInfo {
                    message: error.to_string(),
                }));
            }
        }
    }

    fn metadata_loaded(&mut self) {
        self.lifecycle.apply(Transition::BootstrapSucceeded);
        if !self.lifecycle.mark_ready() {
            return;
        }
        info!("Html5Playback[{}]: ready, duration {:.2}s", self.options.unique_id, self.duration());
        self.events.trigger(PlaybackEvent::Ready);
        self.events.trigger(PlaybackEvent::SettingsUpdate);
        self.wake(WakeOn::Ready);
        if self.options.auto_play {
            self.play();
        }
    }

    fn wake(&mut self, wake: WakeOn) {
        for command in self.pending.take(wake) {
            match command {
                Command::Play => self.play(),
                Command::Pause => self.pause(),
                Command::Stop => self.stop(),
                Command::Seek(percent) => self.seek(percent),
                Command::SeekSeconds(seconds) => self.seek_seconds(seconds),
                Command::Volume(value) => self.volume(value),
                Command::InitialSeek => {
                    let seconds = self.options.page_url.as_deref().map(seek_string_to_seconds).unwrap_or(0);
                    if seconds != 0 {
                        self.seek_seconds(seconds as f64);
                    }
                }
            }
        }
    }

    fn ready_for(&mut self, command: Command) -> bool {
        if self.destroyed || self.lifecycle.is_errored() {
            debug!("Html5Playback[{}]: {:?} rejected", self.options.unique_id, command);
            return false;
        }
        if !self.lifecycle.is_ready() {
            self.pending.defer(WakeOn::Ready, command);
            return false;
        }
        true
    }
}

impl Playback for Html5Playback {
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
        if !self.ready_for(Command::Play) {
            return;
        }
        let outcome = self.lifecycle.apply(Transition::Play);
        if !outcome.is_accepted() {
            return;
        }
        if outcome.is_first_play() && !self.pending.contains(WakeOn::BufferFull, Command::InitialSeek) {
            self.pending.defer(WakeOn::BufferFull, Command::InitialSeek);
        }
        self.element.play();
        self.events.trigger(PlaybackEvent::Play);
    }

    fn pause(&mut self) {
        if !self.ready_for(Command::Pause) {
            return;
        }
        if self.lifecycle.apply(Transition::Pause).is_accepted() {
            self.element.pause();
            self.events.trigger(PlaybackEvent::Pause);
        }
    }

    fn stop(&mut self) {
        if !self.ready_for(Command::Stop) {
            return;
        }
        self.element.pause();
        self.element.set_current_time(0.0);
        self.lifecycle.apply(Transition::Stop);
        self.events.trigger(PlaybackEvent::TimeUpdate {
            position: 0.0,
            duration: self.duration(),
        });
    }

    fn seek(&mut self, percent: f64) {
        if !percent.is_finite() {
            debug!("Html5Playback[{}]: seek to {}% rejected", self.options.unique_id, percent);
            return;
        }
        if !self.ready_for(Command::Seek(percent)) {
            return;
        }
        let duration = self.duration();
        if duration > 0.0 {
            self.seek_seconds(duration * (percent.clamp(0.0, 100.0) / 100.0));
        } else {
            self.pending.defer(WakeOn::BufferFull, Command::Seek(percent));
        }
    }

    fn seek_seconds(&mut self, seconds: f64) {
        if !self.ready_for(Command::SeekSeconds(seconds)) {
            return;
        }
        self.element.set_current_time(seconds);
        self.events.trigger(PlaybackEvent::TimeUpdate {
            position: seconds,
            duration: self.duration(),
        });
    }

    fn volume(&mut self, value: u8) {
        if !self.ready_for(Command::Volume(value)) {
            return;
        }
        self.element.set_volume(f64::from(value.min(100)) / 100.0);
    }

    fn duration(&self) -> f64 {
        let duration = self.element.duration();
        if duration.is_finite() && duration > 0.0 { duration } else { 0.0 }
    }

    /// Live streams report an infinite duration
    fn playback_type(&self) -> PlaybackType {
        if self.element.duration() == f64::INFINITY {
            PlaybackType::Live
        } else {
            PlaybackType::Vod
        }
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.element.pause();
        self.element.set_src("");
        self.pending.clear();
        self.events.off_all();
        info!("Html5Playback[{}]: destroyed", self.options.unique_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::EventKind;
    use serde_json::json;

    fn playback(element: &ScriptedElement) -> Html5Playback {
        Html5Playback::new(
            PlaybackOptions::new("http://cdn.tv/clip.webm").with_unique_id("v1"),
            Box::new(element.clone()),
        )
    }

    fn kinds(playback: &Html5Playback) -> Vec<EventKind> {
        playback.events().poll().iter().map(|e| e.event.kind()).collect()
    }

    fn ready(element: &ScriptedElement, duration: f64) -> Html5Playback {
        let mut pb = playback(element);
        element.set_duration(duration);
        pb.handle_event(NativeEvent::LoadedMetadata);
        pb.events().poll();
        pb
    }

    #[test]
    fn test_ready_on_loadedmetadata_and_deferred_commands() {
        let element = ScriptedElement::new();
        let mut pb = playback(&element);
        assert_eq!(element.calls(), vec![ElementCall::SetSrc("http://cdn.tv/clip.webm".into())]);

        pb.volume(50);
        pb.play();
        pb.seek(10.0);
        assert!(!pb.is_ready());
        assert_eq!(pb.pending_len(), 3);
        assert_eq!(element.calls().len(), 1);

        element.set_duration(200.0);
        pb.handle_event(NativeEvent::LoadedMetadata);
        assert_eq!(pb.state(), PlaybackState::Playing);
        assert_eq!(
            element.calls()[1..],
            [ElementCall::Volume(0.5), ElementCall::Play, ElementCall::Seek(20.0)]
        );
        assert_eq!(
            kinds(&pb),
            vec![
                EventKind::Ready,
                EventKind::SettingsUpdate,
                EventKind::Play,
                EventKind::TimeUpdate
            ]
        );
    }

    #[test]
    fn test_non_finite_seek_percent_is_rejected() {
        let element = ScriptedElement::new();
        let mut pb = ready(&element, 60.0);
        pb.seek(f64::NAN);
        pb.seek(f64::NEG_INFINITY);
        assert!(!element.calls().iter().any(|c| matches!(c, ElementCall::Seek(_))));
        assert!(kinds(&pb).is_empty());

        pb.seek(50.0);
        assert_eq!(element.calls().last(), Some(&ElementCall::Seek(30.0)));
    }

    #[test]
    fn test_waiting_and_playing() {
        let element = ScriptedElement::new();
        let mut pb = ready(&element, 60.0);
        pb.play();
        kinds(&pb);

        pb.handle_event(NativeEvent::Waiting);
        pb.handle_event(NativeEvent::Waiting);
        assert_eq!(pb.state(), PlaybackState::PlayingBuffering);
        pb.handle_event(NativeEvent::Playing);
        assert_eq!(pb.state(), PlaybackState::Playing);
        assert_eq!(kinds(&pb), vec![EventKind::Buffering, EventKind::BufferFull]);
    }

    #[test]
    fn test_native_pause_reported_once() {
        let element = ScriptedElement::new();
        let mut pb = ready(&element, 60.0);
        pb.play();
        pb.pause();
        // The element echoes our own pause
        pb.handle_event(NativeEvent::Pause);
        assert_eq!(kinds(&pb), vec![EventKind::Play, EventKind::Pause]);

        pb.play();
        kinds(&pb);
        pb.handle_event(NativeEvent::Pause);
        assert_eq!(pb.state(), PlaybackState::Paused);
        assert_eq!(kinds(&pb), vec![EventKind::Pause]);

        pb.handle_event(NativeEvent::Waiting);
        pb.handle_event(NativeEvent::Ended);
        assert_eq!(pb.state(), PlaybackState::Paused);
    }

    #[test]
    fn test_progress_and_ended() {
        let element = ScriptedElement::new();
        let mut pb = ready(&element, 30.0);
        pb.handle_event(NativeEvent::Progress);
        assert!(kinds(&pb).is_empty());

        pb.play();
        element.set_buffered(12.0);
        pb.handle_event(NativeEvent::Progress);
        pb.handle_event(NativeEvent::Ended);
        let events: Vec<_> = pb.events().poll().into_iter().map(|e| e.event).collect();
        assert_eq!(
            events[1..],
            [
                PlaybackEvent::Progress {
                    start: 0.0,
                    loaded: 12.0,
                    total: 30.0
                },
                PlaybackEvent::Ended,
                PlaybackEvent::TimeUpdate {
                    position: 0.0,
                    duration: 30.0
                },
            ]
        );
    }

    #[test]
    fn test_media_error_is_terminal() {
        let element = ScriptedElement::new();
        let mut pb = playback(&element);
        pb.play();
        pb.handle_event(NativeEvent::Error {
            code: 4,
            message: "MEDIA_ERR_SRC_NOT_SUPPORTED".into(),
        });
        assert_eq!(pb.state(), PlaybackState::Error);
        assert_eq!(pb.pending_len(), 0);
        assert_eq!(
            pb.events().poll()[0].event,
            PlaybackEvent::Error(ErrorInfo {
                message: "Media error 4: MEDIA_ERR_SRC_NOT_SUPPORTED".into()
            })
        );

        pb.handle_event(NativeEvent::LoadedMetadata);
        pb.play();
        assert!(!pb.is_ready());
        assert_eq!(element.calls().len(), 1);
    }

    #[test]
    fn test_stop_and_live_type() {
        let element = ScriptedElement::new();
        let mut pb = ready(&element, f64::INFINITY);
        assert_eq!(pb.playback_type(), PlaybackType::Live);
        assert_eq!(pb.duration(), 0.0);

        pb.play();
        pb.stop();
        assert_eq!(pb.state(), PlaybackState::Idle);
        assert_eq!(element.calls().last(), Some(&ElementCall::Seek(0.0)));
    }

    #[test]
    fn test_destroy_detaches_listeners() {
        let element = ScriptedElement::new();
        let mut pb = ready(&element, 10.0);
        pb.events().on(EventKind::TimeUpdate, |_| {});
        pb.destroy();
        assert_eq!(pb.events().listener_count(), 0);

        pb.handle_event(NativeEvent::TimeUpdate);
        pb.play();
        assert!(pb.events().poll().is_empty());
        assert_eq!(element.calls().last(), Some(&ElementCall::SetSrc(String::new())));
    }

    #[test]
    fn test_can_play() {
        let desktop = Platform::desktop();
        assert!(can_play(&json!("clip.webm"), &desktop));
        assert!(can_play(&json!("clip.mp4?t=10"), &Platform::mobile()));
        assert!(!can_play(&json!("clip.f4v"), &desktop));
        assert!(!can_play(&json!(null), &desktop));
        assert!(!can_play(&json!(42), &desktop));
        assert!(!can_play(&json!("clip.mp4"), &Platform::default()));
    }
}
