//! Plugin-object backend with a polling bootstrap.
//!
//! The plugin has no "attached" callback that can be relied on, so readiness is
//! found by polling: every `bootstrap_interval_ms` the backend probes
//! [`PluginObject::is_interactive`], giving up after `max_attempts` failed
//! probes. A `<uid>:flashready` signal triggers an immediate probe.
//!
//! # Signal flow
//!
//! ```text
//! plugin --publish "<uid>:statechanged"--> Mediator --callback--> inbox
//!                                                                   |
//! host loop --tick()--> drain inbox --> Lifecycle --> PlaybackEmitter
//! ```
//!
//! Mediator callbacks capture what the plugin reported with the signal (state
//! string, playhead, byte counts) and queue it; the backend replays the queue
//! in publish order on its next tick(). A signal published without a payload
//! is queued bare and the plugin is read at replay time. The callbacks hold a
//! `Weak` to the inbox, so a registration leaked past destroy() can't reach a
//! dropped backend.

pub mod object;
pub mod scripted;

use log::{debug, info, trace, warn};
use std::any::Any;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::core::error::PlaybackError;
use crate::core::events::{ErrorInfo, PlaybackEmitter, PlaybackEvent};
use crate::core::mediator::ListenerId;
use crate::core::pending::{Command, PendingQueue, WakeOn};
use crate::core::playback::{Playback, PlaybackContext, PlaybackOptions, PlaybackType, Settings};
use crate::core::retry::{RetryOutcome, RetryTimer};
use crate::core::state::{Lifecycle, Outcome, PlaybackState, Transition};
use crate::platform::Platform;
use crate::utils::media::{FLASH_EXTS, has_extension};
use crate::utils::seek_string_to_seconds;

pub use object::{PluginObject, PluginState};
pub use scripted::{PluginCall, ScriptedPlugin};

pub const NAME: &str = "flash";

/// Private signals the plugin publishes under `<uid>:<signal>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginSignal {
    Progress,
    TimeUpdate,
    StateChanged,
    FlashReady,
}

impl PluginSignal {
    pub const ALL: [PluginSignal; 4] = [
        PluginSignal::Progress,
        PluginSignal::TimeUpdate,
        PluginSignal::StateChanged,
        PluginSignal::FlashReady,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            PluginSignal::Progress => "progress",
            PluginSignal::TimeUpdate => "timeupdate",
            PluginSignal::StateChanged => "statechanged",
            PluginSignal::FlashReady => "flashready",
        }
    }
}

/// Payload of `<uid>:timeupdate`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeReport {
    pub position: f64,
    pub duration: f64,
}

/// Payload of `<uid>:progress`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressReport {
    pub loaded: u64,
    pub total: u64,
}

/// Mediator topic of `signal` for instance `unique_id`
pub fn signal_topic(unique_id: &str, signal: PluginSignal) -> String {
    format!("{}:{}", unique_id, signal.suffix())
}

/// Markup flavour the host page embeds the plugin with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginEmbed {
    /// `<object type="application/x-shockwave-flash">`
    Object,
    /// Firefox
    Embed,
    /// Legacy IE `classid` object
    ActiveX,
}

impl PluginEmbed {
    pub fn for_platform(platform: &Platform) -> Self {
        if platform.is_firefox {
            PluginEmbed::Embed
        } else if platform.is_legacy_ie {
            PluginEmbed::ActiveX
        } else {
            PluginEmbed::Object
        }
    }
}

/// Capability query: string URL with a plugin extension, plugin installed, not mobile.
pub fn can_play(resource: &serde_json::Value, platform: &Platform) -> bool {
    if !platform.has_flash || platform.is_mobile {
        return false;
    }
    match resource.as_str() {
        Some(url) if !url.is_empty() => has_extension(url, FLASH_EXTS),
        _ => false,
    }
}

/// A plugin signal as captured at publish time
#[derive(Debug, Clone, Copy, PartialEq)]
enum Report {
    FlashReady,
    State(PluginState),
    Time(TimeReport),
    Progress(ProgressReport),
    /// No payload: read the plugin when replayed
    Bare(PluginSignal),
}

impl Report {
    /// `<uid>:statechanged` carries the raw `getState()` string; an unknown one drops the signal.
    fn capture(signal: PluginSignal, payload: &dyn Any, unique_id: &str) -> Option<Self> {
        let report = match signal {
            PluginSignal::FlashReady => Report::FlashReady,
            PluginSignal::StateChanged => {
                let raw = payload
                    .downcast_ref::<String>()
                    .map(String::as_str)
                    .or_else(|| payload.downcast_ref::<&'static str>().copied());
                match raw.map(|raw| (raw, PluginState::parse(raw))) {
                    None => Report::Bare(signal),
                    Some((_, Some(state))) => Report::State(state),
                    Some((raw, None)) => {
                        warn!("FlashPlayback[{}]: unknown plugin state '{}', ignored", unique_id, raw);
                        return None;
                    }
                }
            }
            PluginSignal::TimeUpdate => payload
                .downcast_ref::<TimeReport>()
                .map_or(Report::Bare(signal), |time| Report::Time(*time)),
            PluginSignal::Progress => payload
                .downcast_ref::<ProgressReport>()
                .map_or(Report::Bare(signal), |bytes| Report::Progress(*bytes)),
        };
        Some(report)
    }
}

type Inbox = Arc<Mutex<VecDeque<Report>>>;

pub struct FlashPlayback {
    options: PlaybackOptions,
    ctx: PlaybackContext,
    object: Box<dyn PluginObject>,
    embed: PluginEmbed,
    lifecycle: Lifecycle,
    pending: PendingQueue,
    bootstrap: RetryTimer,
    inbox: Inbox,
    subscriptions: Vec<(String, ListenerId)>,
    events: PlaybackEmitter,
    settings: Settings,
    /// Bootstrapped with unknown duration: READY waits for the first timeupdate
    awaiting_metadata: bool,
    bootstrapped: bool,
    destroyed: bool,
}

impl std::fmt::Debug for FlashPlayback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlashPlayback")
            .field("unique_id", &self.options.unique_id)
            .field("state", &self.lifecycle.state())
            .field("ready", &self.lifecycle.is_ready())
            .field("attempts", &self.bootstrap.attempts())
            .field("pending", &self.pending.len())
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

impl FlashPlayback {
    /// Register the private signal topics and arm the first bootstrap check.
    pub fn new(options: PlaybackOptions, ctx: PlaybackContext, object: Box<dyn PluginObject>) -> Self {
        let inbox: Inbox = Arc::new(Mutex::new(VecDeque::new()));

        let mut subscriptions = Vec::with_capacity(PluginSignal::ALL.len());
        for signal in PluginSignal::ALL {
            let topic = signal_topic(&options.unique_id, signal);
            let weak = Arc::downgrade(&inbox);
            let unique_id = options.unique_id.clone();
            let id = ctx.mediator.subscribe(topic.clone(), move |payload| {
                let Some(inbox) = weak.upgrade() else {
                    return;
                };
                if let Some(report) = Report::capture(signal, payload, &unique_id) {
                    inbox.lock().unwrap_or_else(|e| e.into_inner()).push_back(report);
                }
            });
            subscriptions.push((topic, id));
        }

        let mut bootstrap = RetryTimer::new(ctx.config.bootstrap_interval_ms, ctx.config.max_attempts);
        bootstrap.schedule(ctx.clock.now());

        let embed = PluginEmbed::for_platform(&ctx.platform);
        info!(
            "FlashPlayback[{}]: created for {} ({:?}, base {})",
            options.unique_id, options.src, embed, options.base_url
        );

        Self {
            options,
            ctx,
            object,
            embed,
            lifecycle: Lifecycle::new(),
            pending: PendingQueue::new(),
            bootstrap,
            inbox,
            subscriptions,
            events: PlaybackEmitter::new(NAME),
            settings: Settings::vod(),
            awaiting_metadata: false,
            bootstrapped: false,
            destroyed: false,
        }
    }

    pub fn embed(&self) -> PluginEmbed {
        self.embed
    }

    /// Failed bootstrap checks so far
    pub fn bootstrap_attempts(&self) -> u32 {
        self.bootstrap.attempts()
    }

    /// Check if a bootstrap check is armed
    pub fn bootstrap_pending(&self) -> bool {
        self.bootstrap.is_pending()
    }

    /// Commands parked until READY / BUFFERFULL
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Mediator registrations held by this instance
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    fn bootstrap_check(&mut self) {
        if self.bootstrapped || self.lifecycle.is_errored() {
            return;
        }

        if self.object.is_interactive() {
            self.bootstrap.cancel();
            self.bootstrapped = true;
            self.object.resize("100%", "100%");
            self.lifecycle.apply(Transition::BootstrapSucceeded);
            info!(
                "FlashPlayback[{}]: plugin up after {} failed check(s)",
                self.options.unique_id,
                self.bootstrap.attempts()
            );

            if self.duration() > 0.0 {
                self.metadata_loaded();
            } else {
                self.awaiting_metadata = true;
            }
            if self.options.auto_play {
                self.play();
            }
            return;
        }

        let now = self.ctx.clock.now();
        match self.bootstrap.record_failure(now) {
            RetryOutcome::Rescheduled => {
                trace!(
                    "FlashPlayback[{}]: plugin not interactive (check {}/{})",
                    self.options.unique_id,
                    self.bootstrap.attempts(),
                    self.bootstrap.max_attempts()
                );
            }
            RetryOutcome::Exhausted => {
                let error = PlaybackError::MaxAttemptsReached {
                    attempts: self.bootstrap.attempts(),
                };
                warn!("FlashPlayback[{}]: {} ({} checks)", self.options.unique_id, error, self.bootstrap.attempts());
                self.lifecycle.apply(Transition::BootstrapExhausted);
                self.pending.clear();
                self.events.trigger(PlaybackEvent::Error(ErrorInfo {
                    message: error.to_string(),
                }));
            }
        }
    }

    fn metadata_loaded(&mut self) {
        self.awaiting_metadata = false;
        if !self.lifecycle.mark_ready() {
            return;
        }
        info!("FlashPlayback[{}]: ready, duration {:.2}s", self.options.unique_id, self.duration());
        self.events.trigger(PlaybackEvent::Ready);
        self.events.trigger(PlaybackEvent::SettingsUpdate);
        self.wake(WakeOn::Ready);
    }

    fn wake(&mut self, wake: WakeOn) {
        for command in self.pending.take(wake) {
            self.run(command);
        }
    }

    fn run(&mut self, command: Command) {
        match command {
            Command::Play => self.play(),
            Command::Pause => self.pause(),
            Command::Stop => self.stop(),
            Command::Seek(percent) => self.seek(percent),
            Command::SeekSeconds(seconds) => self.seek_seconds(seconds),
            Command::Volume(value) => self.volume(value),
            Command::InitialSeek => self.initial_seek(),
        }
    }

    /// Returns false when `command` can't run now; parks it if it can run later.
    fn ready_for(&mut self, command: Command) -> bool {
        if self.destroyed || self.lifecycle.is_errored() {
            debug!(
                "FlashPlayback[{}]: {:?} rejected in {}",
                self.options.unique_id,
                command,
                self.lifecycle.state()
            );
            return false;
        }
        if !self.lifecycle.is_ready() {
            self.pending.defer(WakeOn::Ready, command);
            return false;
        }
        true
    }

    fn initial_seek(&mut self) {
        let seconds = self.options.page_url.as_deref().map(seek_string_to_seconds).unwrap_or(0);
        if seconds != 0 {
            debug!("FlashPlayback[{}]: initial seek to {}s", self.options.unique_id, seconds);
            self.seek_seconds(seconds as f64);
        }
    }

    fn handle_report(&mut self, report: Report) {
        trace!("FlashPlayback[{}]: {:?}", self.options.unique_id, report);
        match report {
            Report::FlashReady => self.bootstrap_check(),
            Report::State(state) => self.apply_plugin_state(state),
            Report::Time(time) => self.time_update(Some(time)),
            Report::Progress(bytes) => self.progress(Some(bytes)),
            Report::Bare(signal) => self.read_plugin(signal),
        }
    }

    fn read_plugin(&mut self, signal: PluginSignal) {
        match signal {
            PluginSignal::FlashReady => self.bootstrap_check(),
            PluginSignal::StateChanged => match self.object.state() {
                Ok(state) => self.apply_plugin_state(state),
                Err(e) => trace!("FlashPlayback[{}]: state unreadable: {}", self.options.unique_id, e),
            },
            PluginSignal::TimeUpdate => {
                let time = match (self.object.position(), self.object.duration()) {
                    (Ok(position), Ok(duration)) => Some(TimeReport { position, duration }),
                    _ => None,
                };
                self.time_update(time);
            }
            PluginSignal::Progress => {
                let bytes = match (self.object.bytes_loaded(), self.object.bytes_total()) {
                    (Ok(loaded), Ok(total)) => Some(ProgressReport { loaded, total }),
                    _ => None,
                };
                self.progress(bytes);
            }
        }
    }

    fn time_update(&mut self, time: Option<TimeReport>) {
        if let Some(TimeReport { position, duration }) = time {
            self.events.trigger(PlaybackEvent::TimeUpdate { position, duration });
        }
        if self.awaiting_metadata {
            self.metadata_loaded();
        }
    }

    fn apply_plugin_state(&mut self, reported: PluginState) {
        match reported {
            PluginState::PlayingBuffering => {
                if let Outcome::Changed { .. } = self.lifecycle.apply(Transition::BufferingDetected) {
                    self.events.trigger(PlaybackEvent::Buffering);
                }
            }
            PluginState::Playing => {
                if self.lifecycle.apply(Transition::BufferReplenished).is_accepted() {
                    self.events.trigger(PlaybackEvent::BufferFull);
                    self.wake(WakeOn::BufferFull);
                }
            }
            PluginState::Idle => {
                self.lifecycle.apply(Transition::ReportedIdle);
            }
            PluginState::Ended => {
                if self.lifecycle.apply(Transition::ReportedEnded).is_accepted() {
                    self.events.trigger(PlaybackEvent::Ended);
                    self.events.trigger(PlaybackEvent::TimeUpdate {
                        position: 0.0,
                        duration: self.duration(),
                    });
                }
            }
            PluginState::Paused => {}
        }
    }

    fn progress(&mut self, bytes: Option<ProgressReport>) {
        use PlaybackState::*;
        if matches!(self.lifecycle.state(), Uninitialized | Idle | Ended | Error) {
            return;
        }
        if let Some(ProgressReport { loaded, total }) = bytes {
            self.events.trigger(PlaybackEvent::Progress {
                start: 0.0,
                loaded: loaded as f64,
                total: total as f64,
            });
        }
    }
}

impl Playback for FlashPlayback {
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
        if outcome.is_first_play() {
            self.object.play(&self.options.src);
            if !self.pending.contains(WakeOn::BufferFull, Command::InitialSeek) {
                self.pending.defer(WakeOn::BufferFull, Command::InitialSeek);
            }
        } else if outcome.is_accepted() {
            self.object.resume();
        } else {
            return;
        }
        self.events.trigger(PlaybackEvent::Play);
    }

    fn pause(&mut self) {
        if !self.ready_for(Command::Pause) {
            return;
        }
        if self.lifecycle.apply(Transition::Pause).is_accepted() {
            self.object.pause();
            self.events.trigger(PlaybackEvent::Pause);
        }
    }

    fn stop(&mut self) {
        if !self.ready_for(Command::Stop) {
            return;
        }
        self.object.stop();
        self.lifecycle.apply(Transition::Stop);
        self.events.trigger(PlaybackEvent::TimeUpdate {
            position: 0.0,
            duration: self.duration(),
        });
    }

    fn seek(&mut self, percent: f64) {
        if !percent.is_finite() {
            debug!("FlashPlayback[{}]: seek to {}% rejected", self.options.unique_id, percent);
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
        self.object.seek(seconds);
        self.events.trigger(PlaybackEvent::TimeUpdate {
            position: seconds,
            duration: self.duration(),
        });
        // Seeking resumes the plugin
        if self.lifecycle.state() == PlaybackState::Paused {
            self.object.pause();
        }
    }

    fn volume(&mut self, value: u8) {
        if !self.ready_for(Command::Volume(value)) {
            return;
        }
        self.object.set_volume(value.min(100));
    }

    fn duration(&self) -> f64 {
        self.object
            .duration()
            .ok()
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(0.0)
    }

    fn playback_type(&self) -> PlaybackType {
        PlaybackType::Vod
    }

    fn tick(&mut self) {
        if self.destroyed {
            return;
        }
        let reports: Vec<Report> = self
            .inbox
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        for report in reports {
            self.handle_report(report);
        }

        if self.bootstrap.tick(self.ctx.clock.now()) {
            self.bootstrap_check();
        }
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.bootstrap.cancel();

        let mut removed = 0;
        for (topic, id) in self.subscriptions.drain(..) {
            removed += self.ctx.mediator.unsubscribe(&topic, Some(id));
        }
        self.inbox.lock().unwrap_or_else(|e| e.into_inner()).clear();
        self.pending.clear();
        self.events.off_all();
        info!(
            "FlashPlayback[{}]: destroyed ({} mediator registration(s) removed)",
            self.options.unique_id, removed
        );
    }
}

impl Drop for FlashPlayback {
    fn drop(&mut self) {
        self.destroy();
    }
}
