//! In-process stand-in for the plugin object.
//!
//! Used by the tests and by the demo binary. Clones share one script, so the
//! caller keeps a handle while the backend owns the boxed copy. Setters that
//! model plugin-side changes also publish the matching `<uid>:<signal>`
//! topic on the attached mediator, with the same payload the real plugin's
//! callbacks carry.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard};

use super::object::{PluginObject, PluginState};
use super::{PluginSignal, ProgressReport, TimeReport, signal_topic};
use crate::core::error::PluginError;
use crate::core::mediator::Mediator;

/// Command received by the plugin, in call order
#[derive(Debug, Clone, PartialEq)]
pub enum PluginCall {
    Resize(String, String),
    Play(String),
    Resume,
    Pause,
    Stop,
    Seek(f64),
    Volume(u8),
}

#[derive(Debug)]
struct Script {
    interactive: bool,
    /// Becomes interactive on this probe (1-based)
    interactive_after: Option<u32>,
    probes: u32,
    state: PluginState,
    position: f64,
    duration: Option<f64>,
    bytes_loaded: u64,
    bytes_total: u64,
    calls: Vec<PluginCall>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            interactive: false,
            interactive_after: None,
            probes: 0,
            state: PluginState::Idle,
            position: 0.0,
            duration: None,
            bytes_loaded: 0,
            bytes_total: 0,
            calls: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedPlugin {
    script: Arc<Mutex<Script>>,
    link: Option<(Mediator, String)>,
}

impl ScriptedPlugin {
    /// Not interactive, no duration, not attached to any mediator
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish plugin signals on `mediator` under `unique_id`
    pub fn attach(mut self, mediator: Mediator, unique_id: impl Into<String>) -> Self {
        self.link = Some((mediator, unique_id.into()));
        self
    }

    /// Scripting interface comes up on the `probe`-th readiness check
    pub fn interactive_after(self, probe: u32) -> Self {
        self.script().interactive_after = Some(probe);
        self
    }

    pub fn set_interactive(&self, interactive: bool) {
        self.script().interactive = interactive;
    }

    /// Duration known to the plugin, without any signal
    pub fn set_duration(&self, duration: f64) {
        self.script().duration = Some(duration);
    }

    /// Plugin finished its handshake (`<uid>:flashready`)
    pub fn announce_ready(&self) {
        self.publish(PluginSignal::FlashReady, &());
    }

    /// Plugin state moved (`<uid>:statechanged`)
    pub fn set_state(&self, state: PluginState) {
        self.script().state = state;
        self.publish(PluginSignal::StateChanged, &state.as_str().to_string());
    }

    /// `<uid>:statechanged` with a raw state string, known or not
    pub fn report_state(&self, raw: &str) {
        if let Some(state) = PluginState::parse(raw) {
            self.script().state = state;
        }
        self.publish(PluginSignal::StateChanged, &raw.to_string());
    }

    /// Publish `signal` with no payload; the backend has to read the plugin itself
    pub fn notify(&self, signal: PluginSignal) {
        self.publish(signal, &());
    }

    /// Playhead moved (`<uid>:timeupdate`)
    pub fn set_time(&self, position: f64, duration: f64) {
        {
            let mut script = self.script();
            script.position = position;
            script.duration = Some(duration);
        }
        self.publish(PluginSignal::TimeUpdate, &TimeReport { position, duration });
    }

    /// Download advanced (`<uid>:progress`)
    pub fn set_progress(&self, loaded: u64, total: u64) {
        {
            let mut script = self.script();
            script.bytes_loaded = loaded;
            script.bytes_total = total;
        }
        self.publish(PluginSignal::Progress, &ProgressReport { loaded, total });
    }

    /// Number of `is_interactive` checks so far
    pub fn probes(&self) -> u32 {
        self.script().probes
    }

    pub fn calls(&self) -> Vec<PluginCall> {
        self.script().calls.clone()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: PluginCall) {
        self.script().calls.push(call);
    }

    fn publish(&self, signal: PluginSignal, payload: &dyn Any) {
        if let Some((mediator, unique_id)) = &self.link {
            mediator.publish(&signal_topic(unique_id, signal), payload);
        }
    }

    fn getter<T>(&self, name: &'static str, read: impl FnOnce(&Script) -> Option<T>) -> Result<T, PluginError> {
        let script = self.script();
        if !script.interactive {
            return Err(PluginError::Unavailable);
        }
        read(&*script).ok_or(PluginError::NotInitialized(name))
    }
}

impl PluginObject for ScriptedPlugin {
    fn is_interactive(&self) -> bool {
        let mut script = self.script();
        script.probes += 1;
        if script.interactive_after.is_some_and(|n| script.probes >= n) {
            script.interactive = true;
        }
        script.interactive
    }

    fn resize(&mut self, width: &str, height: &str) {
        self.record(PluginCall::Resize(width.to_string(), height.to_string()));
    }

    fn play(&mut self, src: &str) {
        self.record(PluginCall::Play(src.to_string()));
    }

    fn resume(&mut self) {
        self.record(PluginCall::Resume);
    }

    fn pause(&mut self) {
        self.record(PluginCall::Pause);
    }

    fn stop(&mut self) {
        self.record(PluginCall::Stop);
    }

    fn seek(&mut self, seconds: f64) {
        self.script().position = seconds;
        self.record(PluginCall::Seek(seconds));
    }

    fn set_volume(&mut self, value: u8) {
        self.record(PluginCall::Volume(value));
    }

    fn state(&self) -> Result<PluginState, PluginError> {
        self.getter("getState", |s| Some(s.state))
    }

    fn position(&self) -> Result<f64, PluginError> {
        self.getter("getPosition", |s| Some(s.position))
    }

    fn duration(&self) -> Result<f64, PluginError> {
        self.getter("getDuration", |s| s.duration)
    }

    fn bytes_loaded(&self) -> Result<u64, PluginError> {
        self.getter("getBytesLoaded", |s| Some(s.bytes_loaded))
    }

    fn bytes_total(&self) -> Result<u64, PluginError> {
        self.getter("getBytesTotal", |s| Some(s.bytes_total))
    }
}
