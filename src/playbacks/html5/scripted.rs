//! In-process stand-in for the native `<video>` element.

use std::sync::{Arc, Mutex, MutexGuard};

use super::MediaElement;

#[derive(Debug, Clone, PartialEq)]
pub enum ElementCall {
    SetSrc(String),
    Play,
    Pause,
    Seek(f64),
    /// 0.0-1.0
    Volume(f64),
}

#[derive(Debug)]
struct Element {
    current_time: f64,
    duration: f64,
    buffered_end: f64,
    calls: Vec<ElementCall>,
}

/// Clones share one element, so tests keep a handle on what the backend drives.
#[derive(Debug, Clone)]
pub struct ScriptedElement {
    element: Arc<Mutex<Element>>,
}

impl Default for ScriptedElement {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedElement {
    /// No metadata yet: duration is NaN
    pub fn new() -> Self {
        Self {
            element: Arc::new(Mutex::new(Element {
                current_time: 0.0,
                duration: f64::NAN,
                buffered_end: 0.0,
                calls: Vec::new(),
            })),
        }
    }

    pub fn set_duration(&self, duration: f64) {
        self.element().duration = duration;
    }

    pub fn set_position(&self, seconds: f64) {
        self.element().current_time = seconds;
    }

    pub fn set_buffered(&self, end: f64) {
        self.element().buffered_end = end;
    }

    pub fn calls(&self) -> Vec<ElementCall> {
        self.element().calls.clone()
    }

    fn element(&self) -> MutexGuard<'_, Element> {
        self.element.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl MediaElement for ScriptedElement {
    fn set_src(&mut self, src: &str) {
        self.element().calls.push(ElementCall::SetSrc(src.to_string()));
    }

    fn play(&mut self) {
        self.element().calls.push(ElementCall::Play);
    }

    fn pause(&mut self) {
        self.element().calls.push(ElementCall::Pause);
    }

    fn current_time(&self) -> f64 {
        self.element().current_time
    }

    fn set_current_time(&mut self, seconds: f64) {
        let mut element = self.element();
        element.current_time = seconds;
        element.calls.push(ElementCall::Seek(seconds));
    }

    fn duration(&self) -> f64 {
        self.element().duration
    }

    fn set_volume(&mut self, volume: f64) {
        self.element().calls.push(ElementCall::Volume(volume));
    }

    fn buffered_end(&self) -> f64 {
        self.element().buffered_end
    }
}
