//! Public playback event vocabulary and the per-instance listenable surface.
//!
//! Every backend owns one [`PlaybackEmitter`]. It is built on a private
//! [`Mediator`], so backend-internal topics on the process mediator never mix
//! with the public events the orchestrator and UI chrome listen to.
//!
//! Like the playa event bus, trigger() does two things:
//! 1. Immediate: listeners registered with on()/once() run synchronously
//! 2. Deferred: the event is queued and handed out by poll()
//!
//! Listeners can't call back into the backend that is emitting (it is mutably
//! borrowed at that point), so an orchestrator that wants to react with a
//! command drains poll() in its own loop instead.

use log::warn;
use serde::Serialize;
use std::sync::{Arc, Mutex};

use super::mediator::{ListenerId, Mediator};

/// Maximum events in queue before oldest are evicted
const MAX_QUEUE_SIZE: usize = 1000;

/// Payload of PLAYBACK_ERROR
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorInfo {
    pub message: String,
}

/// Events a backend emits towards the orchestrator / UI chrome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaybackEvent {
    Ready,
    Play,
    Pause,
    TimeUpdate { position: f64, duration: f64 },
    Progress { start: f64, loaded: f64, total: f64 },
    Buffering,
    BufferFull,
    Ended,
    Error(ErrorInfo),
    SettingsUpdate,
}

/// Discriminant of [`PlaybackEvent`], used to listen for one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Ready,
    Play,
    Pause,
    TimeUpdate,
    Progress,
    Buffering,
    BufferFull,
    Ended,
    Error,
    SettingsUpdate,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        EventKind::Ready,
        EventKind::Play,
        EventKind::Pause,
        EventKind::TimeUpdate,
        EventKind::Progress,
        EventKind::Buffering,
        EventKind::BufferFull,
        EventKind::Ended,
        EventKind::Error,
        EventKind::SettingsUpdate,
    ];

    /// Topic name on the emitter's private mediator
    pub fn topic(self) -> &'static str {
        match self {
            EventKind::Ready => "playback:ready",
            EventKind::Play => "playback:play",
            EventKind::Pause => "playback:pause",
            EventKind::TimeUpdate => "playback:timeupdate",
            EventKind::Progress => "playback:progress",
            EventKind::Buffering => "playback:buffering",
            EventKind::BufferFull => "playback:bufferfull",
            EventKind::Ended => "playback:ended",
            EventKind::Error => "playback:error",
            EventKind::SettingsUpdate => "playback:settingsupdate",
        }
    }
}

impl PlaybackEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PlaybackEvent::Ready => EventKind::Ready,
            PlaybackEvent::Play => EventKind::Play,
            PlaybackEvent::Pause => EventKind::Pause,
            PlaybackEvent::TimeUpdate { .. } => EventKind::TimeUpdate,
            PlaybackEvent::Progress { .. } => EventKind::Progress,
            PlaybackEvent::Buffering => EventKind::Buffering,
            PlaybackEvent::BufferFull => EventKind::BufferFull,
            PlaybackEvent::Ended => EventKind::Ended,
            PlaybackEvent::Error(_) => EventKind::Error,
            PlaybackEvent::SettingsUpdate => EventKind::SettingsUpdate,
        }
    }
}

/// An event as delivered: payload plus the name of the backend that emitted it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Emitted {
    #[serde(flatten)]
    pub event: PlaybackEvent,
    pub backend: &'static str,
}

/// Listenable event surface of one backend instance.
#[derive(Clone)]
pub struct PlaybackEmitter {
    backend: &'static str,
    bus: Mediator,
    queue: Arc<Mutex<Vec<Emitted>>>,
}

impl std::fmt::Debug for PlaybackEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEmitter")
            .field("backend", &self.backend)
            .field("listeners", &self.bus.listener_count())
            .field("queue_len", &self.queue.lock().map(|q| q.len()).unwrap_or(0))
            .finish()
    }
}

impl PlaybackEmitter {
    pub fn new(backend: &'static str) -> Self {
        Self {
            backend,
            bus: Mediator::new(),
            queue: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Name stamped on every emitted event
    pub fn backend(&self) -> &'static str {
        self.backend
    }

    /// Listen for every event of `kind`
    pub fn on<F>(&self, kind: EventKind, callback: F) -> ListenerId
    where
        F: Fn(&Emitted) + Send + Sync + 'static,
    {
        self.bus.subscribe_typed::<Emitted, _>(kind.topic(), callback)
    }

    /// Listen for the next event of `kind` only
    pub fn once<F>(&self, kind: EventKind, callback: F) -> ListenerId
    where
        F: Fn(&Emitted) + Send + Sync + 'static,
    {
        self.bus.subscribe_once_typed::<Emitted, _>(kind.topic(), callback)
    }

    /// Remove one listener, or all listeners of `kind`
    pub fn off(&self, kind: EventKind, id: Option<ListenerId>) -> usize {
        self.bus.unsubscribe(kind.topic(), id)
    }

    /// Remove every listener of every kind
    pub fn off_all(&self) -> usize {
        EventKind::ALL.iter().map(|k| self.bus.unsubscribe(k.topic(), None)).sum()
    }

    pub fn listener_count(&self) -> usize {
        self.bus.listener_count()
    }

    /// Emit: run listeners immediately AND queue for poll().
    pub fn trigger(&self, event: PlaybackEvent) {
        let emitted = Emitted {
            event,
            backend: self.backend,
        };
        self.bus.publish(emitted.event.kind().topic(), &emitted);

        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        if queue.len() >= MAX_QUEUE_SIZE {
            let evict_count = queue.len() / 2;
            warn!(
                "PlaybackEmitter[{}] queue full ({} events), evicting oldest {}",
                self.backend,
                queue.len(),
                evict_count
            );
            queue.drain(0..evict_count);
        }
        queue.push(emitted);
    }

    /// All events emitted since the last poll, oldest first.
    pub fn poll(&self) -> Vec<Emitted> {
        std::mem::take(&mut *self.queue.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Check queue length
    pub fn queue_len(&self) -> usize {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
