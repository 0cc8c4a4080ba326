//! Backend-agnostic playback state machine.
//!
//! # States
//!
//! ```text
//!   UNINITIALIZED --bootstrap ok--> IDLE --play--> PLAYING <--buffer full-- PLAYING_BUFFERING
//!        |                           ^               |  ^  \--buffering-->        |
//!   retries used up            backend idle       pause  play                   pause
//!        v                           |               v  |                         v
//!      ERROR                       ENDED <--ended--  PAUSED <---------------------'
//! ```
//!
//! stop() returns PLAYING / PLAYING_BUFFERING / PAUSED / ENDED to IDLE; the next
//! play() is a first play again. Any state but ERROR can fail into ERROR.
//!
//! The [`Lifecycle`] owns the current state; backends feed it [`Transition`]s and
//! act on the returned [`Outcome`]. Nothing else can write the state.
//!
//! # Guards
//!
//! - PAUSED is sticky: backend poll signals (buffering, buffer full, idle, ended) are ignored
//! - ENDED ignores buffering/buffer-full until an explicit play
//! - ERROR is terminal

use serde::{Deserialize, Serialize};
use std::fmt;

/// Uniform lifecycle state of a playback backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaybackState {
    Uninitialized,
    Idle,
    Playing,
    PlayingBuffering,
    Paused,
    Ended,
    Error,
}

impl PlaybackState {
    /// PLAYING or PLAYING_BUFFERING
    pub fn is_playing(self) -> bool {
        matches!(self, Self::Playing | Self::PlayingBuffering)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "UNINITIALIZED",
            Self::Idle => "IDLE",
            Self::Playing => "PLAYING",
            Self::PlayingBuffering => "PLAYING_BUFFERING",
            Self::Paused => "PAUSED",
            Self::Ended => "ENDED",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    BootstrapSucceeded,
    BootstrapExhausted,
    /// play() command
    Play,
    /// pause() command
    Pause,
    /// stop() command
    Stop,
    /// Backend reports it is starving
    BufferingDetected,
    /// Backend reports it is playing with enough data
    BufferReplenished,
    /// Backend reports it is idle (stopped)
    ReportedIdle,
    /// Backend reports end of media
    ReportedEnded,
    /// Unrecoverable media error
    Failed,
}

impl Transition {
    /// Signals that originate from backend state polling rather than commands
    pub fn is_poll(self) -> bool {
        matches!(
            self,
            Self::BufferingDetected | Self::BufferReplenished | Self::ReportedIdle | Self::ReportedEnded
        )
    }
}

/// Result of feeding a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// State moved
    Changed { from: PlaybackState, to: PlaybackState },
    /// Accepted, state unchanged (e.g. buffer full while already playing)
    Unchanged(PlaybackState),
    /// Not valid in the current state, nothing happened
    Ignored(PlaybackState),
}

impl Outcome {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Self::Ignored(_))
    }

    /// Play from IDLE or ENDED: the media has to be (re)started from scratch
    pub fn is_first_play(&self) -> bool {
        matches!(
            self,
            Self::Changed {
                from: PlaybackState::Idle | PlaybackState::Ended,
                to: PlaybackState::Playing,
            }
        )
    }
}

fn target(from: PlaybackState, transition: Transition) -> Option<PlaybackState> {
    use PlaybackState::*;
    use Transition::*;

    match (from, transition) {
        (Error, _) => None,
        (_, Failed) => Some(Error),

        (Uninitialized, BootstrapSucceeded) => Some(Idle),
        (Uninitialized, BootstrapExhausted) => Some(Error),

        // Sticky pause
        (Paused, t) if t.is_poll() => None,

        (Idle | Ended | Paused | PlayingBuffering, Play) => Some(Playing),
        (Playing | PlayingBuffering, Pause) => Some(Paused),
        (Playing | PlayingBuffering | Paused | Ended, Stop) => Some(Idle),

        (Playing, BufferingDetected) => Some(PlayingBuffering),
        (Playing | PlayingBuffering, BufferReplenished) => Some(Playing),

        (Playing | PlayingBuffering | Ended, ReportedIdle) => Some(Idle),
        (Playing | PlayingBuffering, ReportedEnded) => Some(Ended),

        _ => None,
    }
}

/// Current state plus the one-way readiness latch.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: PlaybackState,
    ready: bool,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Uninitialized,
            ready: false,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Readiness latch (never resets)
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_errored(&self) -> bool {
        self.state == PlaybackState::Error
    }

    /// Ready and in PLAYING / PLAYING_BUFFERING
    pub fn is_playing(&self) -> bool {
        self.ready && self.state.is_playing()
    }

    /// Feed one transition.
    pub fn apply(&mut self, transition: Transition) -> Outcome {
        let from = self.state;
        match target(from, transition) {
            Some(to) if to == from => Outcome::Unchanged(from),
            Some(to) => {
                log::debug!("Playback state: {} -> {} ({:?})", from, to, transition);
                self.state = to;
                Outcome::Changed { from, to }
            }
            None => {
                log::trace!("Playback state: {:?} ignored in {}", transition, from);
                Outcome::Ignored(from)
            }
        }
    }

    /// Set the readiness latch. Returns true only the first time,
    /// never in ERROR.
    pub fn mark_ready(&mut self) -> bool {
        if self.ready || self.is_errored() {
            return false;
        }
        self.ready = true;
        true
    }
}
