//! CLAPBOARD - media player playback core
//!
//! Re-exports all modules for use by the demo binary.

// Core engine (mediator, state machine, playback contract). Declared first so
// the Playback trait is known before the backends dispatch over it.
pub mod core;

pub mod playbacks;

// App modules
pub mod cli;
pub mod config;
pub mod platform;
pub mod utils;

// Re-export commonly used types
pub use crate::core::events::{Emitted, EventKind, PlaybackEvent};
pub use crate::core::mediator::Mediator;
pub use crate::core::playback::{Playback, PlaybackContext, PlaybackOptions};
pub use crate::core::state::PlaybackState;
pub use platform::Platform;
pub use playbacks::{BackendId, PlaybackKind, select_backend};
