//! Core engine modules - mediator, timers, state machine, playback contract
//!
//! These modules are backend-agnostic; concrete backends live in `playbacks`.

pub mod clock;
pub mod error;
pub mod events;
pub mod mediator;
pub mod pending;
pub mod playback;
pub mod retry;
pub mod state;

// Re-exports for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{PlaybackError, PluginError};
pub use events::{Emitted, ErrorInfo, EventKind, PlaybackEmitter, PlaybackEvent};
pub use mediator::{ListenerId, Mediator};
pub use pending::{Command, PendingQueue, WakeOn};
pub use playback::{Playback, PlaybackConfig, PlaybackContext, PlaybackOptions, PlaybackType, Settings};
pub use retry::{RetryOutcome, RetryTimer};
pub use state::{Lifecycle, Outcome, PlaybackState, Transition};
