//! Concrete backends and capability-query selection.
//!
//! Each backend module exposes a side-effect-free `can_play` predicate. The
//! orchestrator walks its preferred order, takes the first backend whose
//! predicate accepts the resource, and stores the instance as [`PlaybackKind`].

pub mod flash;
pub mod html5;
pub mod no_op;

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

use crate::core::events::PlaybackEmitter;
use crate::core::playback::{Playback, PlaybackType, Settings};
use crate::core::state::PlaybackState;
use crate::platform::Platform;

pub use flash::FlashPlayback;
pub use html5::Html5Playback;
pub use no_op::NoOpPlayback;

/// Any backend, dispatched statically
#[enum_dispatch(Playback)]
#[derive(Debug)]
pub enum PlaybackKind {
    Flash(FlashPlayback),
    Html5(Html5Playback),
    NoOp(NoOpPlayback),
}

impl PlaybackKind {
    pub fn backend_id(&self) -> BackendId {
        match self {
            PlaybackKind::Flash(_) => BackendId::Flash,
            PlaybackKind::Html5(_) => BackendId::Html5Video,
            PlaybackKind::NoOp(_) => BackendId::NoOp,
        }
    }
}

/// Backend identifier, as written in the settings file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendId {
    Html5Video,
    Flash,
    NoOp,
}

impl BackendId {
    /// Preferred order when the settings don't say otherwise
    pub const DEFAULT_ORDER: [BackendId; 3] = [BackendId::Html5Video, BackendId::Flash, BackendId::NoOp];

    pub fn name(self) -> &'static str {
        match self {
            BackendId::Html5Video => html5::NAME,
            BackendId::Flash => flash::NAME,
            BackendId::NoOp => no_op::NAME,
        }
    }

    pub fn can_play(self, resource: &serde_json::Value, platform: &Platform) -> bool {
        match self {
            BackendId::Html5Video => html5::can_play(resource, platform),
            BackendId::Flash => flash::can_play(resource, platform),
            BackendId::NoOp => no_op::can_play(resource),
        }
    }
}

/// First backend in `order` that can play `resource`; the no-signal backend otherwise.
pub fn select_backend(resource: &serde_json::Value, platform: &Platform, order: &[BackendId]) -> BackendId {
    let selected = order
        .iter()
        .copied()
        .find(|id| id.can_play(resource, platform))
        .unwrap_or(BackendId::NoOp);
    log::debug!("Selected backend {} for {}", selected.name(), resource);
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::playback::PlaybackOptions;
    use serde_json::json;

    #[test]
    fn test_select_by_order_and_platform() {
        let order = BackendId::DEFAULT_ORDER;
        let desktop = Platform::desktop();
        assert_eq!(select_backend(&json!("clip.mp4"), &desktop, &order), BackendId::Html5Video);
        assert_eq!(select_backend(&json!("clip.f4v"), &desktop, &order), BackendId::Flash);
        assert_eq!(select_backend(&json!("clip.mkv"), &desktop, &order), BackendId::NoOp);
        assert_eq!(select_backend(&json!(42), &desktop, &order), BackendId::NoOp);

        let flash_first = [BackendId::Flash, BackendId::Html5Video];
        assert_eq!(select_backend(&json!("clip.mp4"), &desktop, &flash_first), BackendId::Flash);
        assert_eq!(select_backend(&json!("clip.mp4"), &Platform::mobile(), &flash_first), BackendId::Html5Video);
        assert_eq!(select_backend(&json!("clip.mp4"), &Platform::default(), &flash_first), BackendId::NoOp);
    }

    #[test]
    fn test_backend_id_serde() {
        assert_eq!(serde_json::to_string(&BackendId::Html5Video).unwrap(), "\"html5_video\"");
        let ids: Vec<BackendId> = serde_json::from_str(r#"["no_op", "flash"]"#).unwrap();
        assert_eq!(ids, vec![BackendId::NoOp, BackendId::Flash]);
    }

    #[test]
    fn test_kind_dispatches() {
        let mut kind: PlaybackKind = NoOpPlayback::new(PlaybackOptions::new("x")).into();
        kind.play();
        assert_eq!(kind.name(), "no_op");
        assert_eq!(kind.backend_id(), BackendId::NoOp);
        assert_eq!(kind.state(), PlaybackState::Idle);
        assert!(!kind.is_high_definition_in_use());
        kind.destroy();
    }
}
