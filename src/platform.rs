//! Snapshot of what the hosting browser can do.
//!
//! Detection itself (user agent sniffing, plugin enumeration) belongs to the
//! embedding page; backends only read the flags when answering `can_play`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Platform {
    /// Shockwave Flash plugin installed and enabled
    pub has_flash: bool,
    /// Phone / tablet class device
    pub is_mobile: bool,
    /// Firefox embeds the plugin through `<embed>`
    pub is_firefox: bool,
    /// IE < 9 needs the ActiveX `<object>` markup
    pub is_legacy_ie: bool,
    /// `<video>` element available
    pub supports_native_video: bool,
}

impl Platform {
    /// Desktop browser with the plugin and native video
    pub fn desktop() -> Self {
        Self {
            has_flash: true,
            supports_native_video: true,
            ..Self::default()
        }
    }

    /// Mobile browser: native video, no plugin
    pub fn mobile() -> Self {
        Self {
            is_mobile: true,
            supports_native_video: true,
            ..Self::default()
        }
    }
}
