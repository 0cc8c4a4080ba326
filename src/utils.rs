//! Utility functions and constants
//!
//! **Used by**: backend capability queries, initial seek, media control time display

/// Resource extension helpers for capability queries
pub mod media {
    use once_cell::sync::Lazy;
    use regex::Regex;

    /// Extensions the plugin backend plays
    pub const FLASH_EXTS: &[&str] = &["mp4", "mov", "f4v", "3gpp", "3gp"];

    /// Extensions the native video element plays
    pub const HTML5_EXTS: &[&str] = &["mp4", "webm", "ogg", "ogv", "m4v"];

    static EXTENSION_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r".*\.(.*)$").expect("extension regex")
    });

    /// Text after the last dot of the resource, query string ignored.
    ///
    /// `"http://cdn/clip.mp4?t=10"` -> `Some("mp4")`, `"http://cdn.tv/clip"` -> `Some("tv/clip")`
    /// (the dot of the host counts), `"clip"` -> `None`.
    pub fn extension(resource: &str) -> Option<&str> {
        let path = resource.split('?').next().unwrap_or(resource);
        EXTENSION_RE
            .captures(path)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Check if the resource extension is one of `exts` (exact match)
    pub fn has_extension(resource: &str, exts: &[&str]) -> bool {
        extension(resource).is_some_and(|ext| exts.contains(&ext))
    }
}

/// Time formatting and URL-embedded offsets
pub mod time {
    use once_cell::sync::Lazy;
    use regex::Regex;

    static SEEK_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"t=([0-9]*)h?([0-9]*)m?([0-9]*)s").expect("seek offset regex")
    });

    /// Seek offset embedded in a URL (`?t=1h2m3s`, `?t=90s`), in seconds.
    ///
    /// Non-empty groups are read right to left as seconds, minutes, hours.
    /// No offset -> 0.
    pub fn seek_string_to_seconds(url: &str) -> u64 {
        let Some(caps) = SEEK_RE.captures(url) else {
            return 0;
        };

        let groups: Vec<&str> = caps
            .iter()
            .skip(1)
            .flatten()
            .map(|m| m.as_str())
            .filter(|s| !s.is_empty())
            .collect();

        let mut seconds: u64 = 0;
        let mut factor: u64 = 1;
        for group in groups.iter().rev() {
            let value = group.parse::<u64>().unwrap_or(0);
            seconds = seconds.saturating_add(value.saturating_mul(factor));
            factor = factor.saturating_mul(60);
        }
        seconds
    }

    /// Position for media control display: `MM:SS`, or `HH:MM:SS` past the hour.
    /// Hours wrap at 24.
    pub fn format_time(seconds: f64) -> String {
        let total = if seconds.is_finite() && seconds > 0.0 {
            seconds.trunc() as u64
        } else {
            0
        };
        let secs = total % 60;
        let minutes = (total / 60) % 60;
        let hours = (total / 3600) % 24;

        if hours > 0 {
            format!("{:02}:{:02}:{:02}", hours, minutes, secs)
        } else {
            format!("{:02}:{:02}", minutes, secs)
        }
    }
}

pub use time::{format_time, seek_string_to_seconds};

#[cfg(test)]
mod tests {
    use super::media::*;
    use super::time::*;

    #[test]
    fn test_seek_string_to_seconds() {
        assert_eq!(seek_string_to_seconds("http://x/?t=1h2m3s"), 3723);
        assert_eq!(seek_string_to_seconds("http://x/?t=90s"), 90);
        assert_eq!(seek_string_to_seconds("http://x/?t=2m3s"), 123);
        assert_eq!(seek_string_to_seconds("http://x/"), 0);
        assert_eq!(seek_string_to_seconds("http://x/?t=10"), 0);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "00:00");
        assert_eq!(format_time(65.9), "01:05");
        assert_eq!(format_time(3723.0), "01:02:03");
        assert_eq!(format_time(f64::NAN), "00:00");
        assert_eq!(format_time(-4.0), "00:00");
    }

    #[test]
    fn test_extension_ignores_query() {
        assert_eq!(extension("clip.mp4"), Some("mp4"));
        assert_eq!(extension("http://cdn.example/clip.mp4?t=10"), Some("mp4"));
        assert_eq!(extension("clip"), None);
        assert!(has_extension("a/b.3gp", FLASH_EXTS));
        assert!(!has_extension("a/b.mkv", FLASH_EXTS));
    }
}
