//! User-visible text
//!
//! Defaults are English. Hosts load their own table from YAML to localise.

use serde::{Deserialize, Serialize};

/// Label table for the preview UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Labels {
    /// Transport button while paused or ready
    pub play: String,
    /// Transport button while playing
    pub pause: String,
    /// Text next to the loading indicator
    pub loading: String,
    /// Prefix for load errors, followed by `: ` and the detail
    pub load_error: String,
    /// Shown when a failure carries no detail
    pub unknown_error: String,
    /// Between current and total time
    pub time_separator: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            play: "Play".to_string(),
            pause: "Pause".to_string(),
            loading: "Loading audio...".to_string(),
            load_error: "Error while loading the file".to_string(),
            unknown_error: "An unknown error occurred".to_string(),
            time_separator: " / ".to_string(),
        }
    }
}

impl Labels {
    /// Full error line for a failure message
    pub fn error_text(&self, detail: Option<&str>) -> String {
        let detail = match detail {
            Some(d) if !d.trim().is_empty() => d,
            _ => &self.unknown_error,
        };
        format!("{}: {}", self.load_error, detail)
    }
}
