//! Previewer host configuration
//!
//! Configuration is stored as YAML in the user's config directory.
//! Default location: ~/.config/earshot/previewer.yaml

use std::path::PathBuf;

use earshot_core::config::default_config_path as config_path_for;
use earshot_core::{PreviewConfig, WaveformStyle};
use earshot_widgets::Labels;
use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewerConfig {
    /// Transfer and snapshot settings
    pub preview: PreviewConfig,
    /// Waveform colours and geometry
    pub style: WaveformStyle,
    /// UI text
    pub labels: Labels,
    /// Base URL of the file server
    pub server_url: String,
    /// Download URL for files known by id; `{server}` and `{id}` are replaced
    pub download_url_template: String,
    /// Start playback as soon as the first snapshot decoded
    pub autoplay: bool,
    /// Waveform surface width in pixels
    pub surface_width: u32,
    /// Playback clock tick interval in milliseconds
    pub tick_interval_ms: u64,
}

impl Default for PreviewerConfig {
    fn default() -> Self {
        Self {
            preview: PreviewConfig::default(),
            style: WaveformStyle::default(),
            labels: Labels::default(),
            server_url: "http://localhost:8065".to_string(),
            download_url_template: "{server}/api/v4/files/{id}".to_string(),
            autoplay: false,
            surface_width: 600,
            tick_interval_ms: 100,
        }
    }
}

impl PreviewerConfig {
    /// Download URL for a server-side file id
    pub fn download_url(&self, id: &str) -> String {
        self.download_url_template
            .replace("{server}", self.server_url.trim_end_matches('/'))
            .replace("{id}", id)
    }
}

/// Get the default config file path
pub fn default_config_path() -> PathBuf {
    config_path_for("previewer.yaml")
}
