//! Preview session configuration
//!
//! Stored as YAML; every field has a default so partial files work.

use serde::{Deserialize, Serialize};

use crate::types::{CHUNK_SIZE, STREAMING_CHUNK_UNITS};

/// Transfer and snapshot settings for a preview session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Unit chunk size in bytes
    pub chunk_size: u64,
    /// Files of `chunk_size * streaming_chunk_units` bytes or more are streamed
    pub streaming_chunk_units: u64,
    /// Upper bound for a single incremental read from the transport
    pub read_chunk_size: usize,
    /// When the assembler hands snapshots to the renderer
    pub emission: EmissionPolicy,
    /// Overrides the renderer's own answer to "can you refine progressively?"
    /// `None` trusts the renderer.
    pub progressive_refinement: Option<bool>,
    /// HTTP transport settings
    pub http: HttpConfig,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            streaming_chunk_units: STREAMING_CHUNK_UNITS,
            read_chunk_size: 64 * 1024,
            emission: EmissionPolicy::default(),
            progressive_refinement: None,
            http: HttpConfig::default(),
        }
    }
}

impl PreviewConfig {
    /// Size in bytes at or above which a file is streamed
    pub fn streaming_threshold(&self) -> u64 {
        self.chunk_size.saturating_mul(self.streaming_chunk_units)
    }
}

/// Snapshot emission policy for the progressive assembler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionPolicy {
    /// One snapshot on the first chunk, one on the final chunk
    #[default]
    FirstAndFinal,
    /// As `FirstAndFinal`, plus a snapshot whenever at least this many new
    /// bytes arrived since the previous one
    EveryBytes(u64),
}

/// HTTP transport settings
///
/// Only connection setup is bounded. A body read that stalls is retried
/// every `read_poll_ms` until data arrives or the session is cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Socket read timeout in milliseconds, used as the cancellation poll
    /// interval. Response headers must start arriving within it.
    pub read_poll_ms: u64,
    /// Custom User-Agent header
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            read_poll_ms: 2000,
            user_agent: None,
        }
    }
}

/// Visual settings for the waveform surface
///
/// Passed to the renderer when it attaches; theming beyond this is the
/// host's business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformStyle {
    /// Colour of the unplayed waveform
    pub wave_color: String,
    /// Colour of the played portion
    pub progress_color: String,
    /// Surface height in pixels
    pub height: u32,
    /// Scale peaks so the loudest reaches full height
    pub normalize: bool,
    /// Redraw only the changed region on refinement
    pub partial_render: bool,
    /// Bar width in pixels
    pub bar_width: u32,
    /// Gap between bars in pixels
    pub bar_gap: u32,
    /// Bar corner radius in pixels
    pub bar_radius: u32,
}

impl Default for WaveformStyle {
    fn default() -> Self {
        Self {
            wave_color: "#4F4A85".to_string(),
            progress_color: "#383351".to_string(),
            height: 100,
            normalize: true,
            partial_render: true,
            bar_width: 2,
            bar_gap: 1,
            bar_radius: 2,
        }
    }
}

impl WaveformStyle {
    /// Number of bars that fit into a surface of the given width
    pub fn bar_count(&self, width: u32) -> usize {
        let pitch = (self.bar_width + self.bar_gap).max(1);
        (width / pitch) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threshold_is_two_units() {
        let config = PreviewConfig::default();
        assert_eq!(config.streaming_threshold(), 2 * 1024 * 1024);
        assert_eq!(config.emission, EmissionPolicy::FirstAndFinal);
    }

    #[test]
    fn test_emission_policy_yaml() {
        let policy: EmissionPolicy = serde_yaml::from_str("first_and_final").unwrap();
        assert_eq!(policy, EmissionPolicy::FirstAndFinal);

        let yaml = serde_yaml::to_string(&EmissionPolicy::EveryBytes(1024)).unwrap();
        let back: EmissionPolicy = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, EmissionPolicy::EveryBytes(1024));
    }

    #[test]
    fn test_bar_count_uses_width_plus_gap() {
        let style = WaveformStyle::default();
        assert_eq!(style.bar_count(300), 100);
        assert_eq!(style.bar_count(0), 0);
    }
}
