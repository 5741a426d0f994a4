//! Configuration for earshot previews
//!
//! - Generic YAML config loading/saving usable by any host
//! - Transfer and snapshot emission settings ([`PreviewConfig`])
//! - Waveform surface styling ([`WaveformStyle`])
//!
//! # Usage
//!
//! ```ignore
//! use earshot_core::config::{load_config, save_config, default_config_path, PreviewConfig};
//!
//! let path = default_config_path("config.yaml");
//! let config: PreviewConfig = load_config(&path);
//! save_config(&config, &path)?;
//! ```

mod io;
mod paths;
mod preview;

pub use io::{load_config, save_config};
pub use paths::{default_config_dir, default_config_path};
pub use preview::{EmissionPolicy, HttpConfig, PreviewConfig, WaveformStyle};
