//! Path utilities for earshot configuration files

use std::path::PathBuf;

/// Get the default configuration directory
///
/// Returns: `~/.config/earshot` (or the platform equivalent)
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("earshot")
}

/// Get the default config file path for a given file name
///
/// Returns: `~/.config/earshot/{filename}`
pub fn default_config_path(filename: &str) -> PathBuf {
    default_config_dir().join(filename)
}
