//! Generic configuration I/O utilities
//!
//! YAML loading and saving for any serializable configuration type.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Load configuration from a YAML file
///
/// A missing file yields the default config. A file that exists but cannot be
/// read or parsed logs a warning and also yields the default config.
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        log::info!("[CONFIG] No config at {}, using defaults", path.display());
        return T::default();
    }

    match read_yaml(path) {
        Ok(config) => {
            log::info!("[CONFIG] Loaded {}", path.display());
            config
        }
        Err(e) => {
            log::warn!("[CONFIG] Ignoring {}: {:#}", path.display(), e);
            T::default()
        }
    }
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path).context("read failed")?;
    serde_yaml::from_str(&contents).context("invalid YAML")
}

/// Save configuration to a YAML file
///
/// Creates parent directories if they don't exist.
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
    }
    std::fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file {}", path.display()))?;

    log::info!("[CONFIG] Saved {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EmissionPolicy, PreviewConfig};

    #[test]
    fn test_load_nonexistent_returns_default() {
        let config: PreviewConfig = load_config(Path::new("/nonexistent/path/config.yaml"));
        assert_eq!(config, PreviewConfig::default());
    }

    #[test]
    fn test_invalid_yaml_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "chunk_size: [not, a, number").unwrap();

        let config: PreviewConfig = load_config(&path);
        assert_eq!(config, PreviewConfig::default());
    }

    #[test]
    fn test_roundtrip_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("preview.yaml");

        let config = PreviewConfig {
            read_chunk_size: 4096,
            emission: EmissionPolicy::EveryBytes(512 * 1024),
            ..PreviewConfig::default()
        };

        save_config(&config, &path).unwrap();
        let loaded: PreviewConfig = load_config(&path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.yaml");
        std::fs::write(&path, "read_chunk_size: 1024\n").unwrap();

        let loaded: PreviewConfig = load_config(&path);
        assert_eq!(loaded.read_chunk_size, 1024);
        assert_eq!(loaded.chunk_size, PreviewConfig::default().chunk_size);
    }

    #[test]
    fn test_http_section_keeps_read_poll_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("http.yaml");
        std::fs::write(&path, "http:\n  connect_timeout_secs: 5\n").unwrap();

        let loaded: PreviewConfig = load_config(&path);
        assert_eq!(loaded.http.connect_timeout_secs, 5);
        assert_eq!(loaded.http.read_poll_ms, 2000);
    }
}
