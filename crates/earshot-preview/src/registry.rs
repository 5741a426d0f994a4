//! File references and previewer selection
//!
//! The host knows files either by server id or by an external link. This
//! module turns such a reference into a [`FileDescriptor`] with a resolved
//! fetch URL and asks the capability predicate whether this previewer should
//! handle it.

use std::path::Path;

use earshot_core::{AudioPreviewCapability, FileDescriptor, PreviewCapability};
use thiserror::Error;

use crate::config::PreviewerConfig;

/// Errors turning a file reference into a descriptor
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResolveError {
    #[error("File reference has neither an id nor a link")]
    NoLocation,

    #[error("No previewer for MIME type {0}")]
    Unsupported(String),
}

/// A file as the host knows it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    /// Server-side id
    pub id: Option<String>,
    /// External link or local path
    pub link: Option<String>,
    pub mime_type: String,
    pub size: u64,
}

impl FileRef {
    /// Reference to a file on the local disk; MIME type from the extension
    pub fn local(path: &Path) -> std::io::Result<Self> {
        let size = std::fs::metadata(path)?.len();
        Ok(Self {
            id: None,
            link: Some(path.to_string_lossy().into_owned()),
            mime_type: guess_mime_type(path).unwrap_or("application/octet-stream").to_string(),
            size,
        })
    }
}

/// Resolve the fetch URL: server download URL by id, else the link verbatim
pub fn resolve(file: &FileRef, config: &PreviewerConfig) -> Result<FileDescriptor, ResolveError> {
    let url = match (&file.id, &file.link) {
        (Some(id), _) => config.download_url(id),
        (None, Some(link)) => link.clone(),
        (None, None) => return Err(ResolveError::NoLocation),
    };

    Ok(FileDescriptor::new(
        file.id.clone(),
        file.mime_type.clone(),
        file.size,
        url,
    ))
}

/// MIME type for common audio file extensions
pub fn guess_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "mp3" => "audio/mpeg",
        "wav" | "wave" => "audio/wav",
        "ogg" | "oga" => "audio/ogg",
        "opus" => "audio/opus",
        "webm" => "audio/webm",
        "aac" => "audio/aac",
        "m4a" => "audio/x-m4a",
        "mp4" => "audio/mp4",
        "flac" => "audio/flac",
        "aif" | "aiff" => "audio/aiff",
        "ra" | "ram" => "audio/x-pn-realaudio",
        "au" | "snd" => "audio/basic",
        "wma" => "audio/x-ms-wma",
        _ => return None,
    };
    Some(mime)
}

/// Decides per file whether this previewer takes it
pub struct PreviewRegistry {
    capability: Box<dyn PreviewCapability>,
}

impl Default for PreviewRegistry {
    fn default() -> Self {
        Self::new(Box::new(AudioPreviewCapability))
    }
}

impl PreviewRegistry {
    pub fn new(capability: Box<dyn PreviewCapability>) -> Self {
        Self { capability }
    }

    /// Resolve `file` and check it can be previewed
    pub fn select(&self, file: &FileRef, config: &PreviewerConfig) -> Result<FileDescriptor, ResolveError> {
        let descriptor = resolve(file, config)?;
        if !self.capability.can_preview(&descriptor) {
            return Err(ResolveError::Unsupported(descriptor.mime_type));
        }
        log::info!(
            "[REGISTRY] Previewing {} as {}",
            descriptor.url,
            descriptor.mime_type
        );
        Ok(descriptor)
    }
}
