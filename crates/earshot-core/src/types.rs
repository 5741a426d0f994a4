//! Common types for Earshot
//!
//! File descriptors, transfer size constants and the capability query a host
//! uses to decide whether a file should be handed to the previewer.

/// Unit chunk size in bytes (1 MiB)
pub const CHUNK_SIZE: u64 = 1024 * 1024;

/// Number of unit chunks at which streaming replaces a single-shot fetch
pub const STREAMING_CHUNK_UNITS: u64 = 2;

/// Files of this size or larger are streamed (2 MiB)
pub const STREAMING_THRESHOLD: u64 = CHUNK_SIZE * STREAMING_CHUNK_UNITS;

/// MIME types the previewer accepts
pub const SUPPORTED_MIME_TYPES: [&str; 20] = [
    "audio/mpeg",
    "audio/mp3",
    "audio/wav",
    "audio/wave",
    "audio/x-wav",
    "audio/vnd.wave",
    "audio/ogg",
    "audio/vorbis",
    "audio/opus",
    "audio/webm",
    "audio/aac",
    "audio/mp4",
    "audio/x-m4a",
    "audio/flac",
    "audio/x-flac",
    "audio/x-aiff",
    "audio/aiff",
    "audio/x-pn-realaudio",
    "audio/basic",
    "audio/x-ms-wma",
];

/// Whether a file with this MIME type can be previewed
pub fn can_preview(mime_type: &str) -> bool {
    SUPPORTED_MIME_TYPES.contains(&mime_type)
}

/// Capability query answered by a previewer
///
/// Hosts keep one of these per registered previewer and ask it about each
/// file, without knowing anything about how the previewer works.
pub trait PreviewCapability {
    /// Returns true if this previewer wants to handle the file
    fn can_preview(&self, descriptor: &FileDescriptor) -> bool;
}

/// The stock audio capability: matches on [`SUPPORTED_MIME_TYPES`]
#[derive(Debug, Clone, Copy, Default)]
pub struct AudioPreviewCapability;

impl PreviewCapability for AudioPreviewCapability {
    fn can_preview(&self, descriptor: &FileDescriptor) -> bool {
        descriptor.is_previewable()
    }
}

/// Identifies one audio asset for one preview session
///
/// Immutable once a session has started. `size` drives the choice between a
/// single-shot fetch and streaming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Server-side identifier; `None` for externally linked files
    pub id: Option<String>,
    /// MIME type reported by the host
    pub mime_type: String,
    /// Size in bytes as reported by the host
    pub size: u64,
    /// Resolved URL (or local path) to fetch the bytes from
    pub url: String,
}

impl FileDescriptor {
    /// Create a descriptor for a file
    pub fn new(
        id: Option<String>,
        mime_type: impl Into<String>,
        size: u64,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id,
            mime_type: mime_type.into(),
            size,
            url: url.into(),
        }
    }

    /// True if the file is hosted elsewhere and only known by its link
    pub fn is_external(&self) -> bool {
        self.id.is_none()
    }

    /// True if the MIME type is one the previewer supports
    pub fn is_previewable(&self) -> bool {
        can_preview(&self.mime_type)
    }
}
