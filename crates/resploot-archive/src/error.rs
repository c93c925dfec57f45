use thiserror::Error;

/// Errors produced by the archival pipeline. Attachment download failures are
/// not represented here: they are recorded on the [`crate::AttachmentRecord`]
/// itself and never abort an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
