use thiserror::Error;

/// Errors surfaced by a platform gateway implementation.
///
/// The taxonomy matters to the reset logic: `NotFound` and
/// `PermissionDenied` on an individual message delete are swallowed and
/// counted, while channel-level failures propagate through the strategy
/// fallback chain.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("rate limited")]
    RateLimited,

    #[error("platform error: {0}")]
    Platform(String),
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Errors from a channel reset after every applicable strategy has been
/// exhausted.
#[derive(Debug, Error)]
pub enum ResetError {
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("archive error: {0}")]
    Archive(#[from] resploot_archive::ArchiveError),
}

pub type Result<T> = std::result::Result<T, ResetError>;
