use thiserror::Error;

/// Errors that can occur within the scheduling subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Hour or minute outside the valid daily range.
    #[error("Invalid time: {hour:02}:{minute:02} (hour 0-23, minute 0-59)")]
    InvalidTime { hour: u8, minute: u8 },

    /// No schedules exist for the named channel.
    #[error("Channel not scheduled: {name}")]
    ChannelNotScheduled { name: String },

    /// Schedule number out of range for the channel (1-based).
    #[error("Invalid schedule number {index}: channel has {len} schedule(s)")]
    InvalidIndex { index: usize, len: usize },

    /// The injected reset executor reported a failure.
    #[error("Reset failed: {0}")]
    Reset(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
