//! `resploot-core` — shared config, error type and channel domain types.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ResplootConfig, TICK_INTERVAL_SECS};
pub use error::{ResplootError, Result};
pub use types::{ChannelKind, ChannelProps, ResetReport, ResetStrategy};
