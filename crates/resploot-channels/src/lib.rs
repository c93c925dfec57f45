//! `resploot-channels` — reset strategy selection over an abstract platform
//! gateway.
//!
//! [`ChannelResetter`] implements the scheduler's executor seam. For text
//! channels it tries fast archive-and-recreate, falls back to slow selective
//! deletion, then to a forced recreate without archival; voice channels are
//! recreated directly and missing channels created fresh. The platform
//! itself is reached only through the [`ChannelGateway`] trait.

pub mod error;
pub mod gateway;
pub mod reset;

pub use error::{GatewayError, GatewayResult, ResetError, Result};
pub use gateway::{ChannelGateway, ChannelHandle};
pub use reset::ChannelResetter;
