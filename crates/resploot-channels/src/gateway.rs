//! Platform seam consumed by the reset logic.
//!
//! The reset strategies only speak in terms of this trait; the Discord
//! implementation lives in `resploot-discord` and tests use an in-memory
//! fake. Permission overwrites are deliberately absent from
//! [`ChannelProps`]: only the platform can express them, so copying them
//! across a recreation is the gateway's job, not the caller's.

use std::time::Duration;

use async_trait::async_trait;

use resploot_archive::PinRecord;
use resploot_core::ChannelProps;

use crate::error::GatewayResult;

/// A live channel on the platform: its id plus a snapshot of the properties
/// a recreation must carry over.
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    pub id: u64,
    pub props: ChannelProps,
}

#[async_trait]
pub trait ChannelGateway: Send + Sync {
    /// Look a channel up by name within the managed guild.
    async fn find_channel(&self, name: &str) -> GatewayResult<Option<ChannelHandle>>;

    /// Create a brand-new channel with the given properties.
    async fn create_channel(&self, props: &ChannelProps) -> GatewayResult<ChannelHandle>;

    /// Delete the channel and create a replacement copying name, category,
    /// position, topic, slow-mode and permission overwrites. When
    /// `category_override` is set, the replacement lands in that category
    /// instead of the original's.
    async fn recreate_channel(
        &self,
        channel: &ChannelHandle,
        category_override: Option<&str>,
    ) -> GatewayResult<ChannelHandle>;

    /// Snapshot the channel's pinned messages, in platform order.
    async fn pins(&self, channel: &ChannelHandle) -> GatewayResult<Vec<PinRecord>>;

    /// One page of message ids, newest-first, strictly older than `before`
    /// when it is set. An empty page ends the walk.
    async fn history_page(
        &self,
        channel: &ChannelHandle,
        before: Option<u64>,
        limit: u8,
    ) -> GatewayResult<Vec<u64>>;

    async fn delete_message(&self, channel: &ChannelHandle, message_id: u64) -> GatewayResult<()>;

    /// Post a notice that the platform removes again after `ttl`.
    async fn send_notice(
        &self,
        channel: &ChannelHandle,
        text: &str,
        ttl: Duration,
    ) -> GatewayResult<()>;

    /// Find the named channel or create it as a plain text channel. Used for
    /// the long-lived pin-forwarding channel.
    async fn ensure_channel(&self, name: &str) -> GatewayResult<ChannelHandle>;

    /// Repost one archived pin into a channel, re-pinning it when `repin` is
    /// set.
    async fn post_pin(
        &self,
        channel: &ChannelHandle,
        pin: &PinRecord,
        repin: bool,
    ) -> GatewayResult<()>;
}
