//! Serenity-backed implementation of the platform gateway.
//!
//! Uses `Arc<Http>` (Discord REST, not the gateway WebSocket) so reset work
//! keeps functioning across gateway reconnects.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serenity::builder::{
    CreateChannel, CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter, CreateMessage, GetMessages,
};
use serenity::http::Http;
use serenity::model::channel::{ChannelType, GuildChannel, Message};
use serenity::model::id::{ChannelId, GuildId, MessageId};
use tracing::{debug, warn};

use resploot_archive::{AttachmentRecord, PinAuthor, PinRecord, ReactionRecord};
use resploot_core::{ChannelKind, ChannelProps};

use resploot_channels::{ChannelGateway, ChannelHandle, GatewayError, GatewayResult};

/// REST-level Discord gateway scoped to one guild.
pub struct DiscordGateway {
    http: Arc<Http>,
    guild_id: GuildId,
}

impl DiscordGateway {
    pub fn new(http: Arc<Http>, guild_id: u64) -> Self {
        Self {
            http,
            guild_id: GuildId::new(guild_id),
        }
    }

    async fn guild_channels(&self) -> GatewayResult<HashMap<ChannelId, GuildChannel>> {
        self.guild_id
            .channels(&self.http)
            .await
            .map_err(|e| map_err(e, "guild channel list"))
    }

    fn handle_from(
        &self,
        channel: &GuildChannel,
        channels: &HashMap<ChannelId, GuildChannel>,
    ) -> ChannelHandle {
        let category = channel
            .parent_id
            .and_then(|parent| channels.get(&parent))
            .map(|parent| parent.name.clone());
        ChannelHandle {
            id: channel.id.get(),
            props: ChannelProps {
                name: channel.name.clone(),
                kind: kind_from(channel.kind),
                category,
                position: channel.position,
                topic: channel.topic.clone(),
                slowmode_secs: channel.rate_limit_per_user.unwrap_or(0),
            },
        }
    }

    fn category_id(
        &self,
        channels: &HashMap<ChannelId, GuildChannel>,
        name: &str,
    ) -> Option<ChannelId> {
        channels
            .values()
            .find(|c| c.kind == ChannelType::Category && c.name.eq_ignore_ascii_case(name))
            .map(|c| c.id)
    }
}

#[async_trait]
impl ChannelGateway for DiscordGateway {
    async fn find_channel(&self, name: &str) -> GatewayResult<Option<ChannelHandle>> {
        let channels = self.guild_channels().await?;
        Ok(channels
            .values()
            .find(|c| {
                c.name == name && matches!(c.kind, ChannelType::Text | ChannelType::Voice)
            })
            .map(|c| self.handle_from(c, &channels)))
    }

    async fn create_channel(&self, props: &ChannelProps) -> GatewayResult<ChannelHandle> {
        let channels = self.guild_channels().await?;

        let mut builder = CreateChannel::new(&props.name)
            .kind(kind_to(props.kind))
            .position(props.position);
        if let Some(topic) = &props.topic {
            builder = builder.topic(topic);
        }
        if props.slowmode_secs > 0 {
            builder = builder.rate_limit_per_user(props.slowmode_secs);
        }
        if let Some(category) = &props.category {
            match self.category_id(&channels, category) {
                Some(id) => builder = builder.category(id),
                None => warn!(%category, "category not found, creating at top level"),
            }
        }

        let created = self
            .guild_id
            .create_channel(&self.http, builder)
            .await
            .map_err(|e| map_err(e, "channel create"))?;
        Ok(self.handle_from(&created, &channels))
    }

    async fn recreate_channel(
        &self,
        channel: &ChannelHandle,
        category_override: Option<&str>,
    ) -> GatewayResult<ChannelHandle> {
        let channels = self.guild_channels().await?;
        let channel_id = ChannelId::new(channel.id);
        let current = channels
            .get(&channel_id)
            .ok_or_else(|| GatewayError::NotFound(channel.props.name.clone()))?;

        let parent = match category_override {
            Some(name) => {
                let id = self.category_id(&channels, name);
                if id.is_none() {
                    warn!(category = %name, "override category not found, keeping original");
                }
                id.or(current.parent_id)
            }
            None => current.parent_id,
        };

        let mut builder = CreateChannel::new(current.name.clone())
            .kind(current.kind)
            .position(current.position)
            .permissions(current.permission_overwrites.clone());
        if let Some(topic) = &current.topic {
            builder = builder.topic(topic);
        }
        if let Some(rate) = current.rate_limit_per_user {
            if rate > 0 {
                builder = builder.rate_limit_per_user(rate);
            }
        }
        if let Some(parent) = parent {
            builder = builder.category(parent);
        }

        channel_id
            .delete(&self.http)
            .await
            .map_err(|e| map_err(e, "channel delete"))?;
        let created = self
            .guild_id
            .create_channel(&self.http, builder)
            .await
            .map_err(|e| map_err(e, "channel create"))?;
        Ok(self.handle_from(&created, &channels))
    }

    async fn pins(&self, channel: &ChannelHandle) -> GatewayResult<Vec<PinRecord>> {
        let messages = ChannelId::new(channel.id)
            .pins(&self.http)
            .await
            .map_err(|e| map_err(e, "pin list"))?;
        Ok(messages.iter().map(pin_record).collect())
    }

    async fn history_page(
        &self,
        channel: &ChannelHandle,
        before: Option<u64>,
        limit: u8,
    ) -> GatewayResult<Vec<u64>> {
        let mut request = GetMessages::new().limit(limit);
        if let Some(before) = before {
            request = request.before(MessageId::new(before));
        }
        let messages = ChannelId::new(channel.id)
            .messages(&self.http, request)
            .await
            .map_err(|e| map_err(e, "history page"))?;
        Ok(messages.iter().map(|m| m.id.get()).collect())
    }

    async fn delete_message(&self, channel: &ChannelHandle, message_id: u64) -> GatewayResult<()> {
        ChannelId::new(channel.id)
            .delete_message(&self.http, MessageId::new(message_id))
            .await
            .map_err(|e| map_err(e, "message delete"))
    }

    async fn send_notice(
        &self,
        channel: &ChannelHandle,
        text: &str,
        ttl: Duration,
    ) -> GatewayResult<()> {
        let channel_id = ChannelId::new(channel.id);
        let notice = channel_id
            .say(&self.http, text)
            .await
            .map_err(|e| map_err(e, "notice send"))?;

        let http = Arc::clone(&self.http);
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Err(e) = channel_id.delete_message(&http, notice.id).await {
                debug!(error = %e, "transient notice already gone");
            }
        });
        Ok(())
    }

    async fn ensure_channel(&self, name: &str) -> GatewayResult<ChannelHandle> {
        if let Some(handle) = self.find_channel(name).await? {
            return Ok(handle);
        }
        self.create_channel(&ChannelProps {
            name: name.to_string(),
            kind: ChannelKind::Text,
            category: None,
            position: 0,
            topic: Some("Archived pinned messages".to_string()),
            slowmode_secs: 0,
        })
        .await
    }

    async fn post_pin(
        &self,
        channel: &ChannelHandle,
        pin: &PinRecord,
        repin: bool,
    ) -> GatewayResult<()> {
        let channel_id = ChannelId::new(channel.id);

        let mut author = CreateEmbedAuthor::new(&pin.author.name);
        if let Some(avatar) = &pin.author.avatar_url {
            author = author.icon_url(avatar);
        }
        let mut embed = CreateEmbed::new()
            .author(author)
            .colour(0x0099ff)
            .footer(CreateEmbedFooter::new(format!(
                "📌 Originally pinned · {}",
                pin.created_at
            )));
        if !pin.content.is_empty() {
            embed = embed.description(&pin.content);
        }
        if !pin.attachments.is_empty() {
            let links = pin
                .attachments
                .iter()
                .map(|a| a.url.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            embed = embed.field("Attachments", links, false);
        }

        let posted = channel_id
            .send_message(&self.http, CreateMessage::new().embed(embed))
            .await
            .map_err(|e| map_err(e, "pin post"))?;
        if repin {
            channel_id
                .pin(&self.http, posted.id)
                .await
                .map_err(|e| map_err(e, "pin"))?;
        }
        Ok(())
    }
}

fn kind_from(kind: ChannelType) -> ChannelKind {
    match kind {
        ChannelType::Voice => ChannelKind::Voice,
        _ => ChannelKind::Text,
    }
}

fn kind_to(kind: ChannelKind) -> ChannelType {
    match kind {
        ChannelKind::Text => ChannelType::Text,
        ChannelKind::Voice => ChannelType::Voice,
    }
}

/// Snapshot one pinned message into its archive record.
fn pin_record(msg: &Message) -> PinRecord {
    PinRecord {
        id: msg.id.get(),
        author: PinAuthor {
            name: msg
                .author
                .global_name
                .clone()
                .unwrap_or_else(|| msg.author.name.clone()),
            username: msg.author.tag(),
            id: msg.author.id.get(),
            avatar_url: msg.author.avatar_url(),
        },
        content: msg.content.clone(),
        created_at: msg.timestamp.to_string(),
        jump_url: msg.link(),
        attachments: msg
            .attachments
            .iter()
            .map(|a| {
                AttachmentRecord::new(
                    a.filename.clone(),
                    a.url.clone(),
                    u64::from(a.size),
                    a.content_type.clone(),
                )
            })
            .collect(),
        embeds: msg
            .embeds
            .iter()
            .filter_map(|e| serde_json::to_value(e).ok())
            .collect(),
        reactions: msg
            .reactions
            .iter()
            .map(|r| ReactionRecord {
                emoji: r.reaction_type.to_string(),
                count: r.count,
            })
            .collect(),
    }
}

/// Fold serenity errors into the gateway taxonomy the reset logic cares
/// about.
fn map_err(e: serenity::Error, what: &str) -> GatewayError {
    if let serenity::Error::Http(serenity::http::HttpError::UnsuccessfulRequest(ref resp)) = e {
        match resp.status_code.as_u16() {
            403 => return GatewayError::PermissionDenied(what.to_string()),
            404 => return GatewayError::NotFound(what.to_string()),
            429 => return GatewayError::RateLimited,
            _ => {}
        }
    }
    GatewayError::Platform(format!("{what}: {e}"))
}
