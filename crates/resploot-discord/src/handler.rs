use std::sync::Arc;

use serenity::async_trait;
use serenity::model::application::Interaction;
use serenity::model::gateway::Ready;
use serenity::model::id::GuildId;
use serenity::prelude::{Context, EventHandler};
use tracing::info;

use crate::commands;
use crate::context::BotContext;

/// Serenity event handler wired to the reset service.
pub struct ResplootHandler {
    pub ctx: Arc<BotContext>,
    pub guild_id: GuildId,
}

#[async_trait]
impl EventHandler for ResplootHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(name = %ready.user.name, guild = %self.guild_id, "Discord bot connected");
        commands::register_commands(&ctx, self.guild_id).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            commands::handle_interaction(&self.ctx, &ctx, &command).await;
        }
    }
}
