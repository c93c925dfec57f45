//! Discord slash commands — `/ping`, `/schedule_reset`, `/list_schedules`,
//! `/remove_schedule`, `/reset_now`, `/next_reset`, `/resploot-clear`,
//! `/help`.
//!
//! Registration happens in `ready()`, scoped to the managed guild.
//! Interactions are dispatched from `interaction_create` in the event
//! handler.

use std::sync::Arc;

use serenity::builder::{
    CreateCommand, CreateCommandOption, CreateEmbed, CreateInteractionResponse,
    CreateInteractionResponseMessage, EditInteractionResponse,
};
use serenity::model::application::{CommandInteraction, CommandOptionType};
use serenity::model::channel::Channel;
use serenity::model::id::GuildId;
use serenity::prelude::Context;
use tracing::{info, warn};

use resploot_core::ChannelKind;
use resploot_scheduler::{ScheduleEntry, SchedulerError};

use crate::context::BotContext;

/// Register the command set on the managed guild. Call from `ready()`.
pub async fn register_commands(ctx: &Context, guild_id: GuildId) {
    let commands = vec![
        CreateCommand::new("ping").description("Test if the bot is online"),
        CreateCommand::new("schedule_reset")
            .description("Schedule a daily reset for a channel")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "channel_name",
                    "Name of the channel to reset (without #)",
                )
                .required(true),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "channel_type",
                    "Type of channel",
                )
                .add_string_choice("Text Channel", "text")
                .add_string_choice("Voice Channel", "voice")
                .required(true),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "time",
                    "Time in HH:MM format (e.g., 10:42, 04:30)",
                )
                .required(true),
            )
            .add_option(CreateCommandOption::new(
                CommandOptionType::String,
                "category",
                "Category to place the channel in (optional)",
            )),
        CreateCommand::new("list_schedules").description("Show all scheduled channel resets"),
        CreateCommand::new("remove_schedule")
            .description("Remove scheduled resets for a channel")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "channel_name",
                    "Name of the channel to remove from schedule",
                )
                .required(true),
            )
            .add_option(CreateCommandOption::new(
                CommandOptionType::Integer,
                "schedule_number",
                "Schedule number to remove (leave empty to remove all)",
            )),
        CreateCommand::new("reset_now")
            .description("Manually trigger a channel reset")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "channel_name",
                    "Name of the channel to reset",
                )
                .required(true),
            ),
        CreateCommand::new("next_reset")
            .description("Show when the next reset will occur")
            .add_option(CreateCommandOption::new(
                CommandOptionType::String,
                "channel_name",
                "Name of specific channel (optional)",
            )),
        CreateCommand::new("resploot-clear")
            .description("Clear all messages in current channel (preserves pinned messages)")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "confirm",
                    "Type 'yes' to confirm deletion of all messages in this channel",
                )
                .required(true),
            ),
        CreateCommand::new("help").description("Show help for all commands"),
    ];

    match guild_id.set_commands(&ctx.http, commands).await {
        Ok(cmds) => info!(guild = %guild_id, count = cmds.len(), "registered guild slash commands"),
        Err(e) => warn!(guild = %guild_id, error = %e, "failed to register guild commands"),
    }
}

/// Dispatch a slash command interaction to the appropriate handler.
pub async fn handle_interaction(app: &Arc<BotContext>, ctx: &Context, command: &CommandInteraction) {
    let result = match command.data.name.as_str() {
        "ping" => handle_ping(ctx, command).await,
        "schedule_reset" => handle_schedule_reset(app, ctx, command).await,
        "list_schedules" => handle_list_schedules(app, ctx, command).await,
        "remove_schedule" => handle_remove_schedule(app, ctx, command).await,
        "reset_now" => handle_reset_now(app, ctx, command).await,
        "next_reset" => handle_next_reset(app, ctx, command).await,
        "resploot-clear" => handle_clear(app, ctx, command).await,
        "help" => handle_help(ctx, command).await,
        _ => {
            respond_ephemeral(ctx, command, "Unknown command.").await;
            Ok(())
        }
    };

    if let Err(e) = result {
        warn!(command = %command.data.name, error = %e, "slash command error");
    }
}

fn option_str<'a>(command: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    command
        .data
        .options
        .iter()
        .find(|o| o.name == name)
        .and_then(|o| o.value.as_str())
}

fn option_int(command: &CommandInteraction, name: &str) -> Option<i64> {
    command
        .data
        .options
        .iter()
        .find(|o| o.name == name)
        .and_then(|o| o.value.as_i64())
}

/// `HH:MM` or a bare hour.
fn parse_time(time: &str) -> Option<(u8, u8)> {
    match time.split_once(':') {
        Some((h, m)) => Some((h.trim().parse().ok()?, m.trim().parse().ok()?)),
        None => Some((time.trim().parse().ok()?, 0)),
    }
}

async fn handle_ping(
    ctx: &Context,
    command: &CommandInteraction,
) -> Result<(), serenity::Error> {
    respond(ctx, command, "🏓 Pong! Bot is online and ready!").await
}

/// `/schedule_reset channel_name channel_type time [category]`
async fn handle_schedule_reset(
    app: &Arc<BotContext>,
    ctx: &Context,
    command: &CommandInteraction,
) -> Result<(), serenity::Error> {
    let channel_name = option_str(command, "channel_name").unwrap_or("");
    let channel_type = option_str(command, "channel_type").unwrap_or("text");
    let time = option_str(command, "time").unwrap_or("");
    let category = option_str(command, "category").map(String::from);

    let Some((hour, minute)) = parse_time(time) else {
        respond_ephemeral(
            ctx,
            command,
            "❌ Invalid time format. Use HH:MM (e.g., 10:42 or 04:30)",
        )
        .await;
        return Ok(());
    };
    let kind: ChannelKind = channel_type.parse().unwrap_or(ChannelKind::Text);

    match app
        .service
        .add_schedule(channel_name, kind, hour, minute, category.clone())
        .await
    {
        Ok(number) => {
            let category_text = category
                .map(|c| format!(" in category '{c}'"))
                .unwrap_or_default();
            let msg = format!(
                "✅ Scheduled daily reset #{number} for **{}** ({kind}){category_text} at **{hour:02}:{minute:02}** {}",
                channel_name.trim_start_matches('#'),
                app.service.timezone(),
            );
            respond(ctx, command, &msg).await
        }
        Err(SchedulerError::InvalidTime { .. }) => {
            respond_ephemeral(ctx, command, "❌ Hour must be 0-23 and minute 0-59").await;
            Ok(())
        }
        Err(e) => {
            respond_ephemeral(ctx, command, &format!("❌ Could not save schedule: {e}")).await;
            Ok(())
        }
    }
}

/// `/list_schedules`
async fn handle_list_schedules(
    app: &Arc<BotContext>,
    ctx: &Context,
    command: &CommandInteraction,
) -> Result<(), serenity::Error> {
    let schedules = app.service.list().await;
    if schedules.is_empty() {
        respond_ephemeral(
            ctx,
            command,
            "📅 No scheduled resets configured yet. Use `/schedule_reset` to add some!",
        )
        .await;
        return Ok(());
    }

    let tz = app.service.timezone();
    let mut embed = CreateEmbed::new()
        .title("📅 Scheduled Channel Resets")
        .colour(0x00ff00);
    for (channel, slots) in &schedules {
        let mut lines = Vec::with_capacity(slots.len());
        for (i, slot) in slots.iter().enumerate() {
            let last = slot.last_fired.as_deref().unwrap_or("Never");
            lines.push(format!(
                "{}. **{:02}:{:02}** {tz} ({}) — last reset: {last}",
                i + 1,
                slot.hour,
                slot.minute,
                slot.kind,
            ));
        }
        embed = embed.field(format!("#{channel}"), lines.join("\n"), true);
    }

    respond_embed(ctx, command, embed, false).await
}

/// `/remove_schedule channel_name [schedule_number]`
async fn handle_remove_schedule(
    app: &Arc<BotContext>,
    ctx: &Context,
    command: &CommandInteraction,
) -> Result<(), serenity::Error> {
    let channel_name = option_str(command, "channel_name").unwrap_or("");
    let display = channel_name.trim_start_matches('#');

    match option_int(command, "schedule_number") {
        None => match app.service.remove_all(channel_name).await {
            Ok(count) => {
                let msg =
                    format!("✅ Removed {count} scheduled reset(s) for **{display}**");
                respond(ctx, command, &msg).await
            }
            Err(e) => {
                respond_ephemeral(ctx, command, &format!("❌ {e}")).await;
                Ok(())
            }
        },
        Some(number) => {
            let number = usize::try_from(number).unwrap_or(0);
            match app.service.remove_one(channel_name, number).await {
                Ok(removed) => {
                    let remaining = app
                        .service
                        .list()
                        .await
                        .get(display)
                        .map(Vec::len)
                        .unwrap_or(0);
                    let msg = format!(
                        "✅ Removed schedule #{number} ({:02}:{:02}) for **{display}**. {remaining} schedule(s) remaining.",
                        removed.hour, removed.minute,
                    );
                    respond(ctx, command, &msg).await
                }
                Err(e) => {
                    respond_ephemeral(ctx, command, &format!("❌ {e}")).await;
                    Ok(())
                }
            }
        }
    }
}

/// `/reset_now channel_name` — manual out-of-band reset with a synchronous
/// success/failure report to the requester.
async fn handle_reset_now(
    app: &Arc<BotContext>,
    ctx: &Context,
    command: &CommandInteraction,
) -> Result<(), serenity::Error> {
    let channel_name = option_str(command, "channel_name").unwrap_or("");
    let channel_display = channel_name.trim_start_matches('#').to_string();

    let schedules = app.service.list().await;
    if !schedules.contains_key(&channel_display) {
        let available = schedules
            .keys()
            .map(|name| format!("#{name}"))
            .collect::<Vec<_>>()
            .join(", ");
        respond_ephemeral(
            ctx,
            command,
            &format!("❌ **{channel_display}** is not scheduled. Available: {available}"),
        )
        .await;
        return Ok(());
    }

    respond(
        ctx,
        command,
        &format!("🔄 Triggering manual reset for **{channel_display}**..."),
    )
    .await?;

    let content = match app.service.trigger_manual(channel_name).await {
        Ok(report) => {
            info!(channel = %channel_display, user = %command.user.name, "manual reset triggered");
            let strategy = report
                .strategy
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            format!(
                "✅ **{channel_display}** has been reset successfully! ({strategy}, {} pin(s) preserved)",
                report.pins_archived
            )
        }
        Err(e) => format!("❌ Error during reset: {e}"),
    };
    command
        .edit_response(&ctx.http, EditInteractionResponse::new().content(content))
        .await?;
    Ok(())
}

/// `/next_reset [channel_name]`
async fn handle_next_reset(
    app: &Arc<BotContext>,
    ctx: &Context,
    command: &CommandInteraction,
) -> Result<(), serenity::Error> {
    match option_str(command, "channel_name") {
        Some(channel_name) => {
            let display = channel_name.trim_start_matches('#');
            match app.service.next_fire_times(Some(channel_name)).await {
                Ok(fires) => {
                    // Soonest slot first.
                    let Some(next) = fires.first() else {
                        respond_ephemeral(ctx, command, &format!("❌ **{display}** is not scheduled.")).await;
                        return Ok(());
                    };
                    let msg = format!(
                        "⏰ Next reset for **{display}**: {}",
                        next.at.format("%Y-%m-%d %H:%M:%S %Z")
                    );
                    respond(ctx, command, &msg).await
                }
                Err(_) => {
                    respond_ephemeral(
                        ctx,
                        command,
                        &format!("❌ **{display}** is not scheduled."),
                    )
                    .await;
                    Ok(())
                }
            }
        }
        None => {
            let fires = app.service.next_fire_times(None).await.unwrap_or_default();
            if fires.is_empty() {
                respond_ephemeral(ctx, command, "📅 No scheduled resets configured.").await;
                return Ok(());
            }
            let mut embed = CreateEmbed::new().title("⏰ Next Reset Times").colour(0x0099ff);
            for fire in &fires {
                embed = embed.field(
                    format!("#{}", fire.channel),
                    fire.at.format("%m/%d %H:%M").to_string(),
                    true,
                );
            }
            respond_embed(ctx, command, embed, false).await
        }
    }
}

/// `/resploot-clear confirm:yes` — reset the invoking channel, preserving
/// pins, without touching the schedule ledger.
async fn handle_clear(
    app: &Arc<BotContext>,
    ctx: &Context,
    command: &CommandInteraction,
) -> Result<(), serenity::Error> {
    let confirm = option_str(command, "confirm").unwrap_or("");
    if !confirm.eq_ignore_ascii_case("yes") {
        respond_ephemeral(
            ctx,
            command,
            "⚠️ **Are you sure?** This will delete ALL messages in this channel!\n\
             To confirm, use: `/resploot-clear confirm:yes`",
        )
        .await;
        return Ok(());
    }

    let can_manage = command
        .member
        .as_ref()
        .and_then(|m| m.permissions)
        .map(|p| p.manage_messages())
        .unwrap_or(false);
    if !can_manage {
        respond_ephemeral(
            ctx,
            command,
            "❌ You need 'Manage Messages' permission to use this command.",
        )
        .await;
        return Ok(());
    }

    let channel_name = match command.channel_id.to_channel(&ctx.http).await {
        Ok(Channel::Guild(channel)) => channel.name,
        _ => {
            respond_ephemeral(ctx, command, "❌ This command only works in a guild channel.").await;
            return Ok(());
        }
    };

    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content("🧹 Clearing this channel and preserving pinned messages...")
                    .ephemeral(true),
            ),
        )
        .await?;

    let entry = ScheduleEntry::new(ChannelKind::Text, 0, 0, None);
    let content = match app.resetter.reset(&channel_name, &entry).await {
        Ok(report) => {
            info!(channel = %channel_name, user = %command.user.name, "channel cleared");
            format!(
                "✅ **{channel_name}** cleared. 📌 {} pinned message(s) preserved.",
                report.pins_archived
            )
        }
        Err(e) => format!("❌ Error clearing channel: {e}"),
    };
    command
        .edit_response(&ctx.http, EditInteractionResponse::new().content(content))
        .await?;
    Ok(())
}

async fn handle_help(
    ctx: &Context,
    command: &CommandInteraction,
) -> Result<(), serenity::Error> {
    let embed = CreateEmbed::new()
        .title("🔄 Channel Reset Bot - Slash Commands")
        .colour(0x00ff00)
        .field(
            "/schedule_reset",
            "Schedule a daily reset for a channel\n\
             **Example:** `/schedule_reset daily-chat text 10:42`\n\
             **With category:** Add category name in the category field",
            false,
        )
        .field(
            "Other Commands",
            "`/list_schedules` - Show all scheduled resets\n\
             `/remove_schedule` - Remove all schedules, or one by number\n\
             `/reset_now` - Manual reset\n\
             `/next_reset` - Show next reset times\n\
             `/resploot-clear confirm:yes` - Clear ALL messages (preserves pinned)\n\
             `/ping` - Test if bot is online",
            false,
        )
        .field(
            "Time Format",
            "Use 24-hour format: `04:30`, `10:42`, `23:30`",
            false,
        );

    respond_embed(ctx, command, embed, true).await
}

async fn respond(
    ctx: &Context,
    command: &CommandInteraction,
    content: &str,
) -> Result<(), serenity::Error> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().content(content),
            ),
        )
        .await
}

async fn respond_embed(
    ctx: &Context,
    command: &CommandInteraction,
    embed: CreateEmbed,
    ephemeral: bool,
) -> Result<(), serenity::Error> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .embed(embed)
                    .ephemeral(ephemeral),
            ),
        )
        .await
}

/// Send an ephemeral response to a slash command (only visible to the invoker).
async fn respond_ephemeral(ctx: &Context, command: &CommandInteraction, content: &str) {
    let _ = command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_parsing_accepts_colon_and_bare_hour() {
        assert_eq!(parse_time("10:42"), Some((10, 42)));
        assert_eq!(parse_time("04:30"), Some((4, 30)));
        assert_eq!(parse_time("7"), Some((7, 0)));
        assert_eq!(parse_time("ten:30"), None);
        assert_eq!(parse_time(""), None);
    }
}
