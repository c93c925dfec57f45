use std::sync::Arc;

use clap::Parser;
use serenity::http::Http;
use tracing::info;

use resploot_archive::ArchivePipeline;
use resploot_channels::ChannelResetter;
use resploot_core::config::ResplootConfig;
use resploot_discord::{BotContext, DiscordAdapter, DiscordGateway};
use resploot_scheduler::{ResetExecutor, ResetService, ScheduleStore, SchedulerEngine};

/// Discord channel reset bot: archives pins, recreates channels on a daily
/// per-channel schedule.
#[derive(Parser)]
#[command(name = "resploot", version)]
struct Args {
    /// Path to resploot.toml (default: ~/.resploot/resploot.toml)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // config: explicit path > RESPLOOT_CONFIG env > ~/.resploot/resploot.toml
    let args = Args::parse();
    let config_path = args.config.or_else(|| std::env::var("RESPLOOT_CONFIG").ok());
    let config = ResplootConfig::load(config_path.as_deref())?;

    let Some(discord_cfg) = config.discord.clone() else {
        anyhow::bail!("no [discord] config — set discord.bot_token and discord.guild_id");
    };

    let tz = config.schedule.resolve_timezone()?;
    info!(timezone = %tz, schedules = %config.schedule.file, "starting resploot");

    // Arc<Http> is Discord REST; it stays valid across gateway reconnects,
    // so reset work never depends on the WebSocket being up.
    let http = Arc::new(Http::new(&discord_cfg.bot_token));
    let gateway = Arc::new(DiscordGateway::new(Arc::clone(&http), discord_cfg.guild_id));

    let pipeline = ArchivePipeline::new(&config.archive, tz)?;
    let resetter = Arc::new(ChannelResetter::new(
        gateway,
        pipeline,
        config.reset.clone(),
        config.archive.forward_channel.clone(),
    ));

    let store = ScheduleStore::new(&config.schedule.file);
    let service = Arc::new(ResetService::new(
        store,
        Arc::clone(&resetter) as Arc<dyn ResetExecutor>,
        tz,
    ));

    let schedules = service.list().await;
    let slots: usize = schedules.values().map(Vec::len).sum();
    info!(channels = schedules.len(), slots, "schedules loaded");

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let engine = SchedulerEngine::new(Arc::clone(&service));
    tokio::spawn(engine.run(shutdown_rx));

    let ctx = Arc::new(BotContext { service, resetter });
    let adapter = DiscordAdapter::new(&discord_cfg, ctx);
    tokio::spawn(adapter.run());
    info!("Discord bot started");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    Ok(())
}
