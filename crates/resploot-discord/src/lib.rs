//! `resploot-discord` — serenity adapter: gateway implementation, slash
//! command surface and event loop.

pub mod adapter;
pub mod commands;
pub mod context;
pub mod gateway;
pub mod handler;

pub use adapter::DiscordAdapter;
pub use context::BotContext;
pub use gateway::DiscordGateway;
