use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Tick period of the reset scheduler. Matches the minute resolution of the
/// schedule model: each slot is evaluated exactly once inside its firing
/// minute under normal operation.
pub const TICK_INTERVAL_SECS: u64 = 60;

/// Top-level config (resploot.toml + RESPLOOT_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResplootConfig {
    pub discord: Option<DiscordConfig>,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub reset: ResetConfig,
}

impl Default for ResplootConfig {
    fn default() -> Self {
        Self {
            discord: None,
            schedule: ScheduleConfig::default(),
            archive: ArchiveConfig::default(),
            reset: ResetConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub bot_token: String,
    /// Guild the bot manages. Channel lookups and slash-command registration
    /// are scoped to this guild.
    pub guild_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// IANA timezone name all schedule times are interpreted in. The host's
    /// local zone is deliberately irrelevant to scheduling.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Path of the persisted schedules JSON file.
    #[serde(default = "default_schedules_file")]
    pub file: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            file: default_schedules_file(),
        }
    }
}

impl ScheduleConfig {
    /// Resolve the configured timezone name to a [`chrono_tz::Tz`].
    pub fn resolve_timezone(&self) -> crate::error::Result<chrono_tz::Tz> {
        self.timezone
            .parse()
            .map_err(|_| crate::error::ResplootError::Timezone(self.timezone.clone()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Directory archive JSON files are written to. Attachments land in an
    /// `attachments` subdirectory beneath it.
    #[serde(default = "default_archive_dir")]
    pub dir: String,
    /// Optional long-lived channel pins are forwarded into before a reset.
    /// Created on first use when set.
    pub forward_channel: Option<String>,
    /// Overall HTTP request timeout for attachment downloads.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Per-attachment budget; shorter than the request timeout so one stuck
    /// download cannot consume the whole archival pass.
    #[serde(default = "default_attachment_timeout_secs")]
    pub attachment_timeout_secs: u64,
    /// Maximum concurrent attachment downloads within one archival pass.
    #[serde(default = "default_download_concurrency")]
    pub download_concurrency: usize,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            dir: default_archive_dir(),
            forward_channel: None,
            request_timeout_secs: default_request_timeout_secs(),
            attachment_timeout_secs: default_attachment_timeout_secs(),
            download_concurrency: default_download_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetConfig {
    /// Selective-delete batch size before the throttle pause is applied.
    #[serde(default = "default_delete_batch_size")]
    pub delete_batch_size: usize,
    /// Pause between deletion batches, to respect platform rate limits.
    #[serde(default = "default_delete_batch_pause_ms")]
    pub delete_batch_pause_ms: u64,
    /// How long the transient "reset complete" notice stays up.
    #[serde(default = "default_notice_ttl_secs")]
    pub notice_ttl_secs: u64,
    /// Repost and re-pin archived pins into the recreated channel.
    #[serde(default = "bool_true")]
    pub restore_pins: bool,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            delete_batch_size: default_delete_batch_size(),
            delete_batch_pause_ms: default_delete_batch_pause_ms(),
            notice_ttl_secs: default_notice_ttl_secs(),
            restore_pins: true,
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_timezone() -> String {
    "America/Los_Angeles".to_string()
}
fn default_schedules_file() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.resploot/schedules.json", home)
}
fn default_archive_dir() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.resploot/pins_data", home)
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_attachment_timeout_secs() -> u64 {
    20
}
fn default_download_concurrency() -> usize {
    4
}
fn default_delete_batch_size() -> usize {
    10
}
fn default_delete_batch_pause_ms() -> u64 {
    1000
}
fn default_notice_ttl_secs() -> u64 {
    30
}

impl ResplootConfig {
    /// Load config from a TOML file with RESPLOOT_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.resploot/resploot.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: ResplootConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("RESPLOOT_").split("_"))
            .extract()
            .map_err(|e| crate::error::ResplootError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.resploot/resploot.toml", home)
}
