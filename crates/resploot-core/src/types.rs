use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The two channel kinds Resploot manages.
///
/// Voice channels carry no message history, so resets on them skip the pin
/// archival step entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Text,
    Voice,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChannelKind::Text => "text",
            ChannelKind::Voice => "voice",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "text" => Ok(ChannelKind::Text),
            "voice" => Ok(ChannelKind::Voice),
            other => Err(format!("unknown channel kind: {other}")),
        }
    }
}

/// Snapshot of channel properties copied across a delete-and-recreate cycle.
///
/// Permission overwrites are platform-specific and are carried opaquely by
/// the gateway implementation, not through this struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelProps {
    pub name: String,
    pub kind: ChannelKind,
    /// Category (parent) name, if the channel lives inside one.
    pub category: Option<String>,
    pub position: u16,
    pub topic: Option<String>,
    /// Slow-mode delay in seconds; 0 means disabled.
    pub slowmode_secs: u16,
}

/// Which reset path actually ran for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetStrategy {
    /// Pins archived, channel deleted and recreated. O(pins), not O(history).
    Fast,
    /// Selective deletion of non-pinned messages; channel identity preserved.
    Slow,
    /// Last-resort delete-and-recreate without archival.
    ForcedRecreate,
    /// Voice channel delete-and-recreate (no history to preserve).
    Recreate,
    /// The channel did not exist and was created fresh.
    CreatedMissing,
}

impl std::fmt::Display for ResetStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResetStrategy::Fast => "fast",
            ResetStrategy::Slow => "slow",
            ResetStrategy::ForcedRecreate => "forced-recreate",
            ResetStrategy::Recreate => "recreate",
            ResetStrategy::CreatedMissing => "created-missing",
        };
        write!(f, "{s}")
    }
}

/// Per-reset result summary: what ran, what was preserved, what failed.
///
/// Recoverable per-item failures (a message that could not be deleted, a pin
/// that could not be forwarded) are counted here instead of aborting the
/// surrounding reset.
#[derive(Debug, Clone, Default)]
pub struct ResetReport {
    pub strategy: Option<ResetStrategy>,
    pub pins_archived: usize,
    pub messages_deleted: usize,
    pub delete_failures: usize,
    pub forward_failures: usize,
    pub archive_path: Option<PathBuf>,
}

impl ResetReport {
    pub fn with_strategy(strategy: ResetStrategy) -> Self {
        Self {
            strategy: Some(strategy),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_kind_round_trips_through_str() {
        for kind in [ChannelKind::Text, ChannelKind::Voice] {
            let parsed: ChannelKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn channel_kind_rejects_unknown_tag() {
        assert!("stage".parse::<ChannelKind>().is_err());
    }

    #[test]
    fn channel_kind_serde_uses_lowercase_tags() {
        assert_eq!(
            serde_json::to_string(&ChannelKind::Voice).unwrap(),
            "\"voice\""
        );
        let kind: ChannelKind = serde_json::from_str("\"text\"").unwrap();
        assert_eq!(kind, ChannelKind::Text);
    }
}
