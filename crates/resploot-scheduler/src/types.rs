use std::collections::BTreeMap;

use resploot_core::ChannelKind;
use serde::{Deserialize, Serialize};

/// One configured daily fire time for one channel.
///
/// Identity is structural: channel name plus index in the channel's list.
/// `(hour, minute)` uniqueness is not enforced — duplicate slots are legal
/// and each fires independently under its own ledger key.
///
/// On-disk field names (`type`, `last_reset`) match the schedules file the
/// original deployment already has, so existing files keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    #[serde(rename = "type")]
    pub kind: ChannelKind,
    pub hour: u8,
    pub minute: u8,
    #[serde(default)]
    pub category: Option<String>,
    /// Dedupe ledger: the fire key of the most recent completed reset.
    /// `None` until the slot first fires; left untouched when a reset fails
    /// so the slot stays eligible for the next qualifying window.
    #[serde(default, rename = "last_reset")]
    pub last_fired: Option<String>,
}

impl ScheduleEntry {
    pub fn new(kind: ChannelKind, hour: u8, minute: u8, category: Option<String>) -> Self {
        Self {
            kind,
            hour,
            minute,
            category,
            last_fired: None,
        }
    }
}

/// Channel name → ordered schedule slots (creation order; index+1 is the
/// user-facing schedule number).
///
/// Invariant: a key present in the map always has a non-empty list. Removal
/// operations delete the key once the last entry is gone.
pub type ChannelSchedules = BTreeMap<String, Vec<ScheduleEntry>>;
