use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::types::{ChannelSchedules, ScheduleEntry};

/// Durable channel → schedule-slots mapping backed by a single JSON file.
///
/// The file has no schema version; loading is tolerant instead: a missing or
/// malformed file yields an empty map, and per-channel values in either the
/// current list shape or the legacy single-object shape are accepted. The
/// legacy shape is upgraded on load and disappears on the next save.
pub struct ScheduleStore {
    path: PathBuf,
}

/// Accepted on-disk shapes for one channel's value. Normalized to a list
/// immediately; this union never leaves the load step.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredSchedules {
    Many(Vec<ScheduleEntry>),
    One(ScheduleEntry),
}

impl ScheduleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all schedules. Never fatal: missing file, unreadable JSON and
    /// unrecognized per-channel shapes all degrade to "no schedules" with a
    /// diagnostic.
    pub fn load(&self) -> ChannelSchedules {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no schedules file found, starting empty");
                return ChannelSchedules::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "schedules file unreadable, starting empty");
                return ChannelSchedules::new();
            }
        };

        let channels: BTreeMap<String, serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(channels) => channels,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "invalid schedules file, starting empty");
                return ChannelSchedules::new();
            }
        };

        let mut schedules = ChannelSchedules::new();
        for (channel, value) in channels {
            match serde_json::from_value::<StoredSchedules>(value) {
                Ok(StoredSchedules::Many(list)) if list.is_empty() => {
                    warn!(%channel, "skipping empty schedule list");
                }
                Ok(StoredSchedules::Many(list)) => {
                    schedules.insert(channel, list);
                }
                Ok(StoredSchedules::One(entry)) => {
                    // Legacy single-schedule-per-channel format.
                    schedules.insert(channel, vec![entry]);
                }
                Err(e) => {
                    warn!(%channel, error = %e, "skipping invalid schedule data");
                }
            }
        }

        let total: usize = schedules.values().map(Vec::len).sum();
        info!(
            schedules = total,
            channels = schedules.len(),
            "loaded scheduled resets"
        );
        schedules
    }

    /// Persist all schedules, pretty-printed for human inspection. Called
    /// synchronously after every mutation so a restart loses at most the
    /// in-flight operation.
    pub fn save(&self, schedules: &ChannelSchedules) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(schedules)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resploot_core::ChannelKind;

    fn store_in(dir: &tempfile::TempDir) -> ScheduleStore {
        ScheduleStore::new(dir.path().join("schedules.json"))
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store_in(&dir).load().is_empty());
    }

    #[test]
    fn malformed_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn save_and_reload_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut schedules = ChannelSchedules::new();
        schedules.insert(
            "daily-chat".to_string(),
            vec![
                ScheduleEntry::new(ChannelKind::Text, 4, 30, None),
                ScheduleEntry::new(ChannelKind::Text, 16, 0, Some("General".into())),
            ],
        );
        store.save(&schedules).unwrap();

        assert_eq!(store.load(), schedules);
    }

    #[test]
    fn legacy_single_object_is_upgraded_to_a_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(
            store.path(),
            r#"{"daily-chat": {"type": "text", "hour": 4, "minute": 30, "category": null, "last_reset": "2024-01-01-04:30"}}"#,
        )
        .unwrap();

        let schedules = store.load();
        let slots = &schedules["daily-chat"];
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].hour, 4);
        assert_eq!(slots[0].minute, 30);
        assert_eq!(slots[0].last_fired.as_deref(), Some("2024-01-01-04:30"));

        // Re-saving the upgraded form is a no-op transformation.
        store.save(&schedules).unwrap();
        assert_eq!(store.load(), schedules);
    }

    #[test]
    fn invalid_channel_shapes_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(
            store.path(),
            r#"{
                "good": [{"type": "voice", "hour": 9, "minute": 15}],
                "bad-scalar": 42,
                "bad-shape": {"when": "later"}
            }"#,
        )
        .unwrap();

        let schedules = store.load();
        assert_eq!(schedules.len(), 1);
        assert!(schedules.contains_key("good"));
    }
}
