//! Strategy selection and execution for one channel reset.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{info, warn};

use resploot_archive::{ArchivePipeline, PinRecord};
use resploot_core::config::ResetConfig;
use resploot_core::{ChannelProps, ResetReport, ResetStrategy};
use resploot_scheduler::{ExecuteError, ResetExecutor, ScheduleEntry};

use crate::error::Result;
use crate::gateway::{ChannelGateway, ChannelHandle};

/// History page size for the selective-delete walk.
const HISTORY_PAGE: u8 = 100;

/// Executes resets against a platform gateway, picking a strategy per
/// channel and falling back down the chain on failure.
///
/// Text channels: fast archive-and-recreate, then slow selective delete,
/// then forced recreate without archival. Voice channels: recreate only.
/// A channel that no longer exists is simply created from its schedule.
pub struct ChannelResetter {
    gateway: Arc<dyn ChannelGateway>,
    archive: ArchivePipeline,
    cfg: ResetConfig,
    forward_channel: Option<String>,
}

impl ChannelResetter {
    pub fn new(
        gateway: Arc<dyn ChannelGateway>,
        archive: ArchivePipeline,
        cfg: ResetConfig,
        forward_channel: Option<String>,
    ) -> Self {
        Self {
            gateway,
            archive,
            cfg,
            forward_channel,
        }
    }

    /// Reset one channel according to its schedule entry.
    pub async fn reset(&self, name: &str, entry: &ScheduleEntry) -> Result<ResetReport> {
        let Some(handle) = self.gateway.find_channel(name).await? else {
            info!(channel = %name, kind = %entry.kind, "channel missing, creating fresh");
            let props = ChannelProps {
                name: name.to_string(),
                kind: entry.kind,
                category: entry.category.clone(),
                position: 0,
                topic: None,
                slowmode_secs: 0,
            };
            self.gateway.create_channel(&props).await?;
            return Ok(ResetReport::with_strategy(ResetStrategy::CreatedMissing));
        };

        match entry.kind {
            resploot_core::ChannelKind::Voice => {
                self.gateway
                    .recreate_channel(&handle, entry.category.as_deref())
                    .await?;
                info!(channel = %name, "voice channel recreated");
                Ok(ResetReport::with_strategy(ResetStrategy::Recreate))
            }
            resploot_core::ChannelKind::Text => self.reset_text(&handle, entry).await,
        }
    }

    async fn reset_text(
        &self,
        handle: &ChannelHandle,
        entry: &ScheduleEntry,
    ) -> Result<ResetReport> {
        let name = handle.props.name.clone();

        match self.fast_reset(handle, entry).await {
            Ok(report) => return Ok(report),
            Err(e) => {
                warn!(channel = %name, error = %e, "fast reset failed, trying selective delete");
            }
        }

        match self.slow_reset(handle).await {
            Ok(report) => return Ok(report),
            Err(e) => {
                warn!(channel = %name, error = %e, "selective delete failed, forcing recreate");
            }
        }

        // Last resort, logged as degraded: history is lost without archival.
        self.gateway
            .recreate_channel(handle, entry.category.as_deref())
            .await?;
        warn!(channel = %name, "forced recreate completed without archival");
        Ok(ResetReport::with_strategy(ResetStrategy::ForcedRecreate))
    }

    /// Archive pins, then delete and recreate the channel. O(pins), not
    /// O(history). Any error here hands control to the slow fallback.
    async fn fast_reset(
        &self,
        handle: &ChannelHandle,
        entry: &ScheduleEntry,
    ) -> Result<ResetReport> {
        let mut report = ResetReport::with_strategy(ResetStrategy::Fast);
        let name = &handle.props.name;

        let pins = self.gateway.pins(handle).await?;

        if !pins.is_empty() {
            let path = self.archive.archive(name, pins.clone()).await?;
            report.pins_archived = pins.len();
            report.archive_path = Some(path);
            self.forward_pins(&pins, &mut report).await;
        }

        let new_handle = self
            .gateway
            .recreate_channel(handle, entry.category.as_deref())
            .await?;
        info!(channel = %name, pins = report.pins_archived, "channel recreated");

        if self.cfg.restore_pins && !pins.is_empty() {
            self.restore_pins(&new_handle, &pins, &mut report).await;
        }
        Ok(report)
    }

    /// Walk the history newest-first and delete everything that is not
    /// pinned. The keep-set comes from a fresh pin fetch here, never from the
    /// failed fast attempt; if pins cannot be enumerated the strategy aborts
    /// rather than bulk-delete content it cannot tell apart. Per-message
    /// failures are counted, not escalated.
    async fn slow_reset(&self, handle: &ChannelHandle) -> Result<ResetReport> {
        let mut report = ResetReport::with_strategy(ResetStrategy::Slow);
        let name = &handle.props.name;
        let keep: HashSet<u64> = self
            .gateway
            .pins(handle)
            .await?
            .iter()
            .map(|p| p.id)
            .collect();

        let mut before = None;
        let mut since_pause = 0usize;
        loop {
            let page = self.gateway.history_page(handle, before, HISTORY_PAGE).await?;
            let Some(&last) = page.last() else { break };
            before = Some(last);

            for message_id in page {
                if keep.contains(&message_id) {
                    continue;
                }
                match self.gateway.delete_message(handle, message_id).await {
                    Ok(()) => {
                        report.messages_deleted += 1;
                        since_pause += 1;
                        if since_pause >= self.cfg.delete_batch_size {
                            since_pause = 0;
                            sleep(Duration::from_millis(self.cfg.delete_batch_pause_ms)).await;
                        }
                    }
                    Err(e) => {
                        // NotFound, Forbidden and rate limits all count the
                        // same way: this one message survived.
                        warn!(channel = %name, message_id, error = %e, "message delete failed");
                        report.delete_failures += 1;
                    }
                }
            }
        }

        info!(
            channel = %name,
            deleted = report.messages_deleted,
            failed = report.delete_failures,
            "selective delete finished"
        );

        let notice = format!(
            "✅ Channel reset complete! Removed {} message(s).",
            report.messages_deleted
        );
        if let Err(e) = self
            .gateway
            .send_notice(handle, &notice, Duration::from_secs(self.cfg.notice_ttl_secs))
            .await
        {
            warn!(channel = %name, error = %e, "reset notice failed");
        }
        Ok(report)
    }

    /// Best-effort copy of each pin into the long-lived archive channel,
    /// oldest first. One bad pin never blocks the rest.
    async fn forward_pins(&self, pins: &[PinRecord], report: &mut ResetReport) {
        let Some(forward_name) = self.forward_channel.as_deref() else {
            return;
        };
        let target = match self.gateway.ensure_channel(forward_name).await {
            Ok(target) => target,
            Err(e) => {
                warn!(channel = %forward_name, error = %e, "archive channel unavailable");
                report.forward_failures += pins.len();
                return;
            }
        };

        let mut ordered: Vec<&PinRecord> = pins.iter().collect();
        ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        for pin in ordered {
            if let Err(e) = self.gateway.post_pin(&target, pin, false).await {
                warn!(pin = pin.id, error = %e, "pin forward failed");
                report.forward_failures += 1;
            }
        }
    }

    /// Repost and re-pin the archived pins into the recreated channel.
    async fn restore_pins(
        &self,
        handle: &ChannelHandle,
        pins: &[PinRecord],
        report: &mut ResetReport,
    ) {
        let mut ordered: Vec<&PinRecord> = pins.iter().collect();
        ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        for pin in ordered {
            if let Err(e) = self.gateway.post_pin(handle, pin, true).await {
                warn!(pin = pin.id, error = %e, "pin restore failed");
                report.forward_failures += 1;
            }
        }
    }
}

#[async_trait]
impl ResetExecutor for ChannelResetter {
    async fn execute(
        &self,
        channel: &str,
        entry: &ScheduleEntry,
    ) -> std::result::Result<ResetReport, ExecuteError> {
        self.reset(channel, entry)
            .await
            .map_err(|e| ExecuteError::new(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use resploot_archive::PinAuthor;
    use resploot_core::config::ArchiveConfig;
    use resploot_core::ChannelKind;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeState {
        channels: Vec<(ChannelHandle, Vec<u64>, Vec<PinRecord>)>,
        next_id: u64,
        recreations: Vec<String>,
        deleted: Vec<u64>,
        notices: Vec<String>,
        posted: Vec<(String, u64, bool)>,
        fail_pins: bool,
        fail_recreate: bool,
        fail_history: bool,
        fail_delete: Vec<u64>,
    }

    #[derive(Default)]
    struct FakeGateway {
        state: Mutex<FakeState>,
    }

    impl FakeGateway {
        fn add_channel(
            &self,
            name: &str,
            kind: ChannelKind,
            messages: Vec<u64>,
            pins: Vec<PinRecord>,
        ) {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            let handle = ChannelHandle {
                id: state.next_id,
                props: ChannelProps {
                    name: name.to_string(),
                    kind,
                    category: None,
                    position: 3,
                    topic: Some("daily scratchpad".into()),
                    slowmode_secs: 0,
                },
            };
            state.channels.push((handle, messages, pins));
        }
    }

    #[async_trait]
    impl ChannelGateway for FakeGateway {
        async fn find_channel(&self, name: &str) -> crate::error::GatewayResult<Option<ChannelHandle>> {
            let state = self.state.lock().unwrap();
            Ok(state
                .channels
                .iter()
                .find(|(h, _, _)| h.props.name == name)
                .map(|(h, _, _)| h.clone()))
        }

        async fn create_channel(
            &self,
            props: &ChannelProps,
        ) -> crate::error::GatewayResult<ChannelHandle> {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            let handle = ChannelHandle {
                id: state.next_id,
                props: props.clone(),
            };
            state.channels.push((handle.clone(), vec![], vec![]));
            Ok(handle)
        }

        async fn recreate_channel(
            &self,
            channel: &ChannelHandle,
            _category_override: Option<&str>,
        ) -> crate::error::GatewayResult<ChannelHandle> {
            let mut state = self.state.lock().unwrap();
            if state.fail_recreate {
                return Err(GatewayError::PermissionDenied("manage_channels".into()));
            }
            state.recreations.push(channel.props.name.clone());
            state.next_id += 1;
            let replacement = ChannelHandle {
                id: state.next_id,
                props: channel.props.clone(),
            };
            state
                .channels
                .retain(|(h, _, _)| h.id != channel.id);
            state.channels.push((replacement.clone(), vec![], vec![]));
            Ok(replacement)
        }

        async fn pins(
            &self,
            channel: &ChannelHandle,
        ) -> crate::error::GatewayResult<Vec<PinRecord>> {
            let state = self.state.lock().unwrap();
            if state.fail_pins {
                return Err(GatewayError::Platform("pins unavailable".into()));
            }
            Ok(state
                .channels
                .iter()
                .find(|(h, _, _)| h.id == channel.id)
                .map(|(_, _, pins)| pins.clone())
                .unwrap_or_default())
        }

        async fn history_page(
            &self,
            channel: &ChannelHandle,
            before: Option<u64>,
            limit: u8,
        ) -> crate::error::GatewayResult<Vec<u64>> {
            let state = self.state.lock().unwrap();
            if state.fail_history {
                return Err(GatewayError::Platform("history unavailable".into()));
            }
            let Some((_, messages, _)) = state.channels.iter().find(|(h, _, _)| h.id == channel.id)
            else {
                return Ok(vec![]);
            };
            let mut newest_first: Vec<u64> = messages.clone();
            newest_first.sort_unstable_by(|a, b| b.cmp(a));
            Ok(newest_first
                .into_iter()
                .filter(|id| before.map_or(true, |b| *id < b))
                .filter(|id| !state.deleted.contains(id))
                .take(limit as usize)
                .collect())
        }

        async fn delete_message(
            &self,
            _channel: &ChannelHandle,
            message_id: u64,
        ) -> crate::error::GatewayResult<()> {
            let mut state = self.state.lock().unwrap();
            if state.fail_delete.contains(&message_id) {
                return Err(GatewayError::NotFound(format!("message {message_id}")));
            }
            state.deleted.push(message_id);
            Ok(())
        }

        async fn send_notice(
            &self,
            _channel: &ChannelHandle,
            text: &str,
            _ttl: Duration,
        ) -> crate::error::GatewayResult<()> {
            self.state.lock().unwrap().notices.push(text.to_string());
            Ok(())
        }

        async fn ensure_channel(&self, name: &str) -> crate::error::GatewayResult<ChannelHandle> {
            if let Some(handle) = self.find_channel(name).await? {
                return Ok(handle);
            }
            self.create_channel(&ChannelProps {
                name: name.to_string(),
                kind: ChannelKind::Text,
                category: None,
                position: 0,
                topic: None,
                slowmode_secs: 0,
            })
            .await
        }

        async fn post_pin(
            &self,
            channel: &ChannelHandle,
            pin: &PinRecord,
            repin: bool,
        ) -> crate::error::GatewayResult<()> {
            self.state
                .lock()
                .unwrap()
                .posted
                .push((channel.props.name.clone(), pin.id, repin));
            Ok(())
        }
    }

    fn pin(id: u64, created_at: &str) -> PinRecord {
        PinRecord {
            id,
            author: PinAuthor {
                name: "Resploot".into(),
                username: "resploot#0".into(),
                id: 7,
                avatar_url: None,
            },
            content: format!("pin {id}"),
            created_at: created_at.into(),
            jump_url: format!("https://discord.com/channels/1/2/{id}"),
            attachments: vec![],
            embeds: vec![],
            reactions: vec![],
        }
    }

    fn entry(kind: ChannelKind) -> ScheduleEntry {
        ScheduleEntry::new(kind, 4, 30, None)
    }

    fn resetter(
        gateway: Arc<FakeGateway>,
        dir: &tempfile::TempDir,
        forward: Option<String>,
    ) -> ChannelResetter {
        let archive_cfg = ArchiveConfig {
            dir: dir.path().to_string_lossy().into_owned(),
            ..ArchiveConfig::default()
        };
        let tz: chrono_tz::Tz = "America/Los_Angeles".parse().unwrap();
        let pipeline = ArchivePipeline::new(&archive_cfg, tz).unwrap();
        let cfg = ResetConfig {
            delete_batch_size: 3,
            delete_batch_pause_ms: 0,
            ..ResetConfig::default()
        };
        ChannelResetter::new(gateway, pipeline, cfg, forward)
    }

    #[tokio::test]
    async fn missing_channel_is_created_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(FakeGateway::default());
        let resetter = resetter(Arc::clone(&gateway), &dir, None);

        let report = resetter.reset("brand-new", &entry(ChannelKind::Text)).await.unwrap();
        assert_eq!(report.strategy, Some(ResetStrategy::CreatedMissing));
        assert!(gateway.find_channel("brand-new").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn voice_channel_is_recreated_without_archival() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(FakeGateway::default());
        gateway.add_channel("standup", ChannelKind::Voice, vec![], vec![]);
        let resetter = resetter(Arc::clone(&gateway), &dir, None);

        let report = resetter.reset("standup", &entry(ChannelKind::Voice)).await.unwrap();
        assert_eq!(report.strategy, Some(ResetStrategy::Recreate));
        assert_eq!(report.pins_archived, 0);
        assert_eq!(gateway.state.lock().unwrap().recreations, vec!["standup"]);
    }

    #[tokio::test]
    async fn fast_reset_archives_forwards_and_restores_pins() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(FakeGateway::default());
        gateway.add_channel(
            "daily-chat",
            ChannelKind::Text,
            vec![1, 2, 3],
            vec![
                pin(2, "2024-01-02T00:00:00+00:00"),
                pin(1, "2024-01-01T00:00:00+00:00"),
            ],
        );
        let resetter = resetter(Arc::clone(&gateway), &dir, Some("pin-archive".into()));

        let report = resetter.reset("daily-chat", &entry(ChannelKind::Text)).await.unwrap();
        assert_eq!(report.strategy, Some(ResetStrategy::Fast));
        assert_eq!(report.pins_archived, 2);
        assert_eq!(report.forward_failures, 0);
        assert!(report.archive_path.as_ref().unwrap().exists());

        let state = gateway.state.lock().unwrap();
        assert_eq!(state.recreations, vec!["daily-chat"]);
        // Forwarded to the archive channel (no repin), then restored into the
        // recreated channel (repinned), both oldest-first.
        let forwarded: Vec<_> = state
            .posted
            .iter()
            .filter(|(name, _, _)| name == "pin-archive")
            .collect();
        assert_eq!(forwarded.len(), 2);
        assert_eq!((forwarded[0].1, forwarded[0].2), (1, false));
        let restored: Vec<_> = state
            .posted
            .iter()
            .filter(|(name, _, _)| name == "daily-chat")
            .collect();
        assert_eq!(restored.len(), 2);
        assert_eq!((restored[0].1, restored[0].2), (1, true));
    }

    #[tokio::test]
    async fn recreate_failure_falls_back_to_selective_delete() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(FakeGateway::default());
        gateway.add_channel(
            "daily-chat",
            ChannelKind::Text,
            vec![1, 2, 3, 4, 5],
            vec![pin(2, "2024-01-01T00:00:00+00:00")],
        );
        gateway.state.lock().unwrap().fail_recreate = true;
        let resetter = resetter(Arc::clone(&gateway), &dir, None);

        let report = resetter.reset("daily-chat", &entry(ChannelKind::Text)).await.unwrap();
        assert_eq!(report.strategy, Some(ResetStrategy::Slow));
        assert_eq!(report.messages_deleted, 4);

        let state = gateway.state.lock().unwrap();
        // The captured pin survives the walk.
        assert!(!state.deleted.contains(&2));
        assert_eq!(state.notices.len(), 1);
        assert!(state.notices[0].contains("reset complete"));
    }

    #[tokio::test]
    async fn per_message_delete_failures_are_counted_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(FakeGateway::default());
        gateway.add_channel("daily-chat", ChannelKind::Text, vec![1, 2, 3, 4], vec![]);
        {
            let mut state = gateway.state.lock().unwrap();
            state.fail_recreate = true;
            state.fail_delete = vec![3];
        }
        let resetter = resetter(Arc::clone(&gateway), &dir, None);

        let report = resetter.reset("daily-chat", &entry(ChannelKind::Text)).await.unwrap();
        assert_eq!(report.strategy, Some(ResetStrategy::Slow));
        assert_eq!(report.messages_deleted, 3);
        assert_eq!(report.delete_failures, 1);
    }

    #[tokio::test]
    async fn pin_fetch_failure_skips_selective_delete_entirely() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(FakeGateway::default());
        gateway.add_channel(
            "daily-chat",
            ChannelKind::Text,
            vec![1, 2, 3],
            vec![pin(2, "2024-01-01T00:00:00+00:00")],
        );
        gateway.state.lock().unwrap().fail_pins = true;
        let resetter = resetter(Arc::clone(&gateway), &dir, None);

        let report = resetter.reset("daily-chat", &entry(ChannelKind::Text)).await.unwrap();
        // With no pin list there is no safe keep-set, so the walk must not
        // run at all; the chain drops straight to the forced recreate.
        assert_eq!(report.strategy, Some(ResetStrategy::ForcedRecreate));
        assert_eq!(report.messages_deleted, 0);

        let state = gateway.state.lock().unwrap();
        assert!(state.deleted.is_empty());
        assert_eq!(state.recreations, vec!["daily-chat"]);
    }

    #[tokio::test]
    async fn double_failure_forces_a_recreate_without_archival() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(FakeGateway::default());
        gateway.add_channel("daily-chat", ChannelKind::Text, vec![1, 2], vec![]);
        {
            let mut state = gateway.state.lock().unwrap();
            state.fail_pins = true;
            state.fail_history = true;
        }
        let resetter = resetter(Arc::clone(&gateway), &dir, None);

        let report = resetter.reset("daily-chat", &entry(ChannelKind::Text)).await.unwrap();
        assert_eq!(report.strategy, Some(ResetStrategy::ForcedRecreate));
        assert_eq!(report.pins_archived, 0);
        assert_eq!(gateway.state.lock().unwrap().recreations, vec!["daily-chat"]);
    }

    #[tokio::test]
    async fn every_strategy_failing_propagates_the_error() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(FakeGateway::default());
        gateway.add_channel("daily-chat", ChannelKind::Text, vec![1], vec![]);
        {
            let mut state = gateway.state.lock().unwrap();
            state.fail_recreate = true;
            state.fail_history = true;
        }
        let resetter = resetter(Arc::clone(&gateway), &dir, None);

        assert!(resetter.reset("daily-chat", &entry(ChannelKind::Text)).await.is_err());
    }
}
