use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::sync::Mutex;
use tracing::{info, warn};

use resploot_core::{ChannelKind, ResetReport};

use crate::clock::{fire_key, is_due, manual_fire_key, next_fire_time};
use crate::error::{Result, SchedulerError};
use crate::store::ScheduleStore;
use crate::types::{ChannelSchedules, ScheduleEntry};

/// Failure reported by the injected reset executor. Carried as a plain
/// message so the scheduler stays decoupled from gateway error types.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ExecuteError(String);

impl ExecuteError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Outgoing collaborator seam: something that can actually reset a channel.
///
/// The production implementation archives pins and drives the platform
/// gateway; tests inject a recording fake.
#[async_trait]
pub trait ResetExecutor: Send + Sync {
    async fn execute(
        &self,
        channel: &str,
        entry: &ScheduleEntry,
    ) -> std::result::Result<ResetReport, ExecuteError>;
}

/// Result of one due slot processed during a tick.
pub struct TickOutcome {
    pub channel: String,
    /// Zero-based slot index within the channel's list.
    pub slot: usize,
    pub fire_key: String,
    pub result: std::result::Result<ResetReport, ExecuteError>,
}

/// Upcoming fire time for one slot, used by `/next_reset`.
pub struct NextFire {
    pub channel: String,
    pub slot: usize,
    pub at: DateTime<Tz>,
}

/// Owned schedule state plus the executor that performs resets.
///
/// All mutation funnels through methods here and persists immediately. The
/// interior mutex serializes the tick loop against manual triggers arriving
/// from the command surface, so delete/create sequences on the same remote
/// channel never interleave.
pub struct ResetService {
    inner: Mutex<Inner>,
    executor: Arc<dyn ResetExecutor>,
    tz: Tz,
}

struct Inner {
    store: ScheduleStore,
    schedules: ChannelSchedules,
}

impl Inner {
    fn persist(&self) -> Result<()> {
        self.store.save(&self.schedules)
    }
}

/// Channel names are stored without the leading `#` users tend to type.
fn normalize(channel: &str) -> String {
    channel.strip_prefix('#').unwrap_or(channel).to_string()
}

impl ResetService {
    pub fn new(store: ScheduleStore, executor: Arc<dyn ResetExecutor>, tz: Tz) -> Self {
        let schedules = store.load();
        Self {
            inner: Mutex::new(Inner { store, schedules }),
            executor,
            tz,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Current wall-clock time in the configured zone.
    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }

    /// Add a daily reset slot. Returns the 1-based schedule number.
    pub async fn add_schedule(
        &self,
        channel: &str,
        kind: ChannelKind,
        hour: u8,
        minute: u8,
        category: Option<String>,
    ) -> Result<usize> {
        if hour > 23 || minute > 59 {
            return Err(SchedulerError::InvalidTime { hour, minute });
        }
        let channel = normalize(channel);

        let mut inner = self.inner.lock().await;
        let slots = inner.schedules.entry(channel.clone()).or_default();
        slots.push(ScheduleEntry::new(kind, hour, minute, category));
        let number = slots.len();
        inner.persist()?;

        info!(%channel, number, time = %format!("{hour:02}:{minute:02}"), "schedule added");
        Ok(number)
    }

    /// Remove every slot for a channel. Returns how many were removed.
    pub async fn remove_all(&self, channel: &str) -> Result<usize> {
        let channel = normalize(channel);
        let mut inner = self.inner.lock().await;
        let removed = inner
            .schedules
            .remove(&channel)
            .ok_or_else(|| SchedulerError::ChannelNotScheduled {
                name: channel.clone(),
            })?;
        inner.persist()?;
        info!(%channel, count = removed.len(), "all schedules removed");
        Ok(removed.len())
    }

    /// Remove one slot by its 1-based schedule number, keeping the relative
    /// order of the rest. The channel key disappears with its last slot.
    pub async fn remove_one(&self, channel: &str, number: usize) -> Result<ScheduleEntry> {
        let channel = normalize(channel);
        let mut inner = self.inner.lock().await;
        let slots = inner
            .schedules
            .get_mut(&channel)
            .ok_or_else(|| SchedulerError::ChannelNotScheduled {
                name: channel.clone(),
            })?;

        if number == 0 || number > slots.len() {
            return Err(SchedulerError::InvalidIndex {
                index: number,
                len: slots.len(),
            });
        }
        let removed = slots.remove(number - 1);
        if slots.is_empty() {
            inner.schedules.remove(&channel);
        }
        inner.persist()?;
        info!(%channel, number, "schedule removed");
        Ok(removed)
    }

    /// Snapshot of all schedules, for listings.
    pub async fn list(&self) -> ChannelSchedules {
        self.inner.lock().await.schedules.clone()
    }

    /// Upcoming fire times, sorted soonest-first. With a channel name, only
    /// that channel's slots; otherwise every slot everywhere.
    pub async fn next_fire_times(&self, channel: Option<&str>) -> Result<Vec<NextFire>> {
        let now = self.now();
        let inner = self.inner.lock().await;

        let mut fires = Vec::new();
        match channel {
            Some(name) => {
                let name = normalize(name);
                let slots = inner.schedules.get(&name).ok_or_else(|| {
                    SchedulerError::ChannelNotScheduled { name: name.clone() }
                })?;
                for (i, entry) in slots.iter().enumerate() {
                    fires.push(NextFire {
                        channel: name.clone(),
                        slot: i,
                        at: next_fire_time(entry, now),
                    });
                }
            }
            None => {
                for (name, slots) in inner.schedules.iter() {
                    for (i, entry) in slots.iter().enumerate() {
                        fires.push(NextFire {
                            channel: name.clone(),
                            slot: i,
                            at: next_fire_time(entry, now),
                        });
                    }
                }
            }
        }
        fires.sort_by_key(|f| f.at);
        Ok(fires)
    }

    /// Manual out-of-band reset. Performs the destructive operation once
    /// (using the first slot for channel kind and category) and stamps every
    /// slot with the `YYYY-MM-DD-MANUAL` sentinel. The sentinel never equals
    /// a numeric fire key, so automatic slots still fire at their own times.
    pub async fn trigger_manual(&self, channel: &str) -> Result<ResetReport> {
        let channel = normalize(channel);
        let mut inner = self.inner.lock().await;

        let entry = inner
            .schedules
            .get(&channel)
            .and_then(|slots| slots.first())
            .cloned()
            .ok_or_else(|| SchedulerError::ChannelNotScheduled {
                name: channel.clone(),
            })?;

        let report = self
            .executor
            .execute(&channel, &entry)
            .await
            .map_err(|e| SchedulerError::Reset(e.to_string()))?;

        let key = manual_fire_key(self.now().date_naive());
        if let Some(slots) = inner.schedules.get_mut(&channel) {
            for slot in slots.iter_mut() {
                slot.last_fired = Some(key.clone());
            }
        }
        inner.persist()?;

        info!(%channel, key = %key, "manual reset completed");
        Ok(report)
    }

    /// Evaluate every slot against `now` and execute the due ones, in order,
    /// on this single flow. The ledger is stamped and persisted only after a
    /// reset completes without a propagated error; a failed slot stays
    /// eligible for the next qualifying window (tomorrow, not next minute).
    pub async fn tick(&self, now: DateTime<Tz>) -> Vec<TickOutcome> {
        let mut inner = self.inner.lock().await;
        let date = now.date_naive();

        let mut due = Vec::new();
        for (channel, slots) in inner.schedules.iter() {
            for (i, entry) in slots.iter().enumerate() {
                if is_due(entry, now) {
                    due.push((
                        channel.clone(),
                        i,
                        entry.clone(),
                        fire_key(date, entry.hour, entry.minute),
                    ));
                }
            }
        }

        let mut outcomes = Vec::with_capacity(due.len());
        for (channel, slot, entry, key) in due {
            info!(%channel, number = slot + 1, key = %key, "starting scheduled reset");

            let result = self.executor.execute(&channel, &entry).await;
            match &result {
                Ok(report) => {
                    if let Some(slots) = inner.schedules.get_mut(&channel) {
                        if let Some(entry) = slots.get_mut(slot) {
                            entry.last_fired = Some(key.clone());
                        }
                    }
                    if let Err(e) = inner.persist() {
                        warn!(%channel, error = %e, "failed to persist fire ledger");
                    }
                    info!(
                        %channel,
                        pins = report.pins_archived,
                        "scheduled reset completed"
                    );
                }
                Err(e) => {
                    warn!(%channel, number = slot + 1, error = %e, "scheduled reset failed; slot stays eligible");
                }
            }
            outcomes.push(TickOutcome {
                channel,
                slot,
                fire_key: key,
                result,
            });
        }
        outcomes
    }
}
