//! `resploot-scheduler` — per-channel daily reset schedules with a
//! minute-resolution trigger loop.
//!
//! # Overview
//!
//! Schedules are persisted to a JSON file keyed by channel name, each value
//! an ordered list of [`ScheduleEntry`] slots. The [`engine::SchedulerEngine`]
//! wakes every 60 seconds, converts "now" into the configured timezone and
//! fires every slot whose hour:minute matches the current minute and whose
//! fire ledger does not already hold that minute's key.
//!
//! # Dedupe ledger
//!
//! Each slot carries a `last_fired` key of the form `YYYY-MM-DD-HH:MM`
//! (or `YYYY-MM-DD-MANUAL` for manual triggers). A slot fires at most once
//! per distinct key; a new day produces a new key, so the same wall-clock
//! slot fires again tomorrow. There is no catch-up for minutes missed while
//! the process was down — a deliberate simplification.

pub mod clock;
pub mod engine;
pub mod error;
pub mod service;
pub mod store;
pub mod types;

pub use engine::SchedulerEngine;
pub use error::{Result, SchedulerError};
pub use service::{ExecuteError, NextFire, ResetExecutor, ResetService, TickOutcome};
pub use store::ScheduleStore;
pub use types::{ChannelSchedules, ScheduleEntry};
