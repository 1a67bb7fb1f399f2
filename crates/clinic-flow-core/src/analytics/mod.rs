//! Read-only wait-time and volume metrics over queue history.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::clock::{day_window, Clock};
use crate::db::Database;
use crate::error::FlowResult;
use crate::models::{EntryStatus, WaitingRoomEntry};

/// Per-day queue summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub day: NaiveDate,
    pub total: u64,
    pub waiting: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub average_wait_minutes: f64,
}

pub struct WaitTimeAnalytics<'a> {
    db: &'a Database,
    clock: &'a dyn Clock,
}

impl<'a> WaitTimeAnalytics<'a> {
    pub fn new(db: &'a Database, clock: &'a dyn Clock) -> Self {
        Self { db, clock }
    }

    /// Mean minutes from arrival to start of service over the day's
    /// completed entries, rounded to two decimals. 0.0 when there are none.
    pub fn average_wait_minutes(&self, day: NaiveDate) -> FlowResult<f64> {
        let (start, end) = day_window(day);
        let entries = self.db.list_entries_between(start, end)?;
        Ok(average_wait(&entries))
    }

    /// Entries currently in a status, across all days.
    pub fn count_by_status(&self, status: EntryStatus) -> FlowResult<u64> {
        Ok(self.db.count_entries_by_status(status)?)
    }

    /// Entries that arrived today.
    pub fn today_count(&self) -> FlowResult<u64> {
        let (start, end) = day_window(self.clock.today());
        Ok(self.db.count_entries_between(start, end)?)
    }

    pub fn waiting_count(&self) -> FlowResult<u64> {
        self.count_by_status(EntryStatus::Waiting)
    }

    pub fn in_progress_count(&self) -> FlowResult<u64> {
        self.count_by_status(EntryStatus::InProgress)
    }

    pub fn daily_summary(&self, day: NaiveDate) -> FlowResult<DailySummary> {
        let (start, end) = day_window(day);
        let entries = self.db.list_entries_between(start, end)?;
        let count = |status: EntryStatus| entries.iter().filter(|e| e.status == status).count() as u64;

        Ok(DailySummary {
            day,
            total: entries.len() as u64,
            waiting: count(EntryStatus::Waiting),
            in_progress: count(EntryStatus::InProgress),
            completed: count(EntryStatus::Completed),
            cancelled: count(EntryStatus::Cancelled),
            average_wait_minutes: average_wait(&entries),
        })
    }
}

fn average_wait(entries: &[WaitingRoomEntry]) -> f64 {
    let waits: Vec<f64> = entries
        .iter()
        .filter(|e| e.status == EntryStatus::Completed)
        .filter_map(|e| e.wait_minutes())
        .collect();

    if waits.is_empty() {
        return 0.0;
    }
    round_to_hundredths(waits.iter().sum::<f64>() / waits.len() as f64)
}

/// Round to two decimals, halves toward positive infinity.
pub fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}
