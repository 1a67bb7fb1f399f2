//! Service session models.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::entry::VisitType;

/// A consultation or grooming session tied to exactly one queue entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceSession {
    /// Session ID
    pub id: String,
    /// Owning waiting-room entry
    pub entry_id: String,
    /// Pet served
    pub pet_id: String,
    /// Staff member serving, None for an unstaffed start
    pub staff_id: Option<String>,
    /// Consultation or grooming
    pub visit_type: VisitType,
    pub started_at: NaiveDateTime,
    /// None while the session is open
    pub finished_at: Option<NaiveDateTime>,
    /// Diagnosis or grooming notes, opaque here
    pub outcome: Option<String>,
}

impl ServiceSession {
    /// Open a session for an entry.
    pub fn open(
        entry_id: String,
        pet_id: String,
        staff_id: Option<String>,
        visit_type: VisitType,
        started_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            entry_id,
            pet_id,
            staff_id,
            visit_type,
            started_at,
            finished_at: None,
            outcome: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.finished_at.is_none()
    }

    /// Session length in minutes, once finished.
    pub fn duration_minutes(&self) -> Option<f64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds() as f64 / 60.0)
    }
}
