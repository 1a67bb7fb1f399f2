//! Waiting-room entry models.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::staff::StaffRole;

/// Queue entry status.
///
/// Transitions only move forward: `Waiting → InProgress → Completed`, or
/// `Waiting | InProgress → Cancelled`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStatus {
    /// In the waiting room, possibly with staff already assigned
    Waiting,
    /// Consultation or grooming under way
    InProgress,
    /// Service finished
    Completed,
    /// Left the queue without being served
    Cancelled,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Waiting => "waiting",
            EntryStatus::InProgress => "in_progress",
            EntryStatus::Completed => "completed",
            EntryStatus::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled entries accept no further mutation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EntryStatus::Completed | EntryStatus::Cancelled)
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Whether `self → next` is a legal forward transition.
    pub fn can_transition_to(&self, next: EntryStatus) -> bool {
        matches!(
            (self, next),
            (EntryStatus::Waiting, EntryStatus::InProgress)
                | (EntryStatus::InProgress, EntryStatus::Completed)
                | (EntryStatus::Waiting, EntryStatus::Cancelled)
                | (EntryStatus::InProgress, EntryStatus::Cancelled)
        )
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "waiting" => Ok(EntryStatus::Waiting),
            "in_progress" => Ok(EntryStatus::InProgress),
            "completed" => Ok(EntryStatus::Completed),
            "cancelled" => Ok(EntryStatus::Cancelled),
            other => Err(format!("Unknown entry status: {}", other)),
        }
    }
}

/// Kind of visit, fixed when the entry is created.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitType {
    /// Consultation, vaccination and other veterinary care
    Medical,
    /// Grooming and aesthetic services
    Grooming,
}

impl VisitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitType::Medical => "medical",
            VisitType::Grooming => "grooming",
        }
    }

    /// The staff role able to serve this kind of visit.
    pub fn required_role(&self) -> StaffRole {
        match self {
            VisitType::Medical => StaffRole::Veterinarian,
            VisitType::Grooming => StaffRole::Groomer,
        }
    }
}

impl fmt::Display for VisitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "medical" => Ok(VisitType::Medical),
            "grooming" => Ok(VisitType::Grooming),
            other => Err(format!("Unknown visit type: {}", other)),
        }
    }
}

/// Queue priority. Higher priorities are served first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    /// Numeric rank used for queue ordering.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Low => 0,
            Priority::Normal => 1,
            Priority::High => 2,
            Priority::Urgent => 3,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(format!("Unknown priority: {}", other)),
        }
    }
}

/// A queued visit awaiting or undergoing service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaitingRoomEntry {
    /// Unique entry ID
    pub id: String,
    /// Client (owner) ID
    pub client_id: String,
    /// Pet ID
    pub pet_id: String,
    /// Arrival time (appointment start for synced entries)
    pub arrival_time: NaiveDateTime,
    /// Visit type, immutable after creation
    pub visit_type: VisitType,
    /// Current status
    pub status: EntryStatus,
    /// Queue priority
    pub priority: Priority,
    /// Staff member claimed for this visit
    pub assigned_staff_id: Option<String>,
    /// Why the pet is here
    pub reason_for_visit: Option<String>,
    /// Append-only notes, one timestamped line per addition
    pub notes: Option<String>,
    /// When service started
    pub consultation_started_at: Option<NaiveDateTime>,
    /// When service finished
    pub completed_at: Option<NaiveDateTime>,
}

impl WaitingRoomEntry {
    /// Create a new waiting entry.
    pub fn new(
        client_id: String,
        pet_id: String,
        visit_type: VisitType,
        arrival_time: NaiveDateTime,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            client_id,
            pet_id,
            arrival_time,
            visit_type,
            status: EntryStatus::Waiting,
            priority: Priority::Normal,
            assigned_staff_id: None,
            reason_for_visit: None,
            notes: None,
            consultation_started_at: None,
            completed_at: None,
        }
    }

    /// Whole minutes between arrival and start of service, if service
    /// started. Partial minutes are dropped.
    pub fn wait_minutes(&self) -> Option<f64> {
        self.consultation_started_at
            .map(|started| (started - self.arrival_time).num_minutes() as f64)
    }
}

/// Input for a walk-in entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewEntry {
    pub client_id: String,
    pub pet_id: String,
    pub visit_type: VisitType,
    pub reason_for_visit: Option<String>,
    pub notes: Option<String>,
    pub priority: Priority,
}

/// Append a timestamped line to existing notes.
pub fn append_note_line(existing: Option<&str>, at: NaiveDateTime, text: &str) -> String {
    let line = format!("{} - {}", at.format("%Y-%m-%d %H:%M:%S"), text);
    match existing {
        Some(current) if !current.is_empty() => format!("{}\n{}", current, line),
        _ => line,
    }
}

/// Append the cancellation line to existing notes.
pub fn append_cancellation(existing: Option<&str>, at: NaiveDateTime, reason: &str) -> String {
    append_note_line(existing, at, &format!("Cancelled: {}", reason))
}
