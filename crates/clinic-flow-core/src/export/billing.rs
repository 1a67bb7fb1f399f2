//! Daily billing export of finished sessions.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::clock::{day_window, Clock};
use crate::db::Database;
use crate::error::FlowResult;
use crate::models::{ServiceSession, VisitType};

/// One billable session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingLine {
    pub session_id: String,
    pub entry_id: String,
    pub pet_id: String,
    /// Serving staff, empty for unstaffed sessions
    pub staff_id: Option<String>,
    pub visit_type: VisitType,
    pub started_at: NaiveDateTime,
    pub finished_at: NaiveDateTime,
    pub duration_minutes: f64,
}

impl BillingLine {
    /// None for a session that is still open.
    pub fn from_session(session: &ServiceSession) -> Option<Self> {
        let finished_at = session.finished_at?;
        Some(Self {
            session_id: session.id.clone(),
            entry_id: session.entry_id.clone(),
            pet_id: session.pet_id.clone(),
            staff_id: session.staff_id.clone(),
            visit_type: session.visit_type,
            started_at: session.started_at,
            finished_at,
            duration_minutes: session.duration_minutes().unwrap_or(0.0),
        })
    }
}

/// Every completed session finished on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBillingExport {
    pub day: NaiveDate,
    /// Export timestamp, clinic-local
    pub exported_at: NaiveDateTime,
    pub sessions: Vec<BillingLine>,
}

impl DailyBillingExport {
    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        csv.push_str(
            "session_id,entry_id,pet_id,staff_id,visit_type,started_at,finished_at,duration_minutes\n",
        );

        for line in &self.sessions {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{:.2}\n",
                escape_csv(&line.session_id),
                escape_csv(&line.entry_id),
                escape_csv(&line.pet_id),
                escape_csv(line.staff_id.as_deref().unwrap_or("")),
                line.visit_type,
                line.started_at.format("%Y-%m-%d %H:%M:%S"),
                line.finished_at.format("%Y-%m-%d %H:%M:%S"),
                line.duration_minutes,
            ));
        }

        csv
    }
}

/// Billing exporter.
pub struct BillingExporter<'a> {
    db: &'a Database,
    clock: &'a dyn Clock,
}

impl<'a> BillingExporter<'a> {
    pub fn new(db: &'a Database, clock: &'a dyn Clock) -> Self {
        Self { db, clock }
    }

    /// Completed sessions finished during `day`, in finish order.
    pub fn export_day(&self, day: NaiveDate) -> FlowResult<DailyBillingExport> {
        let (start, end) = day_window(day);
        let sessions = self
            .db
            .list_billable_sessions_between(start, end)?
            .iter()
            .filter_map(BillingLine::from_session)
            .collect();

        Ok(DailyBillingExport {
            day,
            exported_at: self.clock.now(),
            sessions,
        })
    }
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
