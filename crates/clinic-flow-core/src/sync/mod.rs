//! Materializes queue entries from today's booked appointments.
//!
//! Sync is idempotent: the dedup key `(pet_id, arrival_time, visit_type)` is
//! enforced by a unique index, and each appointment is inserted with
//! `ON CONFLICT DO NOTHING` in its own transaction. Running sync twice, or
//! two syncs at once, never creates a second entry for one appointment.

mod source;

pub use source::*;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::audit;
use crate::clock::{day_window, Clock};
use crate::db::{Database, EntryEventKind};
use crate::error::FlowResult;
use crate::models::{Appointment, VisitType, WaitingRoomEntry};

/// Counts from one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub created: u32,
    pub skipped_existing: u32,
    pub skipped_invalid: u32,
}

impl SyncReport {
    /// True when some appointments could not be materialized.
    pub fn is_degraded(&self) -> bool {
        self.skipped_invalid > 0
    }
}

/// A sync run followed by the queue as one employee sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeQueue {
    pub report: SyncReport,
    pub entries: Vec<WaitingRoomEntry>,
}

enum Outcome {
    Created,
    Existing,
    Invalid,
}

/// Turns appointments into waiting-room entries.
pub struct SyncEngine<'a> {
    db: &'a Database,
    source: &'a dyn AppointmentSource,
    clock: &'a dyn Clock,
}

impl<'a> SyncEngine<'a> {
    pub fn new(db: &'a Database, source: &'a dyn AppointmentSource, clock: &'a dyn Clock) -> Self {
        Self { db, source, clock }
    }

    /// Create a WAITING entry for every open appointment of today.
    ///
    /// Bad appointments are logged and counted; they never abort the batch.
    pub fn sync_today(&self) -> FlowResult<SyncReport> {
        let today = self.clock.today();
        let (start, end) = day_window(today);
        debug!(%today, "Syncing today's appointments");

        let appointments = self.source.list_appointments(start, end)?;
        let mut report = SyncReport::default();

        for appointment in &appointments {
            match self.materialize(appointment)? {
                Outcome::Created => report.created += 1,
                Outcome::Existing => report.skipped_existing += 1,
                Outcome::Invalid => report.skipped_invalid += 1,
            }
        }

        info!(
            %today,
            fetched = appointments.len(),
            created = report.created,
            skipped_existing = report.skipped_existing,
            skipped_invalid = report.skipped_invalid,
            "Sync finished"
        );
        Ok(report)
    }

    /// Sync, then return the active entries visible to one employee.
    ///
    /// Creation is identical to `sync_today`; the employee only narrows what
    /// is read back: entries of the employee's visit type that are either
    /// unassigned or assigned to them.
    pub fn sync_today_for_employee(
        &self,
        employee_id: &str,
        for_groomer: bool,
    ) -> FlowResult<EmployeeQueue> {
        let report = self.sync_today()?;
        let visit_type = if for_groomer {
            VisitType::Grooming
        } else {
            VisitType::Medical
        };

        let entries = self
            .db
            .list_active_entries()?
            .into_iter()
            .filter(|e| e.visit_type == visit_type)
            .filter(|e| match e.assigned_staff_id.as_deref() {
                Some(assigned) => assigned == employee_id,
                None => true,
            })
            .collect();

        Ok(EmployeeQueue { report, entries })
    }

    fn materialize(&self, appointment: &Appointment) -> FlowResult<Outcome> {
        if appointment.status.is_closed() {
            debug!(appointment_id = %appointment.id, status = ?appointment.status, "Skipping closed appointment");
            return Ok(Outcome::Invalid);
        }
        let (Some(pet_id), Some(client_id)) = (
            appointment.pet_id.as_deref().map(str::trim).filter(|s| !s.is_empty()),
            appointment.client_id.as_deref().map(str::trim).filter(|s| !s.is_empty()),
        ) else {
            warn!(appointment_id = %appointment.id, "Skipping appointment without pet or client");
            return Ok(Outcome::Invalid);
        };

        let mut entry = WaitingRoomEntry::new(
            client_id.to_string(),
            pet_id.to_string(),
            appointment.offering_type.visit_type(),
            appointment.start_time,
        );
        entry.reason_for_visit = appointment.reason.clone();
        entry.notes = appointment.notes.clone();

        let tx = self.db.immediate_transaction()?;
        if !self.db.insert_entry_if_absent(&entry)? {
            debug!(appointment_id = %appointment.id, pet_id, "Entry already exists");
            return Ok(Outcome::Existing);
        }
        audit::record(
            self.db,
            &entry,
            EntryEventKind::Created,
            None,
            Some(format!("appointment {}", appointment.id)),
            self.clock.now(),
        )?;
        tx.commit()?;

        debug!(appointment_id = %appointment.id, entry_id = %entry.id, "Entry created from appointment");
        Ok(Outcome::Created)
    }
}
