//! Consultation and grooming sessions.
//!
//! ```text
//! WAITING --(assign)--> WAITING[with staff]
//! WAITING[with staff] --(start)--> IN_PROGRESS
//! IN_PROGRESS --(finish)--> COMPLETED
//! WAITING or IN_PROGRESS --(cancel)--> CANCELLED
//! ```
//!
//! A session always belongs to exactly one entry through `entry_id`; finish
//! resolves the entry from it and nothing else.

mod billing;

pub use billing::*;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::allocator::ResourceAllocator;
use crate::audit;
use crate::clock::Clock;
use crate::db::{Database, EntryEventKind};
use crate::error::{FlowError, FlowResult};
use crate::models::{EntryStatus, ServiceSession, WaitingRoomEntry};

/// A started session, flagged when nobody was assigned to serve it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStart {
    pub session: ServiceSession,
    pub unstaffed: bool,
}

/// Drives entries through service.
pub struct ServiceSessionController<'a> {
    db: &'a Database,
    clock: &'a dyn Clock,
    billing: &'a dyn BillingNotifier,
}

impl<'a> ServiceSessionController<'a> {
    pub fn new(db: &'a Database, clock: &'a dyn Clock, billing: &'a dyn BillingNotifier) -> Self {
        Self { db, clock, billing }
    }

    /// Move a waiting entry into service and open its session.
    ///
    /// The session's staff is the entry's assigned staff. Starting without
    /// one is allowed and reported through `unstaffed`.
    pub fn start(&self, entry_id: &str) -> FlowResult<SessionStart> {
        debug!(entry_id, "Request to start session");
        let tx = self.db.immediate_transaction()?;

        let mut entry = self
            .db
            .get_entry(entry_id)?
            .ok_or_else(|| FlowError::entry_not_found(entry_id))?;
        if entry.status != EntryStatus::Waiting {
            return Err(FlowError::InvalidState(format!(
                "only waiting entries can start, entry {} is {}",
                entry_id, entry.status
            )));
        }

        let now = self.clock.now();
        entry.status = EntryStatus::InProgress;
        entry.consultation_started_at = Some(now);
        self.db.update_entry(&entry)?;

        let session = ServiceSession::open(
            entry.id.clone(),
            entry.pet_id.clone(),
            entry.assigned_staff_id.clone(),
            entry.visit_type,
            now,
        );
        self.db.insert_session(&session)?;
        audit::record(
            self.db,
            &entry,
            EntryEventKind::Started,
            Some(EntryStatus::Waiting),
            Some(format!("session {}", session.id)),
            now,
        )?;

        tx.commit()?;

        let unstaffed = session.staff_id.is_none();
        if unstaffed {
            warn!(entry_id, session_id = %session.id, "Session started without assigned staff");
        } else {
            info!(entry_id, session_id = %session.id, staff_id = ?session.staff_id, "Session started");
        }
        Ok(SessionStart { session, unstaffed })
    }

    /// Close a session and complete its entry.
    pub fn finish(&self, session_id: &str) -> FlowResult<WaitingRoomEntry> {
        self.finish_with_outcome(session_id, None)
    }

    /// Close a session recording its outcome, complete its entry and free
    /// the serving staff. Billing is told after the commit.
    pub fn finish_with_outcome(
        &self,
        session_id: &str,
        outcome: Option<&str>,
    ) -> FlowResult<WaitingRoomEntry> {
        debug!(session_id, "Request to finish session");
        let tx = self.db.immediate_transaction()?;

        let session = self
            .db
            .get_session(session_id)?
            .ok_or_else(|| FlowError::NotFound(format!("session {}", session_id)))?;
        let mut entry = self
            .db
            .get_entry(&session.entry_id)?
            .ok_or_else(|| FlowError::entry_not_found(&session.entry_id))?;

        if entry.status.is_terminal() {
            return Err(FlowError::InvalidState(format!(
                "entry {} is already {}",
                entry.id, entry.status
            )));
        }
        if entry.status != EntryStatus::InProgress || !session.is_open() {
            return Err(FlowError::InvalidState(format!(
                "session {} is not in progress",
                session_id
            )));
        }

        let now = self.clock.now();
        self.db.close_session(session_id, now, outcome)?;

        entry.status = EntryStatus::Completed;
        entry.completed_at = Some(now);
        self.db.update_entry(&entry)?;

        if let Some(staff_id) = &session.staff_id {
            ResourceAllocator::new(self.db, self.clock).release(staff_id)?;
        }
        audit::record(
            self.db,
            &entry,
            EntryEventKind::Finished,
            Some(EntryStatus::InProgress),
            Some(format!("session {}", session_id)),
            now,
        )?;

        tx.commit()?;
        info!(session_id, entry_id = %entry.id, staff_id = ?session.staff_id, "Session finished");

        let notice = BillingNotice {
            session_id: session.id,
            entry_id: entry.id.clone(),
            pet_id: session.pet_id,
            staff_id: session.staff_id,
            visit_type: session.visit_type,
            finished_at: now,
        };
        if let Err(e) = self.billing.session_finished(&notice) {
            warn!(session_id, error = %e, "Billing notification failed");
        }

        Ok(entry)
    }

    pub fn get_session(&self, session_id: &str) -> FlowResult<Option<ServiceSession>> {
        Ok(self.db.get_session(session_id)?)
    }

    pub fn open_session_for_entry(&self, entry_id: &str) -> FlowResult<Option<ServiceSession>> {
        Ok(self.db.get_open_session_for_entry(entry_id)?)
    }

    /// Sessions served by a staff member, newest first.
    pub fn sessions_for_staff(&self, staff_id: &str) -> FlowResult<Vec<ServiceSession>> {
        Ok(self.db.list_sessions_for_staff(staff_id)?)
    }

    /// Active entries held by a staff member.
    pub fn entries_for_staff(&self, staff_id: &str) -> FlowResult<Vec<WaitingRoomEntry>> {
        Ok(self.db.list_active_entries_for_staff(staff_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::models::{StaffMember, StaffRole, VisitType};
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use std::sync::Mutex;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[derive(Default)]
    struct RecordingNotifier {
        notices: Mutex<Vec<BillingNotice>>,
        fail: bool,
    }

    impl BillingNotifier for RecordingNotifier {
        fn session_finished(&self, notice: &BillingNotice) -> anyhow::Result<()> {
            self.notices.lock().unwrap().push(notice.clone());
            if self.fail {
                anyhow::bail!("billing offline");
            }
            Ok(())
        }
    }

    struct Fixture {
        db: Database,
        clock: FixedClock,
        vet: StaffMember,
        entry: WaitingRoomEntry,
    }

    fn setup() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let clock = FixedClock::new(at(9, 0));
        let vet = StaffMember::new("Dr. Vega".into(), StaffRole::Veterinarian);
        db.upsert_staff(&vet).unwrap();
        let entry =
            WaitingRoomEntry::new("client-1".into(), "pet-1".into(), VisitType::Medical, at(8, 45));
        db.insert_entry(&entry).unwrap();
        Fixture { db, clock, vet, entry }
    }

    #[test]
    fn test_start_and_finish_staffed_session() {
        let f = setup();
        let billing = RecordingNotifier::default();
        let controller = ServiceSessionController::new(&f.db, &f.clock, &billing);
        ResourceAllocator::new(&f.db, &f.clock)
            .assign(&f.entry.id, &f.vet.id)
            .unwrap();

        let started = controller.start(&f.entry.id).unwrap();
        assert!(!started.unstaffed);
        assert_eq!(started.session.staff_id.as_deref(), Some(f.vet.id.as_str()));

        let entry = f.db.get_entry(&f.entry.id).unwrap().unwrap();
        assert_eq!(entry.status, EntryStatus::InProgress);
        assert_eq!(entry.consultation_started_at, Some(at(9, 0)));
        assert_eq!(controller.entries_for_staff(&f.vet.id).unwrap().len(), 1);

        f.clock.advance(Duration::minutes(20));
        let done = controller
            .finish_with_outcome(&started.session.id, Some("Healthy"))
            .unwrap();
        assert_eq!(done.status, EntryStatus::Completed);
        assert_eq!(done.completed_at, Some(at(9, 20)));
        assert!(f.db.get_staff(&f.vet.id).unwrap().unwrap().available);

        let session = controller.get_session(&started.session.id).unwrap().unwrap();
        assert_eq!(session.finished_at, Some(at(9, 20)));
        assert_eq!(session.outcome.as_deref(), Some("Healthy"));
        assert!(controller.open_session_for_entry(&f.entry.id).unwrap().is_none());
        assert_eq!(controller.sessions_for_staff(&f.vet.id).unwrap().len(), 1);

        let notices = billing.notices.lock().unwrap();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].session_id, started.session.id);
        assert_eq!(notices[0].pet_id, "pet-1");
    }

    #[test]
    fn test_unstaffed_start_is_flagged() {
        let f = setup();
        let controller = ServiceSessionController::new(&f.db, &f.clock, &NoopBillingNotifier);

        let started = controller.start(&f.entry.id).unwrap();
        assert!(started.unstaffed);
        assert!(started.session.staff_id.is_none());

        let done = controller.finish(&started.session.id).unwrap();
        assert_eq!(done.status, EntryStatus::Completed);
    }

    #[test]
    fn test_start_requires_waiting() {
        let f = setup();
        let controller = ServiceSessionController::new(&f.db, &f.clock, &NoopBillingNotifier);

        controller.start(&f.entry.id).unwrap();
        let err = controller.start(&f.entry.id).unwrap_err();
        assert!(matches!(err, FlowError::InvalidState(_)));
        assert!(matches!(
            controller.start("missing").unwrap_err(),
            FlowError::NotFound(_)
        ));
    }

    #[test]
    fn test_finish_twice_fails() {
        let f = setup();
        let controller = ServiceSessionController::new(&f.db, &f.clock, &NoopBillingNotifier);

        let started = controller.start(&f.entry.id).unwrap();
        let done = controller.finish(&started.session.id).unwrap();

        let err = controller.finish(&started.session.id).unwrap_err();
        assert!(matches!(err, FlowError::InvalidState(_)));
        assert_eq!(f.db.get_entry(&f.entry.id).unwrap().unwrap(), done);
        assert!(matches!(
            controller.finish("missing").unwrap_err(),
            FlowError::NotFound(_)
        ));
    }

    #[test]
    fn test_billing_failure_does_not_undo_finish() {
        let f = setup();
        let billing = RecordingNotifier {
            fail: true,
            ..Default::default()
        };
        let controller = ServiceSessionController::new(&f.db, &f.clock, &billing);

        let started = controller.start(&f.entry.id).unwrap();
        let done = controller.finish(&started.session.id).unwrap();
        assert_eq!(done.status, EntryStatus::Completed);
        assert_eq!(billing.notices.lock().unwrap().len(), 1);
    }
}
