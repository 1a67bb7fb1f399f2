//! Waiting-room queue: entry creation, cancellation and direct edits.
//!
//! Every mutation runs in one IMMEDIATE transaction and appends an audit
//! event before committing.

mod search;

pub use search::*;

use std::collections::HashSet;

use tracing::{debug, info};

use crate::allocator::ResourceAllocator;
use crate::audit;
use crate::clock::{day_window, Clock};
use crate::db::{Database, EntryEventKind};
use crate::error::{FlowError, FlowResult};
use crate::models::{
    append_cancellation, append_note_line, EntryStatus, NewEntry, Priority, WaitingRoomEntry,
};

/// The live waiting room for one clinic.
pub struct WaitingRoomQueue<'a> {
    db: &'a Database,
    clock: &'a dyn Clock,
}

impl<'a> WaitingRoomQueue<'a> {
    pub fn new(db: &'a Database, clock: &'a dyn Clock) -> Self {
        Self { db, clock }
    }

    /// Register a walk-in. Arrival time is now.
    pub fn add_entry(&self, new: NewEntry) -> FlowResult<WaitingRoomEntry> {
        debug!(client_id = %new.client_id, pet_id = %new.pet_id, "Request to add entry");
        let tx = self.db.immediate_transaction()?;

        let pet = self
            .db
            .get_pet(&new.pet_id)?
            .ok_or_else(|| FlowError::NotFound(format!("pet {}", new.pet_id)))?;
        if !pet.is_owned_by(&new.client_id) {
            return Err(FlowError::Validation(format!(
                "pet {} does not belong to client {}",
                new.pet_id, new.client_id
            )));
        }
        if let Some(active) = self.db.find_active_entry_for(&new.client_id, &new.pet_id)? {
            return Err(FlowError::DuplicateEntry(format!(
                "client {} and pet {} are already in the waiting room (entry {})",
                new.client_id, new.pet_id, active.id
            )));
        }

        let now = self.clock.now();
        let mut entry =
            WaitingRoomEntry::new(new.client_id, new.pet_id, new.visit_type, now);
        entry.priority = new.priority;
        entry.reason_for_visit = new.reason_for_visit;
        entry.notes = new.notes;

        self.db.insert_entry(&entry).map_err(|e| {
            if e.is_unique_violation() {
                FlowError::DuplicateEntry(format!(
                    "pet {} already queued for {} at {}",
                    entry.pet_id, entry.visit_type, entry.arrival_time
                ))
            } else {
                e.into()
            }
        })?;
        audit::record(self.db, &entry, EntryEventKind::Created, None, None, now)?;

        tx.commit()?;
        info!(entry_id = %entry.id, pet = %pet.name, visit_type = %entry.visit_type, "Entry added");
        Ok(entry)
    }

    /// Cancel a waiting or in-progress entry.
    ///
    /// Frees any staff held by the entry and closes its open session without
    /// billing. `completed_at` stays unset.
    pub fn cancel(&self, entry_id: &str, reason: &str) -> FlowResult<WaitingRoomEntry> {
        debug!(entry_id, "Request to cancel entry");
        let tx = self.db.immediate_transaction()?;

        let mut entry = self.load(entry_id)?;
        let from = entry.status;
        if !from.can_transition_to(EntryStatus::Cancelled) {
            return Err(FlowError::InvalidState(format!(
                "entry {} is already {}",
                entry_id, from
            )));
        }

        let now = self.clock.now();
        let mut held: HashSet<String> = entry.assigned_staff_id.iter().cloned().collect();
        if let Some(session) = self.db.get_open_session_for_entry(entry_id)? {
            self.db.close_session(&session.id, now, None)?;
            held.extend(session.staff_id);
            debug!(entry_id, session_id = %session.id, "Closed open session of cancelled entry");
        }

        let allocator = ResourceAllocator::new(self.db, self.clock);
        for staff_id in &held {
            allocator.release(staff_id)?;
        }

        entry.status = EntryStatus::Cancelled;
        entry.notes = Some(append_cancellation(entry.notes.as_deref(), now, reason));
        self.db.update_entry(&entry)?;
        audit::record(
            self.db,
            &entry,
            EntryEventKind::Cancelled,
            Some(from),
            Some(reason.to_string()),
            now,
        )?;

        tx.commit()?;
        info!(entry_id, reason, released = held.len(), "Entry cancelled");
        Ok(entry)
    }

    /// Change the priority of a waiting entry.
    pub fn update_priority(&self, entry_id: &str, priority: Priority) -> FlowResult<WaitingRoomEntry> {
        debug!(entry_id, %priority, "Request to update priority");
        let tx = self.db.immediate_transaction()?;

        let mut entry = self.load(entry_id)?;
        if entry.status != EntryStatus::Waiting {
            return Err(FlowError::InvalidState(format!(
                "priority of entry {} cannot change while {}",
                entry_id, entry.status
            )));
        }

        let previous = entry.priority;
        entry.priority = priority;
        self.db.update_entry(&entry)?;
        audit::record(
            self.db,
            &entry,
            EntryEventKind::PriorityChanged,
            Some(entry.status),
            Some(format!("{} -> {}", previous, priority)),
            self.clock.now(),
        )?;

        tx.commit()?;
        info!(entry_id, %priority, "Priority updated");
        Ok(entry)
    }

    /// Add a timestamped line to the notes of a non-terminal entry.
    pub fn append_note(&self, entry_id: &str, text: &str) -> FlowResult<WaitingRoomEntry> {
        let tx = self.db.immediate_transaction()?;

        let mut entry = self.load(entry_id)?;
        if entry.status.is_terminal() {
            return Err(FlowError::InvalidState(format!(
                "entry {} is {}, notes are closed",
                entry_id, entry.status
            )));
        }

        let now = self.clock.now();
        entry.notes = Some(append_note_line(entry.notes.as_deref(), now, text));
        self.db.update_entry(&entry)?;
        audit::record(
            self.db,
            &entry,
            EntryEventKind::NoteAppended,
            Some(entry.status),
            None,
            now,
        )?;

        tx.commit()?;
        debug!(entry_id, "Note appended");
        Ok(entry)
    }

    /// Get an entry by ID.
    pub fn get(&self, entry_id: &str) -> FlowResult<Option<WaitingRoomEntry>> {
        Ok(self.db.get_entry(entry_id)?)
    }

    /// Waiting and in-progress entries, highest priority then earliest arrival first.
    pub fn list_active(&self) -> FlowResult<Vec<WaitingRoomEntry>> {
        Ok(self.db.list_active_entries()?)
    }

    pub fn list_by_status(&self, status: EntryStatus) -> FlowResult<Vec<WaitingRoomEntry>> {
        Ok(self.db.list_entries_by_status(status)?)
    }

    pub fn list_waiting(&self) -> FlowResult<Vec<WaitingRoomEntry>> {
        self.list_by_status(EntryStatus::Waiting)
    }

    pub fn list_in_progress(&self) -> FlowResult<Vec<WaitingRoomEntry>> {
        self.list_by_status(EntryStatus::InProgress)
    }

    /// Every entry that arrived today, newest first.
    pub fn today_history(&self) -> FlowResult<Vec<WaitingRoomEntry>> {
        let (start, end) = day_window(self.clock.today());
        Ok(self.db.list_entries_between(start, end)?)
    }

    /// Search pet names, reasons and notes, best match first.
    ///
    /// Substring matches from the store are merged with the active queue so
    /// misspelled terms still find live entries.
    pub fn search(&self, term: &str) -> FlowResult<Vec<SearchHit>> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self
            .db
            .search_entries(term, SEARCH_CANDIDATE_LIMIT)?
            .into_iter()
            .chain(self.db.list_active_entries()?);

        let mut seen = HashSet::new();
        let mut hits = Vec::new();
        for entry in candidates {
            if !seen.insert(entry.id.clone()) {
                continue;
            }
            let pet_name = self.db.get_pet(&entry.pet_id)?.map(|pet| pet.name);
            let score = relevance(term, &entry, pet_name.as_deref());
            if score >= MIN_SEARCH_SCORE {
                hits.push(SearchHit { entry, score });
            }
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.entry.arrival_time.cmp(&a.entry.arrival_time))
        });
        Ok(hits)
    }

    fn load(&self, entry_id: &str) -> FlowResult<WaitingRoomEntry> {
        self.db
            .get_entry(entry_id)?
            .ok_or_else(|| FlowError::entry_not_found(entry_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::models::{Pet, ServiceSession, StaffMember, StaffRole, VisitType};
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn setup() -> (Database, FixedClock) {
        let db = Database::open_in_memory().unwrap();
        for (pet_id, owner) in [("pet-1", "client-1"), ("pet-2", "client-2")] {
            let mut pet = Pet::new("Luna".into(), "canine".into());
            pet.id = pet_id.into();
            pet.owner_ids = vec![owner.into()];
            db.upsert_pet(&pet).unwrap();
        }
        (db, FixedClock::new(at(9, 0)))
    }

    fn walk_in(client: &str, pet: &str) -> NewEntry {
        NewEntry {
            client_id: client.into(),
            pet_id: pet.into(),
            visit_type: VisitType::Medical,
            reason_for_visit: Some("Limping on front leg".into()),
            notes: None,
            priority: Priority::Normal,
        }
    }

    #[test]
    fn test_add_entry() {
        let (db, clock) = setup();
        let queue = WaitingRoomQueue::new(&db, &clock);

        let entry = queue.add_entry(walk_in("client-1", "pet-1")).unwrap();
        assert_eq!(entry.status, EntryStatus::Waiting);
        assert_eq!(entry.arrival_time, at(9, 0));
        assert_eq!(queue.list_active().unwrap(), vec![entry.clone()]);

        let history = audit::AuditLog::new(&db).history(&entry.id).unwrap();
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_add_entry_rejects_foreign_pet() {
        let (db, clock) = setup();
        let queue = WaitingRoomQueue::new(&db, &clock);

        let err = queue.add_entry(walk_in("client-1", "pet-2")).unwrap_err();
        assert!(matches!(err, FlowError::Validation(_)));
        let err = queue.add_entry(walk_in("client-1", "pet-9")).unwrap_err();
        assert!(matches!(err, FlowError::NotFound(_)));
        assert!(queue.list_active().unwrap().is_empty());
    }

    #[test]
    fn test_add_entry_rejects_active_duplicate() {
        let (db, clock) = setup();
        let queue = WaitingRoomQueue::new(&db, &clock);

        let first = queue.add_entry(walk_in("client-1", "pet-1")).unwrap();
        clock.advance(Duration::minutes(5));
        let err = queue.add_entry(walk_in("client-1", "pet-1")).unwrap_err();
        assert!(matches!(err, FlowError::DuplicateEntry(_)));

        // Allowed again once the first visit is over
        queue.cancel(&first.id, "left").unwrap();
        assert!(queue.add_entry(walk_in("client-1", "pet-1")).is_ok());
    }

    #[test]
    fn test_cancel_waiting_entry_releases_staff() {
        let (db, clock) = setup();
        let queue = WaitingRoomQueue::new(&db, &clock);
        let vet = StaffMember::new("Dr. Vega".into(), StaffRole::Veterinarian);
        db.upsert_staff(&vet).unwrap();

        let entry = queue.add_entry(walk_in("client-1", "pet-1")).unwrap();
        ResourceAllocator::new(&db, &clock).assign(&entry.id, &vet.id).unwrap();

        clock.advance(Duration::minutes(10));
        let cancelled = queue.cancel(&entry.id, "client no-show").unwrap();
        assert_eq!(cancelled.status, EntryStatus::Cancelled);
        assert!(cancelled.completed_at.is_none());
        assert!(cancelled
            .notes
            .unwrap()
            .ends_with("2024-01-01 09:10:00 - Cancelled: client no-show"));
        assert!(db.get_staff(&vet.id).unwrap().unwrap().available);
    }

    #[test]
    fn test_cancel_in_progress_closes_session() {
        let (db, clock) = setup();
        let queue = WaitingRoomQueue::new(&db, &clock);

        let mut entry = queue.add_entry(walk_in("client-1", "pet-1")).unwrap();
        entry.status = EntryStatus::InProgress;
        db.update_entry(&entry).unwrap();
        let session = ServiceSession::open(
            entry.id.clone(),
            entry.pet_id.clone(),
            None,
            VisitType::Medical,
            at(9, 5),
        );
        db.insert_session(&session).unwrap();

        queue.cancel(&entry.id, "emergency transfer").unwrap();
        let closed = db.get_session(&session.id).unwrap().unwrap();
        assert_eq!(closed.finished_at, Some(at(9, 0)));
    }

    #[test]
    fn test_cancel_terminal_fails_and_leaves_entry() {
        let (db, clock) = setup();
        let queue = WaitingRoomQueue::new(&db, &clock);

        let entry = queue.add_entry(walk_in("client-1", "pet-1")).unwrap();
        let cancelled = queue.cancel(&entry.id, "left").unwrap();

        let err = queue.cancel(&entry.id, "again").unwrap_err();
        assert!(matches!(err, FlowError::InvalidState(_)));
        assert_eq!(queue.get(&entry.id).unwrap().unwrap(), cancelled);
        assert!(matches!(
            queue.cancel("missing", "x").unwrap_err(),
            FlowError::NotFound(_)
        ));
    }

    #[test]
    fn test_update_priority_reorders_queue() {
        let (db, clock) = setup();
        let queue = WaitingRoomQueue::new(&db, &clock);

        let first = queue.add_entry(walk_in("client-1", "pet-1")).unwrap();
        clock.advance(Duration::minutes(1));
        let second = queue.add_entry(walk_in("client-2", "pet-2")).unwrap();

        queue.update_priority(&second.id, Priority::Urgent).unwrap();
        let order: Vec<_> = queue.list_waiting().unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(order, vec![second.id.clone(), first.id.clone()]);

        queue.cancel(&first.id, "left").unwrap();
        let err = queue.update_priority(&first.id, Priority::High).unwrap_err();
        assert!(matches!(err, FlowError::InvalidState(_)));
    }

    #[test]
    fn test_append_note_keeps_previous_text() {
        let (db, clock) = setup();
        let queue = WaitingRoomQueue::new(&db, &clock);

        let mut new = walk_in("client-1", "pet-1");
        new.notes = Some("Nervous with other dogs".into());
        let entry = queue.add_entry(new).unwrap();

        clock.advance(Duration::minutes(3));
        let noted = queue.append_note(&entry.id, "Weight 21kg").unwrap();
        assert_eq!(
            noted.notes.as_deref(),
            Some("Nervous with other dogs\n2024-01-01 09:03:00 - Weight 21kg")
        );

        queue.cancel(&entry.id, "left").unwrap();
        assert!(queue.append_note(&entry.id, "late").is_err());
    }

    #[test]
    fn test_today_history_and_search() {
        let (db, clock) = setup();
        let queue = WaitingRoomQueue::new(&db, &clock);

        let first = queue.add_entry(walk_in("client-1", "pet-1")).unwrap();
        clock.advance(Duration::minutes(30));
        let mut grooming = walk_in("client-2", "pet-2");
        grooming.visit_type = VisitType::Grooming;
        grooming.reason_for_visit = Some("Full groom and nail trim".into());
        let second = queue.add_entry(grooming).unwrap();

        let history = queue.today_history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second.id);

        let hits = queue.search("limping").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.id, first.id);

        // Misspelt term still finds the active entry
        let hits = queue.search("grom").unwrap();
        assert_eq!(hits[0].entry.id, second.id);

        assert!(queue.search("  ").unwrap().is_empty());
    }

    #[test]
    fn test_search_by_pet_name() {
        let (db, clock) = setup();
        let mut bruno = Pet::new("Bruno".into(), "canine".into());
        bruno.owner_ids = vec!["client-3".into()];
        db.upsert_pet(&bruno).unwrap();

        let queue = WaitingRoomQueue::new(&db, &clock);
        queue.add_entry(walk_in("client-1", "pet-1")).unwrap();
        let mut visit = walk_in("client-3", &bruno.id);
        visit.reason_for_visit = Some("Ear infection".into());
        let entry = queue.add_entry(visit).unwrap();

        let hits = queue.search("bruno").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.id, entry.id);
    }
}
