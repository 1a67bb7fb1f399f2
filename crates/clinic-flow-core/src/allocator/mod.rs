//! Staff allocation.
//!
//! A staff member is claimed by flipping `available` from true to false in
//! the same write transaction that sets the entry's `assigned_staff_id`. The
//! flip is a conditional update, so of two concurrent claims on one member
//! exactly one succeeds.

use tracing::{debug, info, warn};

use crate::audit;
use crate::clock::Clock;
use crate::db::{Database, EntryEventKind};
use crate::error::{FlowError, FlowResult};
use crate::models::{EntryStatus, StaffMember, VisitType, WaitingRoomEntry};

/// Assigns staff members to waiting entries and releases them afterwards.
pub struct ResourceAllocator<'a> {
    db: &'a Database,
    clock: &'a dyn Clock,
}

impl<'a> ResourceAllocator<'a> {
    pub fn new(db: &'a Database, clock: &'a dyn Clock) -> Self {
        Self { db, clock }
    }

    /// Claim `staff_id` for a waiting entry.
    ///
    /// The entry stays WAITING. Reassigning a waiting entry to another member
    /// frees the previous one.
    pub fn assign(&self, entry_id: &str, staff_id: &str) -> FlowResult<WaitingRoomEntry> {
        debug!(entry_id, staff_id, "Request to assign staff");
        let tx = self.db.immediate_transaction()?;

        let mut entry = self
            .db
            .get_entry(entry_id)?
            .ok_or_else(|| FlowError::entry_not_found(entry_id))?;
        if entry.status != EntryStatus::Waiting {
            return Err(FlowError::InvalidState(format!(
                "entry {} is {}, staff can only be assigned while waiting",
                entry_id, entry.status
            )));
        }

        let staff = self
            .db
            .get_staff(staff_id)?
            .ok_or_else(|| FlowError::NotFound(format!("staff {}", staff_id)))?;
        if !staff.can_serve(entry.visit_type) {
            return Err(FlowError::ResourceUnavailable(format!(
                "{} is a {}, {} visits need a {}",
                staff.name,
                staff.role,
                entry.visit_type,
                entry.visit_type.required_role()
            )));
        }

        if entry.assigned_staff_id.as_deref() == Some(staff_id) {
            debug!(entry_id, staff_id, "Staff already assigned to entry");
            return Ok(entry);
        }

        if !self.db.claim_staff(staff_id)? {
            warn!(entry_id, staff_id, "Staff member is busy");
            return Err(FlowError::ResourceUnavailable(format!(
                "{} is not available",
                staff.name
            )));
        }

        let previous = entry.assigned_staff_id.replace(staff_id.to_string());
        if let Some(previous) = &previous {
            self.release(previous)?;
        }
        self.db.update_entry(&entry)?;
        audit::record(
            self.db,
            &entry,
            EntryEventKind::Assigned,
            Some(EntryStatus::Waiting),
            Some(staff_id.to_string()),
            self.clock.now(),
        )?;

        tx.commit()?;
        info!(entry_id, staff_id, replaced = ?previous, "Staff assigned");
        Ok(entry)
    }

    /// Mark a staff member available again.
    ///
    /// Runs inside the caller's transaction; only session finish and entry
    /// cancellation free staff.
    pub(crate) fn release(&self, staff_id: &str) -> FlowResult<()> {
        if !self.db.set_staff_available(staff_id, true)? {
            return Err(FlowError::NotFound(format!("staff {}", staff_id)));
        }
        debug!(staff_id, "Staff released");
        Ok(())
    }

    /// Staff members currently free to take a visit type.
    pub fn available_staff(&self, visit_type: VisitType) -> FlowResult<Vec<StaffMember>> {
        Ok(self.db.list_available_staff(visit_type.required_role())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::models::StaffRole;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn add_entry(db: &Database, pet: &str, visit_type: VisitType) -> WaitingRoomEntry {
        let entry = WaitingRoomEntry::new("client-1".into(), pet.into(), visit_type, at(9, 0));
        db.insert_entry(&entry).unwrap();
        entry
    }

    fn add_staff(db: &Database, name: &str, role: StaffRole) -> StaffMember {
        let staff = StaffMember::new(name.into(), role);
        db.upsert_staff(&staff).unwrap();
        staff
    }

    #[test]
    fn test_assign_claims_staff() {
        let db = Database::open_in_memory().unwrap();
        let clock = FixedClock::new(at(9, 5));
        let allocator = ResourceAllocator::new(&db, &clock);

        let entry = add_entry(&db, "pet-1", VisitType::Medical);
        let vet = add_staff(&db, "Dr. Vega", StaffRole::Veterinarian);

        let assigned = allocator.assign(&entry.id, &vet.id).unwrap();
        assert_eq!(assigned.assigned_staff_id.as_deref(), Some(vet.id.as_str()));
        assert_eq!(assigned.status, EntryStatus::Waiting);
        assert!(!db.get_staff(&vet.id).unwrap().unwrap().available);
        assert!(allocator.available_staff(VisitType::Medical).unwrap().is_empty());
    }

    #[test]
    fn test_assign_busy_staff_fails() {
        let db = Database::open_in_memory().unwrap();
        let clock = FixedClock::new(at(9, 5));
        let allocator = ResourceAllocator::new(&db, &clock);

        let first = add_entry(&db, "pet-1", VisitType::Medical);
        let second = add_entry(&db, "pet-2", VisitType::Medical);
        let vet = add_staff(&db, "Dr. Vega", StaffRole::Veterinarian);

        allocator.assign(&first.id, &vet.id).unwrap();
        let err = allocator.assign(&second.id, &vet.id).unwrap_err();
        assert!(matches!(err, FlowError::ResourceUnavailable(_)));

        // The losing entry is untouched
        let untouched = db.get_entry(&second.id).unwrap().unwrap();
        assert!(untouched.assigned_staff_id.is_none());
    }

    #[test]
    fn test_assign_wrong_role_fails() {
        let db = Database::open_in_memory().unwrap();
        let clock = FixedClock::new(at(9, 5));
        let allocator = ResourceAllocator::new(&db, &clock);

        let entry = add_entry(&db, "pet-1", VisitType::Grooming);
        let vet = add_staff(&db, "Dr. Vega", StaffRole::Veterinarian);

        let err = allocator.assign(&entry.id, &vet.id).unwrap_err();
        assert!(matches!(err, FlowError::ResourceUnavailable(_)));
        assert!(db.get_staff(&vet.id).unwrap().unwrap().available);
    }

    #[test]
    fn test_assign_missing_records() {
        let db = Database::open_in_memory().unwrap();
        let clock = FixedClock::new(at(9, 5));
        let allocator = ResourceAllocator::new(&db, &clock);
        let entry = add_entry(&db, "pet-1", VisitType::Medical);

        assert!(matches!(
            allocator.assign("missing", "nobody").unwrap_err(),
            FlowError::NotFound(_)
        ));
        assert!(matches!(
            allocator.assign(&entry.id, "nobody").unwrap_err(),
            FlowError::NotFound(_)
        ));
    }

    #[test]
    fn test_assign_requires_waiting() {
        let db = Database::open_in_memory().unwrap();
        let clock = FixedClock::new(at(9, 5));
        let allocator = ResourceAllocator::new(&db, &clock);

        let mut entry = add_entry(&db, "pet-1", VisitType::Medical);
        entry.status = EntryStatus::InProgress;
        db.update_entry(&entry).unwrap();
        let vet = add_staff(&db, "Dr. Vega", StaffRole::Veterinarian);

        let err = allocator.assign(&entry.id, &vet.id).unwrap_err();
        assert!(matches!(err, FlowError::InvalidState(_)));
        assert!(db.get_staff(&vet.id).unwrap().unwrap().available);
    }

    #[test]
    fn test_reassign_frees_previous_staff() {
        let db = Database::open_in_memory().unwrap();
        let clock = FixedClock::new(at(9, 5));
        let allocator = ResourceAllocator::new(&db, &clock);

        let entry = add_entry(&db, "pet-1", VisitType::Medical);
        let vega = add_staff(&db, "Dr. Vega", StaffRole::Veterinarian);
        let ortiz = add_staff(&db, "Dr. Ortiz", StaffRole::Veterinarian);

        allocator.assign(&entry.id, &vega.id).unwrap();
        // Same member again is a no-op
        allocator.assign(&entry.id, &vega.id).unwrap();

        let reassigned = allocator.assign(&entry.id, &ortiz.id).unwrap();
        assert_eq!(reassigned.assigned_staff_id.as_deref(), Some(ortiz.id.as_str()));
        assert!(db.get_staff(&vega.id).unwrap().unwrap().available);
        assert!(!db.get_staff(&ortiz.id).unwrap().unwrap().available);
    }

    #[test]
    fn test_release_unknown_staff() {
        let db = Database::open_in_memory().unwrap();
        let clock = FixedClock::new(at(9, 5));
        let allocator = ResourceAllocator::new(&db, &clock);
        assert!(matches!(allocator.release("nobody"), Err(FlowError::NotFound(_))));
    }

    #[test]
    fn test_registry_refresh_does_not_free_claimed_staff() {
        let db = Database::open_in_memory().unwrap();
        let clock = FixedClock::new(at(9, 5));
        let allocator = ResourceAllocator::new(&db, &clock);

        let first = add_entry(&db, "pet-1", VisitType::Medical);
        let second = add_entry(&db, "pet-2", VisitType::Medical);
        let vet = add_staff(&db, "Dr. Vega", StaffRole::Veterinarian);
        allocator.assign(&first.id, &vet.id).unwrap();

        // Host re-mirrors its registry with the member marked free
        db.upsert_staff(&vet).unwrap();

        let result = allocator.assign(&second.id, &vet.id);
        assert!(matches!(result, Err(FlowError::ResourceUnavailable(_))));
        assert!(db.get_entry(&second.id).unwrap().unwrap().assigned_staff_id.is_none());
    }
}
