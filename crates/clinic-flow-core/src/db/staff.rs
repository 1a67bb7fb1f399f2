//! Staff registry records.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{StaffMember, StaffRole};

impl Database {
    /// Insert or update a staff member.
    ///
    /// `available` only seeds new rows. Re-mirroring a known member keeps the
    /// flag the allocator set.
    pub fn upsert_staff(&self, staff: &StaffMember) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO staff_members (staff_id, name, role, available)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(staff_id) DO UPDATE SET
                name = excluded.name,
                role = excluded.role,
                updated_at = datetime('now')
            "#,
            params![staff.id, staff.name, staff.role.as_str(), staff.available],
        )?;
        Ok(())
    }

    /// Get a staff member by ID.
    pub fn get_staff(&self, staff_id: &str) -> DbResult<Option<StaffMember>> {
        self.conn
            .query_row(
                "SELECT staff_id, name, role, available FROM staff_members WHERE staff_id = ?",
                [staff_id],
                |row| {
                    Ok(StaffRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        role: row.get(2)?,
                        available: row.get(3)?,
                    })
                },
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Set the availability flag unconditionally. Returns false if no such staff.
    pub fn set_staff_available(&self, staff_id: &str, available: bool) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE staff_members SET available = ?2, updated_at = datetime('now') WHERE staff_id = ?1",
            params![staff_id, available],
        )?;
        Ok(rows_affected > 0)
    }

    /// Flip `available` from true to false.
    ///
    /// Returns false when the member was already claimed, so two callers racing
    /// for the same member cannot both win.
    pub fn claim_staff(&self, staff_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE staff_members
            SET available = 0, updated_at = datetime('now')
            WHERE staff_id = ? AND available = 1
            "#,
            [staff_id],
        )?;
        Ok(rows_affected > 0)
    }

    /// Available staff able to take a role, by name.
    pub fn list_available_staff(&self, role: StaffRole) -> DbResult<Vec<StaffMember>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT staff_id, name, role, available
            FROM staff_members
            WHERE role = ? AND available = 1
            ORDER BY name
            "#,
        )?;
        let rows = stmt.query_map([role.as_str()], |row| {
            Ok(StaffRow {
                id: row.get(0)?,
                name: row.get(1)?,
                role: row.get(2)?,
                available: row.get(3)?,
            })
        })?;

        let mut staff = Vec::new();
        for row in rows {
            staff.push(row?.try_into()?);
        }
        Ok(staff)
    }
}

/// Intermediate row struct for database mapping.
struct StaffRow {
    id: String,
    name: String,
    role: String,
    available: bool,
}

impl TryFrom<StaffRow> for StaffMember {
    type Error = DbError;

    fn try_from(row: StaffRow) -> Result<Self, Self::Error> {
        Ok(StaffMember {
            id: row.id,
            name: row.name,
            role: row.role.parse().map_err(DbError::Constraint)?,
            available: row.available,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_upsert_and_get() {
        let db = setup_db();
        let vet = StaffMember::new("Dr. Rivera".into(), StaffRole::Veterinarian);
        db.upsert_staff(&vet).unwrap();

        let retrieved = db.get_staff(&vet.id).unwrap().unwrap();
        assert_eq!(retrieved, vet);
    }

    #[test]
    fn test_claim_only_once() {
        let db = setup_db();
        let vet = StaffMember::new("Dr. Rivera".into(), StaffRole::Veterinarian);
        db.upsert_staff(&vet).unwrap();

        assert!(db.claim_staff(&vet.id).unwrap());
        assert!(!db.claim_staff(&vet.id).unwrap());
        assert!(!db.get_staff(&vet.id).unwrap().unwrap().available);

        assert!(db.set_staff_available(&vet.id, true).unwrap());
        assert!(db.claim_staff(&vet.id).unwrap());
    }

    #[test]
    fn test_claim_unknown_staff() {
        let db = setup_db();
        assert!(!db.claim_staff("ghost").unwrap());
        assert!(!db.set_staff_available("ghost", true).unwrap());
    }

    #[test]
    fn test_list_available_by_role() {
        let db = setup_db();
        let vet1 = StaffMember::new("Dr. Rivera".into(), StaffRole::Veterinarian);
        let mut vet2 = StaffMember::new("Dr. Alba".into(), StaffRole::Veterinarian);
        vet2.available = false;
        let groomer = StaffMember::new("Ana".into(), StaffRole::Groomer);
        db.upsert_staff(&vet1).unwrap();
        db.upsert_staff(&vet2).unwrap();
        db.upsert_staff(&groomer).unwrap();

        let vets = db.list_available_staff(StaffRole::Veterinarian).unwrap();
        assert_eq!(vets.len(), 1);
        assert_eq!(vets[0].id, vet1.id);
    }

    #[test]
    fn test_upsert_keeps_claim() {
        let db = setup_db();
        let mut vet = StaffMember::new("Dr. Rivera".into(), StaffRole::Veterinarian);
        db.upsert_staff(&vet).unwrap();
        assert!(db.claim_staff(&vet.id).unwrap());

        vet.name = "Dr. Rivera Soto".into();
        vet.available = true;
        db.upsert_staff(&vet).unwrap();

        let stored = db.get_staff(&vet.id).unwrap().unwrap();
        assert_eq!(stored.name, "Dr. Rivera Soto");
        assert!(!stored.available);
        assert!(!db.claim_staff(&vet.id).unwrap());
    }
}
