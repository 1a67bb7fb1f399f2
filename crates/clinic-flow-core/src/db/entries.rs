//! Waiting-room entry database operations.

use chrono::NaiveDateTime;
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{EntryStatus, Priority, VisitType, WaitingRoomEntry};

const ENTRY_COLUMNS: &str = r#"
    entry_id, client_id, pet_id, arrival_time, visit_type, status, priority,
    assigned_staff_id, reason_for_visit, notes, consultation_started_at, completed_at
"#;

/// Queue order: highest priority first, then earliest arrival.
const QUEUE_ORDER: &str = r#"
    CASE priority
        WHEN 'urgent' THEN 3
        WHEN 'high' THEN 2
        WHEN 'normal' THEN 1
        ELSE 0
    END DESC,
    arrival_time ASC
"#;

impl Database {
    /// Insert a new entry. Fails on a dedup-key collision.
    pub fn insert_entry(&self, entry: &WaitingRoomEntry) -> DbResult<()> {
        self.write_entry(entry, "")?;
        Ok(())
    }

    /// Insert a new entry unless a live entry already holds its dedup key.
    ///
    /// Returns false when the insert was a no-op. The unique index decides,
    /// so concurrent callers cannot both insert.
    pub fn insert_entry_if_absent(&self, entry: &WaitingRoomEntry) -> DbResult<bool> {
        let rows_affected = self.write_entry(entry, "ON CONFLICT DO NOTHING")?;
        Ok(rows_affected > 0)
    }

    /// Write back the mutable fields of an entry.
    ///
    /// Terminal rows are rejected by a schema trigger.
    pub fn update_entry(&self, entry: &WaitingRoomEntry) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE waiting_room_entries SET
                status = ?2,
                priority = ?3,
                assigned_staff_id = ?4,
                notes = ?5,
                consultation_started_at = ?6,
                completed_at = ?7,
                updated_at = datetime('now')
            WHERE entry_id = ?1
            "#,
            params![
                entry.id,
                entry.status.as_str(),
                entry.priority.as_str(),
                entry.assigned_staff_id,
                entry.notes,
                entry.consultation_started_at,
                entry.completed_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get an entry by ID.
    pub fn get_entry(&self, entry_id: &str) -> DbResult<Option<WaitingRoomEntry>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM waiting_room_entries WHERE entry_id = ?", ENTRY_COLUMNS),
                [entry_id],
                read_entry_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Live (non-cancelled) entry holding a dedup key.
    pub fn find_entry_by_key(
        &self,
        pet_id: &str,
        arrival_time: NaiveDateTime,
        visit_type: VisitType,
    ) -> DbResult<Option<WaitingRoomEntry>> {
        self.conn
            .query_row(
                &format!(
                    r#"
                    SELECT {} FROM waiting_room_entries
                    WHERE pet_id = ?1 AND arrival_time = ?2 AND visit_type = ?3
                      AND status <> 'cancelled'
                    "#,
                    ENTRY_COLUMNS
                ),
                params![pet_id, arrival_time, visit_type.as_str()],
                read_entry_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Active entry for a client/pet pair, if any.
    pub fn find_active_entry_for(
        &self,
        client_id: &str,
        pet_id: &str,
    ) -> DbResult<Option<WaitingRoomEntry>> {
        self.conn
            .query_row(
                &format!(
                    r#"
                    SELECT {} FROM waiting_room_entries
                    WHERE client_id = ?1 AND pet_id = ?2
                      AND status IN ('waiting', 'in_progress')
                    ORDER BY arrival_time DESC
                    LIMIT 1
                    "#,
                    ENTRY_COLUMNS
                ),
                params![client_id, pet_id],
                read_entry_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Waiting and in-progress entries in queue order.
    pub fn list_active_entries(&self) -> DbResult<Vec<WaitingRoomEntry>> {
        self.query_entries(
            &format!(
                "SELECT {} FROM waiting_room_entries WHERE status IN ('waiting', 'in_progress') ORDER BY {}",
                ENTRY_COLUMNS, QUEUE_ORDER
            ),
            params![],
        )
    }

    /// Entries with a given status in queue order.
    pub fn list_entries_by_status(&self, status: EntryStatus) -> DbResult<Vec<WaitingRoomEntry>> {
        self.query_entries(
            &format!(
                "SELECT {} FROM waiting_room_entries WHERE status = ? ORDER BY {}",
                ENTRY_COLUMNS, QUEUE_ORDER
            ),
            params![status.as_str()],
        )
    }

    /// Entries arriving in `[start, end)`, newest first.
    pub fn list_entries_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> DbResult<Vec<WaitingRoomEntry>> {
        self.query_entries(
            &format!(
                r#"
                SELECT {} FROM waiting_room_entries
                WHERE arrival_time >= ?1 AND arrival_time < ?2
                ORDER BY arrival_time DESC
                "#,
                ENTRY_COLUMNS
            ),
            params![start, end],
        )
    }

    /// Active entries assigned to a staff member.
    pub fn list_active_entries_for_staff(&self, staff_id: &str) -> DbResult<Vec<WaitingRoomEntry>> {
        self.query_entries(
            &format!(
                r#"
                SELECT {} FROM waiting_room_entries
                WHERE assigned_staff_id = ? AND status IN ('waiting', 'in_progress')
                ORDER BY {}
                "#,
                ENTRY_COLUMNS, QUEUE_ORDER
            ),
            params![staff_id],
        )
    }

    /// Entries whose reason, notes or pet name contain the term
    /// (case-insensitive).
    pub fn search_entries(&self, term: &str, limit: usize) -> DbResult<Vec<WaitingRoomEntry>> {
        let pattern = format!("%{}%", term.to_lowercase());
        self.query_entries(
            &format!(
                r#"
                SELECT {} FROM waiting_room_entries
                WHERE lower(coalesce(reason_for_visit, '')) LIKE ?1
                   OR lower(coalesce(notes, '')) LIKE ?1
                   OR pet_id IN (SELECT pet_id FROM pets WHERE lower(name) LIKE ?1)
                ORDER BY arrival_time DESC
                LIMIT ?2
                "#,
                ENTRY_COLUMNS
            ),
            params![pattern, limit as i64],
        )
    }

    /// Count entries with a given status.
    pub fn count_entries_by_status(&self, status: EntryStatus) -> DbResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM waiting_room_entries WHERE status = ?",
            [status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Count entries arriving in `[start, end)`.
    pub fn count_entries_between(&self, start: NaiveDateTime, end: NaiveDateTime) -> DbResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM waiting_room_entries WHERE arrival_time >= ?1 AND arrival_time < ?2",
            params![start, end],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn write_entry(&self, entry: &WaitingRoomEntry, on_conflict: &str) -> DbResult<usize> {
        let sql = format!(
            "INSERT INTO waiting_room_entries ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12) {}",
            ENTRY_COLUMNS, on_conflict
        );
        Ok(self.conn.execute(
            &sql,
            params![
                entry.id,
                entry.client_id,
                entry.pet_id,
                entry.arrival_time,
                entry.visit_type.as_str(),
                entry.status.as_str(),
                entry.priority.as_str(),
                entry.assigned_staff_id,
                entry.reason_for_visit,
                entry.notes,
                entry.consultation_started_at,
                entry.completed_at,
            ],
        )?)
    }

    fn query_entries(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> DbResult<Vec<WaitingRoomEntry>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, read_entry_row)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.try_into()?);
        }
        Ok(entries)
    }
}

/// Intermediate row struct for database mapping.
struct EntryRow {
    id: String,
    client_id: String,
    pet_id: String,
    arrival_time: NaiveDateTime,
    visit_type: String,
    status: String,
    priority: String,
    assigned_staff_id: Option<String>,
    reason_for_visit: Option<String>,
    notes: Option<String>,
    consultation_started_at: Option<NaiveDateTime>,
    completed_at: Option<NaiveDateTime>,
}

fn read_entry_row(row: &Row<'_>) -> rusqlite::Result<EntryRow> {
    Ok(EntryRow {
        id: row.get(0)?,
        client_id: row.get(1)?,
        pet_id: row.get(2)?,
        arrival_time: row.get(3)?,
        visit_type: row.get(4)?,
        status: row.get(5)?,
        priority: row.get(6)?,
        assigned_staff_id: row.get(7)?,
        reason_for_visit: row.get(8)?,
        notes: row.get(9)?,
        consultation_started_at: row.get(10)?,
        completed_at: row.get(11)?,
    })
}

impl TryFrom<EntryRow> for WaitingRoomEntry {
    type Error = DbError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        let visit_type: VisitType = row.visit_type.parse().map_err(DbError::Constraint)?;
        let status: EntryStatus = row.status.parse().map_err(DbError::Constraint)?;
        let priority: Priority = row.priority.parse().map_err(DbError::Constraint)?;

        Ok(WaitingRoomEntry {
            id: row.id,
            client_id: row.client_id,
            pet_id: row.pet_id,
            arrival_time: row.arrival_time,
            visit_type,
            status,
            priority,
            assigned_staff_id: row.assigned_staff_id,
            reason_for_visit: row.reason_for_visit,
            notes: row.notes,
            consultation_started_at: row.consultation_started_at,
            completed_at: row.completed_at,
        })
    }
}
