//! Service session database operations.

use chrono::NaiveDateTime;
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{ServiceSession, VisitType};

const SESSION_COLUMNS: &str =
    "session_id, entry_id, pet_id, staff_id, visit_type, started_at, finished_at, outcome";

impl Database {
    /// Persist a newly opened session.
    pub fn insert_session(&self, session: &ServiceSession) -> DbResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO service_sessions ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                SESSION_COLUMNS
            ),
            params![
                session.id,
                session.entry_id,
                session.pet_id,
                session.staff_id,
                session.visit_type.as_str(),
                session.started_at,
                session.finished_at,
                session.outcome,
            ],
        )?;
        Ok(())
    }

    /// Get a session by ID.
    pub fn get_session(&self, session_id: &str) -> DbResult<Option<ServiceSession>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM service_sessions WHERE session_id = ?", SESSION_COLUMNS),
                [session_id],
                read_session_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// The open session for an entry, if any.
    pub fn get_open_session_for_entry(&self, entry_id: &str) -> DbResult<Option<ServiceSession>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM service_sessions WHERE entry_id = ? AND finished_at IS NULL",
                    SESSION_COLUMNS
                ),
                [entry_id],
                read_session_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Close an open session. Returns false if it was not open.
    pub fn close_session(
        &self,
        session_id: &str,
        finished_at: NaiveDateTime,
        outcome: Option<&str>,
    ) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE service_sessions
            SET finished_at = ?2, outcome = coalesce(?3, outcome)
            WHERE session_id = ?1 AND finished_at IS NULL
            "#,
            params![session_id, finished_at, outcome],
        )?;
        Ok(rows_affected > 0)
    }

    /// Sessions served by a staff member, most recent first.
    pub fn list_sessions_for_staff(&self, staff_id: &str) -> DbResult<Vec<ServiceSession>> {
        self.query_sessions(
            &format!(
                "SELECT {} FROM service_sessions WHERE staff_id = ? ORDER BY started_at DESC",
                SESSION_COLUMNS
            ),
            params![staff_id],
        )
    }

    /// Sessions finished in `[start, end)`, oldest first.
    pub fn list_sessions_finished_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> DbResult<Vec<ServiceSession>> {
        self.query_sessions(
            &format!(
                r#"
                SELECT {} FROM service_sessions
                WHERE finished_at >= ?1 AND finished_at < ?2
                ORDER BY finished_at ASC
                "#,
                SESSION_COLUMNS
            ),
            params![start, end],
        )
    }

    /// Sessions finished in `[start, end)` whose entry completed, oldest first.
    ///
    /// Sessions closed by a cancellation are left out.
    pub fn list_billable_sessions_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> DbResult<Vec<ServiceSession>> {
        self.query_sessions(
            &format!(
                r#"
                SELECT {} FROM service_sessions
                WHERE finished_at >= ?1 AND finished_at < ?2
                  AND entry_id IN (
                      SELECT entry_id FROM waiting_room_entries WHERE status = 'completed'
                  )
                ORDER BY finished_at ASC
                "#,
                SESSION_COLUMNS
            ),
            params![start, end],
        )
    }

    fn query_sessions(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> DbResult<Vec<ServiceSession>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, read_session_row)?;

        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?.try_into()?);
        }
        Ok(sessions)
    }
}

struct SessionRow {
    id: String,
    entry_id: String,
    pet_id: String,
    staff_id: Option<String>,
    visit_type: String,
    started_at: NaiveDateTime,
    finished_at: Option<NaiveDateTime>,
    outcome: Option<String>,
}

fn read_session_row(row: &Row<'_>) -> rusqlite::Result<SessionRow> {
    Ok(SessionRow {
        id: row.get(0)?,
        entry_id: row.get(1)?,
        pet_id: row.get(2)?,
        staff_id: row.get(3)?,
        visit_type: row.get(4)?,
        started_at: row.get(5)?,
        finished_at: row.get(6)?,
        outcome: row.get(7)?,
    })
}

impl TryFrom<SessionRow> for ServiceSession {
    type Error = DbError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let visit_type: VisitType = row.visit_type.parse().map_err(DbError::Constraint)?;

        Ok(ServiceSession {
            id: row.id,
            entry_id: row.entry_id,
            pet_id: row.pet_id,
            staff_id: row.staff_id,
            visit_type,
            started_at: row.started_at,
            finished_at: row.finished_at,
            outcome: row.outcome,
        })
    }
}
