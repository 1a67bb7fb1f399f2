//! SQLite schema definition.

/// Complete database schema for the clinic-flow store.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Pets and Owners (mirrored from the client registry)
-- ============================================================================

CREATE TABLE IF NOT EXISTS pets (
    pet_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    species TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS pet_owners (
    pet_id TEXT NOT NULL REFERENCES pets(pet_id),
    client_id TEXT NOT NULL,
    PRIMARY KEY (pet_id, client_id)
);

CREATE INDEX IF NOT EXISTS idx_pet_owners_client ON pet_owners(client_id);

-- ============================================================================
-- Staff Members (mirrored from the staff registry)
-- ============================================================================

CREATE TABLE IF NOT EXISTS staff_members (
    staff_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    role TEXT NOT NULL,
    available INTEGER NOT NULL DEFAULT 1 CHECK (available IN (0, 1)),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_staff_role ON staff_members(role, available);

-- ============================================================================
-- Waiting Room Entries (never deleted; completed/cancelled are terminal)
-- ============================================================================

CREATE TABLE IF NOT EXISTS waiting_room_entries (
    entry_id TEXT PRIMARY KEY,
    client_id TEXT NOT NULL,
    pet_id TEXT NOT NULL,
    arrival_time TEXT NOT NULL,
    visit_type TEXT NOT NULL CHECK (visit_type IN ('medical', 'grooming')),
    status TEXT NOT NULL DEFAULT 'waiting'
        CHECK (status IN ('waiting', 'in_progress', 'completed', 'cancelled')),
    priority TEXT NOT NULL DEFAULT 'normal'
        CHECK (priority IN ('low', 'normal', 'high', 'urgent')),
    assigned_staff_id TEXT REFERENCES staff_members(staff_id),
    reason_for_visit TEXT,
    notes TEXT,
    consultation_started_at TEXT,
    completed_at TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Dedup key: one live entry per (pet, arrival, visit type)
CREATE UNIQUE INDEX IF NOT EXISTS idx_entries_dedup
    ON waiting_room_entries(pet_id, arrival_time, visit_type)
    WHERE status <> 'cancelled';

CREATE INDEX IF NOT EXISTS idx_entries_status ON waiting_room_entries(status);
CREATE INDEX IF NOT EXISTS idx_entries_arrival ON waiting_room_entries(arrival_time);
CREATE INDEX IF NOT EXISTS idx_entries_client_pet ON waiting_room_entries(client_id, pet_id);
CREATE INDEX IF NOT EXISTS idx_entries_staff ON waiting_room_entries(assigned_staff_id);

-- Terminal rows are frozen
CREATE TRIGGER IF NOT EXISTS entries_terminal_frozen BEFORE UPDATE ON waiting_room_entries
WHEN old.status IN ('completed', 'cancelled')
BEGIN
    SELECT RAISE(ABORT, 'Terminal entries cannot be modified');
END;

-- ============================================================================
-- Service Sessions (consultation or grooming)
-- ============================================================================

CREATE TABLE IF NOT EXISTS service_sessions (
    session_id TEXT PRIMARY KEY,
    entry_id TEXT NOT NULL REFERENCES waiting_room_entries(entry_id),
    pet_id TEXT NOT NULL,
    staff_id TEXT REFERENCES staff_members(staff_id),
    visit_type TEXT NOT NULL CHECK (visit_type IN ('medical', 'grooming')),
    started_at TEXT NOT NULL,
    finished_at TEXT,
    outcome TEXT
);

-- At most one open session per entry
CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_open_entry
    ON service_sessions(entry_id)
    WHERE finished_at IS NULL;

CREATE INDEX IF NOT EXISTS idx_sessions_staff ON service_sessions(staff_id);
CREATE INDEX IF NOT EXISTS idx_sessions_finished ON service_sessions(finished_at);

-- ============================================================================
-- Entry Events (append-only, hash-chained audit trail)
-- ============================================================================

CREATE TABLE IF NOT EXISTS entry_events (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    entry_id TEXT NOT NULL REFERENCES waiting_room_entries(entry_id),
    event TEXT NOT NULL,
    from_status TEXT,
    to_status TEXT NOT NULL,
    detail TEXT,
    at TEXT NOT NULL,
    prev_hash TEXT,
    hash TEXT NOT NULL UNIQUE
);

CREATE INDEX IF NOT EXISTS idx_events_entry ON entry_events(entry_id, seq);

CREATE TRIGGER IF NOT EXISTS entry_events_no_update BEFORE UPDATE ON entry_events
BEGIN
    SELECT RAISE(ABORT, 'Entry events are append-only');
END;

CREATE TRIGGER IF NOT EXISTS entry_events_no_delete BEFORE DELETE ON entry_events
BEGIN
    SELECT RAISE(ABORT, 'Entry events are append-only');
END;
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute(
            "INSERT INTO pets (pet_id, name, species) VALUES ('p1', 'Max', 'canine')",
            [],
        )
        .unwrap();
        conn
    }

    fn insert_entry(conn: &Connection, id: &str, status: &str) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO waiting_room_entries (entry_id, client_id, pet_id, arrival_time, visit_type, status)
             VALUES (?1, 'c1', 'p1', '2024-01-01 09:00:00', 'medical', ?2)",
            [id, status],
        )
    }

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);

        // Applying twice is harmless
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_dedup_index_ignores_cancelled() {
        let conn = setup();

        insert_entry(&conn, "e1", "cancelled").unwrap();
        insert_entry(&conn, "e2", "waiting").unwrap();

        // Second live row with the same key must fail
        assert!(insert_entry(&conn, "e3", "waiting").is_err());
        assert!(insert_entry(&conn, "e4", "completed").is_err());

        // Another cancelled row is fine
        assert!(insert_entry(&conn, "e5", "cancelled").is_ok());
    }

    #[test]
    fn test_terminal_entries_frozen() {
        let conn = setup();
        insert_entry(&conn, "e1", "completed").unwrap();

        let result = conn.execute(
            "UPDATE waiting_room_entries SET status = 'waiting' WHERE entry_id = 'e1'",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_status_check_constraint() {
        let conn = setup();
        assert!(insert_entry(&conn, "e1", "teleported").is_err());
    }

    #[test]
    fn test_one_open_session_per_entry() {
        let conn = setup();
        insert_entry(&conn, "e1", "in_progress").unwrap();

        let open = |id: &str| {
            conn.execute(
                "INSERT INTO service_sessions (session_id, entry_id, pet_id, visit_type, started_at)
                 VALUES (?1, 'e1', 'p1', 'medical', '2024-01-01 09:10:00')",
                [id],
            )
        };
        assert!(open("s1").is_ok());
        assert!(open("s2").is_err());
    }

    #[test]
    fn test_events_append_only() {
        let conn = setup();
        insert_entry(&conn, "e1", "waiting").unwrap();
        conn.execute(
            "INSERT INTO entry_events (entry_id, event, to_status, at, hash)
             VALUES ('e1', 'created', 'waiting', '2024-01-01 09:00:00', 'abc')",
            [],
        )
        .unwrap();

        assert!(conn
            .execute("UPDATE entry_events SET detail = 'x'", [])
            .is_err());
        assert!(conn.execute("DELETE FROM entry_events", []).is_err());
    }
}
