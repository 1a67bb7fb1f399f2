//! Append-only, hash-chained entry event log.

use chrono::NaiveDateTime;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use super::{Database, DbError, DbResult};
use crate::models::EntryStatus;

/// What happened to an entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntryEventKind {
    Created,
    PriorityChanged,
    NoteAppended,
    Assigned,
    Started,
    Finished,
    Cancelled,
}

impl EntryEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryEventKind::Created => "created",
            EntryEventKind::PriorityChanged => "priority_changed",
            EntryEventKind::NoteAppended => "note_appended",
            EntryEventKind::Assigned => "assigned",
            EntryEventKind::Started => "started",
            EntryEventKind::Finished => "finished",
            EntryEventKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for EntryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryEventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(EntryEventKind::Created),
            "priority_changed" => Ok(EntryEventKind::PriorityChanged),
            "note_appended" => Ok(EntryEventKind::NoteAppended),
            "assigned" => Ok(EntryEventKind::Assigned),
            "started" => Ok(EntryEventKind::Started),
            "finished" => Ok(EntryEventKind::Finished),
            "cancelled" => Ok(EntryEventKind::Cancelled),
            other => Err(format!("Unknown entry event: {}", other)),
        }
    }
}

/// The hashed content of an event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventPayload {
    pub entry_id: String,
    pub event: EntryEventKind,
    pub from_status: Option<EntryStatus>,
    pub to_status: EntryStatus,
    pub detail: Option<String>,
    pub at: NaiveDateTime,
}

/// A stored event with its chain links.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryEvent {
    pub seq: i64,
    #[serde(flatten)]
    pub payload: EventPayload,
    pub prev_hash: Option<String>,
    pub hash: String,
}

/// Compute the chain hash: sha256 over the previous hash followed by the
/// payload's JSON.
pub fn chain_hash(prev_hash: Option<&str>, payload: &EventPayload) -> DbResult<String> {
    let canonical = serde_json::to_string(payload)?;
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.unwrap_or("").as_bytes());
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

impl Database {
    /// Append an event to the chain. Must run inside the caller's write
    /// transaction so the tail cannot move underneath it.
    pub fn append_entry_event(&self, payload: EventPayload) -> DbResult<EntryEvent> {
        let prev_hash = self.last_event_hash()?;
        let hash = chain_hash(prev_hash.as_deref(), &payload)?;

        self.conn.execute(
            r#"
            INSERT INTO entry_events (entry_id, event, from_status, to_status, detail, at, prev_hash, hash)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                payload.entry_id,
                payload.event.as_str(),
                payload.from_status.map(|s| s.as_str()),
                payload.to_status.as_str(),
                payload.detail,
                payload.at,
                prev_hash,
                hash,
            ],
        )?;

        Ok(EntryEvent {
            seq: self.conn.last_insert_rowid(),
            payload,
            prev_hash,
            hash,
        })
    }

    /// Hash at the tail of the chain.
    pub fn last_event_hash(&self) -> DbResult<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT hash FROM entry_events ORDER BY seq DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Events for one entry in append order.
    pub fn list_events_for_entry(&self, entry_id: &str) -> DbResult<Vec<EntryEvent>> {
        self.query_events(
            r#"
            SELECT seq, entry_id, event, from_status, to_status, detail, at, prev_hash, hash
            FROM entry_events WHERE entry_id = ? ORDER BY seq
            "#,
            params![entry_id],
        )
    }

    /// The whole chain in append order.
    pub fn list_all_events(&self) -> DbResult<Vec<EntryEvent>> {
        self.query_events(
            r#"
            SELECT seq, entry_id, event, from_status, to_status, detail, at, prev_hash, hash
            FROM entry_events ORDER BY seq
            "#,
            params![],
        )
    }

    fn query_events(&self, sql: &str, params: impl rusqlite::Params) -> DbResult<Vec<EntryEvent>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, read_event_row)?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?.try_into()?);
        }
        Ok(events)
    }
}

struct EventRow {
    seq: i64,
    entry_id: String,
    event: String,
    from_status: Option<String>,
    to_status: String,
    detail: Option<String>,
    at: NaiveDateTime,
    prev_hash: Option<String>,
    hash: String,
}

fn read_event_row(row: &Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        seq: row.get(0)?,
        entry_id: row.get(1)?,
        event: row.get(2)?,
        from_status: row.get(3)?,
        to_status: row.get(4)?,
        detail: row.get(5)?,
        at: row.get(6)?,
        prev_hash: row.get(7)?,
        hash: row.get(8)?,
    })
}

impl TryFrom<EventRow> for EntryEvent {
    type Error = DbError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let from_status = row
            .from_status
            .map(|s| s.parse::<EntryStatus>())
            .transpose()
            .map_err(DbError::Constraint)?;

        Ok(EntryEvent {
            seq: row.seq,
            payload: EventPayload {
                entry_id: row.entry_id,
                event: row.event.parse().map_err(DbError::Constraint)?,
                from_status,
                to_status: row.to_status.parse().map_err(DbError::Constraint)?,
                detail: row.detail,
                at: row.at,
            },
            prev_hash: row.prev_hash,
            hash: row.hash,
        })
    }
}
