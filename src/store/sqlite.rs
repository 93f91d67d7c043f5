use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OpenFlags, TransactionBehavior};

use crate::error::HubError;
use crate::rates::{entries_differ, RateEntry, Snapshot};

use super::{RotationOutcome, Slot, SnapshotStore};

pub type DbPool = Pool<SqliteConnectionManager>;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS snapshots (
    slot        TEXT PRIMARY KEY,
    entries     TEXT NOT NULL,
    captured_at TEXT NOT NULL
);
"#;

/// Snapshot store persisted in a single SQLite file.
///
/// Rotation runs inside an immediate transaction, so a failure at any point
/// rolls the file back to the pre-rotation pair of generations.
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, HubError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| HubError::Storage(format!("create {}: {e}", parent.display())))?;
            }
        }
        let manager = SqliteConnectionManager::file(path)
            .with_flags(
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .with_init(|conn| conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;"));
        let pool = Pool::builder().max_size(4).build(manager)?;

        let conn = pool.get()?;
        conn.execute_batch(SCHEMA)?;
        drop(conn);

        Ok(Self { pool })
    }
}

fn encode_snapshot(snapshot: &Snapshot) -> Result<(String, String), HubError> {
    let entries = serde_json::to_string(&snapshot.entries)
        .map_err(|e| HubError::Storage(format!("encode entries: {e}")))?;
    Ok((entries, snapshot.captured_at.to_rfc3339()))
}

fn decode_row(entries: &str, captured_at: &str) -> Result<Snapshot, HubError> {
    let entries: Vec<RateEntry> = serde_json::from_str(entries)
        .map_err(|e| HubError::Storage(format!("decode entries: {e}")))?;
    let captured_at = DateTime::parse_from_rfc3339(captured_at)
        .map_err(|e| HubError::Storage(format!("decode captured_at: {e}")))?
        .with_timezone(&Utc);
    Ok(Snapshot {
        entries,
        captured_at,
    })
}

fn read_slot(conn: &Connection, slot: Slot) -> Result<Option<Snapshot>, HubError> {
    let row = conn.query_row(
        "SELECT entries, captured_at FROM snapshots WHERE slot = ?1",
        params![slot.key()],
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
    );
    match row {
        Ok((entries, captured_at)) => Ok(Some(decode_row(&entries, &captured_at)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn upsert_slot(conn: &Connection, slot: Slot, snapshot: &Snapshot) -> Result<(), HubError> {
    let (entries, captured_at) = encode_snapshot(snapshot)?;
    conn.execute(
        "INSERT INTO snapshots (slot, entries, captured_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(slot) DO UPDATE SET
            entries = excluded.entries,
            captured_at = excluded.captured_at",
        params![slot.key(), entries, captured_at],
    )?;
    Ok(())
}

impl SnapshotStore for SqliteStore {
    fn read(&self, slot: Slot) -> Result<Option<Snapshot>, HubError> {
        let conn = self.pool.get()?;
        read_slot(&conn, slot)
    }

    fn write(&self, slot: Slot, snapshot: &Snapshot) -> Result<(), HubError> {
        let conn = self.pool.get()?;
        upsert_slot(&conn, slot, snapshot)
    }

    fn rotate(&self, candidate: Snapshot) -> Result<RotationOutcome, HubError> {
        let mut conn = self.pool.get()?;
        // Dropping the transaction without commit rolls everything back, so a
        // mid-rotation error leaves both generations as they were.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let outcome = match read_slot(&tx, Slot::Current)? {
            None => {
                upsert_slot(&tx, Slot::Current, &candidate)?;
                RotationOutcome::Initialized
            }
            Some(current) => {
                if !entries_differ(&candidate.entries, &current.entries) {
                    return Ok(RotationOutcome::Unchanged);
                }
                upsert_slot(&tx, Slot::Previous, &current)?;
                upsert_slot(&tx, Slot::Current, &candidate)?;
                RotationOutcome::Rotated
            }
        };
        tx.commit()?;
        Ok(outcome)
    }
}
