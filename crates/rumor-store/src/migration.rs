//! SQLite schema migrations.
//!
//! The schema version lives in `PRAGMA user_version`. `MIGRATIONS[i]` moves
//! the schema from version `i` to `i + 1`; all pending steps run in one
//! transaction.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

const MIGRATIONS: &[&str] = &[
    // v1: records keyed by stream position, peers with their last want.
    r#"
    CREATE TABLE records (
        stream_id   TEXT    NOT NULL,
        sequence    INTEGER NOT NULL,
        record_key  BLOB    NOT NULL UNIQUE,
        originator  TEXT    NOT NULL,
        payload     TEXT    NOT NULL,
        received_at INTEGER NOT NULL,
        PRIMARY KEY (stream_id, sequence)
    );

    CREATE TABLE peers (
        endpoint    TEXT    PRIMARY KEY,
        want        BLOB    NOT NULL,   -- CBOR map stream_id -> sequence
        observed_at INTEGER,            -- NULL until the peer sends a want
        created_at  INTEGER NOT NULL
    );
    "#,
];

/// Schema version this build writes.
pub const CURRENT_VERSION: u32 = MIGRATIONS.len() as u32;

/// Bring the database up to [`CURRENT_VERSION`]. Safe to call repeatedly.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    let found: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if found > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "schema version {} was written by a newer build (this one knows {})",
            found, CURRENT_VERSION
        )));
    }
    if found == CURRENT_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (step, sql) in MIGRATIONS.iter().enumerate().skip(found as usize) {
        tx.execute_batch(sql)?;
        tracing::debug!(version = step + 1, "applied schema migration");
    }
    // PRAGMA does not take bound parameters.
    tx.execute_batch(&format!("PRAGMA user_version = {}", CURRENT_VERSION))?;
    tx.commit()?;

    Ok(())
}
