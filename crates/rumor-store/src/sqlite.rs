//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for Rumor. It uses rusqlite with
//! bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use rumor_core::{
    now_millis, Endpoint, ObservedWant, Peer, Record, StreamId, SummaryVector,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{MergeResult, Store};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
#[derive(Clone)]
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Unavailable(format!("mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("spawn_blocking failed: {}", e)))?
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
    let sequence: i64 = row.get("sequence")?;
    Ok(Record {
        stream_id: StreamId::new(row.get::<_, String>("stream_id")?),
        sequence: sequence as u64,
        originator: row.get("originator")?,
        payload: row.get("payload")?,
    })
}

fn encode_want(want: &SummaryVector) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(want, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode_want(bytes: &[u8]) -> Result<SummaryVector> {
    if bytes.is_empty() {
        return Ok(SummaryVector::new());
    }
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn row_to_peer(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, Vec<u8>, Option<i64>)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn build_peer((endpoint, want, observed_at): (String, Vec<u8>, Option<i64>)) -> Result<Peer> {
    Ok(Peer {
        endpoint: Endpoint::new(endpoint),
        last_reported_want: ObservedWant {
            vector: decode_want(&want)?,
            observed_at,
        },
    })
}

fn to_db_sequence(sequence: u64) -> Result<i64> {
    i64::try_from(sequence)
        .map_err(|_| StoreError::InvalidData(format!("sequence {} exceeds i64", sequence)))
}

#[async_trait]
impl Store for SqliteStore {
    async fn merge_record(&self, record: &Record) -> Result<MergeResult> {
        let record = record.clone();

        self.blocking(move |conn| {
            let sequence = to_db_sequence(record.sequence)?;
            let changed = conn.execute(
                "INSERT OR IGNORE INTO records (
                    stream_id, sequence, record_key, originator, payload, received_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.stream_id.as_str(),
                    sequence,
                    record.key().as_bytes().as_slice(),
                    record.originator,
                    record.payload,
                    now_millis(),
                ],
            )?;

            Ok(if changed == 1 {
                MergeResult::Inserted
            } else {
                MergeResult::Duplicate
            })
        })
        .await
    }

    async fn get_stream(&self, stream_id: &StreamId) -> Result<Vec<Record>> {
        let stream_id = stream_id.clone();

        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT stream_id, sequence, originator, payload
                 FROM records WHERE stream_id = ?1
                 ORDER BY sequence",
            )?;

            let records = stmt
                .query_map(params![stream_id.as_str()], row_to_record)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(records)
        })
        .await
    }

    async fn list_streams(&self) -> Result<Vec<(StreamId, Vec<Record>)>> {
        self.blocking(|conn| {
            let mut stmt = conn.prepare(
                "SELECT stream_id, sequence, originator, payload
                 FROM records ORDER BY stream_id, sequence",
            )?;

            let mut streams: Vec<(StreamId, Vec<Record>)> = Vec::new();
            let rows = stmt.query_map([], row_to_record)?;
            for row in rows {
                let record = row?;
                if let Some((id, records)) = streams.last_mut() {
                    if *id == record.stream_id {
                        records.push(record);
                        continue;
                    }
                }
                streams.push((record.stream_id.clone(), vec![record]));
            }

            Ok(streams)
        })
        .await
    }

    async fn stream_heads(&self) -> Result<SummaryVector> {
        self.blocking(|conn| {
            let mut stmt =
                conn.prepare("SELECT stream_id, MAX(sequence) FROM records GROUP BY stream_id")?;

            let heads = stmt
                .query_map([], |row| {
                    let id: String = row.get(0)?;
                    let max: i64 = row.get(1)?;
                    Ok((StreamId::new(id), max as u64))
                })?
                .collect::<rusqlite::Result<SummaryVector>>()?;

            Ok(heads)
        })
        .await
    }

    async fn insert_peer_if_absent(&self, endpoint: &Endpoint) -> Result<bool> {
        let endpoint = endpoint.clone();

        self.blocking(move |conn| {
            let empty = encode_want(&SummaryVector::new())?;
            let changed = conn.execute(
                "INSERT OR IGNORE INTO peers (endpoint, want, observed_at, created_at)
                 VALUES (?1, ?2, NULL, ?3)",
                params![endpoint.as_str(), empty, now_millis()],
            )?;
            Ok(changed == 1)
        })
        .await
    }

    async fn upsert_peer(&self, endpoint: &Endpoint, want: &ObservedWant) -> Result<()> {
        let endpoint = endpoint.clone();
        let want = want.clone();

        self.blocking(move |conn| {
            let encoded = encode_want(&want.vector)?;
            conn.execute(
                "INSERT INTO peers (endpoint, want, observed_at, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(endpoint) DO UPDATE SET
                    want = excluded.want,
                    observed_at = excluded.observed_at",
                params![endpoint.as_str(), encoded, want.observed_at, now_millis()],
            )?;
            Ok(())
        })
        .await
    }

    async fn find_peer(&self, endpoint: &Endpoint) -> Result<Option<Peer>> {
        let endpoint = endpoint.clone();

        self.blocking(move |conn| {
            let row = conn
                .query_row(
                    "SELECT endpoint, want, observed_at FROM peers WHERE endpoint = ?1",
                    params![endpoint.as_str()],
                    row_to_peer,
                )
                .optional()?;

            row.map(build_peer).transpose()
        })
        .await
    }

    async fn list_peers(&self) -> Result<Vec<Peer>> {
        self.blocking(|conn| {
            let mut stmt = conn.prepare("SELECT endpoint, want, observed_at FROM peers")?;
            let rows = stmt
                .query_map([], row_to_peer)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter().map(build_peer).collect()
        })
        .await
    }
}
