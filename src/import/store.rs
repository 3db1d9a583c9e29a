//! Persistence contract of the import pipeline.
//!
//! The orchestrator only talks to an [`ImportStore`]. [`crate::db::SqliteStore`]
//! is the production implementation; [`MemoryStore`] backs dry runs and tests
//! and can be told to reject writes.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

use super::log::ImportLog;
use super::records::{NotationRecord, SongRecord};
use crate::notation::DrumBlock;

/// Persistence failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store cannot be reached at all; the run must stop
    #[error("Persistence layer unavailable: {0}")]
    Unavailable(String),

    /// This write was refused; other writes may still succeed
    #[error("Write rejected: {0}")]
    Rejected(String),

    #[error("Failed to encode record: {0}")]
    Encode(String),

    #[error("Failed to decode stored record: {0}")]
    Decode(String),
}

impl StoreError {
    /// Whether the run can continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Whether an upsert created a row or updated an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Inserted,
    Updated,
}

/// A persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stored {
    pub id: i64,
    /// Source line of the record
    pub line: usize,
    pub write: WriteKind,
}

/// Result of an all-or-nothing batch write: one entry per record, in input
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub stored: Vec<Stored>,
}

impl BatchOutcome {
    pub fn inserted(&self) -> usize {
        self.stored.iter().filter(|s| s.write == WriteKind::Inserted).count()
    }

    pub fn updated(&self) -> usize {
        self.stored.iter().filter(|s| s.write == WriteKind::Updated).count()
    }
}

/// Storage the import pipeline writes through.
///
/// Upserts are keyed by natural key: notations by
/// [`NotationRecord::natural_key`], songs by [`SongRecord::natural_key`]. Writing the
/// same key twice, within one batch or across runs, updates the row.
#[async_trait]
pub trait ImportStore: Send + Sync {
    /// Write all notations or none.
    async fn create_notation_batch(
        &self,
        records: &[NotationRecord],
    ) -> Result<BatchOutcome, StoreError>;

    async fn create_notation(&self, record: &NotationRecord) -> Result<Stored, StoreError>;

    /// Write all songs or none.
    async fn create_song_batch(&self, records: &[SongRecord]) -> Result<BatchOutcome, StoreError>;

    async fn create_song(&self, record: &SongRecord) -> Result<Stored, StoreError>;

    /// Replace every drumblock of a notation. Returns the number written.
    async fn replace_drumblocks(
        &self,
        notation_id: i64,
        blocks: &[DrumBlock],
    ) -> Result<usize, StoreError>;

    async fn create_import_log(&self, log: &ImportLog) -> Result<(), StoreError>;

    async fn update_import_log(&self, log: &ImportLog) -> Result<(), StoreError>;

    /// Most recent runs first.
    async fn list_import_logs(&self, limit: usize) -> Result<Vec<ImportLog>, StoreError>;
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    notations: HashMap<String, (i64, NotationRecord)>,
    songs: HashMap<String, (i64, SongRecord)>,
    drumblocks: HashMap<i64, Vec<DrumBlock>>,
    logs: Vec<ImportLog>,
}

impl MemoryState {
    fn upsert_notation(&mut self, record: &NotationRecord) -> Stored {
        if let Some((id, existing)) = self.notations.get_mut(&record.natural_key) {
            *existing = record.clone();
            return Stored {
                id: *id,
                line: record.line,
                write: WriteKind::Updated,
            };
        }
        self.next_id += 1;
        self.notations
            .insert(record.natural_key.clone(), (self.next_id, record.clone()));
        Stored {
            id: self.next_id,
            line: record.line,
            write: WriteKind::Inserted,
        }
    }

    fn upsert_song(&mut self, record: &SongRecord) -> Stored {
        if let Some((id, existing)) = self.songs.get_mut(&record.natural_key) {
            *existing = record.clone();
            return Stored {
                id: *id,
                line: record.line,
                write: WriteKind::Updated,
            };
        }
        self.next_id += 1;
        self.songs
            .insert(record.natural_key.clone(), (self.next_id, record.clone()));
        Stored {
            id: self.next_id,
            line: record.line,
            write: WriteKind::Inserted,
        }
    }
}

/// [`ImportStore`] kept in memory.
///
/// Used for dry runs, where nothing may touch the database, and in tests,
/// where the failure switches simulate a misbehaving backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    reject_batches: bool,
    rejected_lines: HashSet<usize>,
    unavailable_lines: HashSet<usize>,
    fail_drumblocks: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every batch call so that rows are written one by one.
    pub fn rejecting_batches(mut self) -> Self {
        self.reject_batches = true;
        self
    }

    /// Refuse the record from this source line, alone or in a batch.
    pub fn rejecting_line(mut self, line: usize) -> Self {
        self.rejected_lines.insert(line);
        self
    }

    /// Report the store as unreachable when this source line is written.
    pub fn unavailable_at_line(mut self, line: usize) -> Self {
        self.unavailable_lines.insert(line);
        self
    }

    /// Refuse every drumblock write.
    pub fn failing_drumblocks(mut self) -> Self {
        self.fail_drumblocks = true;
        self
    }

    pub fn notation_count(&self) -> usize {
        self.state.lock().notations.len()
    }

    pub fn song_count(&self) -> usize {
        self.state.lock().songs.len()
    }

    /// Stored notation by natural key.
    pub fn notation(&self, natural_key: &str) -> Option<(i64, NotationRecord)> {
        self.state.lock().notations.get(natural_key).cloned()
    }

    /// Stored song by title and artist.
    pub fn song(&self, title: &str, artist: &str) -> Option<(i64, SongRecord)> {
        self.state
            .lock()
            .songs
            .values()
            .find(|(_, song)| song.title == title && song.artist == artist)
            .cloned()
    }

    pub fn drumblocks(&self, notation_id: i64) -> Vec<DrumBlock> {
        self.state
            .lock()
            .drumblocks
            .get(&notation_id)
            .cloned()
            .unwrap_or_default()
    }

    fn check_line(&self, line: usize) -> Result<(), StoreError> {
        if self.unavailable_lines.contains(&line) {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        if self.rejected_lines.contains(&line) {
            return Err(StoreError::Rejected(format!("row at line {line} refused")));
        }
        Ok(())
    }

    fn check_batch(&self, lines: impl Iterator<Item = usize>) -> Result<(), StoreError> {
        if self.reject_batches {
            return Err(StoreError::Rejected("batch writes disabled".to_string()));
        }
        for line in lines {
            self.check_line(line)?;
        }
        Ok(())
    }
}

#[async_trait]
impl ImportStore for MemoryStore {
    async fn create_notation_batch(
        &self,
        records: &[NotationRecord],
    ) -> Result<BatchOutcome, StoreError> {
        self.check_batch(records.iter().map(|r| r.line))?;
        let mut state = self.state.lock();
        Ok(BatchOutcome {
            stored: records.iter().map(|r| state.upsert_notation(r)).collect(),
        })
    }

    async fn create_notation(&self, record: &NotationRecord) -> Result<Stored, StoreError> {
        self.check_line(record.line)?;
        Ok(self.state.lock().upsert_notation(record))
    }

    async fn create_song_batch(&self, records: &[SongRecord]) -> Result<BatchOutcome, StoreError> {
        self.check_batch(records.iter().map(|r| r.line))?;
        let mut state = self.state.lock();
        Ok(BatchOutcome {
            stored: records.iter().map(|r| state.upsert_song(r)).collect(),
        })
    }

    async fn create_song(&self, record: &SongRecord) -> Result<Stored, StoreError> {
        self.check_line(record.line)?;
        Ok(self.state.lock().upsert_song(record))
    }

    async fn replace_drumblocks(
        &self,
        notation_id: i64,
        blocks: &[DrumBlock],
    ) -> Result<usize, StoreError> {
        if self.fail_drumblocks {
            return Err(StoreError::Rejected("drumblock writes disabled".to_string()));
        }
        self.state
            .lock()
            .drumblocks
            .insert(notation_id, blocks.to_vec());
        Ok(blocks.len())
    }

    async fn create_import_log(&self, log: &ImportLog) -> Result<(), StoreError> {
        self.state.lock().logs.push(log.clone());
        Ok(())
    }

    async fn update_import_log(&self, log: &ImportLog) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        match state.logs.iter_mut().find(|l| l.batch_id == log.batch_id) {
            Some(existing) => {
                *existing = log.clone();
                Ok(())
            }
            None => Err(StoreError::Rejected(format!(
                "unknown import log {}",
                log.batch_id
            ))),
        }
    }

    async fn list_import_logs(&self, limit: usize) -> Result<Vec<ImportLog>, StoreError> {
        Ok(self
            .state
            .lock()
            .logs
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}
