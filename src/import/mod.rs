//! Import orchestration.
//!
//! Drives one legacy export through the pipeline: decode, tokenize,
//! transform each row, persist in batches, derive drumblocks and keep an
//! [`ImportLog`] of the run.
//!
//! Rows are processed strictly in file order. A rejected batch is retried
//! row by row so one bad row cannot block its neighbours; only an unreachable
//! store or an unreadable file aborts the run.
//!
//! # Example
//!
//! ```ignore
//! use groove_import::import::{run_import_file, ImportKind};
//! use groove_import::import::store::MemoryStore;
//!
//! let store = MemoryStore::new();
//! let summary = run_import_file(&store, ImportKind::Notations, path, &config).await?;
//! println!("{summary}");
//! ```

pub mod log;
pub mod records;
pub mod store;

use async_trait::async_trait;
use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::csv::{CsvTable, decode_legacy, parse_csv};
use crate::embed::EmbedNormalizer;
use crate::notation::{BlockSource, ParserStatus, segment_drumblocks};

pub use log::{ImportLog, ImportStatus, RowError};
pub use records::{NotationRecord, SongRecord};
pub use store::{BatchOutcome, ImportStore, MemoryStore, Stored, StoreError, WriteKind};

/// Which legacy export a file is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    /// Drum notation lessons (`POS_Notatie`)
    Notations,
    /// Song library (`POS_Songs`)
    Songs,
}

impl ImportKind {
    /// Convert to string representation for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportKind::Notations => "notations",
            ImportKind::Songs => "songs",
        }
    }
}

impl std::str::FromStr for ImportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "notations" => Ok(ImportKind::Notations),
            "songs" => Ok(ImportKind::Songs),
            other => Err(format!("unknown import kind '{other}'")),
        }
    }
}

/// Errors that abort an import run.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Import aborted: {0}")]
    Store(#[from] StoreError),
}

/// Outcome of a run that reached the end of its input.
#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub log: ImportLog,
    pub elapsed: Duration,
}

impl std::fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let log = &self.log;
        writeln!(f, "Import {} ({}) {}", log.file_name, log.file_type.as_str(), log.status)?;
        writeln!(f, "  Batch:        {}", log.batch_id)?;
        writeln!(f, "  Rows:         {}", log.total_rows)?;
        writeln!(f, "  Inserted:     {}", log.inserted)?;
        writeln!(f, "  Updated:      {}", log.updated)?;
        writeln!(f, "  Skipped:      {}", log.skipped)?;
        writeln!(f, "  Embedded:     {}", log.embedded)?;
        writeln!(f, "  Fallback:     {}", log.fallback)?;
        writeln!(f, "  Drumblocks:   {}", log.drumblocks)?;
        writeln!(f, "  Needs review: {}", log.needs_review)?;
        write!(f, "  Errors:       {}", log.error_count)?;
        for error in &log.error_details {
            write!(f, "\n    line {}: {}", error.row_index, error.message)?;
        }
        if log.error_details.len() < log.error_count {
            write!(
                f,
                "\n    ... {} more",
                log.error_count - log.error_details.len()
            )?;
        }
        write!(f, "\n  Time:         {:.2?}", self.elapsed)
    }
}

/// Run-level settings taken from [`Config`].
#[derive(Debug, Clone)]
pub struct ImportSettings {
    pub batch_size: usize,
    pub max_error_details: usize,
    pub drumblock_length: u32,
}

impl From<&Config> for ImportSettings {
    fn from(config: &Config) -> Self {
        Self {
            batch_size: config.import.batch_size.max(1),
            max_error_details: config.import.max_error_details,
            drumblock_length: config.import.drumblock_length,
        }
    }
}

// ============================================================================
// Persistable records
// ============================================================================

/// A record kind the store can write in batches or one at a time.
#[async_trait]
trait Persistable: Send + Sync + Sized {
    fn line(&self) -> usize;

    fn needs_review(&self) -> bool;

    /// `(embedded, fallback)` counts of the record's media references
    fn embed_counts(&self) -> (usize, usize);

    async fn write_batch<S: ImportStore + ?Sized>(
        store: &S,
        batch: &[Self],
    ) -> Result<BatchOutcome, StoreError>;

    async fn write_one<S: ImportStore + ?Sized>(store: &S, record: &Self)
    -> Result<Stored, StoreError>;
}

fn count_embeds<'a>(modules: impl Iterator<Item = &'a crate::embed::EmbedModule>) -> (usize, usize) {
    modules.fold((0, 0), |(embedded, fallback), module| {
        if module.is_embedded() {
            (embedded + 1, fallback)
        } else {
            (embedded, fallback + 1)
        }
    })
}

#[async_trait]
impl Persistable for NotationRecord {
    fn line(&self) -> usize {
        self.line
    }

    fn needs_review(&self) -> bool {
        self.needs_review
    }

    fn embed_counts(&self) -> (usize, usize) {
        count_embeds(self.embeds())
    }

    async fn write_batch<S: ImportStore + ?Sized>(
        store: &S,
        batch: &[Self],
    ) -> Result<BatchOutcome, StoreError> {
        store.create_notation_batch(batch).await
    }

    async fn write_one<S: ImportStore + ?Sized>(
        store: &S,
        record: &Self,
    ) -> Result<Stored, StoreError> {
        store.create_notation(record).await
    }
}

#[async_trait]
impl Persistable for SongRecord {
    fn line(&self) -> usize {
        self.line
    }

    fn needs_review(&self) -> bool {
        self.needs_review
    }

    fn embed_counts(&self) -> (usize, usize) {
        count_embeds(self.embeds())
    }

    async fn write_batch<S: ImportStore + ?Sized>(
        store: &S,
        batch: &[Self],
    ) -> Result<BatchOutcome, StoreError> {
        store.create_song_batch(batch).await
    }

    async fn write_one<S: ImportStore + ?Sized>(
        store: &S,
        record: &Self,
    ) -> Result<Stored, StoreError> {
        store.create_song(record).await
    }
}

/// Count one written record into the run totals.
fn tally<R: Persistable>(log: &mut ImportLog, record: &R, stored: &Stored) {
    match stored.write {
        WriteKind::Inserted => log.inserted += 1,
        WriteKind::Updated => log.updated += 1,
    }
    let (embedded, fallback) = record.embed_counts();
    log.embedded += embedded;
    log.fallback += fallback;
    if record.needs_review() {
        log.needs_review += 1;
    }
}

// ============================================================================
// Importer
// ============================================================================

/// Runs imports against one store.
pub struct Importer<'a, S: ImportStore + ?Sized> {
    store: &'a S,
    settings: ImportSettings,
    normalizer: EmbedNormalizer,
}

impl<'a, S: ImportStore + ?Sized> Importer<'a, S> {
    pub fn new(store: &'a S, config: &Config) -> Self {
        Self {
            store,
            settings: ImportSettings::from(config),
            normalizer: EmbedNormalizer::new(config.embed.groovescribe_host.clone()),
        }
    }

    /// Import an already tokenized table.
    ///
    /// Returns `Err` only when the store becomes unreachable; the log is
    /// then closed as failed before returning.
    pub async fn run(
        &self,
        kind: ImportKind,
        file_name: &str,
        table: &CsvTable,
    ) -> Result<ImportSummary, ImportError> {
        let started = Instant::now();
        let mut log = ImportLog::start(kind, file_name, table.rows.len());
        self.store.create_import_log(&log).await?;

        tracing::info!(
            target: "import::run",
            batch_id = %log.batch_id,
            kind = kind.as_str(),
            rows = table.rows.len(),
            "Starting import of {}",
            file_name
        );

        let result = match kind {
            ImportKind::Notations => self.import_notations(table, &mut log).await,
            ImportKind::Songs => self.import_songs(table, &mut log).await,
        };

        if let Err(e) = result {
            tracing::error!(target: "import::run", batch_id = %log.batch_id, "Import aborted: {}", e);
            if log.status == ImportStatus::Running {
                log.fail(RowError::new(0, e.to_string()), self.settings.max_error_details);
            }
            if let Err(update_err) = self.store.update_import_log(&log).await {
                tracing::warn!(target: "import::run", "Could not record failed run: {}", update_err);
            }
            return Err(e.into());
        }

        log.finish();
        self.store.update_import_log(&log).await?;

        tracing::info!(
            target: "import::run",
            batch_id = %log.batch_id,
            inserted = log.inserted,
            updated = log.updated,
            skipped = log.skipped,
            errors = log.error_count,
            status = log.status.as_str(),
            "Import finished"
        );

        Ok(ImportSummary {
            log,
            elapsed: started.elapsed(),
        })
    }

    async fn import_notations(
        &self,
        table: &CsvTable,
        log: &mut ImportLog,
    ) -> Result<(), StoreError> {
        let records = self.transform(table, log, NotationRecord::from_row);
        let stored = self.persist(&records, log).await?;
        self.derive_drumblocks(&records, &stored, log).await;
        Ok(())
    }

    async fn import_songs(&self, table: &CsvTable, log: &mut ImportLog) -> Result<(), StoreError> {
        let records = self.transform(table, log, SongRecord::from_row);
        self.persist(&records, log).await?;
        Ok(())
    }

    /// Transform every row, counting the ones without their mandatory fields.
    fn transform<R: Persistable>(
        &self,
        table: &CsvTable,
        log: &mut ImportLog,
        build: impl Fn(&crate::csv::CsvRow, &EmbedNormalizer) -> Option<R>,
    ) -> Vec<R> {
        let mut records = Vec::with_capacity(table.rows.len());
        for row in &table.rows {
            match build(row, &self.normalizer) {
                Some(record) => {
                    if record.needs_review() {
                        tracing::warn!(
                            target: "import::run",
                            line = row.line,
                            "Text still looks mis-decoded after cleaning, flagged for review"
                        );
                    }
                    records.push(record);
                }
                None => {
                    tracing::debug!(target: "import::run", line = row.line, "Skipping row without mandatory fields");
                    log.skipped += 1;
                }
            }
        }
        records
    }

    /// Write records in batches, falling back to single writes for a batch
    /// the store refuses. Returns `(record index, stored)` for every record
    /// that was written.
    async fn persist<R: Persistable>(
        &self,
        records: &[R],
        log: &mut ImportLog,
    ) -> Result<Vec<(usize, Stored)>, StoreError> {
        let cap = self.settings.max_error_details;
        let mut written = Vec::with_capacity(records.len());

        for (chunk_index, chunk) in records.chunks(self.settings.batch_size).enumerate() {
            let offset = chunk_index * self.settings.batch_size;

            match R::write_batch(self.store, chunk).await {
                Ok(outcome) => {
                    tracing::debug!(
                        target: "import::batch",
                        batch = chunk_index,
                        inserted = outcome.inserted(),
                        updated = outcome.updated(),
                        "Batch written"
                    );
                    for (i, (record, stored)) in chunk.iter().zip(outcome.stored).enumerate() {
                        tally(log, record, &stored);
                        written.push((offset + i, stored));
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        target: "import::batch",
                        batch = chunk_index,
                        rows = chunk.len(),
                        "Batch write failed, retrying row by row: {}",
                        e
                    );
                    for (i, record) in chunk.iter().enumerate() {
                        match R::write_one(self.store, record).await {
                            Ok(stored) => {
                                tally(log, record, &stored);
                                written.push((offset + i, stored));
                            }
                            Err(e) if e.is_fatal() => {
                                log.fail(RowError::new(record.line(), e.to_string()), cap);
                                return Err(e);
                            }
                            Err(e) => {
                                tracing::warn!(
                                    target: "import::batch",
                                    line = record.line(),
                                    "Row rejected: {}",
                                    e
                                );
                                log.record_error(RowError::new(record.line(), e.to_string()), cap);
                            }
                        }
                    }
                }
            }
        }

        Ok(written)
    }

    /// Cut every stored `ok` notation into drumblocks.
    ///
    /// Any other notation has its blocks cleared, so a re-import that no
    /// longer parses cleanly leaves none behind. A key written more than
    /// once is cut from its last row only. Failures are recorded against
    /// the notation's line; the notation itself stays committed.
    async fn derive_drumblocks(
        &self,
        records: &[NotationRecord],
        stored: &[(usize, Stored)],
        log: &mut ImportLog,
    ) {
        let last_write: HashMap<i64, usize> = stored
            .iter()
            .enumerate()
            .map(|(position, (_, stored))| (stored.id, position))
            .collect();

        for (position, (index, stored)) in stored.iter().enumerate() {
            if last_write.get(&stored.id) != Some(&position) {
                continue;
            }

            let blocks = match records[*index].parsed() {
                Some(parsed) if parsed.status == ParserStatus::Ok => {
                    let source = BlockSource {
                        notation_id: Some(stored.id),
                        parser_version: parsed.meta.parser_version.clone(),
                    };
                    segment_drumblocks(parsed, self.settings.drumblock_length, source)
                }
                _ => Vec::new(),
            };

            match self.store.replace_drumblocks(stored.id, &blocks).await {
                Ok(count) => log.drumblocks += count,
                Err(e) => {
                    tracing::warn!(
                        target: "import::drumblocks",
                        notation_id = stored.id,
                        line = stored.line,
                        "Drumblock derivation failed: {}",
                        e
                    );
                    log.record_error(
                        RowError::new(stored.line, format!("drumblocks: {e}")),
                        self.settings.max_error_details,
                    );
                }
            }
        }
    }
}

/// Read, decode and import one legacy export file.
pub async fn run_import_file<S: ImportStore + ?Sized>(
    store: &S,
    kind: ImportKind,
    path: &Path,
    config: &Config,
) -> Result<ImportSummary, ImportError> {
    let bytes = std::fs::read(path).map_err(|source| ImportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let text = decode_legacy(&bytes, config.import.encoding);
    let table = parse_csv(&text);

    tracing::debug!(
        target: "import::run",
        path = %path.display(),
        delimiter = %table.delimiter,
        columns = table.headers.len(),
        "Parsed CSV"
    );

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Importer::new(store, config).run(kind, &file_name, &table).await
}
