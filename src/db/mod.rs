//! SQLite persistence for imported records.
//!
//! Uses SQLx with SQLite for lightweight, embedded database storage.
//! [`SqliteStore`] implements [`ImportStore`]:
//! - Notation and song upserts keyed by natural key
//! - Drumblock replacement per notation
//! - Import log bookkeeping
//!
//! Parsed notations, embed modules and drumblock events are stored as JSON
//! TEXT next to the original column values.
//!
//! # Example
//!
//! ```ignore
//! use groove_import::db::{db_url, init_db, SqliteStore};
//!
//! let pool = init_db(&db_url(None)).await?;
//! let store = SqliteStore::new(pool);
//! let logs = store.list_import_logs(10).await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqliteConnection;
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::import::{
    BatchOutcome, ImportLog, ImportStore, NotationRecord, SongRecord, StoreError, Stored,
    WriteKind,
};
use crate::notation::DrumBlock;

/// Default database filename.
pub const DEFAULT_DB_NAME: &str = "groove_import.db";

/// Build a SQLite database URL from an optional path.
///
/// If no path is provided, uses [`DEFAULT_DB_NAME`] in the current directory.
pub fn db_url(path: Option<&std::path::Path>) -> String {
    match path {
        Some(p) => format!("sqlite:{}", p.display()),
        None => format!("sqlite:{}", DEFAULT_DB_NAME),
    }
}

/// Initialize the database connection pool and run migrations.
///
/// Creates the database file if it doesn't exist, establishes a connection
/// pool with up to 5 connections, and runs all pending migrations.
///
/// # Errors
///
/// Returns an error if:
/// - Database creation fails
/// - Connection cannot be established
/// - Migration fails
pub async fn init_db(db_url: &str) -> Result<SqlitePool, sqlx::Error> {
    if !sqlx::Sqlite::database_exists(db_url).await.unwrap_or(false) {
        tracing::info!(target: "db", "Creating database {}", db_url);
        sqlx::Sqlite::create_database(db_url).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        let unavailable = matches!(
            e,
            sqlx::Error::PoolTimedOut
                | sqlx::Error::PoolClosed
                | sqlx::Error::Io(_)
                | sqlx::Error::Tls(_)
                | sqlx::Error::WorkerCrashed
                | sqlx::Error::Configuration(_)
        );
        if unavailable {
            StoreError::Unavailable(e.to_string())
        } else {
            StoreError::Rejected(e.to_string())
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Encode(e.to_string()))
}

fn opt_json<T: Serialize>(value: Option<&T>) -> Result<Option<String>, StoreError> {
    value.map(to_json).transpose()
}

// ============================================================================
// Upserts
// ============================================================================

async fn existing_id(
    conn: &mut SqliteConnection,
    sql: &str,
    keys: &[&str],
) -> sqlx::Result<Option<i64>> {
    let mut query = sqlx::query_as::<_, (i64,)>(sql);
    for key in keys {
        query = query.bind(*key);
    }
    Ok(query.fetch_optional(&mut *conn).await?.map(|(id,)| id))
}

/// Insert or update a notation by natural key.
async fn upsert_notation(
    conn: &mut SqliteConnection,
    record: &NotationRecord,
) -> Result<Stored, StoreError> {
    let existing = existing_id(
        conn,
        "SELECT id FROM notations WHERE natural_key = ?",
        &[record.natural_key.as_str()],
    )
    .await?;

    let parsed = record.parsed();
    let notation_embed = record.notation.as_ref().and_then(|n| n.embed.as_ref());

    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO notations (
            natural_key, title, description, category, chapter, sequence,
            raw_notation, parsed_notation, parser_status, parser_version, notation_embed,
            video, video_embed, musescore, musicxml, pdf_lesson, mp3,
            content, needs_review, source_line
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(natural_key) DO UPDATE SET
            title = excluded.title,
            description = excluded.description,
            category = excluded.category,
            chapter = excluded.chapter,
            sequence = excluded.sequence,
            raw_notation = excluded.raw_notation,
            parsed_notation = excluded.parsed_notation,
            parser_status = excluded.parser_status,
            parser_version = excluded.parser_version,
            notation_embed = excluded.notation_embed,
            video = excluded.video,
            video_embed = excluded.video_embed,
            musescore = excluded.musescore,
            musicxml = excluded.musicxml,
            pdf_lesson = excluded.pdf_lesson,
            mp3 = excluded.mp3,
            content = excluded.content,
            needs_review = excluded.needs_review,
            source_line = excluded.source_line,
            updated_at = CURRENT_TIMESTAMP
        RETURNING id
        "#,
    )
    .bind(&record.natural_key)
    .bind(&record.title)
    .bind(&record.description)
    .bind(&record.category)
    .bind(&record.chapter)
    .bind(&record.sequence)
    .bind(record.notation.as_ref().map(|n| n.raw.as_str()))
    .bind(opt_json(parsed)?)
    .bind(parsed.map(|p| p.status.as_str()))
    .bind(parsed.map(|p| p.meta.parser_version.as_str()))
    .bind(opt_json(notation_embed)?)
    .bind(record.video.as_ref().map(|v| v.embed.raw.as_str()))
    .bind(opt_json(record.video.as_ref())?)
    .bind(record.musescore.as_deref())
    .bind(record.musicxml.as_deref())
    .bind(record.pdf_lesson.as_deref())
    .bind(record.mp3.as_deref())
    .bind(&record.content)
    .bind(record.needs_review)
    .bind(record.line as i64)
    .fetch_one(&mut *conn)
    .await?;

    Ok(Stored {
        id,
        line: record.line,
        write: if existing.is_some() {
            WriteKind::Updated
        } else {
            WriteKind::Inserted
        },
    })
}

/// Insert or update a song by `(title, artist)`.
async fn upsert_song(conn: &mut SqliteConnection, record: &SongRecord) -> Result<Stored, StoreError> {
    let existing = existing_id(
        conn,
        "SELECT id FROM songs WHERE natural_key = ?",
        &[record.natural_key.as_str()],
    )
    .await?;

    let raw = |module: &Option<crate::embed::EmbedModule>| {
        module.as_ref().map(|m| m.embed.raw.clone())
    };

    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO songs (
            natural_key, title, artist, genre, bpm, length, description,
            youtube, youtube_embed, spotify, spotify_embed, apple_music, apple_music_embed,
            lyrics, notations, content, needs_review, source_line
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(natural_key) DO UPDATE SET
            title = excluded.title,
            artist = excluded.artist,
            genre = excluded.genre,
            bpm = excluded.bpm,
            length = excluded.length,
            description = excluded.description,
            youtube = excluded.youtube,
            youtube_embed = excluded.youtube_embed,
            spotify = excluded.spotify,
            spotify_embed = excluded.spotify_embed,
            apple_music = excluded.apple_music,
            apple_music_embed = excluded.apple_music_embed,
            lyrics = excluded.lyrics,
            notations = excluded.notations,
            content = excluded.content,
            needs_review = excluded.needs_review,
            source_line = excluded.source_line,
            updated_at = CURRENT_TIMESTAMP
        RETURNING id
        "#,
    )
    .bind(&record.natural_key)
    .bind(&record.title)
    .bind(&record.artist)
    .bind(record.genre.as_deref())
    .bind(record.bpm.as_deref())
    .bind(record.length.as_deref())
    .bind(&record.description)
    .bind(raw(&record.youtube))
    .bind(opt_json(record.youtube.as_ref())?)
    .bind(raw(&record.spotify))
    .bind(opt_json(record.spotify.as_ref())?)
    .bind(raw(&record.apple_music))
    .bind(opt_json(record.apple_music.as_ref())?)
    .bind(record.lyrics.as_deref())
    .bind(to_json(&record.notations)?)
    .bind(&record.content)
    .bind(record.needs_review)
    .bind(record.line as i64)
    .fetch_one(&mut *conn)
    .await?;

    Ok(Stored {
        id,
        line: record.line,
        write: if existing.is_some() {
            WriteKind::Updated
        } else {
            WriteKind::Inserted
        },
    })
}

// ============================================================================
// Import logs
// ============================================================================

/// Import log row as stored.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ImportLogRow {
    batch_id: String,
    file_type: String,
    file_name: String,
    total_rows: i64,
    inserted: i64,
    updated: i64,
    skipped: i64,
    embedded: i64,
    fallback: i64,
    drumblocks: i64,
    needs_review: i64,
    error_count: i64,
    error_details: String,
    status: String,
    started_at: String,
    completed_at: Option<String>,
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Decode(format!("timestamp '{value}': {e}")))
}

impl TryFrom<ImportLogRow> for ImportLog {
    type Error = StoreError;

    fn try_from(row: ImportLogRow) -> Result<Self, Self::Error> {
        let count = |value: i64| value.max(0) as usize;
        Ok(ImportLog {
            file_type: row.file_type.parse().map_err(StoreError::Decode)?,
            status: row.status.parse().map_err(StoreError::Decode)?,
            error_details: serde_json::from_str(&row.error_details)
                .map_err(|e| StoreError::Decode(e.to_string()))?,
            started_at: parse_timestamp(&row.started_at)?,
            completed_at: row.completed_at.as_deref().map(parse_timestamp).transpose()?,
            batch_id: row.batch_id,
            file_name: row.file_name,
            total_rows: count(row.total_rows),
            inserted: count(row.inserted),
            updated: count(row.updated),
            skipped: count(row.skipped),
            embedded: count(row.embedded),
            fallback: count(row.fallback),
            drumblocks: count(row.drumblocks),
            needs_review: count(row.needs_review),
            error_count: count(row.error_count),
        })
    }
}

// ============================================================================
// Store
// ============================================================================

/// [`ImportStore`] backed by a SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) and migrate the database at `db_url`.
    pub async fn connect(db_url: &str) -> Result<Self, sqlx::Error> {
        Ok(Self::new(init_db(db_url).await?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Stored drumblocks of a notation, in block order.
    pub async fn drumblocks(&self, notation_id: i64) -> Result<Vec<DrumBlock>, StoreError> {
        let rows: Vec<(String, i64, i64, i64, String, String)> = sqlx::query_as(
            r#"
            SELECT block_id, block_index, start_step, length_steps, events, parser_version
            FROM drumblocks
            WHERE notation_id = ?
            ORDER BY block_index
            "#,
        )
        .bind(notation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(
                |(block_id, block_index, start_step, length_steps, events, parser_version)| {
                    Ok(DrumBlock {
                        block_id,
                        block_index: block_index as u32,
                        length_steps: length_steps as u32,
                        events: serde_json::from_str(&events)
                            .map_err(|e| StoreError::Decode(e.to_string()))?,
                        start_step: start_step as u32,
                        source: crate::notation::BlockSource {
                            notation_id: Some(notation_id),
                            parser_version,
                        },
                    })
                },
            )
            .collect()
    }
}

#[async_trait]
impl ImportStore for SqliteStore {
    async fn create_notation_batch(
        &self,
        records: &[NotationRecord],
    ) -> Result<BatchOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut stored = Vec::with_capacity(records.len());
        for record in records {
            stored.push(upsert_notation(&mut tx, record).await?);
        }
        tx.commit().await?;
        Ok(BatchOutcome { stored })
    }

    async fn create_notation(&self, record: &NotationRecord) -> Result<Stored, StoreError> {
        let mut conn = self.pool.acquire().await?;
        upsert_notation(&mut conn, record).await
    }

    async fn create_song_batch(&self, records: &[SongRecord]) -> Result<BatchOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut stored = Vec::with_capacity(records.len());
        for record in records {
            stored.push(upsert_song(&mut tx, record).await?);
        }
        tx.commit().await?;
        Ok(BatchOutcome { stored })
    }

    async fn create_song(&self, record: &SongRecord) -> Result<Stored, StoreError> {
        let mut conn = self.pool.acquire().await?;
        upsert_song(&mut conn, record).await
    }

    async fn replace_drumblocks(
        &self,
        notation_id: i64,
        blocks: &[DrumBlock],
    ) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM drumblocks WHERE notation_id = ?")
            .bind(notation_id)
            .execute(&mut *tx)
            .await?;

        for block in blocks {
            sqlx::query(
                r#"
                INSERT INTO drumblocks (
                    block_id, notation_id, block_index, start_step, length_steps,
                    events, parser_version
                )
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&block.block_id)
            .bind(notation_id)
            .bind(block.block_index as i64)
            .bind(block.start_step as i64)
            .bind(block.length_steps as i64)
            .bind(to_json(&block.events)?)
            .bind(&block.source.parser_version)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(target: "db", notation_id, blocks = blocks.len(), "Replaced drumblocks");
        Ok(blocks.len())
    }

    async fn create_import_log(&self, log: &ImportLog) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO import_logs (batch_id, file_type, file_name, total_rows, status, started_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&log.batch_id)
        .bind(log.file_type.as_str())
        .bind(&log.file_name)
        .bind(log.total_rows as i64)
        .bind(log.status.as_str())
        .bind(log.started_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_import_log(&self, log: &ImportLog) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE import_logs SET
                total_rows = ?, inserted = ?, updated = ?, skipped = ?,
                embedded = ?, fallback = ?, drumblocks = ?, needs_review = ?,
                error_count = ?, error_details = ?, status = ?, completed_at = ?
            WHERE batch_id = ?
            "#,
        )
        .bind(log.total_rows as i64)
        .bind(log.inserted as i64)
        .bind(log.updated as i64)
        .bind(log.skipped as i64)
        .bind(log.embedded as i64)
        .bind(log.fallback as i64)
        .bind(log.drumblocks as i64)
        .bind(log.needs_review as i64)
        .bind(log.error_count as i64)
        .bind(to_json(&log.error_details)?)
        .bind(log.status.as_str())
        .bind(log.completed_at.map(|t| t.to_rfc3339()))
        .bind(&log.batch_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Rejected(format!(
                "unknown import log {}",
                log.batch_id
            )));
        }
        Ok(())
    }

    async fn list_import_logs(&self, limit: usize) -> Result<Vec<ImportLog>, StoreError> {
        let rows = sqlx::query_as::<_, ImportLogRow>(
            r#"
            SELECT batch_id, file_type, file_name, total_rows, inserted, updated, skipped,
                   embedded, fallback, drumblocks, needs_review, error_count, error_details,
                   status, started_at, completed_at
            FROM import_logs
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ImportLog::try_from).collect()
    }
}
