//! Test utilities and fixtures for groove-import tests.
//!
//! This module provides common test helpers, CSV fixtures, and
//! database utilities to reduce boilerplate in tests.
//!
//! # Example
//!
//! ```ignore
//! use groove_import::test_utils::{temp_db, NOTATION_CSV};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let (pool, _dir) = temp_db().await;
//!     let table = parse_csv(NOTATION_CSV);
//!     // ... test logic
//! }
//! ```

use std::path::PathBuf;

use sqlx::sqlite::SqlitePool;
use tempfile::TempDir;

use crate::csv::CsvRow;

/// Notation export with a skipped row, a partial parse, a GrooveScribe
/// query and a chapter-only row.
pub const NOTATION_CSV: &str = "\
noCategorie;noHoofdstuk;noVolgnummer;noNotatie;noVideo
Rock;Basics;1;x-x-x-x-x-x-x-x-|k---s---k---s---;https://youtu.be/dQw4w9WgXcQ
Rock;Basics;2;x-x-?-x-;not a url
Jazz;Brushes;1;?TimeSig=4/4&Div=16&H=x-x-x-x-&S=----o---;
Misc;;;;
;Fills;;;
";

/// Song export with embeddable media, a GrooveScribe notation slot, a row
/// without title or artist, and an unrecognized Spotify link.
pub const SONG_CSV: &str = "\
soTitel;soArtiest;soGenre;soBPM;soYouTube;soSpotify;soNotatie01;soOpmerkingen01
Back in Black;AC/DC;Rock;94;https://youtu.be/pAgnJDJN4VA;https://open.spotify.com/track/08mG3Y1vljYA6bvDt4Wqkj;;
Rosanna;Toto;Rock;86;;;?TimeSig=4/4&Div=12&H=x-x&S=-o-;Half-time shuffle
;;Pop;120;;;;
Africa;Toto;Pop;93;;https://example.com/africa;;
";

/// Creates a temporary database for testing.
///
/// The database is created in a temporary directory that is automatically
/// cleaned up when the returned `TempDir` is dropped. Migrations are run
/// automatically.
///
/// # Returns
///
/// A tuple of (connection pool, temp directory handle).
/// Keep the TempDir alive for the duration of your test.
///
/// # Example
///
/// ```ignore
/// let (pool, _dir) = temp_db().await;
/// // Use pool for database operations
/// // Database is deleted when _dir goes out of scope
/// ```
pub async fn temp_db() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = dir.path().join("test.db");
    let db_url = format!("sqlite:{}", db_path.display());

    let pool = crate::db::init_db(&db_url)
        .await
        .expect("Failed to initialize test database");

    (pool, dir)
}

/// Builds a CSV row at the given 1-based source line, as if the header
/// were line 1 with no blank lines before it.
///
/// ```ignore
/// let row = csv_row(2, &[("soTitel", "Rosanna"), ("soArtiest", "Toto")]);
/// ```
pub fn csv_row(line: usize, fields: &[(&str, &str)]) -> CsvRow {
    CsvRow::new(
        line.saturating_sub(1),
        line,
        fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
    )
}

/// Writes `content` as Latin-1 bytes into a fresh temp directory.
///
/// Every char must be in U+0000..=U+00FF.
pub fn write_latin1_file(name: &str, content: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let path = dir.path().join(name);
    let bytes: Vec<u8> = content
        .chars()
        .map(|c| u8::try_from(u32::from(c)).expect("char outside Latin-1"))
        .collect();
    std::fs::write(&path, bytes).expect("Failed to write fixture");
    (dir, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv::parse_csv;

    #[tokio::test]
    async fn test_temp_db_creates_working_database() {
        let (pool, _dir) = temp_db().await;

        // Should be able to query
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_fixtures_parse() {
        let notations = parse_csv(NOTATION_CSV);
        assert_eq!(notations.delimiter, ';');
        assert_eq!(notations.rows.len(), 5);
        assert_eq!(notations.rows[0].line, 2);

        let songs = parse_csv(SONG_CSV);
        assert_eq!(songs.headers.len(), 8);
        assert_eq!(songs.rows.len(), 4);
        assert_eq!(songs.rows[1].get("soOpmerkingen01"), "Half-time shuffle");
    }

    #[test]
    fn test_csv_row_lookup() {
        let row = csv_row(7, &[("soTitel", " Rosanna "), ("soBPM", "nan")]);
        assert_eq!(row.line, 7);
        assert_eq!(row.get("soTitel"), "Rosanna");
        assert_eq!(row.get("soBPM"), "");
    }

    #[test]
    fn test_write_latin1_file() {
        let (_dir, path) = write_latin1_file("x.csv", "Caf\u{e9}");
        assert_eq!(std::fs::read(path).unwrap(), b"Caf\xe9");
    }
}
