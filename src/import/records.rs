//! Row transformation.
//!
//! Turns CSV rows of the two legacy exports into records ready for
//! persistence. Original field values are kept next to their parsed and
//! normalized companions; nothing derived ever replaces the source text.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::csv::{CsvRow, clean_text, has_residual_mojibake};
use crate::embed::{EmbedKind, EmbedModule, EmbedNormalizer};
use crate::notation::{NotationFormat, ParseOptions, ParsedNotation, parse_notation};

/// Values the legacy exports use for "no value" in numeric columns.
fn is_blank_number(value: &str) -> bool {
    value.is_empty() || value == "0"
}

/// Column aliases, current header first.
mod columns {
    pub const CATEGORY: &[&str] = &["noCategorie", "categorie"];
    pub const CHAPTER: &[&str] = &["noHoofdstuk", "hoofdstuk"];
    pub const SEQUENCE: &[&str] = &["noVolgnummer", "volgnummer"];
    pub const REMARKS: &[&str] = &["noOpmerkingen", "opmerkingen"];
    pub const NOTATION: &[&str] = &["noNotatie", "notatie"];
    pub const VIDEO: &[&str] = &["noVideo", "video"];
    pub const MUSESCORE: &[&str] = &["noMusescore", "musescore"];
    pub const MUSICXML: &[&str] = &["musicxml"];
    pub const PDF_LESSON: &[&str] = &["noPDFlesson", "pdf_lesson"];
    pub const MP3: &[&str] = &["noMP3", "mp3"];

    pub const TITLE: &[&str] = &["soTitel", "titel"];
    pub const ARTIST: &[&str] = &["soArtiest", "artiest"];
    pub const GENRE: &[&str] = &["soGenre", "genre"];
    pub const BPM: &[&str] = &["soBPM", "bpm"];
    pub const LENGTH: &[&str] = &["soLengte", "lengte"];
    pub const YOUTUBE: &[&str] = &["soYouTube", "youtube"];
    pub const SPOTIFY: &[&str] = &["soSpotify", "spotify"];
    pub const APPLE_MUSIC: &[&str] = &["soAppleMusic", "apple_music"];
    pub const LYRICS: &[&str] = &["soLyrics", "lyrics"];
    pub const SONG_NOTATIONS: [(&[&str], &[&str]); 3] = [
        (&["soNotatie01", "notatie01"], &["soOpmerkingen01", "opmerkingen01"]),
        (&["soNotatie02", "notatie02"], &["soOpmerkingen02", "opmerkingen02"]),
        (&["soNotatie03", "notatie03"], &["soOpmerkingen03", "opmerkingen03"]),
    ];
}

/// Untouched value of the first alias that holds content.
fn original(row: &CsvRow, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find(|name| !row.get(name).is_empty())
        .and_then(|name| row.raw(name))
        .map(str::to_string)
}

/// A cleaned human-authored text field, tracking mojibake left after cleaning.
struct TextCleaner {
    needs_review: bool,
}

impl TextCleaner {
    fn new() -> Self {
        Self { needs_review: false }
    }

    fn clean(&mut self, value: &str) -> String {
        let cleaned = clean_text(value);
        if has_residual_mojibake(&cleaned) {
            self.needs_review = true;
        }
        cleaned
    }

    fn clean_opt(&mut self, value: &str) -> Option<String> {
        Some(self.clean(value)).filter(|v| !v.is_empty())
    }
}

/// A notation field with its parse result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotationField {
    /// The field exactly as it appeared in the file
    pub raw: String,
    pub parsed: ParsedNotation,
    /// Player embed for GrooveScribe notations
    pub embed: Option<EmbedModule>,
}

impl NotationField {
    fn new(raw: String, normalizer: &EmbedNormalizer) -> Self {
        let parsed = parse_notation(&raw, &ParseOptions::default());
        let embed = (parsed.format == Some(NotationFormat::GrooveScribe))
            .then(|| normalizer.normalize(&raw, EmbedKind::Notation));
        Self { raw, parsed, embed }
    }

    /// What the lesson body shows: the player when embeddable, else the text.
    fn content(&self) -> String {
        self.embed
            .as_ref()
            .and_then(EmbedModule::iframe_html)
            .unwrap_or_else(|| self.raw.trim().to_string())
    }
}

/// Body text for a media reference: the player when embeddable, else the link.
fn media_content(module: &EmbedModule) -> String {
    module
        .iframe_html()
        .unwrap_or_else(|| module.embed.raw.trim().to_string())
}

/// One row of the notation export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotationRecord {
    /// 1-based source line
    pub line: usize,
    /// Upsert key; a re-import updates instead of duplicating
    pub natural_key: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub chapter: String,
    pub sequence: String,
    pub notation: Option<NotationField>,
    pub video: Option<EmbedModule>,
    pub musescore: Option<String>,
    pub musicxml: Option<String>,
    pub pdf_lesson: Option<String>,
    pub mp3: Option<String>,
    /// Lesson body assembled from the fields above
    pub content: String,
    /// Text still looks mis-decoded after cleaning
    pub needs_review: bool,
}

impl NotationRecord {
    /// Transform a row; `None` when it has neither notation nor chapter.
    pub fn from_row(row: &CsvRow, normalizer: &EmbedNormalizer) -> Option<Self> {
        let raw_notation = original(row, columns::NOTATION);
        let chapter_value = row.get_any(columns::CHAPTER);
        if raw_notation.is_none() && chapter_value.is_empty() {
            return None;
        }

        let mut cleaner = TextCleaner::new();
        let category = cleaner.clean(row.get_any(columns::CATEGORY));
        let chapter = cleaner.clean(chapter_value);
        let sequence = cleaner.clean(row.get_any(columns::SEQUENCE));
        let description = cleaner.clean(row.get_any(columns::REMARKS));

        let title = match (category.is_empty(), chapter.is_empty(), sequence.is_empty()) {
            (false, false, false) => format!("{category} – {chapter} – #{sequence}"),
            (false, _, false) => format!("{category} – #{sequence}"),
            _ => format!("Pattern #{}", row.number),
        };

        let notation = raw_notation.map(|raw| NotationField::new(raw, normalizer));
        let natural_key = if category.is_empty() && chapter.is_empty() && sequence.is_empty() {
            let raw = notation.as_ref().map(|n| n.raw.as_str()).unwrap_or_default();
            format!("notation:{:x}", Sha256::digest(raw.as_bytes()))
        } else {
            format!("{category}|{chapter}|{sequence}")
        };

        let video = original(row, columns::VIDEO).map(|v| normalizer.normalize(&v, EmbedKind::Video));
        let link = |names: &[&str]| Some(row.get_any(names).to_string()).filter(|v| !v.is_empty());
        let musescore = link(columns::MUSESCORE);
        let musicxml = link(columns::MUSICXML);
        let pdf_lesson = link(columns::PDF_LESSON);
        let mp3 = link(columns::MP3);

        let mut content = Vec::new();
        if let Some(field) = &notation {
            content.push(field.content());
        }
        if let Some(module) = &video {
            content.push(format!("Video: {}", media_content(module)));
        }
        for (label, value) in [
            ("MuseScore", &musescore),
            ("MusicXML", &musicxml),
            ("PDF", &pdf_lesson),
            ("MP3", &mp3),
        ] {
            if let Some(value) = value {
                content.push(format!("{label}: {value}"));
            }
        }

        Some(Self {
            line: row.line,
            natural_key,
            title,
            description,
            category,
            chapter,
            sequence,
            notation,
            video,
            musescore,
            musicxml,
            pdf_lesson,
            mp3,
            content: content.join("\n\n"),
            needs_review: cleaner.needs_review,
        })
    }

    /// The parse result, if the row carried notation text.
    pub fn parsed(&self) -> Option<&ParsedNotation> {
        self.notation.as_ref().map(|n| &n.parsed)
    }

    /// Every normalized media reference on this record.
    pub fn embeds(&self) -> impl Iterator<Item = &EmbedModule> {
        self.notation
            .iter()
            .filter_map(|n| n.embed.as_ref())
            .chain(self.video.iter())
    }
}

/// A notation slot on a song row with its remark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongNotation {
    /// Slot number, 1 to 3
    pub slot: u8,
    pub notation: NotationField,
    pub remarks: Option<String>,
}

/// One row of the song export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongRecord {
    /// 1-based source line
    pub line: usize,
    pub title: String,
    pub artist: String,
    /// Upsert key: `title|artist`, plus the data row when either was defaulted
    pub natural_key: String,
    pub genre: Option<String>,
    pub bpm: Option<String>,
    pub length: Option<String>,
    pub description: String,
    pub youtube: Option<EmbedModule>,
    pub spotify: Option<EmbedModule>,
    pub apple_music: Option<EmbedModule>,
    pub lyrics: Option<String>,
    pub notations: Vec<SongNotation>,
    /// Song body assembled from the fields above
    pub content: String,
    /// Text still looks mis-decoded after cleaning
    pub needs_review: bool,
}

impl SongRecord {
    pub const DEFAULT_ARTIST: &'static str = "Unknown Artist";

    /// Transform a row; `None` when it has neither title nor artist.
    pub fn from_row(row: &CsvRow, normalizer: &EmbedNormalizer) -> Option<Self> {
        let title_value = row.get_any(columns::TITLE);
        let artist_value = row.get_any(columns::ARTIST);
        if title_value.is_empty() && artist_value.is_empty() {
            return None;
        }

        let mut cleaner = TextCleaner::new();
        let title = cleaner.clean_opt(title_value);
        let artist = cleaner.clean_opt(artist_value);
        // Placeholder names are not identities; two untitled rows stay two songs
        let natural_key = match (&title, &artist) {
            (Some(title), Some(artist)) => format!("{title}|{artist}"),
            _ => format!(
                "{}|{}|row:{}",
                title.as_deref().unwrap_or_default(),
                artist.as_deref().unwrap_or_default(),
                row.number
            ),
        };
        let title = title.unwrap_or_else(|| format!("Song #{}", row.number));
        let artist = artist.unwrap_or_else(|| Self::DEFAULT_ARTIST.to_string());

        let present = |names: &[&str]| {
            Some(row.get_any(names).to_string()).filter(|v| !is_blank_number(v))
        };
        let genre = present(columns::GENRE).map(|g| cleaner.clean(&g));
        let bpm = present(columns::BPM);
        let length = present(columns::LENGTH);

        let description = [("Genre", genre.as_ref()), ("BPM", bpm.as_ref()), ("Lengte", length.as_ref())]
            .into_iter()
            .filter_map(|(label, value)| value.map(|v| format!("{label}: {v}")))
            .collect::<Vec<_>>()
            .join(" | ");

        let media = |names: &[&str], kind| original(row, names).map(|v| normalizer.normalize(&v, kind));
        let youtube = media(columns::YOUTUBE, EmbedKind::Video);
        let spotify = media(columns::SPOTIFY, EmbedKind::Audio);
        let apple_music = media(columns::APPLE_MUSIC, EmbedKind::Audio);
        let lyrics = cleaner.clean_opt(row.get_any(columns::LYRICS));

        let notations: Vec<SongNotation> = columns::SONG_NOTATIONS
            .iter()
            .zip(1u8..)
            .filter_map(|((notation_columns, remark_columns), slot)| {
                let raw = original(row, notation_columns)?;
                Some(SongNotation {
                    slot,
                    notation: NotationField::new(raw, normalizer),
                    remarks: cleaner.clean_opt(row.get_any(remark_columns)),
                })
            })
            .collect();

        let mut content = Vec::new();
        if let Some(module) = &youtube {
            content.push(media_content(module));
        }
        if let Some(module) = &spotify {
            content.push(format!("Spotify: {}", media_content(module)));
        }
        if let Some(module) = &apple_music {
            content.push(format!("Apple Music: {}", media_content(module)));
        }
        if let Some(lyrics) = &lyrics {
            content.push(format!("Lyrics: {lyrics}"));
        }
        for song_notation in &notations {
            content.push(song_notation.notation.content());
            if let Some(remarks) = &song_notation.remarks {
                content.push(format!("Note: {remarks}"));
            }
        }

        Some(Self {
            line: row.line,
            title,
            artist,
            natural_key,
            genre,
            bpm,
            length,
            description,
            youtube,
            spotify,
            apple_music,
            lyrics,
            notations,
            content: content.join("\n\n"),
            needs_review: cleaner.needs_review,
        })
    }

    /// Every normalized media reference on this record.
    pub fn embeds(&self) -> impl Iterator<Item = &EmbedModule> {
        self.youtube
            .iter()
            .chain(self.spotify.iter())
            .chain(self.apple_music.iter())
            .chain(self.notations.iter().filter_map(|n| n.notation.embed.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::{EmbedStatus, Provider};
    use crate::notation::ParserStatus;
    use crate::test_utils::csv_row;

    fn normalizer() -> EmbedNormalizer {
        EmbedNormalizer::default()
    }

    #[test]
    fn test_notation_row_is_transformed() {
        let row = csv_row(
            4,
            &[
                ("noCategorie", "Rock"),
                ("noHoofdstuk", "Basics"),
                ("noVolgnummer", "3"),
                ("noOpmerkingen", "Caf\u{c3}\u{a9} groove"),
                ("noNotatie", "HH|x-x-x-x-|\nBD|o---o---|"),
                ("noVideo", "https://youtu.be/dQw4w9WgXcQ"),
                ("noMP3", "groove3.mp3"),
            ],
        );
        let record = NotationRecord::from_row(&row, &normalizer()).unwrap();

        assert_eq!(record.title, "Rock – Basics – #3");
        assert_eq!(record.description, "Café groove");
        assert_eq!(record.natural_key, "Rock|Basics|3");
        assert_eq!(record.line, 4);
        assert!(!record.needs_review);

        let notation = record.notation.as_ref().unwrap();
        assert_eq!(notation.raw, "HH|x-x-x-x-|\nBD|o---o---|");
        assert_eq!(notation.parsed.status, ParserStatus::Ok);
        assert!(notation.embed.is_none());

        let video = record.video.as_ref().unwrap();
        assert_eq!(video.status, EmbedStatus::Embedded);
        assert_eq!(record.embeds().count(), 1);

        assert!(record.content.contains("Video: <iframe"));
        assert!(record.content.ends_with("MP3: groove3.mp3"));
    }

    #[test]
    fn test_notation_skip_rule() {
        let empty = csv_row(2, &[("noCategorie", "Rock"), ("noNotatie", "nan")]);
        assert!(NotationRecord::from_row(&empty, &normalizer()).is_none());

        let chapter_only = csv_row(3, &[("noHoofdstuk", "Fills")]);
        let record = NotationRecord::from_row(&chapter_only, &normalizer()).unwrap();
        assert!(record.notation.is_none());
        assert_eq!(record.title, "Pattern #2");
    }

    #[test]
    fn test_default_titles_number_data_rows() {
        // Header on line 1, a blank line, then the data row on line 3
        let table = crate::csv::parse_csv("noHoofdstuk;noNotatie\n\nFills;x-x-\n");
        let record = NotationRecord::from_row(&table.rows[0], &normalizer()).unwrap();
        assert_eq!(table.rows[0].line, 3);
        assert_eq!(record.title, "Pattern #1");
    }

    #[test]
    fn test_untitled_songs_by_one_artist_stay_apart() {
        let first = csv_row(2, &[("soArtiest", "Toto"), ("soYouTube", "https://youtu.be/aaaaaaaaaaa")]);
        let second = csv_row(3, &[("soArtiest", "Toto"), ("soYouTube", "https://youtu.be/bbbbbbbbbbb")]);
        let first = SongRecord::from_row(&first, &normalizer()).unwrap();
        let second = SongRecord::from_row(&second, &normalizer()).unwrap();

        assert_eq!((first.title.as_str(), second.title.as_str()), ("Song #1", "Song #2"));
        assert_ne!(first.natural_key, second.natural_key);
    }

    #[test]
    fn test_notation_titles_and_keys() {
        let partial = csv_row(5, &[("noCategorie", "Jazz"), ("noVolgnummer", "7"), ("noNotatie", "x-x-")]);
        let record = NotationRecord::from_row(&partial, &normalizer()).unwrap();
        assert_eq!(record.title, "Jazz – #7");
        assert_eq!(record.natural_key, "Jazz||7");

        let keyless = csv_row(6, &[("notatie", "x-x-")]);
        let first = NotationRecord::from_row(&keyless, &normalizer()).unwrap();
        let again = NotationRecord::from_row(&csv_row(9, &[("notatie", "x-x-")]), &normalizer()).unwrap();
        assert!(first.natural_key.starts_with("notation:"));
        assert_eq!(first.natural_key.len(), "notation:".len() + 64);
        assert_eq!(first.natural_key, again.natural_key);
    }

    #[test]
    fn test_groovescribe_notation_gets_embed() {
        let row = csv_row(2, &[("noHoofdstuk", "Grooves"), ("noNotatie", "?TimeSig=4/4&H=x-x-&K=o---")]);
        let record = NotationRecord::from_row(&row, &normalizer()).unwrap();
        let embed = record.notation.as_ref().unwrap().embed.as_ref().unwrap();
        assert_eq!(embed.provider, Provider::Groovescribe);
        assert_eq!(embed.embed.raw, "?TimeSig=4/4&H=x-x-&K=o---");
        assert!(record.content.starts_with("<iframe width=\"100%\" height=\"240\""));
    }

    #[test]
    fn test_original_value_kept_untrimmed() {
        let row = csv_row(2, &[("noHoofdstuk", "A"), ("noNotatie", "  x-x-  ")]);
        let record = NotationRecord::from_row(&row, &normalizer()).unwrap();
        let notation = record.notation.unwrap();
        assert_eq!(notation.raw, "  x-x-  ");
        assert_eq!(notation.parsed.meta.raw_notation, "  x-x-  ");
    }

    #[test]
    fn test_residual_mojibake_flags_review() {
        let row = csv_row(2, &[("noHoofdstuk", "Ãx broken"), ("noNotatie", "x")]);
        let record = NotationRecord::from_row(&row, &normalizer()).unwrap();
        assert!(record.needs_review);
    }

    #[test]
    fn test_song_row_is_transformed() {
        let row = csv_row(
            2,
            &[
                ("soTitel", "Back in Black"),
                ("soArtiest", "AC/DC"),
                ("soGenre", "Rock"),
                ("soBPM", "94"),
                ("soLengte", "0"),
                ("soYouTube", "https://www.youtube.com/watch?v=pAgnJDJN4VA"),
                ("soSpotify", "not a link"),
                ("soNotatie02", "HH|x-x-|"),
                ("soOpmerkingen02", "Intro"),
            ],
        );
        let record = SongRecord::from_row(&row, &normalizer()).unwrap();

        assert_eq!(record.title, "Back in Black");
        assert_eq!(record.natural_key, "Back in Black|AC/DC");
        assert_eq!(record.description, "Genre: Rock | BPM: 94");
        assert_eq!(record.length, None);
        assert_eq!(record.embeds().count(), 2);
        assert_eq!(record.spotify.as_ref().unwrap().status, EmbedStatus::Fallback);
        assert_eq!(record.notations.len(), 1);
        assert_eq!(record.notations[0].slot, 2);
        assert_eq!(record.notations[0].remarks.as_deref(), Some("Intro"));
        assert!(record.content.contains("Spotify: not a link"));
        assert!(record.content.ends_with("HH|x-x-|\n\nNote: Intro"));
    }

    #[test]
    fn test_song_defaults_and_skip() {
        let no_title = csv_row(3, &[("soArtiest", "Toto")]);
        let record = SongRecord::from_row(&no_title, &normalizer()).unwrap();
        assert_eq!(record.title, "Song #2");
        assert_eq!(record.natural_key, "|Toto|row:2");

        let no_artist = csv_row(4, &[("titel", "Rosanna")]);
        let record = SongRecord::from_row(&no_artist, &normalizer()).unwrap();
        assert_eq!(record.artist, SongRecord::DEFAULT_ARTIST);
        assert_eq!(record.natural_key, "Rosanna||row:3");

        let neither = csv_row(5, &[("soGenre", "Pop"), ("soTitel", " nan ")]);
        assert!(SongRecord::from_row(&neither, &normalizer()).is_none());
    }
}
