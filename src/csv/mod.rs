//! Legacy CSV decoding and tokenizing.
//!
//! The legacy exports are single-byte encoded, use either `;` or `,` as the
//! delimiter and quote fields that contain HTML or multi-line notation. This
//! module turns raw file bytes into a [`CsvTable`] of header-addressed rows.
//!
//! # Example
//!
//! ```ignore
//! use groove_import::csv::{decode_latin1, parse_csv};
//!
//! let table = parse_csv(&decode_latin1(&bytes));
//! for row in &table.rows {
//!     println!("{}: {}", row.line, row.get("noNotatie"));
//! }
//! ```

mod clean;

pub use clean::{clean_text, has_residual_mojibake};

use serde::{Deserialize, Serialize};

/// UTF-8 byte order mark as it appears after a Latin-1 decode.
const LATIN1_BOM: &str = "\u{ef}\u{bb}\u{bf}";

/// Text encoding used to decode the legacy export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// Every byte maps to the Unicode scalar of the same value.
    #[default]
    Latin1,
    /// Valid UTF-8 is used as-is, anything else falls back to Latin-1.
    Auto,
}

/// Decode bytes as ISO-8859-1.
///
/// Never fails: each byte becomes the code point of the same value. Text that
/// was actually UTF-8 comes out as mojibake, which [`clean_text`] partially
/// repairs later.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Decode a legacy export with the chosen [`Encoding`], stripping a BOM.
pub fn decode_legacy(bytes: &[u8], encoding: Encoding) -> String {
    let text = match encoding {
        Encoding::Latin1 => decode_latin1(bytes),
        Encoding::Auto => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => decode_latin1(bytes),
        },
    };

    if let Some(rest) = text.strip_prefix('\u{feff}') {
        rest.to_string()
    } else if let Some(rest) = text.strip_prefix(LATIN1_BOM) {
        rest.to_string()
    } else {
        text
    }
}

/// Pick the field delimiter from the header line.
///
/// Returns `;` only when the line has strictly more semicolons than commas.
pub fn detect_delimiter(first_line: &str) -> char {
    let semicolons = first_line.matches(';').count();
    let commas = first_line.matches(',').count();
    if semicolons > commas { ';' } else { ',' }
}

/// Split one CSV record into fields.
///
/// A `"` toggles the quoted state and is never emitted itself; inside a quoted
/// span `""` produces a literal quote. The delimiter only ends a field outside
/// quotes.
pub fn parse_csv_line(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '"' {
            if in_quotes && chars.peek() == Some(&'"') {
                current.push('"');
                chars.next();
            } else {
                in_quotes = !in_quotes;
            }
        } else if c == delimiter && !in_quotes {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    fields.push(current);

    fields
}

/// A parsed CSV file: header names plus positionally zipped rows.
#[derive(Debug, Clone, Default)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<CsvRow>,
    pub delimiter: char,
}

/// One data row, addressed by header name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    /// 1-based position among the data rows, header and blank lines excluded
    pub number: usize,
    /// 1-based line number in the source file where this record starts
    pub line: usize,
    fields: Vec<(String, String)>,
}

impl CsvRow {
    /// Build a row from `(header, value)` pairs.
    pub fn new(number: usize, line: usize, fields: Vec<(String, String)>) -> Self {
        Self { number, line, fields }
    }

    /// Untrimmed value of a column, exactly as it appeared in the file.
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(header, _)| header == name)
            .map(|(_, value)| value.as_str())
    }

    /// Trimmed value of a column; missing columns and the legacy `nan`
    /// placeholder both read as empty.
    pub fn get(&self, name: &str) -> &str {
        match self.raw(name).map(str::trim) {
            Some(value) if !value.eq_ignore_ascii_case("nan") => value,
            _ => "",
        }
    }

    /// First non-empty value among several column aliases.
    pub fn get_any(&self, names: &[&str]) -> &str {
        names
            .iter()
            .map(|name| self.get(name))
            .find(|value| !value.is_empty())
            .unwrap_or("")
    }

    /// All `(header, value)` pairs in column order.
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }
}

/// Parse decoded CSV text into a [`CsvTable`].
///
/// Blank lines are dropped and the first remaining record is the header.
/// Short rows are padded with empty strings, long rows lose their excess
/// values. A line break inside an open quoted span continues the record.
pub fn parse_csv(content: &str) -> CsvTable {
    let mut records = split_records(content)
        .into_iter()
        .filter(|(_, record)| !record.trim().is_empty());

    let Some((_, header_line)) = records.next() else {
        return CsvTable {
            delimiter: ',',
            ..Default::default()
        };
    };

    let delimiter = detect_delimiter(&header_line);
    let headers: Vec<String> = parse_csv_line(&header_line, delimiter)
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();

    let rows = records
        .zip(1..)
        .map(|((line, record), number)| {
            let mut values = parse_csv_line(&record, delimiter).into_iter();
            let fields = headers
                .iter()
                .map(|header| (header.clone(), values.next().unwrap_or_default()))
                .collect();
            CsvRow::new(number, line, fields)
        })
        .collect();

    CsvTable {
        headers,
        rows,
        delimiter,
    }
}

/// Split text into logical records, keeping quoted line breaks.
///
/// Returns `(start_line, record)` pairs with trailing `\r` removed from each
/// physical line.
fn split_records(content: &str) -> Vec<(usize, String)> {
    let mut records = Vec::new();
    let mut pending: Option<(usize, String)> = None;
    let mut in_quotes = false;

    for (index, line) in content.split('\n').enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let quote_count = line.matches('"').count();

        match pending.as_mut() {
            Some((_, record)) => {
                record.push('\n');
                record.push_str(line);
            }
            None => pending = Some((index + 1, line.to_string())),
        }

        if quote_count % 2 == 1 {
            in_quotes = !in_quotes;
        }
        if !in_quotes {
            records.extend(pending.take());
        }
    }

    // An unterminated quote keeps whatever was collected.
    records.extend(pending);
    records
}
