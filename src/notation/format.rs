//! Dialect detection.

use serde::{Deserialize, Serialize};

use super::{groovescribe, line_based};

/// The notation dialects the parser understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotationFormat {
    /// GrooveScribe query string (`TimeSig=4/4&Div=16&H=|x-x-|...`)
    #[serde(rename = "groovescribe")]
    GrooveScribe,
    /// One instrument per line (`HH|x-x-x-x-|`)
    #[serde(rename = "line_based")]
    LineBased,
    /// A single stream, one character per grid step
    #[serde(rename = "compact")]
    Compact,
}

impl NotationFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotationFormat::GrooveScribe => "groovescribe",
            NotationFormat::LineBased => "line_based",
            NotationFormat::Compact => "compact",
        }
    }
}

/// Decide which dialect a (trimmed, non-empty) notation string is written in.
///
/// GrooveScribe wins whenever a recognized query key is present, then
/// line-based tablature; everything else is read as compact.
pub fn detect_notation_format(raw: &str) -> NotationFormat {
    if groovescribe::groovescribe_query(raw).is_some() {
        NotationFormat::GrooveScribe
    } else if line_based::looks_line_based(raw) {
        NotationFormat::LineBased
    } else {
        NotationFormat::Compact
    }
}
