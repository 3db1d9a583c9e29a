//! Fixed symbol tables shared by every notation dialect.
//!
//! These tables are part of the stored format: changing an entry changes the
//! output for existing raw notation, so bump [`super::PARSER_VERSION`] with it.

use serde::{Deserialize, Serialize};

/// Drum kit piece an event is played on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instrument {
    Hihat,
    Snare,
    Kick,
    Tom,
    HighTom,
    FloorTom,
    Crash,
    Ride,
}

/// Limb that plays an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Limb {
    RightHand,
    LeftHand,
    RightFoot,
    LeftFoot,
}

/// An instrument together with the limb playing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub instrument: Instrument,
    pub limb: Limb,
}

impl Hit {
    const fn new(instrument: Instrument, limb: Limb) -> Self {
        Self { instrument, limb }
    }
}

const HIHAT: Hit = Hit::new(Instrument::Hihat, Limb::RightHand);
const HIHAT_FOOT: Hit = Hit::new(Instrument::Hihat, Limb::LeftFoot);
const SNARE: Hit = Hit::new(Instrument::Snare, Limb::LeftHand);
const KICK: Hit = Hit::new(Instrument::Kick, Limb::RightFoot);
const TOM: Hit = Hit::new(Instrument::Tom, Limb::RightHand);
const HIGH_TOM: Hit = Hit::new(Instrument::HighTom, Limb::RightHand);
const FLOOR_TOM: Hit = Hit::new(Instrument::FloorTom, Limb::RightHand);
const CRASH: Hit = Hit::new(Instrument::Crash, Limb::RightHand);
const RIDE: Hit = Hit::new(Instrument::Ride, Limb::RightHand);

/// Character → hit table.
pub const SYMBOL_TABLE: &[(char, Hit)] = &[
    ('x', HIHAT),
    ('X', HIHAT),
    ('+', HIHAT),
    ('o', HIHAT),
    ('O', HIHAT),
    ('s', SNARE),
    ('S', SNARE),
    ('g', SNARE),
    ('G', SNARE),
    ('@', SNARE),
    ('k', KICK),
    ('K', KICK),
    ('b', KICK),
    ('B', KICK),
    ('f', HIHAT_FOOT),
    ('F', HIHAT_FOOT),
    ('t', TOM),
    ('T', TOM),
    ('1', HIGH_TOM),
    ('2', TOM),
    ('3', FLOOR_TOM),
    ('c', CRASH),
    ('C', CRASH),
    ('r', RIDE),
    ('R', RIDE),
];

/// Symbols played with an accent.
pub const ACCENT_SYMBOLS: &[char] = &['X', 'S', 'K', 'B', 'F', 'T', 'C', 'R', 'G', 'O'];

/// Symbols that take a grid step without producing an event.
pub const REST_SYMBOLS: &[char] = &['-', '.', '_'];

/// Instrument-line prefixes of the line-based dialect, longest first.
pub const INSTRUMENT_LINE_PREFIXES: &[(&str, Hit)] = &[
    ("HH", HIHAT),
    ("CC", CRASH),
    ("RC", RIDE),
    ("RD", RIDE),
    ("T1", HIGH_TOM),
    ("T2", TOM),
    ("T3", FLOOR_TOM),
    ("FT", FLOOR_TOM),
    ("SN", SNARE),
    ("SD", SNARE),
    ("BD", KICK),
    ("HF", HIHAT_FOOT),
    ("H", HIHAT),
    ("S", SNARE),
    ("B", KICK),
    ("K", KICK),
];

/// Pattern keys of the GrooveScribe query format.
pub const GROOVESCRIBE_PATTERN_KEYS: &[(&str, Hit)] = &[
    ("H", HIHAT),
    ("S", SNARE),
    ("K", KICK),
    ("T1", HIGH_TOM),
    ("T2", TOM),
    ("T3", FLOOR_TOM),
];

/// Classification of one pattern character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Hit(Hit),
    Rest,
    /// Measure bar or whitespace: no step is consumed.
    Separator,
}

/// Look a pattern character up in the tables; `None` for unknown symbols.
pub fn classify(c: char) -> Option<Symbol> {
    if c == '|' || c.is_whitespace() {
        return Some(Symbol::Separator);
    }
    if REST_SYMBOLS.contains(&c) {
        return Some(Symbol::Rest);
    }
    SYMBOL_TABLE
        .iter()
        .find(|(symbol, _)| *symbol == c)
        .map(|(_, hit)| Symbol::Hit(*hit))
}

pub fn is_accent(c: char) -> bool {
    ACCENT_SYMBOLS.contains(&c)
}
