//! Best-effort mojibake repair for text fields.
//!
//! The legacy exports were written as UTF-8 but read back as a single-byte
//! charset, so "é" shows up as "Ã©". The table below covers the sequences
//! seen in Dutch/English lesson material; anything else passes through.

/// Ordered `(broken, fixed)` replacements. Longer sequences come first so a
/// three-character punctuation sequence is never split by a two-character one.
const MOJIBAKE_TABLE: &[(&str, &str)] = &[
    // Punctuation, CP1252 reading
    ("â€™", "\u{2019}"),
    ("â€˜", "\u{2018}"),
    ("â€œ", "\u{201c}"),
    ("â€\u{9d}", "\u{201d}"),
    ("â€“", "\u{2013}"),
    ("â€”", "\u{2014}"),
    ("â€¦", "\u{2026}"),
    ("â‚¬", "\u{20ac}"),
    // Punctuation, Latin-1 reading
    ("â\u{80}\u{99}", "\u{2019}"),
    ("â\u{80}\u{98}", "\u{2018}"),
    ("â\u{80}\u{9c}", "\u{201c}"),
    ("â\u{80}\u{9d}", "\u{201d}"),
    ("â\u{80}\u{93}", "\u{2013}"),
    ("â\u{80}\u{94}", "\u{2014}"),
    ("â\u{80}¦", "\u{2026}"),
    ("â\u{82}¬", "\u{20ac}"),
    // Lowercase accented letters
    ("Ã©", "é"),
    ("Ã¨", "è"),
    ("Ãª", "ê"),
    ("Ã«", "ë"),
    ("Ã¡", "á"),
    ("Ã¢", "â"),
    ("Ã¤", "ä"),
    ("Ã¯", "ï"),
    ("Ã®", "î"),
    ("Ã\u{ad}", "í"),
    ("Ã³", "ó"),
    ("Ã´", "ô"),
    ("Ã¶", "ö"),
    ("Ãº", "ú"),
    ("Ã»", "û"),
    ("Ã¼", "ü"),
    ("Ã§", "ç"),
    ("Ã±", "ñ"),
    ("Ã\u{a0}", "à"),
    // Uppercase accented letters, both readings
    ("Ã‰", "É"),
    ("Ã\u{89}", "É"),
    ("Ãˆ", "È"),
    ("Ã\u{88}", "È"),
    ("Ã–", "Ö"),
    ("Ã\u{96}", "Ö"),
    ("Ãœ", "Ü"),
    ("Ã\u{9c}", "Ü"),
    ("Ã„", "Ä"),
    ("Ã\u{84}", "Ä"),
    // Latin-1 supplement symbols
    ("Â°", "°"),
    ("Â´", "´"),
    ("Â½", "½"),
    ("Â\u{a0}", " "),
];

/// Lead sequences that indicate mojibake survived the table.
const RESIDUAL_MARKERS: &[&str] = &["Ã", "Â", "â€", "â\u{80}"];

/// Repair known mojibake sequences, then trim.
pub fn clean_text(s: &str) -> String {
    let mut text = s.to_string();
    for (broken, fixed) in MOJIBAKE_TABLE {
        if text.contains(broken) {
            text = text.replace(broken, fixed);
        }
    }
    text.trim().to_string()
}

/// Whether cleaned text still looks like mojibake and should be reviewed.
pub fn has_residual_mojibake(s: &str) -> bool {
    RESIDUAL_MARKERS.iter().any(|marker| s.contains(marker))
}
