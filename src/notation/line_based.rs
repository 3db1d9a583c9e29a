//! Line-based tablature: one instrument per line.
//!
//! ```text
//! HH|x-x-x-x-x-x-x-x-|
//! SD|----o-------o---|
//! BD|o-------o-o-----|
//! ```

use super::Extraction;
use super::symbols::{Hit, INSTRUMENT_LINE_PREFIXES};

/// Characters allowed between an instrument prefix and its pattern.
const PREFIX_SEPARATORS: &[char] = &['|', ':', ' '];

/// Match an instrument-line prefix at the start of a line.
///
/// Returns the hit for the line, the separator that followed the prefix and
/// the pattern after it.
fn match_line(line: &str) -> Option<(Hit, char, &str)> {
    let line = line.trim_start();
    INSTRUMENT_LINE_PREFIXES.iter().find_map(|(prefix, hit)| {
        let rest = line.strip_prefix(*prefix)?;
        let separator = rest.chars().next().filter(|c| PREFIX_SEPARATORS.contains(c))?;
        Some((*hit, separator, &rest[separator.len_utf8()..]))
    })
}

/// Whether the text reads as line-based tablature.
///
/// A bar or colon after the prefix is enough on its own; a bare space only
/// counts when the text spans several lines, so `S x-x-` stays compact.
pub(crate) fn looks_line_based(raw: &str) -> bool {
    let lines: Vec<&str> = raw.lines().filter(|l| !l.trim().is_empty()).collect();
    let multi_line = lines.len() > 1;
    lines.iter().any(|line| match match_line(line) {
        Some((_, ' ', _)) => multi_line,
        Some(_) => true,
        None => false,
    })
}

pub(crate) fn extract(raw: &str) -> Extraction {
    let mut extraction = Extraction::default();
    for (index, line) in raw.lines().enumerate() {
        if let Some((hit, _, pattern)) = match_line(line) {
            extraction.scan_pattern(pattern, Some(hit), &format!(" on line {}", index + 1));
        }
    }
    extraction
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notation::{Instrument, Limb, ParseOptions, ParserStatus, parse_notation};

    #[test]
    fn test_prefixes_prefer_longest_match() {
        let (hit, separator, pattern) = match_line("HH|x-x-|").unwrap();
        assert_eq!(hit.instrument, Instrument::Hihat);
        assert_eq!(separator, '|');
        assert_eq!(pattern, "x-x-|");

        assert_eq!(match_line("SD:o").unwrap().0.instrument, Instrument::Snare);
        assert_eq!(match_line("BD o").unwrap().0.instrument, Instrument::Kick);
        assert_eq!(match_line("FT|o").unwrap().0.instrument, Instrument::FloorTom);
        assert_eq!(match_line("HF|x").unwrap().0.limb, Limb::LeftFoot);
        assert!(match_line("Hx-x-").is_none());
        assert!(match_line("intro").is_none());
    }

    #[test]
    fn test_line_based_groove() {
        let parsed = parse_notation(
            "HH|x-x-x-x-x-x-x-x-|\nSD|----o-------o---|\nBD|o-------o-o-----|",
            &ParseOptions::default(),
        );
        assert_eq!(parsed.status, ParserStatus::Ok);
        assert_eq!(parsed.events.len(), 13);
        assert_eq!(parsed.grid.total_steps, 15);

        // 'o' on the snare line is a snare, not an open hihat
        let at_four: Vec<Instrument> = parsed
            .events
            .iter()
            .filter(|e| e.step == 4)
            .map(|e| e.instrument)
            .collect();
        assert_eq!(at_four, vec![Instrument::Hihat, Instrument::Snare]);
    }

    #[test]
    fn test_unmatched_lines_ignored() {
        let parsed = parse_notation(
            "Groove 1 (slow)\nHH|x-x-x-x-|\n\nBD|o---o---|",
            &ParseOptions::default(),
        );
        assert_eq!(parsed.status, ParserStatus::Ok);
        assert_eq!(parsed.events.len(), 6);
    }

    #[test]
    fn test_bad_symbol_reports_line() {
        let parsed = parse_notation("HH|x-?-|\nSD|--o-|", &ParseOptions::default());
        assert_eq!(parsed.status, ParserStatus::Partial);
        assert!(parsed.meta.warnings[0].ends_with("on line 1"));
    }
}
