//! Compact dialect: one dense stream, one character per grid step.

use super::Extraction;

pub(crate) fn extract(raw: &str) -> Extraction {
    let mut extraction = Extraction::default();
    extraction.scan_pattern(raw, None, "");
    extraction
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notation::{Instrument, Limb};

    #[test]
    fn test_compact_uses_symbol_table_per_character() {
        let extraction = extract("k-x-s-f-1-2-3-c-r");
        let instruments: Vec<Instrument> =
            extraction.events.iter().map(|e| e.instrument).collect();
        assert_eq!(
            instruments,
            vec![
                Instrument::Kick,
                Instrument::Hihat,
                Instrument::Snare,
                Instrument::Hihat,
                Instrument::HighTom,
                Instrument::Tom,
                Instrument::FloorTom,
                Instrument::Crash,
                Instrument::Ride,
            ]
        );
        assert_eq!(extraction.events[3].limb, Limb::LeftFoot);
        assert!(extraction.warnings.is_empty());
    }

    #[test]
    fn test_compact_multiline_continues_stream() {
        let extraction = extract("x-\nx-");
        let steps: Vec<u32> = extraction.events.iter().map(|e| e.step).collect();
        assert_eq!(steps, vec![0, 2]);
    }
}
