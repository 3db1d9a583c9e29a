//! Drumblock segmentation.
//!
//! A drumblock is a fixed-length slice of a parsed notation with its steps
//! re-based to zero, so a long groove can be practiced piece by piece.

use serde::{Deserialize, Serialize};

use super::{NotationEvent, ParsedNotation, ParserStatus};

/// Default block length: one 4/4 measure of sixteenth notes.
pub const DEFAULT_BLOCK_LENGTH: u32 = 16;

/// Where a block was cut from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSource {
    /// Stored notation the block belongs to (`None` before persistence)
    pub notation_id: Option<i64>,
    pub parser_version: String,
}

/// A re-based slice of notation events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrumBlock {
    pub block_id: String,
    pub block_index: u32,
    pub length_steps: u32,
    /// Events with steps relative to `start_step`
    pub events: Vec<NotationEvent>,
    pub start_step: u32,
    pub source: BlockSource,
}

impl DrumBlock {
    /// Events shifted back to their position in the source notation.
    pub fn absolute_events(&self) -> Vec<NotationEvent> {
        self.events
            .iter()
            .map(|event| NotationEvent {
                step: event.step + self.start_step,
                ..event.clone()
            })
            .collect()
    }
}

/// Cut an `ok` notation into blocks of `block_length` steps.
///
/// Notations with any other status produce no blocks, and blocks without
/// events are dropped rather than emitted empty.
pub fn segment_drumblocks(
    parsed: &ParsedNotation,
    block_length: u32,
    source: BlockSource,
) -> Vec<DrumBlock> {
    if parsed.status != ParserStatus::Ok {
        return Vec::new();
    }

    let block_length = block_length.max(1);
    let block_count = parsed.grid.total_steps.div_ceil(block_length);

    (0..block_count)
        .filter_map(|index| {
            let start = index * block_length;
            let end = start.saturating_add(block_length);
            let events: Vec<NotationEvent> = parsed
                .events
                .iter()
                .filter(|event| (start..end).contains(&event.step))
                .map(|event| NotationEvent {
                    step: event.step - start,
                    ..event.clone()
                })
                .collect();

            if events.is_empty() {
                return None;
            }

            let block_id = match source.notation_id {
                Some(id) => format!("n{id}-b{index}"),
                None => format!("b{index}"),
            };
            Some(DrumBlock {
                block_id,
                block_index: index,
                length_steps: block_length,
                events,
                start_step: start,
                source: BlockSource {
                    parser_version: parsed.meta.parser_version.clone(),
                    ..source.clone()
                },
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notation::{ParseOptions, parse_notation};

    fn ok(raw: &str) -> ParsedNotation {
        let parsed = parse_notation(raw, &ParseOptions::default());
        assert_eq!(parsed.status, ParserStatus::Ok, "{raw}");
        parsed
    }

    #[test]
    fn test_two_measures_make_two_blocks() {
        let parsed = ok("x-x-x-x-x-x-x-x-|k---s---k---s--s");
        assert_eq!(parsed.grid.total_steps, 32);

        let blocks = segment_drumblocks(&parsed, 16, BlockSource::default());
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].start_step, 16);
        assert_eq!(blocks[1].events[0].step, 0);
        assert!(blocks.iter().all(|b| b.events.iter().all(|e| e.step < 16)));

        let rebuilt: Vec<NotationEvent> = blocks.iter().flat_map(|b| b.absolute_events()).collect();
        assert_eq!(rebuilt, parsed.events);
    }

    #[test]
    fn test_empty_blocks_are_dropped() {
        let parsed = ok(&format!("x{}x", "-".repeat(32)));
        let blocks = segment_drumblocks(&parsed, 16, BlockSource::default());
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].block_index, 0);
        assert_eq!(blocks[1].block_index, 2);
        assert_eq!(blocks[1].block_id, "b2");
    }

    #[test]
    fn test_only_ok_notations_are_segmented() {
        let partial = parse_notation("x?x", &ParseOptions::default());
        assert_eq!(partial.status, ParserStatus::Partial);
        assert!(segment_drumblocks(&partial, 16, BlockSource::default()).is_empty());

        let failed = parse_notation("", &ParseOptions::default());
        assert!(segment_drumblocks(&failed, 16, BlockSource::default()).is_empty());
    }

    #[test]
    fn test_block_ids_and_source() {
        let parsed = ok("x-x-");
        let source = BlockSource {
            notation_id: Some(7),
            ..Default::default()
        };
        let blocks = segment_drumblocks(&parsed, 4, source);
        assert_eq!(blocks[0].block_id, "n7-b0");
        assert_eq!(blocks[0].source.notation_id, Some(7));
        assert_eq!(blocks[0].source.parser_version, parsed.meta.parser_version);
        assert_eq!(blocks[0].length_steps, 4);

        let json = serde_json::to_value(&blocks[0]).unwrap();
        assert_eq!(json["blockId"], "n7-b0");
        assert_eq!(json["lengthSteps"], 4);
        assert_eq!(json["startStep"], 0);
        assert_eq!(json["source"]["notationId"], 7);
    }

    #[test]
    fn test_zero_length_is_clamped() {
        let parsed = ok("xx");
        let blocks = segment_drumblocks(&parsed, 0, BlockSource::default());
        assert_eq!(blocks.len(), 2);
    }
}

/// Property-based tests using proptest
#[cfg(test)]
mod proptests {
    use super::*;
    use crate::notation::{ParseOptions, parse_notation};
    use proptest::prelude::*;

    proptest! {
        /// Undoing the re-basing of every block gives back the original events
        #[test]
        fn blocks_reconstruct_events(
            pattern in prop::string::string_regex("[xsk\\-]{1,64}").unwrap(),
            block_length in 1u32..20,
        ) {
            let parsed = parse_notation(&pattern, &ParseOptions::default());
            prop_assume!(parsed.status == ParserStatus::Ok);

            let blocks = segment_drumblocks(&parsed, block_length, BlockSource::default());
            prop_assert!(blocks.iter().all(|b| !b.events.is_empty()));

            let rebuilt: Vec<NotationEvent> = blocks.iter().flat_map(|b| b.absolute_events()).collect();
            prop_assert_eq!(rebuilt, parsed.events);
        }
    }
}
