//! Single-value inspection commands: notation parsing and embed normalization.

use serde::Serialize;

use crate::config::Config;
use crate::embed::{EmbedKind, EmbedModule, EmbedNormalizer};
use crate::notation::{
    BlockSource, DrumBlock, ParseOptions, ParsedNotation, parse_notation, segment_drumblocks,
};

#[derive(Serialize)]
struct ParseOutput {
    notation: ParsedNotation,
    #[serde(skip_serializing_if = "Option::is_none")]
    drumblocks: Option<Vec<DrumBlock>>,
}

#[derive(Serialize)]
struct EmbedOutput {
    #[serde(flatten)]
    module: EmbedModule,
    #[serde(skip_serializing_if = "Option::is_none")]
    iframe: Option<String>,
}

/// Parse one notation string and print it as JSON
pub fn cmd_parse(config: &Config, notation: &str, strict: bool, blocks: bool) -> anyhow::Result<()> {
    let options = if strict {
        ParseOptions::strict()
    } else {
        ParseOptions::default()
    };
    let parsed = parse_notation(notation, &options);

    let drumblocks = blocks.then(|| {
        let source = BlockSource {
            notation_id: None,
            parser_version: parsed.meta.parser_version.clone(),
        };
        segment_drumblocks(&parsed, config.import.drumblock_length, source)
    });

    let output = ParseOutput {
        notation: parsed,
        drumblocks,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Normalize one media reference and print the module as JSON
pub fn cmd_embed(config: &Config, input: &str, kind: EmbedKind) -> anyhow::Result<()> {
    let normalizer = EmbedNormalizer::new(config.embed.groovescribe_host.clone());
    let module = normalizer.normalize(input, kind);
    let output = EmbedOutput {
        iframe: module.iframe_html(),
        module,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
