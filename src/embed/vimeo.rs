use regex::Regex;
use std::sync::LazyLock;

use super::{EmbedMeta, Resolved};

static SHAPES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i:player\.vimeo\.com)/video/([0-9]+)",
        r"(?i:vimeo\.com)/(?:channels/[^/\s]+/|groups/[^/\s]+/videos/)?([0-9]+)(?:[^0-9]|$)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

pub(super) fn matches(input: &str) -> bool {
    input.to_ascii_lowercase().contains("vimeo.com")
}

pub(super) fn resolve(input: &str) -> Option<Resolved> {
    let id = SHAPES
        .iter()
        .find_map(|shape| shape.captures(input))
        .map(|caps| caps[1].to_string())?;

    Some(Resolved {
        embed_url: format!("https://player.vimeo.com/video/{id}"),
        meta: EmbedMeta {
            id: Some(id),
            ..Default::default()
        },
    })
}
