use regex::Regex;
use std::sync::LazyLock;

use super::{EmbedMeta, Resolved};

static SHAPES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"(?i:embed\.music\.apple\.com)/([a-z]{2})/(album|playlist|song|music-video|station)/([^?#\s"'<>]+)"#,
        r#"(?i:(?:music|itunes)\.apple\.com)/([a-z]{2})/(album|playlist|song|music-video|station)/([^?#\s"'<>]+)"#,
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Track selection inside an album link
static TRACK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[?&]i=([0-9]+)").unwrap());

pub(super) fn matches(input: &str) -> bool {
    let lower = input.to_ascii_lowercase();
    lower.contains("music.apple.com") || lower.contains("itunes.apple.com")
}

pub(super) fn resolve(input: &str) -> Option<Resolved> {
    let caps = SHAPES.iter().find_map(|shape| shape.captures(input))?;
    let country = &caps[1];
    let content_type = caps[2].to_string();
    let path = caps[3].trim_end_matches('/');
    let id = path.rsplit('/').next().unwrap_or(path).to_string();

    let mut embed_url = format!("https://embed.music.apple.com/{country}/{content_type}/{path}");
    if let Some(track) = TRACK.captures(input) {
        embed_url.push_str(&format!("?i={}", &track[1]));
    }

    Some(Resolved {
        embed_url,
        meta: EmbedMeta {
            id: Some(id),
            content_type: Some(content_type),
            ..Default::default()
        },
    })
}
