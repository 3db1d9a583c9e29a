use regex::Regex;
use std::sync::LazyLock;

use super::{EmbedMeta, Resolved};

static SHAPES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i:open\.spotify\.com)/embed/(track|album|playlist|artist|episode|show)/([A-Za-z0-9]+)",
        r"(?i:open\.spotify\.com)/(?:intl-[a-z]{2}(?:-[A-Za-z]{2})?/)?(track|album|playlist|artist|episode|show)/([A-Za-z0-9]+)",
        r"^spotify:(track|album|playlist|artist|episode|show):([A-Za-z0-9]+)$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

pub(super) fn matches(input: &str) -> bool {
    input.to_ascii_lowercase().contains("open.spotify.com") || input.starts_with("spotify:")
}

pub(super) fn resolve(input: &str) -> Option<Resolved> {
    let caps = SHAPES.iter().find_map(|shape| shape.captures(input))?;
    let (content_type, id) = (caps[1].to_string(), caps[2].to_string());

    Some(Resolved {
        embed_url: format!("https://open.spotify.com/embed/{content_type}/{id}"),
        meta: EmbedMeta {
            id: Some(id),
            content_type: Some(content_type),
            ..Default::default()
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_shapes() {
        for input in [
            "https://open.spotify.com/track/4cOdK2wGLETKBW3PvgPWqT",
            "https://open.spotify.com/track/4cOdK2wGLETKBW3PvgPWqT?si=1a2b3c",
            "https://open.spotify.com/intl-nl/track/4cOdK2wGLETKBW3PvgPWqT",
            "https://open.spotify.com/embed/track/4cOdK2wGLETKBW3PvgPWqT",
            "spotify:track:4cOdK2wGLETKBW3PvgPWqT",
        ] {
            let resolved = resolve(input).unwrap();
            assert_eq!(
                resolved.embed_url,
                "https://open.spotify.com/embed/track/4cOdK2wGLETKBW3PvgPWqT",
                "{input}"
            );
            assert_eq!(resolved.meta.content_type.as_deref(), Some("track"));
        }
    }

    #[test]
    fn test_album_and_playlist() {
        let resolved = resolve("https://open.spotify.com/album/1DFixLWuPkv3KT3TnV35m3").unwrap();
        assert_eq!(
            resolved.embed_url,
            "https://open.spotify.com/embed/album/1DFixLWuPkv3KT3TnV35m3"
        );
        assert!(resolve("https://open.spotify.com/user/someone").is_none());
    }
}
