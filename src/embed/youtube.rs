use regex::Regex;
use std::sync::LazyLock;

use super::{EmbedMeta, Resolved};

/// URL shapes in priority order. Hosts match case-insensitively; ids are
/// case-sensitive.
static SHAPES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i:youtu\.be)/([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
        r"(?i:youtube(?:-nocookie)?\.com)/(?:embed|v)/([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
        r"(?i:youtube\.com)/watch\?(?:[^#\s]*&)?v=([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
        r"(?i:youtube\.com)/(?:shorts|live)/([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

static START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&#](?:t|start)=([0-9]+[hms]?(?:[0-9]+[ms]?)*)").unwrap());

pub(super) fn matches(input: &str) -> bool {
    let lower = input.to_ascii_lowercase();
    lower.contains("youtube.com") || lower.contains("youtu.be") || lower.contains("youtube-nocookie.com")
}

pub(super) fn resolve(input: &str) -> Option<Resolved> {
    let id = SHAPES
        .iter()
        .find_map(|shape| shape.captures(input))
        .map(|caps| caps[1].to_string())?;

    let start_seconds = START
        .captures(input)
        .and_then(|caps| parse_timestamp(&caps[1]))
        .filter(|seconds| *seconds > 0);

    let mut embed_url = format!("https://www.youtube.com/embed/{id}");
    if let Some(seconds) = start_seconds {
        embed_url.push_str(&format!("?start={seconds}"));
    }

    Some(Resolved {
        embed_url,
        meta: EmbedMeta {
            id: Some(id),
            start_seconds,
            ..Default::default()
        },
    })
}

/// Parse `90`, `90s`, `1m30s` or `1h2m3s` into seconds.
///
/// `None` for anything malformed or too large for a `u32`.
fn parse_timestamp(value: &str) -> Option<u32> {
    if let Ok(seconds) = value.parse::<u32>() {
        return Some(seconds);
    }

    let mut total = 0u32;
    let mut digits = String::new();
    for c in value.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let amount: u32 = digits.parse().ok()?;
        digits.clear();
        let seconds = match c {
            'h' => amount.checked_mul(3600)?,
            'm' => amount.checked_mul(60)?,
            's' => amount,
            _ => return None,
        };
        total = total.checked_add(seconds)?;
    }
    if !digits.is_empty() {
        total = total.checked_add(digits.parse::<u32>().ok()?)?;
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embed_url(input: &str) -> Option<String> {
        resolve(input).map(|r| r.embed_url)
    }

    #[test]
    fn test_url_shapes() {
        let expected = Some("https://www.youtube.com/embed/dQw4w9WgXcQ".to_string());
        assert_eq!(embed_url("https://youtu.be/dQw4w9WgXcQ"), expected);
        assert_eq!(embed_url("youtu.be/dQw4w9WgXcQ"), expected);
        assert_eq!(embed_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), expected);
        assert_eq!(
            embed_url("https://m.youtube.com/watch?feature=share&v=dQw4w9WgXcQ&list=PL1"),
            expected
        );
        assert_eq!(embed_url("//www.youtube.com/embed/dQw4w9WgXcQ"), expected);
        assert_eq!(
            embed_url("https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ"),
            expected
        );
        assert_eq!(embed_url("https://youtube.com/shorts/dQw4w9WgXcQ"), expected);
        assert_eq!(embed_url("HTTPS://WWW.YOUTUBE.COM/watch?v=dQw4w9WgXcQ"), expected);
    }

    #[test]
    fn test_rejects_bad_ids() {
        assert!(resolve("https://youtu.be/short").is_none());
        assert!(resolve("https://youtu.be/dQw4w9WgXcQextra").is_none());
        assert!(resolve("https://www.youtube.com/channel/UCxyz").is_none());
    }

    #[test]
    fn test_start_offset() {
        let resolved = resolve("https://youtu.be/dQw4w9WgXcQ?t=42").unwrap();
        assert_eq!(resolved.embed_url, "https://www.youtube.com/embed/dQw4w9WgXcQ?start=42");
        assert_eq!(resolved.meta.start_seconds, Some(42));

        let resolved = resolve("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=1m30s").unwrap();
        assert_eq!(resolved.meta.start_seconds, Some(90));

        let resolved = resolve("https://youtu.be/dQw4w9WgXcQ?t=0").unwrap();
        assert_eq!(resolved.embed_url, "https://www.youtube.com/embed/dQw4w9WgXcQ");
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("75"), Some(75));
        assert_eq!(parse_timestamp("75s"), Some(75));
        assert_eq!(parse_timestamp("1h2m3s"), Some(3723));
        assert_eq!(parse_timestamp("2m5"), Some(125));
    }

    #[test]
    fn test_oversized_timestamp_is_dropped() {
        assert_eq!(parse_timestamp("2000000h"), None);
        assert_eq!(parse_timestamp("99999999999"), None);
        assert_eq!(parse_timestamp("1193046h28m16s"), None);

        let resolved = resolve("https://youtu.be/dQw4w9WgXcQ?t=2000000h").unwrap();
        assert_eq!(resolved.embed_url, "https://www.youtube.com/embed/dQw4w9WgXcQ");
        assert_eq!(resolved.meta.start_seconds, None);
    }
}
