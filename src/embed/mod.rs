//! Normalization of external media references.
//!
//! Legacy rows reference media as bare URLs, iframe snippets, Spotify URIs or
//! free text. [`normalize_embed_module`] classifies each reference as
//! `embedded` (a canonical player URL is known) or `fallback` (only a link to
//! the original can be shown).
//!
//! Normalization never fails and never drops the source: `embed.raw` always
//! holds the input exactly as given, and a fallback's click target is that
//! same input.
//!
//! # Example
//!
//! ```ignore
//! use groove_import::embed::{normalize_embed_module, EmbedKind, EmbedStatus};
//!
//! let module = normalize_embed_module("https://youtu.be/dQw4w9WgXcQ", EmbedKind::Video);
//! assert_eq!(module.status, EmbedStatus::Embedded);
//! assert_eq!(
//!     module.embed.embed_url.as_deref(),
//!     Some("https://www.youtube.com/embed/dQw4w9WgXcQ")
//! );
//! ```

mod apple_music;
mod groovescribe;
mod spotify;
mod vimeo;
mod youtube;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// GrooveScribe player used for embedded notation.
pub const DEFAULT_GROOVESCRIBE_HOST: &str =
    "https://teacher.musicdott.com/groovescribe/GrooveEmbed.html";

static IFRAME_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<iframe\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#).unwrap()
});

/// What kind of media a column is expected to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum EmbedKind {
    Video,
    Audio,
    Notation,
    External,
}

/// Media provider a reference was attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Youtube,
    Vimeo,
    Spotify,
    AppleMusic,
    Groovescribe,
    External,
}

impl Provider {
    /// Kind of media the provider serves; `None` for unknown links.
    pub fn kind(&self) -> Option<EmbedKind> {
        match self {
            Provider::Youtube | Provider::Vimeo => Some(EmbedKind::Video),
            Provider::Spotify | Provider::AppleMusic => Some(EmbedKind::Audio),
            Provider::Groovescribe => Some(EmbedKind::Notation),
            Provider::External => None,
        }
    }

    /// User-facing label for a fallback link.
    pub fn fallback_label(&self) -> &'static str {
        match self {
            Provider::Youtube => "Watch on YouTube",
            Provider::Vimeo => "Watch on Vimeo",
            Provider::Spotify => "Listen on Spotify",
            Provider::AppleMusic => "Listen on Apple Music",
            Provider::Groovescribe => "Open in GrooveScribe",
            Provider::External => "Open link",
        }
    }

    /// Recognize the provider from domain and query signatures.
    ///
    /// Checked in order: notation, video, then audio signatures.
    fn detect(input: &str) -> Option<Provider> {
        if groovescribe::matches(input) {
            Some(Provider::Groovescribe)
        } else if youtube::matches(input) {
            Some(Provider::Youtube)
        } else if vimeo::matches(input) {
            Some(Provider::Vimeo)
        } else if spotify::matches(input) {
            Some(Provider::Spotify)
        } else if apple_music::matches(input) {
            Some(Provider::AppleMusic)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedStatus {
    Embedded,
    Fallback,
}

/// Why a reference could not be embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    Empty,
    BlockedScheme,
    MissingSrc,
    UnrecognizedShape,
    UnknownProvider,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedTarget {
    pub embed_url: Option<String>,
    /// The input exactly as received
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fallback {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedMeta {
    /// Provider identifier (video id, track id, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Provider content type (`track`, `album`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FallbackReason>,
    /// Set to `iframe` when the URL came out of an HTML snippet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Normalized description of one external media reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedModule {
    #[serde(rename = "type")]
    pub kind: EmbedKind,
    pub provider: Provider,
    pub status: EmbedStatus,
    pub embed: EmbedTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Fallback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<EmbedMeta>,
}

impl EmbedModule {
    fn embedded(raw: &str, provider: Provider, kind: EmbedKind, resolved: Resolved) -> Self {
        Self {
            kind: provider.kind().unwrap_or(kind),
            provider,
            status: EmbedStatus::Embedded,
            embed: EmbedTarget {
                embed_url: Some(resolved.embed_url),
                raw: raw.to_string(),
            },
            fallback: None,
            meta: Some(resolved.meta),
        }
    }

    fn fallback(raw: &str, provider: Provider, kind: EmbedKind, reason: FallbackReason) -> Self {
        Self {
            kind: provider.kind().unwrap_or(kind),
            provider,
            status: EmbedStatus::Fallback,
            embed: EmbedTarget {
                embed_url: None,
                raw: raw.to_string(),
            },
            fallback: Some(Fallback {
                label: provider.fallback_label().to_string(),
                url: raw.to_string(),
            }),
            meta: Some(EmbedMeta {
                reason: Some(reason),
                ..Default::default()
            }),
        }
    }

    pub fn is_embedded(&self) -> bool {
        self.status == EmbedStatus::Embedded
    }

    /// Put the outer input back after normalizing an extracted iframe `src`.
    fn restore_raw(mut self, raw: &str) -> Self {
        self.embed.raw = raw.to_string();
        if let Some(fallback) = self.fallback.as_mut() {
            fallback.url = raw.to_string();
        }
        self.meta.get_or_insert_with(EmbedMeta::default).source = Some("iframe".to_string());
        self
    }

    /// Player snippet for an embedded module; `None` for fallbacks.
    pub fn iframe_html(&self) -> Option<String> {
        let url = self.embed.embed_url.as_deref()?.replace('"', "&quot;");
        let html = match self.provider {
            Provider::Youtube => format!(
                r#"<iframe width="560" height="315" src="{url}" title="YouTube video player" frameborder="0" allow="accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture; web-share" referrerpolicy="strict-origin-when-cross-origin" allowfullscreen></iframe>"#
            ),
            Provider::Vimeo => format!(
                r#"<iframe src="{url}" width="640" height="360" frameborder="0" allow="autoplay; fullscreen; picture-in-picture" allowfullscreen></iframe>"#
            ),
            Provider::Spotify => format!(
                r#"<iframe style="border-radius:12px" src="{url}" width="100%" height="152" frameborder="0" allow="autoplay; clipboard-write; encrypted-media; fullscreen; picture-in-picture" loading="lazy"></iframe>"#
            ),
            Provider::AppleMusic => format!(
                r#"<iframe allow="autoplay *; encrypted-media *;" frameborder="0" height="175" style="width:100%;max-width:660px;overflow:hidden;border-radius:10px;" src="{url}"></iframe>"#
            ),
            Provider::Groovescribe => format!(
                r#"<iframe width="100%" height="240" src="{url}" frameborder="0"></iframe>"#
            ),
            Provider::External => return None,
        };
        Some(html)
    }
}

/// A provider's canonical form of a reference.
#[derive(Debug)]
struct Resolved {
    embed_url: String,
    meta: EmbedMeta,
}

/// Extract the `src` attribute of the first iframe in an HTML snippet.
///
/// `&amp;` in the attribute is unescaped.
pub fn iframe_src(html: &str) -> Option<String> {
    IFRAME_SRC
        .captures(html)
        .map(|caps| caps[1].trim().replace("&amp;", "&"))
        .filter(|src| !src.is_empty())
}

/// Embed normalizer with configurable player hosts.
#[derive(Debug, Clone)]
pub struct EmbedNormalizer {
    pub groovescribe_host: String,
}

impl Default for EmbedNormalizer {
    fn default() -> Self {
        Self {
            groovescribe_host: DEFAULT_GROOVESCRIBE_HOST.to_string(),
        }
    }
}

impl EmbedNormalizer {
    pub fn new(groovescribe_host: impl Into<String>) -> Self {
        Self {
            groovescribe_host: groovescribe_host.into(),
        }
    }

    /// Normalize a media reference. See [`normalize_embed_module`].
    pub fn normalize(&self, input: &str, kind: EmbedKind) -> EmbedModule {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return EmbedModule::fallback(input, Provider::External, kind, FallbackReason::Empty);
        }
        if trimmed
            .get(..11)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("javascript:"))
        {
            return EmbedModule::fallback(
                input,
                Provider::External,
                kind,
                FallbackReason::BlockedScheme,
            );
        }

        if trimmed.to_ascii_lowercase().contains("<iframe") {
            return match iframe_src(trimmed) {
                Some(src) => self.normalize(&src, kind).restore_raw(input),
                None => EmbedModule::fallback(
                    input,
                    Provider::External,
                    kind,
                    FallbackReason::MissingSrc,
                )
                .restore_raw(input),
            };
        }

        let Some(provider) = Provider::detect(trimmed) else {
            return EmbedModule::fallback(
                input,
                Provider::External,
                kind,
                FallbackReason::UnknownProvider,
            );
        };

        let resolved = match provider {
            Provider::Groovescribe => groovescribe::resolve(trimmed, &self.groovescribe_host),
            Provider::Youtube => youtube::resolve(trimmed),
            Provider::Vimeo => vimeo::resolve(trimmed),
            Provider::Spotify => spotify::resolve(trimmed),
            Provider::AppleMusic => apple_music::resolve(trimmed),
            Provider::External => None,
        };

        match resolved {
            Some(resolved) => EmbedModule::embedded(input, provider, kind, resolved),
            None => {
                tracing::debug!(
                    target: "embed",
                    provider = ?provider,
                    "Recognized provider but no known URL shape"
                );
                EmbedModule::fallback(input, provider, kind, FallbackReason::UnrecognizedShape)
            }
        }
    }
}

/// Normalize a media reference with the default player hosts.
///
/// Never fails. Empty input and `javascript:` links become external
/// fallbacks, iframe snippets are resolved through their `src`, and anything
/// no provider recognizes falls back to a plain link to the original text.
pub fn normalize_embed_module(input: &str, kind: EmbedKind) -> EmbedModule {
    EmbedNormalizer::default().normalize(input, kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_youtube_short_link() {
        let module = normalize_embed_module("https://youtu.be/dQw4w9WgXcQ", EmbedKind::Video);
        assert_eq!(module.status, EmbedStatus::Embedded);
        assert_eq!(module.provider, Provider::Youtube);
        assert_eq!(
            module.embed.embed_url.as_deref(),
            Some("https://www.youtube.com/embed/dQw4w9WgXcQ")
        );
        assert_eq!(module.embed.raw, "https://youtu.be/dQw4w9WgXcQ");
        assert!(module.fallback.is_none());
    }

    #[test]
    fn test_free_text_falls_back() {
        let module = normalize_embed_module("not a url at all", EmbedKind::External);
        assert_eq!(module.status, EmbedStatus::Fallback);
        assert_eq!(module.provider, Provider::External);
        let fallback = module.fallback.unwrap();
        assert_eq!(fallback.url, "not a url at all");
        assert_eq!(fallback.label, "Open link");
        assert_eq!(module.embed.raw, "not a url at all");
        assert_eq!(module.embed.embed_url, None);
    }

    #[test]
    fn test_empty_and_javascript_inputs() {
        let empty = normalize_embed_module("  ", EmbedKind::Video);
        assert_eq!(empty.status, EmbedStatus::Fallback);
        assert_eq!(empty.embed.raw, "  ");
        assert_eq!(empty.kind, EmbedKind::Video);
        assert_eq!(empty.meta.unwrap().reason, Some(FallbackReason::Empty));

        let script = normalize_embed_module(" JavaScript:alert(1)", EmbedKind::Video);
        assert_eq!(script.provider, Provider::External);
        assert_eq!(script.fallback.unwrap().url, " JavaScript:alert(1)");
        assert_eq!(script.meta.unwrap().reason, Some(FallbackReason::BlockedScheme));
    }

    #[test]
    fn test_iframe_keeps_outer_html() {
        let html = r#"<iframe width="560" height="315" src="https://www.youtube.com/embed/dQw4w9WgXcQ?si=abc" frameborder="0"></iframe>"#;
        let module = normalize_embed_module(html, EmbedKind::Video);
        assert_eq!(module.status, EmbedStatus::Embedded);
        assert_eq!(module.embed.raw, html);
        assert_eq!(
            module.embed.embed_url.as_deref(),
            Some("https://www.youtube.com/embed/dQw4w9WgXcQ")
        );
        assert_eq!(module.meta.unwrap().source.as_deref(), Some("iframe"));
    }

    #[test]
    fn test_iframe_fallback_keeps_outer_html() {
        let html = r#"<iframe src="https://example.com/player/42"></iframe>"#;
        let module = normalize_embed_module(html, EmbedKind::Video);
        assert_eq!(module.status, EmbedStatus::Fallback);
        assert_eq!(module.embed.raw, html);
        assert_eq!(module.fallback.unwrap().url, html);

        let no_src = normalize_embed_module("<iframe width=\"1\"></iframe>", EmbedKind::Video);
        assert_eq!(no_src.status, EmbedStatus::Fallback);
        assert_eq!(no_src.meta.unwrap().reason, Some(FallbackReason::MissingSrc));
    }

    #[test]
    fn test_dispatch_order_prefers_groovescribe() {
        // A GrooveScribe link that mentions youtube in its title
        let module = normalize_embed_module(
            "https://www.mikeslessons.com/groove/?TimeSig=4/4&Title=youtube.com&H=|x-x-|",
            EmbedKind::External,
        );
        assert_eq!(module.provider, Provider::Groovescribe);
        assert_eq!(module.kind, EmbedKind::Notation);
        assert_eq!(
            module.embed.embed_url.as_deref(),
            Some("https://teacher.musicdott.com/groovescribe/GrooveEmbed.html?TimeSig=4/4&Title=youtube.com&H=|x-x-|")
        );
    }

    #[test]
    fn test_recognized_provider_with_unknown_shape() {
        let module = normalize_embed_module("https://www.youtube.com/@somechannel", EmbedKind::Video);
        assert_eq!(module.provider, Provider::Youtube);
        assert_eq!(module.status, EmbedStatus::Fallback);
        assert_eq!(module.fallback.unwrap().label, "Watch on YouTube");
    }

    #[test]
    fn test_custom_groovescribe_host() {
        let normalizer = EmbedNormalizer::new("https://grooves.example/embed.html");
        let module = normalizer.normalize("?TimeSig=4/4&H=x-x-", EmbedKind::Notation);
        assert_eq!(
            module.embed.embed_url.as_deref(),
            Some("https://grooves.example/embed.html?TimeSig=4/4&H=x-x-")
        );
    }

    #[test]
    fn test_iframe_html_rendering() {
        let module = normalize_embed_module("https://youtu.be/dQw4w9WgXcQ", EmbedKind::Video);
        let html = module.iframe_html().unwrap();
        assert!(html.starts_with("<iframe width=\"560\" height=\"315\""));
        assert!(html.contains("src=\"https://www.youtube.com/embed/dQw4w9WgXcQ\""));

        let fallback = normalize_embed_module("plain", EmbedKind::External);
        assert!(fallback.iframe_html().is_none());
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(normalize_embed_module(
            "https://youtu.be/dQw4w9WgXcQ",
            EmbedKind::Video,
        ))
        .unwrap();
        assert_eq!(json["type"], "video");
        assert_eq!(json["provider"], "youtube");
        assert_eq!(json["status"], "embedded");
        assert_eq!(json["embed"]["raw"], "https://youtu.be/dQw4w9WgXcQ");
        assert!(json.get("fallback").is_none());

        let json = serde_json::to_value(normalize_embed_module("x", EmbedKind::Audio)).unwrap();
        assert!(json["embed"]["embed_url"].is_null());
        assert_eq!(json["fallback"]["url"], "x");
        assert_eq!(json["meta"]["reason"], "unknown_provider");
    }

    #[test]
    fn test_iframe_src_unescapes_ampersands() {
        assert_eq!(
            iframe_src(r#"<IFRAME SRC='a?b=1&amp;c=2'>"#).as_deref(),
            Some("a?b=1&c=2")
        );
        assert_eq!(iframe_src("<div src=\"x\">"), None);
    }
}
