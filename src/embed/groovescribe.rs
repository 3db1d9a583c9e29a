use super::{EmbedMeta, Resolved};
use crate::notation::groovescribe_query;

pub(super) fn matches(input: &str) -> bool {
    let lower = input.to_ascii_lowercase();
    ["timesig=", "grooveembed", "groovescribe", "mikeslessons.com/groove"]
        .iter()
        .any(|signature| lower.contains(signature))
}

/// Re-host the groove query on the configured player.
pub(super) fn resolve(input: &str, host: &str) -> Option<Resolved> {
    let query = groovescribe_query(input)?;
    Some(Resolved {
        embed_url: format!("{}?{}", host.trim_end_matches('?'), query),
        meta: EmbedMeta::default(),
    })
}
