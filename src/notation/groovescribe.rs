//! GrooveScribe dialect.
//!
//! Grooves are stored as the query string of a GrooveScribe link, e.g.
//! `TimeSig=4/4&Div=16&Tempo=80&Measures=1&H=|x-x-x-x-x-x-x-x-|&S=|----o-------o---|`.
//! The legacy data holds them as bare queries, full URLs and iframe snippets.

use super::symbols::GROOVESCRIBE_PATTERN_KEYS;
use super::{Extraction, TimeSignature};
use crate::embed::iframe_src;

/// Keys that mark a query string as GrooveScribe.
const RECOGNIZED_KEYS: &[&str] = &["TimeSig", "Tempo", "Div", "Measures", "H", "S", "K", "T1", "T2", "T3"];

/// Pull the GrooveScribe query out of a bare query, URL or iframe snippet.
///
/// Returns `None` unless the query carries at least one recognized key.
pub fn groovescribe_query(raw: &str) -> Option<String> {
    let source = if raw.to_ascii_lowercase().contains("<iframe") {
        iframe_src(raw)?
    } else {
        raw.trim().to_string()
    };
    let source = source.replace("&amp;", "&");

    let mut candidates = Vec::with_capacity(3);
    if let Some((_, query)) = source.split_once('?') {
        candidates.push(query);
    }
    if let Some(index) = source.find("TimeSig=") {
        candidates.push(&source[index..]);
    }
    candidates.push(source.as_str());

    candidates
        .into_iter()
        .map(|query| query.split('#').next().unwrap_or(query).trim())
        .find(|query| has_recognized_key(query))
        .map(str::to_string)
}

fn has_recognized_key(query: &str) -> bool {
    query.split('&').any(|pair| {
        pair.split_once('=')
            .is_some_and(|(key, _)| RECOGNIZED_KEYS.contains(&key.trim()))
    })
}

pub(crate) fn extract(raw: &str) -> Extraction {
    let mut extraction = Extraction::default();
    let Some(query) = groovescribe_query(raw) else {
        extraction.errors.push("no GrooveScribe query found".to_string());
        return extraction;
    };

    let mut patterns = Vec::new();
    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = match urlencoding::decode(value) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => {
                extraction
                    .warnings
                    .push(format!("could not decode value of {key}"));
                value.to_string()
            }
        };

        match key {
            "TimeSig" => match parse_time_signature(&value) {
                Some(time_signature) => extraction.time_signature = Some(time_signature),
                None => extraction
                    .errors
                    .push(format!("invalid TimeSig '{value}'")),
            },
            "Tempo" => match value.trim().parse::<u32>() {
                Ok(tempo) if tempo > 0 => extraction.tempo = Some(tempo),
                _ => extraction.warnings.push(format!("invalid Tempo '{value}'")),
            },
            "Div" => match value.trim().parse::<u32>() {
                Ok(division) if division > 0 => extraction.division = Some(division),
                _ => extraction.errors.push(format!("invalid Div '{value}'")),
            },
            "Measures" => {
                if value.trim().parse::<u32>().is_err() {
                    extraction
                        .warnings
                        .push(format!("invalid Measures '{value}'"));
                }
            }
            _ => {
                if let Some((_, hit)) = GROOVESCRIBE_PATTERN_KEYS.iter().find(|(k, _)| *k == key) {
                    patterns.push((key.to_string(), *hit, value));
                }
            }
        }
    }

    if patterns.is_empty() {
        extraction.errors.push("no instrument patterns".to_string());
    }
    for (key, hit, pattern) in &patterns {
        extraction.scan_pattern(pattern, Some(*hit), &format!(" in {key} pattern"));
    }

    if let Some(division) = extraction.division {
        let time_signature = extraction.time_signature.unwrap_or_default();
        extraction.steps_per_measure = division
            .checked_mul(time_signature.beats)
            .filter(|scaled| scaled % time_signature.unit == 0)
            .map(|scaled| scaled / time_signature.unit)
            .filter(|steps| *steps > 0)
            .or(Some(division));
    }

    extraction
}

fn parse_time_signature(value: &str) -> Option<TimeSignature> {
    let (beats, unit) = value.trim().split_once('/')?;
    let beats = beats.trim().parse::<u32>().ok().filter(|b| *b > 0)?;
    let unit = unit.trim().parse::<u32>().ok().filter(|u| *u > 0)?;
    Some(TimeSignature { beats, unit })
}
