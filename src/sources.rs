//! Normalizes heterogeneous chunk records into citable sources.
//!
//! Chunk-shaped records arrive from several producers with fields at the
//! top level or nested under `metadata`/`meta`, and with aliased names for
//! the same concept. Alias resolution happens exactly once, here, against
//! the fixed tables below; everything downstream sees the canonical
//! [`Source`] shape.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::types::Source;

/// Alias tables, in priority order (top level consulted before metadata).
const TITLE_KEYS: &[&str] = &["paper_title", "title", "paper"];
const AUTHOR_KEYS: &[&str] = &["authors", "author"];
const SECTION_KEYS: &[&str] = &["section", "chunk", "context", "excerpt", "part"];
const LINK_KEYS: &[&str] = &["link", "url", "source"];
const PAPER_ID_KEYS: &[&str] = &["paper_id", "id"];

const ARXIV_ABS_URL: &str = "https://arxiv.org/abs";

fn version_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"v\d+$").expect("static regex compiles"))
}

/// Resolves records into deduplicated sources, preserving input order.
///
/// Duplicates are removed at first occurrence, keyed by link when present
/// and by `(title, section)` otherwise. Records that are not key-value
/// maps are skipped.
pub fn resolve_sources(records: &[Value]) -> Vec<Source> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut sources = Vec::new();

    for record in records {
        if !record.is_object() {
            continue;
        }
        let meta = record
            .get("metadata")
            .or_else(|| record.get("meta"))
            .filter(|value| value.is_object());

        let title = resolve_field(record, meta, TITLE_KEYS);
        let authors = resolve_field(record, meta, AUTHOR_KEYS);
        let section = resolve_field(record, meta, SECTION_KEYS);

        // Link synthesis reads the paper id from nested metadata only: a
        // top-level `id` is a chunk id, not a paper identifier.
        let link = resolve_field(record, meta, LINK_KEYS).or_else(|| {
            meta.and_then(|meta| {
                PAPER_ID_KEYS
                    .iter()
                    .filter_map(|key| meta.get(key))
                    .find_map(display_string)
            })
            .map(|paper_id| {
                let bare_id = version_suffix().replace(&paper_id, "");
                format!("{ARXIV_ABS_URL}/{bare_id}")
            })
        });

        // All keys are coerced to one string form before membership tests.
        let key = match &link {
            Some(link) => format!("link:{link}"),
            None => format!("pair:{:?}|{:?}", title, section),
        };
        if !seen.insert(key) {
            continue;
        }

        sources.push(Source {
            paper_title: title,
            authors,
            section,
            link,
        });
    }

    sources
}

/// Tries each alias at the top level, then under the nested metadata.
fn resolve_field(record: &Value, meta: Option<&Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| record.get(key))
        .chain(
            meta.into_iter()
                .flat_map(|meta| keys.iter().filter_map(|key| meta.get(key))),
        )
        .find_map(display_string)
}

/// Renders a field value for display; lists are comma-joined.
fn display_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Array(items) if !items.is_empty() => Some(
            items
                .iter()
                .map(|item| match item {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
