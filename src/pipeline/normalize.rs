//! Raw channel records → `ChannelMessage`.
//!
//! A missing or malformed field falls back to a default. Only records that
//! are not JSON objects at all are dropped.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::pipeline::types::ChannelMessage;

/// Sender used when the record names nobody.
pub const UNKNOWN_SENDER: &str = "Unknown";

static BLOCK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<\s*(br|/p|/div|/li|/tr|hr)\b[^>]*>").expect("valid regex")
});
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// Result of normalizing a batch.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub messages: Vec<ChannelMessage>,
    /// Records dropped because they were not objects.
    pub skipped: usize,
}

/// Normalize a batch of raw records, preserving order.
pub fn normalize(raw: &[Value]) -> Normalized {
    let mut out = Normalized {
        messages: Vec::with_capacity(raw.len()),
        skipped: 0,
    };

    for (index, record) in raw.iter().enumerate() {
        match normalize_record(record) {
            Some(message) => out.messages.push(message),
            None => {
                warn!(index, kind = json_kind(record), "Skipping unusable message record");
                out.skipped += 1;
            }
        }
    }

    debug!(
        normalized = out.messages.len(),
        skipped = out.skipped,
        "Normalized channel records"
    );
    out
}

/// Normalize one record. `None` only when the record is not an object.
pub fn normalize_record(record: &Value) -> Option<ChannelMessage> {
    if !record.is_object() {
        return None;
    }

    let id = match record.get("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => synthesize_id(record),
    };

    let sender = str_at(record, &["from", "user", "displayName"])
        .or_else(|| str_at(record, &["from", "application", "displayName"]))
        .unwrap_or(UNKNOWN_SENDER)
        .to_string();

    let content = str_at(record, &["body", "content"])
        .map(strip_html)
        .unwrap_or_default();

    let created_at = str_at(record, &["createdDateTime"])
        .and_then(parse_timestamp)
        .unwrap_or_default();

    let mentions = match record.get("mentions") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|m| str_at(m, &["mentioned", "user", "displayName"]))
            .filter(|name| !name.trim().is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    };

    Some(ChannelMessage {
        id,
        sender,
        content,
        created_at,
        mentions,
    })
}

/// Follow `path` through nested objects to a string leaf.
fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(value, |current, key| current.get(*key))
        .and_then(Value::as_str)
}

/// Stable id derived from the record's canonical JSON form.
fn synthesize_id(record: &Value) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, record.to_string().as_bytes()).to_string()
}

/// RFC 3339, or a zone-less ISO timestamp taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Strip HTML tags and decode common entities, collapsing whitespace.
pub fn strip_html(html: &str) -> String {
    let spaced = BLOCK_TAG.replace_all(html, " ");
    let text = ANY_TAG.replace_all(&spaced, "");
    let decoded = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
