//! Defensive extraction of segment proposals from free-form model text.
//!
//! Model output is rarely clean JSON: it arrives wrapped in prose, inside
//! markdown code fences, or as an object holding the list. Parsing never
//! fails; unusable text yields an empty list and malformed entries are
//! skipped individually.

use serde_json::Value;
use tracing::debug;

use reelcut_models::timestamp::parse_timestamp;
use reelcut_models::SegmentCandidate;

/// Keys under which a wrapping object may hold the candidate list.
const LIST_KEYS: &[&str] = &["clips", "highlights", "segments"];

/// Label keys, in preference order.
const LABEL_KEYS: &[&str] = &["title", "label"];

/// Extract `{start, end, label}` proposals from raw model output.
pub fn parse_candidates(raw: &str) -> Vec<SegmentCandidate> {
    let items = bracketed_array(raw).or_else(|| unwrapped_array(raw));

    match items {
        Some(items) => candidates_from_items(&items),
        None => {
            debug!("No candidate list found in analysis output");
            Vec::new()
        }
    }
}

/// Parse the text between the first `[` and the last `]`.
fn bracketed_array(raw: &str) -> Option<Vec<Value>> {
    let open = raw.find('[')?;
    let close = raw.rfind(']')?;
    if close <= open {
        return None;
    }
    match serde_json::from_str::<Value>(&raw[open..=close]) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}

/// Strip code fences and parse the remainder as a list or a wrapping object.
fn unwrapped_array(raw: &str) -> Option<Vec<Value>> {
    let text = strip_code_fences(raw);
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => LIST_KEYS.iter().find_map(|key| match map.remove(*key) {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        }),
        _ => None,
    }
}

fn strip_code_fences(raw: &str) -> &str {
    let text = raw.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```JSON"))
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

fn candidates_from_items(items: &[Value]) -> Vec<SegmentCandidate> {
    items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            let candidate = candidate_from_value(item, idx + 1);
            if candidate.is_none() {
                debug!(position = idx + 1, "Skipping malformed candidate: {}", item);
            }
            candidate
        })
        .collect()
}

fn candidate_from_value(item: &Value, position: usize) -> Option<SegmentCandidate> {
    let obj = item.as_object()?;
    let start = seconds_from_value(obj.get("start")?)?;
    let end = seconds_from_value(obj.get("end")?)?;

    let label = LABEL_KEYS
        .iter()
        .filter_map(|key| obj.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| SegmentCandidate::default_label(position));

    Some(SegmentCandidate::new(start, end, label))
}

/// Seconds from a JSON number, a numeric string, or a clock string.
fn seconds_from_value(value: &Value) -> Option<f64> {
    let secs = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_timestamp(s).ok()?,
        _ => return None,
    };
    secs.is_finite().then_some(secs)
}
