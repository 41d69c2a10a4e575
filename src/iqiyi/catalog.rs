//! Stream catalog normalization.
//!
//! The manifest lists one entry per rendition, already in the platform's
//! preference order. Entry fields are loosely typed (numbers sometimes arrive
//! as strings), so entries are read through `serde_json::Value`.

use serde::Serialize;
use serde_json::Value;

const UNKNOWN_QUALITY: &str = "Unknown";
const DEFAULT_FORMAT: &str = "mp4";

/// One playable rendition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamDescriptor {
    pub quality: String,
    #[serde(rename = "format")]
    pub container_format: String,
    pub url: String,
    #[serde(rename = "size")]
    pub size_bytes: i64,
    #[serde(rename = "duration")]
    pub duration_seconds: i64,
}

impl StreamDescriptor {
    /// Map a raw manifest entry. Missing fields take platform defaults.
    pub fn from_entry(entry: &Value) -> Self {
        Self {
            quality: text(entry, "scrsz").unwrap_or_else(|| UNKNOWN_QUALITY.to_string()),
            container_format: text(entry, "vtype").unwrap_or_else(|| DEFAULT_FORMAT.to_string()),
            url: text(entry, "l").unwrap_or_default(),
            size_bytes: int(entry, "vsize"),
            duration_seconds: int(entry, "dur"),
        }
    }
}

/// All renditions plus the recommended one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamCatalog {
    pub available: Vec<StreamDescriptor>,
    /// Zero or one entry: the head of `available`.
    pub recommended: Vec<StreamDescriptor>,
}

impl StreamCatalog {
    /// Normalize entries in source order. No quality comparison is made.
    /// Entries that are not JSON objects are dropped.
    pub fn from_entries(entries: &[Value]) -> Self {
        let available: Vec<StreamDescriptor> = entries
            .iter()
            .filter(|entry| entry.is_object())
            .map(StreamDescriptor::from_entry)
            .collect();
        let recommended = available.first().cloned().into_iter().collect();
        Self {
            available,
            recommended,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }
}

fn text(entry: &Value, key: &str) -> Option<String> {
    match entry.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
pub(crate) fn int(entry: &Value, key: &str) -> i64 {
    match entry.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}
