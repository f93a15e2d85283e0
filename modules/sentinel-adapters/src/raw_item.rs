use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Uniform, source-agnostic representation of one fetched upstream document.
/// Immutable after construction — see §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawItem {
    pub source_adapter: String,
    /// Stable 32-hex digest; the cross-run dedup key. Never mutated.
    pub external_id: String,
    pub title: String,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub authors: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub source_url: Option<String>,
    pub metadata: HashMap<String, Value>,
}

impl RawItem {
    pub fn new(source_adapter: impl Into<String>, external_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source_adapter: source_adapter.into(),
            external_id: external_id.into(),
            title: title.into(),
            content: None,
            summary: None,
            authors: Vec::new(),
            published_at: None,
            source_url: None,
            metadata: HashMap::new(),
        }
    }
}
