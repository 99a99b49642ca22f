//! Core data types crossing the store boundary.
//!
//! The summary payload itself is deliberately absent here: the store treats
//! it as an opaque validated JSON string and never deserializes it.

use serde::{Deserialize, Serialize};

/// One row of a ranked listing (recents, favorites).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeEntry {
    pub title: Option<String>,
    pub url: String,
    /// Whether the stored summary carries both an ingredients and a method
    /// section.
    pub has_summary: bool,
}

/// One ranked full-text search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: Option<String>,
    pub url: String,
}

/// Per-request model-usage metrics, appended to the usage ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageRecord {
    pub url: String,
    pub length_in: i64,
    pub length_out: i64,
    pub tokens_in: i64,
    pub tokens_out: i64,
}
