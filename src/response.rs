// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Bulk response types.
//!
//! The processor only reads per-outcome counts and `took` from a
//! [`BulkResponse`] to maintain statistics; callers get the full response in
//! the after-callback.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};

/// Result of one bulk submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkResponse {
    /// Server-side processing time in milliseconds
    #[serde(default)]
    pub took: u64,
    /// True if at least one item failed
    #[serde(default)]
    pub errors: bool,
    /// One single-entry map per request, keyed by action name
    #[serde(default)]
    pub items: Vec<HashMap<String, BulkResponseItem>>,
}

/// Outcome of a single action within a bulk submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkResponseItem {
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(rename = "_seq_no", default, skip_serializing_if = "Option::is_none")]
    pub seq_no: Option<u64>,
    #[serde(default)]
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<BulkErrorDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkErrorDetails {
    #[serde(rename = "type")]
    pub kind: String,
    pub reason: String,
}

impl BulkResponseItem {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

impl BulkResponse {
    /// Build a response from `(action, item)` pairs, deriving `errors`.
    pub fn from_items(took: u64, items: impl IntoIterator<Item = (String, BulkResponseItem)>) -> Self {
        let items: Vec<HashMap<String, BulkResponseItem>> = items
            .into_iter()
            .map(|(action, item)| HashMap::from([(action, item)]))
            .collect();
        let errors = items.iter().flat_map(HashMap::values).any(|i| !i.is_success());
        Self { took, errors, items }
    }

    fn all(&self) -> impl Iterator<Item = &BulkResponseItem> {
        self.items.iter().flat_map(HashMap::values)
    }

    /// Items for the given action ("index", "create", "update", "delete").
    #[must_use]
    pub fn by_action(&self, action: &str) -> Vec<&BulkResponseItem> {
        self.items.iter().filter_map(|m| m.get(action)).collect()
    }

    /// Items for the given document id, across all actions.
    #[must_use]
    pub fn by_id(&self, id: &str) -> Vec<&BulkResponseItem> {
        self.all().filter(|i| i.id == id).collect()
    }

    #[must_use]
    pub fn indexed(&self) -> Vec<&BulkResponseItem> {
        self.by_action("index")
    }

    #[must_use]
    pub fn created(&self) -> Vec<&BulkResponseItem> {
        self.by_action("create")
    }

    #[must_use]
    pub fn updated(&self) -> Vec<&BulkResponseItem> {
        self.by_action("update")
    }

    #[must_use]
    pub fn deleted(&self) -> Vec<&BulkResponseItem> {
        self.by_action("delete")
    }

    /// Items with a 2xx status
    #[must_use]
    pub fn succeeded(&self) -> Vec<&BulkResponseItem> {
        self.all().filter(|i| i.is_success()).collect()
    }

    /// Items with a non-2xx status
    #[must_use]
    pub fn failed(&self) -> Vec<&BulkResponseItem> {
        self.all().filter(|i| !i.is_success()).collect()
    }
}
