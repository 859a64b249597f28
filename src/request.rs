// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Bulk request types.
//!
//! A [`BulkableRequest`] is the unit of work that flows through the
//! processor. The engine never inspects how a request is encoded; it only
//! asks for its transport lines and their approximate size.
//!
//! # Example
//!
//! ```
//! use bulk_engine::{BulkableRequest, BulkIndexRequest};
//! use serde_json::json;
//!
//! let req = BulkIndexRequest::new("tweets")
//!     .id("1")
//!     .doc(json!({"user": "alice", "message": "hello"}));
//!
//! let lines = req.source().unwrap();
//! assert_eq!(lines[0], r#"{"index":{"_index":"tweets","_id":"1"}}"#);
//! assert_eq!(req.estimated_size_in_bytes(), (lines[0].len() + lines[1].len() + 2) as u64);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use serde::Serialize;
use serde_json::Value;

use crate::error::BulkError;

/// A single write operation that can be batched into a bulk submission.
pub trait BulkableRequest: fmt::Display + Send + Sync + 'static {
    /// Render the request as newline-delimited transport lines.
    fn source(&self) -> Result<Vec<String>, BulkError>;

    /// Approximate encoded size: every line plus its trailing newline.
    fn estimated_size_in_bytes(&self) -> u64 {
        self.source()
            .map(|lines| lines.iter().map(|l| l.len() as u64 + 1).sum())
            .unwrap_or(0)
    }
}

/// Index operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpType {
    /// Create or replace
    #[default]
    Index,
    /// Create only, conflicts if the document exists
    Create,
}

impl OpType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Create => "create",
        }
    }
}

#[derive(Serialize)]
struct ActionMeta<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    routing: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_on_conflict: Option<u32>,
}

fn action_line(action: &str, meta: &ActionMeta<'_>) -> Result<String, BulkError> {
    // Single-entry map keeps the metadata fields in declaration order
    let line = BTreeMap::from([(action, meta)]);
    Ok(serde_json::to_string(&line)?)
}

fn write_lines<R: BulkableRequest + ?Sized>(req: &R, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match req.source() {
        Ok(lines) => write!(f, "{}", lines.join("\n")),
        Err(e) => write!(f, "error: {}", e),
    }
}

/// Index (or create) a whole document.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkIndexRequest {
    pub index: String,
    pub id: Option<String>,
    pub op_type: OpType,
    pub routing: Option<String>,
    pub doc: Value,
}

impl BulkIndexRequest {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            id: None,
            op_type: OpType::Index,
            routing: None,
            doc: Value::Null,
        }
    }

    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn op_type(mut self, op_type: OpType) -> Self {
        self.op_type = op_type;
        self
    }

    #[must_use]
    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    #[must_use]
    pub fn doc(mut self, doc: Value) -> Self {
        self.doc = doc;
        self
    }
}

impl BulkableRequest for BulkIndexRequest {
    fn source(&self) -> Result<Vec<String>, BulkError> {
        let meta = ActionMeta {
            index: &self.index,
            id: self.id.as_deref(),
            routing: self.routing.as_deref(),
            retry_on_conflict: None,
        };
        Ok(vec![
            action_line(self.op_type.as_str(), &meta)?,
            serde_json::to_string(&self.doc)?,
        ])
    }
}

impl fmt::Display for BulkIndexRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_lines(self, f)
    }
}

/// Partially update an existing document.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkUpdateRequest {
    pub index: String,
    pub id: String,
    pub routing: Option<String>,
    pub retry_on_conflict: Option<u32>,
    pub doc: Value,
    pub doc_as_upsert: bool,
}

impl BulkUpdateRequest {
    pub fn new(index: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            id: id.into(),
            routing: None,
            retry_on_conflict: None,
            doc: Value::Null,
            doc_as_upsert: false,
        }
    }

    #[must_use]
    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    #[must_use]
    pub fn retry_on_conflict(mut self, n: u32) -> Self {
        self.retry_on_conflict = Some(n);
        self
    }

    #[must_use]
    pub fn doc(mut self, doc: Value) -> Self {
        self.doc = doc;
        self
    }

    /// Insert `doc` as a new document if the target does not exist
    #[must_use]
    pub fn doc_as_upsert(mut self, upsert: bool) -> Self {
        self.doc_as_upsert = upsert;
        self
    }
}

#[derive(Serialize)]
struct UpdateBody<'a> {
    doc: &'a Value,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    doc_as_upsert: bool,
}

impl BulkableRequest for BulkUpdateRequest {
    fn source(&self) -> Result<Vec<String>, BulkError> {
        let meta = ActionMeta {
            index: &self.index,
            id: Some(&self.id),
            routing: self.routing.as_deref(),
            retry_on_conflict: self.retry_on_conflict,
        };
        let body = UpdateBody { doc: &self.doc, doc_as_upsert: self.doc_as_upsert };
        Ok(vec![action_line("update", &meta)?, serde_json::to_string(&body)?])
    }
}

impl fmt::Display for BulkUpdateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_lines(self, f)
    }
}

/// Delete a document. Renders a single action line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkDeleteRequest {
    pub index: String,
    pub id: String,
    pub routing: Option<String>,
}

impl BulkDeleteRequest {
    pub fn new(index: impl Into<String>, id: impl Into<String>) -> Self {
        Self { index: index.into(), id: id.into(), routing: None }
    }

    #[must_use]
    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }
}

impl BulkableRequest for BulkDeleteRequest {
    fn source(&self) -> Result<Vec<String>, BulkError> {
        let meta = ActionMeta {
            index: &self.index,
            id: Some(&self.id),
            routing: self.routing.as_deref(),
            retry_on_conflict: None,
        };
        Ok(vec![action_line("delete", &meta)?])
    }
}

impl fmt::Display for BulkDeleteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_lines(self, f)
    }
}

/// Any of the supported bulk operations.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkRequest {
    Index(BulkIndexRequest),
    Update(BulkUpdateRequest),
    Delete(BulkDeleteRequest),
}

impl BulkRequest {
    /// Target index
    #[must_use]
    pub fn index(&self) -> &str {
        match self {
            Self::Index(r) => &r.index,
            Self::Update(r) => &r.index,
            Self::Delete(r) => &r.index,
        }
    }

    /// Document id, if one was given
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Index(r) => r.id.as_deref(),
            Self::Update(r) => Some(&r.id),
            Self::Delete(r) => Some(&r.id),
        }
    }

    /// Action name as it appears in the bulk response
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Self::Index(r) => r.op_type.as_str(),
            Self::Update(_) => "update",
            Self::Delete(_) => "delete",
        }
    }
}

impl BulkableRequest for BulkRequest {
    fn source(&self) -> Result<Vec<String>, BulkError> {
        match self {
            Self::Index(r) => r.source(),
            Self::Update(r) => r.source(),
            Self::Delete(r) => r.source(),
        }
    }
}

impl fmt::Display for BulkRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(r) => fmt::Display::fmt(r, f),
            Self::Update(r) => fmt::Display::fmt(r, f),
            Self::Delete(r) => fmt::Display::fmt(r, f),
        }
    }
}

impl From<BulkIndexRequest> for BulkRequest {
    fn from(r: BulkIndexRequest) -> Self {
        Self::Index(r)
    }
}

impl From<BulkUpdateRequest> for BulkRequest {
    fn from(r: BulkUpdateRequest) -> Self {
        Self::Update(r)
    }
}

impl From<BulkDeleteRequest> for BulkRequest {
    fn from(r: BulkDeleteRequest) -> Self {
        Self::Delete(r)
    }
}
