// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;

use crate::batching::RequestBatch;
use crate::error::BulkError;
use crate::request::{BulkDeleteRequest, BulkIndexRequest, BulkRequest, BulkUpdateRequest, OpType};
use crate::response::{BulkErrorDetails, BulkResponse, BulkResponseItem};
use super::traits::{BulkClient, BulkService};

type DocKey = (String, String);

/// A document held by the in-memory store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub version: u64,
    pub source: Value,
}

#[derive(Debug, Default)]
struct Store {
    docs: DashMap<DocKey, StoredDocument>,
    seq_no: AtomicU64,
}

/// Client for an in-process document store.
///
/// Every service it hands out writes to the same shared store, so several
/// workers can commit concurrently.
#[derive(Debug, Clone, Default)]
pub struct InMemoryClient {
    store: Arc<Store>,
}

impl InMemoryClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a stored document
    #[must_use]
    pub fn get(&self, index: &str, id: &str) -> Option<StoredDocument> {
        self.store
            .docs
            .get(&(index.to_string(), id.to_string()))
            .map(|r| r.value().clone())
    }

    /// Number of documents across all indices
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.docs.is_empty()
    }

    /// Number of documents in one index
    #[must_use]
    pub fn count(&self, index: &str) -> usize {
        self.store.docs.iter().filter(|e| e.key().0 == index).count()
    }

    pub fn clear(&self) {
        self.store.docs.clear();
    }
}

impl BulkClient for InMemoryClient {
    type Service = InMemoryBulkService;

    fn bulk(&self) -> Self::Service {
        InMemoryBulkService {
            store: Arc::clone(&self.store),
            batch: RequestBatch::new(),
        }
    }
}

/// Bulk service applying index/create/update/delete against the shared store.
#[derive(Debug)]
pub struct InMemoryBulkService {
    store: Arc<Store>,
    batch: RequestBatch<BulkRequest>,
}

fn item(index: &str, id: &str, status: u16) -> BulkResponseItem {
    BulkResponseItem {
        index: index.to_string(),
        id: id.to_string(),
        status,
        ..Default::default()
    }
}

fn error_item(index: &str, id: &str, status: u16, kind: &str, reason: String) -> BulkResponseItem {
    BulkResponseItem {
        error: Some(BulkErrorDetails { kind: kind.to_string(), reason }),
        ..item(index, id, status)
    }
}

fn merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (k, v) in patch {
                merge(target.entry(k.clone()).or_insert(Value::Null), v);
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

impl InMemoryBulkService {
    fn written(&self, mut item: BulkResponseItem, version: u64, result: &str) -> BulkResponseItem {
        item.version = Some(version);
        item.result = Some(result.to_string());
        item.seq_no = Some(self.store.seq_no.fetch_add(1, Ordering::Relaxed));
        item
    }

    fn apply_index(&self, r: &BulkIndexRequest) -> BulkResponseItem {
        let id = r.id.clone().unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let base = item(&r.index, &id, 201);
        match (self.store.docs.entry((r.index.clone(), id.clone())), r.op_type) {
            (Entry::Occupied(_), OpType::Create) => error_item(
                &r.index,
                &id,
                409,
                "version_conflict_engine_exception",
                format!("[{}]: version conflict, document already exists", id),
            ),
            (Entry::Occupied(mut e), OpType::Index) => {
                let doc = e.get_mut();
                doc.version += 1;
                doc.source = r.doc.clone();
                let version = doc.version;
                drop(e);
                self.written(BulkResponseItem { status: 200, ..base }, version, "updated")
            }
            (Entry::Vacant(e), _) => {
                e.insert(StoredDocument { version: 1, source: r.doc.clone() });
                self.written(base, 1, "created")
            }
        }
    }

    fn apply_update(&self, r: &BulkUpdateRequest) -> BulkResponseItem {
        match self.store.docs.entry((r.index.clone(), r.id.clone())) {
            Entry::Occupied(mut e) => {
                let doc = e.get_mut();
                merge(&mut doc.source, &r.doc);
                doc.version += 1;
                let version = doc.version;
                drop(e);
                self.written(item(&r.index, &r.id, 200), version, "updated")
            }
            Entry::Vacant(e) if r.doc_as_upsert => {
                e.insert(StoredDocument { version: 1, source: r.doc.clone() });
                self.written(item(&r.index, &r.id, 201), 1, "created")
            }
            Entry::Vacant(_) => error_item(
                &r.index,
                &r.id,
                404,
                "document_missing_exception",
                format!("[{}]: document missing", r.id),
            ),
        }
    }

    fn apply_delete(&self, r: &BulkDeleteRequest) -> BulkResponseItem {
        match self.store.docs.remove(&(r.index.clone(), r.id.clone())) {
            Some((_, doc)) => self.written(item(&r.index, &r.id, 200), doc.version + 1, "deleted"),
            None => BulkResponseItem {
                result: Some("not_found".to_string()),
                ..item(&r.index, &r.id, 404)
            },
        }
    }
}

#[async_trait]
impl BulkService for InMemoryBulkService {
    type Request = BulkRequest;

    fn add(&mut self, request: BulkRequest) {
        self.batch.push(request);
    }

    fn number_of_actions(&self) -> usize {
        self.batch.len()
    }

    fn estimated_size_in_bytes(&self) -> u64 {
        self.batch.total_bytes()
    }

    fn requests(&self) -> &[BulkRequest] {
        self.batch.items()
    }

    async fn execute(&self) -> Result<BulkResponse, BulkError> {
        if self.batch.is_empty() {
            return Err(BulkError::Rejected {
                status: 400,
                reason: "no bulk actions to commit".to_string(),
            });
        }
        let started = Instant::now();
        let items: Vec<(String, BulkResponseItem)> = self
            .batch
            .items()
            .iter()
            .map(|req| {
                let outcome = match req {
                    BulkRequest::Index(r) => self.apply_index(r),
                    BulkRequest::Update(r) => self.apply_update(r),
                    BulkRequest::Delete(r) => self.apply_delete(r),
                };
                (req.action().to_string(), outcome)
            })
            .collect();
        let took = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        Ok(BulkResponse::from_items(took, items))
    }

    fn reset(&mut self) {
        self.batch.clear();
    }
}
