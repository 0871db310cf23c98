//! In-process document store.
//!
//! Holds every collection in a `tokio::sync::RwLock`. Used by tests and by
//! embedders that run without a database (`STORE_BACKEND=memory`).

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Duration;
use pantry_core::records::Fields;
use pantry_core::types::{now_micros, DocId, Timestamp};
use tokio::sync::RwLock;

use super::{Document, DocumentStore, Precondition, Query, WriteReceipt, WriteSet};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone)]
struct StoredDoc {
    fields: Fields,
    create_time: Timestamp,
    update_time: Timestamp,
}

#[derive(Debug, Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<DocId, StoredDoc>>,
    last_commit: Option<Timestamp>,
}

impl Inner {
    /// Next commit time: wall clock, bumped to stay strictly increasing.
    fn tick(&mut self) -> Timestamp {
        let now = now_micros();
        let next = match self.last_commit {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_commit = Some(next);
        next
    }

    fn check(
        &self,
        collection: &str,
        id: &str,
        precondition: Option<Precondition>,
    ) -> StoreResult<()> {
        let doc = self
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        match precondition {
            Some(Precondition::UpdateTime(expected)) if expected != doc.update_time => {
                Err(StoreError::Conflict {
                    collection: collection.to_string(),
                    id: id.to_string(),
                    expected,
                    actual: doc.update_time,
                })
            }
            _ => Ok(()),
        }
    }

    fn apply(&mut self, collection: &str, id: &str, fields: Fields, commit: Timestamp) {
        if let Some(doc) = self
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
        {
            doc.fields.extend(fields);
            doc.update_time = commit;
        }
    }
}

/// Document store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently in `collection`.
    pub async fn len(&self, collection: &str) -> usize {
        let inner = self.inner.read().await;
        inner.collections.get(collection).map_or(0, BTreeMap::len)
    }

    /// Store a document verbatim under `id`, bypassing sentinel resolution.
    ///
    /// Lets callers reproduce documents written by other clients, including
    /// ones whose timestamp fields have not been populated yet.
    pub async fn put_raw(&self, collection: &str, id: &str, fields: Fields) {
        let mut inner = self.inner.write().await;
        let commit = inner.tick();
        inner.collections.entry(collection.to_string()).or_default().insert(
            id.to_string(),
            StoredDoc {
                fields,
                create_time: commit,
                update_time: commit,
            },
        );
    }
}

fn new_doc_id() -> DocId {
    uuid::Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, write: WriteSet) -> StoreResult<WriteReceipt> {
        let mut inner = self.inner.write().await;
        let commit = inner.tick();
        let id = new_doc_id();
        inner.collections.entry(collection.to_string()).or_default().insert(
            id.clone(),
            StoredDoc {
                fields: write.resolve(commit),
                create_time: commit,
                update_time: commit,
            },
        );
        Ok(WriteReceipt {
            id,
            update_time: commit,
        })
    }

    async fn merge(
        &self,
        collection: &str,
        id: &str,
        write: WriteSet,
        precondition: Option<Precondition>,
    ) -> StoreResult<WriteReceipt> {
        let mut inner = self.inner.write().await;
        inner.check(collection, id, precondition)?;
        let commit = inner.tick();
        inner.apply(collection, id, write.resolve(commit), commit);
        Ok(WriteReceipt {
            id: id.to_string(),
            update_time: commit,
        })
    }

    async fn merge_batch(
        &self,
        collection: &str,
        writes: Vec<(DocId, WriteSet)>,
    ) -> StoreResult<Vec<WriteReceipt>> {
        let mut inner = self.inner.write().await;
        for (id, _) in &writes {
            inner.check(collection, id, None)?;
        }
        let commit = inner.tick();
        let mut receipts = Vec::with_capacity(writes.len());
        for (id, write) in writes {
            inner.apply(collection, &id, write.resolve(commit), commit);
            receipts.push(WriteReceipt {
                id,
                update_time: commit,
            });
        }
        Ok(receipts)
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(docs) = inner.collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let inner = self.inner.read().await;
        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|doc| to_document(id, doc)))
    }

    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>> {
        let inner = self.inner.read().await;
        let mut docs: Vec<Document> = inner
            .collections
            .get(collection)
            .into_iter()
            .flat_map(|docs| docs.iter())
            .filter(|(_, doc)| query.matches(&doc.fields))
            .map(|(id, doc)| to_document(id, doc))
            .collect();
        query.sort(&mut docs);
        Ok(docs)
    }
}

fn to_document(id: &str, doc: &StoredDoc) -> Document {
    Document {
        id: id.to_string(),
        fields: doc.fields.clone(),
        create_time: doc.create_time,
        update_time: doc.update_time,
    }
}
