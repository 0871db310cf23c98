//! Shared fixtures for the cache integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pantry_client::Notifier;
use pantry_core::types::DocId;
use pantry_db::store::{Document, Precondition, Query, WriteReceipt, WriteSet};
use pantry_db::{DocumentStore, MemoryStore, StoreError, StoreResult};

/// Notifier that remembers every alert.
#[derive(Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn alerts(&self) -> Vec<(String, String)> {
        self.alerts.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn alert(&self, title: &str, message: &str) {
        self.alerts
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }
}

/// In-memory store that can be switched offline to simulate network loss.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    offline: AtomicBool,
}

impl FlakyStore {
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Backend("network unavailable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn insert(&self, collection: &str, write: WriteSet) -> StoreResult<WriteReceipt> {
        self.check()?;
        self.inner.insert(collection, write).await
    }

    async fn merge(
        &self,
        collection: &str,
        id: &str,
        write: WriteSet,
        precondition: Option<Precondition>,
    ) -> StoreResult<WriteReceipt> {
        self.check()?;
        self.inner.merge(collection, id, write, precondition).await
    }

    async fn merge_batch(
        &self,
        collection: &str,
        writes: Vec<(DocId, WriteSet)>,
    ) -> StoreResult<Vec<WriteReceipt>> {
        self.check()?;
        self.inner.merge_batch(collection, writes).await
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.check()?;
        self.inner.delete(collection, id).await
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        self.check()?;
        self.inner.get(collection, id).await
    }

    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>> {
        self.check()?;
        self.inner.query(collection, query).await
    }
}

/// Fresh flaky store plus a recording notifier.
pub fn fixtures() -> (Arc<FlakyStore>, Arc<RecordingNotifier>) {
    (
        Arc::new(FlakyStore::default()),
        Arc::new(RecordingNotifier::default()),
    )
}
