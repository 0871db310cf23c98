//! Repository layer.
//!
//! [`Collection`] is a stateless facade over one document collection. It
//! converts between stored documents (string timestamps written by the
//! store's clock) and typed records, and logs every failure before handing
//! it back to the caller. Nothing here retries.
//!
//! Entity-specific queries live in [`fridge_repo`] and [`buy_list_repo`] as
//! inherent methods on the concrete `Collection<R>` types.

use std::marker::PhantomData;
use std::sync::Arc;

use pantry_core::records::{
    self, Fields, Record, FIELD_CREATED_AT, FIELD_UPDATED_AT, FIELD_USER_ID,
};
use pantry_core::types::{now_micros, parse_timestamp, DocId, Timestamp};
use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::store::{Direction, Document, DocumentStore, Precondition, Query, WriteSet};

pub mod buy_list_repo;
pub mod fridge_repo;

pub use buy_list_repo::BuyListRepo;
pub use fridge_repo::FridgeRepo;

/// Result of a successful insert.
#[derive(Debug, Clone, PartialEq)]
pub struct Created<R> {
    /// Store-assigned id.
    pub id: DocId,
    /// The record as written, with the server-assigned timestamps.
    pub record: R,
}

/// Repository bound to one collection of `R` records.
pub struct Collection<R: Record> {
    store: Arc<dyn DocumentStore>,
    name: String,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Clone for Collection<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            name: self.name.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: Record> std::fmt::Debug for Collection<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection").field("name", &self.name).finish()
    }
}

impl<R: Record> Collection<R> {
    /// Repository over the record type's collection.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            name: R::COLLECTION.to_string(),
            _record: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    /// Insert a new record; the store assigns the id and both timestamps.
    pub async fn add_item(&self, draft: &R::Draft) -> StoreResult<Created<R>> {
        self.add_item_for(draft, None).await
    }

    /// Insert a new record, tagging it with `owner` unless the draft
    /// already names one.
    pub async fn add_item_for(
        &self,
        draft: &R::Draft,
        owner: Option<&str>,
    ) -> StoreResult<Created<R>> {
        let result = self.insert(draft, owner).await;
        self.log_failure("add", None, result)
    }

    async fn insert(&self, draft: &R::Draft, owner: Option<&str>) -> StoreResult<Created<R>> {
        let mut fields = records::draft_fields(draft)?;
        if let Some(owner) = owner {
            fields
                .entry(FIELD_USER_ID)
                .or_insert_with(|| Value::String(owner.to_string()));
        }

        let write = WriteSet::from_fields(fields.clone())
            .server_timestamp(FIELD_CREATED_AT)
            .server_timestamp(FIELD_UPDATED_AT);
        let receipt = self.store.insert(&self.name, write).await?;

        let record = records::assemble::<R>(
            &receipt.id,
            fields,
            receipt.update_time,
            receipt.update_time,
        )?;
        tracing::debug!(collection = %self.name, id = %receipt.id, "Document added");
        Ok(Created {
            id: receipt.id,
            record,
        })
    }

    /// Merge `patch` into an existing record and refresh `updatedAt`.
    ///
    /// Last writer wins; returns the server update time.
    pub async fn update_item(&self, id: &str, patch: &R::Patch) -> StoreResult<Timestamp> {
        let result = self.merge(id, patch, None).await;
        self.log_failure("update", Some(id), result)
    }

    /// Like [`update_item`](Self::update_item), but rejected with
    /// [`StoreError::Conflict`] when the record changed since
    /// `expected_updated_at`.
    pub async fn update_item_if_unchanged(
        &self,
        id: &str,
        patch: &R::Patch,
        expected_updated_at: Timestamp,
    ) -> StoreResult<Timestamp> {
        let result = self
            .merge(id, patch, Some(Precondition::UpdateTime(expected_updated_at)))
            .await;
        self.log_failure("conditional update", Some(id), result)
    }

    async fn merge(
        &self,
        id: &str,
        patch: &R::Patch,
        precondition: Option<Precondition>,
    ) -> StoreResult<Timestamp> {
        let fields = records::patch_fields(patch)?;
        let write = WriteSet::from_fields(fields).server_timestamp(FIELD_UPDATED_AT);
        let receipt = self
            .store
            .merge(&self.name, id, write, precondition)
            .await?;
        Ok(receipt.update_time)
    }

    /// Permanently remove a record.
    pub async fn delete_item(&self, id: &str) -> StoreResult<()> {
        let result = self.store.delete(&self.name, id).await;
        self.log_failure("delete", Some(id), result)
    }

    /// Point read by id.
    pub async fn get_item(&self, id: &str) -> StoreResult<Option<R>> {
        let result = match self.store.get(&self.name, id).await {
            Ok(Some(doc)) => materialize(doc).map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };
        self.log_failure("get", Some(id), result)
    }

    /// Every record in scope, newest created first.
    pub async fn get_all_items(&self, owner: Option<&str>) -> StoreResult<Vec<R>> {
        self.find(self.scoped_query(owner), "list").await
    }

    /// Query scoped to `owner` (when given) ordered by creation time, newest first.
    pub(crate) fn scoped_query(&self, owner: Option<&str>) -> Query {
        let query = match owner {
            Some(owner) => Query::new().where_eq(FIELD_USER_ID, owner),
            None => Query::new(),
        };
        query.order_by(FIELD_CREATED_AT, Direction::Descending)
    }

    /// Run a query and materialize the results.
    ///
    /// Documents that cannot be turned into an `R` are logged and skipped,
    /// so one bad write from another client does not hide the rest.
    pub(crate) async fn find(&self, query: Query, op: &'static str) -> StoreResult<Vec<R>> {
        let result = self.store.query(&self.name, &query).await.map(|docs| {
            docs.into_iter()
                .filter_map(|doc| {
                    let id = doc.id.clone();
                    match materialize::<R>(doc) {
                        Ok(record) => Some(record),
                        Err(e) => {
                            tracing::warn!(
                                collection = %self.name,
                                id = %id,
                                error = %e,
                                "Skipping malformed document"
                            );
                            None
                        }
                    }
                })
                .collect()
        });
        self.log_failure(op, None, result)
    }

    pub(crate) fn log_failure<T>(
        &self,
        op: &'static str,
        id: Option<&str>,
        result: StoreResult<T>,
    ) -> StoreResult<T> {
        if let Err(e) = &result {
            tracing::error!(
                collection = %self.name,
                op,
                id = id.unwrap_or("-"),
                error = %e,
                "Document store operation failed"
            );
        }
        result
    }
}

/// Turn a stored document into a record.
///
/// A timestamp field the store has not populated yet (or cannot be parsed)
/// is replaced by the current wall-clock time. That value is a stand-in,
/// not the record's real history.
pub(crate) fn materialize<R: Record>(doc: Document) -> StoreResult<R> {
    let created_at = read_timestamp(&doc.fields, FIELD_CREATED_AT, &doc.id);
    let updated_at = read_timestamp(&doc.fields, FIELD_UPDATED_AT, &doc.id);
    records::assemble::<R>(&doc.id, doc.fields, created_at, updated_at).map_err(StoreError::from)
}

fn read_timestamp(fields: &Fields, field: &str, id: &str) -> Timestamp {
    match fields.get(field).and_then(Value::as_str).and_then(parse_timestamp) {
        Some(ts) => ts,
        None => {
            tracing::debug!(id, field, "Timestamp not populated, substituting current time");
            now_micros()
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pantry_core::records::FridgeItem;
    use serde_json::json;

    use super::*;

    fn doc(fields: Fields) -> Document {
        let now = Utc::now();
        Document {
            id: "d1".into(),
            fields,
            create_time: now,
            update_time: now,
        }
    }

    fn base_fields() -> Fields {
        let mut fields = Fields::new();
        fields.insert("name".into(), json!("butter"));
        fields.insert("category".into(), json!("dairy"));
        fields.insert("location".into(), json!("refrigerated"));
        fields
    }

    #[test]
    fn materialize_reads_stored_timestamps() {
        let mut fields = base_fields();
        fields.insert("createdAt".into(), json!("2024-04-01T10:00:00.000000Z"));
        fields.insert("updatedAt".into(), json!("2024-04-02T10:00:00.000000Z"));

        let item: FridgeItem = materialize(doc(fields)).unwrap();

        assert_eq!(
            item.created_at,
            Utc.with_ymd_and_hms(2024, 4, 1, 10, 0, 0).unwrap()
        );
        assert_eq!(
            item.updated_at,
            Utc.with_ymd_and_hms(2024, 4, 2, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn materialize_substitutes_now_for_pending_timestamps() {
        let before = now_micros();
        let mut fields = base_fields();
        fields.insert("createdAt".into(), Value::Null);

        let item: FridgeItem = materialize(doc(fields)).unwrap();

        assert!(item.created_at >= before);
        assert!(item.updated_at >= before);
        assert_eq!(item.id, "d1");
    }
}
