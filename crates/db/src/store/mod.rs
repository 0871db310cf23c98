//! Document store abstraction.
//!
//! The store is an external collaborator: collections of schemaless JSON
//! documents keyed by a store-assigned id. Writes may carry
//! [`FieldValue::ServerTimestamp`] sentinels which the store replaces with
//! its own clock at commit time; the resolved time comes back in the
//! [`WriteReceipt`].

use std::cmp::Ordering;

use async_trait::async_trait;
use pantry_core::records::Fields;
use pantry_core::types::{format_timestamp, parse_timestamp, DocId, Timestamp};
use serde_json::Value;

use crate::error::StoreResult;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

// ---------------------------------------------------------------------------
// Write payloads
// ---------------------------------------------------------------------------

/// A field value in a write.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Value(Value),
    /// Replaced by the store's commit time.
    ServerTimestamp,
}

/// Ordered set of field writes for one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteSet {
    fields: Vec<(String, FieldValue)>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from plain field values.
    pub fn from_fields(fields: Fields) -> Self {
        Self {
            fields: fields
                .into_iter()
                .map(|(key, value)| (key, FieldValue::Value(value)))
                .collect(),
        }
    }

    pub fn set(mut self, field: impl Into<String>, value: Value) -> Self {
        self.push(field.into(), FieldValue::Value(value));
        self
    }

    pub fn server_timestamp(mut self, field: impl Into<String>) -> Self {
        self.push(field.into(), FieldValue::ServerTimestamp);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Replace sentinels with `commit_time` and produce plain fields.
    pub fn resolve(self, commit_time: Timestamp) -> Fields {
        self.fields
            .into_iter()
            .map(|(key, value)| match value {
                FieldValue::Value(v) => (key, v),
                FieldValue::ServerTimestamp => (key, Value::String(format_timestamp(commit_time))),
            })
            .collect()
    }

    fn push(&mut self, field: String, value: FieldValue) {
        self.fields.retain(|(key, _)| *key != field);
        self.fields.push((field, value));
    }
}

/// Condition a merge must satisfy to be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// The document's last update time must equal this value.
    UpdateTime(Timestamp),
}

/// Outcome of a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    pub id: DocId,
    /// Server commit time; also the value any timestamp sentinels resolved to.
    pub update_time: Timestamp,
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// A stored document with its store-managed metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocId,
    pub fields: Fields,
    pub create_time: Timestamp,
    pub update_time: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Equality filters plus an optional single-field ordering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<(String, Direction)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    /// Whether `fields` satisfies every equality filter.
    pub fn matches(&self, fields: &Fields) -> bool {
        self.filters
            .iter()
            .all(|(field, expected)| fields.get(field) == Some(expected))
    }

    /// Sort documents in place according to `order_by`.
    ///
    /// Documents missing the order field sort as newest, like a write whose
    /// server timestamp is still pending.
    pub fn sort(&self, docs: &mut [Document]) {
        let Some((field, direction)) = &self.order_by else {
            return;
        };
        docs.sort_by(|a, b| {
            let ord = compare_values(a.fields.get(field), b.fields.get(field));
            match direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            }
        });
    }
}

/// Total order over optional JSON values used for sorting.
///
/// Missing and null sort after everything else. Strings that both parse as
/// RFC 3339 timestamps compare chronologically.
pub(crate) fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            Some(Value::Bool(_)) => 0,
            Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(Value::Array(_)) | Some(Value::Object(_)) => 3,
            Some(Value::Null) | None => 4,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (parse_timestamp(x), parse_timestamp(y)) {
                (Some(tx), Some(ty)) => tx.cmp(&ty),
                _ => x.cmp(y),
            }
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

/// A collection-oriented document database.
///
/// Implementations resolve [`FieldValue::ServerTimestamp`] from their own
/// clock and guarantee a document's update time strictly increases.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document under a store-assigned id.
    async fn insert(&self, collection: &str, write: WriteSet) -> StoreResult<WriteReceipt>;

    /// Merge fields into an existing document.
    ///
    /// Fails with `NotFound` for an unknown id and with `Conflict` when the
    /// precondition does not hold.
    async fn merge(
        &self,
        collection: &str,
        id: &str,
        write: WriteSet,
        precondition: Option<Precondition>,
    ) -> StoreResult<WriteReceipt>;

    /// Merge several documents atomically: either every write applies or none.
    async fn merge_batch(
        &self,
        collection: &str,
        writes: Vec<(DocId, WriteSet)>,
    ) -> StoreResult<Vec<WriteReceipt>>;

    /// Remove a document. Deleting a missing id is a no-op.
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>>;
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;

    fn doc(id: &str, created: Option<&str>) -> Document {
        let now = Utc::now();
        let mut fields = Fields::new();
        if let Some(created) = created {
            fields.insert("createdAt".into(), json!(created));
        }
        Document {
            id: id.into(),
            fields,
            create_time: now,
            update_time: now,
        }
    }

    #[test]
    fn later_field_write_replaces_earlier_one() {
        let commit = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let fields = WriteSet::new()
            .set("updatedAt", json!("stale"))
            .server_timestamp("updatedAt")
            .resolve(commit);

        assert_eq!(fields.len(), 1);
        assert_eq!(fields["updatedAt"], "2024-03-01T08:00:00.000000Z");
    }

    #[test]
    fn descending_sort_puts_pending_timestamps_first() {
        let query = Query::new().order_by("createdAt", Direction::Descending);
        let mut docs = vec![
            doc("old", Some("2024-01-01T00:00:00.000000Z")),
            doc("pending", None),
            doc("new", Some("2024-02-01T00:00:00.000000Z")),
        ];

        query.sort(&mut docs);

        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["pending", "new", "old"]);
    }

    #[test]
    fn timestamps_with_offsets_compare_chronologically() {
        let a = json!("2024-01-01T10:00:00+05:00");
        let b = json!("2024-01-01T06:00:00Z");
        assert_eq!(compare_values(Some(&a), Some(&b)), Ordering::Less);
    }

    #[test]
    fn equality_filters_require_every_field() {
        let query = Query::new()
            .where_eq("userId", "u1")
            .where_eq("checked", true);
        let mut fields = Fields::new();
        fields.insert("userId".into(), json!("u1"));
        assert!(!query.matches(&fields));

        fields.insert("checked".into(), json!(true));
        assert!(query.matches(&fields));
    }
}
