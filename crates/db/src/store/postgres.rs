//! PostgreSQL-backed document store.
//!
//! Every collection shares the `documents` table; fields live in a JSONB
//! column. Commit times come from `clock_timestamp()` so sentinels resolve
//! to the database server's clock, not the client's.

use async_trait::async_trait;
use pantry_core::records::Fields;
use pantry_core::types::{DocId, Timestamp};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use super::{Direction, Document, DocumentStore, Precondition, Query, WriteReceipt, WriteSet};
use crate::error::{StoreError, StoreResult};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, fields, create_time, update_time";

#[derive(Debug, FromRow)]
struct DocumentRow {
    id: String,
    fields: Json<Fields>,
    create_time: Timestamp,
    update_time: Timestamp,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Document {
            id: row.id,
            fields: row.fields.0,
            create_time: row.create_time,
            update_time: row.update_time,
        }
    }
}

/// Document store over a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Lock the row and return its update time, checking the precondition.
async fn lock_for_merge(
    tx: &mut Transaction<'_, Postgres>,
    collection: &str,
    id: &str,
    precondition: Option<Precondition>,
) -> StoreResult<Timestamp> {
    let current: Option<(Timestamp,)> = sqlx::query_as(
        "SELECT update_time FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE",
    )
    .bind(collection)
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;

    let (update_time,) = current.ok_or_else(|| StoreError::NotFound {
        collection: collection.to_string(),
        id: id.to_string(),
    })?;

    if let Some(Precondition::UpdateTime(expected)) = precondition {
        if expected != update_time {
            return Err(StoreError::Conflict {
                collection: collection.to_string(),
                id: id.to_string(),
                expected,
                actual: update_time,
            });
        }
    }
    Ok(update_time)
}

/// Server commit time, strictly after `after` when given.
async fn commit_time(
    tx: &mut Transaction<'_, Postgres>,
    after: Option<Timestamp>,
) -> StoreResult<Timestamp> {
    let (now,): (Timestamp,) = sqlx::query_as(
        "SELECT GREATEST(clock_timestamp(), COALESCE($1 + interval '1 microsecond', clock_timestamp()))",
    )
    .bind(after)
    .fetch_one(&mut **tx)
    .await?;
    Ok(now)
}

async fn apply_merge(
    tx: &mut Transaction<'_, Postgres>,
    collection: &str,
    id: &str,
    fields: Fields,
    commit: Timestamp,
) -> StoreResult<()> {
    sqlx::query(
        "UPDATE documents SET fields = fields || $3, update_time = $4
         WHERE collection = $1 AND id = $2",
    )
    .bind(collection)
    .bind(id)
    .bind(Json(fields))
    .bind(commit)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(&self, collection: &str, write: WriteSet) -> StoreResult<WriteReceipt> {
        let mut tx = self.pool.begin().await?;
        let commit = commit_time(&mut tx, None).await?;
        let id: DocId = uuid::Uuid::new_v4().simple().to_string();
        sqlx::query(
            "INSERT INTO documents (collection, id, fields, create_time, update_time)
             VALUES ($1, $2, $3, $4, $4)",
        )
        .bind(collection)
        .bind(&id)
        .bind(Json(write.resolve(commit)))
        .bind(commit)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
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
        let mut tx = self.pool.begin().await?;
        let previous = lock_for_merge(&mut tx, collection, id, precondition).await?;
        let commit = commit_time(&mut tx, Some(previous)).await?;
        apply_merge(&mut tx, collection, id, write.resolve(commit), commit).await?;
        tx.commit().await?;
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
        let mut tx = self.pool.begin().await?;
        let mut latest: Option<Timestamp> = None;
        for id in lock_order(&writes) {
            let previous = lock_for_merge(&mut tx, collection, id, None).await?;
            latest = latest.max(Some(previous));
        }
        let commit = commit_time(&mut tx, latest).await?;

        let mut receipts = Vec::with_capacity(writes.len());
        for (id, write) in writes {
            apply_merge(&mut tx, collection, &id, write.resolve(commit), commit).await?;
            receipts.push(WriteReceipt {
                id,
                update_time: commit,
            });
        }
        // Dropping the transaction on any error above rolls every write back.
        tx.commit().await?;
        Ok(receipts)
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let query = format!("SELECT {COLUMNS} FROM documents WHERE collection = $1 AND id = $2");
        let row = sqlx::query_as::<_, DocumentRow>(&query)
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Document::from))
    }

    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>> {
        let sql = build_select(query);
        let mut q = sqlx::query_as::<_, DocumentRow>(&sql).bind(collection);
        for (field, value) in &query.filters {
            q = q.bind(field).bind(Json(value));
        }
        if let Some((field, _)) = &query.order_by {
            q = q.bind(field);
        }
        let rows = q.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Document::from).collect())
    }
}

/// Distinct ids of a batch in the order their rows get locked.
///
/// Sorted so that overlapping batches acquire row locks in the same order.
fn lock_order(writes: &[(DocId, WriteSet)]) -> Vec<&str> {
    let mut ids: Vec<&str> = writes.iter().map(|(id, _)| id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Render the SELECT for a query. Field names and values are bound as
/// parameters in the order: collection, (field, value) per filter, order field.
fn build_select(query: &Query) -> String {
    let mut sql = format!("SELECT {COLUMNS} FROM documents WHERE collection = $1");
    let mut param = 2;
    for _ in &query.filters {
        sql.push_str(&format!(" AND fields -> ${} = ${}", param, param + 1));
        param += 2;
    }
    if let Some((_, direction)) = &query.order_by {
        // Missing fields sort as newest, matching the in-memory store.
        let dir = match direction {
            Direction::Ascending => "ASC NULLS LAST",
            Direction::Descending => "DESC NULLS FIRST",
        };
        sql.push_str(&format!(" ORDER BY fields -> ${param} {dir}"));
    }
    sql
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_binds_filters_then_order_field() {
        let query = Query::new()
            .where_eq("userId", "u1")
            .where_eq("checked", true)
            .order_by("createdAt", Direction::Descending);

        assert_eq!(
            build_select(&query),
            "SELECT id, fields, create_time, update_time FROM documents WHERE collection = $1 \
             AND fields -> $2 = $3 AND fields -> $4 = $5 ORDER BY fields -> $6 DESC NULLS FIRST"
        );
    }

    #[test]
    fn batch_rows_lock_in_sorted_order() {
        let writes: Vec<(DocId, WriteSet)> = ["c", "a", "b", "a"]
            .into_iter()
            .map(|id| (id.to_string(), WriteSet::new()))
            .collect();

        assert_eq!(lock_order(&writes), ["a", "b", "c"]);
    }

    #[test]
    fn unfiltered_select_has_no_order_clause() {
        assert_eq!(
            build_select(&Query::new()),
            "SELECT id, fields, create_time, update_time FROM documents WHERE collection = $1"
        );
    }
}
