//! Queries and bulk writes specific to the `buyListItems` collection.

use pantry_core::records::{BuyListItem, FIELD_CHECKED, FIELD_MEMO, FIELD_UPDATED_AT};
use pantry_core::types::{DocId, Timestamp};
use serde_json::Value;

use super::Collection;
use crate::error::StoreResult;
use crate::store::WriteSet;

/// Repository for shopping list items.
pub type BuyListRepo = Collection<BuyListItem>;

impl Collection<BuyListItem> {
    /// Checked items within the owner scope, newest created first.
    pub async fn get_checked_items(&self, owner: Option<&str>) -> StoreResult<Vec<BuyListItem>> {
        let query = self.scoped_query(owner).where_eq(FIELD_CHECKED, true);
        self.find(query, "list checked").await
    }

    /// Set `memo` to the empty string on every item in scope.
    ///
    /// The writes go out as one batch: either every memo is cleared or, on
    /// failure, none is. Returns the id and new update time of each item.
    pub async fn clear_all_memos(
        &self,
        owner: Option<&str>,
    ) -> StoreResult<Vec<(DocId, Timestamp)>> {
        let items = self.get_all_items(owner).await?;
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let writes: Vec<(DocId, WriteSet)> = items
            .into_iter()
            .map(|item| {
                let write = WriteSet::new()
                    .set(FIELD_MEMO, Value::String(String::new()))
                    .server_timestamp(FIELD_UPDATED_AT);
                (item.id, write)
            })
            .collect();
        let count = writes.len();

        let result = self
            .store()
            .merge_batch(self.name(), writes)
            .await
            .map(|receipts| {
                receipts
                    .into_iter()
                    .map(|r| (r.id, r.update_time))
                    .collect::<Vec<_>>()
            });
        let cleared = self.log_failure("clear memos", None, result)?;
        tracing::debug!(collection = %self.name(), count, "Cleared memos");
        Ok(cleared)
    }
}
