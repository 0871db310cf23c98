//! Shopping list operations layered on the generic cache.

use std::collections::HashMap;

use pantry_core::records::{BuyListItem, BuyListItemPatch, Record};
use pantry_core::types::{DocId, Timestamp};

use super::ItemCache;
use crate::error::CacheError;

/// Cache backing the shopping list screen.
pub type BuyListCache = ItemCache<BuyListItem>;

impl ItemCache<BuyListItem> {
    /// Flip the checked flag of a locally known item.
    ///
    /// The current value is read from the local list, so toggling an item
    /// another client changed since the last refresh writes the negation of
    /// the stale value.
    pub async fn toggle_check(&self, id: &str) -> Result<(), CacheError> {
        let checked = self
            .state
            .borrow()
            .items
            .iter()
            .find(|item| item.id == id)
            .map(|item| item.checked);

        let checked = checked.ok_or_else(|| CacheError::UnknownItem {
            entity: BuyListItem::ENTITY,
            id: id.to_string(),
        })?;
        self.update_item(id, &BuyListItemPatch::checked(!checked))
            .await
    }

    /// Clear the memo of every item in the owner scope, then locally.
    pub async fn clear_all_memos(&self) -> Result<(), CacheError> {
        let cleared = self
            .repo
            .clear_all_memos(self.owner.as_deref())
            .await
            .map_err(|e| self.fail("clear memos for", e))?;

        let stamps: HashMap<DocId, Timestamp> = cleared.into_iter().collect();
        self.state.send_modify(|state| {
            for item in state.items.iter_mut() {
                item.memo = Some(String::new());
                if let Some(ts) = stamps.get(&item.id) {
                    item.updated_at = *ts;
                }
            }
        });
        tracing::debug!(count = stamps.len(), "Memos cleared");
        Ok(())
    }

    /// Items still to buy, in list order.
    pub fn pending_items(&self) -> Vec<BuyListItem> {
        self.state
            .borrow()
            .items
            .iter()
            .filter(|item| !item.checked)
            .cloned()
            .collect()
    }
}
