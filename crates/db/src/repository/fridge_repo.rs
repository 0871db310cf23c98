//! Queries specific to the `fridgeItems` collection.

use pantry_core::records::FridgeItem;

use super::Collection;
use crate::error::StoreResult;

/// Repository for fridge inventory items.
pub type FridgeRepo = Collection<FridgeItem>;

impl Collection<FridgeItem> {
    /// Items in `category` within the owner scope, newest created first.
    pub async fn get_items_by_category(
        &self,
        category: &str,
        owner: Option<&str>,
    ) -> StoreResult<Vec<FridgeItem>> {
        let query = self.scoped_query(owner).where_eq("category", category);
        self.find(query, "list by category").await
    }
}
