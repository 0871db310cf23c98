//! Fridge inventory views layered on the generic cache.

use pantry_core::records::{FridgeItem, StorageLocation};

use super::ItemCache;

/// Cache backing the fridge inventory screen.
pub type FridgeCache = ItemCache<FridgeItem>;

impl ItemCache<FridgeItem> {
    /// Locally cached items in `category`, in list order.
    pub fn items_in_category(&self, category: &str) -> Vec<FridgeItem> {
        self.filtered(|item| item.category == category)
    }

    /// Locally cached items kept at `location`, in list order.
    pub fn items_at(&self, location: StorageLocation) -> Vec<FridgeItem> {
        self.filtered(|item| item.location == location)
    }

    fn filtered(&self, keep: impl Fn(&FridgeItem) -> bool) -> Vec<FridgeItem> {
        self.state
            .borrow()
            .items
            .iter()
            .filter(|item| keep(item))
            .cloned()
            .collect()
    }
}
