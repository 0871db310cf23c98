//! Per-screen record caches.
//!
//! [`ItemCache`] owns the in-memory list for one collection and one owner
//! scope. Reads go through [`refresh`](ItemCache::refresh), which toggles
//! `loading`; mutations call the repository first and only touch local
//! state once the write succeeded, using the server timestamps the write
//! returned. Mutations never set `loading` and are not serialized: two
//! overlapping calls resolve in whatever order their responses arrive.
//!
//! Caches are not shared. Two caches over the same collection diverge until
//! each refreshes.

use std::sync::Arc;

use pantry_core::records::{self, Record};
use pantry_core::types::DocId;
use pantry_db::{Collection, StoreError};
use tokio::sync::watch;

use crate::error::CacheError;
use crate::notifier::Notifier;

mod buy_list;
mod fridge;

pub use buy_list::BuyListCache;
pub use fridge::FridgeCache;

/// Title used for every failure alert.
const ALERT_TITLE: &str = "Error";

/// Snapshot of a cache, as rendered by a screen.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheState<R> {
    /// Records in repository order (newest created first).
    pub items: Vec<R>,
    /// True while a refresh is in flight.
    pub loading: bool,
    /// Message of the last failed refresh, cleared by the next success.
    pub error: Option<String>,
}

impl<R> Default for CacheState<R> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            error: None,
        }
    }
}

/// Local mirror of one owner's records in one collection.
pub struct ItemCache<R: Record> {
    repo: Collection<R>,
    owner: Option<String>,
    notifier: Arc<dyn Notifier>,
    state: watch::Sender<CacheState<R>>,
}

impl<R: Record> ItemCache<R> {
    /// Create an empty cache without loading anything.
    pub fn new(repo: Collection<R>, owner: Option<String>, notifier: Arc<dyn Notifier>) -> Self {
        let (state, _) = watch::channel(CacheState::default());
        Self {
            repo,
            owner,
            notifier,
            state,
        }
    }

    /// Create a cache and perform the initial load.
    ///
    /// A failed load is reported through [`error`](Self::error), not here.
    pub async fn mount(
        repo: Collection<R>,
        owner: Option<String>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let cache = Self::new(repo, owner, notifier);
        if let Err(e) = cache.refresh().await {
            tracing::debug!(collection = %cache.repo.name(), error = %e, "Initial load failed");
        }
        cache
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn repo(&self) -> &Collection<R> {
        &self.repo
    }

    pub fn items(&self) -> Vec<R> {
        self.state.borrow().items.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn snapshot(&self) -> CacheState<R> {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<CacheState<R>> {
        self.state.subscribe()
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Switch to another owner scope and reload. No-op if unchanged.
    pub async fn set_owner(&mut self, owner: Option<String>) -> Result<(), CacheError> {
        if self.owner == owner {
            return Ok(());
        }
        self.owner = owner;
        self.refresh().await
    }

    /// Replace the local list with the repository's current contents.
    ///
    /// On failure the previous items stay in place and `error` is set.
    pub async fn refresh(&self) -> Result<(), CacheError> {
        self.state.send_modify(|state| state.loading = true);

        let result = self.repo.get_all_items(self.owner.as_deref()).await;

        match result {
            Ok(items) => {
                tracing::debug!(collection = %self.repo.name(), count = items.len(), "Cache refreshed");
                self.state.send_modify(|state| {
                    state.items = items;
                    state.error = None;
                    state.loading = false;
                });
                Ok(())
            }
            Err(e) => {
                tracing::warn!(collection = %self.repo.name(), error = %e, "Cache refresh failed");
                let message = e.to_string();
                self.state.send_modify(|state| {
                    state.error = Some(message);
                    state.loading = false;
                });
                Err(CacheError::Store(e))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Add a record and prepend it locally. Returns the new id.
    pub async fn add_item(&self, draft: &R::Draft) -> Result<DocId, CacheError> {
        let created = self
            .repo
            .add_item_for(draft, self.owner.as_deref())
            .await
            .map_err(|e| self.fail("add", e))?;

        let id = created.id;
        let record = created.record;
        self.state.send_modify(|state| state.items.insert(0, record));
        tracing::debug!(collection = %self.repo.name(), id = %id, "Item added");
        Ok(id)
    }

    /// Merge `patch` into a record and into its local copy.
    pub async fn update_item(&self, id: &str, patch: &R::Patch) -> Result<(), CacheError> {
        let fields =
            records::patch_fields(patch).map_err(|e| self.fail("update", StoreError::from(e)))?;
        let updated_at = self
            .repo
            .update_item(id, patch)
            .await
            .map_err(|e| self.fail("update", e))?;

        self.state.send_modify(|state| {
            if let Some(item) = state.items.iter_mut().find(|item| item.id() == id) {
                match records::apply_patch(item, &fields, updated_at) {
                    Ok(patched) => *item = patched,
                    Err(e) => tracing::warn!(id, error = %e, "Could not apply patch locally"),
                }
            }
        });
        tracing::debug!(collection = %self.repo.name(), id, "Item updated");
        Ok(())
    }

    /// Delete a record and drop it from the local list.
    pub async fn delete_item(&self, id: &str) -> Result<(), CacheError> {
        self.repo
            .delete_item(id)
            .await
            .map_err(|e| self.fail("delete", e))?;

        self.state
            .send_modify(|state| state.items.retain(|item| item.id() != id));
        tracing::debug!(collection = %self.repo.name(), id, "Item deleted");
        Ok(())
    }

    /// Log, alert the user, and wrap a failed repository call.
    fn fail(&self, action: &str, error: StoreError) -> CacheError {
        tracing::warn!(collection = %self.repo.name(), action, error = %error, "Cache mutation failed");
        self.notifier
            .alert(ALERT_TITLE, &format!("Failed to {action} {}", R::ENTITY));
        CacheError::Store(error)
    }
}
