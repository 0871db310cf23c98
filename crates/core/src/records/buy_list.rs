//! Shopping list items.
//!
//! The `checked` flag is the only state an item moves through: pending
//! (`false`) and done (`true`), flipped by a toggle with no history kept.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{validate_name, Record};
use crate::types::{DocId, Timestamp};

/// Field name of the checked flag, used in store queries.
pub const FIELD_CHECKED: &str = "checked";

/// Field name of the free-text memo.
pub const FIELD_MEMO: &str = "memo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// A document from the `buyListItems` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyListItem {
    pub id: DocId,
    pub name: String,
    #[serde(default)]
    pub checked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// DTO for adding a shopping list item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewBuyListItem {
    #[validate(custom(function = "validate_name"))]
    pub name: String,
    #[serde(default)]
    pub checked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl NewBuyListItem {
    /// Unchecked item with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            checked: false,
            category: None,
            priority: None,
            amount: None,
            memo: None,
            user_id: None,
        }
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }
}

/// DTO for updating a shopping list item. All fields are optional.
///
/// Setting `memo` to `Some(String::new())` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BuyListItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_name"))]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl BuyListItemPatch {
    pub fn checked(checked: bool) -> Self {
        Self {
            checked: Some(checked),
            ..Default::default()
        }
    }

    pub fn clear_memo() -> Self {
        Self {
            memo: Some(String::new()),
            ..Default::default()
        }
    }
}

impl Record for BuyListItem {
    const COLLECTION: &'static str = "buyListItems";
    const ENTITY: &'static str = "shopping list item";

    type Draft = NewBuyListItem;
    type Patch = BuyListItemPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> Timestamp {
        self.created_at
    }

    fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;
    use crate::records::{apply_patch, assemble, draft_fields, patch_fields, Fields};

    #[test]
    fn missing_checked_flag_reads_as_pending() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut fields = Fields::new();
        fields.insert("name".into(), json!("milk"));

        let item: BuyListItem = assemble("m1", fields, now, now).unwrap();

        assert!(!item.checked);
        assert_eq!(item.memo, None);
    }

    #[test]
    fn draft_always_writes_checked_flag() {
        let fields = draft_fields(&NewBuyListItem::new("eggs")).unwrap();
        assert_eq!(fields[FIELD_CHECKED], false);
    }

    #[test]
    fn clear_memo_patch_sets_empty_string() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let fields = draft_fields(&NewBuyListItem::new("eggs").with_memo("free range")).unwrap();
        let item: BuyListItem = assemble("e1", fields, now, now).unwrap();

        let patch = patch_fields(&BuyListItemPatch::clear_memo()).unwrap();
        let cleared = apply_patch(&item, &patch, now).unwrap();

        assert_eq!(cleared.memo.as_deref(), Some(""));
        assert_eq!(cleared.name, "eggs");
    }

    #[test]
    fn priority_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Priority::High).unwrap(), json!("high"));
    }
}
