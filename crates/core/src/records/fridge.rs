//! Fridge inventory items.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{validate_name, Record};
use crate::types::{DocId, Timestamp};

/// Where an item is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageLocation {
    Refrigerated,
    Frozen,
    Other,
}

impl StorageLocation {
    /// Stored string value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Refrigerated => "refrigerated",
            Self::Frozen => "frozen",
            Self::Other => "other",
        }
    }
}

/// A document from the `fridgeItems` collection.
///
/// `amount`, `unit` and `count` are free-form strings and `expiry` is an
/// ISO `YYYY-MM-DD` date string; none of them are parsed at this layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FridgeItem {
    pub id: DocId,
    pub name: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub location: StorageLocation,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// DTO for adding a fridge item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewFridgeItem {
    #[validate(custom(function = "validate_name"))]
    pub name: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub location: StorageLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl NewFridgeItem {
    /// Draft with the required fields set and everything else absent.
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        location: StorageLocation,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            amount: None,
            unit: None,
            count: None,
            expiry: None,
            image: None,
            location,
            user_id: None,
        }
    }
}

/// DTO for updating a fridge item. All fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FridgeItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_name"))]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<StorageLocation>,
}

impl Record for FridgeItem {
    const COLLECTION: &'static str = "fridgeItems";
    const ENTITY: &'static str = "fridge item";

    type Draft = NewFridgeItem;
    type Patch = FridgeItemPatch;

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

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
