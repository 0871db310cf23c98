//! Record types stored in the document collections.
//!
//! Each record type implements [`Record`], which names its collection and
//! the draft/patch DTOs used to create and partially update it. The helper
//! functions below work on the JSON field maps the document store speaks,
//! so the repository and cache layers can stay generic over the record type.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use validator::{Validate, ValidationError};

use crate::error::CoreError;
use crate::types::{format_timestamp, Timestamp};

pub mod buy_list;
pub mod fridge;

pub use buy_list::{
    BuyListItem, BuyListItemPatch, NewBuyListItem, Priority, FIELD_CHECKED, FIELD_MEMO,
};
pub use fridge::{FridgeItem, FridgeItemPatch, NewFridgeItem, StorageLocation};

/// JSON object holding a document's fields.
pub type Fields = Map<String, Value>;

// ---------------------------------------------------------------------------
// Field names
// ---------------------------------------------------------------------------

pub const FIELD_ID: &str = "id";
pub const FIELD_CREATED_AT: &str = "createdAt";
pub const FIELD_UPDATED_AT: &str = "updatedAt";
pub const FIELD_USER_ID: &str = "userId";

// ---------------------------------------------------------------------------
// Record trait
// ---------------------------------------------------------------------------

/// A record type persisted in one document collection.
pub trait Record: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Name of the backing collection.
    const COLLECTION: &'static str;

    /// Human-readable entity name used in error messages.
    const ENTITY: &'static str;

    /// Business fields of a new record: no id, no timestamps.
    type Draft: Serialize + Validate + Debug + Send + Sync;

    /// Partial update; only fields that are present get written.
    type Patch: Serialize + Validate + Debug + Send + Sync;

    fn id(&self) -> &str;
    fn created_at(&self) -> Timestamp;
    fn updated_at(&self) -> Timestamp;
    fn user_id(&self) -> Option<&str>;
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Reject names that are empty once surrounding whitespace is removed.
pub(crate) fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("name must not be blank".into());
        return Err(err);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Field-map helpers
// ---------------------------------------------------------------------------

/// Validate a draft and convert it to the field map written on insert.
pub fn draft_fields<D: Serialize + Validate>(draft: &D) -> Result<Fields, CoreError> {
    draft.validate()?;
    to_fields(draft)
}

/// Validate a patch and convert it to the field map merged on update.
///
/// A patch without any field is rejected: it would only bump `updatedAt`.
pub fn patch_fields<P: Serialize + Validate>(patch: &P) -> Result<Fields, CoreError> {
    patch.validate()?;
    let fields = to_fields(patch)?;
    if fields.is_empty() {
        return Err(CoreError::Validation("Patch contains no fields".into()));
    }
    Ok(fields)
}

/// Build a record from its stored fields plus identity and timestamps.
pub fn assemble<R: Record>(
    id: &str,
    mut fields: Fields,
    created_at: Timestamp,
    updated_at: Timestamp,
) -> Result<R, CoreError> {
    fields.insert(FIELD_ID.into(), Value::String(id.to_string()));
    fields.insert(
        FIELD_CREATED_AT.into(),
        Value::String(format_timestamp(created_at)),
    );
    fields.insert(
        FIELD_UPDATED_AT.into(),
        Value::String(format_timestamp(updated_at)),
    );
    serde_json::from_value(Value::Object(fields)).map_err(|e| {
        CoreError::Internal(format!("Malformed {} document {id}: {e}", R::ENTITY))
    })
}

/// Return a copy of `record` with `patch` merged in and `updatedAt` replaced.
pub fn apply_patch<R: Record>(
    record: &R,
    patch: &Fields,
    updated_at: Timestamp,
) -> Result<R, CoreError> {
    let mut fields = to_fields(record)?;
    for (key, value) in patch {
        fields.insert(key.clone(), value.clone());
    }
    fields.insert(
        FIELD_UPDATED_AT.into(),
        Value::String(format_timestamp(updated_at)),
    );
    serde_json::from_value(Value::Object(fields))
        .map_err(|e| CoreError::Internal(format!("Patch produced invalid {}: {e}", R::ENTITY)))
}

fn to_fields<T: Serialize + ?Sized>(value: &T) -> Result<Fields, CoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(CoreError::Internal(format!(
            "Expected a JSON object, got {other}"
        ))),
        Err(e) => Err(CoreError::Internal(format!("Serialization failed: {e}"))),
    }
}
