//! Shared domain types for the pantry data layer.
//!
//! Record shapes for fridge inventory and shopping list items, the
//! [`records::Record`] trait that ties a record to its collection, and the
//! domain error type.

pub mod error;
pub mod records;
pub mod types;
