//! Shared primitive types used across the ledger.

/// A stable, unique identifier for any stored record (UUID v4 text).
pub type RecordId = String;

/// Identifier of a registered client.
pub type ClientId = RecordId;

/// Monetary amount in major currency units.
pub type Money = f64;

/// Mint a fresh record identifier.
pub fn new_id() -> RecordId {
    uuid::Uuid::new_v4().to_string()
}
