//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.
//! - Each entity has a `*Core` without an ID for inserting, and a wrapper
//!   with its `_id` for reading.

pub mod account;
pub mod candidate;
pub mod election;
pub mod party;
pub mod vote;
