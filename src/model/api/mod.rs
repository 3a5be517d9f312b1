//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - IDs are serialised as hex strings.
//! - Datetimes are serialised as RFC 3339 strings.
//!
//! Request types are validated on the way into the database model types,
//! and response types never carry credentials.

pub mod account;
pub mod auth;
pub mod candidate;
pub mod election;
pub mod id;
pub mod party;
pub mod vote;
