//! Data types, in three layers:
//!
//! - [`common`]: small enums and pure policy shared by the other two.
//! - [`db`]: documents exactly as stored.
//! - [`api`]: request and response bodies.
//!
//! [`mongodb`] holds the storage plumbing (IDs, collections, indexes).

pub mod api;
pub mod common;
pub mod db;
pub mod mongodb;
