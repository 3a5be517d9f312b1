//! The rules of the election, independent of HTTP and of any particular store.
//!
//! Every function here takes the narrowest set of repository traits it needs,
//! so it can run against [`crate::store::MemoryStore`] in tests exactly as it
//! does against MongoDB in production.

pub mod catalogue;
pub mod registration;
pub mod voting;
