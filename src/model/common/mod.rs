//! Types shared between the database and API representations.

pub mod account;
pub mod election;
pub mod party;
