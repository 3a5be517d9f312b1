use serde::{Deserialize, Serialize};

/// The level at which a party operates.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyLevel {
    National,
    Local,
}
