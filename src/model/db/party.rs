use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::{common::party::PartyLevel, mongodb::Id};

/// Core party data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyCore {
    /// Unique across all parties.
    pub name: String,
    pub level: PartyLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

/// A party without an ID.
pub type NewParty = PartyCore;

/// A party from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub party: PartyCore,
}

impl Deref for Party {
    type Target = PartyCore;

    fn deref(&self) -> &Self::Target {
        &self.party
    }
}

impl DerefMut for Party {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.party
    }
}

/// Example data for tests.
#[cfg(test)]
pub mod examples {
    use super::*;

    impl PartyCore {
        pub fn example() -> Self {
            Self {
                name: "Progressive Alliance".to_string(),
                level: PartyLevel::National,
                logo_url: Some("/uploads/progressive.png".to_string()),
            }
        }

        pub fn example2() -> Self {
            Self {
                name: "City First".to_string(),
                level: PartyLevel::Local,
                logo_url: None,
            }
        }
    }
}
