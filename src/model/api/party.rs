use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::id::ApiId,
    common::party::PartyLevel,
    db::party::{Party, PartyCore},
};

/// A party, as submitted by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartySpec {
    pub name: String,
    pub level: PartyLevel,
    #[serde(default)]
    pub logo_url: Option<String>,
}

impl TryFrom<PartySpec> for PartyCore {
    type Error = Error;

    fn try_from(spec: PartySpec) -> Result<Self> {
        let name = spec.name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Missing party name".to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            level: spec.level,
            logo_url: spec.logo_url.filter(|url| !url.trim().is_empty()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyDescription {
    pub id: ApiId,
    pub name: String,
    pub level: PartyLevel,
    pub logo_url: Option<String>,
}

impl From<Party> for PartyDescription {
    fn from(party: Party) -> Self {
        Self {
            id: party.id.into(),
            name: party.party.name,
            level: party.party.level,
            logo_url: party.party.logo_url,
        }
    }
}

#[cfg(test)]
pub mod examples {
    use super::*;

    impl PartySpec {
        pub fn example() -> Self {
            let party = PartyCore::example();
            Self {
                name: party.name,
                level: party.level,
                logo_url: party.logo_url,
            }
        }
    }
}
