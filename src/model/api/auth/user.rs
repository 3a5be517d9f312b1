use std::fmt::Display;

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::model::{common::account::Role, db::account::Account};

/// A kind of session holder, having defined rights.
///
/// Implemented by uninhabited marker types; they only exist at the type level
/// to parameterise [`super::AuthToken`].
pub trait User {
    /// The rights of this user type.
    const RIGHTS: Rights;

    /// May this account act as this kind of user right now?
    fn admits(account: &Account) -> bool;
}

/// An approved voter.
pub enum Voter {}

/// An administrator.
pub enum Admin {}

impl User for Voter {
    const RIGHTS: Rights = Rights::Voter;

    fn admits(account: &Account) -> bool {
        account.role == Role::Voter && account.validation.is_approved()
    }
}

impl User for Admin {
    const RIGHTS: Rights = Rights::Admin;

    fn admits(account: &Account) -> bool {
        account.role == Role::Admin
    }
}

/// Different privilege levels.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Rights {
    Voter = 0,
    Admin = 1,
}

impl Display for Rights {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Voter => "voter",
                Self::Admin => "admin",
            }
        )
    }
}
