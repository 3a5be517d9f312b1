use std::fmt::{Display, Formatter};

use mongodb::bson::{to_bson, Bson};
use rocket::FromFormField;
use serde::{Deserialize, Serialize};

/// What an account is allowed to do.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Voter,
    Admin,
}

impl From<Role> for Bson {
    fn from(role: Role) -> Self {
        to_bson(&role).expect("Serialisation is infallible")
    }
}

/// Where an account is in the admin review lifecycle.
///
/// ```text
/// Pending ──► Approved
///    │           ▲
///    ▼           │
/// Rejected ──► Resubmitted ──► Rejected
/// ```
///
/// The rejection reason only exists while the account is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ValidationStatus {
    /// Registered, awaiting first review.
    Pending,
    /// Allowed to log in.
    Approved,
    /// Refused by an admin; the holder may resubmit.
    Rejected { reason: String },
    /// Corrected after a rejection, awaiting review again.
    Resubmitted,
}

impl ValidationStatus {
    pub fn kind(&self) -> StatusKind {
        match self {
            Self::Pending => StatusKind::Pending,
            Self::Approved => StatusKind::Approved,
            Self::Rejected { .. } => StatusKind::Rejected,
            Self::Resubmitted => StatusKind::Resubmitted,
        }
    }

    pub fn is_approved(&self) -> bool {
        *self == Self::Approved
    }

    /// The rejection reason, if rejected.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Rejected { reason } => Some(reason),
            _ => None,
        }
    }
}

impl From<&ValidationStatus> for Bson {
    fn from(status: &ValidationStatus) -> Self {
        to_bson(status).expect("Serialisation is infallible")
    }
}

/// The variant of a [`ValidationStatus`], without any payload.
/// Used for filtering and for reporting transitions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, FromFormField)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    #[field(value = "pending")]
    Pending,
    #[field(value = "approved")]
    Approved,
    #[field(value = "rejected")]
    Rejected,
    #[field(value = "resubmitted")]
    Resubmitted,
}

impl StatusKind {
    /// States an admin decision (approve or reject) can be taken from.
    pub const AWAITING_REVIEW: [StatusKind; 2] = [StatusKind::Pending, StatusKind::Resubmitted];
}

impl Display for StatusKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Resubmitted => "resubmitted",
        };
        write!(f, "{name}")
    }
}

impl From<StatusKind> for Bson {
    fn from(kind: StatusKind) -> Self {
        to_bson(&kind).expect("Serialisation is infallible")
    }
}
