use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use mongodb::{
    bson::{de::Error as BsonDeError, ser::Error as BsonSerError},
    error::Error as DbError,
};
use rocket::{
    http::{Status, StatusClass},
    response::{self, Responder},
    serde::json::Json,
    Request,
};
use serde::Serialize;
use thiserror::Error;

use crate::model::common::{account::StatusKind, election::WindowState};

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while serving a request.
///
/// All variants except the storage/crypto ones are expected outcomes that the
/// caller can act on, and are reported with their details. Storage and crypto
/// failures are reported as an opaque server error.
#[derive(Debug, Error)]
pub enum Error {
    // Server-side failures.
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    BsonSer(#[from] BsonSerError),
    #[error(transparent)]
    BsonDe(#[from] BsonDeError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),

    // Malformed input.
    #[error("Invalid request: {0}")]
    Validation(String),

    // Conflicts.
    #[error("An account already exists for {0}")]
    DuplicateIdentity(String),
    #[error("You have already voted in this election")]
    DuplicateVote,
    #[error("A party named {0} already exists")]
    DuplicateParty(String),
    #[error("Still in use: {0}")]
    InUse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // Authorization.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Account is {status} and cannot log in")]
    NotApproved {
        status: StatusKind,
        reason: Option<String>,
    },

    // State machine violations.
    #[error("Cannot move account from {from} to {to}")]
    InvalidTransition { from: StatusKind, to: StatusKind },
    #[error("Election is not open for voting ({0:?})")]
    OutsideVotingWindow(WindowState),
    #[error("Candidate does not stand in this election")]
    CandidateNotInElection,
    #[error("Results for this election have not been declared")]
    ResultsNotDeclared,
    #[error("Election has not ended yet")]
    ElectionNotEnded,
}

impl Error {
    /// Shorthand for a [`Error::NotFound`] describing the missing thing.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// A short, stable, machine-readable name for this kind of error.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Db(_) | Self::BsonSer(_) | Self::BsonDe(_) | Self::Argon2(_) => "internal",
            Self::Jwt(_) => "invalid_token",
            Self::Validation(_) => "validation",
            Self::DuplicateIdentity(_) => "duplicate_identity",
            Self::DuplicateVote => "duplicate_vote",
            Self::DuplicateParty(_) => "duplicate_party",
            Self::InUse(_) => "in_use",
            Self::NotFound(_) => "not_found",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::InvalidCredentials => "invalid_credentials",
            Self::NotApproved { .. } => "not_approved",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::OutsideVotingWindow(_) => "outside_voting_window",
            Self::CandidateNotInElection => "candidate_not_in_election",
            Self::ResultsNotDeclared => "results_not_declared",
            Self::ElectionNotEnded => "election_not_ended",
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) | Self::BsonSer(_) | Self::BsonDe(_) | Self::Argon2(_) => {
                Status::InternalServerError
            }
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::Validation(_) => Status::BadRequest,
            Self::DuplicateIdentity(_)
            | Self::DuplicateVote
            | Self::DuplicateParty(_)
            | Self::InUse(_) => Status::Conflict,
            Self::NotFound(_) => Status::NotFound,
            Self::Unauthorized(_) | Self::InvalidCredentials => Status::Unauthorized,
            Self::Forbidden(_) | Self::NotApproved { .. } | Self::ResultsNotDeclared => {
                Status::Forbidden
            }
            Self::InvalidTransition { .. }
            | Self::OutsideVotingWindow(_)
            | Self::CandidateNotInElection
            | Self::ElectionNotEnded => Status::Conflict,
        }
    }
}

/// The JSON body sent back for every error.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ErrorBody {
    /// A body for a bare status, as produced when a guard or the router fails
    /// before any handler runs.
    pub fn for_status(status: Status) -> Self {
        let error = match status.code {
            400 | 422 => "validation",
            401 => "unauthorized",
            403 => "forbidden",
            404 => "not_found",
            409 => "conflict",
            _ if status.class() == StatusClass::ServerError => "internal",
            _ => "error",
        };
        Self {
            error,
            message: status.reason().unwrap_or("Unknown error").to_string(),
            status: None,
            reason: None,
        }
    }
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        let (status, reason) = match err {
            Error::NotApproved { status, reason } => (Some(*status), reason.clone()),
            _ => (None, None),
        };
        let message = if err.status().class() == StatusClass::ServerError {
            // Never leak storage or crypto internals.
            "Internal server error".to_string()
        } else {
            err.to_string()
        };
        Self {
            error: err.kind(),
            message,
            status,
            reason,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        if status.class() == StatusClass::ServerError {
            error!("{self}");
        } else {
            debug!("{self}");
        }
        (status, Json(ErrorBody::from(&self))).respond_to(req)
    }
}
