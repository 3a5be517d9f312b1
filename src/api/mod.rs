//! HTTP routes. Handlers parse and authorise requests, then hand off to
//! [`crate::service`] and describe the outcome.

use rocket::{http::Status, serde::json::Json, Catcher, Request, Route};

use crate::error::ErrorBody;

pub mod admin;
pub mod auth;
pub mod common;
pub mod parties;
pub mod public;
pub mod voter;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(admin::routes());
    routes.extend(auth::routes());
    routes.extend(parties::routes());
    routes.extend(public::routes());
    routes.extend(voter::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![default_catcher]
}

/// Failures that never reach a handler (bad guards, unknown routes, malformed
/// bodies) still get a JSON error body.
#[catch(default)]
fn default_catcher(status: Status, _req: &Request) -> (Status, Json<ErrorBody>) {
    (status, Json(ErrorBody::for_status(status)))
}
