use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use rocket::{
    http::{Cookie, SameSite, Status},
    request::{FromRequest, Outcome},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::model::mongodb::Id;
use crate::store::Store;

use super::user::{Rights, User};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// Non-browser clients may send the token in this header instead of the cookie.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// An authentication token representing a specific account with specific rights.
#[derive(Serialize, Deserialize)]
pub struct AuthToken<U> {
    pub id: Id,
    #[serde(rename = "rgt")]
    pub rights: Rights,
    #[serde(skip)]
    phantom: PhantomData<U>,
}

impl<U> AuthToken<U> {
    /// Does this token permit the given rights?
    pub fn permits(&self, target: Rights) -> bool {
        self.rights == target
    }
}

impl<U> AuthToken<U>
where
    U: User,
{
    /// Create a new [`AuthToken`] for the given account, with the rights of this user type.
    pub fn new(id: Id) -> Self {
        Self {
            id,
            rights: U::RIGHTS,
            phantom: PhantomData,
        }
    }

    /// Sign this token into a cookie.
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .expect("JWT encoding is infallible with default settings");

        Cookie::build(AUTH_TOKEN_COOKIE, token)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish()
    }

    /// Verify and decode a signed token.
    pub fn decode(token: &str, config: &Config) -> Result<Self, Error> {
        let token = jsonwebtoken::decode(
            token,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<U>>| claims.claims.token)?;
        Ok(token)
    }
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims<U> {
    #[serde(flatten, bound = "")]
    token: AuthToken<U>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

/// The raw token from the cookie, or failing that the header.
fn raw_token(req: &Request<'_>) -> Option<String> {
    req.cookies()
        .get(AUTH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .or_else(|| req.headers().get_one(AUTH_TOKEN_HEADER).map(str::to_string))
}

#[rocket::async_trait]
impl<'r, U> FromRequest<'r> for AuthToken<U>
where
    U: User + Send,
{
    type Error = Error;

    /// Get an [`AuthToken`], verify that it has the correct rights for this
    /// user type, and that its account still qualifies for them.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let raw = match raw_token(req) {
            Some(raw) => raw,
            None => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::Unauthorized("No session token".to_string()),
                ))
            }
        };

        let token = match Self::decode(&raw, config) {
            Ok(token) => token,
            Err(e) => return Outcome::Failure((Status::Unauthorized, e)),
        };

        if !token.permits(U::RIGHTS) {
            return Outcome::Failure((
                Status::Forbidden,
                Error::Forbidden(format!("Requires {} rights", U::RIGHTS)),
            ));
        }

        // Check the account still exists and qualifies, e.g. a voter who has
        // since been deleted.
        // Unwrap is safe as `Store` is always managed.
        let store = req.guard::<Store>().await.unwrap();
        match store.account_by_id(token.id).await {
            Ok(Some(account)) if U::admits(&account) => Outcome::Success(token),
            Ok(Some(_)) => Outcome::Failure((
                Status::Forbidden,
                Error::Forbidden(format!("Account no longer has {} rights", U::RIGHTS)),
            )),
            Ok(None) => Outcome::Failure((
                Status::Unauthorized,
                Error::Unauthorized("Account no longer exists".to_string()),
            )),
            Err(e) => Outcome::Failure((Status::InternalServerError, e)),
        }
    }
}
