use rocket::{
    http::{Cookie, CookieJar, Status},
    response::status::Created,
    serde::json::Json,
    Route, State,
};

use crate::{
    error::Result,
    model::{
        api::{
            account::{
                AccountDescription, Credentials, LoginResponse, RegistrationRequest,
                ResubmissionRequest,
            },
            auth::{Admin, AuthToken, Voter, AUTH_TOKEN_COOKIE},
        },
        common::account::Role,
    },
    service::registration,
    store::Store,
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![register, login, logout, resubmit]
}

#[post("/auth/register", data = "<request>", format = "json")]
pub async fn register(
    request: Json<RegistrationRequest>,
    store: Store,
) -> Result<Created<Json<AccountDescription>>> {
    let (profile, password) = request.0.validate()?;
    let account = registration::register(&*store, profile, &password).await?;
    Ok(Created::new("/voter/profile").body(Json(account.into())))
}

#[post("/auth/login", data = "<credentials>", format = "json")]
pub async fn login(
    credentials: Json<Credentials>,
    cookies: &CookieJar<'_>,
    store: Store,
    config: &State<Config>,
) -> Result<Json<LoginResponse>> {
    let account =
        registration::authenticate(&*store, &credentials.email, &credentials.password).await?;

    let cookie = match account.role {
        Role::Voter => AuthToken::<Voter>::new(account.id).into_cookie(config),
        Role::Admin => AuthToken::<Admin>::new(account.id).into_cookie(config),
    };
    let token = cookie.value().to_string();
    cookies.add(cookie);
    debug!("Account {} logged in", account.id);

    Ok(Json(LoginResponse {
        token,
        account: account.into(),
    }))
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}

/// Rejected applicants correct their details here. They cannot log in, so
/// the request carries their credentials.
#[put("/auth/resubmit", data = "<request>", format = "json")]
pub async fn resubmit(
    request: Json<ResubmissionRequest>,
    store: Store,
) -> Result<Json<AccountDescription>> {
    let (credentials, profile, new_password) = request.0.validate()?;
    let account = registration::resubmit(
        &*store,
        &credentials.email,
        &credentials.password,
        profile,
        new_password.as_deref(),
    )
    .await?;
    Ok(Json(account.into()))
}
