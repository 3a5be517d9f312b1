use chrono::Duration;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::service::registration::ensure_admin_exists;
use crate::store::{MongoStore, Store};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    default_admin_email: String,
    // secrets
    jwt_secret: String,
    default_admin_password: String,
}

impl Config {
    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Email of the admin account created when no admin exists.
    pub fn default_admin_email(&self) -> &str {
        &self.default_admin_email
    }

    /// Initial password of that admin account.
    pub fn default_admin_password(&self) -> &str {
        &self.default_admin_password
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Which persistence backend to run on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StoreKind {
    Mongodb,
    Memory,
}

/// Configuration for the store.
#[derive(Deserialize)]
struct StoreConfig {
    // non-secrets
    store: StoreKind,
    db_name: String,
    // secrets
    db_uri: String,
}

/// A fairing that loads the store config, connects to the database if there
/// is one, performs any setup necessary, and places a [`Store`] into managed
/// state.
pub struct StoreFairing;

#[rocket::async_trait]
impl Fairing for StoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<StoreConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load store config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        let store = match config.store {
            StoreKind::Memory => {
                warn!("Using the in-memory store, nothing will be persisted");
                Store::memory()
            }
            StoreKind::Mongodb => {
                info!("Loaded database config, connecting...");
                match MongoStore::connect(&config.db_uri, &config.db_name).await {
                    Ok(store) => {
                        info!("...database connection online!");
                        Store::new(store)
                    }
                    Err(e) => {
                        error!("Failed to connect to database: {e}");
                        return Err(rocket);
                    }
                }
            }
        };

        // Manage the state.
        rocket = rocket.manage(store);
        Ok(rocket)
    }
}

/// A fairing that makes sure at least one admin account exists, creating the
/// configured default admin if not. Must be attached after the [`Config`] and
/// [`Store`] are managed.
pub struct AdminFairing;

#[rocket::async_trait]
impl Fairing for AdminFairing {
    fn info(&self) -> Info {
        Info {
            name: "Default admin",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let (config, store) = match (rocket.state::<Config>(), rocket.state::<Store>()) {
            (Some(config), Some(store)) => (config, store),
            _ => {
                error!("Config and store must be ready before the default admin");
                return Err(rocket);
            }
        };

        let result = ensure_admin_exists(
            &**store,
            config.default_admin_email(),
            config.default_admin_password(),
        )
        .await;
        if let Err(e) = result {
            error!("Failed to ensure an admin exists: {e}");
            return Err(rocket);
        }
        Ok(rocket)
    }
}
