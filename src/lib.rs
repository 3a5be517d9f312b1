#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub use config::Config;
pub use store::Store;

use config::{AdminFairing, ConfigFairing, StoreFairing};
use logging::LoggerFairing;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

/// Build the server. The store is chosen and connected by configuration.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(StoreFairing)
        .attach(AdminFairing)
        .mount("/", api::routes())
        .register("/", api::catchers())
}

/// Build the server over an existing store, skipping the store configuration.
pub fn rocket_for_store(store: Store) -> Rocket<Build> {
    rocket::build()
        .manage(store)
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(AdminFairing)
        .mount("/", api::routes())
        .register("/", api::catchers())
}
