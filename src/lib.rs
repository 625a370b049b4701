#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod coordinator;
pub mod election_closer;
pub mod error;
pub mod logging;
pub mod model;
pub mod scheduled_task;

pub use config::Config;
pub use coordinator::VotingCoordinator;
pub use election_closer::ElectionCloser;

use config::{ConfigFairing, VotingFairing};
use logging::LoggerFairing;

/// Build the server from `Rocket.toml` and `ROCKET_*` environment variables.
pub fn build() -> Rocket<Build> {
    assemble(rocket::build())
}

/// Mount the API and attach the fairings that set up managed state.
/// Fairing order matters: the voting fairing reads the config.
fn assemble(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .mount("/", api::routes())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(VotingFairing)
}

#[cfg(test)]
pub(crate) const TEST_ADMIN_KEY: &str = "test admin key";

/// A fresh server with fixed secrets and no state shared with any other test.
#[cfg(test)]
pub(crate) fn rocket_for_tests() -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("admin_key", TEST_ADMIN_KEY))
        .merge(("token_secret", "test token secret"))
        .merge(("log_level", "off"));
    assemble(rocket::custom(figment))
}
