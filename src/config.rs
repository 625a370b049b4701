use log::{error, info};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::coordinator::VotingCoordinator;
use crate::election_closer::ElectionCloser;

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // secrets
    admin_key: String,
    token_secret: String,
}

impl Config {
    /// Key that administrators present in the `X-Admin-Key` header.
    pub fn admin_key(&self) -> &[u8] {
        self.admin_key.as_bytes()
    }

    /// Secret key used to digest credential tokens.
    pub fn token_secret(&self) -> &[u8] {
        self.token_secret.as_bytes()
    }
}

/// A fairing that loads the application config and puts it in managed state.
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
        if config.admin_key.is_empty() || config.token_secret.is_empty() {
            error!("`admin_key` and `token_secret` must not be empty");
            return Err(rocket);
        }

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// A fairing that builds the voting coordinator and election closer from the
/// loaded config and places both into managed state. This fairing depends on
/// the config being available in managed state, and so must be attached
/// after [`ConfigFairing`].
pub struct VotingFairing;

#[rocket::async_trait]
impl Fairing for VotingFairing {
    fn info(&self) -> Info {
        Info {
            name: "Voting",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let coordinator = match rocket.state::<Config>() {
            Some(config) => VotingCoordinator::new(config.token_secret()),
            None => {
                error!("Config was not available when creating the voting coordinator");
                return Err(rocket);
            }
        };
        let closer = ElectionCloser::new(coordinator.clone());
        info!("Voting coordinator online");

        // Manage the state.
        rocket = rocket.manage(coordinator).manage(closer);
        Ok(rocket)
    }
}
