use log::{error, warn};
use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request, State,
};
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::error::Error;

/// Header carrying the administrator key.
pub const ADMIN_KEY_HEADER: &str = "X-Admin-Key";

/// Request guard for administrator-only routes.
#[derive(Debug, Copy, Clone)]
pub struct AdminKey;

impl AdminKey {
    /// Keys are compared by digest, never directly.
    fn permits(presented: &str, config: &Config) -> bool {
        Sha256::digest(presented.as_bytes()) == Sha256::digest(config.admin_key())
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminKey {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let config = match req.guard::<&State<Config>>().await {
            Outcome::Success(config) => config,
            _ => {
                error!("Config was not available when checking admin key");
                return Outcome::Failure((
                    Status::InternalServerError,
                    Error::Unauthorized("Server misconfigured".to_string()),
                ));
            }
        };

        match req.headers().get_one(ADMIN_KEY_HEADER) {
            Some(key) if Self::permits(key, config) => Outcome::Success(AdminKey),
            Some(_) => {
                warn!("Rejected request with wrong admin key");
                Outcome::Failure((
                    Status::Unauthorized,
                    Error::Unauthorized("Wrong admin key".to_string()),
                ))
            }
            None => Outcome::Failure((
                Status::Unauthorized,
                Error::Unauthorized(format!("Missing {ADMIN_KEY_HEADER} header")),
            )),
        }
    }
}
