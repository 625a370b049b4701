pub use credential_core::{Credential, CredentialId, CredentialState};
pub use store::CredentialStore;
pub use token::{CredentialToken, HmacSha256, TOKEN_BYTES};

mod credential_core;
mod store;
mod token;
