//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - Hashes are serialised as lowercase hex strings.
//! - Credential tokens are serialised as unpadded URL-safe base64.

pub mod admin;
pub mod credential;
pub mod dump;
pub mod receipt;
pub mod vote;
