//! Types shared by every part of the model.

pub mod election;
pub mod hash;

pub use election::{CandidateId, ElectionId, ElectionState, VoterId};
pub use hash::{ChainHash, GENESIS_HASH};
