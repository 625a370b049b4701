pub use election_core::{Candidate, Election, ElectionMetadata, MIN_CANDIDATES};
pub use registry::{ElectionHandle, ElectionRegistry};
pub use spec::{CandidateSpec, ElectionSpec};

mod election_core;
mod registry;
mod spec;
