mod state;

pub use state::ElectionState;

/// Our election IDs are integers, allocated sequentially from 1.
pub type ElectionId = u32;
/// Voters are identified by the integer ID of their user account.
pub type VoterId = u32;
/// Our candidate IDs (names) are strings.
pub type CandidateId = String;
