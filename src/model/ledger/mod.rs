//! The append-only, hash-chained record of cast votes.

pub use record::VoteRecord;
pub use store::VoteLedger;
pub use verify::{verify_chain, Fault, Verdict};

mod record;
mod store;
mod verify;
