pub mod api;
pub mod common;
pub mod credential;
pub mod election;
pub mod ledger;
pub mod sync;
pub mod tally;
