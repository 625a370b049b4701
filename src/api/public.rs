use rocket::{serde::json::Json, Route, State};

use crate::{
    coordinator::VotingCoordinator,
    error::Result,
    model::{
        api::{dump::LedgerDump, receipt::LedgerTail},
        common::{ChainHash, ElectionId},
        election::Election,
        ledger::{Verdict, VoteRecord},
        tally::Tally,
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        elections,
        election,
        ledger_dump,
        verify_ledger,
        ledger_tail,
        find_receipt,
        tally,
    ]
}

#[get("/elections")]
async fn elections(coordinator: &State<VotingCoordinator>) -> Json<Vec<Election>> {
    Json(coordinator.elections())
}

#[get("/elections/<election_id>")]
async fn election(
    election_id: ElectionId,
    coordinator: &State<VotingCoordinator>,
) -> Result<Json<Election>> {
    Ok(Json(coordinator.election(election_id)?))
}

#[get("/elections/<election_id>/ledger")]
async fn ledger_dump(
    election_id: ElectionId,
    coordinator: &State<VotingCoordinator>,
) -> Result<Json<LedgerDump>> {
    Ok(Json(coordinator.ledger_dump(election_id)?))
}

#[get("/elections/<election_id>/ledger/verify")]
async fn verify_ledger(
    election_id: ElectionId,
    coordinator: &State<VotingCoordinator>,
) -> Result<Json<Verdict>> {
    Ok(Json(coordinator.verify_ledger(election_id)?))
}

#[get("/elections/<election_id>/ledger/tail")]
async fn ledger_tail(
    election_id: ElectionId,
    coordinator: &State<VotingCoordinator>,
) -> Result<Json<LedgerTail>> {
    let (tail, length) = coordinator.ledger_tail(election_id)?;
    Ok(Json(LedgerTail {
        election_id,
        length,
        tail,
    }))
}

#[get("/elections/<election_id>/receipts/<hash>")]
async fn find_receipt(
    election_id: ElectionId,
    hash: ChainHash,
    coordinator: &State<VotingCoordinator>,
) -> Result<Json<VoteRecord>> {
    Ok(Json(coordinator.find_receipt(election_id, &hash)?))
}

#[get("/elections/<election_id>/tally")]
async fn tally(
    election_id: ElectionId,
    coordinator: &State<VotingCoordinator>,
) -> Result<Json<Tally>> {
    Ok(Json(coordinator.tally(election_id)?))
}
