use rocket::{serde::json::Json, Route, State};

use crate::{
    coordinator::VotingCoordinator,
    election_closer::ElectionCloser,
    error::Result,
    model::{
        api::{
            admin::AdminKey,
            credential::{BatchIssueRequest, BatchIssued, IssueRequest, IssuedCredential},
        },
        common::ElectionId,
        credential::Credential,
        election::{Election, ElectionSpec},
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        create_election,
        amend_election,
        activate_election,
        close_election,
        issue_credential,
        issue_credentials,
        audit_credentials,
    ]
}

#[post("/elections", data = "<spec>", format = "json")]
async fn create_election(
    _admin: AdminKey,
    spec: Json<ElectionSpec>,
    coordinator: &State<VotingCoordinator>,
) -> Result<Json<Election>> {
    let election = coordinator.create_election(spec.0)?;
    Ok(Json(election))
}

#[put("/elections/<election_id>", data = "<spec>", format = "json")]
async fn amend_election(
    _admin: AdminKey,
    election_id: ElectionId,
    spec: Json<ElectionSpec>,
    coordinator: &State<VotingCoordinator>,
) -> Result<Json<Election>> {
    let election = coordinator.amend_election(election_id, spec.0)?;
    Ok(Json(election))
}

#[post("/elections/<election_id>/activate")]
async fn activate_election(
    _admin: AdminKey,
    election_id: ElectionId,
    coordinator: &State<VotingCoordinator>,
    closer: &State<ElectionCloser>,
) -> Result<Json<Election>> {
    let election = coordinator.activate_election(election_id)?;
    closer.schedule(&election).await;
    Ok(Json(election))
}

#[post("/elections/<election_id>/close")]
async fn close_election(
    _admin: AdminKey,
    election_id: ElectionId,
    coordinator: &State<VotingCoordinator>,
    closer: &State<ElectionCloser>,
) -> Result<Json<Election>> {
    let election = coordinator.close_election(election_id)?;
    closer.cancel(election_id).await;
    Ok(Json(election))
}

#[post("/elections/<election_id>/credentials", data = "<request>", format = "json")]
async fn issue_credential(
    _admin: AdminKey,
    election_id: ElectionId,
    request: Json<IssueRequest>,
    coordinator: &State<VotingCoordinator>,
) -> Result<Json<IssuedCredential>> {
    let voter_id = request.voter_id;
    let token = coordinator.issue_credential(election_id, voter_id)?;
    Ok(Json(IssuedCredential { voter_id, token }))
}

#[post("/elections/<election_id>/credentials/batch", data = "<request>", format = "json")]
async fn issue_credentials(
    _admin: AdminKey,
    election_id: ElectionId,
    request: Json<BatchIssueRequest>,
    coordinator: &State<VotingCoordinator>,
) -> Result<Json<BatchIssued>> {
    let results = coordinator.issue_credentials(election_id, request.0.voter_ids)?;
    Ok(Json(BatchIssued::from_results(results)?))
}

#[get("/elections/<election_id>/credentials")]
async fn audit_credentials(
    _admin: AdminKey,
    election_id: ElectionId,
    coordinator: &State<VotingCoordinator>,
) -> Result<Json<Vec<Credential>>> {
    let credentials = coordinator.audit_credentials(election_id)?;
    Ok(Json(credentials))
}
