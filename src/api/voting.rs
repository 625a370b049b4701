use rocket::{serde::json::Json, Route, State};

use crate::{
    coordinator::VotingCoordinator,
    error::Result,
    model::{
        api::{receipt::Receipt, vote::VoteRequest},
        common::ElectionId,
    },
};

pub fn routes() -> Vec<Route> {
    routes![cast_vote]
}

#[post("/elections/<election_id>/votes", data = "<vote>", format = "json")]
async fn cast_vote(
    election_id: ElectionId,
    vote: Json<VoteRequest>,
    coordinator: &State<VotingCoordinator>,
) -> Result<Json<Receipt>> {
    let record =
        coordinator.cast_vote_with_token(election_id, vote.voter_id, &vote.token, &vote.candidate)?;
    Ok(Json(record.into()))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::{Client, LocalResponse},
        serde::json::{serde_json, Value},
    };

    use crate::api::test_helpers::{active_election, admin_key, issue};
    use crate::model::{common::GENESIS_HASH, credential::CredentialToken};

    use super::*;

    async fn vote<'c>(
        client: &'c Client,
        election_id: ElectionId,
        voter_id: u32,
        token: &CredentialToken,
        candidate: &str,
    ) -> LocalResponse<'c> {
        let request = VoteRequest {
            voter_id,
            token: token.clone(),
            candidate: candidate.to_string(),
        };
        client
            .post(uri!(cast_vote(election_id)))
            .header(ContentType::JSON)
            .body(serde_json::to_string(&request).unwrap())
            .dispatch()
            .await
    }

    #[backend_test]
    async fn vote_once(client: Client) {
        let election_id = active_election(&client).await;
        let credential = issue(&client, election_id, 7).await;

        let response = vote(&client, election_id, 7, &credential.token, "Alice").await;
        assert_eq!(Status::Ok, response.status());
        let receipt: Receipt = response.into_json().await.unwrap();
        assert_eq!(receipt.election_id, election_id);
        assert_eq!(receipt.sequence, 1);
        assert_eq!(receipt.previous_hash, GENESIS_HASH);

        // Second attempt is refused, and nothing was spent by the refusal itself.
        let response = vote(&client, election_id, 7, &credential.token, "Bob").await;
        assert_eq!(Status::Conflict, response.status());
        let error: Value = response.into_json().await.unwrap();
        assert_eq!(error["error"], "already_used");
        assert_eq!(error["credential_spent"], false);

        // The receipt can be found on the ledger.
        let response = client
            .get(format!("/elections/{election_id}/receipts/{}", receipt.receipt))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let record: Value = response.into_json().await.unwrap();
        assert_eq!(record["candidate_id"], "Alice");
        assert_eq!(record["hash"], receipt.receipt.to_string());
    }

    #[backend_test]
    async fn bad_votes_spend_nothing(client: Client) {
        let election_id = active_election(&client).await;
        let credential = issue(&client, election_id, 7).await;

        // Forged token.
        let response = vote(&client, election_id, 7, &CredentialToken::random(), "Alice").await;
        assert_eq!(Status::Unauthorized, response.status());

        // Someone else's voter ID.
        let response = vote(&client, election_id, 8, &credential.token, "Alice").await;
        assert_eq!(Status::Unauthorized, response.status());

        // Unknown candidate.
        let response = vote(&client, election_id, 7, &credential.token, "Mallory").await;
        assert_eq!(Status::BadRequest, response.status());
        let error: Value = response.into_json().await.unwrap();
        assert_eq!(error["error"], "validation");

        // Malformed token.
        let response = client
            .post(uri!(cast_vote(election_id)))
            .header(ContentType::JSON)
            .body(
                serde_json::json!({ "voter_id": 7, "token": "not a token", "candidate": "Alice" })
                    .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::UnprocessableEntity, response.status());

        // The credential still works.
        let response = vote(&client, election_id, 7, &credential.token, "Alice").await;
        assert_eq!(Status::Ok, response.status());
    }

    #[backend_test]
    async fn unknown_election_is_not_found(client: Client) {
        let response = vote(&client, 42, 7, &CredentialToken::random(), "Alice").await;
        assert_eq!(Status::NotFound, response.status());
        let error: Value = response.into_json().await.unwrap();
        assert_eq!(error["error"], "not_found");
    }

    #[backend_test]
    async fn no_votes_after_close(client: Client) {
        let election_id = active_election(&client).await;
        let credential = issue(&client, election_id, 7).await;

        let response = client
            .post(format!("/elections/{election_id}/close"))
            .header(admin_key())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let response = vote(&client, election_id, 7, &credential.token, "Alice").await;
        assert_eq!(Status::BadRequest, response.status());
        let error: Value = response.into_json().await.unwrap();
        assert_eq!(error["error"], "invalid_state");
    }
}
