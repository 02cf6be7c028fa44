use std::sync::Arc;

use rocket::{State, delete, post, http::Status, serde::json::Json};
use tracing::{debug, instrument};
use shared::{Choice, CreateVoteRequest, TallyUpdate, UpdateChoiceRequest, VoteId, VoteResponse, VoteTitleRequest};
use crate::{
    coordinator::TallyCoordinator,
    error::ApiError,
    processor::VoteProcessor,
};

pub struct AppState {
    pub votes: Arc<VoteProcessor>,
    pub tallies: Arc<TallyCoordinator>,
}

impl AppState {
    pub fn new(votes: VoteProcessor, tallies: TallyCoordinator) -> Self {
        Self {
            votes: Arc::new(votes),
            tallies: Arc::new(tallies),
        }
    }
}

#[rocket::options("/<_..>")]
pub async fn all_options() -> Status {
    Status::Ok
}

#[instrument(skip(state, request), fields(vote = %request.title))]
#[post("/vote", format = "json", data = "<request>")]
pub async fn create_vote(
    state: &State<AppState>,
    request: Json<CreateVoteRequest>,
) -> Result<Json<VoteResponse>, ApiError> {
    let (vote, titles) = state.votes.create_vote(&request).await?;
    let choices = titles.into_iter().map(|title| Choice::new(vote.id, title)).collect();
    Ok(Json(VoteResponse::new(vote, choices)))
}

#[instrument(skip(state, request), fields(vote = %request.title))]
#[post("/result", format = "json", data = "<request>")]
pub async fn get_result(
    state: &State<AppState>,
    request: Json<VoteTitleRequest>,
) -> Result<Json<VoteResponse>, ApiError> {
    let (vote, choices) = state.votes.get_results(&request.title).await?;
    Ok(Json(VoteResponse::new(vote, choices)))
}

#[instrument(skip(state, request))]
#[post("/choice", format = "json", data = "<request>")]
pub async fn update_choice(
    state: &State<AppState>,
    request: Json<UpdateChoiceRequest>,
) -> Result<Status, ApiError> {
    let update = TallyUpdate::from(request.into_inner());
    debug!("Updating {}/{} by {}", update.vote_title, update.choice_title, update.delta);
    state.tallies.update_choice(update).await?;
    Ok(Status::Ok)
}

#[instrument(skip(state))]
#[delete("/vote/<id>")]
pub async fn delete_vote(state: &State<AppState>, id: VoteId) -> Result<Status, ApiError> {
    state.votes.delete_vote(id).await?;
    Ok(Status::NoContent)
}
