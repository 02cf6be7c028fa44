use serde::{Serialize, Deserialize};

pub type VoteId = i32;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vote {
    pub id: VoteId,
    pub title: String,
}

/// One option of a vote together with its durable tally.
#[cfg_attr(feature = "backend", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Choice {
    pub title: String,
    pub vote_id: VoteId,
    pub count: i64,
}

impl Choice {
    pub fn new(vote_id: VoteId, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            vote_id,
            count: 0,
        }
    }
}

/// A signed adjustment of one choice's tally, addressed by titles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyUpdate {
    pub vote_title: String,
    pub choice_title: String,
    pub delta: i64,
}

impl TallyUpdate {
    pub fn new(vote_title: impl Into<String>, choice_title: impl Into<String>, delta: i64) -> Self {
        Self {
            vote_title: vote_title.into(),
            choice_title: choice_title.into(),
            delta,
        }
    }

    pub fn increment(vote_title: impl Into<String>, choice_title: impl Into<String>) -> Self {
        Self::new(vote_title, choice_title, DEFAULT_DELTA)
    }
}

pub const DEFAULT_DELTA: i64 = 1;

fn default_delta() -> i64 {
    DEFAULT_DELTA
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVoteRequest {
    #[serde(rename = "vote")]
    pub title: String,
    pub choices: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteTitleRequest {
    #[serde(rename = "vote")]
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateChoiceRequest {
    #[serde(rename = "vote")]
    pub vote_title: String,
    #[serde(rename = "choice")]
    pub choice_title: String,
    #[serde(default = "default_delta")]
    pub delta: i64,
}

impl From<UpdateChoiceRequest> for TallyUpdate {
    fn from(request: UpdateChoiceRequest) -> Self {
        TallyUpdate::new(request.vote_title, request.choice_title, request.delta)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChoiceResponse {
    #[serde(rename = "choice")]
    pub title: String,
    #[serde(rename = "vote_count")]
    pub count: i64,
}

impl From<Choice> for ChoiceResponse {
    fn from(choice: Choice) -> Self {
        Self {
            title: choice.title,
            count: choice.count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteResponse {
    pub vote_id: VoteId,
    #[serde(rename = "vote")]
    pub title: String,
    pub choices: Vec<ChoiceResponse>,
}

impl VoteResponse {
    pub fn new(vote: Vote, choices: Vec<Choice>) -> Self {
        Self {
            vote_id: vote.id,
            title: vote.title,
            choices: choices.into_iter().map(ChoiceResponse::from).collect(),
        }
    }
}
