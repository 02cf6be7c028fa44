use serde::{Serialize, Deserialize};
use std::fmt::Display;
use thiserror::Error;

/// Every failure the vote service can report.
///
/// `CacheFailure` is recovered inside the backend and never reaches a client.
/// `StorageFailure` reaches a client only from the synchronous part of a
/// request; background write-backs log it and drop it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VoteError {
    #[error("title is empty")]
    EmptyTitle,
    #[error("the title doesn't exist")]
    TitleNotFound,
    #[error("the choice title doesn't exist")]
    ChoiceNotFound,
    #[error("title already exists")]
    TitleAlreadyExists,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("cache error: {0}")]
    CacheFailure(String),
    #[error("storage error: {0}")]
    StorageFailure(String),
}

impl VoteError {
    pub fn storage(err: impl Display) -> Self {
        Self::StorageFailure(err.to_string())
    }

    pub fn cache(err: impl Display) -> Self {
        Self::CacheFailure(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

impl From<&VoteError> for ErrorResponse {
    fn from(err: &VoteError) -> Self {
        Self { error: err.to_string() }
    }
}
