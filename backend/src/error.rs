use rocket::http::Status;
use rocket::response::Responder;
use rocket::serde::json::Json;
use shared::{ErrorResponse, VoteError};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Internal error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::BadRequest(_) => Status::BadRequest,
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::Conflict(_) => Status::Conflict,
            ApiError::Internal => Status::InternalServerError,
        }
    }
}

impl From<VoteError> for ApiError {
    fn from(err: VoteError) -> Self {
        match err {
            VoteError::EmptyTitle | VoteError::InvalidRequest(_) => ApiError::BadRequest(err.to_string()),
            VoteError::TitleNotFound | VoteError::ChoiceNotFound => ApiError::NotFound(err.to_string()),
            VoteError::TitleAlreadyExists => ApiError::Conflict(err.to_string()),
            VoteError::CacheFailure(_) | VoteError::StorageFailure(_) => {
                error!("Request failed: {}", err);
                ApiError::Internal
            }
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for ApiError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        let body = Json(ErrorResponse { error: self.to_string() });

        rocket::Response::build_from(body.respond_to(req)?)
            .status(status)
            .ok()
    }
}
