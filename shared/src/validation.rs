use std::collections::HashSet;
use crate::error::VoteError;
use crate::models::{CreateVoteRequest, TallyUpdate};

pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_CHOICES: usize = 64;

pub fn validate_title(title: &str) -> Result<(), VoteError> {
    if title.trim().is_empty() { return Err(VoteError::EmptyTitle); }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(VoteError::InvalidRequest(format!(
            "title exceeds {} characters", MAX_TITLE_LENGTH
        )));
    }
    Ok(())
}

pub fn validate_create_vote(request: &CreateVoteRequest) -> Result<(), VoteError> {
    validate_title(&request.title)?;

    if request.choices.is_empty() {
        return Err(VoteError::InvalidRequest("a vote needs at least one choice".into()));
    }
    if request.choices.len() > MAX_CHOICES {
        return Err(VoteError::InvalidRequest(format!(
            "a vote cannot have more than {} choices", MAX_CHOICES
        )));
    }

    request.choices.iter().try_for_each(|choice| validate_title(choice))?;

    let mut seen = HashSet::with_capacity(request.choices.len());
    if let Some(duplicate) = request.choices.iter().find(|choice| !seen.insert(choice.as_str())) {
        return Err(VoteError::InvalidRequest(format!("duplicate choice: {}", duplicate)));
    }

    Ok(())
}

/// Only emptiness is checked; unknown titles are the stores' concern.
pub fn validate_update(update: &TallyUpdate) -> Result<(), VoteError> {
    if update.vote_title.trim().is_empty() || update.choice_title.trim().is_empty() {
        return Err(VoteError::EmptyTitle);
    }
    Ok(())
}
