use std::sync::Arc;

use shared::{validate_create_vote, validate_title, Choice, CreateVoteRequest, Vote, VoteError, VoteId};
use tracing::{debug, error, info, instrument, warn};

use crate::ports::{ChoiceStore, TallyCache, VoteStore};

/// Vote bookkeeping and result reads. Tally updates go through
/// [`crate::coordinator::TallyCoordinator`] instead.
pub struct VoteProcessor {
    votes: Arc<dyn VoteStore>,
    choices: Arc<dyn ChoiceStore>,
    cache: Arc<dyn TallyCache>,
}

impl VoteProcessor {
    pub fn new(
        votes: Arc<dyn VoteStore>,
        choices: Arc<dyn ChoiceStore>,
        cache: Arc<dyn TallyCache>,
    ) -> Self {
        Self { votes, choices, cache }
    }

    /// Creates the vote and all of its choices at count 0. When a choice
    /// cannot be stored the vote is removed again so no half-built vote
    /// stays behind.
    #[instrument(skip(self, request), fields(vote = %request.title))]
    pub async fn create_vote(&self, request: &CreateVoteRequest) -> Result<(Vote, Vec<String>), VoteError> {
        validate_create_vote(request)?;

        let vote_id = self.votes.create(&request.title).await?;
        let mut created = Vec::with_capacity(request.choices.len());

        for title in &request.choices {
            match self.choices.insert(&Choice::new(vote_id, title.as_str())).await {
                Ok(stored) => created.push(stored),
                Err(e) => {
                    error!("Failed to store choice {}: {}", title, e);
                    if let Err(cleanup) = self.votes.delete(vote_id).await {
                        warn!("Could not remove partially created vote {}: {}", vote_id, cleanup);
                    }
                    return Err(e);
                }
            }
        }

        info!("Created vote {} with {} choices", vote_id, created.len());
        Ok((Vote { id: vote_id, title: request.title.clone() }, created))
    }

    /// Durable tallies of every choice, ordered by choice title.
    ///
    /// The cache is never read here, so counts still waiting in a write-back
    /// are not visible yet.
    #[instrument(skip(self))]
    pub async fn get_results(&self, vote_title: &str) -> Result<(Vote, Vec<Choice>), VoteError> {
        validate_title(vote_title)?;

        let vote_id = self.votes.resolve(vote_title).await?;
        let choices = self.choices.find_all(vote_id).await?;
        debug!("Read {} choices for vote {}", choices.len(), vote_id);

        Ok((Vote { id: vote_id, title: vote_title.to_string() }, choices))
    }

    #[instrument(skip(self))]
    pub async fn delete_vote(&self, vote_id: VoteId) -> Result<(), VoteError> {
        let Some(title) = self.votes.delete(vote_id).await? else {
            debug!("Vote {} did not exist", vote_id);
            return Ok(());
        };

        if let Err(e) = self.cache.evict(&title).await {
            warn!("Cached tallies of {} remain until they expire: {}", title, e);
        }
        info!("Deleted vote {}", vote_id);
        Ok(())
    }
}
