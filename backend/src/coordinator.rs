//! Tally updates across the cache and the durable store.
//!
//! Every update reads the cache once and takes one of two branches:
//!
//! * **hit**: the new count is written to the cache and the caller gets its
//!   answer right away. The durable increment runs afterwards as a detached
//!   write-back.
//! * **miss**: the durable store is incremented while the caller waits, and
//!   the committed count is pushed to the cache afterwards.
//!
//! Each branch makes exactly one synchronous write and schedules one
//! best-effort write to the other side. A failed cache write on the hit
//! branch falls back to a synchronous durable increment.
//!
//! The hit branch reads and then writes the cache without any lock, so two
//! concurrent hits on the same key can both start from the same cached value
//! and one delta is lost in the cache. The durable count is not affected and
//! the cache converges once the entry expires.

use std::sync::Arc;
use std::time::Duration;

use shared::{validate_update, TallyUpdate, VoteError};
use tracing::{debug, instrument, warn};

use crate::background::WriteBacks;
use crate::ports::{ChoiceStore, TallyCache, VoteStore};

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
const DEFAULT_WRITE_BACK_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TallySettings {
    /// Lifetime of a cached tally.
    pub cache_ttl: Duration,
    /// Upper bound for one detached write-back.
    pub write_back_timeout: Duration,
}

impl Default for TallySettings {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            write_back_timeout: DEFAULT_WRITE_BACK_TIMEOUT,
        }
    }
}

pub struct TallyCoordinator {
    cache: Arc<dyn TallyCache>,
    votes: Arc<dyn VoteStore>,
    choices: Arc<dyn ChoiceStore>,
    settings: TallySettings,
    write_backs: WriteBacks,
}

impl TallyCoordinator {
    pub fn new(
        cache: Arc<dyn TallyCache>,
        votes: Arc<dyn VoteStore>,
        choices: Arc<dyn ChoiceStore>,
        settings: TallySettings,
    ) -> Self {
        Self {
            cache,
            votes,
            choices,
            settings,
            write_backs: WriteBacks::new(),
        }
    }

    pub fn write_backs(&self) -> &WriteBacks {
        &self.write_backs
    }

    /// Applies `update.delta` to one choice.
    ///
    /// Success on a cache hit means the new count is cached; the durable
    /// store catches up in the background. Success on a miss means the delta
    /// is committed durably.
    #[instrument(
        skip(self, update),
        fields(vote = %update.vote_title, choice = %update.choice_title, delta = update.delta)
    )]
    pub async fn update_choice(&self, update: TallyUpdate) -> Result<(), VoteError> {
        validate_update(&update)?;

        match self.cache.get(&update.vote_title, &update.choice_title).await {
            Some(cached) => self.update_cached(update, cached).await,
            None => self.update_uncached(update).await,
        }
    }

    async fn update_cached(&self, update: TallyUpdate, cached: i64) -> Result<(), VoteError> {
        let new_count = cached
            .checked_add(update.delta)
            .ok_or_else(|| VoteError::InvalidRequest("tally would overflow".into()))?;
        if new_count < 0 {
            return Err(VoteError::InvalidRequest("tally cannot go below zero".into()));
        }
        debug!(cached, new_count, "cache hit");

        if let Err(e) = self
            .cache
            .set(&update.vote_title, &update.choice_title, new_count, self.settings.cache_ttl)
            .await
        {
            warn!("cache write failed, incrementing durably instead: {}", e);
            return increment_durably(self.votes.as_ref(), self.choices.as_ref(), &update)
                .await
                .map(|_| ());
        }

        let votes = self.votes.clone();
        let choices = self.choices.clone();
        self.write_backs.spawn("durable", self.settings.write_back_timeout, async move {
            let committed = increment_durably(votes.as_ref(), choices.as_ref(), &update).await?;
            debug!(committed, "durable count caught up");
            Ok(())
        });

        Ok(())
    }

    async fn update_uncached(&self, update: TallyUpdate) -> Result<(), VoteError> {
        debug!("cache miss");

        let vote_id = self.votes.resolve(&update.vote_title).await?;
        let found = self.choices.find_one(vote_id, &update.choice_title).await?;
        let expected = found.count.saturating_add(update.delta);

        let committed = self
            .choices
            .increment_and_get(vote_id, &update.choice_title, update.delta)
            .await?;
        if committed != expected {
            debug!(expected, committed, "concurrent increments landed in between");
        }

        let cache = self.cache.clone();
        let ttl = self.settings.cache_ttl;
        self.write_backs.spawn("cache", self.settings.write_back_timeout, async move {
            cache.set(&update.vote_title, &update.choice_title, committed, ttl).await
        });

        Ok(())
    }
}

async fn increment_durably(
    votes: &dyn VoteStore,
    choices: &dyn ChoiceStore,
    update: &TallyUpdate,
) -> Result<i64, VoteError> {
    let vote_id = votes.resolve(&update.vote_title).await?;
    choices
        .increment_and_get(vote_id, &update.choice_title, update.delta)
        .await
}
