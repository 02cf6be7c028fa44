//! Storage and cache capabilities the vote service is written against.
//!
//! Each trait has a Postgres/Redis implementation for production and an
//! in-process one in [`crate::store`] for tests and local runs.

use std::time::Duration;

use async_trait::async_trait;
use shared::{Choice, VoteError, VoteId};

/// Durable per-(vote, choice) counters. The source of truth for tallies.
#[async_trait]
pub trait ChoiceStore: Send + Sync {
    /// Creates a choice row bound to `choice.vote_id` with count 0 and
    /// returns the stored title.
    async fn insert(&self, choice: &Choice) -> Result<String, VoteError>;

    async fn find_all(&self, vote_id: VoteId) -> Result<Vec<Choice>, VoteError>;

    /// Fails with `ChoiceNotFound` when the vote has no such choice.
    async fn find_one(&self, vote_id: VoteId, choice_title: &str) -> Result<Choice, VoteError>;

    /// Applies `delta` atomically and returns the committed count. Concurrent
    /// callers on the same key never lose an update.
    async fn increment_and_get(
        &self,
        vote_id: VoteId,
        choice_title: &str,
        delta: i64,
    ) -> Result<i64, VoteError>;
}

/// Maps vote titles to their numeric ids.
#[async_trait]
pub trait VoteStore: Send + Sync {
    async fn create(&self, title: &str) -> Result<VoteId, VoteError>;

    async fn resolve(&self, title: &str) -> Result<VoteId, VoteError>;

    /// Deletes the vote and its choices. Returns the removed title, or `None`
    /// when no vote had that id.
    async fn delete(&self, vote_id: VoteId) -> Result<Option<String>, VoteError>;
}

/// Volatile last-known tallies keyed by (vote title, choice title).
#[async_trait]
pub trait TallyCache: Send + Sync {
    /// `None` means the cache has no opinion: the entry is absent, expired,
    /// or the backend could not be read.
    async fn get(&self, vote_title: &str, choice_title: &str) -> Option<i64>;

    async fn set(
        &self,
        vote_title: &str,
        choice_title: &str,
        count: i64,
        ttl: Duration,
    ) -> Result<(), VoteError>;

    /// Drops every cached tally of a vote.
    async fn evict(&self, vote_title: &str) -> Result<(), VoteError>;
}
