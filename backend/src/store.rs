//! In-process adapters behind a `Mutex<HashMap>`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use shared::{validate_title, Choice, VoteError, VoteId};
use tokio::time::Instant;
use tracing::error;

use crate::ports::{ChoiceStore, TallyCache, VoteStore};

#[derive(Debug, Default)]
struct Tables {
    next_id: VoteId,
    votes: HashMap<String, VoteId>,
    choices: HashMap<VoteId, Vec<Choice>>,
}

/// Votes and choices kept in memory. Implements both durable ports so that
/// deleting a vote also drops its choices.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, VoteError> {
        self.tables.lock().map_err(|e| {
            error!("Failed to acquire store lock: {}", e);
            VoteError::storage("store lock poisoned")
        })
    }
}

#[async_trait]
impl VoteStore for MemoryStore {
    async fn create(&self, title: &str) -> Result<VoteId, VoteError> {
        validate_title(title)?;
        let mut tables = self.lock()?;
        if tables.votes.contains_key(title) {
            return Err(VoteError::TitleAlreadyExists);
        }
        tables.next_id += 1;
        let id = tables.next_id;
        tables.votes.insert(title.to_string(), id);
        tables.choices.insert(id, Vec::new());
        Ok(id)
    }

    async fn resolve(&self, title: &str) -> Result<VoteId, VoteError> {
        validate_title(title)?;
        self.lock()?
            .votes
            .get(title)
            .copied()
            .ok_or(VoteError::TitleNotFound)
    }

    async fn delete(&self, vote_id: VoteId) -> Result<Option<String>, VoteError> {
        let mut tables = self.lock()?;
        let title = tables
            .votes
            .iter()
            .find(|(_, id)| **id == vote_id)
            .map(|(title, _)| title.clone());

        if let Some(title) = &title {
            tables.votes.remove(title);
            tables.choices.remove(&vote_id);
        }
        Ok(title)
    }
}

#[async_trait]
impl ChoiceStore for MemoryStore {
    async fn insert(&self, choice: &Choice) -> Result<String, VoteError> {
        let mut tables = self.lock()?;
        let choices = tables
            .choices
            .get_mut(&choice.vote_id)
            .ok_or_else(|| VoteError::storage(format!("vote {} does not exist", choice.vote_id)))?;

        if choices.iter().any(|c| c.title == choice.title) {
            return Err(VoteError::storage(format!(
                "choice {} already exists for vote {}",
                choice.title, choice.vote_id
            )));
        }
        choices.push(Choice::new(choice.vote_id, choice.title.clone()));
        Ok(choice.title.clone())
    }

    async fn find_all(&self, vote_id: VoteId) -> Result<Vec<Choice>, VoteError> {
        let tables = self.lock()?;
        let mut choices = tables.choices.get(&vote_id).cloned().unwrap_or_default();
        choices.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(choices)
    }

    async fn find_one(&self, vote_id: VoteId, choice_title: &str) -> Result<Choice, VoteError> {
        self.lock()?
            .choices
            .get(&vote_id)
            .and_then(|choices| choices.iter().find(|c| c.title == choice_title))
            .cloned()
            .ok_or(VoteError::ChoiceNotFound)
    }

    async fn increment_and_get(
        &self,
        vote_id: VoteId,
        choice_title: &str,
        delta: i64,
    ) -> Result<i64, VoteError> {
        let mut tables = self.lock()?;
        let choice = tables
            .choices
            .get_mut(&vote_id)
            .and_then(|choices| choices.iter_mut().find(|c| c.title == choice_title))
            .ok_or(VoteError::ChoiceNotFound)?;

        let count = choice
            .count
            .checked_add(delta)
            .ok_or_else(|| VoteError::storage("count out of range"))?;
        if count < 0 {
            return Err(VoteError::InvalidRequest("tally cannot go below zero".into()));
        }
        choice.count = count;
        Ok(count)
    }
}

#[derive(Debug)]
struct CachedTally {
    count: i64,
    expires_at: Instant,
}

type TallyKey = (String, String);

#[derive(Debug)]
struct CacheEntries {
    tallies: HashMap<TallyKey, CachedTally>,
    next_sweep: Instant,
}

/// Tally cache with per-entry expiry. Expired entries are dropped when read
/// and swept from the whole map at most once per `SWEEP_INTERVAL`.
#[derive(Debug)]
pub struct MemoryTallyCache {
    entries: Mutex<CacheEntries>,
}

impl Default for MemoryTallyCache {
    fn default() -> Self {
        Self {
            entries: Mutex::new(CacheEntries {
                tallies: HashMap::new(),
                next_sweep: Instant::now() + Self::SWEEP_INTERVAL,
            }),
        }
    }
}

impl MemoryTallyCache {
    pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, CacheEntries>, VoteError> {
        self.entries.lock().map_err(|e| {
            error!("Failed to acquire cache lock: {}", e);
            VoteError::cache("cache lock poisoned")
        })
    }

    /// Live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .map(|entries| entries.tallies.values().filter(|e| e.expires_at > now).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries held in memory, expired ones included.
    pub fn stored(&self) -> usize {
        self.lock().map(|entries| entries.tallies.len()).unwrap_or(0)
    }
}

#[async_trait]
impl TallyCache for MemoryTallyCache {
    async fn get(&self, vote_title: &str, choice_title: &str) -> Option<i64> {
        let key = (vote_title.to_string(), choice_title.to_string());
        let now = Instant::now();
        let mut entries = self.lock().ok()?;
        let count = entries
            .tallies
            .get(&key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.count);
        if count.is_none() {
            entries.tallies.remove(&key);
        }
        count
    }

    async fn set(
        &self,
        vote_title: &str,
        choice_title: &str,
        count: i64,
        ttl: Duration,
    ) -> Result<(), VoteError> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        if now >= entries.next_sweep {
            entries.tallies.retain(|_, entry| entry.expires_at > now);
            entries.next_sweep = now + Self::SWEEP_INTERVAL;
        }
        entries.tallies.insert(
            (vote_title.to_string(), choice_title.to_string()),
            CachedTally { count, expires_at: now + ttl },
        );
        Ok(())
    }

    async fn evict(&self, vote_title: &str) -> Result<(), VoteError> {
        self.lock()?.tallies.retain(|(vote, _), _| vote != vote_title);
        Ok(())
    }
}
