//! # Redis tally cache
//!
//! One hash per vote, one field per choice:
//!
//! ```text
//! tally:<vote title>  ->  { <choice title>: <count>, ... }
//! ```
//!
//! The TTL is applied to the whole hash, so every write to any choice of a
//! vote extends the lifetime of all of them. `HSET` and `EXPIRE` go out as one
//! `MULTI`/`EXEC` pipeline so a field is never written without a TTL. Reads that fail for any reason
//! count as a miss.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client, Pipeline, RedisResult};
use shared::VoteError;
use tracing::{debug, warn};

use crate::ports::TallyCache;

const KEY_PREFIX: &str = "tally:";

pub fn tally_key(vote_title: &str) -> String {
    format!("{}{}", KEY_PREFIX, vote_title)
}

/// Redis rejects a zero EXPIRE, so sub-second TTLs are rounded up.
pub fn ttl_seconds(ttl: Duration) -> i64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    i64::try_from(secs.max(1)).unwrap_or(i64::MAX)
}

fn set_pipeline(key: &str, choice_title: &str, count: i64, ttl: Duration) -> Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .hset(key, choice_title, count)
        .ignore()
        .expire(key, ttl_seconds(ttl))
        .ignore();
    pipe
}

#[derive(Clone)]
pub struct RedisTallyCache {
    connection: ConnectionManager,
    op_timeout: Duration,
}

impl RedisTallyCache {
    pub async fn connect(redis_url: &str, op_timeout: Duration) -> Result<Self, VoteError> {
        let client = Client::open(redis_url).map_err(VoteError::cache)?;
        let config = ConnectionManagerConfig::new().set_number_of_retries(1);
        let connection = tokio::time::timeout(
            op_timeout.max(Duration::from_secs(1)),
            client.get_connection_manager_with_config(config),
        )
        .await
        .map_err(|_| VoteError::cache("timed out connecting to redis"))?
        .map_err(VoteError::cache)?;

        Ok(Self { connection, op_timeout })
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, VoteError>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.op_timeout, op).await {
            Ok(result) => result.map_err(VoteError::cache),
            Err(_) => Err(VoteError::cache(format!(
                "redis did not answer within {:?}",
                self.op_timeout
            ))),
        }
    }
}

#[async_trait]
impl TallyCache for RedisTallyCache {
    async fn get(&self, vote_title: &str, choice_title: &str) -> Option<i64> {
        let mut conn = self.connection.clone();
        let key = tally_key(vote_title);
        match self.bounded(conn.hget::<_, _, Option<i64>>(&key, choice_title)).await {
            Ok(count) => count,
            Err(e) => {
                warn!("Reading {} from redis failed: {}", key, e);
                None
            }
        }
    }

    async fn set(
        &self,
        vote_title: &str,
        choice_title: &str,
        count: i64,
        ttl: Duration,
    ) -> Result<(), VoteError> {
        let mut conn = self.connection.clone();
        let key = tally_key(vote_title);
        debug!("Saving {}:{} = {}", key, choice_title, count);

        let pipe = set_pipeline(&key, choice_title, count, ttl);
        self.bounded(pipe.query_async::<()>(&mut conn)).await
    }

    async fn evict(&self, vote_title: &str) -> Result<(), VoteError> {
        let mut conn = self.connection.clone();
        self.bounded(conn.del::<_, ()>(tally_key(vote_title))).await
    }
}
