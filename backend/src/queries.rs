use async_trait::async_trait;
use sqlx::PgPool;
use shared::{validate_title, Choice, VoteError, VoteId};
use tracing::{debug, error};

use crate::ports::{ChoiceStore, VoteStore};

const CHECK_VIOLATION: &str = "23514";

fn increment_error(e: sqlx::Error) -> VoteError {
    let is_check_violation = e
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == CHECK_VIOLATION);

    if is_check_violation {
        debug!("Rejected increment: {}", e);
        VoteError::InvalidRequest("tally cannot go below zero".into())
    } else {
        storage_error("increment choice", e)
    }
}

fn storage_error(context: &str, e: sqlx::Error) -> VoteError {
    error!("{} failed: {}", context, e);
    VoteError::storage(format!("{}: {}", context, e))
}

#[derive(Clone)]
pub struct PgVoteStore {
    pool: PgPool,
}

impl PgVoteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VoteStore for PgVoteStore {
    async fn create(&self, title: &str) -> Result<VoteId, VoteError> {
        validate_title(title)?;

        sqlx::query_scalar::<_, VoteId>(
            "INSERT INTO vote (vote_title) VALUES ($1)
             ON CONFLICT (vote_title) DO NOTHING
             RETURNING vote_id",
        )
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("insert vote", e))?
        .ok_or(VoteError::TitleAlreadyExists)
    }

    async fn resolve(&self, title: &str) -> Result<VoteId, VoteError> {
        validate_title(title)?;

        sqlx::query_scalar::<_, VoteId>("SELECT vote_id FROM vote WHERE vote_title = $1")
            .bind(title)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("find vote", e))?
            .ok_or(VoteError::TitleNotFound)
    }

    async fn delete(&self, vote_id: VoteId) -> Result<Option<String>, VoteError> {
        sqlx::query_scalar::<_, String>("DELETE FROM vote WHERE vote_id = $1 RETURNING vote_title")
            .bind(vote_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("delete vote", e))
    }
}

#[derive(Clone)]
pub struct PgChoiceStore {
    pool: PgPool,
}

impl PgChoiceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChoiceStore for PgChoiceStore {
    async fn insert(&self, choice: &Choice) -> Result<String, VoteError> {
        sqlx::query_scalar::<_, String>(
            "INSERT INTO choice (choice_title, count, vote_id) VALUES ($1, 0, $2)
             RETURNING choice_title",
        )
        .bind(&choice.title)
        .bind(choice.vote_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| storage_error("insert choice", e))
    }

    async fn find_all(&self, vote_id: VoteId) -> Result<Vec<Choice>, VoteError> {
        sqlx::query_as::<_, Choice>(
            "SELECT choice_title AS title, vote_id, count
             FROM choice WHERE vote_id = $1
             ORDER BY choice_title",
        )
        .bind(vote_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error("find choices", e))
    }

    async fn find_one(&self, vote_id: VoteId, choice_title: &str) -> Result<Choice, VoteError> {
        let choice = sqlx::query_as::<_, Choice>(
            "SELECT choice_title AS title, vote_id, count
             FROM choice WHERE vote_id = $1 AND choice_title = $2",
        )
        .bind(vote_id)
        .bind(choice_title)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("find choice", e))?
        .ok_or(VoteError::ChoiceNotFound)?;

        debug!("Found {} with count {} in vote {}", choice.title, choice.count, vote_id);
        Ok(choice)
    }

    async fn increment_and_get(
        &self,
        vote_id: VoteId,
        choice_title: &str,
        delta: i64,
    ) -> Result<i64, VoteError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_error("begin transaction", e))?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL READ COMMITTED")
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_error("set isolation level", e))?;

        // Dropping `tx` on any early return rolls it back.
        let count = sqlx::query_scalar::<_, i64>(
            "UPDATE choice SET count = count + $1
             WHERE vote_id = $2 AND choice_title = $3
             RETURNING count",
        )
        .bind(delta)
        .bind(vote_id)
        .bind(choice_title)
        .fetch_optional(&mut *tx)
        .await
        .map_err(increment_error)?
        .ok_or(VoteError::ChoiceNotFound)?;

        tx.commit()
            .await
            .map_err(|e| storage_error("commit transaction", e))?;

        Ok(count)
    }
}
