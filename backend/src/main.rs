use std::sync::Arc;

use backend::{
    build_rocket,
    cache::RedisTallyCache,
    config::AppConfig,
    coordinator::TallyCoordinator,
    ports::TallyCache,
    processor::VoteProcessor,
    queries::{PgChoiceStore, PgVoteStore},
    routes::AppState,
    store::MemoryTallyCache,
};
use shuttle_runtime::CustomError;
use sqlx::PgPool;
use tracing::info;

#[shuttle_runtime::main]
async fn rocket(
    #[shuttle_shared_db::Postgres] pool: PgPool,
    #[shuttle_runtime::Secrets] secret_store: shuttle_runtime::SecretStore,
) -> shuttle_rocket::ShuttleRocket {
    info!("🚀 Starting vote service");

    let config = AppConfig::from_lookup(|key| secret_store.get(key)).map_err(CustomError::new)?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(CustomError::new)?;

    info!("📋 Migrations complete");

    let cache: Arc<dyn TallyCache> = match &config.redis_url {
        Some(url) => {
            let redis = RedisTallyCache::connect(url, config.cache_op_timeout)
                .await
                .map_err(CustomError::new)?;
            info!("🔌 Connected to redis");
            Arc::new(redis)
        }
        None => Arc::new(MemoryTallyCache::new()),
    };

    let votes = Arc::new(PgVoteStore::new(pool.clone()));
    let choices = Arc::new(PgChoiceStore::new(pool));

    let app_state = AppState::new(
        VoteProcessor::new(votes.clone(), choices.clone(), cache.clone()),
        TallyCoordinator::new(cache, votes, choices, config.tally_settings()),
    );

    Ok(build_rocket(app_state, &config).into())
}
