pub mod background;
pub mod cache;
pub mod catchers;
pub mod config;
pub mod coordinator;
pub mod cors;
pub mod error;
pub mod ports;
pub mod processor;
pub mod queries;
pub mod routes;
pub mod store;
pub use shared::{models::*, validation::*, ErrorResponse, VoteError};

use std::time::Duration;

use rocket::{Build, Rocket};

use crate::{
    background::DrainWriteBacks,
    catchers::{bad_request, internal_error, not_found, unprocessable},
    config::AppConfig,
    cors::CORS,
    routes::{all_options, create_vote, delete_vote, get_result, update_choice, AppState},
};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

pub fn build_rocket(state: AppState, config: &AppConfig) -> Rocket<Build> {
    let drain = DrainWriteBacks {
        write_backs: state.tallies.write_backs().clone(),
        grace: SHUTDOWN_GRACE.min(config.write_back_timeout),
    };

    rocket::build()
        .attach(CORS { allowed_origin: config.allowed_origin.clone() })
        .attach(drain)
        .manage(state)
        .mount(
            "/api",
            rocket::routes![
                create_vote,
                get_result,
                update_choice,
                delete_vote,
                all_options
            ],
        )
        .register(
            "/",
            rocket::catchers![
                bad_request,
                not_found,
                unprocessable,
                internal_error
            ],
        )
}
