pub mod error;
pub mod models;
pub mod validation;

pub use error::{VoteError, ErrorResponse};
pub use models::*;
pub use validation::*;

#[cfg(test)]
mod tests;
