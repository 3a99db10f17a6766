//! Error types for rating prediction.

use data_loader::{MovieId, UserId};
use thiserror::Error;

/// Why a rating could not be predicted
///
/// Neither case is fatal to a run: the caller reports "unable to predict"
/// for that movie, and cross-validation counts it and moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PredictError {
    /// Nobody who rated the movie has a positive, defined similarity
    /// to the target user
    #[error("No qualifying neighbours of user {user_id} rated movie {movie_id}")]
    NoNeighbors { user_id: UserId, movie_id: MovieId },

    /// The target user has no ratings in the matrix
    #[error("User {0} not found")]
    UnknownUser(UserId),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, PredictError>;
