//! Core domain types for the MovieLens rating data.
//!
//! Key Rust concepts demonstrated here:
//! - Type aliases for domain clarity (UserId, MovieId)
//! - Structs with public fields
//! - HashMap / HashSet / BTreeSet for lookups and ordered tag sets
//! - Borrowing: getters hand out `&T`, never clones

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique identifier for a user
pub type UserId = u32;

/// Unique identifier for a movie in the MovieLens ID space
pub type MovieId = u32;

/// Genre tag as it appears in movies.csv ("Comedy", "Sci-Fi", "IMAX", ...)
pub type Genre = String;

/// Lowest rating MovieLens hands out
pub const MIN_RATING: f32 = 0.5;

/// Highest rating MovieLens hands out
pub const MAX_RATING: f32 = 5.0;

// Shared empty set so lookups of unknown movies can still return a reference
static NO_GENRES: BTreeSet<Genre> = BTreeSet::new();

// =============================================================================
// Input Records
// =============================================================================

/// A single rating row: (userId, movieId, rating)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub user_id: UserId,
    pub movie_id: MovieId,
    /// Rating value from 0.5 to 5.0 in half-star steps
    pub rating: f32,
}

/// A single movie row: (movieId, title, genres)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub movie_id: MovieId,
    pub title: String,
    pub genres: BTreeSet<Genre>,
}

impl MovieRecord {
    /// Convenience constructor used heavily by tests
    pub fn new(movie_id: MovieId, title: impl Into<String>, genres: &[&str]) -> Self {
        Self {
            movie_id,
            title: title.into(),
            genres: genres.iter().map(|g| g.to_string()).collect(),
        }
    }
}

// =============================================================================
// Movie
// =============================================================================

/// Represents a movie in the dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    /// Genre tags; order is irrelevant so a set keeps them canonical
    pub genres: BTreeSet<Genre>,
}

impl From<MovieRecord> for Movie {
    fn from(record: MovieRecord) -> Self {
        Self {
            id: record.movie_id,
            title: record.title,
            genres: record.genres,
        }
    }
}

/// What `build` does with a rating whose movie is missing from the movie table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferencePolicy {
    /// Reject the whole build with `MissingReference`
    #[default]
    Strict,
    /// Accept the rating; the movie has an empty genre set
    EmptyGenres,
}

// =============================================================================
// RatingMatrix - The Core In-Memory Store
// =============================================================================

/// Sparse user x movie rating matrix plus the per-movie genre tags.
///
/// Built once by `RatingMatrix::build` and read-only afterwards; the
/// similarity engine, predictor and cross-validator all borrow the same
/// instance. All lookups are hash-based.
#[derive(Debug, Default)]
pub struct RatingMatrix {
    pub(crate) movies: HashMap<MovieId, Movie>,

    /// Every user's ratings, keyed by movie
    pub(crate) user_ratings: HashMap<UserId, HashMap<MovieId, f32>>,
    /// Who rated each movie
    pub(crate) movie_raters: HashMap<MovieId, HashSet<UserId>>,

    /// Every genre tag appearing on any movie, sorted
    pub(crate) genre_universe: BTreeSet<Genre>,
}

impl RatingMatrix {
    /// Get a movie by ID
    pub fn get_movie(&self, id: MovieId) -> Option<&Movie> {
        self.movies.get(&id)
    }

    /// All ratings made by a user, or `None` for an unknown user
    pub fn user_ratings(&self, user_id: UserId) -> Option<&HashMap<MovieId, f32>> {
        self.user_ratings.get(&user_id)
    }

    /// Rating of (user, movie), or `None` when absent
    pub fn rating(&self, user_id: UserId, movie_id: MovieId) -> Option<f32> {
        self.user_ratings.get(&user_id)?.get(&movie_id).copied()
    }

    /// Users who rated a movie
    pub fn raters(&self, movie_id: MovieId) -> Option<&HashSet<UserId>> {
        self.movie_raters.get(&movie_id)
    }

    /// Genre set of a movie; empty for movies without a movie-table entry
    pub fn genres(&self, movie_id: MovieId) -> &BTreeSet<Genre> {
        self.movies
            .get(&movie_id)
            .map(|m| &m.genres)
            .unwrap_or(&NO_GENRES)
    }

    /// Every genre tag known to the matrix, in sorted order
    pub fn genre_universe(&self) -> &BTreeSet<Genre> {
        &self.genre_universe
    }

    /// IDs of every user with at least one rating, sorted ascending
    pub fn user_ids(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self.user_ratings.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns true if the user has any ratings
    pub fn contains_user(&self, user_id: UserId) -> bool {
        self.user_ratings.contains_key(&user_id)
    }

    /// Get counts for debugging/validation: (users, movies, ratings)
    pub fn counts(&self) -> (usize, usize, usize) {
        let total_ratings = self.user_ratings.values().map(|r| r.len()).sum();
        (self.user_ratings.len(), self.movies.len(), total_ratings)
    }
}
