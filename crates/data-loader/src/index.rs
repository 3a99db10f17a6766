//! RatingMatrix building and validation.
//!
//! This module turns parsed records into the immutable `RatingMatrix`:
//! - Validate every rating (value range, movie reference)
//! - Build the primary index (user -> movie -> rating)
//! - Build the inverse index (movie -> raters) and the genre universe
//!
//! Rust concepts used here:
//! - The Entry API for HashMap
//! - `rayon::join` to parse two files at once
//! - `impl IntoIterator` parameters so callers can pass Vecs, arrays or iterators

use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::types::*;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

impl RatingMatrix {
    /// Build a matrix from already-parsed rating and movie records.
    ///
    /// Steps:
    /// 1. Index movies (later duplicates replace earlier ones)
    /// 2. Validate and insert every rating
    /// 3. Collect the genre universe
    ///
    /// Fails with `InvalidValue` for ratings outside `[MIN_RATING, MAX_RATING]`
    /// and, under `ReferencePolicy::Strict`, with `MissingReference` for ratings
    /// of movies absent from the movie records.
    pub fn build(
        ratings: impl IntoIterator<Item = RatingRecord>,
        movies: impl IntoIterator<Item = MovieRecord>,
        policy: ReferencePolicy,
    ) -> Result<Self> {
        let mut matrix = RatingMatrix::default();

        for record in movies {
            matrix.movies.insert(record.movie_id, Movie::from(record));
        }

        for record in ratings {
            validate_rating(&record)?;
            if policy == ReferencePolicy::Strict && !matrix.movies.contains_key(&record.movie_id) {
                return Err(DataLoadError::MissingReference {
                    entity: "Movie".to_string(),
                    id: record.movie_id,
                });
            }
            matrix.insert_rating(record);
        }

        matrix.genre_universe = matrix
            .movies
            .values()
            .flat_map(|movie| movie.genres.iter().cloned())
            .collect();

        let (users, movies, ratings) = matrix.counts();
        debug!(
            users,
            movies,
            ratings,
            genres = matrix.genre_universe.len(),
            "Built rating matrix"
        );
        Ok(matrix)
    }

    /// Load `ratings.csv` and `movies.csv` from a MovieLens directory
    ///
    /// The two files are parsed in parallel; building the matrix happens
    /// once both are in memory.
    pub fn load_from_files(data_dir: &Path, policy: ReferencePolicy) -> Result<Self> {
        info!("Loading MovieLens dataset from {:?}", data_dir);

        let ratings_path = data_dir.join("ratings.csv");
        let movies_path = data_dir.join("movies.csv");

        let (ratings, movies) = rayon::join(
            || parser::parse_ratings(&ratings_path),
            || parser::parse_movies(&movies_path),
        );
        let ratings = ratings?;
        let movies = movies?;

        info!(
            "Parsed {} ratings and {} movies",
            ratings.len(),
            movies.len()
        );

        let matrix = RatingMatrix::build(ratings, movies, policy)?;
        let (users, movies, ratings) = matrix.counts();
        info!(
            "Rating matrix ready: {} users, {} movies, {} ratings",
            users, movies, ratings
        );
        Ok(matrix)
    }

    /// Insert a rating and update both indices
    ///
    /// A repeated (user, movie) pair keeps the last rating seen.
    fn insert_rating(&mut self, record: RatingRecord) {
        self.user_ratings
            .entry(record.user_id)
            .or_insert_with(HashMap::new)
            .insert(record.movie_id, record.rating);

        self.movie_raters
            .entry(record.movie_id)
            .or_default()
            .insert(record.user_id);
    }
}

/// Check a rating value lies in the MovieLens range
fn validate_rating(record: &RatingRecord) -> Result<()> {
    if !record.rating.is_finite() || record.rating < MIN_RATING || record.rating > MAX_RATING {
        return Err(DataLoadError::InvalidValue {
            field: "rating".to_string(),
            value: record.rating.to_string(),
        });
    }
    Ok(())
}
