//! Genre profiles: users as TF-IDF weighted genre vectors.
//!
//! Each user is a "document" whose "terms" are the genres of the movies
//! they rated. A genre's term frequency is how often it shows up in the
//! user's ratings; its inverse document frequency is computed across all
//! users of the matrix.
//!
//! ## Algorithm
//! 1. Count genre occurrences per user (one count per rated movie per genre)
//! 2. Document frequency = number of users with a non-zero count
//! 3. Weight = tf(count) * idf(document frequency)
//! 4. Lay weights out densely in genre-universe order so any two profiles
//!    line up position by position
//!
//! The document frequencies and the full-matrix profiles are computed once
//! per `GenreModel` and never change; a held-out view only re-derives the
//! profile of the user whose rating is hidden.

use data_loader::{Genre, RatingMatrix, RatingView, UserId, UserRatings};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;

/// Term-frequency variants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TermFrequency {
    /// `ln(1 + count)`
    #[default]
    Logarithmic,
    /// The raw count
    Raw,
    /// `count / total count`
    Normalized,
    /// `0.5 + 0.5 * count / max count` for genres that occur, 0 otherwise
    Augmented,
    /// 1 if the genre occurs at all
    Boolean,
}

impl TermFrequency {
    /// Weight of a genre seen `count` times in a profile whose counts sum
    /// to `total` and peak at `max`
    pub fn weight(self, count: usize, total: usize, max: usize) -> f64 {
        if count == 0 {
            return 0.0;
        }
        let count = count as f64;
        match self {
            TermFrequency::Logarithmic => count.ln_1p(),
            TermFrequency::Raw => count,
            TermFrequency::Normalized => count / total as f64,
            TermFrequency::Augmented => 0.5 + 0.5 * count / max as f64,
            TermFrequency::Boolean => 1.0,
        }
    }
}

/// Inverse-document-frequency variants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InverseDocumentFrequency {
    /// `ln((1 + n) / df)`, stays positive for genres every user has
    #[default]
    Smooth,
    /// `ln(n / df)`
    Plain,
    /// No IDF weighting (constant 1)
    Off,
}

impl InverseDocumentFrequency {
    /// IDF of a genre found in `document_frequency` of `documents` users
    ///
    /// A genre nobody rated carries no information and gets 0.
    pub fn weight(self, document_frequency: usize, documents: usize) -> f64 {
        if self == InverseDocumentFrequency::Off {
            return 1.0;
        }
        if document_frequency == 0 {
            return 0.0;
        }
        let df = document_frequency as f64;
        let n = documents as f64;
        match self {
            InverseDocumentFrequency::Smooth => ((1.0 + n) / df).ln(),
            InverseDocumentFrequency::Plain => (n / df).ln(),
            InverseDocumentFrequency::Off => 1.0,
        }
    }
}

/// TF and IDF choice for building profiles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreWeighting {
    pub term_frequency: TermFrequency,
    pub inverse_document_frequency: InverseDocumentFrequency,
}

/// One user's weighted genre vector, in genre-universe order
#[derive(Debug, Clone, PartialEq)]
pub struct GenreProfile {
    weights: Vec<f64>,
}

impl GenreProfile {
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Position-wise pairs with another profile of the same model
    pub fn paired_with(&self, other: &GenreProfile) -> Vec<(f64, f64)> {
        self.weights
            .iter()
            .copied()
            .zip(other.weights.iter().copied())
            .collect()
    }
}

/// Document frequencies plus the cached full-matrix profile of every user
#[derive(Debug)]
pub struct GenreModel {
    genres: Vec<Genre>,
    positions: HashMap<Genre, usize>,
    idf: Vec<f64>,
    weighting: GenreWeighting,
    profiles: HashMap<UserId, GenreProfile>,
}

impl GenreModel {
    /// Compute document frequencies and every user's profile
    pub fn build(matrix: &RatingMatrix, weighting: GenreWeighting) -> Self {
        let genres: Vec<Genre> = matrix.genre_universe().iter().cloned().collect();
        let positions: HashMap<Genre, usize> = genres
            .iter()
            .enumerate()
            .map(|(i, genre)| (genre.clone(), i))
            .collect();

        let mut model = GenreModel {
            idf: vec![0.0; genres.len()],
            genres,
            positions,
            weighting,
            profiles: HashMap::new(),
        };

        let view = matrix.view();
        let user_ids = matrix.user_ids();
        let counts: Vec<(UserId, Vec<usize>)> = user_ids
            .iter()
            .filter_map(|&user_id| {
                let ratings = view.user(user_id)?;
                Some((user_id, model.genre_counts(&view, &ratings)))
            })
            .collect();

        let mut document_frequency = vec![0usize; model.genres.len()];
        for (_, user_counts) in &counts {
            for (df, &count) in document_frequency.iter_mut().zip(user_counts) {
                if count > 0 {
                    *df += 1;
                }
            }
        }
        let documents = counts.len();
        model.idf = document_frequency
            .iter()
            .map(|&df| weighting.inverse_document_frequency.weight(df, documents))
            .collect();

        model.profiles = counts
            .into_iter()
            .map(|(user_id, user_counts)| (user_id, model.weigh(&user_counts)))
            .collect();
        model
    }

    /// Genre universe, in vector order
    pub fn genres(&self) -> &[Genre] {
        &self.genres
    }

    /// IDF of a genre, `None` for genres outside the universe
    pub fn idf(&self, genre: &str) -> Option<f64> {
        self.positions.get(genre).map(|&i| self.idf[i])
    }

    /// Profile of `user_id` as seen through `view`
    ///
    /// Served from the cache unless the view hides one of this user's
    /// ratings, in which case it is recomputed without that rating.
    /// Document frequencies always come from the full matrix.
    pub fn profile(&self, view: &RatingView<'_>, user_id: UserId) -> Option<Cow<'_, GenreProfile>> {
        match view.held_out() {
            Some((held_user, _)) if held_user == user_id => {
                let ratings = view.user(user_id)?;
                let counts = self.genre_counts(view, &ratings);
                Some(Cow::Owned(self.weigh(&counts)))
            }
            _ => self.profiles.get(&user_id).map(Cow::Borrowed),
        }
    }

    /// How many of the user's visible ratings fall in each genre
    fn genre_counts(&self, view: &RatingView<'_>, ratings: &UserRatings<'_>) -> Vec<usize> {
        let mut counts = vec![0usize; self.genres.len()];
        for (movie_id, _) in ratings.iter() {
            for genre in view.genres(movie_id) {
                if let Some(&i) = self.positions.get(genre) {
                    counts[i] += 1;
                }
            }
        }
        counts
    }

    fn weigh(&self, counts: &[usize]) -> GenreProfile {
        let total: usize = counts.iter().sum();
        let max = counts.iter().copied().max().unwrap_or(0);
        let tf = self.weighting.term_frequency;
        GenreProfile {
            weights: counts
                .iter()
                .zip(&self.idf)
                .map(|(&count, &idf)| tf.weight(count, total, max) * idf)
                .collect(),
        }
    }
}
