//! Neighbourhood-based rating prediction.
//!
//! ## Algorithm
//! 1. Hide the target user's own rating of the target movie (if any)
//! 2. For every other user who rated the movie, compute their similarity
//!    to the target under the chosen measure and feature space
//! 3. Keep only neighbours with a defined, strictly positive similarity;
//!    negative or zero scores are dropped rather than down-weighted so
//!    they cannot pull the estimate the wrong way
//! 4. Aggregate the neighbours' ratings, weighted by similarity
//!
//! The estimate is never clamped to the rating scale; that is left to
//! whoever presents it.

use crate::error::{PredictError, Result};
use data_loader::{MovieId, RatingMatrix, RatingView, UserId};
use serde::{Deserialize, Serialize};
use similarity::{FeatureSpace, Measure, SimilarityEngine};
use tracing::{instrument, trace};

/// How neighbour ratings are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggregation {
    /// `Σ w·r / Σ w`
    #[default]
    WeightedAverage,
    /// `mean(target) + Σ w·(r − mean(neighbour)) / Σ w`
    MeanCentered,
}

/// A predicted rating
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub user_id: UserId,
    pub movie_id: MovieId,
    /// Estimate on the rating scale (unclamped)
    pub rating: f64,
    /// How many neighbours contributed
    pub neighbors: usize,
}

/// A user who rated the target movie and qualifies as a neighbour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub user_id: UserId,
    /// Similarity to the target, always > 0
    pub weight: f64,
    /// Their rating of the target movie
    pub rating: f64,
}

/// Predicts ratings from similar users
pub struct Predictor<'a> {
    engine: SimilarityEngine<'a>,
    aggregation: Aggregation,
}

impl<'a> Predictor<'a> {
    pub fn new(engine: SimilarityEngine<'a>) -> Self {
        Self {
            engine,
            aggregation: Aggregation::default(),
        }
    }

    /// Configure how neighbour ratings are combined (default: weighted average)
    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn engine(&self) -> &SimilarityEngine<'a> {
        &self.engine
    }

    pub fn matrix(&self) -> &'a RatingMatrix {
        self.engine.matrix()
    }

    /// Predict `user_id`'s rating of `movie_id`
    ///
    /// If the user already rated the movie, that rating is hidden while
    /// neighbours are scored, so the estimate never sees its own answer.
    #[instrument(level = "debug", skip(self))]
    pub fn predict(
        &self,
        user_id: UserId,
        movie_id: MovieId,
        measure: Measure,
        space: FeatureSpace,
    ) -> Result<Prediction> {
        let view = self.matrix().without(user_id, movie_id);
        self.predict_in(&view, user_id, movie_id, measure, space)
    }

    /// Predict through an explicit view
    pub fn predict_in(
        &self,
        view: &RatingView<'_>,
        user_id: UserId,
        movie_id: MovieId,
        measure: Measure,
        space: FeatureSpace,
    ) -> Result<Prediction> {
        let target = view.user(user_id).ok_or(PredictError::UnknownUser(user_id))?;

        let neighbors = self.neighbors(view, user_id, movie_id, measure, space);
        if neighbors.is_empty() {
            trace!(user_id, movie_id, "no qualifying neighbours");
            return Err(PredictError::NoNeighbors { user_id, movie_id });
        }

        let rating = match self.aggregation {
            Aggregation::WeightedAverage => weighted_average(&neighbors),
            Aggregation::MeanCentered => {
                // Without visible ratings the target has no baseline
                let baseline = target
                    .mean()
                    .ok_or(PredictError::NoNeighbors { user_id, movie_id })?;
                mean_centered(view, baseline, &neighbors)
            }
        };

        Ok(Prediction {
            user_id,
            movie_id,
            rating,
            neighbors: neighbors.len(),
        })
    }

    /// Every qualifying neighbour for (user, movie), in user-ID order
    pub fn neighbors(
        &self,
        view: &RatingView<'_>,
        user_id: UserId,
        movie_id: MovieId,
        measure: Measure,
        space: FeatureSpace,
    ) -> Vec<Neighbor> {
        let Some(target) = self.engine.prepare(view, user_id, space) else {
            return Vec::new();
        };
        view.raters(movie_id)
            .into_iter()
            .filter(|&other| other != user_id)
            .filter_map(|other| {
                let weight = self
                    .engine
                    .similarity_to(view, &target, other, measure)
                    .weight()?;
                let rating = view.rating(other, movie_id)?;
                Some(Neighbor {
                    user_id: other,
                    weight,
                    rating: f64::from(rating),
                })
            })
            .collect()
    }
}

/// `Σ w·r / Σ w`; callers guarantee a non-empty slice of positive weights
pub fn weighted_average(neighbors: &[Neighbor]) -> f64 {
    let (weighted, total) = neighbors
        .iter()
        .fold((0.0, 0.0), |(weighted, total), n| {
            (weighted + n.weight * n.rating, total + n.weight)
        });
    weighted / total
}

/// Baseline plus the weighted average of each neighbour's deviation
/// from their own mean
fn mean_centered(view: &RatingView<'_>, baseline: f64, neighbors: &[Neighbor]) -> f64 {
    let (weighted, total) = neighbors.iter().fold((0.0, 0.0), |(weighted, total), n| {
        let mean = view
            .user(n.user_id)
            .and_then(|ratings| ratings.mean())
            .unwrap_or(n.rating);
        (weighted + n.weight * (n.rating - mean), total + n.weight)
    });
    baseline + weighted / total
}
