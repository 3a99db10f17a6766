//! Leave-one-out cross-validation of similarity measures.
//!
//! ## Algorithm
//! 1. Sample a share of users with the caller's RNG
//! 2. For every sampled user and every rating they gave, hide that one
//!    rating through a `RatingView` and predict it with each strategy
//! 3. Accumulate squared errors per strategy; ratings a strategy cannot
//!    predict are counted separately and left out of its RMSE
//!
//! Every strategy sees exactly the same users and held-out ratings, so
//! their RMSEs are directly comparable.

use crate::config::{RunConfig, SamplePercent};
use crate::error::{EvaluationError, Result};
use data_loader::{MovieId, RatingMatrix, UserId};
use predictor::Predictor;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use similarity::{FeatureSpace, Measure, SimilarityEngine};
use std::fmt;
use tracing::{debug, info, instrument, warn};

/// One measure in one feature space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Strategy {
    pub measure: Measure,
    pub space: FeatureSpace,
}

impl Strategy {
    pub fn new(measure: Measure, space: FeatureSpace) -> Self {
        Self { measure, space }
    }

    /// Every measure in every space, grouped by space
    pub fn grid(measures: &[Measure], spaces: &[FeatureSpace]) -> Vec<Strategy> {
        spaces
            .iter()
            .flat_map(|&space| measures.iter().map(move |&measure| Strategy::new(measure, space)))
            .collect()
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.measure, self.space)
    }
}

/// How one strategy did over the held-out ratings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyOutcome {
    pub strategy: Strategy,
    /// `None` when not a single held-out rating could be predicted
    pub rmse: Option<f64>,
    pub predicted: usize,
    pub unpredictable: usize,
}

/// Result of one cross-validation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossValidationReport {
    /// Sampled users, ascending
    pub sampled_users: Vec<UserId>,
    /// Ratings held out, the same for every strategy
    pub held_out: usize,
    pub outcomes: Vec<StrategyOutcome>,
}

impl CrossValidationReport {
    pub fn outcome(&self, measure: Measure, space: FeatureSpace) -> Option<&StrategyOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.strategy == Strategy::new(measure, space))
    }

    pub fn rmse(&self, measure: Measure, space: FeatureSpace) -> Option<f64> {
        self.outcome(measure, space).and_then(|o| o.rmse)
    }
}

/// Running squared-error total for one strategy
#[derive(Debug, Default)]
struct ErrorAccumulator {
    squared_error: f64,
    predicted: usize,
    unpredictable: usize,
}

impl ErrorAccumulator {
    fn record(&mut self, error: f64) {
        self.squared_error += error * error;
        self.predicted += 1;
    }

    fn rmse(&self) -> Option<f64> {
        (self.predicted > 0).then(|| (self.squared_error / self.predicted as f64).sqrt())
    }
}

/// Sample `percent` of the matrix's users
///
/// Shuffles the (sorted) user IDs with `rng` and keeps the first
/// `percent.sample_size(n)`, so a seeded RNG always picks the same users.
/// The sample is returned sorted.
pub fn sample_users<R: Rng + ?Sized>(
    matrix: &RatingMatrix,
    percent: SamplePercent,
    rng: &mut R,
) -> Vec<UserId> {
    let mut users = matrix.user_ids();
    let size = percent.sample_size(users.len());
    users.shuffle(rng);
    users.truncate(size);
    users.sort_unstable();
    users
}

/// Runs leave-one-out cross-validation over one matrix
pub struct CrossValidator<'a> {
    predictor: Predictor<'a>,
}

impl<'a> CrossValidator<'a> {
    pub fn new(predictor: Predictor<'a>) -> Self {
        Self { predictor }
    }

    /// Validator with the aggregation and genre weighting from `config`
    pub fn from_config(matrix: &'a RatingMatrix, config: &RunConfig) -> Self {
        let engine = SimilarityEngine::new(matrix).with_genre_weighting(config.genre_weighting);
        Self::new(Predictor::new(engine).with_aggregation(config.aggregation))
    }

    /// Sample users, then evaluate every measure in every space
    #[instrument(level = "info", skip(self, measures, spaces, rng))]
    pub fn cross_validate<R: Rng + ?Sized>(
        &self,
        measures: &[Measure],
        spaces: &[FeatureSpace],
        percent: SamplePercent,
        rng: &mut R,
    ) -> Result<CrossValidationReport> {
        if measures.is_empty() || spaces.is_empty() {
            return Err(EvaluationError::InvalidConfiguration(
                "at least one measure and one feature space are required".to_string(),
            ));
        }
        let users = sample_users(self.predictor.matrix(), percent, rng);
        info!(
            "Sampled {} of {} users",
            users.len(),
            self.predictor.matrix().counts().0
        );
        Ok(self.evaluate(&Strategy::grid(measures, spaces), &users))
    }

    /// Run everything `config` describes
    pub fn run<R: Rng + ?Sized>(
        &self,
        config: &RunConfig,
        rng: &mut R,
    ) -> Result<CrossValidationReport> {
        config.validate()?;
        self.cross_validate(
            &config.measures,
            &config.feature_spaces,
            config.sample_percent,
            rng,
        )
    }

    /// Hold out every rating of `users` in turn and predict it with each strategy
    pub fn evaluate(&self, strategies: &[Strategy], users: &[UserId]) -> CrossValidationReport {
        let matrix = self.predictor.matrix();
        let mut accumulators: Vec<ErrorAccumulator> =
            strategies.iter().map(|_| ErrorAccumulator::default()).collect();
        let mut held_out = 0;

        for &user_id in users {
            let Some(ratings) = matrix.view().user(user_id) else {
                continue;
            };
            let mut known: Vec<(MovieId, f32)> = ratings.iter().collect();
            known.sort_unstable_by_key(|&(movie_id, _)| movie_id);
            debug!(user_id, ratings = known.len(), "Evaluating user");

            for (movie_id, actual) in known {
                held_out += 1;
                let view = matrix.without(user_id, movie_id);
                for (strategy, acc) in strategies.iter().zip(accumulators.iter_mut()) {
                    match self.predictor.predict_in(
                        &view,
                        user_id,
                        movie_id,
                        strategy.measure,
                        strategy.space,
                    ) {
                        Ok(prediction) => acc.record(prediction.rating - f64::from(actual)),
                        Err(e) => {
                            debug!(%strategy, "Skipping held-out rating: {}", e);
                            acc.unpredictable += 1;
                        }
                    }
                }
            }
        }

        let outcomes: Vec<StrategyOutcome> = strategies
            .iter()
            .zip(&accumulators)
            .map(|(&strategy, acc)| {
                if acc.unpredictable > 0 {
                    warn!(
                        "{}: {} of {} held-out ratings could not be predicted",
                        strategy, acc.unpredictable, held_out
                    );
                }
                StrategyOutcome {
                    strategy,
                    rmse: acc.rmse(),
                    predicted: acc.predicted,
                    unpredictable: acc.unpredictable,
                }
            })
            .collect();

        info!(
            "Cross-validated {} held-out ratings from {} users",
            held_out,
            users.len()
        );

        CrossValidationReport {
            sampled_users: users.to_vec(),
            held_out,
            outcomes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::{MovieRecord, RatingRecord, ReferencePolicy};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn create_test_matrix(users: u32) -> RatingMatrix {
        let movies = (1..=5).map(|id| MovieRecord::new(id, format!("Movie {}", id), &["Drama"]));
        let ratings = (1..=users).flat_map(|user_id| {
            (1..=5).map(move |movie_id| RatingRecord {
                user_id,
                movie_id,
                rating: 0.5 + ((user_id * 3 + movie_id * 7) % 10) as f32 * 0.5,
            })
        });
        RatingMatrix::build(ratings, movies, ReferencePolicy::Strict).unwrap()
    }

    #[test]
    fn test_sample_users_is_seeded() {
        let matrix = create_test_matrix(40);
        let percent = SamplePercent::new(25.0).unwrap();

        let first = sample_users(&matrix, percent, &mut StdRng::seed_from_u64(7));
        let second = sample_users(&matrix, percent, &mut StdRng::seed_from_u64(7));
        assert_eq!(first, second);
        assert_eq!(first.len(), 10);
        assert!(first.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_sample_users_minimum_one() {
        let matrix = create_test_matrix(4);
        let percent = SamplePercent::new(1.0).unwrap();
        let users = sample_users(&matrix, percent, &mut StdRng::seed_from_u64(1));
        assert_eq!(users.len(), 1);
    }

    #[test]
    fn test_every_strategy_sees_the_same_ratings() {
        let matrix = create_test_matrix(12);
        let validator = CrossValidator::new(Predictor::new(SimilarityEngine::new(&matrix)));

        let report = validator
            .cross_validate(
                &Measure::ALL,
                &[FeatureSpace::RawRatings, FeatureSpace::GenreFrequency],
                SamplePercent::new(50.0).unwrap(),
                &mut StdRng::seed_from_u64(42),
            )
            .unwrap();

        assert_eq!(report.sampled_users.len(), 6);
        assert_eq!(report.held_out, 30);
        assert_eq!(report.outcomes.len(), 6);
        for outcome in &report.outcomes {
            assert_eq!(outcome.predicted + outcome.unpredictable, report.held_out);
        }
    }

    #[test]
    fn test_empty_measures_rejected() {
        let matrix = create_test_matrix(3);
        let validator = CrossValidator::new(Predictor::new(SimilarityEngine::new(&matrix)));
        let result = validator.cross_validate(
            &[],
            &[FeatureSpace::RawRatings],
            SamplePercent::default(),
            &mut StdRng::seed_from_u64(0),
        );
        assert!(matches!(result, Err(EvaluationError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_nothing_predictable_gives_no_rmse() {
        // Two users with no movie in common
        let movies = vec![
            MovieRecord::new(1, "One", &["Drama"]),
            MovieRecord::new(2, "Two", &["Drama"]),
        ];
        let ratings = vec![
            RatingRecord { user_id: 1, movie_id: 1, rating: 4.0 },
            RatingRecord { user_id: 2, movie_id: 2, rating: 2.0 },
        ];
        let matrix = RatingMatrix::build(ratings, movies, ReferencePolicy::Strict).unwrap();
        let validator = CrossValidator::new(Predictor::new(SimilarityEngine::new(&matrix)));

        let report = validator.evaluate(
            &[Strategy::new(Measure::Pearson, FeatureSpace::RawRatings)],
            &[1, 2],
        );
        assert_eq!(report.held_out, 2);
        assert_eq!(report.outcomes[0].unpredictable, 2);
        assert_eq!(report.rmse(Measure::Pearson, FeatureSpace::RawRatings), None);
    }

    #[test]
    fn test_rmse_over_predicted_ratings_only() {
        let movies = (1..=5).map(|id| MovieRecord::new(id, format!("Movie {}", id), &["Drama"]));
        let rating = |user_id, movie_id, rating| RatingRecord { user_id, movie_id, rating };
        let ratings = vec![
            rating(1, 1, 4.0),
            rating(1, 2, 2.0),
            rating(1, 3, 5.0),
            rating(1, 4, 1.0),
            rating(1, 5, 3.5),
            rating(2, 1, 3.0),
            rating(2, 2, 2.0),
            rating(3, 3, 1.0),
            rating(3, 4, 3.0),
            // Shares nothing with user 1 once movie 5 is hidden
            rating(4, 5, 2.0),
        ];
        let matrix = RatingMatrix::build(ratings, movies, ReferencePolicy::Strict).unwrap();
        let validator = CrossValidator::new(Predictor::new(SimilarityEngine::new(&matrix)));

        // Each predictable rating has exactly one neighbour, whose rating is
        // the prediction:
        //   movie 1: user 2 says 3.0, actual 4.0 -> error -1
        //   movie 2: user 2 says 2.0, actual 2.0 -> error  0
        //   movie 3: user 3 says 1.0, actual 5.0 -> error -4
        //   movie 4: user 3 says 3.0, actual 1.0 -> error  2
        //   movie 5: user 4 has no co-rated movie -> unpredictable
        let report = validator.evaluate(
            &[Strategy::new(Measure::Euclidean, FeatureSpace::RawRatings)],
            &[1],
        );
        let outcome = &report.outcomes[0];
        assert_eq!(report.held_out, 5);
        assert_eq!(outcome.predicted, 4);
        assert_eq!(outcome.unpredictable, 1);

        let expected = ((1.0 + 0.0 + 16.0 + 4.0) / 4.0_f64).sqrt();
        let rmse = outcome.rmse.unwrap();
        assert!((rmse - expected).abs() < 1e-12, "rmse = {}", rmse);
    }

    #[test]
    fn test_strategy_grid_order() {
        let grid = Strategy::grid(
            &[Measure::Pearson, Measure::Cosine],
            &[FeatureSpace::RawRatings, FeatureSpace::GenreFrequency],
        );
        let labels: Vec<String> = grid.iter().map(|s| s.to_string()).collect();
        assert_eq!(
            labels,
            ["pearson/ratings", "cosine/ratings", "pearson/genres", "cosine/genres"]
        );
    }
}
