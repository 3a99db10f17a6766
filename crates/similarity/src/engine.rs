//! The similarity engine: one entry point for every measure / feature space
//! combination over a single rating matrix.

use crate::genre::{GenreModel, GenreProfile, GenreWeighting};
use crate::measure::{FeatureSpace, Measure, Similarity};
use data_loader::{RatingMatrix, RatingView, UserId, UserRatings};
use std::borrow::Cow;
use std::cell::OnceCell;
use tracing::debug;

/// Computes user-user similarity over one borrowed `RatingMatrix`
///
/// The genre model (document frequencies and per-user profiles) is built
/// lazily on the first genre-space query and then reused for the lifetime
/// of the engine. Since the engine borrows the matrix immutably, the cache
/// can never go stale.
pub struct SimilarityEngine<'a> {
    matrix: &'a RatingMatrix,
    weighting: GenreWeighting,
    genre_model: OnceCell<GenreModel>,
}

impl<'a> SimilarityEngine<'a> {
    pub fn new(matrix: &'a RatingMatrix) -> Self {
        Self {
            matrix,
            weighting: GenreWeighting::default(),
            genre_model: OnceCell::new(),
        }
    }

    /// Configure how genre profiles are weighted (default: log TF, smooth IDF)
    pub fn with_genre_weighting(mut self, weighting: GenreWeighting) -> Self {
        self.weighting = weighting;
        self.genre_model = OnceCell::new();
        self
    }

    pub fn matrix(&self) -> &'a RatingMatrix {
        self.matrix
    }

    /// The genre model, built on first use
    pub fn genre_model(&self) -> &GenreModel {
        self.genre_model.get_or_init(|| {
            debug!("Building genre model with {:?}", self.weighting);
            GenreModel::build(self.matrix, self.weighting)
        })
    }

    /// Similarity of two users with every rating visible
    pub fn similarity(
        &self,
        user_a: UserId,
        user_b: UserId,
        measure: Measure,
        space: FeatureSpace,
    ) -> Similarity {
        self.similarity_in(&self.matrix.view(), user_a, user_b, measure, space)
    }

    /// Similarity of two users as seen through `view`
    ///
    /// Unknown users, an empty co-rated set, zero variance and zero
    /// magnitude all come back as `Similarity::Undefined`.
    pub fn similarity_in(
        &self,
        view: &RatingView<'_>,
        user_a: UserId,
        user_b: UserId,
        measure: Measure,
        space: FeatureSpace,
    ) -> Similarity {
        match self.prepare(view, user_a, space) {
            Some(target) => self.similarity_to(view, &target, user_b, measure),
            None => Similarity::Undefined,
        }
    }

    /// Prepare one user's side of a comparison
    ///
    /// When comparing one target against many users (every rater of a
    /// movie), prepare the target once and call `similarity_to` per rater.
    /// A held-out user's genre profile is then rebuilt once, not per pair.
    /// `None` for a user absent from the view.
    pub fn prepare<'v>(
        &'v self,
        view: &RatingView<'v>,
        user_id: UserId,
        space: FeatureSpace,
    ) -> Option<UserVector<'v>> {
        debug_assert!(
            std::ptr::eq(view.matrix(), self.matrix),
            "view must come from the engine's matrix"
        );
        match space {
            FeatureSpace::RawRatings => view.user(user_id).map(UserVector::Ratings),
            FeatureSpace::GenreFrequency => self
                .genre_model()
                .profile(view, user_id)
                .map(UserVector::Genres),
        }
    }

    /// Similarity of a prepared target to `other`, as seen through `view`
    pub fn similarity_to(
        &self,
        view: &RatingView<'_>,
        target: &UserVector<'_>,
        other: UserId,
        measure: Measure,
    ) -> Similarity {
        match target {
            UserVector::Ratings(ours) => {
                let Some(theirs) = view.user(other) else {
                    return Similarity::Undefined;
                };
                let pairs: Vec<(f64, f64)> = ours
                    .co_rated(&theirs)
                    .into_iter()
                    .map(|(_, x, y)| (f64::from(x), f64::from(y)))
                    .collect();
                measure.score(&pairs)
            }
            UserVector::Genres(ours) => match self.genre_model().profile(view, other) {
                Some(theirs) => measure.score(&ours.paired_with(&theirs)),
                None => Similarity::Undefined,
            },
        }
    }
}

/// One user's feature vector, ready to be compared against others
#[derive(Debug, Clone)]
pub enum UserVector<'v> {
    /// Visible ratings; pairs are formed per comparison from co-rated movies
    Ratings(UserRatings<'v>),
    /// Weighted genre profile
    Genres(Cow<'v, GenreProfile>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::{MovieRecord, RatingRecord, ReferencePolicy};

    fn rating(user_id: UserId, movie_id: u32, rating: f32) -> RatingRecord {
        RatingRecord { user_id, movie_id, rating }
    }

    fn create_test_matrix() -> RatingMatrix {
        let movies = vec![
            MovieRecord::new(10, "Ten", &["Drama"]),
            MovieRecord::new(20, "Twenty", &["Comedy"]),
            MovieRecord::new(30, "Thirty", &["Action"]),
            MovieRecord::new(40, "Forty", &["Action", "Comedy"]),
        ];
        let ratings = vec![
            rating(1, 10, 5.0),
            rating(1, 20, 4.0),
            rating(2, 10, 3.0),
            rating(2, 20, 4.0),
            // Users 3 and 4 agree in shape but not in scale
            rating(3, 10, 1.0),
            rating(3, 20, 2.0),
            rating(3, 30, 3.0),
            rating(4, 10, 2.0),
            rating(4, 20, 4.0),
            rating(4, 30, 5.0),
            // User 5 shares nothing with user 1
            rating(5, 40, 4.5),
        ];
        RatingMatrix::build(ratings, movies, ReferencePolicy::Strict).unwrap()
    }

    #[test]
    fn test_pearson_over_co_rated_set() {
        let matrix = create_test_matrix();
        let engine = SimilarityEngine::new(&matrix);

        // Co-rated {10, 20}: (5, 4) vs (3, 4) are perfectly anti-correlated
        let sim = engine.similarity(1, 2, Measure::Pearson, FeatureSpace::RawRatings);
        assert!((sim.value().unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_held_out_movie_leaves_constant_vector() {
        let matrix = create_test_matrix();
        let engine = SimilarityEngine::new(&matrix);

        // Hiding user 1's rating of movie 10 leaves only movie 20, rated 4.0
        // by both: zero variance
        let view = matrix.without(1, 10);
        let sim = engine.similarity_in(&view, 1, 2, Measure::Pearson, FeatureSpace::RawRatings);
        assert_eq!(sim, Similarity::Undefined);
    }

    #[test]
    fn test_no_co_rated_movies_is_undefined() {
        let matrix = create_test_matrix();
        let engine = SimilarityEngine::new(&matrix);

        for measure in Measure::ALL {
            let sim = engine.similarity(1, 5, measure, FeatureSpace::RawRatings);
            assert_eq!(sim, Similarity::Undefined, "{} should be undefined", measure);
        }
    }

    #[test]
    fn test_unknown_user_is_undefined() {
        let matrix = create_test_matrix();
        let engine = SimilarityEngine::new(&matrix);
        let sim = engine.similarity(1, 99, Measure::Cosine, FeatureSpace::RawRatings);
        assert_eq!(sim, Similarity::Undefined);
    }

    #[test]
    fn test_raw_measures_are_symmetric() {
        let matrix = create_test_matrix();
        let engine = SimilarityEngine::new(&matrix);

        for measure in Measure::ALL {
            for (a, b) in [(1, 2), (3, 4), (1, 3), (2, 4)] {
                let ab = engine.similarity(a, b, measure, FeatureSpace::RawRatings);
                let ba = engine.similarity(b, a, measure, FeatureSpace::RawRatings);
                assert_eq!(ab, ba, "{} not symmetric for ({}, {})", measure, a, b);
            }
        }
    }

    #[test]
    fn test_measures_disagree_on_scale() {
        let matrix = create_test_matrix();
        let engine = SimilarityEngine::new(&matrix);

        let pearson = engine
            .similarity(3, 4, Measure::Pearson, FeatureSpace::RawRatings)
            .value()
            .unwrap();
        let euclidean = engine
            .similarity(3, 4, Measure::Euclidean, FeatureSpace::RawRatings)
            .value()
            .unwrap();

        assert!(pearson > 0.9);
        // (1,2,3) vs (2,4,5): distance sqrt(1 + 4 + 4) = 3
        assert!((euclidean - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_genre_space_ignores_co_rated_restriction() {
        let matrix = create_test_matrix();
        let engine = SimilarityEngine::new(&matrix);

        // Users 1 and 5 share no movie, but genre profiles always line up
        let sim = engine.similarity(1, 5, Measure::Euclidean, FeatureSpace::GenreFrequency);
        assert!(sim.is_defined());

        // Users 1 and 2 rated the same movies: identical profiles
        let sim = engine.similarity(1, 2, Measure::Cosine, FeatureSpace::GenreFrequency);
        assert!((sim.value().unwrap() - 1.0).abs() < 1e-12);
        let sim = engine.similarity(1, 2, Measure::Euclidean, FeatureSpace::GenreFrequency);
        assert_eq!(sim, Similarity::Defined(1.0));
    }

    #[test]
    fn test_prepared_target_matches_pairwise() {
        let matrix = create_test_matrix();
        let engine = SimilarityEngine::new(&matrix);
        let view = matrix.without(3, 20);

        for space in [FeatureSpace::RawRatings, FeatureSpace::GenreFrequency] {
            let target = engine.prepare(&view, 3, space).unwrap();
            for measure in Measure::ALL {
                for other in [1, 2, 4, 5, 99] {
                    assert_eq!(
                        engine.similarity_to(&view, &target, other, measure),
                        engine.similarity_in(&view, 3, other, measure, space),
                        "{} / {} against user {}",
                        measure,
                        space,
                        other
                    );
                }
            }
        }
    }

    #[test]
    fn test_held_out_genre_profile_prepared_once() {
        let matrix = create_test_matrix();
        let engine = SimilarityEngine::new(&matrix);
        let view = matrix.without(3, 20);

        // Only the target's profile differs from the cache; it is built here
        // and every comparison reuses it
        let target = engine.prepare(&view, 3, FeatureSpace::GenreFrequency).unwrap();
        assert!(matches!(target, UserVector::Genres(Cow::Owned(_))));
        let other = engine.prepare(&view, 4, FeatureSpace::GenreFrequency).unwrap();
        assert!(matches!(other, UserVector::Genres(Cow::Borrowed(_))));

        assert!(engine.prepare(&view, 99, FeatureSpace::RawRatings).is_none());
    }

    #[test]
    fn test_genre_model_is_built_once() {
        let matrix = create_test_matrix();
        let engine = SimilarityEngine::new(&matrix);

        let first = engine.genre_model() as *const GenreModel;
        let second = engine.genre_model() as *const GenreModel;
        assert_eq!(first, second);
    }
}
