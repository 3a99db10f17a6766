//! End-to-end cross-validation over small hand-built matrices.

use data_loader::{MovieRecord, RatingMatrix, RatingRecord, ReferencePolicy};
use evaluation::{CrossValidator, EvaluationError, RunConfig, SamplePercent};
use predictor::Predictor;
use rand::SeedableRng;
use rand::rngs::StdRng;
use similarity::{FeatureSpace, Measure, SimilarityEngine};

/// Every user gives every movie the same per-movie rating, so any held-out
/// rating is exactly what all the neighbours say
fn create_consensus_matrix() -> RatingMatrix {
    let movies = vec![
        MovieRecord::new(1, "Heat (1995)", &["Action"]),
        MovieRecord::new(2, "Clueless (1995)", &["Comedy"]),
        MovieRecord::new(3, "Casino (1995)", &["Drama"]),
        MovieRecord::new(4, "Rush Hour (1998)", &["Action", "Comedy"]),
    ];
    let per_movie = [(1, 1.0), (2, 2.5), (3, 4.0), (4, 5.0)];
    let ratings = (1..=5).flat_map(|user_id| {
        per_movie.iter().map(move |&(movie_id, rating)| RatingRecord {
            user_id,
            movie_id,
            rating,
        })
    });
    RatingMatrix::build(ratings, movies, ReferencePolicy::Strict).unwrap()
}

/// A less regular matrix where predictions are imperfect
fn create_noisy_matrix() -> RatingMatrix {
    let genres = [&["Action"][..], &["Comedy"], &["Drama", "Romance"], &["Action", "Drama"]];
    let movies = (1..=12).map(|id| {
        MovieRecord::new(id, format!("Movie {}", id), genres[(id as usize) % genres.len()])
    });
    let ratings = (1..=30u32).flat_map(|user_id| {
        (1..=12u32)
            .filter(move |movie_id| (user_id + movie_id) % 3 != 0)
            .map(move |movie_id| RatingRecord {
                user_id,
                movie_id,
                rating: 0.5 + ((user_id * 7 + movie_id * 5) % 10) as f32 * 0.5,
            })
    });
    RatingMatrix::build(ratings, movies, ReferencePolicy::Strict).unwrap()
}

#[test]
fn test_recoverable_ratings_give_zero_rmse() {
    let matrix = create_consensus_matrix();
    let validator = CrossValidator::new(Predictor::new(SimilarityEngine::new(&matrix)));

    let report = validator
        .cross_validate(
            &Measure::ALL,
            &[FeatureSpace::RawRatings, FeatureSpace::GenreFrequency],
            SamplePercent::new(100.0).unwrap(),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();

    assert_eq!(report.held_out, 20);
    for outcome in &report.outcomes {
        assert!(outcome.predicted > 0, "{} predicted nothing", outcome.strategy);
        let rmse = outcome.rmse.unwrap();
        assert!(rmse.abs() < 1e-9, "{} rmse = {}", outcome.strategy, rmse);
    }
}

#[test]
fn test_full_sample_is_seed_independent() {
    let matrix = create_noisy_matrix();
    let validator = CrossValidator::new(Predictor::new(SimilarityEngine::new(&matrix)));
    let all = SamplePercent::new(100.0).unwrap();

    let first = validator
        .cross_validate(&Measure::ALL, &[FeatureSpace::RawRatings], all, &mut StdRng::seed_from_u64(3))
        .unwrap();
    let second = validator
        .cross_validate(&Measure::ALL, &[FeatureSpace::RawRatings], all, &mut StdRng::seed_from_u64(99))
        .unwrap();

    let (_, _, ratings) = matrix.counts();
    assert_eq!(first.held_out, ratings);
    assert_eq!(first.held_out, second.held_out);
    assert_eq!(first, second);
}

#[test]
fn test_same_seed_same_report() {
    let matrix = create_noisy_matrix();
    let config = RunConfig::default()
        .with_sample_percent(SamplePercent::new(20.0).unwrap())
        .with_seed(Some(2024));
    let validator = CrossValidator::from_config(&matrix, &config);

    let first = validator.run(&config, &mut StdRng::seed_from_u64(2024)).unwrap();
    let second = validator.run(&config, &mut StdRng::seed_from_u64(2024)).unwrap();

    assert_eq!(first.sampled_users.len(), 6);
    assert_eq!(first, second);
}

#[test]
fn test_measures_share_held_out_ratings() {
    let matrix = create_noisy_matrix();
    let config = RunConfig::default()
        .with_sample_percent(SamplePercent::new(50.0).unwrap())
        .with_feature_spaces(vec![FeatureSpace::RawRatings, FeatureSpace::GenreFrequency]);
    let validator = CrossValidator::from_config(&matrix, &config);

    let report = validator.run(&config, &mut StdRng::seed_from_u64(5)).unwrap();
    assert_eq!(report.outcomes.len(), 6);
    for outcome in &report.outcomes {
        assert_eq!(outcome.predicted + outcome.unpredictable, report.held_out);
        if let Some(rmse) = outcome.rmse {
            assert!(rmse >= 0.0 && rmse.is_finite());
        }
    }
    assert!(report.rmse(Measure::Cosine, FeatureSpace::RawRatings).is_some());
}

#[test]
fn test_invalid_config_rejected_before_running() {
    let matrix = create_noisy_matrix();
    let config = RunConfig::default().with_feature_spaces(Vec::new());
    let validator = CrossValidator::from_config(&matrix, &config);

    let result = validator.run(&config, &mut StdRng::seed_from_u64(0));
    assert!(matches!(result, Err(EvaluationError::InvalidConfiguration(_))));
}

#[test]
fn test_report_serializes() {
    let matrix = create_consensus_matrix();
    let validator = CrossValidator::new(Predictor::new(SimilarityEngine::new(&matrix)));
    let report = validator
        .cross_validate(
            &[Measure::Euclidean],
            &[FeatureSpace::RawRatings],
            SamplePercent::new(40.0).unwrap(),
            &mut StdRng::seed_from_u64(8),
        )
        .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["held_out"], 8);
    assert_eq!(json["outcomes"][0]["strategy"]["measure"], "Euclidean");
    assert_eq!(json["outcomes"][0]["strategy"]["space"], "RawRatings");
}
