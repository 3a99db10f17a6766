//! Run configuration, validated before any computation starts.

use crate::cross_validation::Strategy;
use crate::error::{EvaluationError, Result};
use predictor::Aggregation;
use serde::Serialize;
use similarity::{FeatureSpace, GenreWeighting, Measure};

/// Share of users to sample for cross-validation, in (0, 100]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct SamplePercent(f64);

impl SamplePercent {
    pub const DEFAULT: f64 = 10.0;

    pub fn new(percent: f64) -> Result<Self> {
        if percent.is_finite() && percent > 0.0 && percent <= 100.0 {
            Ok(Self(percent))
        } else {
            Err(EvaluationError::InvalidConfiguration(format!(
                "sample percent must be in (0, 100], got {}",
                percent
            )))
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }

    /// Number of users to sample out of `total`
    ///
    /// `round(percent / 100 * total)`, never less than one user unless
    /// there are none at all.
    pub fn sample_size(self, total: usize) -> usize {
        let size = (self.0 / 100.0 * total as f64).round() as usize;
        size.max(1).min(total)
    }
}

impl Default for SamplePercent {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<f64> for SamplePercent {
    type Error = EvaluationError;

    fn try_from(percent: f64) -> Result<Self> {
        Self::new(percent)
    }
}

/// Pick the single measure selected by mutually exclusive flags
///
/// No flag means Pearson.
pub fn measure_from_flags(pearson: bool, cosine: bool, euclidean: bool) -> Result<Measure> {
    let selected: Vec<Measure> = [
        (pearson, Measure::Pearson),
        (cosine, Measure::Cosine),
        (euclidean, Measure::Euclidean),
    ]
    .into_iter()
    .filter_map(|(set, measure)| set.then_some(measure))
    .collect();

    match selected.as_slice() {
        [] => Ok(Measure::default()),
        [measure] => Ok(*measure),
        _ => Err(EvaluationError::InvalidConfiguration(format!(
            "measures are mutually exclusive, got {}",
            selected
                .iter()
                .map(|m| m.name())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

/// Everything a cross-validation run needs besides the data and the RNG
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunConfig {
    pub measures: Vec<Measure>,
    pub feature_spaces: Vec<FeatureSpace>,
    pub aggregation: Aggregation,
    pub genre_weighting: GenreWeighting,
    pub sample_percent: SamplePercent,
    /// `None` seeds from the OS, so runs vary
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            measures: Measure::ALL.to_vec(),
            feature_spaces: vec![FeatureSpace::RawRatings],
            aggregation: Aggregation::default(),
            genre_weighting: GenreWeighting::default(),
            sample_percent: SamplePercent::default(),
            seed: None,
        }
    }
}

impl RunConfig {
    pub fn with_sample_percent(mut self, sample_percent: SamplePercent) -> Self {
        self.sample_percent = sample_percent;
        self
    }

    pub fn with_feature_spaces(mut self, feature_spaces: Vec<FeatureSpace>) -> Self {
        self.feature_spaces = feature_spaces;
        self
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_genre_weighting(mut self, genre_weighting: GenreWeighting) -> Self {
        self.genre_weighting = genre_weighting;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.measures.is_empty() {
            return Err(EvaluationError::InvalidConfiguration(
                "at least one measure is required".to_string(),
            ));
        }
        if self.feature_spaces.is_empty() {
            return Err(EvaluationError::InvalidConfiguration(
                "at least one feature space is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Every measure in every feature space, grouped by feature space
    pub fn strategies(&self) -> Vec<Strategy> {
        Strategy::grid(&self.measures, &self.feature_spaces)
    }
}
