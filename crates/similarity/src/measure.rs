//! Similarity measures over paired feature vectors.
//!
//! Every measure takes the same input: a slice of `(ours, theirs)` pairs,
//! already aligned by the caller (co-rated movies, or genre positions).
//! Selection is a plain enum dispatching to a table of pure functions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A side whose centred sum of squares is below this fraction of its raw
/// sum of squares is treated as constant
const RELATIVE_VARIANCE_EPSILON: f64 = 1e-12;

/// How two users are compared
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Measure {
    /// Pearson correlation of mean-centred vectors
    #[default]
    Pearson,
    /// Cosine of the angle between the raw vectors
    Cosine,
    /// Euclidean distance, turned into a weight with `1 / (1 + d)`
    Euclidean,
}

impl Measure {
    /// Every supported measure, in reporting order
    pub const ALL: [Measure; 3] = [Measure::Pearson, Measure::Cosine, Measure::Euclidean];

    pub fn name(self) -> &'static str {
        match self {
            Measure::Pearson => "pearson",
            Measure::Cosine => "cosine",
            Measure::Euclidean => "euclidean",
        }
    }

    /// Score a set of aligned value pairs under this measure
    pub fn score(self, pairs: &[(f64, f64)]) -> Similarity {
        let score: fn(&[(f64, f64)]) -> Similarity = match self {
            Measure::Pearson => pearson,
            Measure::Cosine => cosine,
            Measure::Euclidean => euclidean,
        };
        score(pairs)
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Which vectors represent a user
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum FeatureSpace {
    /// Ratings, restricted to the movies both users rated
    #[default]
    RawRatings,
    /// TF-IDF weighted genre profiles over the whole genre universe
    GenreFrequency,
}

impl FeatureSpace {
    pub fn name(self) -> &'static str {
        match self {
            FeatureSpace::RawRatings => "ratings",
            FeatureSpace::GenreFrequency => "genres",
        }
    }
}

impl fmt::Display for FeatureSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Result of comparing two users
///
/// `Undefined` covers every case where the measure has no meaningful value
/// (nothing in common, zero variance, zero magnitude). It is an expected
/// outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Similarity {
    Defined(f64),
    Undefined,
}

impl Similarity {
    fn from_value(value: f64) -> Self {
        if value.is_finite() {
            Similarity::Defined(value)
        } else {
            Similarity::Undefined
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Similarity::Defined(value) => Some(value),
            Similarity::Undefined => None,
        }
    }

    pub fn is_defined(self) -> bool {
        matches!(self, Similarity::Defined(_))
    }

    /// The score as a neighbour weight: only strictly positive scores qualify
    pub fn weight(self) -> Option<f64> {
        self.value().filter(|&w| w > 0.0)
    }
}

/// Pearson correlation coefficient
///
/// Both sides are centred on their own mean over the given pairs.
/// `Undefined` for no pairs or when either side is constant.
pub fn pearson(pairs: &[(f64, f64)]) -> Similarity {
    if pairs.is_empty() {
        return Similarity::Undefined;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|&(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|&(_, y)| y).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    let (mut norm_x, mut norm_y) = (0.0, 0.0);
    for &(x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
        norm_x += x * x;
        norm_y += y * y;
    }
    // Relative, so the check does not depend on the scale of the values
    if sxx <= RELATIVE_VARIANCE_EPSILON * norm_x || syy <= RELATIVE_VARIANCE_EPSILON * norm_y {
        return Similarity::Undefined;
    }
    Similarity::from_value((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Cosine similarity of the raw (not centred) vectors
///
/// `Undefined` for no pairs or when either vector has zero magnitude.
pub fn cosine(pairs: &[(f64, f64)]) -> Similarity {
    let (mut dot, mut norm_x, mut norm_y) = (0.0, 0.0, 0.0);
    for &(x, y) in pairs {
        dot += x * y;
        norm_x += x * x;
        norm_y += y * y;
    }
    if norm_x == 0.0 || norm_y == 0.0 {
        return Similarity::Undefined;
    }
    Similarity::from_value((dot / (norm_x.sqrt() * norm_y.sqrt())).clamp(-1.0, 1.0))
}

/// Euclidean distance between the two vectors, `None` for no pairs
pub fn euclidean_distance(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.is_empty() {
        return None;
    }
    Some(
        pairs
            .iter()
            .map(|&(x, y)| (x - y) * (x - y))
            .sum::<f64>()
            .sqrt(),
    )
}

/// Turn a distance into a similarity weight in (0, 1]
///
/// Raw distance ranks neighbours backwards (smaller is closer), so it is
/// mapped through `1 / (1 + d)`: distance 0 gives weight 1 and the weight
/// strictly decreases as the distance grows.
pub fn euclidean_weight(distance: f64) -> f64 {
    1.0 / (1.0 + distance)
}

/// Euclidean distance expressed as a similarity weight
pub fn euclidean(pairs: &[(f64, f64)]) -> Similarity {
    match euclidean_distance(pairs) {
        Some(distance) => Similarity::from_value(euclidean_weight(distance)),
        None => Similarity::Undefined,
    }
}
