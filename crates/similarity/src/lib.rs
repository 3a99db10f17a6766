//! # Similarity Crate
//!
//! Pairwise user similarity for collaborative filtering.
//!
//! ## Components
//!
//! ### Measures
//! Pure functions over aligned value pairs:
//! - Pearson correlation (mean-centred)
//! - Cosine similarity (raw vectors)
//! - Euclidean distance, mapped to a weight with `1 / (1 + d)`
//!
//! ### Feature spaces
//! - Raw ratings: both users' ratings restricted to the movies they co-rated
//! - Genre frequency: TF-IDF weighted genre profiles over the genre universe
//!
//! ## Example Usage
//!
//! ```ignore
//! use similarity::{FeatureSpace, Measure, SimilarityEngine};
//!
//! let engine = SimilarityEngine::new(&matrix);
//! match engine.similarity(1, 2, Measure::Pearson, FeatureSpace::RawRatings) {
//!     Similarity::Defined(r) => println!("r = {:.3}", r),
//!     Similarity::Undefined => println!("nothing to compare"),
//! }
//! ```

pub mod engine;
pub mod genre;
pub mod measure;

pub use engine::{SimilarityEngine, UserVector};
pub use genre::{GenreModel, GenreProfile, GenreWeighting, InverseDocumentFrequency, TermFrequency};
pub use measure::{FeatureSpace, Measure, Similarity, euclidean_weight};
