//! # Predictor Crate
//!
//! Predicts a user's rating of a movie from the ratings of similar users.
//!
//! ## Components
//!
//! - **predictor**: Neighbour selection and weighted aggregation
//! - **error**: `NoNeighbors` / `UnknownUser`
//!
//! ## Example Usage
//!
//! ```ignore
//! use predictor::{Predictor, PredictError};
//! use similarity::{FeatureSpace, Measure, SimilarityEngine};
//!
//! let predictor = Predictor::new(SimilarityEngine::new(&matrix));
//! match predictor.predict(1, 1, Measure::Pearson, FeatureSpace::RawRatings) {
//!     Ok(prediction) => println!("{:.2}", prediction.rating),
//!     Err(PredictError::NoNeighbors { .. }) => println!("unable to predict"),
//!     Err(e) => return Err(e.into()),
//! }
//! ```

pub mod error;
pub mod predictor;

pub use error::{PredictError, Result};
pub use predictor::{Aggregation, Neighbor, Prediction, Predictor, weighted_average};
