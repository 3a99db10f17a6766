//! # Evaluation Crate
//!
//! Measures how well each similarity measure predicts held-out ratings.
//!
//! ## Components
//!
//! - **config**: `RunConfig`, `SamplePercent` and measure-flag validation
//! - **cross_validation**: Leave-one-out RMSE over a sample of users
//! - **error**: `InvalidConfiguration`
//!
//! ## Example Usage
//!
//! ```ignore
//! use evaluation::{CrossValidator, RunConfig};
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let config = RunConfig::default().with_seed(Some(42));
//! let validator = CrossValidator::from_config(&matrix, &config);
//! let report = validator.run(&config, &mut StdRng::seed_from_u64(42))?;
//! for outcome in &report.outcomes {
//!     println!("{}: {:?}", outcome.strategy, outcome.rmse);
//! }
//! ```

pub mod config;
pub mod cross_validation;
pub mod error;

pub use config::{RunConfig, SamplePercent, measure_from_flags};
pub use cross_validation::{
    CrossValidationReport, CrossValidator, Strategy, StrategyOutcome, sample_users,
};
pub use error::{EvaluationError, Result};
