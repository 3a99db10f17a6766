//! # Data Loader Crate
//!
//! This crate loads MovieLens rating data into an immutable `RatingMatrix`.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (UserId, MovieId, Movie, RatingMatrix)
//! - **view**: Read-only views that hide a single held-out rating
//! - **parser**: Parse the CSV files into records
//! - **index**: Validate records and build the matrix
//! - **links**: Translate IMDb / TMDb IDs into MovieLens IDs
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::{RatingMatrix, ReferencePolicy};
//! use std::path::Path;
//!
//! let matrix = RatingMatrix::load_from_files(Path::new("ml-latest-small"), ReferencePolicy::Strict)?;
//!
//! // Everything visible
//! let rating = matrix.view().rating(1, 1);
//!
//! // Same matrix, with user 1's rating of movie 1 hidden
//! let held_out = matrix.without(1, 1);
//! assert!(held_out.rating(1, 1).is_none());
//! ```

// Public modules
pub mod error;
pub mod types;
pub mod view;
pub mod parser;
pub mod index;
pub mod links;

// Re-export commonly used types for convenience
pub use error::{DataLoadError, Result};
pub use links::{IdSpace, LinkTable};
pub use types::{
    // Type aliases
    UserId,
    MovieId,
    Genre,
    // Core types
    Movie,
    MovieRecord,
    RatingRecord,
    RatingMatrix,
    ReferencePolicy,
    // Constants
    MAX_RATING,
    MIN_RATING,
};
pub use view::{RatingView, UserRatings};
