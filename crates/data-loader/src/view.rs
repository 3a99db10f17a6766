//! Read-only views over a `RatingMatrix`.
//!
//! Cross-validation needs "the matrix minus one rating" thousands of times.
//! Instead of cloning or mutating the shared matrix, a `RatingView` carries
//! the single held-out (user, movie) pair and filters it out of every lookup.

use crate::types::{Genre, MovieId, RatingMatrix, UserId};
use std::collections::{BTreeSet, HashMap};

/// The matrix as seen with at most one rating hidden
#[derive(Debug, Clone, Copy)]
pub struct RatingView<'a> {
    matrix: &'a RatingMatrix,
    held_out: Option<(UserId, MovieId)>,
}

impl RatingMatrix {
    /// View with every rating visible
    pub fn view(&self) -> RatingView<'_> {
        RatingView {
            matrix: self,
            held_out: None,
        }
    }

    /// View that hides the rating `user_id` gave `movie_id`
    pub fn without(&self, user_id: UserId, movie_id: MovieId) -> RatingView<'_> {
        RatingView {
            matrix: self,
            held_out: Some((user_id, movie_id)),
        }
    }
}

impl<'a> RatingView<'a> {
    /// The underlying matrix
    pub fn matrix(&self) -> &'a RatingMatrix {
        self.matrix
    }

    /// The hidden (user, movie) pair, if any
    pub fn held_out(&self) -> Option<(UserId, MovieId)> {
        self.held_out
    }

    /// A user's visible ratings, or `None` for a user absent from the matrix
    pub fn user(&self, user_id: UserId) -> Option<UserRatings<'a>> {
        let ratings = self.matrix.user_ratings(user_id)?;
        let excluded = match self.held_out {
            Some((held_user, movie_id)) if held_user == user_id => Some(movie_id),
            _ => None,
        };
        Some(UserRatings {
            ratings,
            excluded,
        })
    }

    /// Visible rating of (user, movie)
    pub fn rating(&self, user_id: UserId, movie_id: MovieId) -> Option<f32> {
        if self.held_out == Some((user_id, movie_id)) {
            return None;
        }
        self.matrix.rating(user_id, movie_id)
    }

    /// Users with a visible rating for `movie_id`, sorted ascending
    pub fn raters(&self, movie_id: MovieId) -> Vec<UserId> {
        let mut raters: Vec<UserId> = self
            .matrix
            .raters(movie_id)
            .into_iter()
            .flatten()
            .copied()
            .filter(|&user_id| self.held_out != Some((user_id, movie_id)))
            .collect();
        raters.sort_unstable();
        raters
    }

    /// Genre set of a movie (genres are never held out)
    pub fn genres(&self, movie_id: MovieId) -> &'a BTreeSet<Genre> {
        self.matrix.genres(movie_id)
    }
}

/// One user's ratings with the held-out movie (if it is theirs) filtered out
#[derive(Debug, Clone, Copy)]
pub struct UserRatings<'a> {
    ratings: &'a HashMap<MovieId, f32>,
    excluded: Option<MovieId>,
}

impl<'a> UserRatings<'a> {
    /// Rating for a movie, unless missing or held out
    pub fn get(&self, movie_id: MovieId) -> Option<f32> {
        if self.excluded == Some(movie_id) {
            return None;
        }
        self.ratings.get(&movie_id).copied()
    }

    /// Iterate (movie, rating) pairs in hash order
    pub fn iter(&self) -> impl Iterator<Item = (MovieId, f32)> + 'a {
        let excluded = self.excluded;
        self.ratings
            .iter()
            .filter(move |(movie_id, _)| Some(**movie_id) != excluded)
            .map(|(&movie_id, &rating)| (movie_id, rating))
    }

    pub fn len(&self) -> usize {
        match self.excluded {
            Some(movie_id) if self.ratings.contains_key(&movie_id) => self.ratings.len() - 1,
            _ => self.ratings.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mean visible rating, `None` when nothing is visible
    pub fn mean(&self) -> Option<f64> {
        let count = self.len();
        if count == 0 {
            return None;
        }
        let total: f64 = self.iter().map(|(_, rating)| f64::from(rating)).sum();
        Some(total / count as f64)
    }

    /// Ratings both users gave, as (movie, ours, theirs), sorted by movie ID
    ///
    /// Sorting keeps every downstream floating-point sum independent of
    /// hash iteration order.
    pub fn co_rated(&self, other: &UserRatings<'a>) -> Vec<(MovieId, f32, f32)> {
        let (small, large, swapped) = if self.len() <= other.len() {
            (self, other, false)
        } else {
            (other, self, true)
        };
        let mut pairs: Vec<(MovieId, f32, f32)> = small
            .iter()
            .filter_map(|(movie_id, rating)| {
                let theirs = large.get(movie_id)?;
                Some(if swapped {
                    (movie_id, theirs, rating)
                } else {
                    (movie_id, rating, theirs)
                })
            })
            .collect();
        pairs.sort_unstable_by_key(|&(movie_id, _, _)| movie_id);
        pairs
    }
}
