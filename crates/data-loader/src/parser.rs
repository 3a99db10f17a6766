//! Parser for MovieLens CSV files.
//!
//! This module handles the three files of the `ml-latest` / `ml-latest-small`
//! releases:
//! - ratings.csv: userId,movieId,rating,timestamp
//! - movies.csv:  movieId,title,genres (titles may be quoted and contain commas)
//! - links.csv:   movieId,imdbId,tmdbId (tmdbId is sometimes empty)
//!
//! Each file starts with a header row. Rows are deserialized with `csv` +
//! `serde`; any row that doesn't fit the expected shape becomes a
//! `MalformedRecord` carrying the file name and line number.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RatingRow {
    #[serde(rename = "userId")]
    user_id: UserId,
    #[serde(rename = "movieId")]
    movie_id: MovieId,
    rating: f32,
    #[allow(dead_code)]
    timestamp: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct MovieRow {
    #[serde(rename = "movieId")]
    movie_id: MovieId,
    title: String,
    genres: String,
}

/// A row of links.csv
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LinkRow {
    #[serde(rename = "movieId")]
    pub movie_id: MovieId,
    #[serde(rename = "imdbId")]
    pub imdb_id: u32,
    #[serde(rename = "tmdbId")]
    pub tmdb_id: Option<u32>,
}

/// Open a file, turning "not found" into a friendlier error
fn open(path: &Path) -> Result<std::fs::File> {
    std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DataLoadError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => DataLoadError::IoError(e),
    })
}

/// Deserialize every data row of a headed CSV stream
fn read_rows<T, R>(reader: R, file: &str) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    reader
        .deserialize()
        .map(|row| row.map_err(|e| DataLoadError::from_csv(file, e)))
        .collect()
}

/// Split "Adventure|Animation|Children" into a genre set
///
/// Empty segments are dropped; "(no genres listed)" is kept as a tag.
pub fn parse_genres(s: &str) -> BTreeSet<Genre> {
    s.split('|')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse ratings from any reader (header row required)
pub fn parse_ratings_from<R: Read>(reader: R) -> Result<Vec<RatingRecord>> {
    let rows: Vec<RatingRow> = read_rows(reader, "ratings.csv")?;
    Ok(rows
        .into_iter()
        .map(|row| RatingRecord {
            user_id: row.user_id,
            movie_id: row.movie_id,
            rating: row.rating,
        })
        .collect())
}

/// Parse movies from any reader (header row required)
pub fn parse_movies_from<R: Read>(reader: R) -> Result<Vec<MovieRecord>> {
    let rows: Vec<MovieRow> = read_rows(reader, "movies.csv")?;
    Ok(rows
        .into_iter()
        .map(|row| MovieRecord {
            movie_id: row.movie_id,
            genres: parse_genres(&row.genres),
            title: row.title,
        })
        .collect())
}

/// Parse links from any reader (header row required)
pub fn parse_links_from<R: Read>(reader: R) -> Result<Vec<LinkRow>> {
    read_rows(reader, "links.csv")
}

/// Parse the ratings.csv file
pub fn parse_ratings(path: &Path) -> Result<Vec<RatingRecord>> {
    parse_ratings_from(open(path)?)
}

/// Parse the movies.csv file
pub fn parse_movies(path: &Path) -> Result<Vec<MovieRecord>> {
    parse_movies_from(open(path)?)
}

/// Parse the links.csv file
pub fn parse_links(path: &Path) -> Result<Vec<LinkRow>> {
    parse_links_from(open(path)?)
}
