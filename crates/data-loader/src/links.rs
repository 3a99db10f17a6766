//! Translation from external catalog IDs (IMDb, TMDb) to MovieLens IDs.
//!
//! The engine only ever works with MovieLens IDs; this table sits in front
//! of it for users who would rather type `tt0114709` than `1`.

use crate::error::{DataLoadError, Result};
use crate::parser::{self, LinkRow};
use crate::types::MovieId;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// Which catalog a user-supplied movie ID comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdSpace {
    #[default]
    MovieLens,
    Imdb,
    Tmdb,
}

/// Lookup tables built from links.csv
#[derive(Debug, Default)]
pub struct LinkTable {
    by_imdb: HashMap<u32, MovieId>,
    by_tmdb: HashMap<u32, MovieId>,
}

impl LinkTable {
    /// Build the lookup tables from parsed rows
    pub fn from_rows(rows: impl IntoIterator<Item = LinkRow>) -> Self {
        let mut table = LinkTable::default();
        for row in rows {
            table.by_imdb.insert(row.imdb_id, row.movie_id);
            if let Some(tmdb_id) = row.tmdb_id {
                table.by_tmdb.insert(tmdb_id, row.movie_id);
            }
        }
        table
    }

    /// Load `links.csv` from a MovieLens directory
    pub fn load(data_dir: &Path) -> Result<Self> {
        let rows = parser::parse_links(&data_dir.join("links.csv"))?;
        Ok(Self::from_rows(rows))
    }

    /// Look up one external ID
    pub fn lookup(&self, id: u32, space: IdSpace) -> Option<MovieId> {
        match space {
            IdSpace::MovieLens => Some(id),
            IdSpace::Imdb => self.by_imdb.get(&id).copied(),
            IdSpace::Tmdb => self.by_tmdb.get(&id).copied(),
        }
    }

    /// Translate user-supplied IDs into MovieLens IDs
    ///
    /// IMDb IDs may carry the `tt` prefix and leading zeros. IDs that parse
    /// but have no MovieLens counterpart are logged and skipped; IDs that
    /// don't parse at all are an error.
    pub fn resolve(&self, ids: &[String], space: IdSpace) -> Result<Vec<MovieId>> {
        let mut resolved = Vec::with_capacity(ids.len());
        for raw in ids {
            let id = parse_external_id(raw, space)?;
            match self.lookup(id, space) {
                Some(movie_id) => resolved.push(movie_id),
                None => warn!("No MovieLens movie for {:?} ID {}", space, raw),
            }
        }
        Ok(resolved)
    }
}

/// Parse an external ID string into its numeric form
pub fn parse_external_id(raw: &str, space: IdSpace) -> Result<u32> {
    let trimmed = raw.trim();
    let digits = match space {
        IdSpace::Imdb => trimmed.strip_prefix("tt").unwrap_or(trimmed),
        IdSpace::MovieLens | IdSpace::Tmdb => trimmed,
    };
    digits.parse().map_err(|_| DataLoadError::InvalidValue {
        field: format!("{:?} movie id", space),
        value: raw.to_string(),
    })
}
