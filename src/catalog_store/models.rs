//! Catalog entity models.
//!
//! Rows are identified by integer rowids wrapped in per-entity newtypes so a
//! song id can never be passed where an album id is expected.

use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

macro_rules! row_id {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                self.0.to_sql()
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                i64::column_result(value).map($name)
            }
        }
    };
}

row_id!(ArtistId);
row_id!(GenreId);
row_id!(AlbumId);
row_id!(SongId);
row_id!(UserId);

/// Lowest and highest accepted rating values.
pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

pub fn is_valid_rating(value: i64) -> bool {
    (MIN_RATING..=MAX_RATING).contains(&value)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Artist {
    pub id: ArtistId,
    /// Spelling of the first reference that created the row.
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Album {
    pub id: AlbumId,
    pub title: String,
    pub release_date: NaiveDate,
    pub artist_id: ArtistId,
    pub genre_id: GenreId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Song {
    pub id: SongId,
    pub title: String,
    pub release_date: NaiveDate,
    pub artist_id: ArtistId,
    /// `None` for singles.
    pub album_id: Option<AlbumId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

/// Row counts for every catalog table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CatalogCounts {
    pub artists: usize,
    pub genres: usize,
    pub albums: usize,
    pub songs: usize,
    pub song_genres: usize,
    pub song_artists: usize,
    pub users: usize,
    pub ratings: usize,
}

impl CatalogCounts {
    pub fn is_empty(&self) -> bool {
        *self == CatalogCounts::default()
    }
}
