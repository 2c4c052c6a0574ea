//! Ingestion input descriptors and rejection keys.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A song released on its own, outside any album.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleSong {
    pub title: String,
    /// Must not be empty.
    pub genres: Vec<String>,
    pub artist: String,
    pub release_date: NaiveDate,
}

impl SingleSong {
    pub fn new<G, S>(title: &str, genres: G, artist: &str, release_date: NaiveDate) -> Self
    where
        G: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SingleSong {
            title: title.to_string(),
            genres: genres.into_iter().map(Into::into).collect(),
            artist: artist.to_string(),
            release_date,
        }
    }

    pub fn key(&self) -> SongKey {
        SongKey {
            title: self.title.clone(),
            artist: self.artist.clone(),
        }
    }
}

/// An album with its track titles. Every track gets the album's genre and
/// release date.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumRelease {
    pub title: String,
    pub genre: String,
    pub artist: String,
    pub release_date: NaiveDate,
    pub tracks: Vec<String>,
}

impl AlbumRelease {
    pub fn new<T, S>(
        title: &str,
        genre: &str,
        artist: &str,
        release_date: NaiveDate,
        tracks: T,
    ) -> Self
    where
        T: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AlbumRelease {
            title: title.to_string(),
            genre: genre.to_string(),
            artist: artist.to_string(),
            release_date,
            tracks: tracks.into_iter().map(Into::into).collect(),
        }
    }

    pub fn key(&self) -> AlbumKey {
        AlbumKey {
            title: self.title.clone(),
            artist: self.artist.clone(),
        }
    }
}

/// A user's rating of the song `title` by `artist`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongRating {
    pub username: String,
    pub artist: String,
    pub title: String,
    pub rating: i64,
    pub rating_date: NaiveDate,
}

impl SongRating {
    pub fn new(
        username: &str,
        artist: &str,
        title: &str,
        rating: i64,
        rating_date: NaiveDate,
    ) -> Self {
        SongRating {
            username: username.to_string(),
            artist: artist.to_string(),
            title: title.to_string(),
            rating,
            rating_date,
        }
    }

    pub fn key(&self) -> RatingKey {
        RatingKey {
            username: self.username.clone(),
            artist: self.artist.clone(),
            title: self.title.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SongKey {
    pub title: String,
    pub artist: String,
}

impl SongKey {
    pub fn new(title: &str, artist: &str) -> Self {
        SongKey {
            title: title.to_string(),
            artist: artist.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct AlbumKey {
    pub title: String,
    pub artist: String,
}

impl AlbumKey {
    pub fn new(title: &str, artist: &str) -> Self {
        AlbumKey {
            title: title.to_string(),
            artist: artist.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RatingKey {
    pub username: String,
    pub artist: String,
    pub title: String,
}

impl RatingKey {
    pub fn new(username: &str, artist: &str, title: &str) -> Self {
        RatingKey {
            username: username.to_string(),
            artist: artist.to_string(),
            title: title.to_string(),
        }
    }
}
