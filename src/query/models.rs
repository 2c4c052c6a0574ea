use serde::{Deserialize, Serialize};

/// Inclusive range of calendar years. A range whose start is after its end
/// matches nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Self {
        YearRange { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ArtistSingleCount {
    pub artist: String,
    pub singles: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GenreSongCount {
    pub genre: String,
    pub songs: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SongRatingCount {
    pub title: String,
    pub artist: String,
    /// Number of ratings received, not their value.
    pub ratings: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserEngagement {
    pub username: String,
    pub ratings: usize,
}
