mod models;
mod service;

pub use models::{ArtistSingleCount, GenreSongCount, SongRatingCount, UserEngagement, YearRange};
pub use service::QueryService;
