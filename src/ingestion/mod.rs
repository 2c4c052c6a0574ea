mod models;
mod service;

pub use models::{AlbumKey, AlbumRelease, RatingKey, SingleSong, SongKey, SongRating};
pub use service::{
    ingest_album, ingest_rating, ingest_single, ingest_user, AlbumTracks, IngestionService,
};
