//! CatalogStore trait definition.
//!
//! The trait is the only way ingestion touches the catalog. Every uniqueness
//! and reference rule is checked behind it.

use super::error::CatalogResult;
use super::models::*;
use chrono::NaiveDate;

pub trait CatalogStore {
    // =========================================================================
    // Insert-if-absent
    // =========================================================================

    /// Returns the artist with the given name, creating it if needed.
    fn ensure_artist(&self, name: &str) -> CatalogResult<Artist>;

    /// Returns the genre with the given name, creating it if needed.
    fn ensure_genre(&self, name: &str) -> CatalogResult<Genre>;

    // =========================================================================
    // Lookups (no side effects)
    // =========================================================================

    fn find_artist(&self, name: &str) -> CatalogResult<Option<Artist>>;

    /// Finds a song, single or album track, by title and artist name.
    fn find_song(&self, title: &str, artist: &str) -> CatalogResult<Option<Song>>;

    fn find_album(&self, title: &str, artist: &str) -> CatalogResult<Option<Album>>;

    fn find_user(&self, username: &str) -> CatalogResult<Option<User>>;

    fn user_exists(&self, username: &str) -> CatalogResult<bool> {
        Ok(self.find_user(username)?.is_some())
    }

    /// Whether `username` already rated the song.
    fn has_rated(&self, username: &str, song_id: SongId) -> CatalogResult<bool>;

    // =========================================================================
    // Inserts
    // =========================================================================

    /// Inserts a song owned by an existing artist.
    ///
    /// Fails with `DuplicateKey` if the artist already has a song with this
    /// title, whether single or album track, and with `NotFound` if the
    /// artist does not exist.
    fn insert_song(
        &self,
        title: &str,
        release_date: NaiveDate,
        artist: &str,
        album_id: Option<AlbumId>,
    ) -> CatalogResult<Song>;

    /// Inserts an album. Fails with `DuplicateKey` if the artist already has an
    /// album with this title, `NotFound` if the artist or genre is missing.
    fn insert_album(
        &self,
        title: &str,
        release_date: NaiveDate,
        artist: &str,
        genre: &str,
    ) -> CatalogResult<Album>;

    /// Fails with `DuplicateKey` if the username is taken, ignoring case.
    fn insert_user(&self, username: &str) -> CatalogResult<User>;

    /// Idempotent.
    fn link_song_genre(&self, song_id: SongId, genre_id: GenreId) -> CatalogResult<()>;

    /// Idempotent.
    fn link_song_artist(&self, song_id: SongId, artist_id: ArtistId) -> CatalogResult<()>;

    /// Fails with `OutOfRange` for values outside [1, 5], `NotFound` for an
    /// unknown user or song and `DuplicateKey` if the user already rated it.
    fn insert_rating(
        &self,
        username: &str,
        song_id: SongId,
        value: i64,
        rating_date: NaiveDate,
    ) -> CatalogResult<()>;

    // =========================================================================
    // Reset
    // =========================================================================

    /// Deletes every row of every table, children first.
    fn clear_all(&self) -> CatalogResult<()>;

    // =========================================================================
    // Counts
    // =========================================================================

    fn counts(&self) -> CatalogResult<CatalogCounts>;
}
