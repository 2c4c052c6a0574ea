//! Batch loaders for singles, albums, users and ratings.
//!
//! Each load runs as one write transaction and each item inside it as one
//! savepoint: an item that breaks a business rule is rolled back and its key
//! lands in the returned rejection set, while the rest of the batch goes on.
//! Only a backing store failure aborts the batch, and then nothing of it is
//! kept.

use super::models::*;
use crate::catalog_store::{
    is_valid_rating, CatalogError, CatalogResult, CatalogStore, ItemOutcome, SqliteCatalog,
    SqliteCatalogStore,
};
use std::collections::BTreeSet;
use std::fmt::Debug;
use tracing::{debug, info, warn};

/// Tracks inserted and skipped when loading one album, or summed over a
/// batch of albums.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AlbumTracks {
    pub inserted: usize,
    pub skipped: usize,
}

impl std::iter::Sum for AlbumTracks {
    fn sum<I: Iterator<Item = AlbumTracks>>(iter: I) -> Self {
        iter.fold(AlbumTracks::default(), |total, tracks| AlbumTracks {
            inserted: total.inserted + tracks.inserted,
            skipped: total.skipped + tracks.skipped,
        })
    }
}

pub fn ingest_single<C: CatalogStore + ?Sized>(
    catalog: &C,
    single: &SingleSong,
) -> CatalogResult<()> {
    if single.genres.is_empty() {
        return Err(CatalogError::not_found(
            "Genre",
            format!("(none given for {})", single.title),
        ));
    }

    let artist = catalog.ensure_artist(&single.artist)?;
    let genres = single
        .genres
        .iter()
        .map(|genre| catalog.ensure_genre(genre))
        .collect::<CatalogResult<Vec<_>>>()?;

    let song = catalog.insert_song(&single.title, single.release_date, &artist.name, None)?;
    for genre in &genres {
        catalog.link_song_genre(song.id, genre.id)?;
    }
    catalog.link_song_artist(song.id, artist.id)
}

/// Loads one album. A title the artist already used for an album rejects the
/// whole item; a track whose title the artist already used for any song is
/// skipped and the remaining tracks still go in.
pub fn ingest_album<C: CatalogStore + ?Sized>(
    catalog: &C,
    release: &AlbumRelease,
) -> CatalogResult<AlbumTracks> {
    let artist = catalog.ensure_artist(&release.artist)?;
    let genre = catalog.ensure_genre(&release.genre)?;
    if catalog.find_album(&release.title, &artist.name)?.is_some() {
        return Err(CatalogError::duplicate(
            "Album",
            format!("{} by {}", release.title, artist.name),
        ));
    }

    let album = catalog.insert_album(
        &release.title,
        release.release_date,
        &artist.name,
        &genre.name,
    )?;

    let mut tracks = AlbumTracks::default();
    for track in &release.tracks {
        match catalog.insert_song(track, release.release_date, &artist.name, Some(album.id)) {
            Ok(song) => {
                catalog.link_song_genre(song.id, genre.id)?;
                catalog.link_song_artist(song.id, artist.id)?;
                tracks.inserted += 1;
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(
                    "Skipping track {} of album {}: {}",
                    track, release.title, err
                );
                tracks.skipped += 1;
            }
        }
    }
    Ok(tracks)
}

pub fn ingest_user<C: CatalogStore + ?Sized>(catalog: &C, username: &str) -> CatalogResult<()> {
    catalog.insert_user(username).map(|_| ())
}

/// Checks, in order: rating range, user, song, previous rating by the same
/// user. The first failing check decides the rejection.
pub fn ingest_rating<C: CatalogStore + ?Sized>(
    catalog: &C,
    rating: &SongRating,
) -> CatalogResult<()> {
    if !is_valid_rating(rating.rating) {
        return Err(CatalogError::OutOfRange {
            value: rating.rating,
        });
    }
    if !catalog.user_exists(&rating.username)? {
        return Err(CatalogError::not_found("User", rating.username.as_str()));
    }
    let song = catalog
        .find_song(&rating.title, &rating.artist)?
        .ok_or_else(|| {
            CatalogError::not_found("Song", format!("{} by {}", rating.title, rating.artist))
        })?;
    if catalog.has_rated(&rating.username, song.id)? {
        return Err(CatalogError::duplicate(
            "Rating",
            format!("of {} by {}", song.title, rating.username),
        ));
    }
    catalog.insert_rating(&rating.username, song.id, rating.rating, rating.rating_date)
}

#[derive(Clone)]
pub struct IngestionService {
    store: SqliteCatalogStore,
}

impl IngestionService {
    pub fn new(store: SqliteCatalogStore) -> Self {
        Self { store }
    }

    /// Returns the (title, artist) of every rejected single.
    pub fn load_single_songs(&self, singles: &[SingleSong]) -> CatalogResult<BTreeSet<SongKey>> {
        let (rejected, _) =
            self.run_batch("singles", singles, SingleSong::key, |catalog, single| {
                ingest_single(catalog, single)
            })?;
        Ok(rejected)
    }

    /// Returns the (title, artist) of every album rejected as a whole. Skipped
    /// tracks are not reported.
    pub fn load_albums(&self, albums: &[AlbumRelease]) -> CatalogResult<BTreeSet<AlbumKey>> {
        let (rejected, _) = self.load_albums_with_tracks(albums)?;
        Ok(rejected)
    }

    /// Same as `load_albums`, also returning the tracks inserted and skipped
    /// over the accepted albums.
    pub fn load_albums_with_tracks(
        &self,
        albums: &[AlbumRelease],
    ) -> CatalogResult<(BTreeSet<AlbumKey>, AlbumTracks)> {
        let (rejected, accepted) =
            self.run_batch("albums", albums, AlbumRelease::key, |catalog, release| {
                ingest_album(catalog, release)
            })?;
        let tracks: AlbumTracks = accepted.into_iter().sum();
        info!(
            "Loaded album tracks: {} inserted, {} skipped",
            tracks.inserted, tracks.skipped
        );
        Ok((rejected, tracks))
    }

    /// Returns the usernames already taken, compared ignoring case.
    pub fn load_users<S: AsRef<str>>(&self, usernames: &[S]) -> CatalogResult<BTreeSet<String>> {
        let (rejected, _) = self.run_batch(
            "users",
            usernames,
            |username| username.as_ref().to_string(),
            |catalog, username| ingest_user(catalog, username.as_ref()),
        )?;
        Ok(rejected)
    }

    /// Returns the (username, artist, title) of every rejected rating,
    /// whatever the reason.
    pub fn load_song_ratings(&self, ratings: &[SongRating]) -> CatalogResult<BTreeSet<RatingKey>> {
        let (rejected, _) =
            self.run_batch("ratings", ratings, SongRating::key, |catalog, rating| {
                ingest_rating(catalog, rating)
            })?;
        Ok(rejected)
    }

    fn run_batch<I, K, T, KeyFn, IngestFn>(
        &self,
        kind: &str,
        items: &[I],
        key: KeyFn,
        ingest: IngestFn,
    ) -> CatalogResult<(BTreeSet<K>, Vec<T>)>
    where
        K: Ord + Debug,
        KeyFn: Fn(&I) -> K,
        IngestFn: Fn(&SqliteCatalog<'_>, &I) -> CatalogResult<T>,
    {
        let (accepted, rejected) = self.store.write(|batch| {
            let mut accepted = Vec::new();
            let mut rejected = BTreeSet::new();
            for item in items {
                match batch.item(|catalog| ingest(catalog, item))? {
                    ItemOutcome::Accepted(value) => accepted.push(value),
                    ItemOutcome::Rejected(reason) => {
                        let item_key = key(item);
                        debug!("Rejected {} item {:?}: {}", kind, item_key, reason);
                        rejected.insert(item_key);
                    }
                }
            }
            Ok((accepted, rejected))
        })?;

        info!(
            "Loaded {}: {} accepted, {} rejected",
            kind,
            accepted.len(),
            items.len() - accepted.len()
        );
        Ok((rejected, accepted))
    }
}
