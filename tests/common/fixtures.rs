//! Stores and catalog contents shared by the integration tests.

use super::constants::*;
use chrono::NaiveDate;
use music_catalog::ingestion::{AlbumRelease, SingleSong, SongRating};
use music_catalog::{IngestionService, QueryService, SqliteCatalogStore};
use std::path::PathBuf;
use tempfile::TempDir;

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// A file-backed catalog living in its own temp directory.
pub struct TestCatalog {
    pub store: SqliteCatalogStore,
    pub ingestion: IngestionService,
    pub queries: QueryService,
    pub db_path: PathBuf,
    // Keeps the directory alive for as long as the catalog.
    _temp_dir: TempDir,
}

impl TestCatalog {
    /// Opens a second handle on the same database file.
    #[allow(dead_code)]
    pub fn reopen(&self) -> SqliteCatalogStore {
        SqliteCatalogStore::new(&self.db_path).unwrap()
    }
}

pub fn temp_catalog() -> TestCatalog {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("catalog.db");
    let store = SqliteCatalogStore::new(&db_path).unwrap();
    TestCatalog {
        ingestion: IngestionService::new(store.clone()),
        queries: QueryService::new(store.clone()),
        store,
        db_path,
        _temp_dir: temp_dir,
    }
}

/// Catalog with a few singles, one album, three users and some ratings.
///
/// Singles: Adele 2012 and 2015, Sia 2014 and 2016, Ed Sheeran 2021 (Pop and
/// Electronic). Album: "Divide" by Ed Sheeran, 2017, Folk, three tracks.
/// Ratings: Hello x2 (2020), Chandelier x2 (2019, 2021), Perfect x1 (2020).
#[allow(dead_code)]
pub fn seeded_catalog() -> TestCatalog {
    let catalog = temp_catalog();
    let rejected = catalog
        .ingestion
        .load_single_songs(&[
            SingleSong::new("Hello", ["Pop"], ADELE, date("2015-10-01")),
            SingleSong::new("Skyfall", ["Pop"], ADELE, date("2012-10-01")),
            SingleSong::new("Chandelier", ["Pop"], SIA, date("2014-03-17")),
            SingleSong::new("Unstoppable", ["Pop"], SIA, date("2016-01-21")),
            SingleSong::new("Bad Habits", ["Pop", "Electronic"], ED_SHEERAN, date("2021-06-25")),
        ])
        .unwrap();
    assert!(rejected.is_empty());

    let rejected = catalog
        .ingestion
        .load_albums(&[AlbumRelease::new(
            "Divide",
            "Folk",
            ED_SHEERAN,
            date("2017-03-03"),
            ["Castle on the Hill", "Perfect", "Galway Girl"],
        )])
        .unwrap();
    assert!(rejected.is_empty());

    let rejected = catalog
        .ingestion
        .load_users(&[USER_ALICE, USER_BOB, USER_CAROL])
        .unwrap();
    assert!(rejected.is_empty());

    let rejected = catalog
        .ingestion
        .load_song_ratings(&[
            SongRating::new(USER_ALICE, ADELE, "Hello", 5, date("2020-01-01")),
            SongRating::new(USER_BOB, ADELE, "Hello", 4, date("2020-02-01")),
            SongRating::new(USER_CAROL, SIA, "Chandelier", 3, date("2021-02-01")),
            SongRating::new(USER_ALICE, SIA, "Chandelier", 2, date("2019-05-05")),
            SongRating::new(USER_BOB, ED_SHEERAN, "Perfect", 5, date("2020-07-07")),
        ])
        .unwrap();
    assert!(rejected.is_empty());

    catalog
}
