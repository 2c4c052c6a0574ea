//! SQLite-backed catalog store.
//!
//! `SqliteCatalogStore` owns the connection; `SqliteCatalog` borrows it (or a
//! transaction/savepoint on it) and implements the `CatalogStore` primitives.

use super::error::{CatalogError, CatalogResult};
use super::models::*;
use super::schema::{CATALOG_VERSIONED_SCHEMAS, CLEAR_ORDER};
use super::trait_def::CatalogStore;
use crate::sqlite_persistence::{register_collations, BASE_DB_VERSION};
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Owning handle on a catalog database.
///
/// Clones share one connection. The mutex around it is held for the whole
/// duration of every read or write, so two operations never interleave.
#[derive(Clone)]
pub struct SqliteCatalogStore {
    conn: Arc<Mutex<Connection>>,
}

fn migrate_if_needed(conn: &mut Connection) -> Result<()> {
    let latest_version = CATALOG_VERSIONED_SCHEMAS.len() - 1;
    let latest_schema = &CATALOG_VERSIONED_SCHEMAS[latest_version];

    let table_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |r| r.get(0),
    )?;
    if table_count == 0 {
        info!("Creating catalog db schema at version {}", latest_version);
        latest_schema.create(conn)?;
        return Ok(());
    }

    let db_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    let db_version = db_version - BASE_DB_VERSION as i64;
    if db_version < 0 {
        bail!(
            "Database version {} is not a catalog database (base version {})",
            db_version + BASE_DB_VERSION as i64,
            BASE_DB_VERSION
        );
    }
    let mut current_version = db_version as usize;
    if current_version > latest_version {
        bail!(
            "Catalog db version {} is newer than the latest known version {}",
            current_version,
            latest_version
        );
    }

    if current_version < latest_version {
        let tx = conn.transaction()?;
        for schema in CATALOG_VERSIONED_SCHEMAS.iter().skip(current_version + 1) {
            if let Some(migration_fn) = schema.migration {
                info!(
                    "Migrating catalog db from version {} to {}",
                    current_version, schema.version
                );
                migration_fn(&tx)?;
            }
            current_version = schema.version;
        }
        tx.pragma_update(None, "user_version", (BASE_DB_VERSION + current_version) as i64)?;
        tx.commit()?;
    }

    latest_schema
        .validate(conn)
        .context("Catalog db does not match the expected schema")
}

impl SqliteCatalogStore {
    /// Opens (or creates) the catalog database at `db_path`.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        let conn = Connection::open_with_flags(
            db_path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open catalog database {:?}", db_path))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn)
    }

    /// A private, empty catalog that lives as long as the store.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory catalog")?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        register_collations(&conn).context("Failed to register catalog collations")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrate_if_needed(&mut conn)?;

        let counts = SqliteCatalog::new(&conn).counts()?;
        info!(
            "Opened catalog: {} artists, {} albums, {} songs, {} users, {} ratings",
            counts.artists, counts.albums, counts.songs, counts.users, counts.ratings
        );

        Ok(SqliteCatalogStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock leaves any open transaction rolled
        // back by its drop, so the connection itself is still usable.
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs `f` inside one immediate transaction.
    ///
    /// The transaction commits when `f` returns `Ok` and rolls back when it
    /// returns `Err`, so a failed call leaves nothing behind.
    pub fn write<T, F>(&self, f: F) -> CatalogResult<T>
    where
        F: FnOnce(&mut CatalogBatch<'_>) -> CatalogResult<T>,
    {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut batch = CatalogBatch { tx };
        let value = f(&mut batch)?;
        batch.tx.commit()?;
        Ok(value)
    }

    /// Runs `f` against the current committed state.
    pub fn read<T, F>(&self, f: F) -> CatalogResult<T>
    where
        F: FnOnce(&SqliteCatalog<'_>) -> CatalogResult<T>,
    {
        let conn = self.lock();
        f(&SqliteCatalog::new(&conn))
    }

    pub fn clear_all(&self) -> CatalogResult<()> {
        self.write(|batch| batch.catalog().clear_all())?;
        info!("Catalog cleared");
        Ok(())
    }

    pub fn counts(&self) -> CatalogResult<CatalogCounts> {
        self.read(|catalog| catalog.counts())
    }
}

/// Result of one item processed inside a batch.
#[derive(Debug)]
pub enum ItemOutcome<T> {
    Accepted(T),
    /// The item broke a business rule; none of its effects were kept.
    Rejected(CatalogError),
}

/// An open write transaction handed to `SqliteCatalogStore::write`.
pub struct CatalogBatch<'conn> {
    tx: Transaction<'conn>,
}

impl CatalogBatch<'_> {
    /// The catalog as seen inside this transaction.
    pub fn catalog(&self) -> SqliteCatalog<'_> {
        SqliteCatalog::new(&self.tx)
    }

    /// Runs one item of a batch inside its own savepoint.
    ///
    /// Business errors roll the savepoint back and come out as
    /// `ItemOutcome::Rejected`; fatal errors are returned as `Err` and doom
    /// the whole batch.
    pub fn item<T, F>(&mut self, f: F) -> CatalogResult<ItemOutcome<T>>
    where
        F: FnOnce(&SqliteCatalog<'_>) -> CatalogResult<T>,
    {
        let savepoint = self.tx.savepoint()?;
        let result = f(&SqliteCatalog::new(&savepoint));
        match result {
            Ok(value) => {
                savepoint.commit()?;
                Ok(ItemOutcome::Accepted(value))
            }
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                // Default drop behavior of a savepoint is rollback.
                savepoint.finish()?;
                Ok(ItemOutcome::Rejected(err))
            }
        }
    }
}

/// `CatalogStore` over a borrowed connection, transaction or savepoint.
pub struct SqliteCatalog<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteCatalog<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        SqliteCatalog { conn }
    }

    pub(crate) fn connection(&self) -> &'c Connection {
        self.conn
    }

    fn parse_artist_row(row: &rusqlite::Row) -> rusqlite::Result<Artist> {
        Ok(Artist {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    }

    fn parse_genre_row(row: &rusqlite::Row) -> rusqlite::Result<Genre> {
        Ok(Genre {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    }

    fn parse_song_row(row: &rusqlite::Row) -> rusqlite::Result<Song> {
        Ok(Song {
            id: row.get(0)?,
            title: row.get(1)?,
            release_date: row.get(2)?,
            artist_id: row.get(3)?,
            album_id: row.get(4)?,
        })
    }

    fn parse_album_row(row: &rusqlite::Row) -> rusqlite::Result<Album> {
        Ok(Album {
            id: row.get(0)?,
            title: row.get(1)?,
            release_date: row.get(2)?,
            artist_id: row.get(3)?,
            genre_id: row.get(4)?,
        })
    }

    fn find_genre(&self, name: &str) -> CatalogResult<Option<Genre>> {
        let genre = self
            .conn
            .prepare_cached("SELECT id, name FROM genre WHERE name = ?1")?
            .query_row(params![name], Self::parse_genre_row)
            .optional()?;
        Ok(genre)
    }

    fn song_exists(&self, song_id: SongId) -> CatalogResult<bool> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM song WHERE id = ?1)",
            params![song_id],
            |r| r.get(0),
        )?;
        Ok(exists)
    }

    fn count_rows(&self, table: &str) -> CatalogResult<usize> {
        let count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
        Ok(count as usize)
    }
}

// Artists and songs are only ever removed wholesale by `clear_all`. These
// exist to check the cascades.
#[cfg(test)]
impl SqliteCatalog<'_> {
    fn delete_artist(&self, name: &str) -> CatalogResult<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM artist WHERE name = ?1", params![name])?;
        Ok(deleted > 0)
    }

    fn delete_song(&self, song_id: SongId) -> CatalogResult<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM song WHERE id = ?1", params![song_id])?;
        Ok(deleted > 0)
    }
}

impl CatalogStore for SqliteCatalog<'_> {
    fn ensure_artist(&self, name: &str) -> CatalogResult<Artist> {
        if let Some(artist) = self.find_artist(name)? {
            return Ok(artist);
        }
        self.conn
            .execute("INSERT INTO artist (name) VALUES (?1)", params![name])?;
        debug!("Created artist {}", name);
        Ok(Artist {
            id: ArtistId(self.conn.last_insert_rowid()),
            name: name.to_string(),
        })
    }

    fn ensure_genre(&self, name: &str) -> CatalogResult<Genre> {
        if let Some(genre) = self.find_genre(name)? {
            return Ok(genre);
        }
        self.conn
            .execute("INSERT INTO genre (name) VALUES (?1)", params![name])?;
        debug!("Created genre {}", name);
        Ok(Genre {
            id: GenreId(self.conn.last_insert_rowid()),
            name: name.to_string(),
        })
    }

    fn find_artist(&self, name: &str) -> CatalogResult<Option<Artist>> {
        let artist = self
            .conn
            .prepare_cached("SELECT id, name FROM artist WHERE name = ?1")?
            .query_row(params![name], Self::parse_artist_row)
            .optional()?;
        Ok(artist)
    }

    fn find_song(&self, title: &str, artist: &str) -> CatalogResult<Option<Song>> {
        let song = self
            .conn
            .prepare_cached(
                "SELECT s.id, s.title, s.release_date, s.artist_id, s.album_id
                 FROM song s
                 JOIN artist a ON a.id = s.artist_id
                 WHERE s.title = ?1 AND a.name = ?2",
            )?
            .query_row(params![title, artist], Self::parse_song_row)
            .optional()?;
        Ok(song)
    }

    fn find_album(&self, title: &str, artist: &str) -> CatalogResult<Option<Album>> {
        let album = self
            .conn
            .prepare_cached(
                "SELECT al.id, al.title, al.release_date, al.artist_id, al.genre_id
                 FROM album al
                 JOIN artist a ON a.id = al.artist_id
                 WHERE al.title = ?1 AND a.name = ?2",
            )?
            .query_row(params![title, artist], Self::parse_album_row)
            .optional()?;
        Ok(album)
    }

    fn find_user(&self, username: &str) -> CatalogResult<Option<User>> {
        let user = self
            .conn
            .prepare_cached("SELECT id, username FROM user WHERE username = ?1")?
            .query_row(params![username], |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                })
            })
            .optional()?;
        Ok(user)
    }

    fn has_rated(&self, username: &str, song_id: SongId) -> CatalogResult<bool> {
        let rated = self.conn.query_row(
            "SELECT EXISTS(
                 SELECT 1 FROM rating r
                 JOIN user u ON u.id = r.user_id
                 WHERE u.username = ?1 AND r.song_id = ?2
             )",
            params![username, song_id],
            |r| r.get(0),
        )?;
        Ok(rated)
    }

    fn insert_song(
        &self,
        title: &str,
        release_date: NaiveDate,
        artist: &str,
        album_id: Option<AlbumId>,
    ) -> CatalogResult<Song> {
        let artist_row = self
            .find_artist(artist)?
            .ok_or_else(|| CatalogError::not_found("Artist", artist))?;
        if self.find_song(title, &artist_row.name)?.is_some() {
            return Err(CatalogError::duplicate(
                "Song",
                format!("{} by {}", title, artist_row.name),
            ));
        }

        self.conn.execute(
            "INSERT INTO song (title, release_date, artist_id, album_id) VALUES (?1, ?2, ?3, ?4)",
            params![title, release_date, artist_row.id, album_id],
        )?;
        Ok(Song {
            id: SongId(self.conn.last_insert_rowid()),
            title: title.to_string(),
            release_date,
            artist_id: artist_row.id,
            album_id,
        })
    }

    fn insert_album(
        &self,
        title: &str,
        release_date: NaiveDate,
        artist: &str,
        genre: &str,
    ) -> CatalogResult<Album> {
        let artist_row = self
            .find_artist(artist)?
            .ok_or_else(|| CatalogError::not_found("Artist", artist))?;
        let genre_row = self
            .find_genre(genre)?
            .ok_or_else(|| CatalogError::not_found("Genre", genre))?;
        if self.find_album(title, &artist_row.name)?.is_some() {
            return Err(CatalogError::duplicate(
                "Album",
                format!("{} by {}", title, artist_row.name),
            ));
        }

        self.conn.execute(
            "INSERT INTO album (title, release_date, artist_id, genre_id) VALUES (?1, ?2, ?3, ?4)",
            params![title, release_date, artist_row.id, genre_row.id],
        )?;
        Ok(Album {
            id: AlbumId(self.conn.last_insert_rowid()),
            title: title.to_string(),
            release_date,
            artist_id: artist_row.id,
            genre_id: genre_row.id,
        })
    }

    fn insert_user(&self, username: &str) -> CatalogResult<User> {
        if let Some(existing) = self.find_user(username)? {
            return Err(CatalogError::duplicate("User", existing.username));
        }
        self.conn
            .execute("INSERT INTO user (username) VALUES (?1)", params![username])?;
        Ok(User {
            id: UserId(self.conn.last_insert_rowid()),
            username: username.to_string(),
        })
    }

    fn link_song_genre(&self, song_id: SongId, genre_id: GenreId) -> CatalogResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO song_genre (song_id, genre_id) VALUES (?1, ?2)",
            params![song_id, genre_id],
        )?;
        Ok(())
    }

    fn link_song_artist(&self, song_id: SongId, artist_id: ArtistId) -> CatalogResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO song_artist (song_id, artist_id) VALUES (?1, ?2)",
            params![song_id, artist_id],
        )?;
        Ok(())
    }

    fn insert_rating(
        &self,
        username: &str,
        song_id: SongId,
        value: i64,
        rating_date: NaiveDate,
    ) -> CatalogResult<()> {
        if !is_valid_rating(value) {
            return Err(CatalogError::OutOfRange { value });
        }
        let user = self
            .find_user(username)?
            .ok_or_else(|| CatalogError::not_found("User", username))?;
        if !self.song_exists(song_id)? {
            return Err(CatalogError::not_found("Song", song_id.0.to_string()));
        }
        if self.has_rated(username, song_id)? {
            return Err(CatalogError::duplicate(
                "Rating",
                format!("of song {} by {}", song_id.0, user.username),
            ));
        }

        self.conn.execute(
            "INSERT INTO rating (user_id, song_id, value, rating_date) VALUES (?1, ?2, ?3, ?4)",
            params![user.id, song_id, value, rating_date],
        )?;
        Ok(())
    }

    fn clear_all(&self) -> CatalogResult<()> {
        for table in CLEAR_ORDER {
            self.conn.execute(&format!("DELETE FROM {}", table), [])?;
        }
        Ok(())
    }

    fn counts(&self) -> CatalogResult<CatalogCounts> {
        Ok(CatalogCounts {
            artists: self.count_rows("artist")?,
            genres: self.count_rows("genre")?,
            albums: self.count_rows("album")?,
            songs: self.count_rows("song")?,
            song_genres: self.count_rows("song_genre")?,
            song_artists: self.count_rows("song_artist")?,
            users: self.count_rows("user")?,
            ratings: self.count_rows("rating")?,
        })
    }
}
