//! Ranking and grouping queries over the catalog.
//!
//! Rankings sort by their count descending and break ties alphabetically,
//! using the same case-insensitive comparison as the catalog's names.

use super::models::*;
use crate::catalog_store::{CatalogResult, SqliteCatalogStore};
use rusqlite::params;
use std::collections::BTreeSet;

fn sql_limit(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[derive(Clone)]
pub struct QueryService {
    store: SqliteCatalogStore,
}

impl QueryService {
    pub fn new(store: SqliteCatalogStore) -> Self {
        Self { store }
    }

    /// Top `n` artists by number of singles released within `years`.
    pub fn most_prolific_artists(
        &self,
        n: usize,
        years: YearRange,
    ) -> CatalogResult<Vec<ArtistSingleCount>> {
        if n == 0 || years.is_empty() {
            return Ok(Vec::new());
        }
        self.store.read(|catalog| {
            let mut stmt = catalog.connection().prepare_cached(
                "SELECT a.name, COUNT(*) AS singles
                 FROM song s
                 JOIN artist a ON a.id = s.artist_id
                 WHERE s.album_id IS NULL
                   AND CAST(strftime('%Y', s.release_date) AS INTEGER) BETWEEN ?1 AND ?2
                 GROUP BY a.id
                 ORDER BY singles DESC, a.name ASC
                 LIMIT ?3",
            )?;
            let rows = stmt
                .query_map(params![years.start, years.end, sql_limit(n)], |row| {
                    Ok(ArtistSingleCount {
                        artist: row.get(0)?,
                        singles: row.get::<_, i64>(1)? as usize,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Artists whose most recent single came out in `year`. Artists without
    /// singles never match.
    pub fn artists_last_single_in_year(&self, year: i32) -> CatalogResult<BTreeSet<String>> {
        self.store.read(|catalog| {
            let mut stmt = catalog.connection().prepare_cached(
                "SELECT a.name
                 FROM song s
                 JOIN artist a ON a.id = s.artist_id
                 WHERE s.album_id IS NULL
                 GROUP BY a.id
                 HAVING MAX(CAST(strftime('%Y', s.release_date) AS INTEGER)) = ?1",
            )?;
            let artists = stmt
                .query_map(params![year], |row| row.get::<_, String>(0))?
                .collect::<Result<BTreeSet<_>, _>>()?;
            Ok(artists)
        })
    }

    /// Top `n` genres by number of songs, singles and album tracks alike.
    pub fn top_song_genres(&self, n: usize) -> CatalogResult<Vec<GenreSongCount>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        self.store.read(|catalog| {
            let mut stmt = catalog.connection().prepare_cached(
                "SELECT g.name, COUNT(*) AS songs
                 FROM song_genre sg
                 JOIN genre g ON g.id = sg.genre_id
                 GROUP BY g.id
                 ORDER BY songs DESC, g.name ASC
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map(params![sql_limit(n)], |row| {
                    Ok(GenreSongCount {
                        genre: row.get(0)?,
                        songs: row.get::<_, i64>(1)? as usize,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Artists with at least one album and at least one single.
    pub fn album_and_single_artists(&self) -> CatalogResult<BTreeSet<String>> {
        self.store.read(|catalog| {
            let mut stmt = catalog.connection().prepare_cached(
                "SELECT a.name
                 FROM artist a
                 WHERE EXISTS (SELECT 1 FROM album al WHERE al.artist_id = a.id)
                   AND EXISTS (
                     SELECT 1 FROM song s WHERE s.artist_id = a.id AND s.album_id IS NULL
                   )",
            )?;
            let artists = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<BTreeSet<_>, _>>()?;
            Ok(artists)
        })
    }

    /// Top `n` songs by number of ratings dated within `years`. Ties go by
    /// title, then artist.
    pub fn most_rated_songs(
        &self,
        years: YearRange,
        n: usize,
    ) -> CatalogResult<Vec<SongRatingCount>> {
        if n == 0 || years.is_empty() {
            return Ok(Vec::new());
        }
        self.store.read(|catalog| {
            let mut stmt = catalog.connection().prepare_cached(
                "SELECT s.title, a.name, COUNT(*) AS ratings
                 FROM rating r
                 JOIN song s ON s.id = r.song_id
                 JOIN artist a ON a.id = s.artist_id
                 WHERE CAST(strftime('%Y', r.rating_date) AS INTEGER) BETWEEN ?1 AND ?2
                 GROUP BY s.id
                 ORDER BY ratings DESC, s.title ASC, a.name ASC
                 LIMIT ?3",
            )?;
            let rows = stmt
                .query_map(params![years.start, years.end, sql_limit(n)], |row| {
                    Ok(SongRatingCount {
                        title: row.get(0)?,
                        artist: row.get(1)?,
                        ratings: row.get::<_, i64>(2)? as usize,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Top `n` users by number of ratings dated within `years`.
    pub fn most_engaged_users(
        &self,
        years: YearRange,
        n: usize,
    ) -> CatalogResult<Vec<UserEngagement>> {
        if n == 0 || years.is_empty() {
            return Ok(Vec::new());
        }
        self.store.read(|catalog| {
            let mut stmt = catalog.connection().prepare_cached(
                "SELECT u.username, COUNT(*) AS ratings
                 FROM rating r
                 JOIN user u ON u.id = r.user_id
                 WHERE CAST(strftime('%Y', r.rating_date) AS INTEGER) BETWEEN ?1 AND ?2
                 GROUP BY u.id
                 ORDER BY ratings DESC, u.username ASC
                 LIMIT ?3",
            )?;
            let rows = stmt
                .query_map(params![years.start, years.end, sql_limit(n)], |row| {
                    Ok(UserEngagement {
                        username: row.get(0)?,
                        ratings: row.get::<_, i64>(1)? as usize,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::{AlbumRelease, IngestionService, SingleSong, SongRating};
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn seeded() -> QueryService {
        let store = SqliteCatalogStore::open_in_memory().unwrap();
        let ingestion = IngestionService::new(store.clone());
        ingestion
            .load_single_songs(&[
                SingleSong::new("Hello", ["Pop"], "Adele", date("2015-10-01")),
                SingleSong::new("Skyfall", ["Pop"], "Adele", date("2012-10-01")),
                SingleSong::new("Chandelier", ["Pop"], "Sia", date("2014-03-17")),
                SingleSong::new("Unstoppable", ["Pop"], "Sia", date("2016-01-21")),
                SingleSong::new("Bad Habits", ["Pop", "Electronic"], "Ed Sheeran", date("2021-06-25")),
            ])
            .unwrap();
        ingestion
            .load_albums(&[AlbumRelease::new(
                "Divide",
                "Folk",
                "Ed Sheeran",
                date("2017-03-03"),
                ["Castle on the Hill", "Perfect", "Galway Girl"],
            )])
            .unwrap();
        ingestion.load_users(&["alice", "bob", "carol"]).unwrap();
        ingestion
            .load_song_ratings(&[
                SongRating::new("alice", "Adele", "Hello", 5, date("2020-01-01")),
                SongRating::new("bob", "Adele", "Hello", 4, date("2020-02-01")),
                SongRating::new("carol", "Sia", "Chandelier", 3, date("2021-02-01")),
                SongRating::new("alice", "Sia", "Chandelier", 2, date("2019-05-05")),
                SongRating::new("bob", "Ed Sheeran", "Perfect", 5, date("2020-07-07")),
            ])
            .unwrap();
        QueryService::new(store)
    }

    #[test]
    fn test_most_prolific_ties_sorted_by_name() {
        let queries = seeded();
        let result = queries
            .most_prolific_artists(10, YearRange::new(2012, 2016))
            .unwrap();
        assert_eq!(
            result,
            vec![
                ArtistSingleCount {
                    artist: "Adele".to_string(),
                    singles: 2
                },
                ArtistSingleCount {
                    artist: "Sia".to_string(),
                    singles: 2
                },
            ]
        );

        let top_one = queries
            .most_prolific_artists(1, YearRange::new(2012, 2016))
            .unwrap();
        assert_eq!(top_one.len(), 1);
        assert_eq!(top_one[0].artist, "Adele");
    }

    #[test]
    fn test_zero_n_and_inverted_range_are_empty() {
        let queries = seeded();
        assert!(queries
            .most_prolific_artists(0, YearRange::new(2000, 2030))
            .unwrap()
            .is_empty());
        assert!(queries
            .most_prolific_artists(5, YearRange::new(2030, 2000))
            .unwrap()
            .is_empty());
        assert!(queries.top_song_genres(0).unwrap().is_empty());
        assert!(queries
            .most_rated_songs(YearRange::new(2021, 2019), 5)
            .unwrap()
            .is_empty());
        assert!(queries
            .most_engaged_users(YearRange::new(2000, 2030), 0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_last_single_uses_true_maximum() {
        let queries = seeded();
        assert_eq!(
            queries.artists_last_single_in_year(2016).unwrap(),
            BTreeSet::from(["Sia".to_string()])
        );
        // Sia released a single in 2014 but her last one is from 2016.
        assert!(queries.artists_last_single_in_year(2014).unwrap().is_empty());
        // Album tracks are not singles.
        assert!(queries.artists_last_single_in_year(2017).unwrap().is_empty());
    }

    #[test]
    fn test_top_song_genres_count_album_tracks() {
        let queries = seeded();
        assert_eq!(
            queries.top_song_genres(10).unwrap(),
            vec![
                GenreSongCount {
                    genre: "Pop".to_string(),
                    songs: 5
                },
                GenreSongCount {
                    genre: "Folk".to_string(),
                    songs: 3
                },
                GenreSongCount {
                    genre: "Electronic".to_string(),
                    songs: 1
                },
            ]
        );
    }

    #[test]
    fn test_album_and_single_artists() {
        let queries = seeded();
        assert_eq!(
            queries.album_and_single_artists().unwrap(),
            BTreeSet::from(["Ed Sheeran".to_string()])
        );
    }

    #[test]
    fn test_most_rated_songs_counts_ratings_in_range() {
        let queries = seeded();
        let result = queries
            .most_rated_songs(YearRange::new(2020, 2021), 10)
            .unwrap();
        assert_eq!(
            result,
            vec![
                SongRatingCount {
                    title: "Hello".to_string(),
                    artist: "Adele".to_string(),
                    ratings: 2
                },
                SongRatingCount {
                    title: "Chandelier".to_string(),
                    artist: "Sia".to_string(),
                    ratings: 1
                },
                SongRatingCount {
                    title: "Perfect".to_string(),
                    artist: "Ed Sheeran".to_string(),
                    ratings: 1
                },
            ]
        );
    }

    #[test]
    fn test_most_engaged_users() {
        let queries = seeded();
        assert_eq!(
            queries
                .most_engaged_users(YearRange::new(2020, 2020), 10)
                .unwrap(),
            vec![
                UserEngagement {
                    username: "bob".to_string(),
                    ratings: 2
                },
                UserEngagement {
                    username: "alice".to_string(),
                    ratings: 1
                },
            ]
        );
        assert_eq!(
            queries
                .most_engaged_users(YearRange::new(2019, 2021), 10)
                .unwrap()[0],
            UserEngagement {
                username: "alice".to_string(),
                ratings: 2
            }
        );
    }
}
