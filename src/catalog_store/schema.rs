//! SQLite schema of the music catalog.
//!
//! Name and title columns compare case-insensitively over all of Unicode
//! (`UNICASE`), so the uniqueness rules treat "Adele" and "ADELE", or
//! "Élodie" and "élodie", as the same name while the stored spelling is kept
//! for display. Dates are ISO-8601 text.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Collation, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
};

const ARTIST_FK: ForeignKey = ForeignKey {
    foreign_table: "artist",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const SONG_FK: ForeignKey = ForeignKey {
    foreign_table: "song",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const ARTIST_TABLE: Table = Table {
    name: "artist",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "name",
            &SqlType::Text,
            non_null = true,
            is_unique = true,
            collation = Some(Collation::UniCase)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

const GENRE_TABLE: Table = Table {
    name: "genre",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "name",
            &SqlType::Text,
            non_null = true,
            is_unique = true,
            collation = Some(Collation::UniCase)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

/// Every album has exactly one genre; a genre referenced by an album cannot
/// be removed while the album exists.
const ALBUM_TABLE: Table = Table {
    name: "album",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "title",
            &SqlType::Text,
            non_null = true,
            collation = Some(Collation::UniCase)
        ),
        sqlite_column!("release_date", &SqlType::Text, non_null = true),
        sqlite_column!(
            "artist_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ARTIST_FK)
        ),
        sqlite_column!(
            "genre_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "genre",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Restrict,
            })
        ),
    ],
    indices: &[("idx_album_artist", "artist_id")],
    unique_constraints: &[&["title", "artist_id"]],
};

/// A song with a NULL `album_id` is a single.
const SONG_TABLE: Table = Table {
    name: "song",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "title",
            &SqlType::Text,
            non_null = true,
            collation = Some(Collation::UniCase)
        ),
        sqlite_column!("release_date", &SqlType::Text, non_null = true),
        sqlite_column!(
            "artist_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ARTIST_FK)
        ),
        sqlite_column!(
            "album_id",
            &SqlType::Integer,
            foreign_key = Some(&ForeignKey {
                foreign_table: "album",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
    ],
    indices: &[
        ("idx_song_artist", "artist_id"),
        ("idx_song_album", "album_id"),
    ],
    unique_constraints: &[&["title", "artist_id"]],
};

const SONG_GENRE_TABLE: Table = Table {
    name: "song_genre",
    columns: &[
        sqlite_column!(
            "song_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&SONG_FK)
        ),
        sqlite_column!(
            "genre_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "genre",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
    ],
    indices: &[("idx_song_genre_genre", "genre_id")],
    unique_constraints: &[&["song_id", "genre_id"]],
};

const SONG_ARTIST_TABLE: Table = Table {
    name: "song_artist",
    columns: &[
        sqlite_column!(
            "song_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&SONG_FK)
        ),
        sqlite_column!(
            "artist_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ARTIST_FK)
        ),
    ],
    indices: &[("idx_song_artist_artist", "artist_id")],
    unique_constraints: &[&["song_id", "artist_id"]],
};

const USER_TABLE: Table = Table {
    name: "user",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "username",
            &SqlType::Text,
            non_null = true,
            is_unique = true,
            collation = Some(Collation::UniCase)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

const RATING_TABLE: Table = Table {
    name: "rating",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!(
            "song_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&SONG_FK)
        ),
        sqlite_column!(
            "value",
            &SqlType::Integer,
            non_null = true,
            check = Some("value BETWEEN 1 AND 5")
        ),
        sqlite_column!("rating_date", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_rating_song", "song_id")],
    unique_constraints: &[&["user_id", "song_id"]],
};

/// Tables in child-to-parent order. Clearing the catalog deletes them in
/// this order so no foreign key is ever left dangling.
pub const CLEAR_ORDER: &[&str] = &[
    "rating",
    "song_genre",
    "song_artist",
    "song",
    "album",
    "user",
    "artist",
    "genre",
];

pub const CATALOG_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        ARTIST_TABLE,
        GENRE_TABLE,
        ALBUM_TABLE,
        SONG_TABLE,
        SONG_GENRE_TABLE,
        SONG_ARTIST_TABLE,
        USER_TABLE,
        RATING_TABLE,
    ],
    migration: None,
}];
