/// A schema migration.
#[derive(Debug)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

const MIGRATION_001: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Raw staging tables: the unnormalized snapshot, loaded as-is.
-- No keys on purpose; rowid records first-seen order for deduplication.
CREATE TABLE IF NOT EXISTS raw_genres (
    genre_id INTEGER,
    name TEXT
);

CREATE TABLE IF NOT EXISTS raw_artists (
    artist_id INTEGER,
    name TEXT,
    birth_date TEXT,
    genre_id INTEGER,
    genre TEXT
);

CREATE TABLE IF NOT EXISTS raw_albums (
    album_id INTEGER,
    title TEXT,
    release_date TEXT,
    artist_id INTEGER,
    genre TEXT
);

CREATE TABLE IF NOT EXISTS raw_tracks (
    track_id INTEGER,
    title TEXT,
    duration INTEGER,
    album_id INTEGER,
    artist_genre TEXT
);
"#;

const MIGRATION_002: &str = r#"
-- Genres
CREATE TABLE IF NOT EXISTS genres (
    genre_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0)
);

-- Artists (genre reachable only from here)
CREATE TABLE IF NOT EXISTS artists (
    artist_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(name) > 0 AND name = trim(name)),
    birth_date TEXT,
    genre_id INTEGER REFERENCES genres(genre_id)
);

CREATE INDEX IF NOT EXISTS idx_artists_genre_id ON artists(genre_id);
CREATE INDEX IF NOT EXISTS idx_artists_name ON artists(name);

-- The age predicate depends on the current date, which CHECK constraints
-- may not use, so it is enforced by triggers evaluated on every write.
CREATE TRIGGER IF NOT EXISTS artists_age_check_insert
BEFORE INSERT ON artists
WHEN NEW.birth_date IS NOT NULL
    AND (date(NEW.birth_date) IS NULL OR NEW.birth_date > date('now', '-18 years'))
BEGIN
    SELECT RAISE(ABORT, 'CHECK constraint failed: artist must be at least 18 years old');
END;

CREATE TRIGGER IF NOT EXISTS artists_age_check_update
BEFORE UPDATE OF birth_date ON artists
WHEN NEW.birth_date IS NOT NULL
    AND (date(NEW.birth_date) IS NULL OR NEW.birth_date > date('now', '-18 years'))
BEGIN
    SELECT RAISE(ABORT, 'CHECK constraint failed: artist must be at least 18 years old');
END;

-- Albums
CREATE TABLE IF NOT EXISTS albums (
    album_id INTEGER PRIMARY KEY,
    title TEXT NOT NULL CHECK (length(trim(title)) > 0),
    release_date TEXT,
    release_date_normalized TEXT,
    artist_id INTEGER NOT NULL REFERENCES artists(artist_id)
);

CREATE INDEX IF NOT EXISTS idx_albums_artist_id ON albums(artist_id);
CREATE INDEX IF NOT EXISTS idx_albums_title ON albums(title);

-- Tracks
CREATE TABLE IF NOT EXISTS tracks (
    track_id INTEGER PRIMARY KEY,
    title TEXT NOT NULL CHECK (length(trim(title)) > 0),
    duration INTEGER NOT NULL CHECK (duration > 0),
    album_id INTEGER NOT NULL REFERENCES albums(album_id)
);

CREATE INDEX IF NOT EXISTS idx_tracks_album_id ON tracks(album_id);

-- Append-only audit trail
CREATE TABLE IF NOT EXISTS operation_log (
    log_id INTEGER PRIMARY KEY AUTOINCREMENT,
    operation_type TEXT NOT NULL CHECK (operation_type IN ('INSERT', 'UPDATE', 'DELETE')),
    table_name TEXT NOT NULL,
    record_id INTEGER NOT NULL,
    timestamp TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_operation_log_record ON operation_log(table_name, record_id);
"#;

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "raw_staging",
        sql: MIGRATION_001,
    },
    Migration {
        version: 2,
        name: "normalized_schema",
        sql: MIGRATION_002,
    },
];

/// Columns every managed table must carry. A pre-existing table missing any
/// of these is a schema conflict.
pub const EXPECTED_COLUMNS: &[(&str, &[&str])] = &[
    ("raw_genres", &["genre_id", "name"]),
    (
        "raw_artists",
        &["artist_id", "name", "birth_date", "genre_id", "genre"],
    ),
    (
        "raw_albums",
        &["album_id", "title", "release_date", "artist_id", "genre"],
    ),
    (
        "raw_tracks",
        &["track_id", "title", "duration", "album_id", "artist_genre"],
    ),
    ("genres", &["genre_id", "name"]),
    ("artists", &["artist_id", "name", "birth_date", "genre_id"]),
    (
        "albums",
        &[
            "album_id",
            "title",
            "release_date",
            "release_date_normalized",
            "artist_id",
        ],
    ),
    ("tracks", &["track_id", "title", "duration", "album_id"]),
    (
        "operation_log",
        &["log_id", "operation_type", "table_name", "record_id", "timestamp"],
    ),
];
