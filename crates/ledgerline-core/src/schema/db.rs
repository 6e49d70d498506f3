use rusqlite::{Connection, OptionalExtension, Transaction};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::hooks;
use crate::model::{Album, AlbumId, Artist, ArtistId, Genre, LogEntry, LogEntryId, Track};

use super::migrations::{EXPECTED_COLUMNS, MIGRATIONS};
use super::rows;

/// What the schema definer did on one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaReport {
    /// Versions applied by this run; empty when the store was up to date.
    pub applied: Vec<u32>,
    /// Managed tables whose shape was checked.
    pub tables_verified: usize,
}

/// A connection to the migration store.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at the given path and define the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut db = Self::connect(path)?;
        db.define_schema()?;
        Ok(db)
    }

    /// Open an in-memory database with the schema defined (for tests).
    pub fn open_in_memory() -> Result<Self> {
        let mut db = Self::from_connection(Connection::open_in_memory()?)?;
        db.define_schema()?;
        Ok(db)
    }

    /// Open a database without touching its schema.
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Start a transaction; dropping it without `commit` rolls back.
    pub fn transaction(&mut self) -> Result<Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }

    /// Create every table, index and constraint trigger that is missing.
    ///
    /// Safe to call on an initialized store: existing tables and rows are
    /// left untouched. Fails with [`Error::Schema`] if a managed table
    /// already exists with an incompatible shape.
    pub fn define_schema(&mut self) -> Result<SchemaReport> {
        // Check before creating anything: index creation on a conflicting
        // table would otherwise fail with a less useful error.
        self.verify_schema()?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        let applied: Vec<u32> = {
            let mut stmt = tx.prepare("SELECT version FROM schema_migrations ORDER BY version")?;
            let versions = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            versions
        };

        let mut report = SchemaReport::default();
        for migration in MIGRATIONS {
            if !applied.contains(&migration.version) {
                log::info!(
                    "Applying migration {} ({})",
                    migration.version,
                    migration.name
                );
                tx.execute_batch(migration.sql)?;
                tx.execute(
                    "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
                    rusqlite::params![migration.version, migration.name],
                )?;
                report.applied.push(migration.version);
            }
        }
        tx.commit()?;

        report.tables_verified = self.verify_schema()?;
        Ok(report)
    }

    /// Check every existing managed table for its expected columns. Returns
    /// the number of tables that exist and passed.
    pub fn verify_schema(&self) -> Result<usize> {
        let mut verified = 0;
        for (table, expected) in EXPECTED_COLUMNS {
            let columns = self.table_columns(table)?;
            if columns.is_empty() {
                continue;
            }
            let missing: Vec<&str> = expected
                .iter()
                .copied()
                .filter(|c| !columns.iter().any(|have| have == c))
                .collect();
            if !missing.is_empty() {
                return Err(Error::Schema {
                    table: (*table).to_string(),
                    message: format!("missing columns: {}", missing.join(", ")),
                });
            }
            verified += 1;
        }
        Ok(verified)
    }

    fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
        let columns = stmt
            .query_map([table], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(columns)
    }

    /// Number of rows in a managed table.
    pub fn count(&self, table: &str) -> Result<i64> {
        if !EXPECTED_COLUMNS.iter().any(|(t, _)| *t == table) {
            return Err(Error::InvalidData(format!("unknown table: {table}")));
        }
        let count = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }

    /// Names of all installed triggers (constraint and hook triggers).
    pub fn triggers(&self) -> Result<Vec<String>> {
        hooks::installed_triggers(&self.conn)
    }
}

// Normalized entity CRUD
//
// Each call is a single statement, so a guard or constraint rejection leaves
// no partial write behind.
impl Database {
    pub fn insert_genre(&self, genre: &Genre) -> Result<()> {
        rows::insert_genre(&self.conn, genre)
    }

    pub fn insert_artist(&self, artist: &Artist) -> Result<()> {
        rows::insert_artist(&self.conn, artist)
    }

    pub fn insert_album(&self, album: &Album) -> Result<()> {
        rows::insert_album(&self.conn, album)
    }

    pub fn insert_track(&self, track: &Track) -> Result<()> {
        rows::insert_track(&self.conn, track)
    }

    /// Update an artist's name, birth date and genre.
    pub fn update_artist(&self, artist: &Artist) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE artists SET name = ?2, birth_date = ?3, genre_id = ?4 WHERE artist_id = ?1",
            rusqlite::params![
                artist.id,
                artist.name,
                artist.birth_date.map(|d| d.format(crate::model::DATE_FORMAT).to_string()),
                artist.genre_id,
            ],
        )?;
        if changed == 0 {
            return Err(Error::NotFound {
                entity: "artist",
                id: artist.id.to_string(),
            });
        }
        Ok(())
    }

    pub fn delete_artist(&self, id: ArtistId) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM artists WHERE artist_id = ?1", [id])?;
        if changed == 0 {
            return Err(Error::NotFound {
                entity: "artist",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    pub fn get_artist(&self, id: ArtistId) -> Result<Option<Artist>> {
        let artist = self
            .conn
            .query_row(
                "SELECT artist_id, name, birth_date, genre_id FROM artists WHERE artist_id = ?1",
                [id],
                rows::row_to_artist,
            )
            .optional()?;
        Ok(artist)
    }

    pub fn get_album(&self, id: AlbumId) -> Result<Option<Album>> {
        let album = self
            .conn
            .query_row(
                "SELECT album_id, title, release_date, release_date_normalized, artist_id
                 FROM albums WHERE album_id = ?1",
                [id],
                rows::row_to_album,
            )
            .optional()?;
        Ok(album)
    }

    pub fn list_genres(&self) -> Result<Vec<Genre>> {
        let mut stmt = self
            .conn
            .prepare("SELECT genre_id, name FROM genres ORDER BY genre_id")?;
        let genres = stmt
            .query_map([], |row| Ok(Genre::new(row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(genres)
    }

    pub fn list_artists(&self) -> Result<Vec<Artist>> {
        let mut stmt = self.conn.prepare(
            "SELECT artist_id, name, birth_date, genre_id FROM artists ORDER BY artist_id",
        )?;
        let artists = stmt
            .query_map([], rows::row_to_artist)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(artists)
    }

    pub fn list_albums(&self) -> Result<Vec<Album>> {
        let mut stmt = self.conn.prepare(
            "SELECT album_id, title, release_date, release_date_normalized, artist_id
             FROM albums ORDER BY album_id",
        )?;
        let albums = stmt
            .query_map([], rows::row_to_album)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(albums)
    }

    pub fn list_tracks(&self) -> Result<Vec<Track>> {
        let mut stmt = self
            .conn
            .prepare("SELECT track_id, title, duration, album_id FROM tracks ORDER BY track_id")?;
        let tracks = stmt
            .query_map([], |row| {
                Ok(Track::new(
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tracks)
    }
}

// Operation log
impl Database {
    /// Most recent log entries first.
    pub fn recent_log_entries(&self, limit: usize) -> Result<Vec<LogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT log_id, operation_type, table_name, record_id, timestamp
             FROM operation_log
             ORDER BY log_id DESC
             LIMIT ?1",
        )?;
        let raw = stmt
            .query_map([i64::try_from(limit).unwrap_or(i64::MAX)], |row| {
                Ok((
                    row.get::<_, LogEntryId>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw.into_iter()
            .map(|(id, operation, table_name, record_id, timestamp)| {
                Ok::<_, Error>(LogEntry {
                    id,
                    operation: operation.parse()?,
                    table_name,
                    record_id,
                    timestamp,
                })
            })
            .collect()
    }
}
