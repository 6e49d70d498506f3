//! Clean stage: factor genre text into genres, then drop orphan rows.
//!
//! Orphans are removed with an explicit pass over the staging tables in
//! dependency order. Each level only looks at its parent's *current* rows,
//! so a child of a row deleted one level up is deleted in turn.

use std::path::PathBuf;

use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use treadle::{Stage, StageContext, StageOutcome};

use ledgerline_core::schema::Database;

use crate::error::stage_failure;

/// A foreign key from a staging table to its parent staging table.
#[derive(Debug, Clone, Copy)]
pub struct ForeignKey {
    pub column: &'static str,
    pub parent_table: &'static str,
    pub parent_column: &'static str,
}

/// One level of the ordered cleaning pass.
#[derive(Debug, Clone, Copy)]
pub struct CleanLevel {
    pub table: &'static str,
    pub foreign_key: Option<ForeignKey>,
}

/// Staging tables in dependency order: parents before children.
pub const CLEAN_ORDER: &[CleanLevel] = &[
    CleanLevel {
        table: "raw_genres",
        foreign_key: None,
    },
    CleanLevel {
        table: "raw_artists",
        foreign_key: Some(ForeignKey {
            column: "genre_id",
            parent_table: "raw_genres",
            parent_column: "genre_id",
        }),
    },
    CleanLevel {
        table: "raw_albums",
        foreign_key: Some(ForeignKey {
            column: "artist_id",
            parent_table: "raw_artists",
            parent_column: "artist_id",
        }),
    },
    CleanLevel {
        table: "raw_tracks",
        foreign_key: Some(ForeignKey {
            column: "album_id",
            parent_table: "raw_albums",
            parent_column: "album_id",
        }),
    },
];

/// Rows removed per staging table by one ordered pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanCounts {
    pub genres: usize,
    pub artists: usize,
    pub albums: usize,
    pub tracks: usize,
}

impl OrphanCounts {
    pub fn total(&self) -> usize {
        self.genres + self.artists + self.albums + self.tracks
    }

    fn record(&mut self, table: &str, removed: usize) {
        match table {
            "raw_genres" => self.genres += removed,
            "raw_artists" => self.artists += removed,
            "raw_albums" => self.albums += removed,
            "raw_tracks" => self.tracks += removed,
            _ => {}
        }
    }
}

/// Outcome of the clean stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanReport {
    /// Genres created from artist genre text.
    pub genres_factored: usize,
    /// Artists whose genre text was resolved to a genre id.
    pub artists_linked: usize,
    pub removed: OrphanCounts,
}

/// Delete every staging row whose foreign key names a parent that is not
/// (or no longer) present. A null foreign key is not an orphan.
///
/// Genres have no parent; rows without an id or a name are dropped since
/// nothing could ever reference them.
pub fn sweep_orphans(conn: &Connection) -> ledgerline_core::Result<OrphanCounts> {
    let mut counts = OrphanCounts::default();

    for level in CLEAN_ORDER {
        let removed = match level.foreign_key {
            Some(fk) => conn.execute(
                &format!(
                    "DELETE FROM {table}
                     WHERE {column} IS NOT NULL
                       AND {column} NOT IN (
                           SELECT {parent_column} FROM {parent_table}
                           WHERE {parent_column} IS NOT NULL
                       )",
                    table = level.table,
                    column = fk.column,
                    parent_table = fk.parent_table,
                    parent_column = fk.parent_column,
                ),
                [],
            )?,
            None => conn.execute(
                &format!(
                    "DELETE FROM {table}
                     WHERE genre_id IS NULL OR name IS NULL OR trim(name) = ''",
                    table = level.table
                ),
                [],
            )?,
        };

        if removed > 0 {
            log::debug!("Removed {} orphan rows from {}", removed, level.table);
        }
        counts.record(level.table, removed);
    }

    Ok(counts)
}

/// Resolve artist genre text to genre ids, creating genres for names that
/// are not yet present. Matching is on the trimmed name, ignoring ASCII
/// case. Returns `(genres created, artists linked)`.
///
/// Names resolve against the first-seen staged row for each genre id (the
/// row deduplication keeps), then against already-published genres. New
/// ids are allocated above every id in either table.
pub fn factor_genres(conn: &Connection) -> ledgerline_core::Result<(usize, usize)> {
    let names: Vec<String> = {
        let mut stmt = conn.prepare(
            "SELECT trim(genre), MIN(rowid) AS first_seen FROM raw_artists
             WHERE genre_id IS NULL AND genre IS NOT NULL AND trim(genre) != ''
             GROUP BY lower(trim(genre))
             ORDER BY first_seen",
        )?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        names
    };

    let mut created = 0;
    let mut linked = 0;

    for name in names {
        let genre_id = if let Some(id) = staged_genre(conn, &name)? {
            id
        } else if let Some(id) = published_genre(conn, &name)? {
            // Stage the published row so the orphan pass keeps the link.
            conn.execute(
                "INSERT INTO raw_genres (genre_id, name)
                 SELECT genre_id, name FROM genres
                 WHERE genre_id = ?1
                   AND genre_id NOT IN (
                       SELECT genre_id FROM raw_genres WHERE genre_id IS NOT NULL
                   )",
                [id],
            )?;
            log::debug!("Genre {:?} resolved to published id {}", name, id);
            id
        } else {
            let id: i64 = conn.query_row(
                "SELECT COALESCE(MAX(id), 0) + 1 FROM (
                     SELECT MAX(genre_id) AS id FROM raw_genres
                     UNION ALL
                     SELECT MAX(genre_id) FROM genres
                 )",
                [],
                |row| row.get(0),
            )?;
            conn.execute(
                "INSERT INTO raw_genres (genre_id, name) VALUES (?1, ?2)",
                rusqlite::params![id, name],
            )?;
            log::debug!("Factored genre {:?} as id {}", name, id);
            created += 1;
            id
        };

        linked += conn.execute(
            "UPDATE raw_artists SET genre_id = ?1
             WHERE genre_id IS NULL AND lower(trim(genre)) = lower(?2)",
            rusqlite::params![genre_id, name],
        )?;
    }

    Ok((created, linked))
}

/// Id of the staged genre named `name`, looking only at the first-seen row
/// of each genre id.
fn staged_genre(conn: &Connection, name: &str) -> ledgerline_core::Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT genre_id FROM raw_genres
             WHERE rowid IN (
                 SELECT MIN(rowid) FROM raw_genres
                 WHERE genre_id IS NOT NULL
                 GROUP BY genre_id
             )
               AND lower(trim(name)) = lower(?1)
             ORDER BY rowid LIMIT 1",
            [name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

fn published_genre(conn: &Connection, name: &str) -> ledgerline_core::Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT genre_id FROM genres
             WHERE lower(trim(name)) = lower(?1)
             ORDER BY genre_id LIMIT 1",
            [name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

/// Run the whole clean stage in one transaction.
pub fn clean_store(db: &mut Database) -> ledgerline_core::Result<CleanReport> {
    let tx = db.transaction()?;
    let (genres_factored, artists_linked) = factor_genres(&tx)?;
    let removed = sweep_orphans(&tx)?;
    tx.commit()?;

    log::info!(
        "Clean complete: {} genres factored, orphans removed: {} genres, {} artists, {} albums, {} tracks",
        genres_factored,
        removed.genres,
        removed.artists,
        removed.albums,
        removed.tracks
    );

    Ok(CleanReport {
        genres_factored,
        artists_linked,
        removed,
    })
}

/// The Clean stage: genre factoring and the ordered orphan pass.
#[derive(Debug)]
pub struct CleanStage {
    db_path: PathBuf,
}

impl CleanStage {
    #[must_use]
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }
}

#[async_trait::async_trait]
impl Stage for CleanStage {
    fn name(&self) -> &str {
        "clean"
    }

    async fn execute(
        &self,
        _item: &dyn treadle::WorkItem,
        ctx: &mut StageContext,
    ) -> treadle::Result<StageOutcome> {
        let mut db = Database::connect(&self.db_path)
            .map_err(|e| stage_failure("Opening database", e))?;

        let report = clean_store(&mut db).map_err(|e| stage_failure("Clean", e))?;

        let report_json = serde_json::to_value(&report)
            .map_err(|e| stage_failure("Serializing clean report", e))?;
        ctx.metadata.insert("clean".to_string(), report_json);

        Ok(StageOutcome::Complete)
    }
}
