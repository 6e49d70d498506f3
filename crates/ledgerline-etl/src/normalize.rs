//! Normalize stage: deduplicate, trim and validate staging rows, then
//! publish the survivors into the normalized tables.
//!
//! Rows are excluded rather than reported as errors: the goal is a
//! consistent dataset, not the preservation of every input row. Because
//! exclusion can orphan children, the clean stage's ordered pass runs again
//! before anything is published.

use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use treadle::{Stage, StageContext, StageOutcome};

use ledgerline_core::model::{is_adult, parse_date, Album, Artist, Genre, Track, DATE_FORMAT};
use ledgerline_core::normalize::normalize_text;
use ledgerline_core::schema::{rows, Database};

use crate::clean::{sweep_orphans, OrphanCounts};
use crate::error::stage_failure;

/// Staging tables and their identifier columns, parents first.
const KEYED_TABLES: &[(&str, &str)] = &[
    ("raw_genres", "genre_id"),
    ("raw_artists", "artist_id"),
    ("raw_albums", "album_id"),
    ("raw_tracks", "track_id"),
];

/// Free-text columns that are trimmed; blank values drop the row.
const TEXT_COLUMNS: &[(&str, &str)] = &[
    ("raw_genres", "name"),
    ("raw_artists", "name"),
    ("raw_albums", "title"),
    ("raw_tracks", "title"),
];

/// Rows written to the normalized tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishCounts {
    pub genres: usize,
    pub artists: usize,
    pub albums: usize,
    pub tracks: usize,
}

impl PublishCounts {
    pub fn total(&self) -> usize {
        self.genres + self.artists + self.albums + self.tracks
    }
}

/// Outcome of the normalize stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeReport {
    /// Rows dropped because an earlier row had the same id, or had no id.
    pub duplicates_removed: usize,
    /// Rows dropped because a required name or title was blank.
    pub blank_text_removed: usize,
    /// Tracks without a positive duration.
    pub invalid_durations_removed: usize,
    /// Artists whose birth date is unreadable or under age.
    pub underage_or_undated_removed: usize,
    /// Albums and tracks with no parent reference at all.
    pub unparented_removed: usize,
    /// Children orphaned by the exclusions above.
    pub orphans_removed: OrphanCounts,
    pub dates_normalized: usize,
    pub dates_unparseable: usize,
    pub published: PublishCounts,
    /// Rows skipped because the id was already published by an earlier run.
    pub already_present: usize,
    /// Skipped rows whose published name or title differs from the staged
    /// one: the snapshot reuses an id for something else.
    pub id_conflicts: usize,
}

/// Keep only the first-seen row for every identifier. Rows without an
/// identifier are dropped. Returns the number of rows removed.
pub fn deduplicate(conn: &Connection) -> ledgerline_core::Result<usize> {
    let mut removed = 0;
    for (table, id_column) in KEYED_TABLES {
        let without_id = conn.execute(
            &format!("DELETE FROM {table} WHERE {id_column} IS NULL"),
            [],
        )?;
        let duplicates = conn.execute(
            &format!(
                "DELETE FROM {table}
                 WHERE rowid NOT IN (SELECT MIN(rowid) FROM {table} GROUP BY {id_column})"
            ),
            [],
        )?;
        if without_id + duplicates > 0 {
            log::debug!(
                "{}: dropped {} rows without id, {} duplicates",
                table,
                without_id,
                duplicates
            );
        }
        removed += without_id + duplicates;
    }
    Ok(removed)
}

/// Trim every configured text column, dropping rows left blank.
pub fn trim_text(conn: &Connection) -> ledgerline_core::Result<usize> {
    let mut removed = 0;
    for (table, column) in TEXT_COLUMNS {
        let values: Vec<(i64, Option<String>)> = {
            let mut stmt = conn.prepare(&format!("SELECT rowid, {column} FROM {table}"))?;
            let values = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            values
        };

        for (rowid, value) in values {
            match normalize_text(value.as_deref()) {
                Some(trimmed) if value.as_deref() != Some(trimmed.as_str()) => {
                    conn.execute(
                        &format!("UPDATE {table} SET {column} = ?1 WHERE rowid = ?2"),
                        rusqlite::params![trimmed, rowid],
                    )?;
                }
                Some(_) => {}
                None => {
                    log::debug!("{}: dropping row {} with blank {}", table, rowid, column);
                    conn.execute(&format!("DELETE FROM {table} WHERE rowid = ?1"), [rowid])?;
                    removed += 1;
                }
            }
        }
    }
    Ok(removed)
}

/// Drop artists that fail the age predicate on `today` and rewrite the
/// remaining birth dates in canonical form. Null birth dates are kept.
pub fn check_birth_dates(conn: &Connection, today: NaiveDate) -> ledgerline_core::Result<usize> {
    let dated: Vec<(i64, String)> = {
        let mut stmt =
            conn.prepare("SELECT rowid, birth_date FROM raw_artists WHERE birth_date IS NOT NULL")?;
        let dated = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        dated
    };

    let mut removed = 0;
    for (rowid, raw) in dated {
        match parse_date(&raw) {
            Some(born) if is_adult(born, today) => {
                let canonical = born.format(DATE_FORMAT).to_string();
                if canonical != raw {
                    conn.execute(
                        "UPDATE raw_artists SET birth_date = ?1 WHERE rowid = ?2",
                        rusqlite::params![canonical, rowid],
                    )?;
                }
            }
            parsed => {
                log::debug!(
                    "raw_artists: dropping row {} (birth date {:?}, parsed {:?})",
                    rowid,
                    raw,
                    parsed
                );
                conn.execute("DELETE FROM raw_artists WHERE rowid = ?1", [rowid])?;
                removed += 1;
            }
        }
    }
    Ok(removed)
}

/// Drop tracks whose duration is missing or not positive.
pub fn check_durations(conn: &Connection) -> ledgerline_core::Result<usize> {
    Ok(conn.execute(
        "DELETE FROM raw_tracks WHERE duration IS NULL OR duration <= 0",
        [],
    )?)
}

/// Albums and tracks must name a parent in the normalized schema.
pub fn drop_unparented(conn: &Connection) -> ledgerline_core::Result<usize> {
    let albums = conn.execute("DELETE FROM raw_albums WHERE artist_id IS NULL", [])?;
    let tracks = conn.execute("DELETE FROM raw_tracks WHERE album_id IS NULL", [])?;
    Ok(albums + tracks)
}

/// Whether the row keyed `id` is already published. A published row whose
/// label differs from the staged `label` is kept as is, and counted and
/// logged as a conflict.
fn already_published(
    conn: &Connection,
    (table, id_column, label_column): (&str, &str, &str),
    id: i64,
    label: &str,
    report: &mut NormalizeReport,
) -> ledgerline_core::Result<bool> {
    let Some(existing) = rows::existing_label(conn, table, id_column, label_column, id)? else {
        return Ok(false);
    };
    report.already_present += 1;
    if existing != label {
        log::warn!(
            "{}: id {} is already published as {:?}; staged {:?} not published",
            table,
            id,
            existing,
            label
        );
        report.id_conflicts += 1;
    }
    Ok(true)
}

/// Copy the staging rows into the normalized tables, parents first. Ids
/// already present are left alone.
fn publish(conn: &Connection, report: &mut NormalizeReport) -> ledgerline_core::Result<()> {
    let genres: Vec<Genre> = {
        let mut stmt = conn.prepare("SELECT genre_id, name FROM raw_genres ORDER BY rowid")?;
        let genres = stmt
            .query_map([], |row| {
                Ok(Genre::new(row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        genres
    };
    for genre in &genres {
        let key = ("genres", "genre_id", "name");
        if already_published(conn, key, genre.id.get(), &genre.name, report)? {
            continue;
        }
        rows::insert_genre(conn, genre)?;
        report.published.genres += 1;
    }

    let artists: Vec<Artist> = {
        let mut stmt = conn.prepare(
            "SELECT artist_id, name, birth_date, genre_id FROM raw_artists ORDER BY rowid",
        )?;
        let artists = stmt
            .query_map([], |row| {
                let birth_date: Option<String> = row.get(2)?;
                Ok(Artist {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    birth_date: birth_date.as_deref().and_then(parse_date),
                    genre_id: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        artists
    };
    for artist in &artists {
        let key = ("artists", "artist_id", "name");
        if already_published(conn, key, artist.id.get(), &artist.name, report)? {
            continue;
        }
        rows::insert_artist(conn, artist)?;
        report.published.artists += 1;
    }

    let albums: Vec<Album> = {
        let mut stmt = conn.prepare(
            "SELECT album_id, title, release_date, artist_id FROM raw_albums ORDER BY rowid",
        )?;
        let albums = stmt
            .query_map([], |row| {
                Ok(Album::new(
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        albums
    };
    for album in &albums {
        let key = ("albums", "album_id", "title");
        if already_published(conn, key, album.id.get(), &album.title, report)? {
            continue;
        }
        match (&album.release_date, &album.release_date_normalized) {
            (Some(_), Some(_)) => report.dates_normalized += 1,
            (Some(raw), None) => {
                log::warn!("Album {}: cannot normalize release date {:?}", album.id, raw);
                report.dates_unparseable += 1;
            }
            (None, _) => {}
        }
        rows::insert_album(conn, album)?;
        report.published.albums += 1;
    }

    let tracks: Vec<Track> = {
        let mut stmt = conn
            .prepare("SELECT track_id, title, duration, album_id FROM raw_tracks ORDER BY rowid")?;
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
        tracks
    };
    for track in &tracks {
        let key = ("tracks", "track_id", "title");
        if already_published(conn, key, track.id.get(), &track.title, report)? {
            continue;
        }
        rows::insert_track(conn, track)?;
        report.published.tracks += 1;
    }

    Ok(())
}

/// Run the whole normalize stage in one transaction, evaluating the age
/// predicate against `today`.
pub fn normalize_store(
    db: &mut Database,
    today: NaiveDate,
) -> ledgerline_core::Result<NormalizeReport> {
    let tx = db.transaction()?;
    let mut report = NormalizeReport {
        duplicates_removed: deduplicate(&tx)?,
        blank_text_removed: trim_text(&tx)?,
        invalid_durations_removed: check_durations(&tx)?,
        underage_or_undated_removed: check_birth_dates(&tx, today)?,
        unparented_removed: drop_unparented(&tx)?,
        orphans_removed: sweep_orphans(&tx)?,
        ..NormalizeReport::default()
    };
    publish(&tx, &mut report)?;
    tx.commit()?;

    log::info!(
        "Normalize complete: {} duplicates, {} blank, {} orphaned; published {} rows ({} dates normalized, {} unparseable)",
        report.duplicates_removed,
        report.blank_text_removed,
        report.orphans_removed.total(),
        report.published.total(),
        report.dates_normalized,
        report.dates_unparseable
    );

    Ok(report)
}

/// The Normalize stage: field normalization and publication.
#[derive(Debug)]
pub struct NormalizeStage {
    db_path: PathBuf,
}

impl NormalizeStage {
    #[must_use]
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }
}

#[async_trait::async_trait]
impl Stage for NormalizeStage {
    fn name(&self) -> &str {
        "normalize"
    }

    async fn execute(
        &self,
        _item: &dyn treadle::WorkItem,
        ctx: &mut StageContext,
    ) -> treadle::Result<StageOutcome> {
        let mut db = Database::connect(&self.db_path)
            .map_err(|e| stage_failure("Opening database", e))?;

        let today = Utc::now().date_naive();
        let report = normalize_store(&mut db, today).map_err(|e| stage_failure("Normalize", e))?;

        let report_json = serde_json::to_value(&report)
            .map_err(|e| stage_failure("Serializing normalize report", e))?;
        ctx.metadata.insert("normalize".to_string(), report_json);

        Ok(StageOutcome::Complete)
    }
}
