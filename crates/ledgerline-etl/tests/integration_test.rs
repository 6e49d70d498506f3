//! Integration tests for the full schema → clean → normalize → guard pipeline.
//!
//! These run against on-disk stores so that the workflow stages, which each
//! open their own connection, see the same data.

use chrono::NaiveDate;
use ledgerline_core::model::{
    Album, Artist, ArtistId, Operation, RawAlbum, RawArtist, RawDataset, RawGenre, RawTrack,
};
use ledgerline_core::schema::Database;
use ledgerline_core::Error;
use ledgerline_etl::{build_pipeline, Migration, MigrationJob};
use tempfile::TempDir;

fn processing_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

/// A messy snapshot exercising every cleaning rule.
fn messy_snapshot() -> RawDataset {
    RawDataset {
        genres: vec![
            RawGenre {
                genre_id: Some(1),
                name: Some("Jazz".into()),
            },
            RawGenre {
                genre_id: Some(2),
                name: Some("   ".into()),
            },
        ],
        artists: vec![
            RawArtist {
                artist_id: Some(1),
                name: Some(" Miles ".into()),
                birth_date: Some("1926-05-26".into()),
                genre_id: Some(1),
                ..Default::default()
            },
            RawArtist {
                artist_id: Some(1),
                name: Some("Duplicate Miles".into()),
                ..Default::default()
            },
            RawArtist {
                artist_id: Some(2),
                name: Some("Kid".into()),
                birth_date: Some("2015-01-01".into()),
                ..Default::default()
            },
            RawArtist {
                artist_id: Some(3),
                name: Some("Dangling Genre".into()),
                genre_id: Some(99),
                ..Default::default()
            },
            RawArtist {
                artist_id: Some(4),
                name: Some("Factored".into()),
                genre: Some(" jazz".into()),
                ..Default::default()
            },
        ],
        albums: vec![
            RawAlbum {
                album_id: Some(10),
                title: Some("Kind of Blue".into()),
                release_date: Some("8/17/59".into()),
                artist_id: Some(1),
                ..Default::default()
            },
            RawAlbum {
                album_id: Some(11),
                title: Some("By a Minor".into()),
                release_date: Some("3/4/23".into()),
                artist_id: Some(2),
                ..Default::default()
            },
            RawAlbum {
                album_id: Some(12),
                title: Some("Nobody's".into()),
                artist_id: Some(500),
                ..Default::default()
            },
        ],
        tracks: vec![
            RawTrack {
                track_id: Some(100),
                title: Some("So What".into()),
                duration: Some(562),
                album_id: Some(10),
                ..Default::default()
            },
            RawTrack {
                track_id: Some(101),
                title: Some("Minor Track".into()),
                duration: Some(100),
                album_id: Some(11),
                ..Default::default()
            },
            RawTrack {
                track_id: Some(102),
                title: Some("Silent".into()),
                duration: Some(0),
                album_id: Some(10),
                ..Default::default()
            },
        ],
    }
}

fn migrated(dir: &TempDir) -> Database {
    let mut db = Database::open(dir.path().join("store.db")).unwrap();
    db.load_raw(&messy_snapshot()).unwrap();
    Migration::new(processing_day()).run(&mut db).unwrap();
    db
}

#[test]
fn test_migration_keeps_only_consistent_rows() {
    let dir = TempDir::new().unwrap();
    let db = migrated(&dir);

    let artists: Vec<(i64, String)> = db
        .list_artists()
        .unwrap()
        .into_iter()
        .map(|a| (a.id.get(), a.name))
        .collect();
    assert_eq!(
        artists,
        vec![
            (1, "Miles".to_string()),
            (4, "Factored".to_string()),
        ]
    );

    let albums = db.list_albums().unwrap();
    assert_eq!(albums.len(), 1);
    assert_eq!(
        albums[0].release_date_normalized.as_deref(),
        Some("1959-08-17")
    );

    let tracks = db.list_tracks().unwrap();
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].title, "So What");
}

#[test]
fn test_dangling_genre_link_is_removed_and_text_genre_factored() {
    let dir = TempDir::new().unwrap();
    let db = migrated(&dir);

    // A dangling reference drops the artist, not just the link.
    assert!(db.get_artist(ArtistId::new(3)).unwrap().is_none());

    let factored = db.get_artist(ArtistId::new(4)).unwrap().unwrap();
    assert_eq!(factored.genre_id.map(|g| g.get()), Some(1));
}

#[test]
fn test_referential_closure_after_migration() {
    let dir = TempDir::new().unwrap();
    let db = migrated(&dir);

    let orphans: i64 = db
        .conn()
        .query_row(
            "SELECT
                (SELECT COUNT(*) FROM albums WHERE artist_id NOT IN (SELECT artist_id FROM artists))
              + (SELECT COUNT(*) FROM tracks WHERE album_id NOT IN (SELECT album_id FROM albums))
              + (SELECT COUNT(*) FROM artists
                 WHERE genre_id IS NOT NULL AND genre_id NOT IN (SELECT genre_id FROM genres))",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(orphans, 0);
}

#[test]
fn test_rerunning_migration_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let mut db = migrated(&dir);
    let before = (
        db.count("artists").unwrap(),
        db.count("albums").unwrap(),
        db.count("tracks").unwrap(),
    );

    let report = Migration::new(processing_day()).run(&mut db).unwrap();

    assert!(report.schema.applied.is_empty());
    assert_eq!(report.normalize.published.total(), 0);
    assert!(report.guard.installed.is_empty());
    assert_eq!(
        before,
        (
            db.count("artists").unwrap(),
            db.count("albums").unwrap(),
            db.count("tracks").unwrap(),
        )
    );
    assert_eq!(db.count("operation_log").unwrap(), 0);
}

#[test]
fn test_guards_hold_after_migration() {
    let dir = TempDir::new().unwrap();
    let db = migrated(&dir);
    let albums_before = db.count("albums").unwrap();

    let err = db
        .insert_album(&Album::new(77, "Phantom", None, 12345))
        .unwrap_err();
    assert!(matches!(err, Error::IntegrityViolation(ref m) if m == "Invalid ArtistID"));
    assert_eq!(db.count("albums").unwrap(), albums_before);
    assert_eq!(db.count("operation_log").unwrap(), 0);

    db.insert_artist(&Artist::new(50, "Newcomer")).unwrap();
    let log = db.recent_log_entries(5).unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].operation, Operation::Insert);
    assert_eq!(log[0].table_name, "Artists");
    assert_eq!(log[0].record_id, 50);
}

#[test]
fn test_reloaded_snapshot_gets_fresh_genre_ids() {
    let dir = TempDir::new().unwrap();
    let mut db = migrated(&dir);
    db.clear_raw().unwrap();
    db.load_raw(&RawDataset {
        artists: vec![
            RawArtist {
                artist_id: Some(9),
                name: Some("Bessie".into()),
                genre: Some("Blues".into()),
                ..Default::default()
            },
            RawArtist {
                artist_id: Some(10),
                name: Some("Coltrane".into()),
                genre: Some("JAZZ".into()),
                ..Default::default()
            },
        ],
        ..Default::default()
    })
    .unwrap();

    let report = Migration::new(processing_day()).run(&mut db).unwrap();
    assert_eq!(report.normalize.id_conflicts, 0);

    let genres: Vec<(i64, String)> = db
        .list_genres()
        .unwrap()
        .into_iter()
        .map(|g| (g.id.get(), g.name))
        .collect();
    assert_eq!(
        genres,
        vec![(1, "Jazz".to_string()), (2, "Blues".to_string())]
    );

    let bessie = db.get_artist(ArtistId::new(9)).unwrap().unwrap();
    assert_eq!(bessie.genre_id.map(|g| g.get()), Some(2));
    let coltrane = db.get_artist(ArtistId::new(10)).unwrap().unwrap();
    assert_eq!(coltrane.genre_id.map(|g| g.get()), Some(1));
}

#[tokio::test]
async fn test_workflow_runs_all_stages() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("store.db");
    {
        let mut db = Database::open(&db_path).unwrap();
        db.load_raw(&messy_snapshot()).unwrap();
    }

    let workflow = build_pipeline(db_path.clone()).unwrap();
    let mut store = treadle::SqliteStateStore::open(&dir.path().join("pipeline.db"))
        .await
        .unwrap();
    let job = MigrationJob::new(db_path.clone());

    workflow.advance(&job, &mut store).await.unwrap();

    let db = Database::connect(&db_path).unwrap();
    assert_eq!(db.count("albums").unwrap(), 1);
    assert_eq!(db.count("tracks").unwrap(), 1);
    assert_eq!(db.triggers().unwrap().len(), 7);
}
