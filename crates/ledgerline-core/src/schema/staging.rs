use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::RawDataset;

use super::Database;

/// Row counts of the raw staging tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCounts {
    pub genres: i64,
    pub artists: i64,
    pub albums: i64,
    pub tracks: i64,
}

impl RawCounts {
    pub fn total(&self) -> i64 {
        self.genres + self.artists + self.albums + self.tracks
    }
}

// Raw snapshot staging
impl Database {
    /// Append a snapshot to the staging tables, in file order.
    ///
    /// All rows are written in one transaction. Returns the number of rows
    /// loaded.
    pub fn load_raw(&mut self, dataset: &RawDataset) -> Result<usize> {
        let tx = self.transaction()?;
        {
            let mut stmt = tx.prepare("INSERT INTO raw_genres (genre_id, name) VALUES (?1, ?2)")?;
            for genre in &dataset.genres {
                stmt.execute(rusqlite::params![genre.genre_id, genre.name])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO raw_artists (artist_id, name, birth_date, genre_id, genre)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for artist in &dataset.artists {
                stmt.execute(rusqlite::params![
                    artist.artist_id,
                    artist.name,
                    artist.birth_date,
                    artist.genre_id,
                    artist.genre,
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO raw_albums (album_id, title, release_date, artist_id, genre)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for album in &dataset.albums {
                stmt.execute(rusqlite::params![
                    album.album_id,
                    album.title,
                    album.release_date,
                    album.artist_id,
                    album.genre,
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO raw_tracks (track_id, title, duration, album_id, artist_genre)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for track in &dataset.tracks {
                stmt.execute(rusqlite::params![
                    track.track_id,
                    track.title,
                    track.duration,
                    track.album_id,
                    track.artist_genre,
                ])?;
            }
        }
        tx.commit()?;

        let loaded = dataset.row_count();
        log::info!("Loaded {} raw rows into staging", loaded);
        Ok(loaded)
    }

    /// Empty every staging table.
    pub fn clear_raw(&self) -> Result<()> {
        self.conn().execute_batch(
            "DELETE FROM raw_tracks;
             DELETE FROM raw_albums;
             DELETE FROM raw_artists;
             DELETE FROM raw_genres;",
        )?;
        Ok(())
    }

    pub fn raw_counts(&self) -> Result<RawCounts> {
        Ok(RawCounts {
            genres: self.count("raw_genres")?,
            artists: self.count("raw_artists")?,
            albums: self.count("raw_albums")?,
            tracks: self.count("raw_tracks")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RawAlbum, RawArtist};

    #[test]
    fn test_load_raw_keeps_duplicates() {
        let mut db = Database::open_in_memory().unwrap();
        let artist = RawArtist {
            artist_id: Some(1),
            name: Some("Bob".into()),
            ..Default::default()
        };
        let dataset = RawDataset {
            artists: vec![artist.clone(), artist],
            albums: vec![RawAlbum {
                album_id: Some(5),
                artist_id: Some(1),
                ..Default::default()
            }],
            ..Default::default()
        };

        assert_eq!(db.load_raw(&dataset).unwrap(), 3);
        let counts = db.raw_counts().unwrap();
        assert_eq!(counts.artists, 2);
        assert_eq!(counts.albums, 1);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_clear_raw() {
        let mut db = Database::open_in_memory().unwrap();
        let dataset = RawDataset {
            artists: vec![RawArtist::default()],
            ..Default::default()
        };
        db.load_raw(&dataset).unwrap();
        db.clear_raw().unwrap();
        assert_eq!(db.raw_counts().unwrap().total(), 0);
    }
}
