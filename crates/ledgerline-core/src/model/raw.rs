//! Rows of the unnormalized input snapshot.
//!
//! Every field is optional: the raw data is expected to be messy, and rows
//! with missing identifiers or values are weeded out by the cleaning stages
//! rather than rejected at load time. Field aliases accept the column names
//! of the original spreadsheet-style tables (`ArtistID`, `ReleaseDate`, ...).

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawGenre {
    #[serde(default, alias = "GenreID")]
    pub genre_id: Option<i64>,
    #[serde(default, alias = "Name")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawArtist {
    #[serde(default, alias = "ArtistID")]
    pub artist_id: Option<i64>,
    #[serde(default, alias = "Name")]
    pub name: Option<String>,
    #[serde(default, alias = "BirthDate")]
    pub birth_date: Option<String>,
    #[serde(default, alias = "GenreID")]
    pub genre_id: Option<i64>,
    /// Redundant genre text, factored into the genres table.
    #[serde(default, alias = "Genre")]
    pub genre: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAlbum {
    #[serde(default, alias = "AlbumID")]
    pub album_id: Option<i64>,
    #[serde(default, alias = "Title")]
    pub title: Option<String>,
    #[serde(default, alias = "ReleaseDate")]
    pub release_date: Option<String>,
    #[serde(default, alias = "ArtistID")]
    pub artist_id: Option<i64>,
    /// Transitively dependent on the artist; dropped by normalization.
    #[serde(default, alias = "Genre")]
    pub genre: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTrack {
    #[serde(default, alias = "TrackID")]
    pub track_id: Option<i64>,
    #[serde(default, alias = "Title")]
    pub title: Option<String>,
    #[serde(default, alias = "Duration")]
    pub duration: Option<i64>,
    #[serde(default, alias = "AlbumID")]
    pub album_id: Option<i64>,
    /// Transitively dependent on the artist; dropped by normalization.
    #[serde(default, alias = "ArtistGenre")]
    pub artist_genre: Option<String>,
}

/// A complete raw snapshot, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDataset {
    #[serde(default, alias = "Genres")]
    pub genres: Vec<RawGenre>,
    #[serde(default, alias = "Artists")]
    pub artists: Vec<RawArtist>,
    #[serde(default, alias = "Albums")]
    pub albums: Vec<RawAlbum>,
    #[serde(default, alias = "Tracks")]
    pub tracks: Vec<RawTrack>,
}

impl RawDataset {
    /// Load a snapshot from a `.json` or `.toml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase());

        match extension.as_deref() {
            Some("json") => Ok(serde_json::from_str(&contents)?),
            Some("toml") => Ok(toml::from_str(&contents)?),
            _ => Err(Error::InvalidData(format!(
                "unsupported snapshot format: {} (expected .json or .toml)",
                path.display()
            ))),
        }
    }

    /// Total number of rows across all tables.
    pub fn row_count(&self) -> usize {
        self.genres.len() + self.artists.len() + self.albums.len() + self.tracks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_json_with_original_column_names() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(
            &path,
            r#"{
                "Artists": [{"ArtistID": 1, "Name": " Bob ", "Genre": "Folk"}],
                "Albums": [{"AlbumID": 10, "Title": "Songs", "ReleaseDate": "3/4/23", "ArtistID": 1}]
            }"#,
        )
        .unwrap();

        let dataset = RawDataset::load(&path).unwrap();
        assert_eq!(dataset.artists[0].name.as_deref(), Some(" Bob "));
        assert_eq!(dataset.albums[0].release_date.as_deref(), Some("3/4/23"));
        assert!(dataset.tracks.is_empty());
        assert_eq!(dataset.row_count(), 2);
    }

    #[test]
    fn test_load_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.toml");
        std::fs::write(
            &path,
            r#"
[[tracks]]
track_id = 100
title = "Intro"
duration = 61
album_id = 10
"#,
        )
        .unwrap();

        let dataset = RawDataset::load(&path).unwrap();
        assert_eq!(dataset.tracks.len(), 1);
        assert_eq!(dataset.tracks[0].duration, Some(61));
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.csv");
        std::fs::write(&path, "a,b").unwrap();

        assert!(matches!(
            RawDataset::load(&path),
            Err(Error::InvalidData(_))
        ));
    }
}
