use serde::{Deserialize, Serialize};

use crate::model::ids::{AlbumId, ArtistId};
use crate::normalize::normalize_release_date;

/// An album, owned by exactly one artist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: AlbumId,
    pub title: String,

    /// Release date exactly as it appeared in the source data.
    pub release_date: Option<String>,

    /// Canonical `YYYY-MM-DD` form of `release_date`, when it could be derived.
    pub release_date_normalized: Option<String>,

    pub artist_id: ArtistId,
}

impl Album {
    /// Build an album, deriving the normalized release date from the raw one.
    #[must_use]
    pub fn new(
        id: impl Into<AlbumId>,
        title: impl Into<String>,
        release_date: Option<String>,
        artist_id: impl Into<ArtistId>,
    ) -> Self {
        let release_date_normalized = normalize_release_date(release_date.as_deref());
        Self {
            id: id.into(),
            title: title.into(),
            release_date,
            release_date_normalized,
            artist_id: artist_id.into(),
        }
    }
}
