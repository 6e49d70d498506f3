use serde::{Deserialize, Serialize};

use crate::model::ids::{AlbumId, TrackId};

/// A track on an album.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,

    /// Length in seconds; always positive.
    pub duration: i64,

    pub album_id: AlbumId,
}

impl Track {
    #[must_use]
    pub fn new(
        id: impl Into<TrackId>,
        title: impl Into<String>,
        duration: i64,
        album_id: impl Into<AlbumId>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            duration,
            album_id: album_id.into(),
        }
    }
}
