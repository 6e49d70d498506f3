use serde::{Deserialize, Serialize};

use crate::model::ids::GenreId;

/// A genre, referenced by artists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
}

impl Genre {
    #[must_use]
    pub fn new(id: impl Into<GenreId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}
