use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::model::ids::{ArtistId, GenreId};

/// Minimum age, in years, an artist must have reached at processing time.
pub const MINIMUM_ARTIST_AGE: u32 = 18;

/// Storage format for calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A performing artist in the normalized catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: ArtistId,

    /// Display name, always trimmed and non-empty.
    pub name: String,

    pub birth_date: Option<NaiveDate>,

    /// Genre is reachable only through the artist.
    pub genre_id: Option<GenreId>,
}

impl Artist {
    #[must_use]
    pub fn new(id: impl Into<ArtistId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            birth_date: None,
            genre_id: None,
        }
    }

    #[must_use]
    pub fn with_birth_date(mut self, birth_date: NaiveDate) -> Self {
        self.birth_date = Some(birth_date);
        self
    }

    #[must_use]
    pub fn with_genre(mut self, genre_id: impl Into<GenreId>) -> Self {
        self.genre_id = Some(genre_id.into());
        self
    }

    /// Whether the artist satisfies the age predicate on `today`.
    ///
    /// An unknown birth date passes; the predicate only constrains known
    /// dates.
    pub fn is_of_age(&self, today: NaiveDate) -> bool {
        self.birth_date
            .map_or(true, |born| is_adult(born, today))
    }
}

/// `true` when someone born on `birth_date` is at least
/// [`MINIMUM_ARTIST_AGE`] years old on `today`.
pub fn is_adult(birth_date: NaiveDate, today: NaiveDate) -> bool {
    today
        .checked_sub_months(Months::new(MINIMUM_ARTIST_AGE * 12))
        .is_some_and(|cutoff| birth_date <= cutoff)
}

/// Parse a stored `YYYY-MM-DD` date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_artist_builder() {
        let artist = Artist::new(1, "Nina Simone")
            .with_birth_date(date(1933, 2, 21))
            .with_genre(3);

        assert_eq!(artist.name, "Nina Simone");
        assert_eq!(artist.genre_id, Some(GenreId::new(3)));
    }

    #[test]
    fn test_is_adult_boundary() {
        let today = date(2024, 6, 15);
        assert!(is_adult(date(2006, 6, 15), today));
        assert!(!is_adult(date(2006, 6, 16), today));
    }

    #[test]
    fn test_unknown_birth_date_is_of_age() {
        let artist = Artist::new(1, "Anonymous");
        assert!(artist.is_of_age(date(2024, 1, 1)));
    }

    #[test]
    fn test_age_is_evaluated_against_the_given_day() {
        let artist = Artist::new(1, "Prodigy").with_birth_date(date(2010, 1, 1));
        assert!(!artist.is_of_age(date(2027, 12, 31)));
        assert!(artist.is_of_age(date(2028, 1, 1)));
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date(" 1970-01-02 "), Some(date(1970, 1, 2)));
        assert_eq!(parse_date("02/01/70"), None);
    }
}
