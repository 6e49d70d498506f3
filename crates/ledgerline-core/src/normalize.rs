//! Pure field normalization rules.
//!
//! These functions hold no store state so that the cleaning stages and the
//! tests can share exactly the same rules.

/// Two-digit years below this value are read as 20xx, the rest as 19xx.
pub const DATE_PIVOT_YEAR: u32 = 24;

/// Convert a `month/day/yy` release date to `YYYY-MM-DD`.
///
/// Returns `None` when the last two characters are not a numeric year token
/// or when there is no day segment. Month and day are zero-padded to two
/// digits but are otherwise taken verbatim, so `13/45/99` still yields
/// `1999-13-45`.
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let year_token = raw.get(raw.len().checked_sub(2)?..)?;
    if !year_token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let short_year: u32 = year_token.parse().ok()?;
    let full_year = if short_year < DATE_PIVOT_YEAR {
        2000 + short_year
    } else {
        1900 + short_year
    };

    let mut segments = raw.split('/');
    let month = segments.next()?;
    let day = segments.next()?;

    Some(format!("{full_year}-{month:0>2}-{day:0>2}"))
}

/// [`normalize_date`] lifted over a nullable column.
pub fn normalize_release_date(raw: Option<&str>) -> Option<String> {
    raw.and_then(normalize_date)
}

/// Trim a free-text field; blank or missing values become `None`.
pub fn normalize_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_below_pivot_is_2000s() {
        assert_eq!(normalize_date("3/4/23").as_deref(), Some("2023-03-04"));
    }

    #[test]
    fn test_pivot_year_is_1900s() {
        assert_eq!(normalize_date("3/4/24").as_deref(), Some("1924-03-04"));
    }

    #[test]
    fn test_two_digit_month_and_day_kept() {
        assert_eq!(normalize_date("12/31/99").as_deref(), Some("1999-12-31"));
    }

    #[test]
    fn test_year_zero() {
        assert_eq!(normalize_date("1/1/00").as_deref(), Some("2000-01-01"));
    }

    #[test]
    fn test_null_stays_null() {
        assert_eq!(normalize_release_date(None), None);
    }

    #[test]
    fn test_non_numeric_tail_is_rejected() {
        assert_eq!(normalize_date("not-a-date"), None);
        assert_eq!(normalize_date("3/4/2x"), None);
    }

    #[test]
    fn test_too_short_input_is_rejected() {
        assert_eq!(normalize_date(""), None);
        assert_eq!(normalize_date("7"), None);
    }

    #[test]
    fn test_missing_day_segment_is_rejected() {
        assert_eq!(normalize_date("1999"), None);
    }

    #[test]
    fn test_no_calendar_validation() {
        assert_eq!(normalize_date("13/45/99").as_deref(), Some("1999-13-45"));
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        assert_eq!(normalize_date(" 6/1/85 ").as_deref(), Some("1985-06-01"));
    }

    #[test]
    fn test_multibyte_tail_does_not_panic() {
        assert_eq!(normalize_date("3/4/é"), None);
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text(Some(" Bob ")).as_deref(), Some("Bob"));
        assert_eq!(normalize_text(Some("  ")), None);
        assert_eq!(normalize_text(None), None);
    }
}
