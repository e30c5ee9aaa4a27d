use std::{fmt, str::FromStr};

use jiff::civil::Date;
use serde::{Serialize, Serializer};

pub const MAX_TITLE_LEN: usize = 160;
pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

/// A film as returned over the wire. An unseen film serializes `watchDate`
/// as `""` and an unrated one serializes `rating` as `0`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Film {
    pub id: i32,
    pub title: String,
    pub favorite: bool,
    #[serde(serialize_with = "empty_if_unseen")]
    pub watch_date: Option<Date>,
    #[serde(serialize_with = "zero_if_unrated")]
    pub rating: Option<i32>,
}

/// The four mutable fields, as written by create and full update.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FilmFields {
    pub title: String,
    pub favorite: bool,
    pub watch_date: Option<Date>,
    pub rating: Option<i32>,
}

impl From<Film> for FilmFields {
    fn from(film: Film) -> Self {
        Self {
            title: film.title,
            favorite: film.favorite,
            watch_date: film.watch_date,
            rating: film.rating,
        }
    }
}

/// Fields supplied to a full update. `None` keeps the stored value; for the
/// nullable fields `Some(None)` clears it.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FilmChanges {
    pub title: Option<String>,
    pub favorite: Option<bool>,
    pub watch_date: Option<Option<Date>>,
    pub rating: Option<Option<i32>>,
}

impl FilmChanges {
    pub fn merge_into(self, stored: Film) -> FilmFields {
        FilmFields {
            title: self.title.unwrap_or(stored.title),
            favorite: self.favorite.unwrap_or(stored.favorite),
            watch_date: self.watch_date.unwrap_or(stored.watch_date),
            rating: self.rating.unwrap_or(stored.rating),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum FilterKind {
    #[default]
    All,
    Favorite,
    Best,
    LastMonth,
    Unseen,
}

impl FilterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterKind::All => "all",
            FilterKind::Favorite => "favorite",
            FilterKind::Best => "best",
            FilterKind::LastMonth => "lastmonth",
            FilterKind::Unseen => "unseen",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
#[error("invalid filter '{0}'")]
pub struct InvalidFilter(pub String);

impl FromStr for FilterKind {
    type Err = InvalidFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(FilterKind::All),
            "favorite" => Ok(FilterKind::Favorite),
            "best" => Ok(FilterKind::Best),
            "lastmonth" => Ok(FilterKind::LastMonth),
            "unseen" => Ok(FilterKind::Unseen),
            _ => Err(InvalidFilter(s.to_string())),
        }
    }
}

fn empty_if_unseen<S: Serializer>(date: &Option<Date>, s: S) -> Result<S::Ok, S::Error> {
    match date {
        Some(date) => s.collect_str(date),
        None => s.serialize_str(""),
    }
}

fn zero_if_unrated<S: Serializer>(rating: &Option<i32>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i32(rating.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;
    use serde_json::json;

    use super::*;

    #[test]
    fn unset_fields_use_wire_sentinels() {
        let film = Film {
            id: 4,
            title: "Matrix".to_string(),
            favorite: false,
            watch_date: None,
            rating: None,
        };
        assert_eq!(
            serde_json::to_value(&film).unwrap(),
            json!({"id": 4, "title": "Matrix", "favorite": false, "watchDate": "", "rating": 0})
        );
    }

    #[test]
    fn watch_date_serializes_as_iso_date() {
        let film = Film {
            id: 1,
            title: "Pulp Fiction".to_string(),
            favorite: true,
            watch_date: Some(date(2023, 3, 10)),
            rating: Some(5),
        };
        let value = serde_json::to_value(&film).unwrap();
        assert_eq!(value["watchDate"], "2023-03-10");
        assert_eq!(value["rating"], 5);
    }

    #[test]
    fn filter_parsing_is_case_insensitive_and_rejects_unknowns() {
        assert_eq!("LastMonth".parse::<FilterKind>().unwrap(), FilterKind::LastMonth);
        assert_eq!("best".parse::<FilterKind>().unwrap(), FilterKind::Best);
        assert_eq!(
            "recent".parse::<FilterKind>().unwrap_err(),
            InvalidFilter("recent".to_string())
        );
    }

    #[test]
    fn merge_keeps_stored_values_for_absent_fields() {
        let stored = Film {
            id: 2,
            title: "21 Grams".to_string(),
            favorite: true,
            watch_date: Some(date(2023, 3, 17)),
            rating: Some(4),
        };
        let changes = FilmChanges {
            title: Some("21 Grams (2003)".to_string()),
            rating: Some(None),
            ..Default::default()
        };

        let merged = changes.merge_into(stored);
        assert_eq!(merged.title, "21 Grams (2003)");
        assert!(merged.favorite);
        assert_eq!(merged.watch_date, Some(date(2023, 3, 17)));
        assert_eq!(merged.rating, None);
    }
}
