//! Per-endpoint input checks. Each request body is first checked for JSON
//! shape, then decoded into a `garde`-annotated struct whose constraint
//! report is merged into one ordered list of violations.

use garde::Validate;
use jiff::civil::Date;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::models::{FilmChanges, FilmFields, MAX_TITLE_LEN};

const BAD_DATE: &str = "must be a valid YYYY-MM-DD date";
const BAD_ID: &str = "must be an integer greater than or equal to 1";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Path,
    Query,
    Body,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Violation {
    pub location: Location,
    pub param: String,
    pub message: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub fn push(&mut self, location: Location, param: &str, message: impl Into<String>) {
        self.0.push(Violation { location, param: param.to_string(), message: message.into() });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.0.iter()
    }
}

impl std::fmt::Display for Violations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, v) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{:?}[{}]: {}", v.location, v.param, v.message)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
enum Kind {
    Str,
    Bool,
    Int,
}

/// A body field as it appears on the wire and in the `garde` report.
struct Field {
    wire: &'static str,
    rust: &'static str,
    kind: Kind,
    nullable: bool,
}

const fn field(wire: &'static str, rust: &'static str, kind: Kind, nullable: bool) -> Field {
    Field { wire, rust, kind, nullable }
}

trait BodyRules: DeserializeOwned + Default + Validate<Context = ()> {
    const FIELDS: &'static [Field];
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateFilm {
    #[garde(required, length(chars, min = 1, max = 160))]
    title: Option<String>,
    #[garde(required)]
    favorite: Option<bool>,
    #[garde(custom(iso_date))]
    watch_date: Option<String>,
    #[garde(required, range(min = 1, max = 5))]
    rating: Option<i32>,
}

impl BodyRules for CreateFilm {
    const FIELDS: &'static [Field] = &[
        field("title", "title", Kind::Str, false),
        field("favorite", "favorite", Kind::Bool, false),
        field("watchDate", "watch_date", Kind::Str, true),
        field("rating", "rating", Kind::Int, false),
    ];
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct UpdateFilm {
    #[garde(length(chars, min = 1, max = 160))]
    title: Option<String>,
    #[garde(skip)]
    favorite: Option<bool>,
    #[garde(custom(iso_date))]
    watch_date: Option<String>,
    #[garde(range(min = 1, max = 5))]
    rating: Option<i32>,
}

impl BodyRules for UpdateFilm {
    const FIELDS: &'static [Field] = &[
        field("title", "title", Kind::Str, false),
        field("favorite", "favorite", Kind::Bool, false),
        field("watchDate", "watch_date", Kind::Str, true),
        field("rating", "rating", Kind::Int, true),
    ];
}

#[derive(Debug, Default, Deserialize, Validate)]
struct FavoriteBody {
    #[garde(required)]
    favorite: Option<bool>,
}

impl BodyRules for FavoriteBody {
    const FIELDS: &'static [Field] = &[field("favorite", "favorite", Kind::Bool, false)];
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct RatingChange {
    #[garde(required, range(min = 1))]
    id: Option<i32>,
    #[garde(required, range(min = -4, max = 4))]
    delta_rating: Option<i32>,
}

impl BodyRules for RatingChange {
    const FIELDS: &'static [Field] = &[
        field("id", "id", Kind::Int, false),
        field("deltaRating", "delta_rating", Kind::Int, false),
    ];
}

/// `GET|DELETE /films/{id}`
pub fn film_id(raw: &str) -> Result<i32, Violations> {
    let mut errors = Violations::default();
    match path_id(raw, &mut errors) {
        Some(id) => Ok(id),
        None => Err(errors),
    }
}

/// `GET /films?titleSubstring=`
pub fn search_term(raw: &str) -> Result<String, Violations> {
    let mut errors = Violations::default();
    if raw.chars().count() > MAX_TITLE_LEN {
        errors.push(
            Location::Query,
            "titleSubstring",
            format!("must be at most {MAX_TITLE_LEN} characters"),
        );
        return Err(errors);
    }
    Ok(raw.to_string())
}

/// `POST /films`
pub fn create_request(body: &Value) -> Result<FilmFields, Violations> {
    let mut errors = Violations::default();
    let req: CreateFilm = decode_body(body, &mut errors);

    match (req.title, req.favorite, req.rating, watch_date(req.watch_date.as_deref())) {
        (Some(title), Some(favorite), Some(rating), Ok(watch_date)) if errors.is_empty() => {
            Ok(FilmFields { title, favorite, watch_date, rating: Some(rating) })
        },
        _ => Err(errors),
    }
}

/// `PUT /films/{id}`. A field absent from the body is left as `None`; an
/// explicit `null` (or `""` for `watchDate`) on a nullable field clears it.
pub fn update_request(raw_id: &str, body: &Value) -> Result<(i32, FilmChanges), Violations> {
    let mut errors = Violations::default();
    let id = path_id(raw_id, &mut errors);
    let req: UpdateFilm = decode_body(body, &mut errors);

    match (id, watch_date(req.watch_date.as_deref())) {
        (Some(id), Ok(date)) if errors.is_empty() => {
            let present = |name: &str| as_object(body).contains_key(name);
            let changes = FilmChanges {
                title: req.title,
                favorite: req.favorite,
                watch_date: present("watchDate").then_some(date),
                rating: present("rating").then_some(req.rating),
            };
            Ok((id, changes))
        },
        _ => Err(errors),
    }
}

/// `PUT /films/{id}/favorite`
pub fn favorite_request(raw_id: &str, body: &Value) -> Result<(i32, bool), Violations> {
    let mut errors = Violations::default();
    let id = path_id(raw_id, &mut errors);
    let req: FavoriteBody = decode_body(body, &mut errors);

    match (id, req.favorite) {
        (Some(id), Some(favorite)) if errors.is_empty() => Ok((id, favorite)),
        _ => Err(errors),
    }
}

/// `POST /films/change-rating`, returning `(id, deltaRating)`.
pub fn rating_change_request(body: &Value) -> Result<(i32, i32), Violations> {
    let mut errors = Violations::default();
    let req: RatingChange = decode_body(body, &mut errors);

    match (req.id, req.delta_rating) {
        (Some(id), Some(delta)) if errors.is_empty() => Ok((id, delta)),
        _ => Err(errors),
    }
}

/// True when the body carries an `id` that is not the one in the URL.
pub fn body_id_conflicts(body: &Value, id: i32) -> bool {
    match as_object(body).get("id") {
        None | Some(Value::Null) => false,
        Some(value) => value.as_i64() != Some(i64::from(id)),
    }
}

/// Drops fields whose JSON type is wrong (reporting each), decodes the rest
/// and appends the `garde` report. Violations come out in `T::FIELDS` order.
fn decode_body<T: BodyRules>(body: &Value, errors: &mut Violations) -> T {
    let mut found: Vec<(usize, Violation)> = Vec::new();
    let mut clean = as_object(body).clone();

    for (idx, f) in T::FIELDS.iter().enumerate() {
        let message = match clean.get(f.wire) {
            None => continue,
            Some(Value::Null) if f.nullable => continue,
            Some(Value::Null) => "must not be null",
            Some(value) => match (f.kind, value) {
                (Kind::Str, Value::String(_)) | (Kind::Bool, Value::Bool(_)) => continue,
                (Kind::Int, v) if v.as_i64().is_some_and(|n| i32::try_from(n).is_ok()) => continue,
                (Kind::Str, _) => "must be a string",
                (Kind::Bool, _) => "must be a boolean",
                (Kind::Int, _) => "must be an integer",
            },
        };
        clean.remove(f.wire);
        found.push((idx, body_violation(f.wire, message)));
    }

    let req = match serde_json::from_value::<T>(Value::Object(clean)) {
        Ok(req) => req,
        Err(err) => {
            errors.push(Location::Body, "body", err.to_string());
            return T::default();
        },
    };

    if let Err(report) = req.validate() {
        for (path, error) in report.iter() {
            let rust = path.to_string();
            let Some(idx) = T::FIELDS.iter().position(|f| f.rust == rust) else {
                found.push((T::FIELDS.len(), body_violation(&rust, error.to_string())));
                continue;
            };
            // A field already reported for its JSON type reads as missing here.
            if found.iter().any(|(i, _)| *i == idx) {
                continue;
            }
            found.push((idx, body_violation(T::FIELDS[idx].wire, error.to_string())));
        }
    }

    found.sort_by_key(|(idx, _)| *idx);
    errors.0.extend(found.into_iter().map(|(_, v)| v));
    req
}

fn body_violation(param: &str, message: impl Into<String>) -> Violation {
    Violation { location: Location::Body, param: param.to_string(), message: message.into() }
}

fn as_object(body: &Value) -> &Map<String, Value> {
    static EMPTY: std::sync::LazyLock<Map<String, Value>> = std::sync::LazyLock::new(Map::new);
    body.as_object().unwrap_or(&EMPTY)
}

fn path_id(raw: &str, errors: &mut Violations) -> Option<i32> {
    match raw.trim().parse::<i32>() {
        Ok(id) if id >= 1 => Some(id),
        _ => {
            errors.push(Location::Path, "id", BAD_ID);
            None
        },
    }
}

/// `None` for an omitted or empty date; otherwise exactly `YYYY-MM-DD`.
fn watch_date(raw: Option<&str>) -> Result<Option<Date>, garde::Error> {
    match raw {
        None | Some("") => Ok(None),
        Some(s) if s.len() == 10 => {
            s.parse::<Date>().map(Some).map_err(|_| garde::Error::new(BAD_DATE))
        },
        Some(_) => Err(garde::Error::new(BAD_DATE)),
    }
}

fn iso_date(value: &Option<String>, _ctx: &()) -> garde::Result {
    watch_date(value.as_deref()).map(|_| ())
}
