use jiff::{ToSpan, civil::Date};
use sea_orm::{DbErr, Value};
use tracing::{debug, warn};

use crate::{
    entities::film,
    models::{Film, FilmFields, FilterKind, MAX_RATING},
    store::FilmStore,
};

const SELECT_FILMS: &str = "SELECT * FROM films";

/// Maps film operations onto [`FilmStore`] queries. Holds no state of its own:
/// every write is followed by a fresh read.
#[derive(Clone)]
pub struct FilmRepository {
    store: FilmStore,
}

impl FilmRepository {
    pub fn new(store: FilmStore) -> Self {
        Self { store }
    }

    #[cfg(test)]
    pub fn store(&self) -> &FilmStore {
        &self.store
    }

    pub async fn list(&self, filter: FilterKind) -> Result<Vec<Film>, DbErr> {
        let today: Date = jiff::Zoned::now().into();
        self.list_as_of(filter, today).await
    }

    /// `LastMonth` keeps films watched on or after the same day one month
    /// before `today`.
    pub async fn list_as_of(&self, filter: FilterKind, today: Date) -> Result<Vec<Film>, DbErr> {
        let (sql, params): (String, Vec<Value>) = match filter {
            FilterKind::All => (format!("{SELECT_FILMS} ORDER BY id"), vec![]),
            FilterKind::Favorite => {
                (format!("{SELECT_FILMS} WHERE favorite = ? ORDER BY id"), vec![true.into()])
            },
            FilterKind::Best => {
                (format!("{SELECT_FILMS} WHERE rating = ? ORDER BY id"), vec![MAX_RATING.into()])
            },
            FilterKind::LastMonth => {
                let cutoff = today
                    .checked_sub(1.month())
                    .map_err(|e| DbErr::Custom(format!("lastmonth cutoff: {e}")))?;
                (
                    format!(
                        "{SELECT_FILMS} WHERE watch_date IS NOT NULL AND length(watch_date) = 10 \
                         AND watch_date >= ? ORDER BY id"
                    ),
                    vec![cutoff.to_string().into()],
                )
            },
            FilterKind::Unseen => (
                format!(
                    "{SELECT_FILMS} WHERE watch_date IS NULL OR date(watch_date) IS NOT watch_date \
                     ORDER BY id"
                ),
                vec![],
            ),
        };

        debug!(filter = %filter, "listing films");
        let rows = self.store.all(&sql, params).await?;
        let mut films: Vec<Film> = rows.into_iter().map(film_from_row).collect();
        // Date filters must agree with what the rows read back as.
        match filter {
            FilterKind::LastMonth => films.retain(|f| f.watch_date.is_some()),
            FilterKind::Unseen => films.retain(|f| f.watch_date.is_none()),
            _ => {},
        }
        Ok(films)
    }

    pub async fn search(&self, title_substring: &str) -> Result<Vec<Film>, DbErr> {
        let pattern = format!("%{}%", escape_like(title_substring));
        let rows = self
            .store
            .all(&format!("{SELECT_FILMS} WHERE title LIKE ? ESCAPE '\\' ORDER BY id"), [
                pattern.into(),
            ])
            .await?;
        Ok(rows.into_iter().map(film_from_row).collect())
    }

    pub async fn get(&self, id: i32) -> Result<Option<Film>, DbErr> {
        let row = self.store.one(&format!("{SELECT_FILMS} WHERE id = ?"), [id.into()]).await?;
        Ok(row.map(film_from_row))
    }

    pub async fn create(&self, fields: FilmFields) -> Result<Film, DbErr> {
        let outcome = self
            .store
            .execute(
                "INSERT INTO films (title, favorite, watch_date, rating) VALUES (?, ?, ?, ?)",
                field_params(fields),
            )
            .await?;

        debug!(id = outcome.inserted_id, "created film");
        self.get(outcome.inserted_id).await?.ok_or_else(|| {
            DbErr::RecordNotFound(format!("film {} vanished after insert", outcome.inserted_id))
        })
    }

    pub async fn update(&self, id: i32, fields: FilmFields) -> Result<Option<Film>, DbErr> {
        let mut params = field_params(fields);
        params.push(id.into());
        let outcome = self
            .store
            .execute(
                "UPDATE films SET title = ?, favorite = ?, watch_date = ?, rating = ? WHERE id = ?",
                params,
            )
            .await?;

        if outcome.affected != 1 {
            return Ok(None);
        }
        self.get(id).await
    }

    /// Applies the delta in a single statement. Range checks belong to the caller.
    pub async fn adjust_rating(&self, id: i32, delta: i32) -> Result<Option<Film>, DbErr> {
        let outcome = self
            .store
            .execute("UPDATE films SET rating = rating + ? WHERE id = ?", [delta.into(), id.into()])
            .await?;

        if outcome.affected != 1 {
            return Ok(None);
        }
        self.get(id).await
    }

    pub async fn delete(&self, id: i32) -> Result<u64, DbErr> {
        let outcome = self.store.execute("DELETE FROM films WHERE id = ?", [id.into()]).await?;
        debug!(id, affected = outcome.affected, "deleted film");
        Ok(outcome.affected)
    }
}

fn field_params(fields: FilmFields) -> Vec<Value> {
    vec![
        fields.title.into(),
        fields.favorite.into(),
        fields.watch_date.map(|d| d.to_string()).into(),
        fields.rating.into(),
    ]
}

fn film_from_row(row: film::Model) -> Film {
    let watch_date = row.watch_date.filter(|s| !s.is_empty()).and_then(|s| match s.parse::<Date>() {
        Ok(date) => Some(date),
        Err(err) => {
            warn!(id = row.id, value = %s, error = %err, "ignoring unparsable watch date");
            None
        },
    });

    Film {
        id: row.id,
        title: row.title,
        favorite: row.favorite,
        watch_date,
        rating: row.rating.filter(|r| *r != 0),
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;
    use crate::store::tests::memory_store;

    fn fields(title: &str, favorite: bool, watch_date: Option<Date>, rating: Option<i32>) -> FilmFields {
        FilmFields { title: title.to_string(), favorite, watch_date, rating }
    }

    async fn repo_with_library(today: Date) -> FilmRepository {
        let repo = FilmRepository::new(memory_store().await);
        let recent = today.checked_sub(3.days()).unwrap();
        let old = today.checked_sub(6.months()).unwrap();

        repo.create(fields("Pulp Fiction", true, Some(old), Some(5))).await.unwrap();
        repo.create(fields("21 Grams", true, Some(recent), Some(4))).await.unwrap();
        repo.create(fields("Star Wars", false, None, None)).await.unwrap();
        repo.create(fields("Matrix", false, None, Some(5))).await.unwrap();
        repo.create(fields("Shrek", false, Some(today), Some(2))).await.unwrap();
        repo
    }

    fn titles(films: &[Film]) -> Vec<&str> {
        films.iter().map(|f| f.title.as_str()).collect()
    }

    #[tokio::test]
    async fn create_returns_stored_film_with_fresh_id() {
        let repo = FilmRepository::new(memory_store().await);
        let a = repo.create(fields("Matrix", false, None, Some(4))).await.unwrap();
        let b = repo.create(fields("Heat", true, Some(date(2024, 2, 9)), Some(3))).await.unwrap();

        assert!(a.id >= 1);
        assert_ne!(a.id, b.id);
        assert_eq!(repo.get(b.id).await.unwrap(), Some(b.clone()));
        assert_eq!(FilmFields::from(b), fields("Heat", true, Some(date(2024, 2, 9)), Some(3)));
    }

    #[tokio::test]
    async fn filters_select_exact_subsets() {
        let today = date(2024, 5, 20);
        let repo = repo_with_library(today).await;

        let all = repo.list_as_of(FilterKind::All, today).await.unwrap();
        assert_eq!(all.len(), 5);

        let favorite = repo.list_as_of(FilterKind::Favorite, today).await.unwrap();
        assert_eq!(titles(&favorite), ["Pulp Fiction", "21 Grams"]);

        let best = repo.list_as_of(FilterKind::Best, today).await.unwrap();
        assert_eq!(titles(&best), ["Pulp Fiction", "Matrix"]);

        let unseen = repo.list_as_of(FilterKind::Unseen, today).await.unwrap();
        assert_eq!(titles(&unseen), ["Star Wars", "Matrix"]);

        let last_month = repo.list_as_of(FilterKind::LastMonth, today).await.unwrap();
        assert_eq!(titles(&last_month), ["21 Grams", "Shrek"]);
    }

    #[tokio::test]
    async fn search_matches_substring_literally() {
        let repo = FilmRepository::new(memory_store().await);
        repo.create(fields("Star Wars", false, None, None)).await.unwrap();
        repo.create(fields("100% Wolf", false, None, None)).await.unwrap();
        repo.create(fields("Wall_E", false, None, None)).await.unwrap();

        assert_eq!(titles(&repo.search("war").await.unwrap()), ["Star Wars"]);
        assert_eq!(titles(&repo.search("%").await.unwrap()), ["100% Wolf"]);
        assert_eq!(titles(&repo.search("l_").await.unwrap()), ["Wall_E"]);
        assert!(repo.search("Shrek").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_replaces_fields_or_reports_missing() {
        let repo = FilmRepository::new(memory_store().await);
        let film = repo.create(fields("Matrix", false, None, Some(4))).await.unwrap();

        let updated = repo
            .update(film.id, fields("The Matrix", true, Some(date(2024, 1, 2)), None))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, film.id);
        assert_eq!(updated.title, "The Matrix");
        assert!(updated.favorite);
        assert_eq!(updated.rating, None);

        assert_eq!(repo.update(film.id + 100, fields("x", false, None, None)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn adjust_rating_applies_delta_in_store() {
        let repo = FilmRepository::new(memory_store().await);
        let film = repo.create(fields("Shrek", false, None, Some(2))).await.unwrap();

        let adjusted = repo.adjust_rating(film.id, 2).await.unwrap().unwrap();
        assert_eq!(adjusted.rating, Some(4));

        assert_eq!(repo.adjust_rating(film.id + 1, 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let repo = FilmRepository::new(memory_store().await);
        let film = repo.create(fields("Shrek", false, None, Some(2))).await.unwrap();

        assert_eq!(repo.delete(film.id).await.unwrap(), 1);
        assert_eq!(repo.delete(film.id).await.unwrap(), 0);
        assert_eq!(repo.get(film.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn legacy_sentinels_normalize_to_unset() {
        let repo = FilmRepository::new(memory_store().await);
        let outcome = repo
            .store()
            .execute(
                "INSERT INTO films (title, favorite, watch_date, rating) VALUES (?, ?, ?, ?)",
                ["Old".into(), false.into(), "".into(), 0.into()],
            )
            .await
            .unwrap();
        repo.store()
            .execute(
                "INSERT INTO films (title, favorite, watch_date) VALUES (?, ?, ?)",
                ["Garbled".into(), false.into(), "someday".into()],
            )
            .await
            .unwrap();

        let old = repo.get(outcome.inserted_id).await.unwrap().unwrap();
        assert_eq!(old.watch_date, None);
        assert_eq!(old.rating, None);

        let unseen = repo.list(FilterKind::Unseen).await.unwrap();
        assert_eq!(titles(&unseen), ["Old", "Garbled"]);
    }

    #[tokio::test]
    async fn corrupt_dates_count_as_unseen_not_recent() {
        let today = date(2024, 5, 20);
        let repo = FilmRepository::new(memory_store().await);
        for (title, raw) in [("Impossible", "9999-99-99"), ("Leap", "2024-02-30"), ("Real", "2024-05-10")] {
            repo.store()
                .execute("INSERT INTO films (title, favorite, watch_date) VALUES (?, ?, ?)", [
                    title.into(),
                    false.into(),
                    raw.into(),
                ])
                .await
                .unwrap();
        }

        let last_month = repo.list_as_of(FilterKind::LastMonth, today).await.unwrap();
        assert_eq!(titles(&last_month), ["Real"]);

        let unseen = repo.list_as_of(FilterKind::Unseen, today).await.unwrap();
        assert_eq!(titles(&unseen), ["Impossible", "Leap"]);
        assert!(unseen.iter().all(|f| f.watch_date.is_none()));
    }
}
