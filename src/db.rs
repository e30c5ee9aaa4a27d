use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::{config::Config, store::FilmStore};

const PRAGMAS: &[&str] = &["PRAGMA journal_mode=WAL", "PRAGMA synchronous=NORMAL"];

const SAMPLE_FILMS: &[(&str, bool, Option<&str>, Option<i32>)] = &[
    ("Pulp Fiction", true, Some("2023-03-10"), Some(5)),
    ("21 Grams", true, Some("2023-03-17"), Some(4)),
    ("Star Wars", false, None, None),
    ("Matrix", false, None, None),
    ("Shrek", false, Some("2024-03-21"), Some(2)),
];

pub async fn connect_and_migrate(config: &Config) -> Result<DatabaseConnection, DbErr> {
    let mut opts = ConnectOptions::new(config.database_url.clone());
    opts.max_connections(config.db_max_connections);

    let db = Database::connect(opts).await?;

    for pragma in PRAGMAS {
        db.execute(Statement::from_string(db.get_database_backend(), pragma.to_string())).await?;
    }

    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Inserts the demo library, but only into an empty table.
pub async fn seed_sample_films(store: &FilmStore) -> Result<u64, DbErr> {
    if !store.all("SELECT * FROM films LIMIT 1", []).await?.is_empty() {
        return Ok(0);
    }

    let mut inserted = 0;
    for (title, favorite, watch_date, rating) in SAMPLE_FILMS {
        let outcome = store
            .execute(
                "INSERT INTO films (title, favorite, watch_date, rating) VALUES (?, ?, ?, ?)",
                [
                    (*title).into(),
                    (*favorite).into(),
                    watch_date.map(str::to_string).into(),
                    (*rating).into(),
                ],
            )
            .await?;
        inserted += outcome.affected;
    }

    info!(inserted, "seeded sample films");
    Ok(inserted)
}
