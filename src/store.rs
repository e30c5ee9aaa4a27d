use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Statement, Value};
use tracing::debug;

use crate::entities::film;

/// Outcome of a write statement.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExecOutcome {
    pub affected: u64,
    pub inserted_id: i32,
}

/// Owns the connection to the `films` table. Every query goes through a
/// parameterized [`Statement`]; values are never spliced into SQL text.
#[derive(Clone)]
pub struct FilmStore {
    db: DatabaseConnection,
}

impl FilmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn all<I>(&self, sql: &str, params: I) -> Result<Vec<film::Model>, DbErr>
    where
        I: IntoIterator<Item = Value>,
    {
        let stmt = self.statement(sql, params);
        film::Entity::find().from_raw_sql(stmt).all(&self.db).await
    }

    pub async fn one<I>(&self, sql: &str, params: I) -> Result<Option<film::Model>, DbErr>
    where
        I: IntoIterator<Item = Value>,
    {
        let stmt = self.statement(sql, params);
        film::Entity::find().from_raw_sql(stmt).one(&self.db).await
    }

    pub async fn execute<I>(&self, sql: &str, params: I) -> Result<ExecOutcome, DbErr>
    where
        I: IntoIterator<Item = Value>,
    {
        let stmt = self.statement(sql, params);
        let res = self.db.execute(stmt).await?;
        let inserted_id = i32::try_from(res.last_insert_id())
            .map_err(|_| DbErr::Custom(format!("row id {} out of range", res.last_insert_id())))?;
        Ok(ExecOutcome { affected: res.rows_affected(), inserted_id })
    }

    fn statement<I>(&self, sql: &str, params: I) -> Statement
    where
        I: IntoIterator<Item = Value>,
    {
        debug!(sql = %sql, "store query");
        Statement::from_sql_and_values(self.db.get_database_backend(), sql, params)
    }
}
