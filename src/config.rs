use std::net::SocketAddr;

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub db_max_connections: u32,
    pub seed_sample_films: bool,
    pub api_prefix: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = var("PORT").unwrap_or_else(|| "3001".to_string()).parse().context("PORT")?;

        let database_url =
            var("DATABASE_URL").unwrap_or_else(|| "sqlite://films.db?mode=rwc".to_string());

        let db_max_connections: u32 = match var("DB_MAX_CONNECTIONS") {
            Some(s) => s.parse().context("DB_MAX_CONNECTIONS")?,
            None => 5,
        };

        let seed_sample_films: bool = match var("SEED_SAMPLE_FILMS") {
            Some(s) => s.parse().context("SEED_SAMPLE_FILMS")?,
            None => false,
        };

        let api_prefix = var("API_PREFIX").unwrap_or_else(|| "/api".to_string());
        let api_prefix = format!("/{}", api_prefix.trim_matches('/'));

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            db_max_connections: db_max_connections.max(1),
            seed_sample_films,
            api_prefix,
        })
    }
}
