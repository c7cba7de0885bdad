use std::{env, fmt::Display, str::FromStr};

use crate::error::Error;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub redis_url: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, `load` uses the process environment.
    pub fn from_source<F>(source: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = source("DATABASE_URL")
            .ok_or_else(|| Error::Config(String::from("DATABASE_URL is not set")))?;

        let max_connections = try_load(
            &source,
            "DATABASE_MAX_CONNECTIONS",
            DEFAULT_MAX_CONNECTIONS,
        )?;

        let redis_url = source("REDIS_URL").filter(|url| !url.trim().is_empty());
        if redis_url.is_none() {
            log::info!("REDIS_URL not set, recipe caching disabled");
        }

        Ok(Self {
            database_url,
            max_connections,
            redis_url,
        })
    }
}

fn try_load<F, T>(source: &F, key: &str, default: T) -> Result<T, Error>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match source(key) {
        Some(value) => value.trim().parse().map_err(|e| {
            log::warn!("Invalid {key} value: {e}");
            Error::Config(format!("{key}: {e}"))
        }),
        None => {
            log::info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn source(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_optional_keys_missing() {
        let config =
            Config::from_source(source(&[("DATABASE_URL", "postgres://localhost/food")])).unwrap();

        assert_eq!(config.database_url, "postgres://localhost/food");
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.redis_url, None);
    }

    #[test]
    fn reads_every_key() {
        let config = Config::from_source(source(&[
            ("DATABASE_URL", "postgres://db/food"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("REDIS_URL", "redis://cache:6379"),
        ]))
        .unwrap();

        assert_eq!(config.max_connections, 12);
        assert_eq!(config.redis_url.as_deref(), Some("redis://cache:6379"));
    }

    #[test]
    fn missing_database_url_is_an_error() {
        assert!(matches!(
            Config::from_source(source(&[])),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let result = Config::from_source(source(&[
            ("DATABASE_URL", "postgres://db/food"),
            ("DATABASE_MAX_CONNECTIONS", "many"),
        ]));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
