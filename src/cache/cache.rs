use std::{
    fmt::{self, Display},
    future::Future,
};

use redis::{aio::MultiplexedConnection, AsyncCommands, FromRedisValue, ToRedisArgs};
use redis_macros::{FromRedisValue, ToRedisArgs};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use async_trait::async_trait;

use crate::{
    config::Config,
    error::{CacheError, Error},
    schema::Uuid,
};

const RECIPE_BIND_KEY: &str = "recipe-cache-key";

// Caching - keys

#[derive(Serialize, Clone, Debug)]
pub struct CacheKey<T: ToString + Serialize> {
    value: T,
    kind: CacheKeyType,
}

impl<T: ToString + Serialize> CacheKey<T> {
    pub fn from(kind: CacheKeyType, value: T) -> Self {
        Self { value, kind }
    }

    pub fn lifetime(&self) -> CacheLifetime {
        match &self.kind {
            CacheKeyType::Recipe => CacheLifetime::BindRecipeCache,
            CacheKeyType::Custom(bind) => CacheLifetime::Custom(bind.to_owned()),
        }
    }
}

impl<T: ToString + Serialize> Display for CacheKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            CacheKeyType::Recipe => write!(f, "recipe-{}", self.value.to_string()),
            CacheKeyType::Custom(_) => write!(f, "{}", self.value.to_string()),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum CacheKeyType {
    Recipe,
    /// Entry stays valid while its bind string matches.
    Custom(String),
}

impl CacheKeyType {
    pub fn new<T: ToString + Serialize>(self, key: T) -> CacheKey<T> {
        CacheKey::from(self, key)
    }
}

// Cache - wrappers

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum CacheLifetime {
    Infinite,
    Custom(String),
    BindRecipeCache,
}

impl CacheLifetime {
    pub async fn get_cache_bind(
        &self,
        cache: &mut MultiplexedConnection,
    ) -> Result<Option<String>, Error> {
        match self {
            CacheLifetime::Infinite => Ok(None),
            CacheLifetime::BindRecipeCache => {
                get_cache_value::<&str, String>(RECIPE_BIND_KEY, cache).await
            }
            CacheLifetime::Custom(value) => Ok(Some(value.to_owned())),
        }
    }

    pub async fn validate_cache_bind(
        &self,
        bind: &Option<String>,
        lifetime: &Self,
        cache: &mut MultiplexedConnection,
    ) -> Result<bool, Error> {
        match (self, lifetime) {
            (CacheLifetime::Custom(stored), CacheLifetime::Custom(current)) => {
                Ok(stored == current)
            }
            (CacheLifetime::Custom(_), _) | (_, CacheLifetime::Custom(_)) => {
                log::error!("Found conflicting bindings");
                Err(CacheError::new(String::from("Conflicting cache bindings")).into())
            }
            _ => Ok(bind == &self.get_cache_bind(cache).await?),
        }
    }
}

/// Rotates the bind of `lifetime`, dropping every entry bound to it.
pub async fn invalidate_cache_bind(
    lifetime: &CacheLifetime,
    cache: &mut MultiplexedConnection,
) -> Result<(), Error> {
    match lifetime {
        CacheLifetime::BindRecipeCache => {
            let bind = uuid::Uuid::new_v4().to_string();
            log::debug!("Rotating {RECIPE_BIND_KEY} to {bind}");
            set_cache_value(RECIPE_BIND_KEY, bind, cache).await
        }
        CacheLifetime::Infinite | CacheLifetime::Custom(_) => Ok(()),
    }
}

#[derive(Serialize, Deserialize, FromRedisValue, ToRedisArgs, Clone, Debug)]
#[serde(bound = "T: Serialize + DeserializeOwned")]
pub struct RedisValue<T: Serialize + DeserializeOwned + Send + Sync + Clone> {
    pub value: T,
    lifetime: CacheLifetime,
    bind: Option<String>,
}

impl<T> RedisValue<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    async fn new(
        value: T,
        lifetime: CacheLifetime,
        cache: &mut MultiplexedConnection,
    ) -> Result<Self, Error> {
        let bind = lifetime.get_cache_bind(cache).await?;

        Ok(Self {
            value,
            lifetime,
            bind,
        })
    }

    async fn validate<K: ToString + Serialize>(
        &self,
        key: &CacheKey<K>,
        cache: &mut MultiplexedConnection,
    ) -> Result<bool, Error> {
        self.lifetime
            .validate_cache_bind(&self.bind, &key.lifetime(), cache)
            .await
    }

    /// Serves `key` from the cache, falling back to `callback` and storing
    /// what it returns. `None` results are not cached.
    pub async fn get_or_optional<F, Fut, K>(
        key: CacheKey<K>,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<Option<RedisValue<T>>, Error>
    where
        K: ToString + Serialize + Clone + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, Error>>,
    {
        let value = get_cache_value::<String, RedisValue<T>>(key.to_string(), cache)
            .await
            .unwrap_or_else(|_| {
                let mut c = cache.clone();
                let k = key.to_string();
                tokio::spawn(async move {
                    log::error!("> Failed to deserialize cached value. Deleting {}", &k);
                    if let Err(e) = delete_cache_value(k, &mut c).await {
                        log::error!("> Failed to delete cached value! {e}");
                    }
                });
                None
            });

        let value = match value {
            Some(value) => {
                log::trace!("> Found {}", key);
                match value.validate(&key, cache).await? {
                    true => Some(value),
                    false => {
                        log::trace!("> Invalidated {}", key);
                        None
                    }
                }
            }
            None => None,
        };

        if let Some(value) = value {
            return Ok(Some(value));
        }

        log::trace!("> Fetching {}", key);
        let Some(value) = callback().await? else {
            return Ok(None);
        };

        let value = RedisValue::new(value, key.lifetime(), cache).await?;
        if let Err(e) = set_cache_value(key.to_string(), value.clone(), cache).await {
            log::error!("{e:?}");
        }

        Ok(Some(value))
    }
}

// Cache - eviction

/// Eviction hooks the write actions call once storage has committed.
#[async_trait]
pub trait RecipeCache: Send {
    async fn evict_recipe(&mut self, id: Uuid) -> Result<(), Error>;

    async fn evict_all_recipes(&mut self) -> Result<(), Error>;
}

#[async_trait]
impl RecipeCache for MultiplexedConnection {
    async fn evict_recipe(&mut self, id: Uuid) -> Result<(), Error> {
        log::trace!("> Evicting recipe-{id}");
        delete_cache_value(CacheKeyType::Recipe.new(id).to_string(), self).await
    }

    async fn evict_all_recipes(&mut self) -> Result<(), Error> {
        invalidate_cache_bind(&CacheLifetime::BindRecipeCache, self).await
    }
}

// Cache - raw handlers

pub async fn connect_cache(config: &Config) -> Result<Option<MultiplexedConnection>, Error> {
    let Some(url) = config.redis_url.as_deref() else {
        return Ok(None);
    };

    let client = redis::Client::open(url).map_err(CacheError::from)?;
    let connection = client
        .get_multiplexed_async_connection()
        .await
        .map_err(CacheError::from)?;

    log::info!("Connected to redis");
    Ok(Some(connection))
}

pub async fn set_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    cache: &mut MultiplexedConnection,
) -> Result<(), Error> {
    let _: () = cache.set(key, value).await.map_err(CacheError::from)?;

    Ok(())
}

pub async fn delete_cache_value<K: ToRedisArgs + Send + Sync>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<(), Error> {
    let _: () = cache.del(key).await.map_err(CacheError::from)?;

    Ok(())
}

pub async fn get_cache_value<K: ToRedisArgs + Send + Sync, V: FromRedisValue>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, Error> {
    let value: Option<V> = cache.get(key).await.map_err(CacheError::from)?;

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_by_kind() {
        let key = CacheKeyType::Recipe.new(42);
        assert_eq!(key.to_string(), "recipe-42");
        assert_eq!(key.lifetime(), CacheLifetime::BindRecipeCache);

        let key = CacheKeyType::Custom(String::from("v2")).new("tag-list");
        assert_eq!(key.to_string(), "tag-list");
        assert_eq!(key.lifetime(), CacheLifetime::Custom(String::from("v2")));
    }

    #[test]
    fn cached_values_survive_redis_encoding() {
        let value = RedisValue {
            value: vec![1, 2, 3],
            lifetime: CacheLifetime::BindRecipeCache,
            bind: Some(String::from("b")),
        };

        let mut args = value.to_redis_args();
        assert_eq!(args.len(), 1);
        let stored = redis::Value::BulkString(args.remove(0));
        let back = RedisValue::<Vec<i32>>::from_redis_value(&stored).unwrap();

        assert_eq!(back.value, vec![1, 2, 3]);
        assert_eq!(back.lifetime, CacheLifetime::BindRecipeCache);
        assert_eq!(back.bind.as_deref(), Some("b"));
    }

    #[test]
    fn malformed_cache_entries_are_errors() {
        let stored = redis::Value::BulkString(b"not json".to_vec());

        assert!(RedisValue::<Vec<i32>>::from_redis_value(&stored).is_err());
    }
}
