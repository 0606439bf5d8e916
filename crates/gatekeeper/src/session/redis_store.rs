//! Redis-backed session store.

use std::time::Duration;

use gatekeeper_common::GatekeeperError;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::SessionStore;

/// Session store over a Redis connection manager (auto-reconnecting).
///
/// When a TTL hint is given the key is written with `SET EX`, so abandoned
/// challenges don't accumulate.
#[derive(Clone)]
pub struct RedisStore {
    redis: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis at `url` and check the server answers
    pub async fn connect(url: &str) -> Result<Self, GatekeeperError> {
        let client = redis::Client::open(url)
            .map_err(|e| GatekeeperError::Store(format!("invalid Redis URL: {}", e)))?;

        let redis = ConnectionManager::new(client)
            .await
            .map_err(|e| GatekeeperError::Store(format!("failed to connect to Redis: {}", e)))?;

        let store = Self { redis };
        store.ping().await?;
        Ok(store)
    }

    /// Round-trip a PING
    pub async fn ping(&self) -> Result<(), GatekeeperError> {
        let mut conn = self.redis.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(())
    }
}

fn store_error(e: redis::RedisError) -> GatekeeperError {
    GatekeeperError::Store(e.to_string())
}

/// Whole seconds for `SET EX`, rounded up and never zero
fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

impl SessionStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, GatekeeperError> {
        let mut conn = self.redis.clone();
        conn.get::<_, Option<Vec<u8>>>(key)
            .await
            .map_err(store_error)
    }

    async fn put(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), GatekeeperError> {
        let mut conn = self.redis.clone();
        match ttl {
            Some(ttl) => conn
                .set_ex::<_, _, ()>(key, value.as_slice(), ttl_secs(ttl))
                .await
                .map_err(store_error),
            None => conn
                .set::<_, _, ()>(key, value.as_slice())
                .await
                .map_err(store_error),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), GatekeeperError> {
        let mut conn = self.redis.clone();
        conn.del::<_, ()>(key).await.map_err(store_error)
    }

    async fn take(&self, key: &str) -> Result<Option<Vec<u8>>, GatekeeperError> {
        // GET + DEL inside MULTI/EXEC (GETDEL requires Redis 6.2+)
        let mut conn = self.redis.clone();
        let (value, _deleted): (Option<Vec<u8>>, i64) = redis::pipe()
            .atomic()
            .get(key)
            .del(key)
            .query_async(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(value)
    }
}
