//! Per-identity challenge storage.
//!
//! A [`SessionStore`] is the host's key-value collaborator. [`ChallengeSession`]
//! binds it to one caller identity and one slot, and is the only place that
//! knows how a [`ChallengeRecord`] is laid out in storage.

mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use gatekeeper_common::constants::keys::SEPARATOR;
use gatekeeper_common::{ChallengeRecord, GatekeeperError};

/// Opaque byte store keyed by string.
///
/// Each call must be atomic with respect to the others for the same key.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str)
    -> impl Future<Output = Result<Option<Vec<u8>>, GatekeeperError>> + Send;

    /// Overwrite `key`. `ttl` is a hint; the verifier enforces expiry itself.
    fn put(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> impl Future<Output = Result<(), GatekeeperError>> + Send;

    /// Remove `key`; removing a missing key is not an error
    fn delete(&self, key: &str) -> impl Future<Output = Result<(), GatekeeperError>> + Send;

    /// Read and remove `key` in one step. Two concurrent takes of the same
    /// key never both see the value.
    fn take(&self, key: &str)
    -> impl Future<Output = Result<Option<Vec<u8>>, GatekeeperError>> + Send;
}

impl<S: SessionStore> SessionStore for Arc<S> {
    fn get(&self, key: &str)
    -> impl Future<Output = Result<Option<Vec<u8>>, GatekeeperError>> + Send {
        (**self).get(key)
    }

    fn put(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> impl Future<Output = Result<(), GatekeeperError>> + Send {
        (**self).put(key, value, ttl)
    }

    fn delete(&self, key: &str) -> impl Future<Output = Result<(), GatekeeperError>> + Send {
        (**self).delete(key)
    }

    fn take(&self, key: &str)
    -> impl Future<Output = Result<Option<Vec<u8>>, GatekeeperError>> + Send {
        (**self).take(key)
    }
}

/// The single challenge slot of one caller identity
pub struct ChallengeSession<'a, S> {
    store: &'a S,
    key: String,
}

impl<'a, S: SessionStore> ChallengeSession<'a, S> {
    pub fn new(store: &'a S, namespace: &str, identity: &str) -> Result<Self, GatekeeperError> {
        if identity.is_empty() {
            return Err(GatekeeperError::InvalidInput(
                "caller identity must not be empty".into(),
            ));
        }
        Ok(Self {
            store,
            key: format!("{namespace}{SEPARATOR}{identity}"),
        })
    }

    /// Storage key: {namespace}:{identity}
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Store `record`, replacing any previous one
    pub async fn put(
        &self,
        record: &ChallengeRecord,
        ttl: Option<Duration>,
    ) -> Result<(), GatekeeperError> {
        self.store.put(&self.key, record.encode()?, ttl).await
    }

    pub async fn get(&self) -> Result<Option<ChallengeRecord>, GatekeeperError> {
        match self.store.get(&self.key).await? {
            Some(bytes) => ChallengeRecord::decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Remove and return the record; the slot is empty afterwards even if
    /// the stored bytes fail to decode
    pub async fn take(&self) -> Result<Option<ChallengeRecord>, GatekeeperError> {
        match self.store.take(&self.key).await? {
            Some(bytes) => ChallengeRecord::decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    pub async fn clear(&self) -> Result<(), GatekeeperError> {
        self.store.delete(&self.key).await
    }
}
