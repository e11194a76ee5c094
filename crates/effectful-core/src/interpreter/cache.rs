// Key/value cache interpreter

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use effectful_error::BackendResult;

use super::{check_payload, require, CacheInterpreter, Rejection};
use crate::config::{InterpreterConfig, MAX_CACHE_TTL};
use crate::effect::{CacheAck, CacheEffect, CacheLookup, CacheResult, Removal};
use crate::outcome::Outcome;

/// A byte cache with optional per-entry expiry
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> BackendResult<Option<Bytes>>;

    /// Store `value`; `ttl: None` keeps it until evicted
    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> BackendResult<()>;

    /// Returns whether an entry was removed
    async fn delete(&self, key: &str) -> BackendResult<bool>;
}

/// [`CacheInterpreter`] over a [`CacheStore`].
///
/// Keys are prefixed with the configured namespace before they reach the
/// store, and writes without an explicit expiry get the configured default.
#[derive(Clone)]
pub struct CacheStoreInterpreter {
    store: Arc<dyn CacheStore>,
    config: Arc<InterpreterConfig>,
}

impl CacheStoreInterpreter {
    pub fn new(store: Arc<dyn CacheStore>, config: Arc<InterpreterConfig>) -> Self {
        Self { store, config }
    }

    async fn apply(&self, effect: &CacheEffect) -> Result<CacheResult, Rejection> {
        match effect {
            CacheEffect::Get(op) => {
                require("cache key", &op.key)?;
                let key = self.config.cache_key(&op.key);
                let lookup = match self.store.get(&key).await? {
                    Some(value) => CacheLookup::Hit(value),
                    None => CacheLookup::Miss,
                };
                Ok(CacheResult::Lookup(lookup))
            }
            CacheEffect::Set(op) => {
                require("cache key", &op.key)?;
                check_payload(&self.config, "cache value", op.value.len())?;
                let ttl = op.ttl.or_else(|| self.config.default_cache_ttl());
                match ttl {
                    Some(ttl) if ttl.is_zero() => {
                        return Err(Rejection::invalid("cache ttl must be positive"));
                    }
                    Some(ttl) if ttl > MAX_CACHE_TTL => {
                        return Err(Rejection::invalid(format!(
                            "cache ttl is {}s, limit is {}s",
                            ttl.as_secs(),
                            MAX_CACHE_TTL.as_secs()
                        )));
                    }
                    _ => {}
                }
                let key = self.config.cache_key(&op.key);
                self.store.set(&key, op.value.clone(), ttl).await?;
                Ok(CacheResult::Stored(CacheAck { ttl }))
            }
            CacheEffect::Delete(op) => {
                require("cache key", &op.key)?;
                let key = self.config.cache_key(&op.key);
                let existed = self.store.delete(&key).await?;
                Ok(CacheResult::Removal(Removal::from_existed(existed)))
            }
        }
    }
}

#[async_trait]
impl CacheInterpreter for CacheStoreInterpreter {
    async fn handle(&self, effect: CacheEffect) -> Outcome<CacheResult> {
        self.apply(&effect)
            .await
            .map_err(|rejection| rejection.into_error(effect.into(), &self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::CacheSet;
    use effectful_error::ErrorKind;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorded {
        writes: Mutex<Vec<(String, Option<Duration>)>>,
    }

    #[async_trait]
    impl CacheStore for Recorded {
        async fn get(&self, _key: &str) -> BackendResult<Option<Bytes>> {
            Ok(None)
        }

        async fn set(&self, key: &str, _value: Bytes, ttl: Option<Duration>) -> BackendResult<()> {
            self.writes.lock().push((key.to_string(), ttl));
            Ok(())
        }

        async fn delete(&self, _key: &str) -> BackendResult<bool> {
            Ok(false)
        }
    }

    fn interpreter(store: Arc<Recorded>, config: InterpreterConfig) -> CacheStoreInterpreter {
        CacheStoreInterpreter::new(store, Arc::new(config))
    }

    #[tokio::test]
    async fn test_ttl_above_limit_never_reaches_store() {
        let store = Arc::new(Recorded::default());
        let cache = interpreter(store.clone(), InterpreterConfig::default());

        for ttl in [MAX_CACHE_TTL + Duration::from_secs(1), Duration::MAX] {
            let err = cache
                .handle(CacheSet::new("k", "v").with_ttl(ttl).into())
                .await
                .unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidRequest);
            assert!(!err.retryable);
        }
        assert!(store.writes.lock().is_empty());

        let ack = cache
            .handle(CacheSet::new("k", "v").with_ttl(MAX_CACHE_TTL).into())
            .await
            .unwrap();
        assert_eq!(ack, CacheResult::Stored(CacheAck { ttl: Some(MAX_CACHE_TTL) }));
    }

    #[tokio::test]
    async fn test_sub_second_default_ttl_still_writes() {
        let store = Arc::new(Recorded::default());
        let config = InterpreterConfig::new().with_default_cache_ttl(Duration::from_millis(500));
        let cache = interpreter(store.clone(), config);

        cache.handle(CacheSet::new("k", "v").into()).await.unwrap();
        assert_eq!(
            store.writes.lock().as_slice(),
            &[("k".to_string(), Some(Duration::from_secs(1)))]
        );
    }
}
