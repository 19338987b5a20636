use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use deadpool::managed::QueueMode;
use deadpool_redis::{Config as DeadpoolConfig, Pool, PoolConfig, Runtime, Timeouts};
use redis::AsyncCommands;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use crate::config::{Config, StoreBackend};
use crate::error::{Result, WellnessError};

/// Key holding the serialized profile.
pub const PROFILE_KEY: &str = "userProfile";
/// Key holding the serialized saved tips sequence.
pub const SAVED_TIPS_KEY: &str = "savedTips";

/// Durable whole-value key-value store. Values are JSON strings.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Result of a best-effort write. Failures are reported, never raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Written,
    Failed(String),
}

impl PersistOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written)
    }
}

/// Fixed store keys, optionally namespaced as `{namespace}:{key}`.
#[derive(Debug, Clone, Default)]
pub struct StoreKeys {
    namespace: Option<String>,
}

impl StoreKeys {
    pub fn new(namespace: Option<String>) -> Self {
        Self { namespace }
    }

    fn key(&self, base: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}:{base}"),
            None => base.to_string(),
        }
    }

    pub fn profile(&self) -> String {
        self.key(PROFILE_KEY)
    }

    pub fn saved_tips(&self) -> String {
        self.key(SAVED_TIPS_KEY)
    }
}

/// Serialize `value` and write it under `key`, swallowing any failure into
/// `PersistOutcome::Failed`.
pub async fn write_json<T: Serialize + Sync>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> PersistOutcome {
    let payload = match serde_json::to_string(value) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("Failed to serialize value for {}: {}", key, e);
            return PersistOutcome::Failed(e.to_string());
        }
    };

    match store.set(key, &payload).await {
        Ok(()) => {
            tracing::debug!("Persisted {} ({} bytes)", key, payload.len());
            PersistOutcome::Written
        }
        Err(e) => {
            tracing::warn!("Failed to persist {}: {}", key, e);
            PersistOutcome::Failed(e.to_string())
        }
    }
}

/// Read and deserialize `key`. Absent, unreadable and malformed values all
/// yield `None`.
pub async fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", key, e);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Ignoring malformed value under {}: {}", key, e);
            None
        }
    }
}

/// Build the backend selected in configuration.
pub async fn build_store(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    match config.store.backend {
        StoreBackend::Redis => Ok(Arc::new(RedisStore::new_with_config(config).await?)),
        StoreBackend::File => Ok(Arc::new(FileStore::new(config.store.data_dir.clone()))),
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}

/// Process-local store, used for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Suffix for temp files so overlapping writes never share one.
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file}.json"))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(key);
        // Write-then-rename so readers never see a half-written value
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("json.{}.{seq}.tmp", std::process::id()));
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

/// Redis-backed store with a pooled connection.
#[derive(Clone)]
pub struct RedisStore {
    pool: Arc<Pool>,
}

impl RedisStore {
    /// Create a new Redis store with configuration
    pub async fn new_with_config(config: &Config) -> Result<Self> {
        let redis_url = config.get_redis_url();

        tracing::info!(
            "Connecting to Redis at {}:{} (db: {})",
            config.redis.host,
            config.redis.port,
            config.redis.database
        );

        let mut cfg = DeadpoolConfig::from_url(&redis_url);

        cfg.pool = Some(PoolConfig {
            max_size: config.redis.pool.max_size,
            timeouts: Timeouts {
                wait: Some(config.get_pool_timeout()),
                create: Some(config.get_pool_create_timeout()),
                recycle: Some(config.get_pool_recycle_timeout()),
            },
            queue_mode: QueueMode::Fifo,
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| WellnessError::PoolCreation(e.to_string()))?;

        // Test the connection
        let mut conn = pool.get().await?;
        let _: String = redis::cmd("PING").query_async(&mut *conn).await?;
        tracing::info!("Redis connection established");

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    async fn get_connection(&self) -> Result<deadpool_redis::Connection> {
        Ok(self.pool.get().await?)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.get_connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.get_connection().await?;
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }
}
