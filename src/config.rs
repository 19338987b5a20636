use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::WellnessError;

/// Main configuration structure for the wellness tips client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub gemini: GeminiConfig,
    pub store: StoreConfig,
    pub redis: RedisConfig,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub name: String,
    /// Optional prefix for the durable store keys.
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub api_url: String,
    pub api_key: String,
    pub timeout_seconds: u64,
    pub max_tips: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Redis,
    File,
    Memory,
}

impl StoreBackend {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "redis" => Some(Self::Redis),
            "file" => Some(Self::File),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Directory for the file backend.
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub database: u8,
    pub pool: PoolConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub max_size: usize,
    pub timeout_seconds: u64,
    pub create_timeout_seconds: u64,
    pub recycle_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// JSON seed dataset for the quick tips path.
    pub path: PathBuf,
}

const PLACEHOLDER_API_KEY: &str = "PLACEHOLDER_GEMINI_API_KEY";

fn invalid(msg: &str) -> Result<(), WellnessError> {
    Err(WellnessError::Config(msg.to_string()))
}

impl Config {
    /// Load configuration from file with environment variable overrides
    /// ALWAYS returns a valid config - never fails
    pub fn load() -> Self {
        let env_paths = ["../.env", ".env"];

        let mut env_loaded = false;
        for path in &env_paths {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                env_loaded = true;
                break;
            }
        }

        if !env_loaded {
            tracing::warn!("No .env file found - continuing with env vars only");
        }

        let config_path =
            env::var("WELLNESS_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = Self::from_file(Path::new(&config_path));

        config.apply_env_overrides();

        // Validate configuration - log warnings but don't fail
        if let Err(e) = config.validate() {
            tracing::warn!("Config validation warnings: {} - continuing anyway", e);
        }

        config
    }

    /// Read a YAML config file, falling back to defaults when it is missing
    /// or unreadable.
    pub fn from_file(path: &Path) -> Self {
        if !path.exists() {
            tracing::warn!(
                "Config file not found at {} - using defaults",
                path.display()
            );
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => Self::from_yaml(&contents).unwrap_or_else(|e| {
                tracing::error!(
                    "Failed to parse config file {}: {} - using defaults",
                    path.display(),
                    e
                );
                Self::default()
            }),
            Err(e) => {
                tracing::error!(
                    "Failed to read config file {}: {} - using defaults",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        let config = serde_yaml::from_str::<Config>(contents)?;
        tracing::info!("Loaded configuration for {}", config.app.name);
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(namespace) = env::var("WELLNESS_NAMESPACE") {
            self.app.namespace = Some(namespace).filter(|n| !n.trim().is_empty());
        }

        // Gemini overrides
        if let Ok(url) = env::var("GEMINI_API_URL") {
            self.gemini.api_url = url;
        }
        if let Ok(api_key) = env::var("GEMINI_API_KEY") {
            self.gemini.api_key = api_key;
        }
        if let Ok(timeout) = env::var("GEMINI_TIMEOUT_SECONDS") {
            if let Ok(secs) = timeout.parse() {
                self.gemini.timeout_seconds = secs;
            }
        }

        // Store overrides
        if let Ok(backend) = env::var("WELLNESS_STORE_BACKEND") {
            match StoreBackend::parse(&backend) {
                Some(parsed) => self.store.backend = parsed,
                None => tracing::warn!(
                    "Unknown store backend '{}', keeping {:?}",
                    backend,
                    self.store.backend
                ),
            }
        }
        if let Ok(dir) = env::var("WELLNESS_DATA_DIR") {
            self.store.data_dir = PathBuf::from(dir);
        }

        // Redis overrides
        if let Ok(host) = env::var("REDIS_HOST") {
            self.redis.host = host;
        }
        if let Ok(port) = env::var("REDIS_PORT") {
            if let Ok(port_num) = port.parse() {
                self.redis.port = port_num;
            }
        }
        if let Ok(db) = env::var("REDIS_DB") {
            if let Ok(db_num) = db.parse() {
                self.redis.database = db_num;
            }
        }
        if let Ok(pool_size) = env::var("WELLNESS_REDIS_POOL_SIZE") {
            if let Ok(size) = pool_size.parse() {
                self.redis.pool.max_size = size;
            }
        }

        if let Ok(path) = env::var("WELLNESS_CATALOG_PATH") {
            self.catalog.path = PathBuf::from(path);
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<(), WellnessError> {
        if self.gemini.api_url.trim().is_empty() {
            return invalid("GEMINI_API_URL must be set");
        }
        if self.gemini.max_tips == 0 {
            return invalid("gemini.max_tips cannot be 0");
        }
        if self.gemini.timeout_seconds == 0 {
            return invalid("gemini.timeout_seconds cannot be 0");
        }

        if self.store.backend == StoreBackend::Redis && self.redis.port == 0 {
            return invalid("Redis port cannot be 0");
        }

        // Generation still works without a key, it just always falls back
        if !self.has_api_key() {
            return invalid("GEMINI_API_KEY is not set - tips will use the local fallback");
        }

        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        !self.gemini.api_key.is_empty() && self.gemini.api_key != PLACEHOLDER_API_KEY
    }

    /// Get Redis URL with password from environment
    pub fn get_redis_url(&self) -> String {
        let password = env::var("REDIS_PASSWORD").unwrap_or_default();

        if password.is_empty() {
            format!(
                "redis://{}:{}/{}",
                self.redis.host, self.redis.port, self.redis.database
            )
        } else {
            format!(
                "redis://:{}@{}:{}/{}",
                password, self.redis.host, self.redis.port, self.redis.database
            )
        }
    }

    pub fn get_request_timeout(&self) -> Duration {
        Duration::from_secs(self.gemini.timeout_seconds)
    }

    pub fn get_pool_timeout(&self) -> Duration {
        Duration::from_secs(self.redis.pool.timeout_seconds)
    }

    pub fn get_pool_create_timeout(&self) -> Duration {
        Duration::from_secs(self.redis.pool.create_timeout_seconds)
    }

    pub fn get_pool_recycle_timeout(&self) -> Duration {
        Duration::from_secs(self.redis.pool.recycle_timeout_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig {
                name: "wellness-tips".to_string(),
                namespace: None,
            },
            gemini: GeminiConfig {
                api_url: "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent".to_string(),
                api_key: env::var("GEMINI_API_KEY").unwrap_or_else(|_| {
                    tracing::warn!("GEMINI_API_KEY not set, using placeholder");
                    PLACEHOLDER_API_KEY.to_string()
                }),
                timeout_seconds: 30,
                max_tips: 5,
            },
            store: StoreConfig {
                backend: StoreBackend::File,
                data_dir: PathBuf::from(".wellness"),
            },
            redis: RedisConfig {
                host: "localhost".to_string(),
                port: 6379,
                database: 0,
                pool: PoolConfig {
                    max_size: 4,
                    timeout_seconds: 5,
                    create_timeout_seconds: 5,
                    recycle_timeout_seconds: 5,
                },
            },
            catalog: CatalogConfig {
                path: PathBuf::from("data/tips.json"),
            },
        }
    }
}
