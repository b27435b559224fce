use clap::{Parser, ValueEnum};
use lynx_shortener::service::DEFAULT_MAX_ATTEMPTS;
use lynx_storage::redis::DEFAULT_KEY_PREFIX;
use lynx_storage::RedisSettings;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const PUBLIC_BASE_URL_ENV: &str = "PUBLIC_BASE_URL";
pub const STORAGE_BACKEND_ENV: &str = "STORAGE_BACKEND";
pub const REDIS_HOST_ENV: &str = "REDIS_HOST";
pub const REDIS_PORT_ENV: &str = "REDIS_PORT";
pub const REDIS_TIMEOUT_MS_ENV: &str = "REDIS_TIMEOUT_MS";
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
pub const LOG_JSON_ENV: &str = "LOG_JSON";
pub const MAX_ATTEMPTS_ENV: &str = "MAX_ALLOCATION_ATTEMPTS";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_REDIS_HOST: &str = "127.0.0.1";
pub const DEFAULT_REDIS_PORT: u16 = 6379;
pub const DEFAULT_REDIS_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "redis")]
    Redis,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Redis => write!(f, "redis"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "lynx-gateway")]
pub struct CLI {
    #[arg(long, env = HOST_ENV, default_value = DEFAULT_HOST)]
    pub host: String,

    #[arg(long, env = PORT_ENV, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Overrides the `http://{host}:{port}` prefix of generated short URLs.
    #[arg(long, env = PUBLIC_BASE_URL_ENV)]
    pub public_base_url: Option<String>,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::Redis
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = REDIS_HOST_ENV, default_value = DEFAULT_REDIS_HOST)]
    pub redis_host: String,

    #[arg(long, env = REDIS_PORT_ENV, default_value_t = DEFAULT_REDIS_PORT)]
    pub redis_port: u16,

    #[arg(long, env = REDIS_TIMEOUT_MS_ENV, default_value_t = DEFAULT_REDIS_TIMEOUT_MS)]
    pub redis_timeout_ms: u64,

    #[arg(long, env = LOG_LEVEL_ENV, default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    #[arg(long, env = LOG_JSON_ENV)]
    pub log_json: bool,

    #[arg(long, env = MAX_ATTEMPTS_ENV, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,
}

impl CLI {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn public_base_url(&self) -> String {
        match &self.public_base_url {
            Some(url) => url.clone(),
            None => format!("http://{}:{}", self.host, self.port),
        }
    }

    pub fn redis_settings(&self) -> RedisSettings {
        RedisSettings::builder()
            .url(format!("redis://{}:{}", self.redis_host, self.redis_port))
            .key_prefix(DEFAULT_KEY_PREFIX)
            .operation_timeout(Duration::from_millis(self.redis_timeout_ms))
            .build()
    }
}
