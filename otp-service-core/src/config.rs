//! Typed service configuration loaded from the process environment.
//!
//! Variables are read once through the `config` crate's environment source,
//! then each section is parsed and validated on its own. Validation failures
//! name the offending variable so a misconfigured deployment fails fast at
//! startup.

mod env;
mod route_policy;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub use env::EnvVars;
pub use route_policy::{DefaultPolicy, RoutePolicyConfig};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("failed to read environment: {0}")]
    Source(#[from] config::ConfigError),
}

impl ConfigError {
    pub(crate) fn invalid(var: &'static str, reason: impl fmt::Display) -> Self {
        ConfigError::Invalid {
            var,
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub mongo: MongoConfig,
    pub jwt: JwtConfig,
    pub app: AppSettings,
    pub tracing: TracingSettings,
}

impl AppConfig {
    /// Loads configuration from the current process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&EnvVars::from_env()?)
    }

    pub fn from_vars(vars: &EnvVars) -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerConfig::from_vars(vars)?,
            database: DatabaseConfig::from_vars(vars)?,
            redis: RedisConfig::from_vars(vars)?,
            mongo: MongoConfig::from_vars(vars)?,
            jwt: JwtConfig::from_vars(vars)?,
            app: AppSettings::from_vars(vars)?,
            tracing: TracingSettings::from_vars(vars)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub idle_timeout: Duration,
    pub graceful_shutdown_timeout: Duration,
}

impl ServerConfig {
    pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

    fn from_vars(vars: &EnvVars) -> Result<Self, ConfigError> {
        Ok(Self {
            host: vars.required("SERVER_HOST")?.to_string(),
            port: vars.required_parse("SERVER_PORT")?,
            read_timeout: vars.required_duration("SERVER_READ_TIMEOUT")?,
            write_timeout: vars.required_duration("SERVER_WRITE_TIMEOUT")?,
            idle_timeout: vars.duration_or("SERVER_IDLE_TIMEOUT", Self::DEFAULT_IDLE_TIMEOUT)?,
            graceful_shutdown_timeout: vars.required_duration("SERVER_GRACEFUL_SHUTDOWN_TIMEOUT")?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslMode {
    Disable,
    Allow,
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}

impl FromStr for SslMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disable" => Ok(SslMode::Disable),
            "allow" => Ok(SslMode::Allow),
            "prefer" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            "verify-ca" => Ok(SslMode::VerifyCa),
            "verify-full" => Ok(SslMode::VerifyFull),
            other => Err(format!("unsupported ssl mode '{}'", other)),
        }
    }
}

#[derive(Clone, PartialEq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub ssl_mode: SslMode,
    pub max_open_conns: u32,
    pub max_idle_conns: u32,
    pub conn_max_lifetime: Duration,
    pub conn_max_idle_time: Duration,
    pub connect_max_attempts: u32,
    pub connect_retry_delay: Duration,
    pub run_migrations: bool,
}

impl DatabaseConfig {
    fn from_vars(vars: &EnvVars) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            host: vars.string_or("DB_HOST", &defaults.host),
            port: vars.parse_or("DB_PORT", defaults.port)?,
            user: vars.string_or("DB_USER", &defaults.user),
            password: vars.string_or("DB_PASSWORD", &defaults.password),
            name: vars.string_or("DB_NAME", &defaults.name),
            ssl_mode: vars.parse_or("DB_SSLMODE", defaults.ssl_mode)?,
            max_open_conns: vars.parse_or("DB_MAX_OPEN_CONNS", defaults.max_open_conns)?,
            max_idle_conns: vars.parse_or("DB_MAX_IDLE_CONNS", defaults.max_idle_conns)?,
            conn_max_lifetime: vars.duration_or("DB_CONN_MAX_LIFETIME", defaults.conn_max_lifetime)?,
            conn_max_idle_time: vars
                .duration_or("DB_CONN_MAX_IDLE_TIME", defaults.conn_max_idle_time)?,
            connect_max_attempts: vars
                .parse_or("DB_CONNECT_MAX_ATTEMPTS", defaults.connect_max_attempts)?,
            connect_retry_delay: vars
                .duration_or("DB_CONNECT_RETRY_DELAY", defaults.connect_retry_delay)?,
            run_migrations: vars.flag("DB_RUN_MIGRATIONS", defaults.run_migrations),
        };

        if config.max_open_conns == 0 {
            return Err(ConfigError::invalid("DB_MAX_OPEN_CONNS", "must be at least 1"));
        }
        if config.connect_max_attempts == 0 {
            return Err(ConfigError::invalid("DB_CONNECT_MAX_ATTEMPTS", "must be at least 1"));
        }
        Ok(config)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            name: "otp_service_db".to_string(),
            ssl_mode: SslMode::Disable,
            max_open_conns: 25,
            max_idle_conns: 5,
            conn_max_lifetime: Duration::from_secs(5 * 60),
            conn_max_idle_time: Duration::from_secs(10 * 60),
            connect_max_attempts: 5,
            connect_retry_delay: Duration::from_secs(1),
            run_migrations: false,
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("name", &self.name)
            .field("ssl_mode", &self.ssl_mode)
            .field("max_open_conns", &self.max_open_conns)
            .field("max_idle_conns", &self.max_idle_conns)
            .field("conn_max_lifetime", &self.conn_max_lifetime)
            .field("conn_max_idle_time", &self.conn_max_idle_time)
            .field("connect_max_attempts", &self.connect_max_attempts)
            .field("connect_retry_delay", &self.connect_retry_delay)
            .field("run_migrations", &self.run_migrations)
            .finish()
    }
}

#[derive(Clone, PartialEq)]
pub struct RedisConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: i64,
    pub dial_timeout: Duration,
    pub read_timeout: Duration,
}

impl RedisConfig {
    fn from_vars(vars: &EnvVars) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            enabled: vars.flag("REDIS_ENABLED", defaults.enabled),
            host: vars.string_or("REDIS_HOST", &defaults.host),
            port: vars.parse_or("REDIS_PORT", defaults.port)?,
            password: vars.get("REDIS_PASSWORD").map(str::to_string),
            db: vars.parse_or("REDIS_DB", defaults.db)?,
            dial_timeout: vars.duration_or("REDIS_DIAL_TIMEOUT", defaults.dial_timeout)?,
            read_timeout: vars.duration_or("REDIS_READ_TIMEOUT", defaults.read_timeout)?,
        })
    }

    /// Connection URL in the `redis://[:password@]host:port/db` form.
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.host, self.port, self.db
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "localhost".to_string(),
            port: 6379,
            password: None,
            db: 0,
            dial_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(3),
        }
    }
}

impl fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisConfig")
            .field("enabled", &self.enabled)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("db", &self.db)
            .field("dial_timeout", &self.dial_timeout)
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MongoConfig {
    pub enabled: bool,
    pub uri: String,
    pub database: String,
    pub collection: String,
    pub max_pool_size: u32,
    pub min_pool_size: u32,
    pub connect_timeout: Duration,
    pub server_selection_timeout: Duration,
    pub heartbeat_interval: Duration,
}

impl MongoConfig {
    fn from_vars(vars: &EnvVars) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            enabled: vars.flag("MONGO_ENABLED", defaults.enabled),
            uri: vars.string_or("MONGO_URI", &defaults.uri),
            database: vars.string_or("MONGO_DATABASE", &defaults.database),
            collection: vars.string_or("MONGO_COLLECTION", &defaults.collection),
            max_pool_size: vars.parse_or("MONGO_MAX_POOL_SIZE", defaults.max_pool_size)?,
            min_pool_size: vars.parse_or("MONGO_MIN_POOL_SIZE", defaults.min_pool_size)?,
            connect_timeout: vars.duration_or("MONGO_CONNECT_TIMEOUT", defaults.connect_timeout)?,
            server_selection_timeout: vars.duration_or(
                "MONGO_SERVER_SELECTION_TIMEOUT",
                defaults.server_selection_timeout,
            )?,
            heartbeat_interval: vars
                .duration_or("MONGO_HEARTBEAT_INTERVAL", defaults.heartbeat_interval)?,
        };

        if config.min_pool_size > config.max_pool_size {
            return Err(ConfigError::invalid(
                "MONGO_MIN_POOL_SIZE",
                "must not exceed MONGO_MAX_POOL_SIZE",
            ));
        }
        Ok(config)
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            uri: "mongodb://localhost:27017".to_string(),
            database: "otp_benchmark".to_string(),
            collection: "otp_benchmark".to_string(),
            max_pool_size: 100,
            min_pool_size: 0,
            connect_timeout: Duration::from_secs(5),
            server_selection_timeout: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(10),
        }
    }
}

#[derive(Clone, PartialEq)]
pub struct JwtConfig {
    pub secret_key: String,
    pub refresh_secret: String,
    pub expiration: Duration,
}

impl JwtConfig {
    fn from_vars(vars: &EnvVars) -> Result<Self, ConfigError> {
        Ok(Self {
            secret_key: vars.required("JWT_SECRET_KEY")?.to_string(),
            refresh_secret: vars.required("JWT_REFRESH_SECRET")?.to_string(),
            expiration: vars.required_duration("JWT_EXPIRATION")?,
        })
    }
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret_key", &"***")
            .field("refresh_secret", &"***")
            .field("expiration", &self.expiration)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Debug,
    Release,
    Test,
}

impl AppMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppMode::Debug => "debug",
            AppMode::Release => "release",
            AppMode::Test => "test",
        }
    }
}

impl FromStr for AppMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug" => Ok(AppMode::Debug),
            "release" => Ok(AppMode::Release),
            "test" => Ok(AppMode::Test),
            other => Err(format!("expected debug, release or test, got '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppSettings {
    pub mode: AppMode,
    pub log_level: String,
}

impl AppSettings {
    fn from_vars(vars: &EnvVars) -> Result<Self, ConfigError> {
        Ok(Self {
            mode: vars.required_parse("APP_MODE")?,
            log_level: vars.string_or("LOG_LEVEL", "info"),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExporterEndpoint {
    pub enabled: bool,
    pub endpoint: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TracingSettings {
    pub enabled: bool,
    pub service_name: String,
    pub service_version: String,
    pub tempo: ExporterEndpoint,
    pub jaeger: ExporterEndpoint,
    pub route_policy: RoutePolicyConfig,
}

impl TracingSettings {
    pub const DEFAULT_SERVICE_NAME: &'static str = "otp-service";
    pub const DEFAULT_SERVICE_VERSION: &'static str = "1.0.0";
    pub const DEFAULT_JAEGER_ENDPOINT: &'static str = "http://localhost:4317";

    fn from_vars(vars: &EnvVars) -> Result<Self, ConfigError> {
        let tempo_endpoint = vars.get("OTEL_TEMPO_ENDPOINT").map(normalize_endpoint);
        let tempo_enabled = vars.flag("OTEL_TEMPO_ENABLED", false);
        if tempo_enabled && tempo_endpoint.is_none() {
            return Err(ConfigError::Missing("OTEL_TEMPO_ENDPOINT"));
        }

        Ok(Self {
            enabled: vars.flag("OTEL_TRACING_ENABLED", false),
            service_name: vars.string_or("OTEL_SERVICE_NAME", Self::DEFAULT_SERVICE_NAME),
            service_version: vars.string_or("OTEL_SERVICE_VERSION", Self::DEFAULT_SERVICE_VERSION),
            tempo: ExporterEndpoint {
                enabled: tempo_enabled,
                endpoint: tempo_endpoint.unwrap_or_default(),
            },
            jaeger: ExporterEndpoint {
                enabled: vars.flag("OTEL_JAEGER_ENABLED", false),
                endpoint: normalize_endpoint(
                    vars.get("OTEL_JAEGER_ENDPOINT")
                        .unwrap_or(Self::DEFAULT_JAEGER_ENDPOINT),
                ),
            },
            route_policy: RoutePolicyConfig::from_vars(vars)?,
        })
    }

    /// Endpoints of the exporters switched on, in Tempo, Jaeger order.
    pub fn active_exporters(&self) -> Vec<(&'static str, &str)> {
        let mut exporters = Vec::new();
        if self.tempo.enabled {
            exporters.push(("tempo", self.tempo.endpoint.as_str()));
        }
        if self.jaeger.enabled {
            exporters.push(("jaeger", self.jaeger.endpoint.as_str()));
        }
        exporters
    }
}

/// Prepends `http://` to bare `host:port` endpoints.
pub fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim();
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    }
}
