use chrono::Duration;
use domain::services::EntitlementPolicy;
use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    /// Session token verification
    pub jwt: JwtAuthConfig,
    #[serde(default)]
    pub entitlements: EntitlementsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl From<&DatabaseConfig> for persistence::db::DatabaseConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout_secs: config.connect_timeout_secs,
            idle_timeout_secs: config.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtAuthConfig {
    /// RSA public key (PEM) of the account service that signs sessions
    #[serde(default)]
    pub public_key: String,

    /// Seconds of clock skew tolerated on `exp`
    #[serde(default = "default_jwt_leeway")]
    pub leeway_secs: u64,
}

/// Entitlement policy knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct EntitlementsConfig {
    #[serde(default = "default_download_token_ttl_minutes")]
    pub download_token_ttl_minutes: i64,

    #[serde(default = "default_hwid_reset_cooldown_days")]
    pub hwid_reset_cooldown_days: i64,

    #[serde(default = "default_invite_code_batch_max")]
    pub invite_code_batch_max: u32,

    /// How often expired download tokens are purged
    #[serde(default = "default_token_cleanup_interval_minutes")]
    pub token_cleanup_interval_minutes: u64,
}

impl Default for EntitlementsConfig {
    fn default() -> Self {
        Self {
            download_token_ttl_minutes: default_download_token_ttl_minutes(),
            hwid_reset_cooldown_days: default_hwid_reset_cooldown_days(),
            invite_code_batch_max: default_invite_code_batch_max(),
            token_cleanup_interval_minutes: default_token_cleanup_interval_minutes(),
        }
    }
}

impl EntitlementsConfig {
    pub fn policy(&self) -> EntitlementPolicy {
        EntitlementPolicy {
            download_token_ttl: Duration::minutes(self.download_token_ttl_minutes),
            hwid_reset_cooldown: Duration::days(self.hwid_reset_cooldown_days),
            invite_batch_max: self.invite_code_batch_max,
            ..EntitlementPolicy::default()
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_jwt_leeway() -> u64 {
    shared::jwt::DEFAULT_LEEWAY_SECS
}
fn default_download_token_ttl_minutes() -> i64 {
    30
}
fn default_hwid_reset_cooldown_days() -> i64 {
    14
}
fn default_invite_code_batch_max() -> u32 {
    domain::services::policy::DEFAULT_INVITE_BATCH_MAX
}
fn default_token_cleanup_interval_minutes() -> u64 {
    15
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Later sources override earlier ones:
    /// 1. config/default.toml
    /// 2. config/local.toml (optional, not in git)
    /// 3. Environment variables with the ENT__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("ENT").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Builds a config from embedded defaults plus `overrides`, without
    /// touching the file system. Not validated.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30

            [database]
            url = ""
            max_connections = 20
            min_connections = 5
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "json"

            [jwt]
            public_key = ""
            leeway_secs = 30

            [entitlements]
            download_token_ttl_minutes = 30
            hwid_reset_cooldown_days = 14
            invite_code_batch_max = 100
            token_cleanup_interval_minutes = 15
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "ENT__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.jwt.public_key.trim().is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "ENT__JWT__PUBLIC_KEY environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        let entitlements = &self.entitlements;
        if entitlements.download_token_ttl_minutes <= 0 {
            return Err(ConfigValidationError::InvalidValue(
                "download_token_ttl_minutes must be positive".to_string(),
            ));
        }
        if entitlements.hwid_reset_cooldown_days <= 0 {
            return Err(ConfigValidationError::InvalidValue(
                "hwid_reset_cooldown_days must be positive".to_string(),
            ));
        }
        if entitlements.invite_code_batch_max == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "invite_code_batch_max must be positive".to_string(),
            ));
        }
        if entitlements.token_cleanup_interval_minutes == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "token_cleanup_interval_minutes must be positive".to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigValidationError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|_| {
                ConfigValidationError::InvalidValue(format!(
                    "Invalid listen address {}:{}",
                    self.server.host, self.server.port
                ))
            })
    }
}
