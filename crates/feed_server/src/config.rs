//! Server configuration management
//!
//! Loads configuration from TOML files, environment variables and CLI
//! arguments. Besides the listener settings it carries the generation
//! parameters, the hub policy and the instruments seeded at start-up.

use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;

use feed_engine::{HubConfig, SchedulerConfig};
use feed_models::{MeanRevertingConfig, ModelConfig};
use serde::Deserialize;
use thiserror::Error;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid port number: {0}. Must be between 1 and 65535")]
    InvalidPort(u16),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid environment: {0}. Must be one of: development, staging, production")]
    InvalidEnvironment(String),

    #[error("Configuration file error: {0}")]
    FileError(String),

    #[error("Environment variable {name}: {message}")]
    EnvError { name: &'static str, message: String },

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Log levels supported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    const ALL: [LogLevel; 5] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
    ];

    /// Tracing filter directive for this level
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_filter_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::InvalidLogLevel(s.to_string()))
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_filter_str())
    }
}

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidEnvironment(s.to_string())),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        })
    }
}

/// Instrument created at start-up with its first price.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstrumentSeed {
    pub name: String,
    pub initial_price: f64,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Active model; the default model is assigned when absent
    #[serde(default)]
    pub model: Option<ModelConfig>,
}

fn default_tick_interval_ms() -> u64 {
    1_000
}

impl InstrumentSeed {
    pub fn new(name: impl Into<String>, initial_price: f64, tick_interval_ms: u64) -> Self {
        Self {
            name: name.into(),
            initial_price,
            tick_interval_ms,
            model: None,
        }
    }

    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.model = Some(model);
        self
    }
}

fn default_instruments() -> Vec<InstrumentSeed> {
    vec![
        InstrumentSeed::new("FTSE", 7_500.0, 1_000).with_model(ModelConfig::MeanReverting(
            MeanRevertingConfig {
                mean: 7_500.0,
                ..MeanRevertingConfig::default()
            },
        )),
        InstrumentSeed::new("DAX", 17_000.0, 500),
        InstrumentSeed::new("CAC", 7_400.0, 250),
    ]
}

/// Server configuration structure
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Log level
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    /// Environment (development, staging, production)
    #[serde(deserialize_with = "deserialize_environment")]
    pub environment: Environment,
    /// Grace period for the generation loop after the listener closes
    pub shutdown_timeout_secs: u64,
    /// Tick loop and throttle windows
    pub scheduler: SchedulerConfig,
    /// Subscriber queue policy
    pub hub: HubConfig,
    /// Instruments seeded into the store at start-up
    pub instruments: Vec<InstrumentSeed>,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    LogLevel::from_str(&s).map_err(serde::de::Error::custom)
}

fn deserialize_environment<'de, D>(deserializer: D) -> Result<Environment, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Environment::from_str(&s).map_err(serde::de::Error::custom)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: LogLevel::Info,
            environment: Environment::Development,
            shutdown_timeout_secs: 30,
            scheduler: SchedulerConfig::default(),
            hub: HubConfig::default(),
            instruments: default_instruments(),
        }
    }
}

pub const ENV_HOST: &str = "FEED_SERVER_HOST";
pub const ENV_PORT: &str = "FEED_SERVER_PORT";
pub const ENV_LOG_LEVEL: &str = "FEED_LOG_LEVEL";
pub const ENV_ENVIRONMENT: &str = "FEED_ENV";
pub const ENV_SHUTDOWN_TIMEOUT_SECS: &str = "FEED_SHUTDOWN_TIMEOUT_SECS";
pub const ENV_CHECK_INTERVAL_MS: &str = "FEED_CHECK_INTERVAL_MS";
pub const ENV_PERSISTENCE_INTERVAL_MS: &str = "FEED_PERSISTENCE_INTERVAL_MS";
pub const ENV_PUBLISH_INTERVAL_MS: &str = "FEED_PUBLISH_INTERVAL_MS";
pub const ENV_RNG_SEED: &str = "FEED_RNG_SEED";

fn parse_env<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::EnvError {
        name,
        message: format!("cannot parse '{value}': {e}"),
    })
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileError(format!("Failed to read config file: {}", e)))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = toml::from_str(content)
            .map_err(|e| ConfigError::FileError(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Overrides every field whose variable is set.
    ///
    /// `lookup` resolves a variable name; tests pass a map instead of the
    /// process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            self.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = parse_env(ENV_PORT, &port)?;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = LogLevel::from_str(&level)?;
        }
        if let Some(env) = lookup(ENV_ENVIRONMENT) {
            self.environment = Environment::from_str(&env)?;
        }
        if let Some(secs) = lookup(ENV_SHUTDOWN_TIMEOUT_SECS) {
            self.shutdown_timeout_secs = parse_env(ENV_SHUTDOWN_TIMEOUT_SECS, &secs)?;
        }
        if let Some(ms) = lookup(ENV_CHECK_INTERVAL_MS) {
            self.scheduler.check_interval_ms = parse_env(ENV_CHECK_INTERVAL_MS, &ms)?;
        }
        if let Some(ms) = lookup(ENV_PERSISTENCE_INTERVAL_MS) {
            self.scheduler.persistence_interval_ms = parse_env(ENV_PERSISTENCE_INTERVAL_MS, &ms)?;
        }
        if let Some(ms) = lookup(ENV_PUBLISH_INTERVAL_MS) {
            self.scheduler.publish_interval_ms = parse_env(ENV_PUBLISH_INTERVAL_MS, &ms)?;
        }
        if let Some(seed) = lookup(ENV_RNG_SEED) {
            self.scheduler.rng_seed = Some(parse_env(ENV_RNG_SEED, &seed)?);
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }
        self.scheduler
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        if self.hub.queue_capacity == 0 {
            return Err(ConfigError::Validation(
                "hub.queue_capacity must be positive".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for seed in &self.instruments {
            let name = seed.name.trim();
            if name.is_empty() {
                return Err(ConfigError::Validation("instrument name is empty".to_string()));
            }
            if !names.insert(name) {
                return Err(ConfigError::Validation(format!(
                    "instrument '{name}' is defined twice"
                )));
            }
            if !seed.initial_price.is_finite() || seed.initial_price <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "instrument '{name}': initial_price must be positive"
                )));
            }
            if seed.tick_interval_ms == 0 {
                return Err(ConfigError::Validation(format!(
                    "instrument '{name}': tick_interval_ms must be positive"
                )));
            }
            if let Some(model) = &seed.model {
                model
                    .validate()
                    .map_err(|e| ConfigError::Validation(format!("instrument '{name}': {e}")))?;
            }
        }
        Ok(())
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Merge with CLI arguments (CLI takes precedence)
    pub fn merge_with_cli(&mut self, cli: &CliArgs) -> Result<(), ConfigError> {
        if let Some(host) = &cli.host {
            self.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(log_level) = &cli.log_level {
            self.log_level = LogLevel::from_str(log_level)?;
        }
        if let Some(seed) = cli.seed {
            self.scheduler.rng_seed = Some(seed);
        }
        Ok(())
    }
}

/// CLI arguments structure
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Config file path
    pub config_file: Option<PathBuf>,
    /// Host address override
    pub host: Option<String>,
    /// Port override
    pub port: Option<u16>,
    /// Log level override
    pub log_level: Option<String>,
    /// Random seed override
    pub seed: Option<u64>,
}

/// Build configuration from all sources
///
/// Priority (highest to lowest):
/// 1. CLI arguments
/// 2. Environment variables
/// 3. Config file
/// 4. Default values
pub fn build_config(cli: &CliArgs) -> Result<ServerConfig, ConfigError> {
    build_config_with(cli, |name| std::env::var(name).ok())
}

/// [`build_config`] with an explicit environment lookup.
pub fn build_config_with<F>(cli: &CliArgs, lookup: F) -> Result<ServerConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match &cli.config_file {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    config.apply_env(lookup)?;
    config.merge_with_cli(cli)?;
    config.validate()?;
    Ok(config)
}
