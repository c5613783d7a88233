// common/src/config.rs
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use config::{Config as ConfigFile, File, Environment};

/// Central configuration for the wallet client and the dev identity service
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// GraphQL endpoint of the identity service
    pub identity_service_url: String,
    pub log_level: String,
    /// Per-request timeout applied by the HTTP client
    pub request_timeout_seconds: u64,

    pub client: ClientConfig,
    pub identity_server: IdentityServerConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Directory holding the persisted session slots
    pub session_dir: String,
    /// JWK keyfile used by the software wallet, if any
    pub wallet_keyfile: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdentityServerConfig {
    pub bind_addr: String,
    pub jwt_secret: String,
    pub challenge_ttl_seconds: i64,
    pub token_ttl_seconds: u64,
    pub rate_limit_per_minute: usize,
    pub cleanup_interval_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            session_dir: "./.decentwork".to_string(),
            wallet_keyfile: None,
        }
    }
}

impl Default for IdentityServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8081".to_string(),
            jwt_secret: "dev_secret".to_string(),
            challenge_ttl_seconds: 300,
            token_ttl_seconds: 86400,
            rate_limit_per_minute: 60,
            cleanup_interval_seconds: 60,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            identity_service_url: "http://127.0.0.1:8081/graphql".to_string(),
            log_level: "info".to_string(),
            request_timeout_seconds: 30,
            client: ClientConfig::default(),
            identity_server: IdentityServerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        // Get the run mode, defaulting to "development"
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        // Locate the config directory
        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        Self::load_from(&config_dir, &run_mode)
    }

    /// Layer `default.toml`, `<run_mode>.toml` and `local.toml` from `config_dir`
    pub fn load_from(config_dir: &Path, run_mode: &str) -> Result<Self, config::ConfigError> {
        tracing::debug!("Loading configuration from {}", config_dir.display());
        tracing::debug!("Using run mode: {}", run_mode);

        let defaults = Config::default();

        let config = ConfigFile::builder()
            // Start with compiled-in defaults so partial files are enough
            .set_default("identity_service_url", defaults.identity_service_url)?
            .set_default("log_level", defaults.log_level)?
            .set_default("request_timeout_seconds", defaults.request_timeout_seconds)?
            .set_default("client.session_dir", defaults.client.session_dir)?
            .set_default("identity_server.bind_addr", defaults.identity_server.bind_addr)?
            .set_default("identity_server.jwt_secret", defaults.identity_server.jwt_secret)?
            .set_default("identity_server.challenge_ttl_seconds", defaults.identity_server.challenge_ttl_seconds)?
            .set_default("identity_server.token_ttl_seconds", defaults.identity_server.token_ttl_seconds)?
            .set_default("identity_server.rate_limit_per_minute", defaults.identity_server.rate_limit_per_minute as u64)?
            .set_default("identity_server.cleanup_interval_seconds", defaults.identity_server.cleanup_interval_seconds)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Add environment specific config
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            // Add a local config file for local overrides
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // Add environment variables with prefix "APP"
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Build and deserialize
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load from files, falling back to plain environment variables
    pub fn from_env() -> Self {
        let (config, load_error) = Self::resolve();
        match load_error {
            Some(e) => Self::report_fallback(&e),
            None => tracing::debug!("Configuration loaded from files and environment"),
        }
        config
    }

    /// Like `from_env`, but hands back the file error instead of logging it.
    /// Binaries call this before tracing is installed and report afterwards.
    pub fn resolve() -> (Self, Option<config::ConfigError>) {
        match Self::load() {
            Ok(config) => (config, None),
            Err(e) => (Self::from_plain_env(), Some(e)),
        }
    }

    pub fn report_fallback(err: &config::ConfigError) {
        tracing::warn!("Failed to load configuration from files: {}", err);
        tracing::info!("Falling back to environment variables only");
    }

    fn from_plain_env() -> Self {
        let defaults = Config::default();

        let identity_service_url = env::var("IDENTITY_SERVICE_URL")
            .unwrap_or(defaults.identity_service_url);

        let log_level = env::var("LOG_LEVEL")
            .unwrap_or(defaults.log_level);

        let request_timeout_seconds = env::var("REQUEST_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.request_timeout_seconds);

        let session_dir = env::var("SESSION_DIR")
            .unwrap_or(defaults.client.session_dir);

        let wallet_keyfile = env::var("WALLET_KEYFILE").ok();

        let server = defaults.identity_server;

        let bind_addr = env::var("IDENTITY_SERVER_ADDR")
            .unwrap_or(server.bind_addr);

        let jwt_secret = env::var("JWT_SECRET")
            .unwrap_or(server.jwt_secret);

        let challenge_ttl_seconds = env::var("CHALLENGE_TTL_SECONDS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(server.challenge_ttl_seconds);

        let token_ttl_seconds = env::var("TOKEN_TTL_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(server.token_ttl_seconds);

        let rate_limit_per_minute = env::var("RATE_LIMIT_PER_MINUTE")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(server.rate_limit_per_minute);

        Self {
            identity_service_url,
            log_level,
            request_timeout_seconds,
            client: ClientConfig {
                session_dir,
                wallet_keyfile,
            },
            identity_server: IdentityServerConfig {
                bind_addr,
                jwt_secret,
                challenge_ttl_seconds,
                token_ttl_seconds,
                rate_limit_per_minute,
                cleanup_interval_seconds: server.cleanup_interval_seconds,
            },
        }
    }
}
