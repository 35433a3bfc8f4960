use std::env;

use auth::MIN_SECRET_BYTES;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

/// Secret shipped in `config/development.toml`; refused in production.
pub const DEVELOPMENT_SECRET: &str = "development-only-secret-change-me-0123456789";

const PRODUCTION_MODE: &str = "production";
const MIN_EXPIRATION_MS: i64 = 1_000;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    /// In-memory credential store when absent.
    pub database: Option<DatabaseConfig>,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
}

#[derive(Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_expiration_ms")]
    pub expiration_ms: i64,
}

impl JwtConfig {
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.expiration_ms)
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"***")
            .field("expiration_ms", &self.expiration_ms)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
            max_age_secs: default_max_age_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SecurityConfig {
    /// Path prefixes reachable without an identity.
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            public_paths: default_public_paths(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_expiration_ms() -> i64 {
    86_400_000
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:3001".to_string(),
    ]
}

fn default_max_age_secs() -> u64 {
    3600
}

fn default_public_paths() -> Vec<String> {
    vec![
        "/auth/login".to_string(),
        "/auth/register".to_string(),
        "/auth/health".to_string(),
    ]
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (JWT__SECRET, DATABASE__URL, SERVER__HTTP_PORT, etc.)
    /// 2. Environment-specific config file (config/{RUN_MODE}.toml)
    /// 3. Default config file (config/default.toml)
    ///
    /// List values may be given as comma-separated strings in the environment,
    /// e.g. `CORS__ALLOWED_ORIGINS=https://a.example,https://b.example`.
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .with_list_parse_key("security.public_paths")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = configuration.try_deserialize()?;
        config.validate(&run_mode)?;

        Ok(config)
    }

    /// Reject configurations the service must not start with.
    ///
    /// # Errors
    /// * Signing secret shorter than 32 bytes
    /// * Token lifetime under one second or not a whole number of seconds
    /// * Development secret used in production mode
    pub fn validate(&self, run_mode: &str) -> Result<(), ConfigError> {
        let secret_len = self.jwt.secret.as_bytes().len();
        if secret_len < MIN_SECRET_BYTES {
            return Err(ConfigError::Message(format!(
                "jwt.secret must be at least {} bytes, got {}",
                MIN_SECRET_BYTES, secret_len
            )));
        }

        if self.jwt.expiration_ms < MIN_EXPIRATION_MS {
            return Err(ConfigError::Message(format!(
                "jwt.expiration_ms must be at least {}, got {}",
                MIN_EXPIRATION_MS, self.jwt.expiration_ms
            )));
        }

        // Token `exp` is a whole-second NumericDate.
        if self.jwt.expiration_ms % 1000 != 0 {
            return Err(ConfigError::Message(format!(
                "jwt.expiration_ms must be a whole number of seconds, got {}",
                self.jwt.expiration_ms
            )));
        }

        if run_mode == PRODUCTION_MODE && self.jwt.secret == DEVELOPMENT_SECRET {
            return Err(ConfigError::Message(
                "jwt.secret is the development placeholder; set JWT__SECRET".to_string(),
            ));
        }

        Ok(())
    }
}
