use serde::Deserialize;
use std::env;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub database_url: String,
    pub jwt_secret: String,
    /// Reject requests without a token instead of serving them anonymously.
    pub require_authentication: bool,
    pub bootstrap_schema: bool,
    pub db_max_connections: u32,
    pub log_dir: String,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    listen_addr: Option<String>,
    database_url: Option<String>,
    jwt_secret: Option<String>,
    require_authentication: Option<bool>,
    bootstrap_schema: Option<bool>,
    db_max_connections: Option<u32>,
    log_dir: Option<String>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| format!("Invalid value for {key}: {e}"))
        })
        .transpose()
}

impl PartialServerConfig {
    fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        Ok(PartialServerConfig {
            listen_addr: lookup("LISTEN_ADDR"),
            database_url: lookup("DATABASE_URL"),
            jwt_secret: lookup("JWT_SECRET"),
            require_authentication: parse_var(&lookup, "REQUIRE_AUTHENTICATION")?,
            bootstrap_schema: parse_var(&lookup, "BOOTSTRAP_SCHEMA")?,
            db_max_connections: parse_var(&lookup, "DB_MAX_CONNECTIONS")?,
            log_dir: lookup("LOG_DIR"),
        })
    }

    fn from_toml(contents: &str, origin: &Path) -> Result<Self, String> {
        toml::from_str(contents)
            .map_err(|e| format!("Failed to parse TOML from config file at {origin:?}: {e}"))
    }
}

impl ServerConfig {
    /// Loads the optional TOML file, then lets environment variables override it.
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config = match config_path.map(Path::new) {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)
                    .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
                PartialServerConfig::from_toml(&contents, path)?
            }
            _ => PartialServerConfig::default(),
        };

        // 2. Load from environment variables
        let env_config = PartialServerConfig::from_env_with(|key| env::var(key).ok())?;

        // 3. Merge: environment overrides file
        Self::merge(env_config, file_config)
    }

    fn merge(
        env_config: PartialServerConfig,
        file_config: PartialServerConfig,
    ) -> Result<Self, String> {
        Ok(ServerConfig {
            listen_addr: env_config
                .listen_addr
                .or(file_config.listen_addr)
                .unwrap_or_else(default_listen_addr),
            database_url: env_config
                .database_url
                .or(file_config.database_url)
                .ok_or("DATABASE_URL is required")?,
            jwt_secret: env_config
                .jwt_secret
                .or(file_config.jwt_secret)
                .ok_or("JWT_SECRET is required")?,
            require_authentication: env_config
                .require_authentication
                .or(file_config.require_authentication)
                .unwrap_or(false),
            bootstrap_schema: env_config
                .bootstrap_schema
                .or(file_config.bootstrap_schema)
                .unwrap_or(true),
            db_max_connections: env_config
                .db_max_connections
                .or(file_config.db_max_connections)
                .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
            log_dir: env_config
                .log_dir
                .or(file_config.log_dir)
                .unwrap_or_else(default_log_dir),
        })
    }
}
