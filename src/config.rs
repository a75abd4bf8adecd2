//! Configuration management for trino-eda.
//!
//! Handles loading configuration from TOML files, `.env` files and
//! environment variables, with support for named engine connections.

use crate::error::{EdaError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Engine host used when nothing else is configured.
pub const DEFAULT_HOST: &str = "voda-sample.trino.galaxy.starburst.io";

/// Engine port used when nothing else is configured.
pub const DEFAULT_PORT: u16 = 443;

/// Catalog the session is bound to by default.
pub const DEFAULT_CATALOG: &str = "sample";

/// Schema the session is bound to by default.
pub const DEFAULT_SCHEMA: &str = "demo";

/// Environment variable holding the engine user.
pub const DEFAULT_USER_ENV: &str = "USERNAME";

/// Environment variable holding the engine password.
pub const DEFAULT_PASSWORD_ENV: &str = "PASSWORD";

/// Default HTTP request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Connection used when none is named.
const DEFAULT_CONNECTION: &str = "default";

/// Main configuration structure for trino-eda.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Named engine connections.
    #[serde(default)]
    pub connections: HashMap<String, ConnectionConfig>,
}

/// Engine connection configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Engine host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Engine port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Catalog tables are resolved in.
    #[serde(default = "default_catalog")]
    pub catalog: String,

    /// Schema tables are resolved in.
    #[serde(default = "default_schema")]
    pub schema: String,

    /// Engine user. Normally taken from the environment.
    pub user: Option<String>,

    /// Engine password. Never written back out.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Use TLS (`https`). Plain HTTP is only meant for local engines.
    #[serde(default = "default_secure")]
    pub secure: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Name of the environment variable the user is read from.
    #[serde(default = "default_user_env")]
    pub user_env: String,

    /// Name of the environment variable the password is read from.
    #[serde(default = "default_password_env")]
    pub password_env: String,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_catalog() -> String {
    DEFAULT_CATALOG.to_string()
}

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

fn default_secure() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_user_env() -> String {
    DEFAULT_USER_ENV.to_string()
}

fn default_password_env() -> String {
    DEFAULT_PASSWORD_ENV.to_string()
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            catalog: default_catalog(),
            schema: default_schema(),
            user: None,
            password: None,
            secure: default_secure(),
            timeout_secs: default_timeout_secs(),
            user_env: default_user_env(),
            password_env: default_password_env(),
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("catalog", &self.catalog)
            .field("schema", &self.schema)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("secure", &self.secure)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Engine credentials, resolved once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl ConnectionConfig {
    /// Fills `user` and `password` from the process environment when unset.
    pub fn apply_env_defaults(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Fills `user` and `password` using the given variable lookup when unset.
    ///
    /// Empty values are treated as unset.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if self.user.is_none() {
            self.user = lookup(&self.user_env);
        }
        if self.password.is_none() {
            self.password = lookup(&self.password_env);
        }
    }

    /// Returns the credentials, failing if either half is missing.
    pub fn credentials(&self) -> Result<Credentials> {
        let user = self
            .user
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                EdaError::config(format!(
                    "No engine user configured. Set {} or pass --user",
                    self.user_env
                ))
            })?;
        let password = self
            .password
            .clone()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                EdaError::config(format!("No engine password configured. Set {}", self.password_env))
            })?;

        Ok(Credentials { user, password })
    }

    /// Returns the URL scheme for this connection.
    pub fn scheme(&self) -> &'static str {
        if self.secure {
            "https"
        } else {
            "http"
        }
    }

    /// Returns the base URL of the engine (`scheme://host:port/`).
    pub fn base_url(&self) -> Result<Url> {
        let raw = format!("{}://{}:{}/", self.scheme(), self.host, self.port);
        Url::parse(&raw).map_err(|e| EdaError::config(format!("Invalid engine address '{raw}': {e}")))
    }

    /// Returns the statement endpoint (`/v1/statement`).
    pub fn statement_url(&self) -> Result<Url> {
        self.base_url()?
            .join("v1/statement")
            .map_err(|e| EdaError::config(format!("Invalid statement endpoint: {e}")))
    }

    /// Returns a display-safe string (no password) for log output.
    pub fn display_string(&self) -> String {
        format!(
            "{}.{} @ {}:{}",
            self.catalog, self.schema, self.host, self.port
        )
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("trino-eda")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the default configuration.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| EdaError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        Self::from_toml_str(content).map_err(|e| {
            EdaError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Parses a config document.
    ///
    /// Every named connection inherits the keys it leaves out from
    /// `[connections.default]`; built-in defaults fill whatever remains.
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        let mut document: toml::Table = content.parse()?;

        if let Some(toml::Value::Table(connections)) = document.get_mut("connections") {
            let base = match connections.get(DEFAULT_CONNECTION) {
                Some(toml::Value::Table(base)) => base.clone(),
                _ => toml::Table::new(),
            };
            for (name, connection) in connections.iter_mut() {
                let toml::Value::Table(connection) = connection else {
                    continue;
                };
                if name == DEFAULT_CONNECTION {
                    continue;
                }
                for (key, value) in &base {
                    if !connection.contains_key(key) {
                        connection.insert(key.clone(), value.clone());
                    }
                }
            }
        }

        toml::Value::Table(document).try_into()
    }

    /// Gets a named connection, or the default connection if name is None.
    pub fn get_connection(&self, name: Option<&str>) -> Option<&ConnectionConfig> {
        let key = name.unwrap_or(DEFAULT_CONNECTION);
        self.connections.get(key)
    }
}

/// Loads a `.env` file into the process environment.
///
/// Variables that are already set are left untouched. Without an explicit
/// path a missing `.env` is fine; an explicit path that cannot be read is an
/// error.
pub fn load_env_file(path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            dotenvy::from_path(path).map_err(|e| {
                EdaError::config(format!("Failed to load env file {}: {e}", path.display()))
            })?;
            debug!("Loaded environment from {}", path.display());
        }
        None => match dotenvy::dotenv() {
            Ok(found) => debug!("Loaded environment from {}", found.display()),
            Err(e) if e.not_found() => debug!("No .env file found"),
            Err(e) => return Err(EdaError::config(format!("Failed to load .env: {e}"))),
        },
    }
    Ok(())
}
