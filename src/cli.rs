//! Command-line argument parsing for trino-eda.

use crate::config::{Config, ConnectionConfig};
use crate::error::{EdaError, Result};
use crate::session::DEFAULT_TABLES;
use clap::Parser;
use std::path::PathBuf;

/// Bootstrap an exploratory session against a Trino cluster.
#[derive(Parser, Debug)]
#[command(name = "trino-eda")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Engine host
    #[arg(short = 'H', long, value_name = "HOST")]
    pub host: Option<String>,

    /// Engine port
    #[arg(short = 'p', long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Catalog to resolve tables in
    #[arg(long, value_name = "CATALOG")]
    pub catalog: Option<String>,

    /// Schema to resolve tables in
    #[arg(long, value_name = "SCHEMA")]
    pub schema: Option<String>,

    /// Engine user (overrides the environment)
    #[arg(short = 'U', long, value_name = "USER")]
    pub user: Option<String>,

    /// Environment variable to read the user from
    #[arg(long, value_name = "VAR")]
    pub user_env: Option<String>,

    /// Table to bind (repeatable)
    #[arg(short = 't', long = "table", value_name = "NAME")]
    pub tables: Vec<String>,

    /// Rows to preview per table
    #[arg(short = 'n', long, value_name = "ROWS", default_value_t = 10)]
    pub limit: usize,

    /// Only bind tables and print their columns
    #[arg(long)]
    pub no_preview: bool,

    /// Use named connection from config
    #[arg(short = 'c', long, value_name = "NAME")]
    pub connection: Option<String>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Load environment from this file instead of ./.env
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Talk plain HTTP instead of HTTPS (local engines only)
    #[arg(long)]
    pub insecure_http: bool,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Use the in-memory engine with sample tables
    #[arg(long)]
    pub mock_db: bool,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Returns the named connection to use, if specified.
    pub fn connection_name(&self) -> Option<&str> {
        self.connection.as_deref()
    }

    /// Returns the tables to bind.
    pub fn table_names(&self) -> Vec<String> {
        if self.tables.is_empty() {
            DEFAULT_TABLES.iter().map(|t| t.to_string()).collect()
        } else {
            self.tables.clone()
        }
    }

    /// Resolves the connection without consulting the environment.
    ///
    /// Precedence: CLI flags, then the named connection, then the `default`
    /// connection from the config file, then built-in constants.
    pub fn resolve_connection(&self, config: &Config) -> Result<ConnectionConfig> {
        let mut connection = match self.connection_name() {
            Some(name) => config.get_connection(Some(name)).cloned().ok_or_else(|| {
                EdaError::config(format!("Connection '{name}' not found in config file"))
            })?,
            None => config.get_connection(None).cloned().unwrap_or_default(),
        };

        self.apply_overrides(&mut connection);
        Ok(connection)
    }

    fn apply_overrides(&self, connection: &mut ConnectionConfig) {
        if let Some(host) = &self.host {
            connection.host = host.clone();
        }
        if let Some(port) = self.port {
            connection.port = port;
        }
        if let Some(catalog) = &self.catalog {
            connection.catalog = catalog.clone();
        }
        if let Some(schema) = &self.schema {
            connection.schema = schema.clone();
        }
        if let Some(user) = &self.user {
            connection.user = Some(user.clone());
        }
        if let Some(user_env) = &self.user_env {
            connection.user_env = user_env.clone();
        }
        if self.insecure_http {
            connection.secure = false;
        }
        if let Some(timeout) = self.timeout {
            connection.timeout_secs = timeout;
        }
    }
}
