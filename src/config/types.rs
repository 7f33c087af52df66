//! Configuration types and CLI options.
//!
//! This module defines the library's database configuration and the enums
//! and structs used for command-line argument parsing.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use url::Url;

use crate::backend::{BackendKind, BackendProfile};
use crate::config::constants::{
    DEFAULT_ACQUIRE_TIMEOUT_SECS, DEFAULT_HOST, DEFAULT_MAX_CONNECTIONS, SQLITE_MEMORY_DATABASE,
};
use crate::error_handling::PipelineError;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Database connection and statement configuration (no CLI dependencies).
///
/// # Examples
///
/// ```no_run
/// use sql_pipeline::{BackendKind, DatabaseConfig};
///
/// let config = DatabaseConfig {
///     backend: BackendKind::Postgres,
///     database: Some("crawl".to_string()),
///     username: Some("scraper".to_string()),
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Backend kind; selects marker style, quoting and default templates
    pub backend: BackendKind,

    /// Database name, or file path for SQLite (`:memory:` when unset)
    pub database: Option<String>,

    /// Server host for client-server backends
    pub host: Option<String>,

    /// Server port for client-server backends
    pub port: Option<u16>,

    pub username: Option<String>,

    pub password: Option<String>,

    /// Log every executed statement with its values substituted
    pub debug: bool,

    /// Operation name to template, overriding the backend defaults
    pub templates: BTreeMap<String, String>,

    /// Maximum pooled connections
    pub max_connections: u32,

    /// Seconds to wait for a free pooled connection
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Sqlite,
            database: None,
            host: None,
            port: None,
            username: None,
            password: None,
            debug: false,
            templates: BTreeMap::new(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("database", &self.database)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("debug", &self.debug)
            .field("templates", &self.templates)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .finish()
    }
}

impl DatabaseConfig {
    /// Configuration for a SQLite database file.
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            backend: BackendKind::Sqlite,
            database: Some(path.into()),
            ..Default::default()
        }
    }

    fn is_sqlite_memory(&self) -> bool {
        self.backend == BackendKind::Sqlite
            && self
                .database
                .as_deref()
                .map_or(true, |db| db == SQLITE_MEMORY_DATABASE)
    }

    /// The backend profile: defaults for the backend kind plus the
    /// configured template overrides.
    pub fn profile(&self) -> BackendProfile {
        BackendProfile::new(self.backend).with_templates(self.templates.clone())
    }

    /// Pool size actually used.
    ///
    /// An in-memory SQLite database exists once per connection, so it is
    /// limited to a single connection.
    pub fn effective_max_connections(&self) -> u32 {
        if self.is_sqlite_memory() {
            1
        } else {
            self.max_connections.max(1)
        }
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Builds the sqlx connection URL for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Config` if a client-server backend has no
    /// database name or the host/credentials cannot form a URL.
    pub fn connect_url(&self) -> Result<String, PipelineError> {
        if self.backend == BackendKind::Sqlite {
            return match self.database.as_deref() {
                None | Some(SQLITE_MEMORY_DATABASE) => Ok("sqlite::memory:".to_string()),
                Some("") => Err(PipelineError::Config(
                    "SQLite database path is empty".to_string(),
                )),
                Some(path) => Ok(format!("sqlite:{}?mode=rwc", path)),
            };
        }

        let database = self
            .database
            .as_deref()
            .filter(|db| !db.is_empty())
            .ok_or_else(|| {
                PipelineError::Config(format!("{} requires a database name", self.backend))
            })?;
        let host = self.host.as_deref().unwrap_or(DEFAULT_HOST);

        let mut url = Url::parse(&format!("{}://{}", self.backend.url_scheme(), host))
            .map_err(|e| PipelineError::Config(format!("invalid host {:?}: {}", host, e)))?;
        url.set_port(self.port.or(self.backend.default_port()))
            .map_err(|_| PipelineError::Config(format!("cannot set port on {}", url)))?;
        if let Some(username) = &self.username {
            url.set_username(username)
                .map_err(|_| PipelineError::Config("cannot set username".to_string()))?;
        }
        if let Some(password) = &self.password {
            url.set_password(Some(password))
                .map_err(|_| PipelineError::Config("cannot set password".to_string()))?;
        }
        url.set_path(database);

        Ok(url.to_string())
    }
}

/// Parses `operation=template` pairs given on the command line.
fn parse_template_override(s: &str) -> Result<(String, String), String> {
    let (operation, template) = s
        .split_once('=')
        .ok_or_else(|| format!("expected OPERATION=TEMPLATE, got {:?}", s))?;
    let operation = operation.trim();
    if operation.is_empty() {
        return Err("operation name is empty".to_string());
    }
    Ok((operation.to_string(), template.to_string()))
}

/// Command-line options for the `sql_pipeline` binary.
///
/// Reads JSON-lines records and upserts them into the configured database.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sql_pipeline",
    about = "Upserts JSON-lines records into SQLite, PostgreSQL or MySQL using statement templates."
)]
pub struct Opt {
    /// File to read JSON records from, one object per line ("-" for stdin)
    #[arg(value_parser)]
    pub file: PathBuf,

    /// Database backend
    #[arg(long, value_enum, default_value = "sqlite", env = "SQL_PIPELINE_BACKEND")]
    pub backend: BackendKind,

    /// Database name, or file path for SQLite
    #[arg(long, env = "SQL_PIPELINE_DATABASE")]
    pub database: Option<String>,

    #[arg(long, env = "SQL_PIPELINE_HOST")]
    pub host: Option<String>,

    #[arg(long, env = "SQL_PIPELINE_PORT")]
    pub port: Option<u16>,

    #[arg(long, env = "SQL_PIPELINE_USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "SQL_PIPELINE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Log every executed statement with its values substituted
    #[arg(long, env = "SQL_PIPELINE_DEBUG")]
    pub debug: bool,

    /// Override a statement template, e.g. --template 'update=UPDATE $table SET $fields_values WHERE $indices:and'
    #[arg(long = "template", value_name = "OPERATION=TEMPLATE", value_parser = parse_template_override)]
    pub templates: Vec<(String, String)>,

    /// Maximum pooled connections (also bounds concurrent records)
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: u32,

    /// Seconds to wait for a free pooled connection
    #[arg(long, default_value_t = DEFAULT_ACQUIRE_TIMEOUT_SECS)]
    pub acquire_timeout_secs: u64,

    /// Declared record type name (also the table name unless --table is set)
    #[arg(long)]
    pub type_name: String,

    /// Table to write to
    #[arg(long)]
    pub table: Option<String>,

    /// Unique (identity) fields, comma-separated or repeated
    #[arg(long, value_delimiter = ',')]
    pub unique: Vec<String>,

    /// Regular fields, comma-separated or repeated
    #[arg(long = "field", value_delimiter = ',')]
    pub fields: Vec<String>,

    /// SQL script executed once after connecting (e.g. CREATE TABLE)
    #[arg(long)]
    pub setup_sql: Option<PathBuf>,

    /// Whole-record retries for records failing with a transient error
    #[arg(long, default_value_t = 0)]
    pub retry_attempts: usize,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value = "plain")]
    pub log_format: LogFormat,
}

impl Opt {
    /// The database part of the options.
    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            backend: self.backend,
            database: self.database.clone(),
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
            debug: self.debug,
            templates: self.templates.iter().cloned().collect(),
            max_connections: self.max_connections,
            acquire_timeout_secs: self.acquire_timeout_secs,
        }
    }
}
