//! Supported database backends.
//!
//! The set of backends is closed: each [`BackendKind`] resolves to one
//! [`BackendProfile`] (marker style, identifier quote, default templates)
//! and one transient-error code table.

mod profile;
mod templates;

use clap::ValueEnum;
use serde::Deserialize;
use strum_macros::{EnumIter, EnumString};

use crate::config::{MYSQL_DEFAULT_PORT, POSTGRES_DEFAULT_PORT};
use crate::error_handling::{classify_sqlx_error, PipelineError};

pub use profile::{BackendProfile, ParamStyle};
pub use templates::Operation;

/// Database backend kind.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Deserialize, EnumIter, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BackendKind {
    /// File-based embedded engine
    #[default]
    #[serde(alias = "sqlite3")]
    #[strum(serialize = "sqlite", serialize = "sqlite3")]
    #[value(alias = "sqlite3")]
    Sqlite,
    /// PostgreSQL server
    #[serde(alias = "pgsql", alias = "postgresql")]
    #[strum(serialize = "postgres", serialize = "pgsql", serialize = "postgresql")]
    #[value(alias = "pgsql", alias = "postgresql")]
    Postgres,
    /// MySQL or MariaDB server
    #[serde(alias = "mariadb")]
    #[strum(serialize = "mysql", serialize = "mariadb")]
    #[value(alias = "mariadb")]
    Mysql,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Sqlite => "sqlite",
            BackendKind::Postgres => "postgres",
            BackendKind::Mysql => "mysql",
        }
    }

    /// URL scheme understood by the sqlx `Any` driver.
    pub fn url_scheme(&self) -> &'static str {
        match self {
            BackendKind::Sqlite => "sqlite",
            BackendKind::Postgres => "postgres",
            BackendKind::Mysql => "mysql",
        }
    }

    /// Port used when the configuration does not name one.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            BackendKind::Sqlite => None,
            BackendKind::Postgres => Some(POSTGRES_DEFAULT_PORT),
            BackendKind::Mysql => Some(MYSQL_DEFAULT_PORT),
        }
    }

    /// The profile this backend uses out of the box.
    pub fn profile(&self) -> BackendProfile {
        BackendProfile::new(*self)
    }

    /// Classifies a driver error using this backend's code tables.
    pub fn classify(&self, error: sqlx::Error) -> PipelineError {
        classify_sqlx_error(*self, error)
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_backend_kind_from_str_aliases() {
        assert_eq!("sqlite".parse::<BackendKind>().ok(), Some(BackendKind::Sqlite));
        assert_eq!("SQLite3".parse::<BackendKind>().ok(), Some(BackendKind::Sqlite));
        assert_eq!("pgsql".parse::<BackendKind>().ok(), Some(BackendKind::Postgres));
        assert_eq!("mysql".parse::<BackendKind>().ok(), Some(BackendKind::Mysql));
        assert!("oracle".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_backend_kind_deserialize_alias() {
        let kind: BackendKind = serde_json::from_str("\"pgsql\"").expect("alias parses");
        assert_eq!(kind, BackendKind::Postgres);
    }

    #[test]
    fn test_default_ports() {
        assert_eq!(BackendKind::Sqlite.default_port(), None);
        assert_eq!(BackendKind::Postgres.default_port(), Some(5432));
        assert_eq!(BackendKind::Mysql.default_port(), Some(3306));
    }

    #[test]
    fn test_every_backend_has_insert_and_update_templates() {
        for kind in BackendKind::iter() {
            let profile = kind.profile();
            assert!(profile.template("insert").is_ok(), "{} lacks insert", kind);
            assert!(profile.template("update").is_ok(), "{} lacks update", kind);
        }
    }
}
