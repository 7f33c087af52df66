//! Default statement templates per backend.

use std::collections::BTreeMap;

use strum_macros::{AsRefStr, EnumIter, EnumString};

use super::BackendKind;

/// Named operations with default templates.
///
/// Templates are keyed by plain strings so callers can register operations
/// of their own; these are the names every backend knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Operation {
    Insert,
    Update,
    Upsert,
    /// Select on the unique fields
    Select,
    #[strum(serialize = "selectall")]
    SelectAll,
    #[strum(serialize = "fetchone")]
    FetchOne,
    /// Delete on the unique fields
    Delete,
    /// Delete the exact record (every populated field must match)
    #[strum(serialize = "deleteme")]
    DeleteMe,
}

impl Operation {
    pub fn as_str(&self) -> &str {
        self.as_ref()
    }
}

const SELECT: &str = "SELECT $fields FROM $table:esc WHERE $indices:and";
const SELECT_ALL: &str = "SELECT $fields FROM $table:esc";
const FETCH_ONE: &str = "SELECT $fields FROM $table:esc WHERE $indices:and LIMIT 1";
const DELETE: &str = "DELETE FROM $table:esc WHERE $indices:and";
const DELETE_ME: &str = "DELETE FROM $table:esc WHERE $fields_values:and";
const INSERT: &str = "INSERT INTO $table:esc ($fields) VALUES ($values)";
const UPDATE: &str = "UPDATE $table:esc SET $fields_values WHERE $indices:and";

/// Builds the operation to template map a backend starts from.
pub(super) fn default_templates(kind: BackendKind) -> BTreeMap<String, String> {
    let mut templates: BTreeMap<String, String> = [
        (Operation::Select, SELECT),
        (Operation::SelectAll, SELECT_ALL),
        (Operation::FetchOne, FETCH_ONE),
        (Operation::Delete, DELETE),
        (Operation::DeleteMe, DELETE_ME),
        (Operation::Insert, INSERT),
        (Operation::Update, UPDATE),
    ]
    .into_iter()
    .map(|(op, template)| (op.as_str().to_string(), template.to_string()))
    .collect();

    let upsert = match kind {
        BackendKind::Sqlite => Some("INSERT OR REPLACE INTO $table:esc ($fields) VALUES ($values)"),
        BackendKind::Mysql => Some("REPLACE INTO $table:esc ($fields) VALUES ($values)"),
        // ON CONFLICT needs a conflict target the placeholder set cannot name
        BackendKind::Postgres => None,
    };
    if let Some(upsert) = upsert {
        templates.insert(Operation::Upsert.as_str().to_string(), upsert.to_string());
    }

    templates
}
