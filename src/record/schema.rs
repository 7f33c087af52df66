//! Record type declarations.

use std::sync::Arc;

use super::Record;

/// A declared record field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    /// Part of the record's identity constraint
    pub unique: bool,
}

/// The shape shared by every record of one type: declared type name,
/// optional table-name override, and the ordered declared fields.
///
/// All unique fields together form a single composite constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    type_name: String,
    table_name: Option<String>,
    fields: Vec<FieldSpec>,
}

impl RecordSchema {
    pub fn new(type_name: impl Into<String>) -> Self {
        RecordSchema {
            type_name: type_name.into(),
            table_name: None,
            fields: Vec::new(),
        }
    }

    /// Binds the records to an explicit table instead of the type name.
    pub fn with_table(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    /// Declares a regular field.
    pub fn field(self, name: impl Into<String>) -> Self {
        self.declare(name.into(), false)
    }

    /// Declares a field that is part of the identity constraint.
    pub fn unique_field(self, name: impl Into<String>) -> Self {
        self.declare(name.into(), true)
    }

    fn declare(mut self, name: String, unique: bool) -> Self {
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(existing) => existing.unique |= unique,
            None => self.fields.push(FieldSpec { name, unique }),
        }
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The explicit table name, or the declared type name if none was set.
    pub fn table_name(&self) -> &str {
        self.table_name.as_deref().unwrap_or(&self.type_name)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn unique_field_names(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.unique)
            .map(|f| f.name.as_str())
    }

    /// Creates an empty record of this type.
    pub fn record(self: &Arc<Self>) -> Record {
        Record::new(Arc::clone(self))
    }
}
