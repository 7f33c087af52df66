//! Records handed to the pipeline.
//!
//! A [`Record`] is an ordered mapping from field name to [`Value`] built
//! against a shared [`RecordSchema`]. Iteration follows the schema's
//! declaration order restricted to populated fields, which fixes the
//! positional parameter order of every statement expanded from the record.

mod schema;
mod value;

use std::fmt;
use std::sync::Arc;

use crate::error_handling::PipelineError;

pub use schema::{FieldSpec, RecordSchema};
pub use value::Value;

/// One unit of data to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: Arc<RecordSchema>,
    // Aligned with `schema.fields()`; `None` means the field was never set.
    values: Vec<Option<Value>>,
}

impl Record {
    pub fn new(schema: Arc<RecordSchema>) -> Self {
        let values = vec![None; schema.fields().len()];
        Record { schema, values }
    }

    /// Sets a declared field.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::UnknownField` if the schema does not declare
    /// the field.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<(), PipelineError> {
        let index = self
            .schema
            .position(field)
            .ok_or_else(|| PipelineError::UnknownField {
                record: self.schema.type_name().to_string(),
                field: field.to_string(),
            })?;
        self.values[index] = Some(value.into());
        Ok(())
    }

    /// Builder form of [`Record::set`].
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Result<Self, PipelineError> {
        self.set(field, value)?;
        Ok(self)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.schema
            .position(field)
            .and_then(|index| self.values[index].as_ref())
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    pub fn table_name(&self) -> &str {
        self.schema.table_name()
    }

    /// Populated fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.schema
            .fields()
            .iter()
            .zip(&self.values)
            .filter_map(|(spec, value)| value.as_ref().map(|v| (spec.name.as_str(), v)))
    }

    /// Populated unique fields, in the same relative order as [`Record::fields`].
    pub fn unique_fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.schema
            .fields()
            .iter()
            .zip(&self.values)
            .filter(|(spec, _)| spec.unique)
            .filter_map(|(spec, value)| value.as_ref().map(|v| (spec.name.as_str(), v)))
    }

    /// The first declared unique field without a non-null value, if any.
    pub fn missing_identity_field(&self) -> Option<&str> {
        self.schema
            .fields()
            .iter()
            .zip(&self.values)
            .find(|(spec, value)| spec.unique && !matches!(value, Some(v) if !v.is_null()))
            .map(|(spec, _)| spec.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.schema.type_name())?;
        for (i, (name, value)) in self.fields().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_schema() -> Arc<RecordSchema> {
        Arc::new(
            RecordSchema::new("Item")
                .with_table("items")
                .unique_field("id")
                .field("name")
                .field("url"),
        )
    }

    #[test]
    fn test_fields_follow_declaration_order() {
        let record = item_schema()
            .record()
            .with("url", "http://example.com")
            .and_then(|r| r.with("id", 1))
            .expect("declared fields");

        let names: Vec<&str> = record.fields().map(|(name, _)| name).collect();
        assert_eq!(names, ["id", "url"]);
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = item_schema()
            .record()
            .with("price", 3)
            .expect_err("price is not declared");
        assert!(matches!(
            err,
            PipelineError::UnknownField { ref record, ref field } if record == "Item" && field == "price"
        ));
    }

    #[test]
    fn test_missing_identity_field() {
        let mut record = item_schema().record();
        record.set("name", "x").expect("declared");
        assert_eq!(record.missing_identity_field(), Some("id"));

        record.set("id", Value::Null).expect("declared");
        assert_eq!(record.missing_identity_field(), Some("id"));

        record.set("id", 7).expect("declared");
        assert_eq!(record.missing_identity_field(), None);
        assert_eq!(record.unique_fields().count(), 1);
    }

    #[test]
    fn test_display() {
        let record = item_schema()
            .record()
            .with("id", 1)
            .and_then(|r| r.with("name", "x"))
            .expect("declared fields");
        assert_eq!(record.to_string(), "Item{id=1, name='x'}");
    }
}
