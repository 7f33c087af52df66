//! Statement template engine.
//!
//! Templates are SQL text with symbolic placeholders:
//!
//! - `$table` table name, quoted (`$table:esc`, the default) or raw (`$table:raw`)
//! - `$fields` quoted field names, joined by `,`
//! - `$values` one parameter marker per field
//! - `$fields_values` `field=marker` pairs for every field
//! - `$indices` / `$indexes` `field=marker` pairs for the unique fields only
//!
//! A modifier on a list placeholder replaces the `,` joiner: `$indices:and`
//! joins with ` AND `, which is usually what a WHERE clause wants (all unique
//! fields count as one constraint).
//!
//! Markers are numbered with a single counter across the whole template, so
//! `$fields_values` followed by `$indices` never reuse a marker.

mod placeholder;

use std::ops::Range;

use crate::backend::BackendProfile;
use crate::error_handling::PipelineError;
use crate::record::{Record, Value};

use placeholder::{scan, Placeholder, PlaceholderKind};

/// An expanded template: statement text plus the values bound to its
/// markers, in marker order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<Value>,
    // Byte range of each marker in `sql`, parallel to `params`
    markers: Vec<Range<usize>>,
}

impl Statement {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// The statement with every marker replaced by its value as an SQL
    /// literal. For logs only.
    pub fn literal(&self) -> String {
        let mut out = String::with_capacity(self.sql.len());
        let mut last = 0;
        for (range, value) in self.markers.iter().zip(&self.params) {
            out.push_str(&self.sql[last..range.start]);
            out.push_str(&value.to_sql_literal());
            last = range.end;
        }
        out.push_str(&self.sql[last..]);
        out
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Returns true for templates that only read (`SELECT ...`).
pub fn is_read_only(template: &str) -> bool {
    template
        .trim_start()
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("select"))
}

/// Expands a template against a record for a backend profile.
///
/// # Errors
///
/// - `PipelineError::MissingIdentityField` if the template is destructive
///   (anything but a `SELECT`) and a unique field has no value
/// - `PipelineError::InvalidPlaceholder` if the template uses a name outside
///   the supported set
pub fn expand(
    template: &str,
    record: &Record,
    profile: &BackendProfile,
) -> Result<Statement, PipelineError> {
    if !is_read_only(template) {
        if let Some(field) = record.missing_identity_field() {
            return Err(PipelineError::MissingIdentityField {
                record: record.to_string(),
                field: field.to_string(),
            });
        }
    }

    let fields: Vec<(&str, &Value)> = record.fields().collect();
    let indices: Vec<(&str, &Value)> = record.unique_fields().collect();

    let mut builder = StatementBuilder::new(profile, template.len());
    let mut last = 0;
    for placeholder in scan(template) {
        let placeholder = placeholder?;
        builder.push_str(&template[last..placeholder.span.start]);
        builder.push_placeholder(&placeholder, record.table_name(), &fields, &indices);
        last = placeholder.span.end;
    }
    builder.push_str(&template[last..]);

    Ok(builder.finish())
}

struct StatementBuilder<'p> {
    profile: &'p BackendProfile,
    sql: String,
    params: Vec<Value>,
    markers: Vec<Range<usize>>,
}

impl<'p> StatementBuilder<'p> {
    fn new(profile: &'p BackendProfile, capacity: usize) -> Self {
        StatementBuilder {
            profile,
            sql: String::with_capacity(capacity),
            params: Vec::new(),
            markers: Vec::new(),
        }
    }

    fn push_str(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    fn push_identifier(&mut self, name: &str) {
        let quoted = self.profile.quote_identifier(name);
        self.sql.push_str(&quoted);
    }

    fn push_marker(&mut self, value: &Value) {
        let start = self.sql.len();
        self.profile
            .param_style()
            .write_marker(&mut self.sql, self.params.len() + 1);
        self.markers.push(start..self.sql.len());
        self.params.push(value.clone());
    }

    fn push_joined(
        &mut self,
        items: &[(&str, &Value)],
        joiner: &str,
        mut each: impl FnMut(&mut Self, &str, &Value),
    ) {
        for (i, (name, value)) in items.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(joiner);
            }
            each(self, *name, *value);
        }
    }

    fn push_placeholder(
        &mut self,
        placeholder: &Placeholder<'_>,
        table: &str,
        fields: &[(&str, &Value)],
        indices: &[(&str, &Value)],
    ) {
        let joiner = placeholder.joiner();
        match placeholder.kind {
            PlaceholderKind::Table => {
                if placeholder.wants_quoting() {
                    self.push_identifier(table);
                } else {
                    self.push_str(table);
                }
            }
            PlaceholderKind::Fields => {
                self.push_joined(fields, &joiner, |b, name, _| b.push_identifier(name));
            }
            PlaceholderKind::Values => {
                self.push_joined(fields, &joiner, |b, _, value| b.push_marker(value));
            }
            PlaceholderKind::FieldsValues => {
                self.push_joined(fields, &joiner, Self::push_assignment);
            }
            PlaceholderKind::Indices => {
                self.push_joined(indices, &joiner, Self::push_assignment);
            }
        }
    }

    fn push_assignment(&mut self, name: &str, value: &Value) {
        self.push_identifier(name);
        self.sql.push('=');
        self.push_marker(value);
    }

    fn finish(self) -> Statement {
        Statement {
            sql: self.sql,
            params: self.params,
            markers: self.markers,
        }
    }
}
