//! Immutable backend profile.

use std::collections::BTreeMap;

use crate::error_handling::PipelineError;
use crate::record::Record;
use crate::template::{expand, Statement};

use super::templates::default_templates;
use super::BackendKind;

/// How bound parameters are written into statement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamStyle {
    /// A bare `?` for every parameter
    QuestionMark,
    /// The prefix followed by the 1-based parameter index: `?1`, `$1`, `:1`
    Numbered(char),
    /// A bare `%s` for every parameter
    Format,
}

impl ParamStyle {
    /// Writes the marker for the parameter at `index` (1-based).
    pub fn write_marker(&self, out: &mut String, index: usize) {
        match self {
            ParamStyle::QuestionMark => out.push('?'),
            ParamStyle::Numbered(prefix) => {
                out.push(*prefix);
                out.push_str(&index.to_string());
            }
            ParamStyle::Format => out.push_str("%s"),
        }
    }
}

/// Resolved configuration for one backend: marker style, identifier quote
/// and the operation to template map.
///
/// Profiles never change once built. The `with_*` methods consume the
/// profile and return a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendProfile {
    kind: BackendKind,
    param_style: ParamStyle,
    identifier_quote: char,
    templates: BTreeMap<String, String>,
}

impl BackendProfile {
    /// The out-of-the-box profile for a backend kind.
    pub fn new(kind: BackendKind) -> Self {
        let (param_style, identifier_quote) = match kind {
            BackendKind::Sqlite => (ParamStyle::Numbered('?'), '"'),
            BackendKind::Postgres => (ParamStyle::Numbered('$'), '"'),
            BackendKind::Mysql => (ParamStyle::QuestionMark, '`'),
        };
        BackendProfile {
            kind,
            param_style,
            identifier_quote,
            templates: default_templates(kind),
        }
    }

    pub fn with_param_style(mut self, param_style: ParamStyle) -> Self {
        self.param_style = param_style;
        self
    }

    pub fn with_identifier_quote(mut self, quote: char) -> Self {
        self.identifier_quote = quote;
        self
    }

    /// Overrides (or adds) templates per operation name.
    pub fn with_templates<I, K, V>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (operation, template) in overrides {
            self.templates.insert(operation.into(), template.into());
        }
        self
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn param_style(&self) -> ParamStyle {
        self.param_style
    }

    pub fn identifier_quote(&self) -> char {
        self.identifier_quote
    }

    /// The template registered for an operation.
    pub fn template(&self, operation: &str) -> Result<&str, PipelineError> {
        self.templates
            .get(operation)
            .map(String::as_str)
            .ok_or_else(|| PipelineError::UnknownOperation(operation.to_string()))
    }

    /// Operation names with a registered template, in sorted order.
    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Expands the template of `operation` against a record.
    pub fn expand(&self, operation: &str, record: &Record) -> Result<Statement, PipelineError> {
        expand(self.template(operation)?, record, self)
    }

    /// Quotes an identifier, doubling any embedded quote character.
    pub fn quote_identifier(&self, name: &str) -> String {
        let q = self.identifier_quote;
        let mut quoted = String::with_capacity(name.len() + 2);
        quoted.push(q);
        for c in name.chars() {
            if c == q {
                quoted.push(q);
            }
            quoted.push(c);
        }
        quoted.push(q);
        quoted
    }
}
