//! Placeholder scanning.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::error_handling::PipelineError;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$([a-z_]+)(?::([\w,]+))?").expect("placeholder pattern is a valid regex")
});

/// The closed set of symbolic names a template may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlaceholderKind {
    /// `$table`
    Table,
    /// `$fields`
    Fields,
    /// `$values`
    Values,
    /// `$fields_values`
    FieldsValues,
    /// `$indices` or `$indexes`
    Indices,
}

impl PlaceholderKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "table" => Some(PlaceholderKind::Table),
            "fields" => Some(PlaceholderKind::Fields),
            "values" => Some(PlaceholderKind::Values),
            "fields_values" => Some(PlaceholderKind::FieldsValues),
            "indices" | "indexes" => Some(PlaceholderKind::Indices),
            _ => None,
        }
    }
}

/// One placeholder occurrence in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Placeholder<'t> {
    pub kind: PlaceholderKind,
    pub modifier: Option<&'t str>,
    /// Byte range of the whole token, modifier included
    pub span: Range<usize>,
}

impl Placeholder<'_> {
    /// Joiner for list placeholders: `,` by default, otherwise the modifier
    /// upper-cased and padded with spaces (`and` gives ` AND `).
    pub fn joiner(&self) -> String {
        match self.modifier {
            None => ",".to_string(),
            Some(word) => format!(" {} ", word.to_uppercase()),
        }
    }

    /// Whether a `$table` placeholder asks for a quoted name.
    pub fn wants_quoting(&self) -> bool {
        self.modifier
            .map_or(true, |m| m.to_ascii_lowercase().starts_with("esc"))
    }
}

/// Scans a template left to right for placeholders.
pub(crate) fn scan(template: &str) -> impl Iterator<Item = Result<Placeholder<'_>, PipelineError>> {
    PLACEHOLDER_RE.captures_iter(template).map(|caps| {
        let token = caps.get(0).map_or(0..0, |m| m.range());
        let name = caps.get(1).map_or("", |m| m.as_str());
        let kind = PlaceholderKind::from_name(name).ok_or_else(|| {
            PipelineError::InvalidPlaceholder(template[token.clone()].to_string())
        })?;
        Ok(Placeholder {
            kind,
            modifier: caps.get(2).map(|m| m.as_str()),
            span: token,
        })
    })
}
