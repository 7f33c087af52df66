//! Input line parsing.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error_handling::PipelineError;
use crate::record::{Record, RecordSchema, Value};

/// Returns the trimmed line, or `None` for blank lines and `#` comments.
pub(crate) fn significant(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        None
    } else {
        Some(trimmed)
    }
}

/// Builds a record from one JSON object of scalar fields.
///
/// # Errors
///
/// - `PipelineError::InvalidInput` if the line is not a JSON object or a
///   field holds a nested object
/// - `PipelineError::UnknownField` if a key is not declared by the schema
pub fn parse_record(line: &str, schema: &Arc<RecordSchema>) -> Result<Record, PipelineError> {
    let fields: BTreeMap<String, Value> = serde_json::from_str(line)?;
    let mut record = schema.record();
    for (name, value) in fields {
        record.set(&name, value)?;
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Arc<RecordSchema> {
        Arc::new(
            RecordSchema::new("Page")
                .unique_field("url")
                .field("status")
                .field("score")
                .field("title")
                .field("seen"),
        )
    }

    #[test]
    fn test_significant_lines() {
        assert_eq!(significant("  {\"a\": 1}  "), Some("{\"a\": 1}"));
        assert_eq!(significant("   "), None);
        assert_eq!(significant("# comment"), None);
    }

    #[test]
    fn test_parse_scalar_fields() {
        let record = parse_record(
            r#"{"title": null, "url": "http://a", "status": 200, "score": 0.5, "seen": true}"#,
            &schema(),
        )
        .expect("valid line");

        assert_eq!(record.get("url"), Some(&Value::from("http://a")));
        assert_eq!(record.get("status"), Some(&Value::Int(200)));
        assert_eq!(record.get("score"), Some(&Value::Float(0.5)));
        assert_eq!(record.get("title"), Some(&Value::Null));
        assert_eq!(record.get("seen"), Some(&Value::Bool(true)));

        let order: Vec<&str> = record.fields().map(|(name, _)| name).collect();
        assert_eq!(order, ["url", "status", "score", "title", "seen"]);
    }

    #[test]
    fn test_undeclared_key_is_rejected() {
        let err = parse_record(r#"{"url": "http://a", "body": "x"}"#, &schema())
            .expect_err("body is not declared");
        assert!(matches!(err, PipelineError::UnknownField { ref field, .. } if field == "body"));
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        assert!(matches!(
            parse_record("not json", &schema()),
            Err(PipelineError::InvalidInput(_))
        ));
        assert!(matches!(
            parse_record(r#"{"url": {"nested": 1}}"#, &schema()),
            Err(PipelineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_identity_beyond_i64_is_rejected() {
        let schema = Arc::new(RecordSchema::new("Row").unique_field("id"));
        for line in [
            r#"{"id": 9223372036854775808}"#,
            r#"{"id": 9223372036854775809}"#,
        ] {
            assert!(matches!(
                parse_record(line, &schema),
                Err(PipelineError::InvalidInput(_))
            ));
        }
        let record = parse_record(r#"{"id": -9223372036854775808}"#, &schema).expect("i64::MIN");
        assert_eq!(record.get("id"), Some(&Value::Int(i64::MIN)));
    }
}
