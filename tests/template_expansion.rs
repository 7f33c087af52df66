//! Template expansion through the public API.

mod helpers;

use std::sync::Arc;

use helpers::item;
use sql_pipeline::{
    expand, BackendKind, BackendProfile, ParamStyle, PipelineError, RecordSchema, Value,
};

fn colon_profile() -> BackendProfile {
    BackendProfile::new(BackendKind::Sqlite)
        .with_param_style(ParamStyle::Numbered(':'))
        .with_identifier_quote('"')
}

#[test]
fn test_insert_expansion() {
    let stmt = expand(
        "INSERT INTO $table:esc ($fields) VALUES ($values)",
        &item(1, "x"),
        &colon_profile(),
    )
    .expect("valid template");

    assert_eq!(
        stmt.sql(),
        "INSERT INTO \"items\" (\"id\",\"name\") VALUES (:1,:2)"
    );
    assert_eq!(stmt.params(), &[Value::Int(1), Value::from("x")]);
}

#[test]
fn test_update_expansion_continues_numbering() {
    let stmt = expand(
        "UPDATE $table:esc SET $fields_values WHERE $indices:and",
        &item(1, "x"),
        &colon_profile(),
    )
    .expect("valid template");

    assert_eq!(
        stmt.sql(),
        "UPDATE \"items\" SET \"id\"=:1,\"name\"=:2 WHERE \"id\"=:3"
    );
    assert_eq!(
        stmt.params(),
        &[Value::Int(1), Value::from("x"), Value::Int(1)]
    );
}

#[test]
fn test_expansion_is_deterministic() {
    let profile = BackendProfile::new(BackendKind::Postgres);
    let record = item(9, "same");
    let first = profile.expand("update", &record).expect("update");
    let second = profile.expand("update", &record).expect("update");
    assert_eq!(first, second);
}

#[test]
fn test_composite_indices_join_with_and() {
    let schema = Arc::new(
        RecordSchema::new("Page")
            .unique_field("site")
            .field("title")
            .unique_field("path"),
    );
    let record = schema
        .record()
        .with("site", "example.com")
        .and_then(|r| r.with("path", "/"))
        .and_then(|r| r.with("title", "Home"))
        .expect("declared fields");

    let stmt = expand(
        "DELETE FROM $table:raw WHERE $indexes:and",
        &record,
        &BackendProfile::new(BackendKind::Postgres),
    )
    .expect("valid template");

    assert_eq!(
        stmt.sql(),
        "DELETE FROM Page WHERE \"site\"=$1 AND \"path\"=$2"
    );
    assert_eq!(stmt.marker_count(), 2);
    assert_eq!(
        stmt.params(),
        &[Value::from("example.com"), Value::from("/")]
    );
}

#[test]
fn test_marker_count_matches_params_for_every_default_template() {
    for kind in [BackendKind::Sqlite, BackendKind::Postgres, BackendKind::Mysql] {
        let profile = BackendProfile::new(kind);
        for operation in profile.operations() {
            let stmt = profile
                .expand(operation, &item(3, "z"))
                .expect("default templates expand");
            assert_eq!(
                stmt.marker_count(),
                stmt.params().len(),
                "{} {}",
                kind,
                operation
            );
        }
    }
}

#[test]
fn test_missing_identity_only_blocks_destructive_templates() {
    let record = helpers::item_schema()
        .record()
        .with("name", "x")
        .expect("declared field");
    let profile = BackendProfile::new(BackendKind::Sqlite);

    for operation in ["insert", "update", "delete", "deleteme"] {
        let err = profile
            .expand(operation, &record)
            .expect_err("identity value is missing");
        assert!(
            matches!(err, PipelineError::MissingIdentityField { ref field, .. } if field == "id"),
            "{}: {:?}",
            operation,
            err
        );
    }

    let stmt = profile.expand("selectall", &record).expect("select ok");
    assert_eq!(stmt.sql(), "SELECT \"name\" FROM \"items\"");
}

#[test]
fn test_zero_unique_fields_expand_to_nothing() {
    let schema = Arc::new(RecordSchema::new("log").field("line"));
    let record = schema.record().with("line", "hello").expect("declared");
    let stmt = expand(
        "SELECT $fields FROM $table WHERE $indices:and",
        &record,
        &colon_profile(),
    )
    .expect("valid template");
    assert_eq!(stmt.sql(), "SELECT \"line\" FROM \"log\" WHERE ");
    assert!(stmt.params().is_empty());
}

#[test]
fn test_invalid_placeholder() {
    let err = expand("SELECT $columns FROM $table", &item(1, "x"), &colon_profile())
        .expect_err("unknown placeholder");
    assert!(matches!(err, PipelineError::InvalidPlaceholder(_)));
}
