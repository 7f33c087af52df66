//! Conversions between record values and sqlx's `Any` driver.

use std::sync::Arc;

use log::trace;
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, Column, Row, ValueRef};

use crate::error_handling::PipelineError;
use crate::record::{Record, RecordSchema, Value};

pub(crate) type AnyQuery<'q> = Query<'q, Any, AnyArguments<'q>>;

/// Binds statement parameters onto a query, in marker order.
pub(crate) fn bind_params<'q>(mut query: AnyQuery<'q>, params: &[Value]) -> AnyQuery<'q> {
    for value in params {
        query = match value {
            // Integer-typed so PostgreSQL accepts it for numeric and text columns
            Value::Null => query.bind(None::<i32>),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::Text(s) => query.bind(s.clone()),
            Value::Bytes(bytes) => query.bind(bytes.clone()),
        };
    }
    query
}

/// Decodes one column by trying the scalar types in turn.
fn decode_column(row: &AnyRow, index: usize) -> Result<Value, sqlx::Error> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }
    if let Ok(i) = row.try_get::<i64, _>(index) {
        return Ok(Value::Int(i));
    }
    if let Ok(f) = row.try_get::<f64, _>(index) {
        return Ok(Value::Float(f));
    }
    if let Ok(f) = row.try_get::<f32, _>(index) {
        return Ok(Value::Float(f64::from(f)));
    }
    if let Ok(s) = row.try_get::<String, _>(index) {
        return Ok(Value::Text(s));
    }
    if let Ok(bytes) = row.try_get::<Vec<u8>, _>(index) {
        return Ok(Value::Bytes(bytes));
    }
    row.try_get::<bool, _>(index).map(Value::Bool)
}

/// Decodes a result row into a record of the given schema.
///
/// Columns the schema does not declare are skipped.
pub(crate) fn decode_row(row: &AnyRow, schema: &Arc<RecordSchema>) -> Result<Record, PipelineError> {
    let mut record = schema.record();
    for column in row.columns() {
        let name = column.name();
        if schema.position(name).is_none() {
            trace!("Skipping column {} not declared by {}", name, schema.type_name());
            continue;
        }
        let value = decode_column(row, column.ordinal()).map_err(PipelineError::Backend)?;
        record.set(name, value)?;
    }
    Ok(record)
}
