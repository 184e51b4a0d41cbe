// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! In-process tables with the same semantics as the hosted store: the store
//! assigns `id` and `created_at`, required columns are NOT NULL, and lists
//! come back newest first.

use dongbu_app::{Entity, ListQuery, Record, RemoteError, RowId, TableSpec, decode_rows};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::Repository;

const NOT_NULL_VIOLATION: &str = "23502";

#[derive(Debug, Clone)]
struct StoredRow {
    id: i64,
    created_at: OffsetDateTime,
    values: Map<String, Value>,
}

#[derive(Debug, Default)]
struct MemoryTable {
    next_id: i64,
    rows: Vec<StoredRow>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: BTreeMap<&'static str, MemoryTable>,
    fail_next: Option<RemoteError>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes the next operation on any table fail with `error`.
    pub fn fail_next(&self, error: RemoteError) {
        self.lock().fail_next = Some(error);
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.lock()
            .tables
            .get(table)
            .map_or(0, |table| table.rows.len())
    }

    /// Inserts a record and returns the assigned id.
    pub fn insert_record(&self, spec: &'static TableSpec, record: &Record) -> Result<i64, RemoteError> {
        let mut inner = self.lock();
        take_failure(&mut inner)?;
        check_not_null(spec, record.as_map())?;

        let table = inner.tables.entry(spec.name).or_default();
        table.next_id += 1;
        let id = table.next_id;
        let mut values = record.as_map().clone();
        values.remove("id");
        values.remove("created_at");
        table.rows.push(StoredRow {
            id,
            created_at: OffsetDateTime::now_utc(),
            values,
        });
        Ok(id)
    }
}

fn take_failure(inner: &mut Inner) -> Result<(), RemoteError> {
    match inner.fail_next.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

fn check_not_null(spec: &TableSpec, values: &Map<String, Value>) -> Result<(), RemoteError> {
    let required = spec
        .fields
        .iter()
        .filter(|field| field.required)
        .map(|field| field.column)
        .chain(spec.scope.map(|scope| scope.column));
    for column in required {
        if values.get(column).is_none_or(Value::is_null) {
            return Err(RemoteError::new(
                NOT_NULL_VIOLATION,
                format!(
                    "null value in column \"{column}\" of relation \"{}\" violates not-null constraint",
                    spec.name
                ),
            ));
        }
    }
    Ok(())
}

fn matches_query(spec: &TableSpec, row: &StoredRow, query: &ListQuery) -> bool {
    if let Some(scope) = &query.scope
        && row.values.get(scope.column).and_then(Value::as_str) != Some(scope.value.as_str())
    {
        return false;
    }
    match &query.search {
        Some(needle) if spec.is_searchable() => {
            let needle = needle.to_lowercase();
            spec.search_columns.iter().any(|column| {
                row.values
                    .get(*column)
                    .and_then(Value::as_str)
                    .is_some_and(|text| text.to_lowercase().contains(&needle))
            })
        }
        _ => true,
    }
}

fn render(row: &StoredRow) -> Result<Value, RemoteError> {
    let created_at = row
        .created_at
        .format(&Rfc3339)
        .map_err(|error| RemoteError::decode(format!("format created_at: {error}")))?;
    let mut object = row.values.clone();
    object.insert("id".to_owned(), Value::from(row.id));
    object.insert("created_at".to_owned(), Value::String(created_at));
    Ok(Value::Object(object))
}

impl<E: Entity> Repository<E> for MemoryStore {
    fn list(&self, query: &ListQuery) -> Result<Vec<E>, RemoteError> {
        let spec = E::SPEC;
        let mut inner = self.lock();
        take_failure(&mut inner)?;
        let Some(table) = inner.tables.get(spec.name) else {
            return Ok(Vec::new());
        };
        let mut rows: Vec<&StoredRow> = table
            .rows
            .iter()
            .filter(|row| matches_query(spec, row, query))
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        let rows = rows
            .into_iter()
            .map(render)
            .collect::<Result<Vec<_>, _>>()?;
        decode_rows(rows)
    }

    fn insert(&self, record: &Record) -> Result<(), RemoteError> {
        self.insert_record(E::SPEC, record).map(|_| ())
    }

    fn update(&self, id: E::Id, record: &Record) -> Result<usize, RemoteError> {
        let spec = E::SPEC;
        let mut inner = self.lock();
        take_failure(&mut inner)?;
        let Some(table) = inner.tables.get_mut(spec.name) else {
            return Ok(0);
        };
        let Some(row) = table.rows.iter_mut().find(|row| row.id == id.raw()) else {
            return Ok(0);
        };
        let mut values = row.values.clone();
        for (column, value) in record.as_map() {
            if column != "id" && column != "created_at" {
                values.insert(column.clone(), value.clone());
            }
        }
        check_not_null(spec, &values)?;
        row.values = values;
        Ok(1)
    }

    fn delete(&self, id: E::Id) -> Result<usize, RemoteError> {
        let mut inner = self.lock();
        take_failure(&mut inner)?;
        let Some(table) = inner.tables.get_mut(E::SPEC.name) else {
            return Ok(0);
        };
        let before = table.rows.len();
        table.rows.retain(|row| row.id != id.raw());
        Ok(before - table.rows.len())
    }
}
