// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Debug;
use time::OffsetDateTime;

use crate::{RemoteError, RowId};

pub const ANONYMOUS_USERNAME: &str = "익명";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Multiline,
    Number,
}

/// What an empty optional input is stored as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyValue {
    Null,
    Text(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub column: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub empty: EmptyValue,
    /// Kept in the draft after a successful save.
    pub sticky: bool,
}

impl FieldSpec {
    const fn text(column: &'static str, label: &'static str) -> Self {
        Self {
            column,
            label,
            kind: FieldKind::Text,
            required: false,
            empty: EmptyValue::Null,
            sticky: false,
        }
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn number(mut self) -> Self {
        self.kind = FieldKind::Number;
        self
    }

    const fn multiline(mut self) -> Self {
        self.kind = FieldKind::Multiline;
        self
    }

    const fn empty_as(mut self, value: &'static str) -> Self {
        self.empty = EmptyValue::Text(value);
        self
    }

    const fn sticky(mut self) -> Self {
        self.sticky = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSpec {
    pub column: &'static str,
    pub ascending: bool,
}

/// Column that partitions a table; lists only ever show one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeSpec {
    pub column: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    pub noun: &'static str,
    pub fields: &'static [FieldSpec],
    pub order: &'static [OrderSpec],
    pub search_columns: &'static [&'static str],
    pub scope: Option<ScopeSpec>,
}

impl TableSpec {
    pub fn field(&self, column: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.column == column)
    }

    pub fn field_index(&self, column: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.column == column)
    }

    pub fn is_searchable(&self) -> bool {
        !self.search_columns.is_empty()
    }
}

pub const NEWEST_FIRST: &[OrderSpec] = &[
    OrderSpec {
        column: "created_at",
        ascending: false,
    },
    OrderSpec {
        column: "id",
        ascending: false,
    },
];

pub const COMMENTS: TableSpec = TableSpec {
    name: "comments",
    noun: "comment",
    fields: &[
        FieldSpec::text("username", "nickname")
            .empty_as(ANONYMOUS_USERNAME)
            .sticky(),
        FieldSpec::text("message", "message").required().multiline(),
    ],
    order: NEWEST_FIRST,
    search_columns: &[],
    scope: None,
};

pub const STORAGE_ITEMS: TableSpec = TableSpec {
    name: "storage_items",
    noun: "storage item",
    fields: &[
        FieldSpec::text("name", "name").required(),
        FieldSpec::text("location", "location").required(),
        FieldSpec::text("quantity", "quantity").number(),
        FieldSpec::text("memo", "memo").multiline(),
    ],
    order: NEWEST_FIRST,
    search_columns: &["name", "location"],
    scope: None,
};

pub const CAR_LOGS: TableSpec = TableSpec {
    name: "car_logs",
    noun: "trip log",
    fields: &[
        FieldSpec::text("odometer", "odometer").required().number(),
        FieldSpec::text("driver", "driver").required(),
        FieldSpec::text("route", "route"),
        FieldSpec::text("service", "service"),
    ],
    order: NEWEST_FIRST,
    search_columns: &[],
    scope: Some(ScopeSpec {
        column: "car_number",
        label: "car",
    }),
};

/// A typed row of one of the flat tables.
pub trait Entity: Clone + Debug + PartialEq + DeserializeOwned + Send + 'static {
    type Id: RowId;

    const SPEC: &'static TableSpec;

    fn id(&self) -> Self::Id;

    fn created_at(&self) -> OffsetDateTime;

    /// Current value of an editable column as form text.
    fn field_text(&self, column: &str) -> String;
}

/// Decodes store rows into typed entities. Identity and creation time are
/// mandatory; any row without them fails the whole batch.
pub fn decode_rows<E: Entity>(rows: Vec<Value>) -> Result<Vec<E>, RemoteError> {
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            let entity: E = serde_json::from_value(row).map_err(|error| {
                RemoteError::decode(format!(
                    "{} row {index} has an unexpected shape: {error}",
                    E::SPEC.name
                ))
            })?;
            if entity.id().raw() <= 0 {
                return Err(RemoteError::decode(format!(
                    "{} row {index} has non-positive id {}",
                    E::SPEC.name,
                    entity.id().raw()
                )));
            }
            Ok(entity)
        })
        .collect()
}

/// Converts trimmed numeric input the way the form expects: integral values
/// become JSON integers, everything else a JSON float.
pub fn parse_number(input: &str) -> Option<Value> {
    let value = input.trim().parse::<f64>().ok()?;
    if !value.is_finite() {
        return None;
    }
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        return Some(Value::from(value as i64));
    }
    serde_json::Number::from_f64(value).map(Value::Number)
}

pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CAR_LOGS, COMMENTS, EmptyValue, FieldKind, STORAGE_ITEMS, decode_rows, format_number,
        parse_number,
    };
    use crate::{Comment, StorageItem};
    use serde_json::{Value, json};

    #[test]
    fn table_specs_mark_required_fields() {
        let required = |spec: &super::TableSpec| {
            spec.fields
                .iter()
                .filter(|field| field.required)
                .map(|field| field.column)
                .collect::<Vec<_>>()
        };
        assert_eq!(required(&COMMENTS), vec!["message"]);
        assert_eq!(required(&STORAGE_ITEMS), vec!["name", "location"]);
        assert_eq!(required(&CAR_LOGS), vec!["odometer", "driver"]);
        assert_eq!(CAR_LOGS.scope.map(|scope| scope.column), Some("car_number"));
    }

    #[test]
    fn username_defaults_to_anonymous() {
        let field = COMMENTS.field("username").expect("username field");
        assert_eq!(field.empty, EmptyValue::Text("익명"));
        assert!(field.sticky);
    }

    #[test]
    fn numeric_fields_are_typed_as_numbers() {
        for (spec, column) in [(&STORAGE_ITEMS, "quantity"), (&CAR_LOGS, "odometer")] {
            let field = spec.field(column).expect("numeric field");
            assert_eq!(field.kind, FieldKind::Number);
        }
    }

    #[test]
    fn parse_number_prefers_integers() {
        assert_eq!(parse_number("5"), Some(json!(5)));
        assert_eq!(parse_number(" 12.5 "), Some(json!(12.5)));
        assert_eq!(parse_number("-3"), Some(json!(-3)));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn format_number_drops_integral_fraction() {
        assert_eq!(format_number(5.0), "5");
        assert_eq!(format_number(12.5), "12.5");
    }

    #[test]
    fn decode_rows_accepts_nullable_columns() {
        let rows = vec![json!({
            "id": 3,
            "created_at": "2026-03-01T09:30:00.123456+00:00",
            "username": null,
            "message": "hello"
        })];
        let comments: Vec<Comment> = decode_rows(rows).expect("rows should decode");
        assert_eq!(comments[0].id.get(), 3);
        assert_eq!(comments[0].username, None);
    }

    #[test]
    fn decode_rows_rejects_missing_created_at() {
        let rows = vec![json!({ "id": 1, "name": "Vase", "location": "A-3" })];
        let error = decode_rows::<StorageItem>(rows).expect_err("missing created_at");
        assert_eq!(error.code, "decode");
        assert!(error.message.contains("storage_items row 0"));
    }

    #[test]
    fn decode_rows_rejects_non_positive_ids() {
        let rows: Vec<Value> = vec![json!({
            "id": 0,
            "created_at": "2026-03-01T09:30:00Z",
            "message": "x"
        })];
        let error = decode_rows::<Comment>(rows).expect_err("zero id");
        assert!(error.message.contains("non-positive id"));
    }
}
