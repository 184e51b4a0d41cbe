// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::schema::{EmptyValue, Entity, FieldKind, TableSpec, parse_number};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{label} is required")]
    Required { label: &'static str },
    #[error("{label} must be a number, got {input:?}")]
    NotANumber { label: &'static str, input: String },
    #[error("select a {label} first")]
    NoScope { label: &'static str },
}

/// Column values ready to be written; never carries `id` or `created_at`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.0.insert(column.into(), value);
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

/// Raw form text, one entry per field of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    spec: &'static TableSpec,
    values: Vec<String>,
}

impl Draft {
    pub fn blank(spec: &'static TableSpec) -> Self {
        Self {
            spec,
            values: vec![String::new(); spec.fields.len()],
        }
    }

    pub fn from_entity<E: Entity>(entity: &E) -> Self {
        let spec = E::SPEC;
        Self {
            spec,
            values: spec
                .fields
                .iter()
                .map(|field| entity.field_text(field.column))
                .collect(),
        }
    }

    pub fn spec(&self) -> &'static TableSpec {
        self.spec
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, index: usize) -> &str {
        self.values.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn value_of(&self, column: &str) -> &str {
        self.spec
            .field_index(column)
            .map(|index| self.value(index))
            .unwrap_or("")
    }

    pub fn set(&mut self, index: usize, value: impl Into<String>) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value.into();
        }
    }

    pub fn set_column(&mut self, column: &str, value: impl Into<String>) {
        if let Some(index) = self.spec.field_index(column) {
            self.set(index, value);
        }
    }

    pub fn push_char(&mut self, index: usize, ch: char) {
        if let Some(slot) = self.values.get_mut(index) {
            slot.push(ch);
        }
    }

    pub fn pop_char(&mut self, index: usize) {
        if let Some(slot) = self.values.get_mut(index) {
            slot.pop();
        }
    }

    pub fn is_blank(&self) -> bool {
        self.values.iter().all(|value| value.trim().is_empty())
    }

    /// Clears everything except sticky fields.
    pub fn retain_sticky(&mut self) {
        for (field, value) in self.spec.fields.iter().zip(self.values.iter_mut()) {
            if !field.sticky {
                value.clear();
            }
        }
    }

    /// Validates field by field in declaration order and builds the record to
    /// write. The scope value, when the table has one, is checked first and
    /// injected as its own column.
    pub fn to_record(&self, scope: Option<&str>) -> Result<Record, ValidationError> {
        let mut record = Record::new();
        if let Some(scope_spec) = self.spec.scope {
            let value = scope.map(str::trim).unwrap_or("");
            if value.is_empty() {
                return Err(ValidationError::NoScope {
                    label: scope_spec.label,
                });
            }
            record.insert(scope_spec.column, Value::String(value.to_owned()));
        }

        for (field, raw) in self.spec.fields.iter().zip(&self.values) {
            let input = raw.trim();
            if input.is_empty() {
                if field.required {
                    return Err(ValidationError::Required { label: field.label });
                }
                let empty = match field.empty {
                    EmptyValue::Null => Value::Null,
                    EmptyValue::Text(text) => Value::String(text.to_owned()),
                };
                record.insert(field.column, empty);
                continue;
            }
            let value = match field.kind {
                FieldKind::Number => {
                    parse_number(input).ok_or_else(|| ValidationError::NotANumber {
                        label: field.label,
                        input: input.to_owned(),
                    })?
                }
                FieldKind::Text | FieldKind::Multiline => Value::String(input.to_owned()),
            };
            record.insert(field.column, value);
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::{Draft, ValidationError};
    use crate::schema::{CAR_LOGS, COMMENTS, STORAGE_ITEMS};
    use serde_json::{Value, json};

    fn storage_draft(name: &str, location: &str, quantity: &str, memo: &str) -> Draft {
        let mut draft = Draft::blank(&STORAGE_ITEMS);
        draft.set_column("name", name);
        draft.set_column("location", location);
        draft.set_column("quantity", quantity);
        draft.set_column("memo", memo);
        draft
    }

    #[test]
    fn storage_record_converts_quantity_and_nulls_memo() -> anyhow::Result<()> {
        let record = storage_draft("Vase", "A-3", "5", "").to_record(None)?;
        assert_eq!(record.get("quantity"), Some(&json!(5)));
        assert_eq!(record.get("memo"), Some(&Value::Null));
        assert_eq!(record.get("name"), Some(&json!("Vase")));
        assert!(record.get("id").is_none());
        assert!(record.get("created_at").is_none());
        Ok(())
    }

    #[test]
    fn storage_record_rejects_non_numeric_quantity() {
        let error = storage_draft("Vase", "A-3", "abc", "")
            .to_record(None)
            .expect_err("quantity should fail");
        assert_eq!(
            error,
            ValidationError::NotANumber {
                label: "quantity",
                input: "abc".to_owned(),
            }
        );
    }

    #[test]
    fn whitespace_only_required_field_is_missing() {
        let error = storage_draft("  ", "A-3", "", "")
            .to_record(None)
            .expect_err("name is blank");
        assert_eq!(error, ValidationError::Required { label: "name" });
    }

    #[test]
    fn comment_username_defaults_to_anonymous() -> anyhow::Result<()> {
        let mut draft = Draft::blank(&COMMENTS);
        draft.set_column("message", "  hello  ");
        let record = draft.to_record(None)?;
        assert_eq!(record.get("username"), Some(&json!("익명")));
        assert_eq!(record.get("message"), Some(&json!("hello")));
        Ok(())
    }

    #[test]
    fn car_validation_checks_car_before_fields() {
        let draft = Draft::blank(&CAR_LOGS);
        assert_eq!(
            draft.to_record(None),
            Err(ValidationError::NoScope { label: "car" })
        );
        assert_eq!(
            draft.to_record(Some("서울82바1253")),
            Err(ValidationError::Required { label: "odometer" })
        );

        let mut draft = Draft::blank(&CAR_LOGS);
        draft.set_column("odometer", "12k");
        assert!(matches!(
            draft.to_record(Some("서울82바1253")),
            Err(ValidationError::NotANumber { label: "odometer", .. })
        ));

        draft.set_column("odometer", "48210");
        assert_eq!(
            draft.to_record(Some("서울82바1253")),
            Err(ValidationError::Required { label: "driver" })
        );
    }

    #[test]
    fn car_record_carries_scope_column() -> anyhow::Result<()> {
        let mut draft = Draft::blank(&CAR_LOGS);
        draft.set_column("odometer", "48210");
        draft.set_column("driver", "Kim");
        let record = draft.to_record(Some("서울82바1252"))?;
        assert_eq!(record.get("car_number"), Some(&json!("서울82바1252")));
        assert_eq!(record.get("odometer"), Some(&json!(48210)));
        assert_eq!(record.get("route"), Some(&Value::Null));
        Ok(())
    }

    #[test]
    fn retain_sticky_keeps_nickname_only() {
        let mut draft = Draft::blank(&COMMENTS);
        draft.set_column("username", "somi");
        draft.set_column("message", "first");
        draft.retain_sticky();
        assert_eq!(draft.value_of("username"), "somi");
        assert_eq!(draft.value_of("message"), "");
    }

    #[test]
    fn editing_helpers_ignore_out_of_range_indexes() {
        let mut draft = Draft::blank(&COMMENTS);
        draft.push_char(0, 'a');
        draft.push_char(0, 'b');
        draft.pop_char(0);
        draft.push_char(7, 'x');
        draft.pop_char(7);
        assert_eq!(draft.value(0), "a");
        assert_eq!(draft.value(7), "");
        assert!(!draft.is_blank());
    }
}
