// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! List-and-form synchronization shared by every tab.
//!
//! The controller never performs I/O. Each operation hands back a [`Job`]
//! stamped with a [`Ticket`]; whoever runs the job feeds the result back into
//! [`ListFormController::resolve`]. Results whose ticket is stale (superseded
//! fetch, or issued before the last unmount) are dropped.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::forms::{Draft, Record, ValidationError};
use crate::schema::Entity;
use crate::{RemoteError, RowId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    epoch: u64,
    serial: u64,
}

impl Ticket {
    pub const fn epoch(self) -> u64 {
        self.epoch
    }

    pub const fn serial(self) -> u64 {
        self.serial
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub column: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub search: Option<String>,
    pub scope: Option<Scope>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Job<E: Entity> {
    Fetch {
        ticket: Ticket,
        query: ListQuery,
    },
    Insert {
        ticket: Ticket,
        record: Record,
    },
    Update {
        ticket: Ticket,
        id: E::Id,
        record: Record,
    },
    Delete {
        ticket: Ticket,
        id: E::Id,
    },
}

impl<E: Entity> Job<E> {
    pub fn ticket(&self) -> Ticket {
        match self {
            Self::Fetch { ticket, .. }
            | Self::Insert { ticket, .. }
            | Self::Update { ticket, .. }
            | Self::Delete { ticket, .. } => *ticket,
        }
    }

    pub const fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<E: Entity> {
    Fetched(Result<Vec<E>, RemoteError>),
    /// Rows affected by a write.
    Written(Result<usize, RemoteError>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Info(String),
    Error(String),
}

impl Report {
    pub fn message(&self) -> &str {
        match self {
            Self::Info(message) | Self::Error(message) => message,
        }
    }

    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<E: Entity> {
    pub follow_up: Option<Job<E>>,
    pub report: Option<Report>,
}

impl<E: Entity> Resolution<E> {
    fn discarded() -> Self {
        Self {
            follow_up: None,
            report: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("a save is already in progress")]
    Busy,
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Clone, Copy)]
struct Submission<Id> {
    ticket: Ticket,
    target: Option<Id>,
}

#[derive(Debug, Clone)]
pub struct ListFormController<E: Entity> {
    draft: Draft,
    stashed: Option<Draft>,
    edit_target: Option<E::Id>,
    rows: Vec<E>,
    query: ListQuery,
    epoch: u64,
    serial: u64,
    mounted: bool,
    loading: Option<Ticket>,
    submitting: Option<Submission<E::Id>>,
    deleting: BTreeMap<E::Id, Ticket>,
    confirming: Option<E::Id>,
    last_error: Option<String>,
}

impl<E: Entity> Default for ListFormController<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> ListFormController<E> {
    pub fn new() -> Self {
        Self {
            draft: Draft::blank(E::SPEC),
            stashed: None,
            edit_target: None,
            rows: Vec::new(),
            query: ListQuery::default(),
            epoch: 0,
            serial: 0,
            mounted: false,
            loading: None,
            submitting: None,
            deleting: BTreeMap::new(),
            confirming: None,
            last_error: None,
        }
    }

    /// Starts with a scope value already selected. Ignored for tables
    /// without a scope column.
    pub fn with_scope(value: impl Into<String>) -> Self {
        let mut controller = Self::new();
        if let Some(scope) = E::SPEC.scope {
            controller.query.scope = Some(Scope {
                column: scope.column,
                value: value.into(),
            });
        }
        controller
    }

    fn issue(&mut self) -> Ticket {
        self.serial += 1;
        Ticket {
            epoch: self.epoch,
            serial: self.serial,
        }
    }

    pub fn mount(&mut self) -> Job<E> {
        self.mounted = true;
        self.load_list()
    }

    pub fn unmount(&mut self) {
        self.mounted = false;
        self.epoch += 1;
        self.loading = None;
        self.submitting = None;
        self.deleting.clear();
        self.confirming = None;
    }

    /// Fetch with the current query. Supersedes any fetch still in flight.
    pub fn load_list(&mut self) -> Job<E> {
        let ticket = self.issue();
        self.loading = Some(ticket);
        Job::Fetch {
            ticket,
            query: self.query.clone(),
        }
    }

    pub fn submit(&mut self) -> Result<Job<E>, SubmitError> {
        if self.submitting.is_some() {
            return Err(SubmitError::Busy);
        }
        let scope = self.query.scope.as_ref().map(|scope| scope.value.as_str());
        let record = self.draft.to_record(scope).inspect_err(|error| {
            tracing::debug!(table = E::SPEC.name, %error, "form rejected");
        })?;

        let ticket = self.issue();
        self.submitting = Some(Submission {
            ticket,
            target: self.edit_target,
        });
        Ok(match self.edit_target {
            Some(id) => Job::Update { ticket, id, record },
            None => Job::Insert { ticket, record },
        })
    }

    pub fn begin_edit(&mut self, row: &E) {
        if self.edit_target.is_none() {
            self.stashed = Some(self.draft.clone());
        }
        self.draft = Draft::from_entity(row);
        self.edit_target = Some(row.id());
    }

    pub fn cancel_edit(&mut self) {
        if self.edit_target.take().is_none() {
            return;
        }
        self.draft = self
            .stashed
            .take()
            .unwrap_or_else(|| Draft::blank(E::SPEC));
    }

    pub fn request_delete(&mut self, id: E::Id) {
        if !self.deleting.contains_key(&id) {
            self.confirming = Some(id);
        }
    }

    pub fn pending_delete(&self) -> Option<E::Id> {
        self.confirming
    }

    /// Closes the confirmation prompt. Only an accepted prompt yields a job.
    pub fn resolve_delete(&mut self, accepted: bool) -> Option<Job<E>> {
        let id = self.confirming.take()?;
        if !accepted {
            return None;
        }
        let ticket = self.issue();
        self.deleting.insert(id, ticket);
        Some(Job::Delete { ticket, id })
    }

    pub fn set_search(&mut self, needle: &str) -> Job<E> {
        let needle = needle.trim();
        self.query.search = (!needle.is_empty()).then(|| needle.to_owned());
        self.load_list()
    }

    pub fn clear_search(&mut self) -> Job<E> {
        self.query.search = None;
        self.load_list()
    }

    /// Switches the partition shown and written. Clears the form and the
    /// rows of the previous partition.
    pub fn set_scope(&mut self, value: impl Into<String>) -> Option<Job<E>> {
        let scope = E::SPEC.scope?;
        self.query.scope = Some(Scope {
            column: scope.column,
            value: value.into(),
        });
        self.clear_form();
        self.confirming = None;
        self.rows.clear();
        Some(self.load_list())
    }

    fn clear_form(&mut self) {
        self.draft = Draft::blank(E::SPEC);
        self.stashed = None;
        self.edit_target = None;
    }

    fn fail(&mut self, action: &str, error: &RemoteError) -> Report {
        tracing::warn!(
            table = E::SPEC.name,
            code = %error.code,
            message = %error.message,
            "failed to {action}"
        );
        let message = format!("failed to {action}: {error}");
        self.last_error = Some(message.clone());
        Report::Error(message)
    }

    pub fn resolve(&mut self, ticket: Ticket, outcome: Outcome<E>) -> Resolution<E> {
        if ticket.epoch != self.epoch {
            tracing::debug!(table = E::SPEC.name, "dropping result issued before unmount");
            return Resolution::discarded();
        }
        match outcome {
            Outcome::Fetched(result) => self.resolve_fetch(ticket, result),
            Outcome::Written(result) => {
                if self
                    .submitting
                    .is_some_and(|submission| submission.ticket == ticket)
                {
                    return self.resolve_submit(result);
                }
                let deleted = self
                    .deleting
                    .iter()
                    .find_map(|(id, pending)| (*pending == ticket).then_some(*id));
                match deleted {
                    Some(id) => self.resolve_remove(id, result),
                    None => Resolution::discarded(),
                }
            }
        }
    }

    fn resolve_fetch(&mut self, ticket: Ticket, result: Result<Vec<E>, RemoteError>) -> Resolution<E> {
        if self.loading != Some(ticket) {
            tracing::debug!(table = E::SPEC.name, "dropping superseded fetch");
            return Resolution::discarded();
        }
        self.loading = None;
        match result {
            Ok(rows) => {
                self.rows = rows;
                Resolution::discarded()
            }
            Err(error) => {
                let noun = E::SPEC.name;
                let report = self.fail(&format!("load {noun}"), &error);
                Resolution {
                    follow_up: None,
                    report: Some(report),
                }
            }
        }
    }

    fn resolve_submit(&mut self, result: Result<usize, RemoteError>) -> Resolution<E> {
        let Some(submission) = self.submitting.take() else {
            return Resolution::discarded();
        };
        let noun = E::SPEC.noun;
        match result {
            Ok(affected) => {
                let report = match submission.target {
                    Some(id) if affected == 0 => {
                        tracing::debug!(table = E::SPEC.name, id = id.raw(), "update matched no rows");
                        Report::Info(format!("{noun} {} no longer exists", id.raw()))
                    }
                    Some(id) => Report::Info(format!("updated {noun} {}", id.raw())),
                    None => Report::Info(format!("saved {noun}")),
                };
                self.draft.retain_sticky();
                self.stashed = None;
                self.edit_target = None;
                Resolution {
                    follow_up: Some(self.load_list()),
                    report: Some(report),
                }
            }
            Err(error) => {
                let report = self.fail(&format!("save {noun}"), &error);
                Resolution {
                    follow_up: None,
                    report: Some(report),
                }
            }
        }
    }

    fn resolve_remove(&mut self, id: E::Id, result: Result<usize, RemoteError>) -> Resolution<E> {
        self.deleting.remove(&id);
        let noun = E::SPEC.noun;
        match result {
            Ok(affected) => {
                if self.edit_target == Some(id) {
                    self.clear_form();
                }
                let report = if affected == 0 {
                    tracing::debug!(table = E::SPEC.name, id = id.raw(), "delete matched no rows");
                    Report::Info(format!("{noun} {} was already gone", id.raw()))
                } else {
                    Report::Info(format!("deleted {noun} {}", id.raw()))
                };
                Resolution {
                    follow_up: Some(self.load_list()),
                    report: Some(report),
                }
            }
            Err(error) => {
                let report = self.fail(&format!("delete {noun} {}", id.raw()), &error);
                Resolution {
                    follow_up: None,
                    report: Some(report),
                }
            }
        }
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut Draft {
        &mut self.draft
    }

    pub fn rows(&self) -> &[E] {
        &self.rows
    }

    pub fn query(&self) -> &ListQuery {
        &self.query
    }

    pub fn scope_value(&self) -> Option<&str> {
        self.query.scope.as_ref().map(|scope| scope.value.as_str())
    }

    pub fn edit_target(&self) -> Option<E::Id> {
        self.edit_target
    }

    pub fn is_editing(&self) -> bool {
        self.edit_target.is_some()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.is_some()
    }

    pub fn is_deleting(&self, id: E::Id) -> bool {
        self.deleting.contains_key(&id)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

/// Runs a job and every follow-up it triggers to completion.
pub fn drive<E, F>(controller: &mut ListFormController<E>, job: Job<E>, mut run: F) -> Vec<Report>
where
    E: Entity,
    F: FnMut(&Job<E>) -> Outcome<E>,
{
    let mut reports = Vec::new();
    let mut next = Some(job);
    while let Some(job) = next.take() {
        let outcome = run(&job);
        let resolution = controller.resolve(job.ticket(), outcome);
        reports.extend(resolution.report);
        next = resolution.follow_up;
    }
    reports
}

#[cfg(test)]
mod tests {
    use super::{Job, ListFormController, Outcome, Report, SubmitError, drive};
    use crate::forms::ValidationError;
    use crate::schema::{Entity, decode_rows};
    use crate::{CarLog, Comment, RemoteError, RowId, StorageItem};
    use serde_json::{Map, Value, json};
    use time::format_description::well_known::Rfc3339;
    use time::{Duration, OffsetDateTime};

    /// In-test table that behaves like the hosted store.
    struct FakeTable {
        rows: Vec<Map<String, Value>>,
        next_id: i64,
        calls: Vec<&'static str>,
        fail_next: Option<RemoteError>,
    }

    impl FakeTable {
        fn new() -> Self {
            Self {
                rows: Vec::new(),
                next_id: 1,
                calls: Vec::new(),
                fail_next: None,
            }
        }

        fn seed(&mut self, row: Value) {
            let Value::Object(map) = row else {
                panic!("seed rows must be objects");
            };
            self.put(map);
        }

        fn put(&mut self, mut map: Map<String, Value>) {
            let id = self.next_id;
            self.next_id += 1;
            let created = (OffsetDateTime::UNIX_EPOCH + Duration::days(20_000) + Duration::minutes(id))
                .format(&Rfc3339)
                .expect("format timestamp");
            map.insert("id".to_owned(), json!(id));
            map.insert("created_at".to_owned(), json!(created));
            self.rows.push(map);
        }

        fn count(&self, call: &str) -> usize {
            self.calls.iter().filter(|name| **name == call).count()
        }

        fn run<E: Entity>(&mut self, job: &Job<E>) -> Outcome<E> {
            let failure = self.fail_next.take();
            match job {
                Job::Fetch { query, .. } => {
                    self.calls.push("fetch");
                    if let Some(error) = failure {
                        return Outcome::Fetched(Err(error));
                    }
                    let mut rows: Vec<Value> = self
                        .rows
                        .iter()
                        .filter(|row| match &query.scope {
                            Some(scope) => row.get(scope.column) == Some(&json!(scope.value)),
                            None => true,
                        })
                        .filter(|row| match &query.search {
                            Some(needle) => E::SPEC.search_columns.iter().any(|column| {
                                row.get(*column)
                                    .and_then(Value::as_str)
                                    .is_some_and(|text| text.contains(needle.as_str()))
                            }),
                            None => true,
                        })
                        .cloned()
                        .map(Value::Object)
                        .collect();
                    rows.reverse();
                    Outcome::Fetched(decode_rows(rows))
                }
                Job::Insert { record, .. } => {
                    self.calls.push("insert");
                    if let Some(error) = failure {
                        return Outcome::Written(Err(error));
                    }
                    self.put(record.as_map().clone());
                    Outcome::Written(Ok(1))
                }
                Job::Update { id, record, .. } => {
                    self.calls.push("update");
                    if let Some(error) = failure {
                        return Outcome::Written(Err(error));
                    }
                    let raw = json!(id.raw());
                    let mut affected = 0;
                    for row in self.rows.iter_mut().filter(|row| row.get("id") == Some(&raw)) {
                        for (column, value) in record.as_map() {
                            row.insert(column.clone(), value.clone());
                        }
                        affected += 1;
                    }
                    Outcome::Written(Ok(affected))
                }
                Job::Delete { id, .. } => {
                    self.calls.push("delete");
                    if let Some(error) = failure {
                        return Outcome::Written(Err(error));
                    }
                    let raw = json!(id.raw());
                    let before = self.rows.len();
                    self.rows.retain(|row| row.get("id") != Some(&raw));
                    Outcome::Written(Ok(before - self.rows.len()))
                }
            }
        }
    }

    fn mounted<E: Entity>(table: &mut FakeTable) -> ListFormController<E> {
        let mut controller = ListFormController::<E>::new();
        let job = controller.mount();
        drive(&mut controller, job, |job| table.run(job));
        controller
    }

    fn seeded_storage() -> FakeTable {
        let mut table = FakeTable::new();
        table.seed(json!({ "name": "Vase", "location": "A-3", "quantity": 2, "memo": null }));
        table.seed(json!({ "name": "Lamp", "location": "B-1", "quantity": null, "memo": "broken" }));
        table
    }

    #[test]
    fn mount_loads_newest_first() {
        let mut table = seeded_storage();
        let controller = mounted::<StorageItem>(&mut table);
        let names: Vec<_> = controller
            .rows()
            .iter()
            .map(|row| row.field_text("name"))
            .collect();
        assert_eq!(names, vec!["Lamp", "Vase"]);
        assert!(controller.is_mounted());
        assert!(!controller.is_loading());
    }

    #[test]
    fn valid_submit_inserts_then_fetches_exactly_once() -> anyhow::Result<()> {
        let mut table = FakeTable::new();
        let mut controller = mounted::<StorageItem>(&mut table);
        table.calls.clear();

        let draft = controller.draft_mut();
        draft.set_column("name", "Vase");
        draft.set_column("location", "A-3");
        draft.set_column("quantity", "5");
        let job = controller.submit()?;
        let reports = drive(&mut controller, job, |job| table.run(job));

        assert_eq!(table.calls, vec!["insert", "fetch"]);
        assert_eq!(reports, vec![Report::Info("saved storage item".to_owned())]);
        let row = &controller.rows()[0];
        assert!(row.id.get() > 0);
        assert_eq!(row.quantity, Some(5.0));
        assert_eq!(row.memo, None);
        assert_eq!(table.rows[0].get("quantity"), Some(&json!(5)));
        assert_eq!(table.rows[0].get("memo"), Some(&Value::Null));
        assert!(controller.draft().is_blank());
        Ok(())
    }

    #[test]
    fn second_submit_while_in_flight_is_busy() -> anyhow::Result<()> {
        let mut controller = ListFormController::<Comment>::new();
        controller.draft_mut().set_column("message", "hello");
        let first = controller.submit()?;
        assert!(matches!(first, Job::Insert { .. }));
        assert!(controller.is_submitting());
        assert_eq!(controller.submit(), Err(SubmitError::Busy));
        Ok(())
    }

    #[test]
    fn invalid_quantity_issues_no_job() {
        let mut table = FakeTable::new();
        let mut controller = mounted::<StorageItem>(&mut table);
        table.calls.clear();

        let draft = controller.draft_mut();
        draft.set_column("name", "Vase");
        draft.set_column("location", "A-3");
        draft.set_column("quantity", "abc");
        let error = controller.submit().expect_err("quantity is not numeric");
        assert!(matches!(
            error,
            SubmitError::Invalid(ValidationError::NotANumber { label: "quantity", .. })
        ));
        assert!(table.calls.is_empty());
        assert!(!controller.is_submitting());
        assert_eq!(controller.draft().value_of("quantity"), "abc");
    }

    #[test]
    fn empty_required_field_issues_no_job() {
        let mut controller = ListFormController::<Comment>::new();
        controller.draft_mut().set_column("username", "somi");
        assert_eq!(
            controller.submit(),
            Err(SubmitError::Invalid(ValidationError::Required { label: "message" }))
        );
        assert!(!controller.is_submitting());
    }

    #[test]
    fn begin_then_cancel_edit_restores_draft_and_list() {
        let mut table = seeded_storage();
        let mut controller = mounted::<StorageItem>(&mut table);
        controller.draft_mut().set_column("name", "half typed");
        let draft_before = controller.draft().clone();
        let rows_before = controller.rows().to_vec();
        let calls_before = table.calls.len();

        let row = controller.rows()[1].clone();
        controller.begin_edit(&row);
        assert_eq!(controller.edit_target(), Some(row.id));
        assert_eq!(controller.draft().value_of("name"), "Vase");
        assert_eq!(controller.draft().value_of("quantity"), "2");

        controller.cancel_edit();
        assert_eq!(controller.draft(), &draft_before);
        assert_eq!(controller.rows(), rows_before.as_slice());
        assert_eq!(controller.edit_target(), None);
        assert_eq!(table.calls.len(), calls_before);
    }

    #[test]
    fn edit_submit_updates_the_same_row() -> anyhow::Result<()> {
        let mut table = seeded_storage();
        let mut controller = mounted::<StorageItem>(&mut table);
        let row = controller.rows()[0].clone();
        controller.begin_edit(&row);
        controller.draft_mut().set_column("location", "C-9");
        let job = controller.submit()?;
        assert!(matches!(job, Job::Update { id, .. } if id == row.id));
        drive(&mut controller, job, |job| table.run(job));

        let updated = controller
            .rows()
            .iter()
            .find(|item| item.id == row.id)
            .expect("row still listed");
        assert_eq!(updated.location.as_deref(), Some("C-9"));
        assert_eq!(updated.created_at, row.created_at);
        assert_eq!(controller.edit_target(), None);
        assert!(controller.draft().is_blank());
        Ok(())
    }

    #[test]
    fn update_of_vanished_row_is_reported_as_info() -> anyhow::Result<()> {
        let mut table = seeded_storage();
        let mut controller = mounted::<StorageItem>(&mut table);
        let row = controller.rows()[0].clone();
        controller.begin_edit(&row);
        table.rows.clear();

        let job = controller.submit()?;
        let reports = drive(&mut controller, job, |job| table.run(job));
        assert_eq!(
            reports,
            vec![Report::Info(format!(
                "storage item {} no longer exists",
                row.id.get()
            ))]
        );
        assert!(controller.rows().is_empty());
        Ok(())
    }

    #[test]
    fn failed_submit_keeps_draft_and_skips_fetch() -> anyhow::Result<()> {
        let mut table = FakeTable::new();
        let mut controller = mounted::<Comment>(&mut table);
        table.calls.clear();
        controller.draft_mut().set_column("message", "hello");
        table.fail_next = Some(RemoteError::new("42501", "permission denied"));

        let job = controller.submit()?;
        let reports = drive(&mut controller, job, |job| table.run(job));
        assert_eq!(table.calls, vec!["insert"]);
        assert_eq!(
            reports,
            vec![Report::Error(
                "failed to save comment: permission denied (code 42501)".to_owned()
            )]
        );
        assert_eq!(controller.draft().value_of("message"), "hello");
        assert!(!controller.is_submitting());
        assert!(controller.last_error().is_some());
        Ok(())
    }

    #[test]
    fn comment_submit_keeps_nickname() -> anyhow::Result<()> {
        let mut table = FakeTable::new();
        let mut controller = mounted::<Comment>(&mut table);
        controller.draft_mut().set_column("username", "somi");
        controller.draft_mut().set_column("message", "hi");
        let job = controller.submit()?;
        drive(&mut controller, job, |job| table.run(job));
        assert_eq!(controller.draft().value_of("username"), "somi");
        assert_eq!(controller.draft().value_of("message"), "");
        assert_eq!(controller.rows()[0].username.as_deref(), Some("somi"));
        Ok(())
    }

    #[test]
    fn declined_delete_calls_nothing() {
        let mut table = seeded_storage();
        let mut controller = mounted::<StorageItem>(&mut table);
        let rows_before = controller.rows().to_vec();
        table.calls.clear();

        let id = rows_before[0].id;
        controller.request_delete(id);
        assert_eq!(controller.pending_delete(), Some(id));
        assert_eq!(controller.resolve_delete(false), None);
        assert_eq!(controller.pending_delete(), None);
        assert!(table.calls.is_empty());
        assert_eq!(controller.rows(), rows_before.as_slice());
    }

    #[test]
    fn deleting_twice_is_not_an_error() {
        let mut table = seeded_storage();
        let mut controller = mounted::<StorageItem>(&mut table);
        let id = controller.rows()[0].id;

        for _ in 0..2 {
            controller.request_delete(id);
            let job = controller.resolve_delete(true).expect("delete job");
            assert!(controller.is_deleting(id));
            let reports = drive(&mut controller, job, |job| table.run(job));
            assert!(reports.iter().all(|report| !report.is_error()));
            assert!(!controller.is_deleting(id));
        }
        assert_eq!(controller.rows().len(), 1);
        assert_eq!(table.count("delete"), 2);
    }

    #[test]
    fn deleting_the_edit_target_clears_the_form() {
        let mut table = seeded_storage();
        let mut controller = mounted::<StorageItem>(&mut table);
        let row = controller.rows()[0].clone();
        controller.begin_edit(&row);

        controller.request_delete(row.id);
        let job = controller.resolve_delete(true).expect("delete job");
        drive(&mut controller, job, |job| table.run(job));
        assert_eq!(controller.edit_target(), None);
        assert!(controller.draft().is_blank());
    }

    #[test]
    fn failed_fetch_keeps_previous_rows() {
        let mut table = seeded_storage();
        let mut controller = mounted::<StorageItem>(&mut table);
        let rows_before = controller.rows().to_vec();
        table.fail_next = Some(RemoteError::new("network", "connection refused"));

        let job = controller.load_list();
        let reports = drive(&mut controller, job, |job| table.run(job));
        assert_eq!(reports.len(), 1);
        assert!(reports[0].is_error());
        assert!(reports[0].message().contains("connection refused"));
        assert_eq!(controller.rows(), rows_before.as_slice());
    }

    #[test]
    fn superseded_fetch_is_discarded() {
        let mut table = seeded_storage();
        let mut controller = ListFormController::<StorageItem>::new();
        let older = controller.mount();
        let newer = controller.load_list();

        let newer_outcome = table.run(&newer);
        controller.resolve(newer.ticket(), newer_outcome);
        assert_eq!(controller.rows().len(), 2);

        let resolution = controller.resolve(older.ticket(), Outcome::Fetched(Ok(Vec::new())));
        assert_eq!(resolution.report, None);
        assert_eq!(controller.rows().len(), 2);
    }

    #[test]
    fn results_after_unmount_are_discarded() -> anyhow::Result<()> {
        let mut table = seeded_storage();
        let mut controller = ListFormController::<Comment>::new();
        let fetch = controller.mount();
        controller.draft_mut().set_column("message", "hello");
        let insert = controller.submit()?;
        controller.unmount();

        let resolution = controller.resolve(fetch.ticket(), table.run(&fetch));
        assert_eq!(resolution.follow_up, None);
        let resolution = controller.resolve(insert.ticket(), Outcome::Written(Ok(1)));
        assert_eq!(resolution.follow_up, None);
        assert!(controller.rows().is_empty());
        assert!(!controller.is_submitting());
        assert_eq!(controller.draft().value_of("message"), "hello");
        Ok(())
    }

    #[test]
    fn car_logs_are_scoped_to_the_selected_car() -> anyhow::Result<()> {
        let mut table = FakeTable::new();
        table.seed(json!({ "car_number": "서울82바1252", "odometer": 100, "driver": "Lee" }));
        let mut controller = ListFormController::<CarLog>::with_scope("서울82바1253");
        let job = controller.mount();
        drive(&mut controller, job, |job| table.run(job));
        assert!(controller.rows().is_empty());

        controller.draft_mut().set_column("odometer", "48210");
        controller.draft_mut().set_column("driver", "Kim");
        let job = controller.submit()?;
        match &job {
            Job::Insert { record, .. } => {
                assert_eq!(record.get("car_number"), Some(&json!("서울82바1253")));
            }
            other => panic!("expected insert, got {other:?}"),
        }
        drive(&mut controller, job, |job| table.run(job));
        assert_eq!(controller.rows().len(), 1);

        let job = controller.set_scope("서울82바1252").expect("car logs have a scope");
        assert!(controller.rows().is_empty());
        drive(&mut controller, job, |job| table.run(job));
        assert_eq!(controller.rows().len(), 1);
        assert_eq!(controller.rows()[0].driver.as_deref(), Some("Lee"));
        Ok(())
    }

    #[test]
    fn set_scope_is_ignored_for_unscoped_tables() {
        let mut controller = ListFormController::<Comment>::new();
        assert_eq!(controller.set_scope("anything"), None);
        assert_eq!(controller.query().scope, None);
    }

    #[test]
    fn search_narrows_and_clear_restores() {
        let mut table = seeded_storage();
        let mut controller = mounted::<StorageItem>(&mut table);

        let job = controller.set_search("  B-1 ");
        assert_eq!(controller.query().search.as_deref(), Some("B-1"));
        drive(&mut controller, job, |job| table.run(job));
        assert_eq!(controller.rows().len(), 1);

        let job = controller.clear_search();
        drive(&mut controller, job, |job| table.run(job));
        assert_eq!(controller.rows().len(), 2);

        let job = controller.set_search("   ");
        assert_eq!(controller.query().search, None);
        assert!(job.is_fetch());
    }
}
