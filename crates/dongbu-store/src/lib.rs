// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod memory;

pub use memory::MemoryStore;

use dongbu_app::{Entity, Job, ListQuery, Outcome, Record, RemoteError, RowId, decode_rows};
use dongbu_remote::Client;
use std::marker::PhantomData;

/// Typed access to one flat table.
pub trait Repository<E: Entity> {
    /// Rows newest first, narrowed by the query's search needle and scope.
    fn list(&self, query: &ListQuery) -> Result<Vec<E>, RemoteError>;

    fn insert(&self, record: &Record) -> Result<(), RemoteError>;

    /// Replaces every editable column of the row. Zero rows affected is not
    /// an error.
    fn update(&self, id: E::Id, record: &Record) -> Result<usize, RemoteError>;

    fn delete(&self, id: E::Id) -> Result<usize, RemoteError>;
}

/// Executes one controller job against a repository. A partitioned table
/// with no partition selected lists nothing instead of every partition.
pub fn run_job<E, R>(repo: &R, job: &Job<E>) -> Outcome<E>
where
    E: Entity,
    R: Repository<E> + ?Sized,
{
    match job {
        Job::Fetch { query, .. } if E::SPEC.scope.is_some() && query.scope.is_none() => {
            tracing::debug!(table = E::SPEC.name, "no partition selected; skipping fetch");
            Outcome::Fetched(Ok(Vec::new()))
        }
        Job::Fetch { query, .. } => Outcome::Fetched(repo.list(query)),
        Job::Insert { record, .. } => Outcome::Written(repo.insert(record).map(|()| 1)),
        Job::Update { id, record, .. } => Outcome::Written(repo.update(*id, record)),
        Job::Delete { id, .. } => Outcome::Written(repo.delete(*id)),
    }
}

pub fn remote_error(error: dongbu_remote::Error) -> RemoteError {
    RemoteError::new(error.code(), error.message())
}

/// Repository backed by the hosted table of the same name.
#[derive(Debug, Clone)]
pub struct TableRepository<E> {
    client: Client,
    entity: PhantomData<fn() -> E>,
}

impl<E: Entity> TableRepository<E> {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            entity: PhantomData,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl<E: Entity> Repository<E> for TableRepository<E> {
    fn list(&self, query: &ListQuery) -> Result<Vec<E>, RemoteError> {
        let spec = E::SPEC;
        let mut select = self.client.from(spec.name).select("*");
        for order in spec.order {
            select = select.order(order.column, order.ascending);
        }
        if let Some(scope) = &query.scope {
            select = select.eq(scope.column, &scope.value);
        }
        if let Some(needle) = &query.search
            && spec.is_searchable()
        {
            select = select.ilike_any(spec.search_columns, needle);
        }
        tracing::debug!(table = spec.name, "listing rows");
        let rows = select.execute().map_err(remote_error)?;
        decode_rows(rows)
    }

    fn insert(&self, record: &Record) -> Result<(), RemoteError> {
        tracing::debug!(table = E::SPEC.name, "inserting row");
        self.client
            .from(E::SPEC.name)
            .insert(record)
            .map_err(remote_error)
    }

    fn update(&self, id: E::Id, record: &Record) -> Result<usize, RemoteError> {
        tracing::debug!(table = E::SPEC.name, id = id.raw(), "updating row");
        self.client
            .from(E::SPEC.name)
            .update(record)
            .eq("id", &id.raw().to_string())
            .execute()
            .map_err(remote_error)
    }

    fn delete(&self, id: E::Id) -> Result<usize, RemoteError> {
        tracing::debug!(table = E::SPEC.name, id = id.raw(), "deleting row");
        self.client
            .from(E::SPEC.name)
            .delete()
            .eq("id", &id.raw().to_string())
            .execute()
            .map_err(remote_error)
    }
}
