// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use dongbu_app::{CarLog, Comment, Job, Outcome, StorageItem};
use dongbu_remote::auth::validate_credentials;
use dongbu_remote::{AuthClient, Client, User};
use dongbu_store::{MemoryStore, TableRepository, run_job};
use dongbu_tui::{AppRuntime, AuthJob, AuthResult, InternalEvent, TableJob, TableResult};
use std::sync::mpsc::Sender;
use std::thread;

fn user_label(user: User) -> String {
    user.email.unwrap_or(user.id)
}

fn run_auth(auth: &AuthClient, job: AuthJob) -> AuthResult {
    let label = |user: Option<User>| user.map(user_label);
    match job {
        AuthJob::SignIn { email, password } => AuthResult::SignedIn(
            auth.sign_in(&email, &password)
                .map(label)
                .map_err(|error| error.to_string()),
        ),
        AuthJob::SignUp { email, password } => AuthResult::SignedUp(
            auth.sign_up(&email, &password)
                .map(label)
                .map_err(|error| error.to_string()),
        ),
        AuthJob::SignOut => {
            AuthResult::SignedOut(auth.sign_out().map_err(|error| error.to_string()))
        }
        AuthJob::CurrentUser => AuthResult::CurrentUser(
            auth.current_user()
                .map(label)
                .map_err(|error| error.to_string()),
        ),
    }
}

/// The three hosted tables behind one client.
#[derive(Debug, Clone)]
struct RemoteTables {
    comments: TableRepository<Comment>,
    storage: TableRepository<StorageItem>,
    car_logs: TableRepository<CarLog>,
}

impl RemoteTables {
    fn execute(&self, job: TableJob) -> TableResult {
        match job {
            TableJob::Board(job) => TableResult::Board(job.ticket(), run_job(&self.comments, &job)),
            TableJob::Storage(job) => {
                TableResult::Storage(job.ticket(), run_job(&self.storage, &job))
            }
            TableJob::Car(job) => TableResult::Car(job.ticket(), run_job(&self.car_logs, &job)),
        }
    }
}

pub struct RemoteRuntime {
    tables: RemoteTables,
    auth: AuthClient,
}

impl RemoteRuntime {
    pub fn new(client: &Client) -> Self {
        Self {
            tables: RemoteTables {
                comments: TableRepository::new(client.clone()),
                storage: TableRepository::new(client.clone()),
                car_logs: TableRepository::new(client.clone()),
            },
            auth: client.auth(),
        }
    }
}

impl AppRuntime for RemoteRuntime {
    fn run_comment_job(&mut self, job: &Job<Comment>) -> Outcome<Comment> {
        run_job(&self.tables.comments, job)
    }

    fn run_storage_job(&mut self, job: &Job<StorageItem>) -> Outcome<StorageItem> {
        run_job(&self.tables.storage, job)
    }

    fn run_car_log_job(&mut self, job: &Job<CarLog>) -> Outcome<CarLog> {
        run_job(&self.tables.car_logs, job)
    }

    fn run_auth_job(&mut self, job: AuthJob) -> AuthResult {
        run_auth(&self.auth, job)
    }

    fn spawn_job(&mut self, job: TableJob, tx: Sender<InternalEvent>) -> Result<()> {
        let tables = self.tables.clone();
        thread::Builder::new()
            .name("dongbu-remote".to_owned())
            .spawn(move || {
                let result = tables.execute(job);
                if tx.send(InternalEvent::Finished(result)).is_err() {
                    tracing::debug!("ui closed before the request finished");
                }
            })
            .context("spawn remote request thread")?;
        Ok(())
    }

    fn spawn_auth(&mut self, serial: u64, job: AuthJob, tx: Sender<InternalEvent>) -> Result<()> {
        let auth = self.auth.clone();
        thread::Builder::new()
            .name("dongbu-auth".to_owned())
            .spawn(move || {
                let result = run_auth(&auth, job);
                if tx.send(InternalEvent::Auth { serial, result }).is_err() {
                    tracing::debug!("ui closed before the account request finished");
                }
            })
            .context("spawn account request thread")?;
        Ok(())
    }
}

/// In-process tables for `--demo`. Any well-formed credentials sign in.
pub struct MemoryRuntime {
    store: MemoryStore,
    user: Option<String>,
}

impl MemoryRuntime {
    pub fn new(store: MemoryStore) -> Self {
        Self { store, user: None }
    }

    fn sign_in(&mut self, email: &str, password: &str) -> Result<Option<String>, String> {
        validate_credentials(email, password).map_err(|error| error.to_string())?;
        self.user = Some(email.trim().to_owned());
        Ok(self.user.clone())
    }
}

impl AppRuntime for MemoryRuntime {
    fn run_comment_job(&mut self, job: &Job<Comment>) -> Outcome<Comment> {
        run_job(&self.store, job)
    }

    fn run_storage_job(&mut self, job: &Job<StorageItem>) -> Outcome<StorageItem> {
        run_job(&self.store, job)
    }

    fn run_car_log_job(&mut self, job: &Job<CarLog>) -> Outcome<CarLog> {
        run_job(&self.store, job)
    }

    fn run_auth_job(&mut self, job: AuthJob) -> AuthResult {
        match job {
            AuthJob::SignIn { email, password } => {
                AuthResult::SignedIn(self.sign_in(&email, &password))
            }
            AuthJob::SignUp { email, password } => {
                AuthResult::SignedUp(self.sign_in(&email, &password))
            }
            AuthJob::SignOut => {
                self.user = None;
                AuthResult::SignedOut(Ok(()))
            }
            AuthJob::CurrentUser => AuthResult::CurrentUser(Ok(self.user.clone())),
        }
    }
}
