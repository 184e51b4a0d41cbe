// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::{Arc, RwLock};

use crate::{Client, Error, Result};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: User,
}

/// Signed-in session shared by the table client and the auth client.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle(Arc<RwLock<Option<Session>>>);

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Session> {
        match self.0.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set(&self, session: Session) {
        match self.0.write() {
            Ok(mut guard) => *guard = Some(session),
            Err(poisoned) => *poisoned.into_inner() = Some(session),
        }
    }

    pub fn clear(&self) {
        match self.0.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.get().map(|session| session.access_token)
    }

    pub fn user(&self) -> Option<User> {
        self.get().map(|session| session.user)
    }
}

pub fn validate_credentials(email: &str, password: &str) -> Result<()> {
    if !email.trim().contains('@') {
        return Err(Error::Invalid(format!(
            "{:?} is not an email address",
            email.trim()
        )));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::Invalid(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct AuthClient {
    client: Client,
}

impl AuthClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn session(&self) -> &SessionHandle {
        self.client.session()
    }

    /// Registers an account. Returns `None` when the service holds the
    /// session back until the address is confirmed.
    pub fn sign_up(&self, email: &str, password: &str) -> Result<Option<User>> {
        validate_credentials(email, password)?;
        let url = self.client.endpoint("auth/v1/signup")?;
        let response = self.client.send(
            self.client
                .request(Method::POST, url)
                .json(&json!({ "email": email.trim(), "password": password })),
        )?;
        let body: Value = response.json().map_err(|error| Error::Decode {
            url: "auth/v1/signup".to_owned(),
            message: error.to_string(),
        })?;
        if body.get("access_token").is_none() {
            tracing::info!("sign-up accepted, awaiting email confirmation");
            return Ok(None);
        }
        let session = decode_session("auth/v1/signup", body)?;
        Ok(Some(self.store(session)))
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<Option<User>> {
        validate_credentials(email, password)?;
        let mut url = self.client.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");
        let response = self.client.send(
            self.client
                .request(Method::POST, url)
                .json(&json!({ "email": email.trim(), "password": password })),
        )?;
        let body: Value = response.json().map_err(|error| Error::Decode {
            url: "auth/v1/token".to_owned(),
            message: error.to_string(),
        })?;
        let session = decode_session("auth/v1/token", body)?;
        Ok(Some(self.store(session)))
    }

    /// Drops the local session first, then revokes it remotely. A failed
    /// revocation is still reported.
    pub fn sign_out(&self) -> Result<()> {
        let token = self.session().access_token();
        self.session().clear();
        let Some(token) = token else {
            return Ok(());
        };
        tracing::info!("signing out");
        let url = self.client.endpoint("auth/v1/logout")?;
        self.client
            .send(self.client.request_with_token(Method::POST, url, &token))?;
        Ok(())
    }

    pub fn current_user(&self) -> Result<Option<User>> {
        let Some(token) = self.session().access_token() else {
            return Ok(None);
        };
        let url = self.client.endpoint("auth/v1/user")?;
        let response = self
            .client
            .send(self.client.request_with_token(Method::GET, url, &token))?;
        let user: User = response.json().map_err(|error| Error::Decode {
            url: "auth/v1/user".to_owned(),
            message: error.to_string(),
        })?;
        Ok(Some(user))
    }

    fn store(&self, session: Session) -> User {
        let user = session.user.clone();
        tracing::info!(user = %user.id, "signed in");
        self.session().set(session);
        user
    }
}

fn decode_session(path: &str, body: Value) -> Result<Session> {
    serde_json::from_value(body).map_err(|error| Error::Decode {
        url: path.to_owned(),
        message: format!("malformed session: {error}"),
    })
}
