// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Thin blocking client for a hosted PostgREST service and its GoTrue auth
//! endpoints.

pub mod auth;

pub use auth::{AuthClient, Session, SessionHandle, User};

use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const NETWORK_ERROR_CODE: &str = "network";
pub const DECODE_ERROR_CODE: &str = "decode";
pub const INVALID_ERROR_CODE: &str = "invalid";

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot reach {url} -- check [remote].url and your network ({source})")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("server error ({status}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
    #[error("{0}")]
    Invalid(String),
}

impl Error {
    /// Provider error code, or a local code for failures that never reached
    /// the provider.
    pub fn code(&self) -> &str {
        match self {
            Self::Connection { .. } => NETWORK_ERROR_CODE,
            Self::Api { code, .. } => code,
            Self::Decode { .. } => DECODE_ERROR_CODE,
            Self::Invalid(_) => INVALID_ERROR_CODE,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            Self::Invalid(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    api_key: String,
    timeout: Duration,
    http: HttpClient,
    session: SessionHandle,
}

impl Client {
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
        session: SessionHandle,
    ) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            return Err(Error::Invalid("remote.url must not be empty".to_owned()));
        }
        if api_key.trim().is_empty() {
            return Err(Error::Invalid("remote.api_key must not be empty".to_owned()));
        }
        Url::parse(&base_url)
            .map_err(|error| Error::Invalid(format!("remote.url {base_url:?} is invalid: {error}")))?;

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| Error::Connection {
                url: base_url.clone(),
                source,
            })?;

        Ok(Self {
            base_url,
            api_key: api_key.trim().to_owned(),
            timeout,
            http,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn auth(&self) -> AuthClient {
        AuthClient::new(self.clone())
    }

    pub fn from(&self, table: &str) -> Table<'_> {
        Table {
            client: self,
            name: table.to_owned(),
        }
    }

    /// Authenticated request against the REST root; proves the url and key.
    pub fn ping(&self) -> Result<()> {
        let url = self.endpoint("rest/v1/")?;
        self.send(self.request(Method::GET, url))?;
        Ok(())
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        let raw = format!("{}/{}", self.base_url, path);
        Url::parse(&raw).map_err(|error| Error::Invalid(format!("bad endpoint {raw:?}: {error}")))
    }

    fn bearer(&self) -> String {
        self.session
            .access_token()
            .unwrap_or_else(|| self.api_key.clone())
    }

    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.request_with_token(method, url, &self.bearer())
    }

    pub(crate) fn request_with_token(&self, method: Method, url: Url, token: &str) -> RequestBuilder {
        tracing::debug!(%method, path = url.path(), "remote request");
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {token}"))
    }

    pub(crate) fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().map_err(|source| Error::Connection {
            url: self.base_url.clone(),
            source,
        })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        Ok(response)
    }
}

pub struct Table<'a> {
    client: &'a Client,
    name: String,
}

impl<'a> Table<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn select(&self, columns: &str) -> SelectQuery<'a> {
        SelectQuery {
            client: self.client,
            table: self.name.clone(),
            columns: columns.to_owned(),
            order: Vec::new(),
            filters: Vec::new(),
        }
    }

    /// Inserts one row or an array of rows. The store assigns `id` and
    /// `created_at`.
    pub fn insert<T: Serialize + ?Sized>(&self, rows: &T) -> Result<()> {
        let url = self.client.endpoint(&format!("rest/v1/{}", self.name))?;
        let builder = self
            .client
            .request(Method::POST, url)
            .header("Prefer", "return=minimal")
            .json(rows);
        self.client.send(builder)?;
        Ok(())
    }

    pub fn update<T: Serialize + ?Sized>(&self, fields: &T) -> MutationQuery<'a> {
        MutationQuery {
            client: self.client,
            table: self.name.clone(),
            method: Method::PATCH,
            body: serde_json::to_value(fields).map_err(|error| error.to_string()),
            filters: Vec::new(),
        }
    }

    pub fn delete(&self) -> MutationQuery<'a> {
        MutationQuery {
            client: self.client,
            table: self.name.clone(),
            method: Method::DELETE,
            body: Ok(Value::Null),
            filters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SelectQuery<'a> {
    client: &'a Client,
    table: String,
    columns: String,
    order: Vec<String>,
    filters: Vec<(String, String)>,
}

impl SelectQuery<'_> {
    /// Adds an ordering term; repeated calls break ties left to right.
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.order.push(format!("{column}.{direction}"));
        self
    }

    /// Raw PostgREST disjunction such as `name.ilike.*k*,location.ilike.*k*`.
    pub fn or(mut self, conditions: &str) -> Self {
        self.filters
            .push(("or".to_owned(), format!("({conditions})")));
        self
    }

    /// Exact match. The value is sent verbatim; PostgREST only reads quotes
    /// inside `or=(...)` trees.
    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.filters.push((column.to_owned(), format!("eq.{value}")));
        self
    }

    /// Case-insensitive substring match on any of `columns`.
    pub fn ilike_any(self, columns: &[&str], needle: &str) -> Self {
        let pattern = quote_value(&format!("*{needle}*"));
        let conditions = columns
            .iter()
            .map(|column| format!("{column}.ilike.{pattern}"))
            .collect::<Vec<_>>()
            .join(",");
        self.or(&conditions)
    }

    pub fn url(&self) -> Result<Url> {
        let mut url = self.client.endpoint(&format!("rest/v1/{}", self.table))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", &self.columns);
            for (key, value) in &self.filters {
                pairs.append_pair(key, value);
            }
            if !self.order.is_empty() {
                pairs.append_pair("order", &self.order.join(","));
            }
        }
        Ok(url)
    }

    pub fn execute(self) -> Result<Vec<Value>> {
        let url = self.url()?;
        let response = self.client.send(self.client.request(Method::GET, url.clone()))?;
        read_rows(&url, response)
    }
}

pub struct MutationQuery<'a> {
    client: &'a Client,
    table: String,
    method: Method,
    body: std::result::Result<Value, String>,
    filters: Vec<(String, String)>,
}

impl MutationQuery<'_> {
    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.filters.push((column.to_owned(), format!("eq.{value}")));
        self
    }

    /// Returns the number of rows affected. Zero is not an error.
    pub fn execute(self) -> Result<usize> {
        if self.filters.is_empty() {
            return Err(Error::Invalid(format!(
                "refusing to {} every row of {}",
                self.method.as_str().to_lowercase(),
                self.table
            )));
        }
        let body = self.body.map_err(|message| Error::Invalid(format!(
            "cannot encode {} payload: {message}",
            self.table
        )))?;

        let mut url = self.client.endpoint(&format!("rest/v1/{}", self.table))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.filters {
                pairs.append_pair(key, value);
            }
        }
        let mut builder = self
            .client
            .request(self.method.clone(), url.clone())
            .header("Prefer", "return=representation");
        if !body.is_null() {
            builder = builder.json(&body);
        }
        let response = self.client.send(builder)?;
        Ok(read_rows(&url, response)?.len())
    }
}

fn read_rows(url: &Url, response: Response) -> Result<Vec<Value>> {
    let body = response.text().map_err(|error| Error::Decode {
        url: url.path().to_owned(),
        message: error.to_string(),
    })?;
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&body).map_err(|error| Error::Decode {
        url: url.path().to_owned(),
        message: format!("expected a JSON array of rows: {error}"),
    })
}

/// Double-quotes a value inside an `or=(...)` tree when it contains characters
/// PostgREST treats as syntax.
pub fn quote_value(value: &str) -> String {
    let reserved = |ch: char| matches!(ch, ',' | '.' | ':' | '(' | ')' | '"' | '\\') || ch.is_whitespace();
    if !value.chars().any(reserved) {
        return value.to_owned();
    }
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    code: Option<Value>,
    message: Option<String>,
    details: Option<String>,
    error_code: Option<String>,
    msg: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

pub(crate) fn clean_error_response(status: StatusCode, body: &str) -> Error {
    let status_code = status.as_u16();
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        let code = non_empty(envelope.error_code)
            .or_else(|| match envelope.code {
                Some(Value::String(code)) if !code.is_empty() => Some(code),
                _ => None,
            })
            .or_else(|| non_empty(envelope.error.clone()))
            .unwrap_or_else(|| status_code.to_string());
        let message = non_empty(envelope.message)
            .or(non_empty(envelope.msg))
            .or(non_empty(envelope.error_description))
            .or(non_empty(envelope.error))
            .or(non_empty(envelope.details));
        if let Some(message) = message {
            return Error::Api {
                status: status_code,
                code,
                message,
            };
        }
    }

    let message = if !body.is_empty() && body.len() < 100 && !body.contains('{') {
        body.trim().to_owned()
    } else {
        format!("server returned {status_code}")
    };
    Error::Api {
        status: status_code,
        code: status_code.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, clean_error_response, quote_value};
    use reqwest::StatusCode;

    #[test]
    fn quote_value_leaves_plain_values_alone() {
        assert_eq!(quote_value("서울82바1253"), "서울82바1253");
        assert_eq!(quote_value("*vase*"), "*vase*");
    }

    #[test]
    fn quote_value_wraps_reserved_characters() {
        assert_eq!(quote_value("A-3, shelf"), "\"A-3, shelf\"");
        assert_eq!(quote_value("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(quote_value("*12가 3456*"), "\"*12가 3456*\"");
    }

    #[test]
    fn postgrest_envelope_keeps_code_and_message() {
        let body = r#"{"code":"23502","details":null,"hint":null,"message":"null value in column \"name\""}"#;
        let error = clean_error_response(StatusCode::BAD_REQUEST, body);
        assert_eq!(error.code(), "23502");
        assert_eq!(error.message(), "null value in column \"name\"");
        assert!(error.to_string().starts_with("server error (400)"));
    }

    #[test]
    fn gotrue_envelopes_are_recognized() {
        let current = r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#;
        let error = clean_error_response(StatusCode::BAD_REQUEST, current);
        assert_eq!(error.code(), "invalid_credentials");
        assert_eq!(error.message(), "Invalid login credentials");

        let legacy = r#"{"error":"invalid_grant","error_description":"Email not confirmed"}"#;
        let error = clean_error_response(StatusCode::BAD_REQUEST, legacy);
        assert_eq!(error.code(), "invalid_grant");
        assert_eq!(error.message(), "Email not confirmed");
    }

    #[test]
    fn unparseable_bodies_fall_back_to_status() {
        let error = clean_error_response(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert_eq!(error.code(), "502");
        assert_eq!(error.message(), "<html>bad gateway</html>");

        let error = clean_error_response(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert!(matches!(error, Error::Api { status: 500, .. }));
        assert_eq!(error.message(), "server returned 500");
    }
}
