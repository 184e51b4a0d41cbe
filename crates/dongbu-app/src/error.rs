// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

pub const DECODE_ERROR_CODE: &str = "decode";

/// Failure reported by the hosted store or the transport in front of it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (code {code})")]
pub struct RemoteError {
    pub code: String,
    pub message: String,
}

impl RemoteError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(DECODE_ERROR_CODE, message)
    }
}

#[cfg(test)]
mod tests {
    use super::RemoteError;

    #[test]
    fn display_includes_provider_code_and_message() {
        let error = RemoteError::new("23505", "duplicate key value violates unique constraint");
        assert_eq!(
            error.to_string(),
            "duplicate key value violates unique constraint (code 23505)"
        );
    }

    #[test]
    fn decode_errors_use_the_decode_code() {
        assert_eq!(RemoteError::decode("bad row").code, "decode");
    }
}
