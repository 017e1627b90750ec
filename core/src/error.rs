//! Error types for the Ubersmith client.
//!
//! # Design
//! Callers need to tell "the service answered no" apart from "we could not
//! reach or understand the service". The former is `Error::Api`; every
//! other variant is a transport/decode failure and is never folded into
//! `ApiError`.

use serde_json::Value;
use thiserror::Error;

/// Failure reported by the remote system: the envelope's `status` was falsy.
///
/// `code` is the envelope's `error_code` exactly as sent (usually a number,
/// `null` when missing).
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[Errno {}] {message}", code_text(.code))]
pub struct ApiError {
    pub code: Value,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<Value>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// The code as an integer, when the server sent a number or a numeric
    /// string.
    pub fn code_i64(&self) -> Option<i64> {
        match &self.code {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// The code as text: strings unquoted, anything else as JSON.
    pub fn code_display(&self) -> String {
        code_text(&self.code)
    }
}

fn code_text(code: &Value) -> String {
    match code {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The HTTP exchange itself failed.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Ureq(#[from] ureq::Error),

    /// Failure raised by a non-ureq `Transport` implementation.
    #[error("{0}")]
    Other(String),
}

/// Errors returned by `UbersmithClient` calls.
#[derive(Debug, Error)]
pub enum Error {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Non-2xx response without a usable JSON envelope.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// 2xx response whose body is not a JSON envelope.
    #[error("could not decode response envelope: {0}")]
    Decode(#[source] serde_json::Error),
}

impl Error {
    /// Whether the remote system rejected the call (as opposed to the call
    /// not completing).
    pub fn is_api(&self) -> bool {
        matches!(self, Error::Api(_))
    }

    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(err) => Some(err),
            _ => None,
        }
    }
}

/// Problems building a `ClientConfig` from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
