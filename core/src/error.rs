//! Error types for the fetch adapter.
//!
//! # Design
//! Every `AdapterError` carries the config of the call that produced it so
//! callers can diagnose failures without threading the config around.
//! `TransportError` is what injected transports report; the adapter folds
//! all of those into `AdapterError::Network`.

use std::fmt;

use thiserror::Error;

use crate::body::DecodeError;
use crate::cancel::Cancel;
use crate::config::{RequestConfig, ResponseType};
use crate::response::Response;

/// Error codes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Timeout with `transitional.clarifyTimeoutError` set.
    TimedOut,
    /// Timeout without the clarification switch.
    ConnAborted,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::TimedOut => "ETIMEDOUT",
            ErrorCode::ConnAborted => "ECONNABORTED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a `Fetch` implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The abort signal fired before the transport finished.
    #[error("request aborted")]
    Aborted,

    /// DNS resolution or connection setup failed.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The connection broke while sending or receiving.
    #[error("I/O error: {0}")]
    Io(String),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum AdapterError {
    /// The transport threw. No status code is available.
    #[error("Network Error")]
    Network {
        config: Box<RequestConfig>,
        #[source]
        source: TransportError,
    },

    /// The timer won the race. Adapters resolve with this rather than
    /// rejecting; see [`crate::Resolved::Timeout`].
    #[error("{message}")]
    Timeout {
        message: String,
        code: ErrorCode,
        config: Box<RequestConfig>,
    },

    /// The caller's cancel token fired while the request was in flight.
    #[error("{reason}")]
    Cancelled {
        reason: Cancel,
        config: Box<RequestConfig>,
    },

    /// Status validation rejected the response.
    #[error("Request failed with status code {}", .response.status)]
    Status { response: Box<Response> },

    /// The body arrived but could not be decoded as requested.
    #[error("failed to decode response as {response_type}: {source}")]
    Decode {
        response_type: ResponseType,
        config: Box<RequestConfig>,
        #[source]
        source: DecodeError,
    },
}

impl AdapterError {
    pub fn network(config: &RequestConfig, source: TransportError) -> Self {
        AdapterError::Network {
            config: Box::new(config.clone()),
            source,
        }
    }

    /// Build the timeout error for `config`, honouring its message override
    /// and clarification switch.
    pub fn timeout(config: &RequestConfig) -> Self {
        let message = config
            .timeout_error_message
            .clone()
            .unwrap_or_else(|| format!("timeout of {}ms exceeded", config.timeout));
        let code = if config.transitional.clarify_timeout_error {
            ErrorCode::TimedOut
        } else {
            ErrorCode::ConnAborted
        };
        AdapterError::Timeout {
            message,
            code,
            config: Box::new(config.clone()),
        }
    }

    pub fn cancelled(config: &RequestConfig, reason: Cancel) -> Self {
        AdapterError::Cancelled {
            reason,
            config: Box::new(config.clone()),
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            AdapterError::Timeout { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn config(&self) -> &RequestConfig {
        match self {
            AdapterError::Network { config, .. }
            | AdapterError::Timeout { config, .. }
            | AdapterError::Cancelled { config, .. }
            | AdapterError::Decode { config, .. } => &**config,
            AdapterError::Status { response } => &response.config,
        }
    }

    /// The response, for errors raised after one arrived.
    pub fn response(&self) -> Option<&Response> {
        match self {
            AdapterError::Status { response } => Some(&**response),
            _ => None,
        }
    }

    pub fn is_cancel(&self) -> bool {
        matches!(self, AdapterError::Cancelled { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, AdapterError::Timeout { .. })
    }
}
