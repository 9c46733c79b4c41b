//! Error types for the controller API client.
//!
//! # Design
//! Transport failures, controller-reported errors and task outcomes each get
//! their own variants so callers can apply a different retry policy to each.
//! A search that matches nothing is `NoMatch`, never an index fault.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Controller error code reported when an export with the requested name
/// already exists for the given volumes.
pub const ERR_CODE_EXPORT_VOLUME_DUP: i64 = 1054;

/// Error body returned by the controller on a rejected request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub retryable: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub details: String,
}

impl ServiceError {
    pub fn is_export_volume_dup(&self) -> bool {
        self.code == ERR_CODE_EXPORT_VOLUME_DUP
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code {}: {}", self.code, self.description)?;
        if !self.details.is_empty() {
            write!(f, " ({})", self.details)?;
        }
        Ok(())
    }
}

/// Errors returned by the client and its accessors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The controller returned 404.
    #[error("resource not found")]
    NotFound,

    /// A search returned an empty result set.
    #[error("no resource matches search `{query}`")]
    NoMatch { query: String },

    /// A non-2xx status without a decodable controller error body.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The controller rejected the request with a structured error.
    #[error("controller error: {0}")]
    Service(ServiceError),

    /// The request never produced a response.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The controller reported the task as failed.
    #[error("task {task_id} failed: {message}")]
    TaskFailed { task_id: String, message: String },

    /// The task did not reach the awaited state before the deadline.
    #[error("task {task_id} timed out after {waited:?}")]
    TaskTimeout { task_id: String, waited: Duration },

    #[error("serialization failed: {0}")]
    SerializationError(String),

    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// True when the controller refused to create an export because one
    /// with the same name already exists.
    pub fn is_export_volume_dup(&self) -> bool {
        matches!(self, ApiError::Service(e) if e.is_export_volume_dup())
    }

    /// True for task failures and timeouts, as opposed to request failures.
    pub fn is_task_error(&self) -> bool {
        matches!(self, ApiError::TaskFailed { .. } | ApiError::TaskTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
