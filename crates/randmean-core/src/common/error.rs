//! Error types for the random statistics service.
//!
//! This module defines the central `Error` enum, which captures every
//! reportable failure between an inbound HTTP request and the upstream
//! random.org call. It implements [`IntoResponse`] so handlers can return
//! `Result<_, Error>` and have each case rendered with the right status code
//! and a plain-text body.
//!
//! ## Error Cases
//! - `InvalidRequest`: The client query was malformed or out of bounds.
//! - `Transport`: The upstream could not be reached.
//! - `Timeout`: The upstream call exceeded its deadline.
//! - `UpstreamStatus`: The upstream answered with a non-success status.
//! - `MalformedResponse`: The upstream body was not a valid JSON-RPC reply.
//! - `Provider`: The upstream rejected the call with an explicit error.
//! - `RequestCancelled`: The call was cancelled before it completed.
//! - `TaskFailed`: A fan-out task panicked or was aborted.
//! - `EmptySample`: Statistics were requested over an empty sample.
//! - `ServiceShutdown`: A request arrived while the service was shutting down.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

pub type Result<T> = core::result::Result<T, Error>;

/// Prefix placed in front of every upstream failure surfaced to clients.
pub const UPSTREAM_ERROR_PREFIX: &str = "Error while retrieving data from random.org API. ";

/// Unified error type for the random statistics service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The client request was invalid or exceeded constraints.
    #[error("{reason}")]
    InvalidRequest { reason: String },

    /// Connection-level failure talking to the upstream. The context is kept
    /// for logs and never shown to clients.
    #[error("Failed to reach random.org API")]
    Transport { context: String },

    /// The upstream call did not finish within the configured timeout.
    #[error("Request to random.org API timed out")]
    Timeout,

    /// The upstream answered with a non-200 status code.
    #[error("Unsuccessful status code returned from random.org API")]
    UpstreamStatus { status: u16 },

    /// The upstream body could not be decoded as a JSON-RPC response.
    #[error("Malformed response from random.org API: {context}")]
    MalformedResponse { context: String },

    /// The upstream accepted the call but returned an error member.
    #[error("{message}")]
    Provider { message: String },

    /// The call was cancelled, either by a failing sibling or by shutdown.
    #[error("Request was cancelled")]
    RequestCancelled,

    /// A fan-out task panicked or was aborted before reporting.
    #[error("Upstream task failed: {context}")]
    TaskFailed { context: String },

    /// Mean or deviation requested over zero values.
    #[error("Cannot compute statistics of an empty sample")]
    EmptySample,

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl Error {
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Whether this error originated from the upstream call path.
    pub const fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::Timeout
                | Self::UpstreamStatus { .. }
                | Self::MalformedResponse { .. }
                | Self::Provider { .. }
                | Self::RequestCancelled
                | Self::TaskFailed { .. }
        )
    }

    /// HTTP status code this error is reported with.
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            Self::ServiceShutdown => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = if self.is_upstream() {
            format!("{UPSTREAM_ERROR_PREFIX}{self}")
        } else if matches!(self, Self::EmptySample) {
            format!("Failed to compute statistics. {self}")
        } else {
            self.to_string()
        };
        (status, body).into_response()
    }
}
