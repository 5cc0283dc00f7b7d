//! HTTP service implementation.
//!
//! This module contains the client-facing request handling: query decoding
//! and validation, dispatch to the fan-out orchestrator, statistics, and
//! shutdown coordination.
//!
//! ## Structure
//!
//! - [`handler`] - axum routes and the service entry point (`RandomService`).
//! - [`request`] - query parameters and their validation (`MeanQuery`).

pub mod handler;
pub mod request;
