//! HTTP service for random-set statistics.
//!
//! This module defines [`RandomService`], which owns the upstream
//! [`RandomSource`] and exposes it through an axum [`Router`]:
//!
//! - `GET /random/mean?requests=<int>&length=<int>` - validate, fan out,
//!   compute statistics, reply with JSON.
//! - `GET /health` - `SERVING` until shutdown begins, `NOT_SERVING` after.
//!
//! ## Responsibilities
//!
//! - Validate query parameters and enforce limits.
//! - Dispatch the fetches through [`fetch_sets`].
//! - Track in-flight requests and drive graceful shutdown.

use crate::server::{
    fanout::orchestrator::fetch_sets,
    service::request::{MeanQuery, MeanRequest},
    telemetry::{
        decrement_requests_inflight, increment_errors, increment_numbers_fetched,
        increment_requests, increment_requests_inflight, increment_upstream_calls,
        record_request_duration,
    },
    upstream::RandomSource,
};
use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    routing::get,
};
use core::{
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};
use randmean_core::{Error, Result, types::CalculationResult};
use std::{sync::Arc, time::Instant};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

/// Statistics service over a shared [`RandomSource`].
///
/// Cheap to clone; every clone shares the same source, shutdown token and
/// in-flight counter.
pub struct RandomService<S> {
    inner: Arc<Inner<S>>,
}

struct Inner<S> {
    source: Arc<S>,
    shutdown_token: CancellationToken,
    shutting_down: AtomicBool,
    inflight: AtomicUsize,
    shutdown_timeout: Duration,
}

impl<S> Clone for RandomService<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Decrements the in-flight counter when a request finishes or is dropped
/// because the client went away.
struct InflightGuard<'a> {
    inflight: &'a AtomicUsize,
}

impl<'a> InflightGuard<'a> {
    fn enter(inflight: &'a AtomicUsize) -> Self {
        inflight.fetch_add(1, Ordering::SeqCst);
        increment_requests_inflight();
        Self { inflight }
    }
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.inflight.fetch_sub(1, Ordering::SeqCst);
        decrement_requests_inflight();
    }
}

impl<S: RandomSource> RandomService<S> {
    /// Creates a service around `source`.
    ///
    /// `shutdown_timeout` bounds how long [`shutdown`](Self::shutdown) waits
    /// for in-flight requests before cancelling their upstream calls.
    pub fn new(source: S, shutdown_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                source: Arc::new(source),
                shutdown_token: CancellationToken::new(),
                shutting_down: AtomicBool::new(false),
                inflight: AtomicUsize::new(0),
                shutdown_timeout,
            }),
        }
    }

    /// Routes served by this service, with the service as shared state.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/random/mean", get(random_mean::<S>))
            .route("/health", get(health::<S>))
            .with_state(self.clone())
    }

    pub fn is_serving(&self) -> bool {
        !self.inner.shutting_down.load(Ordering::SeqCst)
    }

    pub fn inflight(&self) -> usize {
        self.inner.inflight.load(Ordering::SeqCst)
    }

    /// Fetches `request.requests` sets concurrently and computes one result
    /// per set plus one over their concatenation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServiceShutdown`] once shutdown has begun, the first
    /// upstream error of the batch, or [`Error::EmptySample`] if the upstream
    /// returned an empty set.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(requests = request.requests, length = request.length))
    )]
    pub async fn random_mean(&self, request: MeanRequest) -> Result<Vec<CalculationResult>> {
        let _inflight = self.admit()?;

        increment_upstream_calls(request.requests as u64);
        let sets = fetch_sets(
            Arc::clone(&self.inner.source),
            request.requests,
            request.length,
            &self.inner.shutdown_token,
        )
        .await?;
        increment_numbers_fetched(sets.total_values() as u64);

        sets.calculate()
    }

    /// Counts the request as in flight, then refuses it if shutdown has
    /// begun. A request admitted here is always seen by the drain.
    fn admit(&self) -> Result<InflightGuard<'_>> {
        let guard = InflightGuard::enter(&self.inner.inflight);
        if !self.is_serving() {
            return Err(Error::ServiceShutdown);
        }
        Ok(guard)
    }

    /// Gracefully shuts the service down.
    ///
    /// - Refuses new requests and reports `NOT_SERVING` on `/health`.
    /// - Waits up to the shutdown timeout for in-flight requests to drain.
    /// - Cancels the shared token, aborting any upstream calls still running.
    pub async fn shutdown(&self) {
        // === Phase 0: Stop accepting new requests ===
        #[cfg(feature = "tracing")]
        tracing::info!("Refusing new requests");
        self.inner.shutting_down.store(true, Ordering::SeqCst);

        // === Phase 1: Wait for in-flight requests to drain ===
        #[cfg(feature = "tracing")]
        tracing::info!("Draining in-flight requests ({} active)", self.inflight());
        let drain_result = timeout(self.inner.shutdown_timeout, async {
            while self.inflight() > 0 {
                sleep(Duration::from_millis(100)).await;
            }
        })
        .await;

        match drain_result {
            Ok(()) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("All in-flight requests drained successfully");
            }
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    "Graceful drain timed out ({} requests still active)",
                    self.inflight()
                );
            }
        }

        // === Phase 2: Cancel any remaining upstream calls ===
        #[cfg(feature = "tracing")]
        tracing::debug!("Cancelling remaining work via shutdown token");
        self.inner.shutdown_token.cancel();
    }
}

/// `GET /random/mean`
///
/// A query that fails to decode (non-integer values, unknown parameters) is
/// reported as a plain "Bad request".
async fn random_mean<S: RandomSource>(
    State(service): State<RandomService<S>>,
    query: core::result::Result<Query<MeanQuery>, QueryRejection>,
) -> Result<Json<Vec<CalculationResult>>> {
    let start = Instant::now();
    increment_requests();

    let outcome = match query {
        Ok(Query(query)) => match query.validate() {
            Ok(request) => service.random_mean(request).await,
            Err(e) => Err(e),
        },
        Err(_rejection) => {
            #[cfg(feature = "tracing")]
            tracing::debug!("Rejected query: {_rejection}");
            Err(Error::invalid_request("Bad request"))
        }
    };

    match outcome {
        Ok(results) => {
            record_request_duration(start.elapsed().as_millis() as f64);
            Ok(Json(results))
        }
        Err(e) => {
            increment_errors();
            #[cfg(feature = "tracing")]
            match &e {
                Error::InvalidRequest { reason } => tracing::debug!("Invalid request: {reason}"),
                _ => tracing::warn!("Request failed: {e}"),
            }
            Err(e)
        }
    }
}

/// `GET /health`
async fn health<S: RandomSource>(State(service): State<RandomService<S>>) -> (StatusCode, &'static str) {
    if service.is_serving() {
        (StatusCode::OK, "SERVING")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT_SERVING")
    }
}
