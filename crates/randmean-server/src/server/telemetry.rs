//! # Telemetry Features
//!
//! Console logging is always on via `tracing_subscriber::fmt`, filtered with
//! `RUST_LOG` (default `info`). OpenTelemetry export is optional.
//!
//! ## Feature matrix
//!
//! - `tracing`: Emits log events and spans, and installs an OpenTelemetry
//!   tracer provider bridged through `tracing-opentelemetry`. Enabled by
//!   default.
//! - `metrics`: Installs an OpenTelemetry meter provider and the counters and
//!   histograms below.
//! - `stdout`: Exports spans and metrics to stdout.
//!
//! ## Metrics
//!
//! - `requests`: inbound `/random/mean` requests
//! - `requests_inflight`: requests currently fanning out
//! - `errors`: requests answered with an error
//! - `upstream_calls`: upstream calls issued
//! - `numbers_fetched`: integers received from the upstream
//! - `request_duration`: end-to-end duration of successful requests (ms)
//!
//! ## Example usage
//!
//! ```bash
//! cargo run --features tracing,metrics,stdout
//! ```

// Disallow using `stdout` without `tracing` or `metrics`
#[cfg(all(feature = "stdout", not(any(feature = "tracing", feature = "metrics"))))]
compile_error!(
    "The 'stdout' feature requires at least one of 'tracing' or 'metrics' to be enabled."
);

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "metrics")]
use opentelemetry_sdk::metrics as sdkmetrics;

#[cfg(any(feature = "metrics", feature = "tracing"))]
use opentelemetry::{InstrumentationScope, KeyValue};
#[cfg(any(feature = "metrics", feature = "tracing"))]
use opentelemetry_sdk::Resource;
#[cfg(any(feature = "metrics", feature = "tracing"))]
use opentelemetry_semantic_conventions as semvcns;

#[cfg(feature = "tracing")]
use opentelemetry::trace::TracerProvider;
#[cfg(feature = "tracing")]
use opentelemetry_sdk::propagation::TraceContextPropagator;
#[cfg(feature = "tracing")]
use opentelemetry_sdk::trace as sdktrace;

const SERVICE_NAME: &str = "randmean";

pub struct TelemetryProviders {
    #[cfg(feature = "tracing")]
    pub tracer_provider: sdktrace::SdkTracerProvider,
    #[cfg(feature = "metrics")]
    pub meter_provider: sdkmetrics::SdkMeterProvider,
}

impl TelemetryProviders {
    /// Flushes and shuts down every installed provider. Failures are printed
    /// to stderr because the subscriber may already be gone.
    pub fn shutdown(self) {
        #[cfg(feature = "tracing")]
        {
            if let Err(err) = self.tracer_provider.force_flush() {
                eprintln!("Error flushing traces: {err:#?}");
            }
            if let Err(err) = self.tracer_provider.shutdown() {
                eprintln!("Error shutting down tracer: {err:#?}");
            }
        }

        #[cfg(feature = "metrics")]
        {
            if let Err(err) = self.meter_provider.force_flush() {
                eprintln!("Error flushing metrics: {err:#?}");
            }
            if let Err(err) = self.meter_provider.shutdown() {
                eprintln!("Error shutting down meter: {err:#?}");
            }
        }
    }
}

pub fn init_telemetry() -> anyhow::Result<TelemetryProviders> {
    #[cfg(feature = "tracing")]
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

    #[cfg(feature = "tracing")]
    let tracer_provider = init_tracer();

    #[cfg(feature = "metrics")]
    let meter_provider = init_metrics();

    #[cfg(any(feature = "metrics", feature = "tracing"))]
    let scope = InstrumentationScope::builder(SERVICE_NAME)
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_schema_url(semvcns::SCHEMA_URL)
        .build();

    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true)
                .pretty(),
        );

    #[cfg(feature = "tracing")]
    let registry = {
        opentelemetry::global::set_tracer_provider(tracer_provider.clone());
        registry.with(
            tracing_opentelemetry::layer()
                .with_tracer(tracer_provider.tracer_with_scope(scope.clone()))
                .with_error_records_to_exceptions(true),
        )
    };

    #[cfg(feature = "metrics")]
    let registry = {
        opentelemetry::global::set_meter_provider(meter_provider.clone());
        instruments::install(&opentelemetry::global::meter_with_scope(scope));

        registry.with(tracing_opentelemetry::MetricsLayer::new(
            meter_provider.clone(),
        ))
    };

    registry.try_init()?;

    Ok(TelemetryProviders {
        #[cfg(feature = "tracing")]
        tracer_provider,
        #[cfg(feature = "metrics")]
        meter_provider,
    })
}

#[cfg(any(feature = "metrics", feature = "tracing"))]
fn resource() -> Resource {
    Resource::builder()
        .with_service_name(SERVICE_NAME)
        .with_schema_url(
            [KeyValue::new(
                semvcns::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            )],
            semvcns::SCHEMA_URL,
        )
        .build()
}

#[cfg(feature = "metrics")]
fn init_metrics() -> sdkmetrics::SdkMeterProvider {
    let builder = sdkmetrics::SdkMeterProvider::builder().with_resource(resource());
    #[cfg(feature = "stdout")]
    let builder = builder.with_periodic_exporter(opentelemetry_stdout::MetricExporter::default());
    builder.build()
}

#[cfg(feature = "tracing")]
fn init_tracer() -> sdktrace::SdkTracerProvider {
    let builder = sdktrace::SdkTracerProvider::builder().with_resource(resource());
    #[cfg(feature = "stdout")]
    let builder = builder.with_batch_exporter(opentelemetry_stdout::SpanExporter::default());
    builder.build()
}

/// Instruments behind the `metrics` feature. Without it every recorder is
/// an empty function.
#[cfg(feature = "metrics")]
mod instruments {
    use opentelemetry::metrics::{Counter, Histogram, Meter, UpDownCounter};
    use std::sync::OnceLock;

    struct Instruments {
        requests: Counter<u64>,
        requests_inflight: UpDownCounter<i64>,
        errors: Counter<u64>,
        upstream_calls: Counter<u64>,
        numbers_fetched: Counter<u64>,
        request_duration: Histogram<f64>,
    }

    static INSTRUMENTS: OnceLock<Instruments> = OnceLock::new();

    pub(super) fn install(meter: &Meter) {
        let _ = INSTRUMENTS.set(Instruments {
            requests: meter
                .u64_counter("requests")
                .with_description("Total /random/mean requests")
                .build(),
            requests_inflight: meter
                .i64_up_down_counter("requests_inflight")
                .with_description("Requests currently fanning out to the upstream")
                .build(),
            errors: meter
                .u64_counter("errors")
                .with_description("Requests answered with an error")
                .build(),
            upstream_calls: meter
                .u64_counter("upstream_calls")
                .with_description("Calls issued to random.org")
                .build(),
            numbers_fetched: meter
                .u64_counter("numbers_fetched")
                .with_description("Integers received from random.org")
                .build(),
            request_duration: meter
                .f64_histogram("request_duration")
                .with_unit("ms")
                .with_description("End-to-end duration of successful requests")
                .build(),
        });
    }

    fn with(record: impl FnOnce(&Instruments)) {
        if let Some(instruments) = INSTRUMENTS.get() {
            record(instruments);
        }
    }

    pub fn increment_requests() {
        with(|i| i.requests.add(1, &[]));
    }

    pub fn increment_requests_inflight() {
        with(|i| i.requests_inflight.add(1, &[]));
    }

    pub fn decrement_requests_inflight() {
        with(|i| i.requests_inflight.add(-1, &[]));
    }

    pub fn increment_errors() {
        with(|i| i.errors.add(1, &[]));
    }

    pub fn increment_upstream_calls(count: u64) {
        with(|i| i.upstream_calls.add(count, &[]));
    }

    pub fn increment_numbers_fetched(count: u64) {
        with(|i| i.numbers_fetched.add(count, &[]));
    }

    pub fn record_request_duration(duration_ms: f64) {
        with(|i| i.request_duration.record(duration_ms, &[]));
    }
}

#[cfg(not(feature = "metrics"))]
mod instruments {
    pub fn increment_requests() {}
    pub fn increment_requests_inflight() {}
    pub fn decrement_requests_inflight() {}
    pub fn increment_errors() {}
    pub fn increment_upstream_calls(_count: u64) {}
    pub fn increment_numbers_fetched(_count: u64) {}
    pub fn record_request_duration(_duration_ms: f64) {}
}

pub use instruments::{
    decrement_requests_inflight, increment_errors, increment_numbers_fetched,
    increment_requests, increment_requests_inflight, increment_upstream_calls,
    record_request_duration,
};
