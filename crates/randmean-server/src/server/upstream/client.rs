//! random.org JSON-RPC client.
//!
//! [`RandomOrgClient`] issues one `generateIntegers` call per fetch and maps
//! every outcome (transport failure, timeout, HTTP status, provider error,
//! undecodable body) onto [`randmean_core::Error`]. It never retries.

use super::RandomSource;
use crate::server::config::UpstreamConfig;
use core::{
    future::Future,
    sync::atomic::{AtomicU64, Ordering},
};
use randmean_core::{
    Error, Result,
    rpc::{GenerateIntegersRequest, GenerateIntegersResponse},
    types::RandomSet,
};
use reqwest::{Client, ClientBuilder, StatusCode};
use tokio_util::sync::CancellationToken;

/// Client for random.org's `generateIntegers` method.
///
/// The API key, endpoint and timeout are injected through [`UpstreamConfig`];
/// nothing is read from the environment at call time. The underlying
/// [`Client`] pools connections, so a single instance is shared by every
/// concurrent fetch.
pub struct RandomOrgClient {
    http: Client,
    config: UpstreamConfig,
    next_id: AtomicU64,
}

impl RandomOrgClient {
    /// Builds a client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the TLS backend cannot be initialized.
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        let http = http_builder(&config).build().map_err(classify)?;
        Ok(Self::with_client(config, http))
    }

    /// Uses a preconfigured [`Client`]. The caller is responsible for setting
    /// the timeout.
    pub const fn with_client(config: UpstreamConfig, http: Client) -> Self {
        Self {
            http,
            config,
            next_id: AtomicU64::new(1),
        }
    }

    /// Sends one request and decodes the reply.
    async fn call(&self, length: usize) -> Result<RandomSet> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = GenerateIntegersRequest::new(self.config.api_key.as_str(), length, id);

        #[cfg(feature = "tracing")]
        tracing::debug!(id, length, "Sending generateIntegers request");

        let response = self
            .http
            .post(self.config.url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::UpstreamStatus {
                status: status.as_u16(),
            });
        }

        let body: GenerateIntegersResponse = response.json().await.map_err(classify)?;
        match (body.error, body.result) {
            (Some(error), _) => Err(Error::Provider {
                message: error.message,
            }),
            (None, Some(result)) => Ok(result.random.data),
            (None, None) => Err(Error::MalformedResponse {
                context: "response carries neither `result` nor `error`".to_string(),
            }),
        }
    }
}

impl RandomSource for RandomOrgClient {
    fn generate_integers(
        &self,
        length: usize,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<RandomSet>> + Send {
        async move {
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => Err(Error::RequestCancelled),
                result = self.call(length) => result,
            };

            #[cfg(feature = "tracing")]
            match &result {
                Ok(data) => tracing::debug!(received = data.len(), "Upstream call succeeded"),
                Err(Error::RequestCancelled) => tracing::debug!("Upstream call cancelled"),
                Err(Error::Transport { context }) => {
                    tracing::warn!("Upstream transport failure: {context}");
                }
                Err(e) => tracing::warn!("Upstream call failed: {e}"),
            }

            result
        }
    }
}

pub(crate) fn http_builder(config: &UpstreamConfig) -> ClientBuilder {
    Client::builder()
        .timeout(config.timeout)
        .user_agent(concat!("randmean/", env!("CARGO_PKG_VERSION")))
}

fn classify(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout
    } else if err.is_decode() {
        Error::MalformedResponse {
            context: err.to_string(),
        }
    } else {
        Error::Transport {
            context: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::State,
        http::StatusCode as HttpStatus,
        routing::post,
    };
    use core::time::Duration;
    use reqwest::Url;
    use std::sync::{Arc, Mutex};
    use std::time::Instant;
    use tokio::net::TcpListener;

    const API_KEY: &str = "6b1e65b9-4186-45c2-8981-b77a9842c4f0";

    type Seen = Arc<Mutex<Vec<GenerateIntegersRequest>>>;

    async fn spawn_upstream(router: Router) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Url::parse(&format!("http://{addr}/json-rpc/2/invoke")).unwrap()
    }

    fn client(url: Url, timeout: Duration) -> RandomOrgClient {
        let config = UpstreamConfig {
            api_key: API_KEY.to_string(),
            url,
            timeout,
        };
        let http = http_builder(&config).no_proxy().build().unwrap();
        RandomOrgClient::with_client(config, http)
    }

    async fn echo_upstream(seen: Seen) -> Url {
        async fn handler(
            State(seen): State<Seen>,
            Json(req): Json<GenerateIntegersRequest>,
        ) -> Json<GenerateIntegersResponse> {
            let data = (1..=req.params.n as i64).collect();
            let id = req.id;
            seen.lock().unwrap().push(req);
            Json(GenerateIntegersResponse::success(data, id))
        }

        spawn_upstream(
            Router::new()
                .route("/json-rpc/2/invoke", post(handler))
                .with_state(seen),
        )
        .await
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn returns_provider_data_and_sends_documented_payload() -> Result<()> {
        let seen = Seen::default();
        let url = echo_upstream(seen.clone()).await;
        let client = client(url, Duration::from_secs(5));

        let data = client
            .generate_integers(5, &CancellationToken::new())
            .await?;
        assert_eq!(data, vec![1, 2, 3, 4, 5]);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let req = &seen[0];
        assert_eq!(req.jsonrpc, "2.0");
        assert_eq!(req.method, "generateIntegers");
        assert_eq!(req.params.api_key, API_KEY);
        assert_eq!(req.params.n, 5);
        assert_eq!(req.params.min, 1);
        assert_eq!(req.params.max, 1000);
        assert!(req.params.replacement);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn request_ids_are_distinct() -> Result<()> {
        let seen = Seen::default();
        let url = echo_upstream(seen.clone()).await;
        let client = client(url, Duration::from_secs(5));
        let cancel = CancellationToken::new();

        for _ in 0..3 {
            client.generate_integers(1, &cancel).await?;
        }

        let ids: Vec<u64> = seen.lock().unwrap().iter().map(|req| req.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn provider_error_is_surfaced_with_message() {
        let url = spawn_upstream(Router::new().route(
            "/json-rpc/2/invoke",
            post(|| async {
                Json(GenerateIntegersResponse::failure(
                    401,
                    "Parameter 'apiKey' is malformed",
                    1,
                ))
            }),
        ))
        .await;

        let err = client(url, Duration::from_secs(5))
            .generate_integers(5, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            Error::Provider {
                message: "Parameter 'apiKey' is malformed".to_string()
            }
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn non_success_status_is_an_error() {
        let url = spawn_upstream(Router::new().route(
            "/json-rpc/2/invoke",
            post(|| async { HttpStatus::SERVICE_UNAVAILABLE }),
        ))
        .await;

        let err = client(url, Duration::from_secs(5))
            .generate_integers(5, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, Error::UpstreamStatus { status: 503 });
        assert_eq!(
            err.to_string(),
            "Unsuccessful status code returned from random.org API"
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn undecodable_body_is_malformed() {
        let url = spawn_upstream(Router::new().route(
            "/json-rpc/2/invoke",
            post(|| async { "definitely not json" }),
        ))
        .await;

        let err = client(url, Duration::from_secs(5))
            .generate_integers(5, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(
            matches!(err, Error::MalformedResponse { .. }),
            "unexpected {err:?}"
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn empty_envelope_is_malformed() {
        let url = spawn_upstream(Router::new().route(
            "/json-rpc/2/invoke",
            post(|| async { Json(serde_json::json!({ "jsonrpc": "2.0", "id": 1 })) }),
        ))
        .await;

        let err = client(url, Duration::from_secs(5))
            .generate_integers(5, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(
            matches!(err, Error::MalformedResponse { .. }),
            "unexpected {err:?}"
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn slow_upstream_times_out() {
        let url = spawn_upstream(Router::new().route(
            "/json-rpc/2/invoke",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                HttpStatus::OK
            }),
        ))
        .await;

        let err = client(url, Duration::from_millis(200))
            .generate_integers(5, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, Error::Timeout);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn cancellation_aborts_in_flight_call() {
        let url = spawn_upstream(Router::new().route(
            "/json-rpc/2/invoke",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                HttpStatus::OK
            }),
        ))
        .await;
        let client = client(url, Duration::from_secs(30));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let err = client.generate_integers(5, &cancel).await.unwrap_err();
        assert_eq!(err, Error::RequestCancelled);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn unreachable_upstream_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let url = Url::parse(&format!("http://{addr}/json-rpc/2/invoke")).unwrap();

        let err = client(url, Duration::from_secs(5))
            .generate_integers(5, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport { .. }), "unexpected {err:?}");
        assert_eq!(err.to_string(), "Failed to reach random.org API");
    }
}
