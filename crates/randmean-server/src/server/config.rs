use anyhow::{Context, bail};
use clap::Parser;
use core::{fmt, time::Duration};
use reqwest::Url;

/// Default JSON-RPC endpoint of the random.org API.
pub const DEFAULT_UPSTREAM_URL: &str = "https://api.random.org/json-rpc/2/invoke";

/// Runtime configuration for the `randmean-server` binary.
///
/// All values are parsed from CLI arguments or environment variables. Only
/// the API key has no default.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "randmean-server",
    version,
    about = "An HTTP service computing statistics over random.org integer sets"
)]
pub struct CliArgs {
    /// random.org API key sent with every upstream call.
    ///
    /// Environment variable: `RANDOM_ORG_API_KEY`
    #[arg(long, env = "RANDOM_ORG_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// JSON-RPC endpoint of the upstream provider.
    ///
    /// Environment variable: `RANDOM_ORG_URL`
    #[arg(long, env = "RANDOM_ORG_URL", default_value_t = String::from(DEFAULT_UPSTREAM_URL))]
    pub upstream_url: String,

    /// Per-call timeout for upstream requests, in seconds.
    ///
    /// Applies to each of the concurrent calls individually. There is no
    /// overall deadline for an inbound request beyond this.
    ///
    /// Environment variable: `UPSTREAM_TIMEOUT_SECS`
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value_t = 30)]
    pub upstream_timeout_secs: u64,

    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:80"))]
    pub server_addr: String,

    /// Seconds to wait for in-flight requests to finish during shutdown
    /// before their upstream calls are cancelled.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 3)]
    pub shutdown_timeout: u64,
}

/// Everything the upstream client needs, injected at construction.
#[derive(Clone)]
pub struct UpstreamConfig {
    pub api_key: String,
    pub url: Url,
    pub timeout: Duration,
}

impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("api_key", &"<redacted>")
            .field("url", &self.url.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub upstream: UpstreamConfig,
    pub server_addr: String,
    pub shutdown_timeout: Duration,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let api_key = args.api_key.trim().to_string();
        if api_key.is_empty() {
            bail!("RANDOM_ORG_API_KEY must not be empty");
        }

        if args.upstream_timeout_secs == 0 {
            bail!("UPSTREAM_TIMEOUT_SECS must be greater than 0");
        }

        let url = Url::parse(&args.upstream_url)
            .with_context(|| format!("RANDOM_ORG_URL ({}) is not a valid URL", args.upstream_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!(
                "RANDOM_ORG_URL must use http or https (got `{}`)",
                url.scheme()
            );
        }

        Ok(Self {
            upstream: UpstreamConfig {
                api_key,
                url,
                timeout: Duration::from_secs(args.upstream_timeout_secs),
            },
            server_addr: args.server_addr,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
        })
    }
}
