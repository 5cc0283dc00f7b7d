//! Upstream random-number provider.
//!
//! - [`RandomSource`] - the seam the fan-out orchestrator fetches through.
//! - [`client`] - the random.org JSON-RPC implementation
//!   ([`client::RandomOrgClient`]).

pub mod client;

use core::future::Future;
use randmean_core::{Result, types::RandomSet};
use tokio_util::sync::CancellationToken;

/// A provider of random integer sets.
///
/// Implementations perform exactly one fetch per call and must return
/// promptly with [`randmean_core::Error::RequestCancelled`] once `cancel`
/// fires.
pub trait RandomSource: Send + Sync + 'static {
    fn generate_integers(
        &self,
        length: usize,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<RandomSet>> + Send;
}
