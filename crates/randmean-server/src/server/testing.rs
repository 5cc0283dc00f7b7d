//! In-process [`RandomSource`] used by the orchestrator and handler tests.

use crate::server::upstream::RandomSource;
use core::{
    future::Future,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};
use randmean_core::{Error, Result, types::RandomSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What a single call does, decided from its call number and length.
pub enum Step {
    Ready(Result<RandomSet>),
    After(Duration, Result<RandomSet>),
    /// Never completes unless cancelled.
    Hang,
    Panic,
}

type Script = dyn Fn(usize, usize) -> Step + Send + Sync;

pub struct FakeSource {
    script: Box<Script>,
    calls: AtomicUsize,
    live: Arc<AtomicUsize>,
}

impl FakeSource {
    pub fn new(script: impl Fn(usize, usize) -> Step + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Call `k` with length `n` yields `k*n + 1 ..= k*n + n`.
    pub fn counting() -> Self {
        Self::new(|call, length| {
            let start = (call * length) as i64;
            Step::Ready(Ok((1..=length as i64).map(|i| start + i).collect()))
        })
    }

    pub fn failing(error: Error) -> Self {
        Self::new(move |_, _| Step::Ready(Err(error.clone())))
    }

    /// Number of calls started so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of calls whose futures have not been dropped yet.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RandomSource for FakeSource {
    fn generate_integers(
        &self,
        length: usize,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<RandomSet>> + Send {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let step = (self.script)(call, length);
        self.live.fetch_add(1, Ordering::SeqCst);
        let guard = LiveGuard(Arc::clone(&self.live));
        let cancel = cancel.clone();

        async move {
            let _guard = guard;
            let (delay, outcome) = match step {
                Step::Ready(outcome) => return outcome,
                Step::After(delay, outcome) => (delay, outcome),
                Step::Hang => (Duration::from_secs(3600), Ok(RandomSet::new())),
                Step::Panic => panic!("scripted panic in call {call}"),
            };

            tokio::select! {
                biased;
                () = cancel.cancelled() => Err(Error::RequestCancelled),
                () = tokio::time::sleep(delay) => outcome,
            }
        }
    }
}
