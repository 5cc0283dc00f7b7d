use crate::server::upstream::RandomSource;
use randmean_core::{
    Error, Result,
    types::{RandomSet, SetCollection},
};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Fetches `request_count` random sets of `length` integers concurrently.
///
/// One task is spawned per set, each owning a distinct slot index. All tasks
/// share a child of `parent`, so cancelling `parent` (service shutdown)
/// cancels the whole batch, and a failing task cancels its siblings.
///
/// # Behavior
///
/// - Slot `i` receives the result of request `i` regardless of completion
///   order.
/// - The first failure is returned as soon as it is observed; the partially
///   filled collection is discarded.
/// - Cancellation errors caused by a sibling's failure are skipped so that the
///   root cause is what gets reported.
/// - Outstanding tasks are aborted when the internal [`JoinSet`] is dropped,
///   so no task outlives the call.
///
/// # Errors
///
/// Returns the first upstream error, [`Error::RequestCancelled`] if `parent`
/// was cancelled, or [`Error::TaskFailed`] if a task panicked.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(request_count = request_count, length = length)))]
pub async fn fetch_sets<S: RandomSource>(
    source: Arc<S>,
    request_count: usize,
    length: usize,
    parent: &CancellationToken,
) -> Result<SetCollection> {
    let scope = parent.child_token();
    // Cancel whatever is still in flight on every exit path.
    let _scope_guard = scope.clone().drop_guard();

    let mut tasks = JoinSet::new();
    for index in 0..request_count {
        let source = Arc::clone(&source);
        let scope = scope.clone();
        tasks.spawn(async move {
            let result = source.generate_integers(length, &scope).await;
            if result.is_err() {
                scope.cancel();
            }
            (index, result)
        });
    }

    let mut slots: Vec<Option<RandomSet>> = vec![None; request_count];

    while let Some(joined) = tasks.join_next().await {
        let (index, result) = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                scope.cancel();
                #[cfg(feature = "tracing")]
                tracing::error!("Fan-out task failed: {e}");
                return Err(Error::TaskFailed {
                    context: e.to_string(),
                });
            }
        };

        match result {
            Ok(set) => slots[index] = Some(set),
            // A sibling failed and cancelled the scope; its own error is
            // still on the way.
            Err(Error::RequestCancelled) if !parent.is_cancelled() => {}
            Err(e) => {
                scope.cancel();
                #[cfg(feature = "tracing")]
                tracing::warn!(index, "Fan-out aborted: {e}");
                return Err(e);
            }
        }
    }

    let sets = slots
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or(Error::RequestCancelled)?;

    #[cfg(feature = "tracing")]
    tracing::debug!("Fan-out completed");

    Ok(SetCollection::new(sets))
}
