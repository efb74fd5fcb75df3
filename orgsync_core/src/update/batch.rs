use super::retry::RetryPolicy;
use crate::catalog::ItemResult;
use crate::error::CatalogError;
use log::{debug, warn};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Submit one batch, resubmitting items that failed transiently.
///
/// A whole-batch failure counts as a failure of every pending item. Items
/// whose retry budget runs out, or that are still pending when `cancel`
/// fires, report the last error they saw. Results keep input order.
pub async fn submit_with_retry<P, T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    operation: &str,
    items: Vec<P>,
    mut submit: F,
) -> Vec<ItemResult<T>>
where
    P: Clone,
    F: FnMut(Vec<P>) -> Fut,
    Fut: Future<Output = Result<Vec<ItemResult<T>>, CatalogError>>,
{
    let mut results: Vec<Option<ItemResult<T>>> = (0..items.len()).map(|_| None).collect();
    let mut pending: Vec<usize> = (0..items.len()).collect();
    let mut attempts = 0u32;

    while !pending.is_empty() {
        attempts += 1;
        let batch: Vec<P> = pending.iter().map(|&idx| items[idx].clone()).collect();
        let may_retry = policy.allows_retry(attempts);
        let mut retry = Vec::new();

        match submit(batch).await {
            Ok(item_results) if item_results.len() == pending.len() => {
                for (&idx, result) in pending.iter().zip(item_results) {
                    if let Err(err) = &result
                        && may_retry
                        && policy.is_retryable(err)
                    {
                        retry.push(idx);
                    }
                    results[idx] = Some(result);
                }
            }
            Ok(item_results) => {
                let err = CatalogError::other(format!(
                    "{operation} returned {} results for {} items",
                    item_results.len(),
                    pending.len()
                ));
                for &idx in &pending {
                    results[idx] = Some(Err(err.clone()));
                }
            }
            Err(err) => {
                if may_retry && policy.is_retryable(&err) {
                    retry = pending.clone();
                }
                for &idx in &pending {
                    results[idx] = Some(Err(err.clone()));
                }
            }
        }

        if retry.is_empty() {
            break;
        }
        if cancel.is_cancelled() {
            warn!(
                "{operation}: cancelled with {} items awaiting retry",
                retry.len()
            );
            break;
        }

        let delay = policy.delay_for(attempts - 1);
        debug!(
            "{operation}: retrying {} items in {:?} (attempt {}/{})",
            retry.len(),
            delay,
            attempts + 1,
            policy.max_attempts
        );
        tokio::select! {
            _ = cancel.cancelled() => {
                warn!("{operation}: cancelled during backoff, {} items not retried", retry.len());
                break;
            }
            _ = tokio::time::sleep(delay) => {}
        }
        pending = retry;
    }

    results
        .into_iter()
        .map(|result| {
            result.unwrap_or_else(|| Err(CatalogError::other(format!("{operation}: not submitted"))))
        })
        .collect()
}
