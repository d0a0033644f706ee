//! Fan-out functions - issue many independent upstream fetches and collect
//! whatever succeeded, with bounded concurrency and optional cancellation

use futures::future::{join_all, AbortHandle, Abortable};
use std::fmt::{Debug, Display};
use std::future::Future;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

/// How many fetches of one aggregation may be in flight at once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concurrency {
    /// Fixed-size batches; batch i+1 starts after every call of batch i settled
    Batched(usize),
    /// Everything at once (small axis counts only)
    Unbounded,
}

/// Run `fetch` once per axis and return `(axis, outcome)` pairs in axis order.
///
/// A failed axis is logged and reported as `None`; it never aborts its batch
/// or the aggregation.
pub async fn fan_out<A, T, E, F, Fut>(
    axes: Vec<A>,
    concurrency: Concurrency,
    fetch: F,
) -> Vec<(A, Option<T>)>
where
    A: Clone + Debug,
    E: Display,
    F: Fn(A) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let batch_size = match concurrency {
        Concurrency::Batched(size) => size.max(1),
        Concurrency::Unbounded => axes.len().max(1),
    };

    let mut results = Vec::with_capacity(axes.len());
    let mut failures = 0;

    for (batch_idx, batch) in axes.chunks(batch_size).enumerate() {
        debug!("Fan-out batch {} ({} calls)", batch_idx, batch.len());

        let settled = join_all(batch.iter().cloned().map(|axis| {
            let call = fetch(axis.clone());
            async move { (axis, call.await) }
        }))
        .await;

        for (axis, outcome) in settled {
            match outcome {
                Ok(value) => results.push((axis, Some(value))),
                Err(e) => {
                    failures += 1;
                    warn!("Fan-out axis {:?} failed, counting it as empty: {}", axis, e);
                    results.push((axis, None));
                }
            }
        }
    }

    debug!(
        "Fan-out complete: {} axes, {} failed",
        results.len(),
        failures
    );

    results
}

/// Returned by [`LatestOnly::run`] when a newer run replaced this one
#[derive(Debug, Error, PartialEq, Eq)]
#[error("aggregation superseded by a newer request")]
pub struct Superseded;

/// Keeps at most one aggregation alive: starting a run aborts the previous
/// one, whose pending upstream calls are dropped and whose result is discarded.
///
/// HTTP handlers do not use this guard; a disconnecting client drops the
/// handler future, which cancels its pending calls the same way.
#[derive(Debug, Default)]
pub struct LatestOnly {
    current: Mutex<Option<AbortHandle>>,
}

impl LatestOnly {
    pub async fn run<F>(&self, work: F) -> Result<F::Output, Superseded>
    where
        F: Future,
    {
        let (handle, registration) = AbortHandle::new_pair();

        let previous = {
            let mut current = self.current.lock().unwrap_or_else(|p| p.into_inner());
            current.replace(handle)
        };
        if let Some(previous) = previous {
            debug!("Aborting superseded aggregation");
            previous.abort();
        }

        Abortable::new(work, registration)
            .await
            .map_err(|_| Superseded)
    }

    /// Abort whatever is running without starting anything new
    pub fn cancel(&self) {
        let mut current = self.current.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(handle) = current.take() {
            handle.abort();
        }
    }
}
