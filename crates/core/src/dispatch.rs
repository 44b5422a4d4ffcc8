// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2026 The san authors

//! Bounded-concurrency batch dispatch.
//!
//! Runs one worker future per item under a semaphore, preserves input order
//! in the results, and reacts to cancellation between completions. Closing
//! the semaphore aborts items that have not started yet; in-flight items
//! always run to completion so their side effects are accounted for.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::progress::ProgressSink;

pub const FREE_TIER_CONCURRENCY: usize = 1;
pub const PRO_TIER_CONCURRENCY: usize = 10;

pub fn concurrency_for(is_pro: bool) -> usize {
    if is_pro {
        PRO_TIER_CONCURRENCY
    } else {
        FREE_TIER_CONCURRENCY
    }
}

/// What a failing item does to the rest of the batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailureMode {
    /// First failure stops new work and fails the whole batch.
    #[default]
    Abort,
    /// Failures are recorded per item and the batch keeps going.
    Salvage,
}

#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
    pub concurrency: usize,
    pub failure_mode: FailureMode,
}

impl DispatchOptions {
    pub fn new(concurrency: usize) -> Self {
        Self { concurrency, failure_mode: FailureMode::default() }
    }

    #[must_use]
    pub fn failure_mode(mut self, mode: FailureMode) -> Self {
        self.failure_mode = mode;
        self
    }
}

/// Run `worker` over `items` with bounded concurrency.
///
/// Results come back in input order regardless of completion order. Under
/// [`FailureMode::Abort`] the first item error closes the semaphore and the
/// batch fails with [`Error::ItemFailed`]; under [`FailureMode::Salvage`]
/// errors land in their item's result slot. Cancellation is checked after
/// every completion and fails the batch with [`Error::Canceled`].
pub async fn dispatch<T, R, F, Fut>(
    items: Vec<T>,
    options: DispatchOptions,
    cancel: &CancellationToken,
    progress: &dyn ProgressSink,
    worker: F,
) -> Result<Vec<Result<R>>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(usize, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    let total = items.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let worker = Arc::new(worker);
    let mut tasks: JoinSet<(usize, Option<Result<R>>)> = JoinSet::new();
    for (index, item) in items.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let worker = Arc::clone(&worker);
        tasks.spawn(async move {
            // A closed semaphore means the batch is winding down.
            let Ok(_permit) = semaphore.acquire().await else {
                return (index, None);
            };
            (index, Some(worker(index, item).await))
        });
    }

    let mut slots: Vec<Option<Result<R>>> = Vec::with_capacity(total);
    slots.resize_with(total, || None);
    let mut completed = 0usize;
    let mut batch_error: Option<Error> = None;

    while let Some(joined) = tasks.join_next().await {
        let (index, outcome) = match joined {
            Ok(pair) => pair,
            Err(e) => {
                if batch_error.is_none() {
                    semaphore.close();
                    batch_error = Some(Error::Internal(format!("worker task failed: {e}")));
                }
                continue;
            }
        };
        let Some(result) = outcome else {
            // Never started.
            continue;
        };
        completed += 1;
        match result {
            Ok(value) => slots[index] = Some(Ok(value)),
            Err(e) => match options.failure_mode {
                FailureMode::Abort => {
                    if batch_error.is_none() {
                        semaphore.close();
                        batch_error = Some(Error::ItemFailed { index, message: e.to_string() });
                    }
                }
                FailureMode::Salvage => slots[index] = Some(Err(e)),
            },
        }
        if batch_error.is_none() {
            let fraction = completed as f64 / total as f64;
            progress.update(Some(fraction), &format!("{completed} of {total} processed"));
            if cancel.is_cancelled() {
                semaphore.close();
                batch_error = Some(Error::Canceled);
            }
        }
    }

    if let Some(e) = batch_error {
        return Err(e);
    }
    let mut results = Vec::with_capacity(total);
    for (index, slot) in slots.into_iter().enumerate() {
        match slot {
            Some(result) => results.push(result),
            None => return Err(Error::Internal(format!("item {index} never completed"))),
        }
    }
    Ok(results)
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
