// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2026 The san authors

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::*;
use crate::progress::NullSink;
use crate::test_support::CollectingSink;

#[test]
fn tier_concurrency_is_fixed() {
    assert_eq!(concurrency_for(false), FREE_TIER_CONCURRENCY);
    assert_eq!(concurrency_for(true), PRO_TIER_CONCURRENCY);
}

#[tokio::test]
async fn empty_batch_completes_immediately() -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let results: Vec<crate::Result<u32>> =
        dispatch(Vec::<u32>::new(), DispatchOptions::new(4), &cancel, &NullSink, |_, n| async move {
            Ok(n)
        })
        .await?;
    assert!(results.is_empty());
    Ok(())
}

#[tokio::test]
async fn results_come_back_in_input_order() -> anyhow::Result<()> {
    // Delays force completion in the order 1, 2, 0.
    let delays: Vec<u64> = vec![60, 5, 30];
    let cancel = CancellationToken::new();
    let progress = CollectingSink::new();

    let results = dispatch(
        delays,
        DispatchOptions::new(3),
        &cancel,
        &progress,
        |index, delay| async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(format!("item-{index}"))
        },
    )
    .await?;

    let values: Vec<String> = results.into_iter().collect::<crate::Result<_>>()?;
    assert_eq!(values, ["item-0", "item-1", "item-2"]);

    let updates = progress.updates();
    assert_eq!(updates.len(), 3);
    assert_eq!(updates.last().map(|(f, m)| (*f, m.clone())), Some((Some(1.0), "3 of 3 processed".to_string())));
    Ok(())
}

#[tokio::test]
async fn concurrency_one_never_overlaps() -> anyhow::Result<()> {
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let cancel = CancellationToken::new();

    let c = Arc::clone(&current);
    let p = Arc::clone(&peak);
    dispatch(vec![(); 5], DispatchOptions::new(1), &cancel, &NullSink, move |index, ()| {
        let current = Arc::clone(&c);
        let peak = Arc::clone(&p);
        async move {
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            current.fetch_sub(1, Ordering::SeqCst);
            Ok(index)
        }
    })
    .await?;

    assert_eq!(peak.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn wider_limit_actually_overlaps() -> anyhow::Result<()> {
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let cancel = CancellationToken::new();

    let c = Arc::clone(&current);
    let p = Arc::clone(&peak);
    dispatch(vec![(); 4], DispatchOptions::new(4), &cancel, &NullSink, move |index, ()| {
        let current = Arc::clone(&c);
        let peak = Arc::clone(&p);
        async move {
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            current.fetch_sub(1, Ordering::SeqCst);
            Ok(index)
        }
    })
    .await?;

    assert!(peak.load(Ordering::SeqCst) > 1, "permits were never used in parallel");
    Ok(())
}

#[tokio::test]
async fn abort_mode_fails_fast_and_skips_queued_items() {
    let started = Arc::new(AtomicUsize::new(0));
    let cancel = CancellationToken::new();

    let s = Arc::clone(&started);
    let result = dispatch(
        vec![(); 6],
        DispatchOptions::new(1),
        &cancel,
        &NullSink,
        move |index, ()| {
            let started = Arc::clone(&s);
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                if index == 2 {
                    return Err(Error::Http("boom".to_string()));
                }
                Ok(index)
            }
        },
    )
    .await;

    match result {
        Err(Error::ItemFailed { index, message }) => {
            assert_eq!(index, 2);
            assert!(message.contains("boom"), "got {message:?}");
        }
        other => panic!("expected ItemFailed, got {other:?}"),
    }
    assert!(started.load(Ordering::SeqCst) < 6, "queued items must not start after a failure");
}

#[tokio::test]
async fn salvage_mode_records_failures_in_place() -> anyhow::Result<()> {
    let started = Arc::new(AtomicUsize::new(0));
    let cancel = CancellationToken::new();

    let s = Arc::clone(&started);
    let results = dispatch(
        vec![(); 6],
        DispatchOptions::new(2).failure_mode(FailureMode::Salvage),
        &cancel,
        &NullSink,
        move |index, ()| {
            let started = Arc::clone(&s);
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                if index == 2 || index == 4 {
                    return Err(Error::Http(format!("item {index} broke")));
                }
                Ok(index)
            }
        },
    )
    .await?;

    assert_eq!(results.len(), 6);
    assert_eq!(started.load(Ordering::SeqCst), 6, "salvage mode runs everything");
    for (index, result) in results.iter().enumerate() {
        if index == 2 || index == 4 {
            assert!(result.is_err(), "slot {index} should hold the failure");
        } else {
            assert_eq!(*result.as_ref().expect("ok slot"), index);
        }
    }
    Ok(())
}

#[tokio::test]
async fn cancel_mid_batch_stops_queued_items() {
    let started = Arc::new(AtomicUsize::new(0));
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(120)).await;
        canceller.cancel();
    });

    let s = Arc::clone(&started);
    let result = dispatch(
        vec![(); 10],
        DispatchOptions::new(1),
        &cancel,
        &NullSink,
        move |index, ()| {
            let started = Arc::clone(&s);
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(index)
            }
        },
    )
    .await;

    assert!(matches!(result, Err(Error::Canceled)), "got {result:?}");
    let started = started.load(Ordering::SeqCst);
    assert!(started < 10, "cancellation must keep queued items from starting, started={started}");
}
