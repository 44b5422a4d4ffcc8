// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2026 The san authors

//! Progress reporting seam shared by the fetcher, dispatcher, and broker.

/// Receives progress updates and user-facing notices from long operations.
pub trait ProgressSink: Send + Sync {
    /// Report forward progress. `fraction` is `None` when the total amount
    /// of work is unknown (unlimited fetches).
    fn update(&self, fraction: Option<f64>, message: &str);

    /// Surface a notice the user should see even on success.
    fn warn(&self, message: &str);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn update(&self, _fraction: Option<f64>, _message: &str) {}
    fn warn(&self, _message: &str) {}
}

/// Forwards progress to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn update(&self, fraction: Option<f64>, message: &str) {
        match fraction {
            Some(f) => {
                let percent = (f.clamp(0.0, 1.0) * 100.0).round();
                tracing::info!(percent, "{message}");
            }
            None => tracing::info!("{message}"),
        }
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }
}
