// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2026 The san authors

//! Crate-wide error taxonomy.
//!
//! Every fallible operation surfaces one of these kinds so callers can react
//! to the cause instead of matching on message text.

use std::io;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure kinds surfaced by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The caller requested cancellation; work was drained or torn down.
    #[error("execution was canceled")]
    Canceled,

    /// Stored credentials are unusable and cannot be refreshed.
    #[error("authorization expired, run the authorization flow again")]
    CredentialsExpired,

    /// A credential payload was structurally unusable.
    #[error("malformed credentials: {0}")]
    MalformedCredentials(String),

    /// The random probe budget ran out without finding a free port.
    #[error("no free port found on the loopback interface")]
    NoFreePort,

    /// The authorization worker exited without producing credentials.
    /// `-1` when the worker was killed by a signal.
    #[error("authorization worker exited with code {exit_code}")]
    WorkerFailed { exit_code: i32 },

    /// The browser flow failed, for example denied consent or a rejected
    /// code exchange.
    #[error("authorization flow failed: {0}")]
    AuthFlow(String),

    /// The license server could not be reached at all.
    #[error("license server unreachable: {0}")]
    LicenseServerUnreachable(String),

    /// The license server answered with something other than a verdict.
    #[error("license server error: {0}")]
    LicenseServerError(String),

    /// The license server rejected the key.
    #[error("license key was not accepted")]
    InvalidLicenseKey,

    /// A persisted auth port carries a version this build does not know.
    #[error("unknown auth port version {0}")]
    UnknownPortVersion(u32),

    /// A single API call failed (transport or non-success status).
    #[error("api request failed: {0}")]
    Http(String),

    /// A paginated fetch failed partway; accumulated rows were discarded.
    #[error("query fetch failed: {0}")]
    FetchFailed(String),

    /// One batch item failed under the abort policy.
    #[error("item {index} failed: {message}")]
    ItemFailed { index: usize, message: String },

    /// Caller-supplied input failed validation.
    #[error("{0}")]
    InvalidInput(String),

    /// Filesystem-level failure.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// A state this crate considers impossible. Indicates a bug.
    #[error("internal error: {0}")]
    Internal(String),
}
