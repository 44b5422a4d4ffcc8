// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2026 The san authors

//! Parent-side authorization broker.
//!
//! Runs the browser flow in a separate worker process so the callback
//! listener and browser wrangling stay out of the parent. The worker takes
//! its config on stdin and prints one credential bundle on stdout; stderr
//! passes through. The broker polls the child alongside the cancel token
//! and tears down the whole worker process tree on cancellation.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::credential::flow::FlowConfig;
use crate::credential::{CredentialBundle, OauthConfig};
use crate::error::{Error, Result};
use crate::process::terminate_tree;
use crate::progress::ProgressSink;

/// How often the broker checks the cancel token and the child's status.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Hidden subcommand the worker is launched with.
pub const WORKER_SUBCOMMAND: &str = "auth-worker";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthPhase {
    Idle,
    WorkerStarting,
    WorkerRunning,
    Succeeded,
    Failed,
    Canceled,
}

fn transition(phase: &mut AuthPhase, next: AuthPhase) {
    tracing::debug!(from = ?phase, to = ?next, "auth phase");
    *phase = next;
}

/// Spawns and supervises one authorization worker at a time.
pub struct AuthBroker {
    config: FlowConfig,
    worker_command: Vec<String>,
    poll_interval: Duration,
}

impl AuthBroker {
    /// Broker that re-invokes the current executable as its worker.
    pub fn new(oauth: OauthConfig) -> Result<Self> {
        let exe = std::env::current_exe()?;
        Ok(Self {
            config: FlowConfig { oauth, open_browser: true },
            worker_command: vec![
                exe.to_string_lossy().into_owned(),
                WORKER_SUBCOMMAND.to_string(),
            ],
            poll_interval: POLL_INTERVAL,
        })
    }

    /// Replace the worker invocation (argv, program first).
    #[must_use]
    pub fn with_worker_command(mut self, command: Vec<String>) -> Self {
        self.worker_command = command;
        self
    }

    #[must_use]
    pub fn with_browser(mut self, open_browser: bool) -> Self {
        self.config.open_browser = open_browser;
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run one authorization to completion and return the new bundle.
    ///
    /// Cancellation kills the worker's whole process tree before returning
    /// [`Error::Canceled`]. A worker that exits non-zero maps to
    /// [`Error::WorkerFailed`]; its stdout is only parsed after a clean exit.
    pub async fn create_new(
        &self,
        cancel: &CancellationToken,
        progress: &dyn ProgressSink,
    ) -> Result<CredentialBundle> {
        let mut phase = AuthPhase::Idle;
        let (program, args) = self
            .worker_command
            .split_first()
            .ok_or_else(|| Error::Internal("worker command is empty".to_string()))?;

        transition(&mut phase, AuthPhase::WorkerStarting);
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;
        let pid = child.id();

        let config_json = serde_json::to_string(&self.config)
            .map_err(|e| Error::Internal(format!("failed to encode worker config: {e}")))?;
        if let Some(mut stdin) = child.stdin.take() {
            // A worker that dies before reading closes the pipe; the exit
            // status check below reports the real failure.
            let _ = stdin.write_all(config_json.as_bytes()).await;
            let _ = stdin.write_all(b"\n").await;
        }

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Internal("worker stdout was not captured".to_string()))?;
        let reader = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stdout.read_to_string(&mut buf).await;
            buf
        });

        transition(&mut phase, AuthPhase::WorkerRunning);
        progress.update(None, "waiting for authorization in the browser");

        loop {
            if cancel.is_cancelled() {
                transition(&mut phase, AuthPhase::Canceled);
                if let Some(pid) = pid {
                    let _ = tokio::task::spawn_blocking(move || terminate_tree(pid)).await;
                }
                let _ = child.wait().await;
                reader.abort();
                return Err(Error::Canceled);
            }
            if child.try_wait()?.is_some() {
                break;
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        let status = child.wait().await?;
        let output = reader.await.unwrap_or_default();
        match status.code() {
            Some(0) => {}
            code => {
                transition(&mut phase, AuthPhase::Failed);
                return Err(Error::WorkerFailed { exit_code: code.unwrap_or(-1) });
            }
        }

        let trimmed = output.trim();
        if trimmed.is_empty() {
            transition(&mut phase, AuthPhase::Failed);
            return Err(Error::MalformedCredentials(
                "worker produced no credentials".to_string(),
            ));
        }
        let bundle = match CredentialBundle::parse(trimmed) {
            Ok(bundle) => bundle,
            Err(e) => {
                transition(&mut phase, AuthPhase::Failed);
                return Err(e);
            }
        };

        transition(&mut phase, AuthPhase::Succeeded);
        progress.update(Some(1.0), "authorization complete");
        Ok(bundle)
    }
}

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;
