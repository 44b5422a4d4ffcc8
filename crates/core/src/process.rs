// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2026 The san authors

//! Process-tree termination for authorization workers.
//!
//! The tree is enumerated from the procfs ppid graph at call time, so
//! children spawned after the snapshot can be missed. All signalling is
//! best-effort: a pid that exits between snapshot and signal is skipped.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

/// How long terminated processes get to exit before SIGKILL.
const GRACE_PERIOD: Duration = Duration::from_secs(2);
/// Poll tick while waiting out the grace period.
const REAP_INTERVAL: Duration = Duration::from_millis(50);

/// Parse the state and ppid fields out of `/proc/<pid>/stat`.
///
/// The comm field is parenthesized and may itself contain spaces or
/// parentheses, so fields are taken from after the last `)`.
fn read_stat(pid: u32) -> Option<(char, u32)> {
    let stat = std::fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
    let rest = stat.rsplit_once(')')?.1;
    let mut fields = rest.split_whitespace();
    let state = fields.next()?.chars().next()?;
    let ppid = fields.next()?.parse().ok()?;
    Some((state, ppid))
}

/// True while the pid exists and is not a zombie.
pub fn is_running(pid: u32) -> bool {
    matches!(read_stat(pid), Some((state, _)) if state != 'Z' && state != 'X')
}

/// Enumerate `root` plus all transitive children, root first.
///
/// On systems without procfs the snapshot degrades to the root pid alone.
pub fn snapshot_tree(root: u32) -> Vec<u32> {
    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    if let Ok(entries) = std::fs::read_dir("/proc") {
        for entry in entries.flatten() {
            let Some(pid) = entry.file_name().to_str().and_then(|n| n.parse::<u32>().ok()) else {
                continue;
            };
            if let Some((_, ppid)) = read_stat(pid) {
                children.entry(ppid).or_default().push(pid);
            }
        }
    }

    let mut tree = vec![root];
    let mut next = 0;
    while next < tree.len() {
        if let Some(kids) = children.get(&tree[next]) {
            tree.extend(kids.iter().copied());
        }
        next += 1;
    }
    tree
}

/// Terminate `root` and every process under it.
///
/// SIGTERMs the snapshotted tree, waits up to [`GRACE_PERIOD`] for it to
/// drain, then SIGKILLs whatever is left. Never fails: pids that are
/// already gone are skipped, and zombies count as exited. Blocks for up
/// to the grace period; call via `spawn_blocking` from async contexts.
pub fn terminate_tree(root: u32) {
    let tree = snapshot_tree(root);
    tracing::debug!(root, tree_size = tree.len(), "terminating process tree");
    for &pid in &tree {
        let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
    }

    let deadline = Instant::now() + GRACE_PERIOD;
    loop {
        if !tree.iter().any(|&pid| is_running(pid)) {
            return;
        }
        if Instant::now() >= deadline {
            break;
        }
        std::thread::sleep(REAP_INTERVAL);
    }

    for &pid in &tree {
        if is_running(pid) {
            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGKILL);
        }
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
