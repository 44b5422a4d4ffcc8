// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2026 The san authors

//! Authorization port: the persisted hand-off between `san auth` and the
//! data commands.
//!
//! A port file carries the credential bundle plus the entitlement decided at
//! authorization time, wrapped in a versioned envelope. Files without a
//! `version` field are treated as bare legacy bundles at the free tier.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::credential::CredentialBundle;
use crate::error::{Error, Result};

pub const PORT_VERSION: u32 = 2;
const PORT_FILE: &str = "auth.json";

/// Credentials plus entitlement, as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthPort {
    pub credentials: CredentialBundle,
    pub is_pro: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    credentials: CredentialBundle,
    #[serde(default)]
    is_pro: bool,
}

#[derive(Debug, Deserialize)]
struct VersionProbe {
    #[serde(default)]
    version: Option<u32>,
}

impl AuthPort {
    /// Parse a port file's contents, accepting legacy bare bundles.
    pub fn parse(json: &str) -> Result<Self> {
        let probe: VersionProbe = serde_json::from_str(json)
            .map_err(|e| Error::MalformedCredentials(e.to_string()))?;
        match probe.version {
            Some(PORT_VERSION) => {
                let envelope: Envelope = serde_json::from_str(json)
                    .map_err(|e| Error::MalformedCredentials(e.to_string()))?;
                envelope.credentials.validate()?;
                Ok(Self { credentials: envelope.credentials, is_pro: envelope.is_pro })
            }
            Some(version) => Err(Error::UnknownPortVersion(version)),
            None => {
                let credentials = CredentialBundle::parse(json)?;
                Ok(Self { credentials, is_pro: false })
            }
        }
    }

    pub fn to_json(&self) -> Result<String> {
        let envelope = Envelope {
            version: PORT_VERSION,
            credentials: self.credentials.clone(),
            is_pro: self.is_pro,
        };
        serde_json::to_string_pretty(&envelope)
            .map_err(|e| Error::Internal(format!("failed to encode auth port: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Save atomically (write tmp + rename).
    ///
    /// The temp filename carries PID and a counter so concurrent saves never
    /// race on the same `.tmp` file.
    pub fn save(&self, path: &Path) -> Result<()> {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = self.to_json()?;
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_name = format!(
            "{}.{}.{}.tmp",
            path.file_name().unwrap_or_default().to_string_lossy(),
            std::process::id(),
            seq,
        );
        let tmp_path = path.with_file_name(tmp_name);
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

/// State directory resolution: explicit override, then XDG, then home, then
/// a relative fallback for stripped-down environments.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SAN_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("san");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local/state/san");
    }
    PathBuf::from(".san")
}

pub fn default_port_path() -> PathBuf {
    state_dir().join(PORT_FILE)
}

#[cfg(test)]
#[path = "port_tests.rs"]
mod tests;
