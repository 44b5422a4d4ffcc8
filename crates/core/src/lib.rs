// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2026 The san authors

//! Core library for the `san` Search Console toolkit.
//!
//! Modules compose in dependency order: [`credential`] produces bundles via
//! the worker flow, [`port`] persists them with the license verdict from
//! [`license`], [`client`] spends them against the API, and [`query`],
//! [`inspect`] and [`property`] implement the data operations on top.
//! [`dispatch`] provides the bounded batch engine and [`process`] the
//! worker-tree supervision.

pub mod client;
pub mod credential;
pub mod dispatch;
pub mod error;
pub mod inspect;
pub mod license;
pub mod port;
pub mod process;
pub mod progress;
pub mod property;
pub mod query;
pub mod test_support;

pub use error::{Error, Result};
