// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2026 The san authors

pub mod auth;
pub mod config;
pub mod inspect;
pub mod properties;
pub mod query;
pub mod worker;
