// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2026 The san authors

//! Property listing and filtering.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Prefix marking a domain property (as opposed to a URL-prefix property).
pub const DOMAIN_PREFIX: &str = "sc-domain:";

/// One property as returned by the sites list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteEntry {
    pub site_url: String,
    #[serde(default)]
    pub permission_level: String,
}

impl SiteEntry {
    pub fn is_domain_property(&self) -> bool {
        self.site_url.starts_with(DOMAIN_PREFIX)
    }

    pub fn is_verified(&self) -> bool {
        !self.permission_level.to_lowercase().contains("unverified")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TypeFilter {
    #[default]
    Any,
    UrlPrefix,
    Domain,
}

impl TypeFilter {
    pub fn matches(&self, site: &SiteEntry) -> bool {
        match self {
            Self::Any => true,
            Self::UrlPrefix => !site.is_domain_property(),
            Self::Domain => site.is_domain_property(),
        }
    }
}

impl FromStr for TypeFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "any" | "all" => Ok(Self::Any),
            "url-prefix" | "urlprefix" => Ok(Self::UrlPrefix),
            "domain" => Ok(Self::Domain),
            other => anyhow::bail!("unknown property type filter: {other}"),
        }
    }
}

impl std::fmt::Display for TypeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::UrlPrefix => write!(f, "url-prefix"),
            Self::Domain => write!(f, "domain"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VerificationFilter {
    #[default]
    Any,
    Verified,
    Unverified,
}

impl VerificationFilter {
    pub fn matches(&self, site: &SiteEntry) -> bool {
        match self {
            Self::Any => true,
            Self::Verified => site.is_verified(),
            Self::Unverified => !site.is_verified(),
        }
    }
}

impl FromStr for VerificationFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "any" | "all" => Ok(Self::Any),
            "verified" => Ok(Self::Verified),
            "unverified" => Ok(Self::Unverified),
            other => anyhow::bail!("unknown verification filter: {other}"),
        }
    }
}

impl std::fmt::Display for VerificationFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Verified => write!(f, "verified"),
            Self::Unverified => write!(f, "unverified"),
        }
    }
}

/// Apply both filters, preserving the input order.
pub fn filter_sites(
    sites: Vec<SiteEntry>,
    type_filter: TypeFilter,
    verification: VerificationFilter,
) -> Vec<SiteEntry> {
    sites
        .into_iter()
        .filter(|s| type_filter.matches(s) && verification.matches(s))
        .collect()
}

pub fn verified_site_urls(sites: &[SiteEntry]) -> Vec<String> {
    sites.iter().filter(|s| s.is_verified()).map(|s| s.site_url.clone()).collect()
}

/// Display row for the properties listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRow {
    pub site_url: String,
    pub property_type: &'static str,
    pub permission_level: String,
    pub verified: bool,
}

impl From<SiteEntry> for PropertyRow {
    fn from(site: SiteEntry) -> Self {
        let property_type = if site.is_domain_property() { "Domain" } else { "URL-Prefix" };
        let verified = site.is_verified();
        Self {
            site_url: site.site_url,
            property_type,
            permission_level: site.permission_level,
            verified,
        }
    }
}

#[cfg(test)]
#[path = "property_tests.rs"]
mod tests;
