//! Released-role lookup
//!
//! The publisher releases characters before the local registry learns about
//! them. Classification asks a [`ReleasedRoleLookup`] about minimal references
//! it cannot resolve locally. The lookup is best effort: any failure counts as
//! "not released".

use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::content::normalize_id;

/// Why a lookup produced no answer
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Malformed(String),
}

/// Source of officially released character ids
pub trait ReleasedRoleLookup: Send + Sync {
    /// Normalized ids of every released character
    fn released_ids(&self) -> std::result::Result<HashSet<String>, LookupError>;
}

/// Lookup that never finds anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReleasedRoles;

impl ReleasedRoleLookup for NoReleasedRoles {
    fn released_ids(&self) -> std::result::Result<HashSet<String>, LookupError> {
        Ok(HashSet::new())
    }
}

/// Lookup backed by a fixed list
#[derive(Debug, Clone, Default)]
pub struct StaticReleasedRoles {
    ids: HashSet<String>,
}

impl StaticReleasedRoles {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            ids: ids.into_iter().map(|id| normalize_id(id.as_ref())).collect(),
        }
    }
}

impl ReleasedRoleLookup for StaticReleasedRoles {
    fn released_ids(&self) -> std::result::Result<HashSet<String>, LookupError> {
        Ok(self.ids.clone())
    }
}

/// Default publisher role list
pub const DEFAULT_ROLES_URL: &str = "https://script.bloodontheclocktower.com/data/roles.json";

#[derive(Debug, Deserialize)]
struct PublishedRole {
    id: Option<String>,
}

/// Lookup that fetches the publisher's role list over HTTP
#[derive(Debug, Clone)]
pub struct HttpReleasedRoles {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpReleasedRoles {
    pub fn new(url: impl Into<String>, timeout: Duration) -> std::result::Result<Self, LookupError> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

impl ReleasedRoleLookup for HttpReleasedRoles {
    fn released_ids(&self) -> std::result::Result<HashSet<String>, LookupError> {
        let response = self.client.get(&self.url).send()?.error_for_status()?;
        let body: serde_json::Value = response.json()?;
        let roles: Vec<PublishedRole> = serde_json::from_value(body)
            .map_err(|e| LookupError::Malformed(e.to_string()))?;
        let ids: HashSet<String> = roles
            .into_iter()
            .filter_map(|role| role.id)
            .map(|id| normalize_id(&id))
            .collect();
        debug!(url = %self.url, roles = ids.len(), "fetched released roles");
        Ok(ids)
    }
}

/// Ask `lookup` for released ids, degrading to an empty set on failure
pub fn released_or_empty(lookup: &dyn ReleasedRoleLookup) -> HashSet<String> {
    match lookup.released_ids() {
        Ok(ids) => ids,
        Err(e) => {
            warn!(error = %e, "released role lookup failed, treating as not found");
            HashSet::new()
        }
    }
}
