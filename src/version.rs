//! Script version numbers
//!
//! Uploaded scripts carry free-form version strings such as `"1"`, `"1.2"` or
//! `"v2.0.1"`. They are widened to full semantic versions so that ordering is
//! numeric per segment (`"1.10" > "1.9"`), never lexicographic.

use regex::Regex;
use semver::{BuildMetadata, Version};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{Result, ScriptError};

fn short_form() -> &'static Regex {
    static SHORT: OnceLock<Regex> = OnceLock::new();
    SHORT.get_or_init(|| {
        Regex::new(r"^(\d+)(?:\.(\d+))?(?:\.(\d+))?$").expect("static version pattern")
    })
}

/// Version of one ScriptVersion within a Script
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionNumber(Version);

impl VersionNumber {
    /// Create from numeric segments
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(Version::new(major, minor, patch))
    }

    /// Parse a version string, padding missing segments with zero
    pub fn parse(version_str: &str) -> Result<Self> {
        let trimmed = version_str.trim();
        // Strip leading 'v' if present
        let trimmed = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err(ScriptError::InvalidVersion(version_str.to_string()));
        }

        if let Some(caps) = short_form().captures(trimmed) {
            let segment = |i: usize| -> Result<u64> {
                match caps.get(i) {
                    Some(m) => m
                        .as_str()
                        .parse()
                        .map_err(|_| ScriptError::InvalidVersion(version_str.to_string())),
                    None => Ok(0),
                }
            };
            return Ok(Self::new(segment(1)?, segment(2)?, segment(3)?));
        }

        // Build metadata carries no precedence
        let mut version = Version::parse(trimmed)?;
        version.build = BuildMetadata::EMPTY;
        Ok(Self(version))
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VersionNumber {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for VersionNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for VersionNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
