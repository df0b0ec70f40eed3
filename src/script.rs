//! Script and version records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::character::{CharacterType, Edition};
use crate::checksum::Checksum;
use crate::content::VersionContent;
use crate::version::VersionNumber;

/// Identity of a Script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptId(pub u64);

impl fmt::Display for ScriptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named roster accumulating versions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub id: ScriptId,
    pub name: String,
    /// Username of the owner; unowned scripts accept uploads from anyone
    pub owner: Option<String>,
}

impl Script {
    /// Whether `uploader` may add or remove versions
    pub fn permits(&self, uploader: Option<&str>) -> bool {
        match &self.owner {
            None => true,
            Some(owner) => uploader == Some(owner.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptType {
    #[default]
    Full,
    Teensyville,
}

/// How much of a version is made of official characters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Homebrewiness {
    #[default]
    Official,
    Hybrid,
    Homebrew,
}

/// Number of characters per team in a version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterCounts {
    pub townsfolk: usize,
    pub outsiders: usize,
    pub minions: usize,
    pub demons: usize,
    pub travellers: usize,
    pub fabled: usize,
    pub loric: usize,
}

impl CharacterCounts {
    /// Count one character; unknown types are not counted
    pub fn record(&mut self, character_type: CharacterType) {
        match character_type {
            CharacterType::Townsfolk => self.townsfolk += 1,
            CharacterType::Outsider => self.outsiders += 1,
            CharacterType::Minion => self.minions += 1,
            CharacterType::Demon => self.demons += 1,
            CharacterType::Traveller => self.travellers += 1,
            CharacterType::Fabled => self.fabled += 1,
            CharacterType::Loric => self.loric += 1,
            CharacterType::Unknown => {}
        }
    }

    /// Characters that take a seat at the start of the game
    pub fn playable(&self) -> usize {
        self.townsfolk + self.outsiders + self.minions + self.demons
    }

    pub fn total(&self) -> usize {
        self.playable() + self.travellers + self.fabled + self.loric
    }
}

/// Identity of a Tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(pub u32);

/// A label attached to versions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub public: bool,
    /// Carried forward to a newly promoted latest version
    pub inheritable: bool,
}

/// One immutable-content snapshot of a Script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptVersion {
    pub script_id: ScriptId,
    pub version: VersionNumber,
    pub content: VersionContent,
    pub checksum: Checksum,
    pub script_type: ScriptType,
    pub is_latest: bool,
    pub homebrewiness: Homebrewiness,
    pub edition: Edition,
    pub counts: CharacterCounts,
    pub tags: BTreeSet<TagId>,
    pub author: Option<String>,
    pub notes: Option<String>,
    /// Reference to an attached PDF, owned by the host's file storage
    pub pdf: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ScriptVersion {
    /// Key of this version within the store
    pub fn key(&self) -> String {
        format!("{}/{}", self.script_id, self.version)
    }
}
