//! Character reference data

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::content::{normalize_id, CharacterReference};
use crate::script::ScriptId;

/// Team a character plays for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterType {
    Townsfolk,
    Outsider,
    Minion,
    Demon,
    Traveller,
    Fabled,
    Loric,
    Unknown,
}

impl CharacterType {
    /// Map a `team` string from script JSON
    ///
    /// Total: unrecognised teams map to [`CharacterType::Unknown`].
    pub fn from_team(team: &str) -> Self {
        match team.trim().to_lowercase().as_str() {
            "townsfolk" => CharacterType::Townsfolk,
            "outsider" => CharacterType::Outsider,
            "minion" => CharacterType::Minion,
            "demon" => CharacterType::Demon,
            "traveler" | "traveller" => CharacterType::Traveller,
            "fabled" => CharacterType::Fabled,
            "loric" => CharacterType::Loric,
            _ => CharacterType::Unknown,
        }
    }
}

impl fmt::Display for CharacterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CharacterType::Townsfolk => "Townsfolk",
            CharacterType::Outsider => "Outsider",
            CharacterType::Minion => "Minion",
            CharacterType::Demon => "Demon",
            CharacterType::Traveller => "Traveller",
            CharacterType::Fabled => "Fabled",
            CharacterType::Loric => "Loric",
            CharacterType::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Official release a character first appeared in
///
/// Ordered: a script needs the highest edition among its characters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edition {
    /// Trouble Brewing, Bad Moon Rising, Sects & Violets
    #[default]
    Base,
    Kickstarter,
    Carousel,
    /// Anything goes, including characters nobody knows about yet
    All,
}

impl Edition {
    pub const MAX: Edition = Edition::All;

    pub fn label(&self) -> &'static str {
        match self {
            Edition::Base => "Base 3",
            Edition::Kickstarter => "Kickstarter",
            Edition::Carousel => "Carousel",
            Edition::All => "All",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Official,
    Homebrew,
}

/// Optional rule-text details of a character
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_night: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_night: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_night_reminder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_night_reminder: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reminders: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub global_reminders: Vec<String>,
    #[serde(default)]
    pub modifies_setup: bool,
}

/// A registry entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    #[serde(rename = "team")]
    pub character_type: CharacterType,
    #[serde(default)]
    pub edition: Edition,
    #[serde(default)]
    pub ability: String,
    pub provenance: Provenance,
    /// Script a homebrew character was first defined by
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<ScriptId>,
    #[serde(default)]
    pub details: CharacterDetails,
}

impl Character {
    /// An official character
    pub fn official(
        id: &str,
        name: impl Into<String>,
        character_type: CharacterType,
        edition: Edition,
        ability: impl Into<String>,
    ) -> Self {
        Self {
            id: normalize_id(id),
            name: name.into(),
            character_type,
            edition,
            ability: ability.into(),
            provenance: Provenance::Official,
            owner: None,
            details: CharacterDetails::default(),
        }
    }

    /// Build a homebrew character from a full definition in script content
    pub fn homebrew_from_reference(reference: &CharacterReference, owner: ScriptId) -> Self {
        let text_list = |field: &str| -> Vec<String> {
            reference
                .fields
                .get(field)
                .and_then(|v| v.as_array())
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| item.as_str().map(String::from))
                        .collect()
                })
                .unwrap_or_default()
        };

        // image may be a single url or a list of alternates
        let image = match reference.fields.get("image") {
            Some(serde_json::Value::String(url)) => Some(url.clone()),
            Some(serde_json::Value::Array(_)) => Some(text_list("image").join(",")),
            _ => None,
        };

        Self {
            id: reference.id.clone(),
            name: reference.str_field("name").unwrap_or("Unknown").to_string(),
            character_type: CharacterType::from_team(reference.str_field("team").unwrap_or("")),
            edition: Edition::All,
            ability: reference.str_field("ability").unwrap_or("").to_string(),
            provenance: Provenance::Homebrew,
            owner: Some(owner),
            details: CharacterDetails {
                image,
                first_night: reference.fields.get("firstNight").and_then(|v| v.as_f64()),
                other_night: reference.fields.get("otherNight").and_then(|v| v.as_f64()),
                first_night_reminder: reference.str_field("firstNightReminder").map(String::from),
                other_night_reminder: reference.str_field("otherNightReminder").map(String::from),
                reminders: text_list("reminders"),
                global_reminders: text_list("remindersGlobal"),
                modifies_setup: reference
                    .fields
                    .get("setup")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false),
            },
        }
    }

    pub fn is_official(&self) -> bool {
        self.provenance == Provenance::Official
    }
}
