//! Character Registry
//!
//! Authoritative lookup of official and homebrew characters. The engine only
//! talks to the [`CharacterRegistry`] trait; [`InMemoryRegistry`] is the
//! bundled implementation, seeded from a roles file.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::RwLock;

use tracing::{debug, info};

use crate::character::{Character, CharacterType, Edition, Provenance};
use crate::content::normalize_id;
use crate::error::{Result, ScriptError};
use crate::script::ScriptId;

const BUNDLED_ROLES: &str = include_str!("../data/official_roles.json");

/// Previous homebrew state captured by an upsert, used to roll it back
#[derive(Debug, Default)]
#[must_use = "dropping the undo record makes the upsert irreversible"]
pub struct HomebrewUndo {
    previous: Vec<(String, Option<Character>)>,
}

impl HomebrewUndo {
    pub fn is_empty(&self) -> bool {
        self.previous.is_empty()
    }
}

/// Lookup and homebrew registration of characters
pub trait CharacterRegistry: Send + Sync {
    /// Official character by normalized id
    fn official(&self, id: &str) -> Option<Character>;

    /// Homebrew character by normalized id
    ///
    /// With `owner`, only characters owned by that script (or unowned) match.
    fn homebrew(&self, id: &str, owner: Option<ScriptId>) -> Option<Character>;

    /// Create or update homebrew characters for `script`, all or nothing
    ///
    /// Fails with [`ScriptError::HomebrewIdConflict`] if any id is owned by
    /// another script; in that case nothing is written.
    fn upsert_homebrew(&self, script: ScriptId, characters: &[Character]) -> Result<HomebrewUndo>;

    /// Restore the state captured by a previous upsert
    fn rollback_homebrew(&self, undo: HomebrewUndo);
}

/// Entry of an official roles file
#[derive(Debug, Deserialize)]
struct RosterEntry {
    id: String,
    name: String,
    team: String,
    #[serde(default)]
    edition: Edition,
    #[serde(default)]
    ability: String,
}

impl From<RosterEntry> for Character {
    fn from(entry: RosterEntry) -> Self {
        Character::official(
            &entry.id,
            entry.name,
            CharacterType::from_team(&entry.team),
            entry.edition,
            entry.ability,
        )
    }
}

/// Parse an official roles JSON document
pub fn parse_roster(json: &str) -> Result<Vec<Character>> {
    let entries: Vec<RosterEntry> = serde_json::from_str(json)?;
    Ok(entries.into_iter().map(Character::from).collect())
}

/// Registry held in memory behind read-write locks
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    official: RwLock<HashMap<String, Character>>,
    homebrew: RwLock<HashMap<String, Character>>,
}

impl InMemoryRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry seeded with the given official characters
    pub fn with_official(characters: impl IntoIterator<Item = Character>) -> Self {
        let registry = Self::new();
        registry.replace_official(characters);
        registry
    }

    /// A registry seeded with the roster shipped with the crate
    pub fn bundled() -> Result<Self> {
        Ok(Self::with_official(parse_roster(BUNDLED_ROLES)?))
    }

    /// A registry seeded from an official roles file
    pub fn from_roster_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let roster = parse_roster(&content)?;
        info!(path = %path.as_ref().display(), characters = roster.len(), "loaded official roster");
        Ok(Self::with_official(roster))
    }

    /// Swap in a new official roster
    ///
    /// Refresh is owned by the host; the engine never calls this.
    pub fn replace_official(&self, characters: impl IntoIterator<Item = Character>) {
        let fresh: HashMap<String, Character> = characters
            .into_iter()
            .map(|mut c| {
                c.id = normalize_id(&c.id);
                c.provenance = Provenance::Official;
                (c.id.clone(), c)
            })
            .collect();
        let mut official = self.official.write().unwrap_or_else(|e| e.into_inner());
        *official = fresh;
    }

    pub fn official_count(&self) -> usize {
        self.official.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// All homebrew characters owned by `script`
    pub fn homebrew_for_script(&self, script: ScriptId) -> Vec<Character> {
        let homebrew = self.homebrew.read().unwrap_or_else(|e| e.into_inner());
        let mut owned: Vec<_> = homebrew
            .values()
            .filter(|c| c.owner == Some(script))
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.id.cmp(&b.id));
        owned
    }
}

impl CharacterRegistry for InMemoryRegistry {
    fn official(&self, id: &str) -> Option<Character> {
        self.official
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    fn homebrew(&self, id: &str, owner: Option<ScriptId>) -> Option<Character> {
        let homebrew = self.homebrew.read().unwrap_or_else(|e| e.into_inner());
        let character = homebrew.get(id)?;
        match (owner, character.owner) {
            (Some(wanted), Some(actual)) if wanted != actual => None,
            _ => Some(character.clone()),
        }
    }

    fn upsert_homebrew(&self, script: ScriptId, characters: &[Character]) -> Result<HomebrewUndo> {
        // One write lock for the whole batch serializes upserts per id
        let mut homebrew = self.homebrew.write().unwrap_or_else(|e| e.into_inner());

        for character in characters {
            if let Some(owner) = homebrew.get(&character.id).and_then(|c| c.owner) {
                if owner != script {
                    return Err(ScriptError::HomebrewIdConflict {
                        id: character.id.clone(),
                        owner,
                        claimant: script,
                    });
                }
            }
        }

        let mut undo = HomebrewUndo::default();
        for character in characters {
            let mut stored = character.clone();
            stored.provenance = Provenance::Homebrew;
            stored.owner = Some(script);
            let previous = homebrew.insert(stored.id.clone(), stored);
            debug!(id = %character.id, %script, created = previous.is_none(), "upserted homebrew character");
            undo.previous.push((character.id.clone(), previous));
        }
        Ok(undo)
    }

    fn rollback_homebrew(&self, undo: HomebrewUndo) {
        let mut homebrew = self.homebrew.write().unwrap_or_else(|e| e.into_inner());
        // Reverse order so an id upserted twice ends at its oldest state
        for (id, previous) in undo.previous.into_iter().rev() {
            match previous {
                Some(character) => homebrew.insert(id, character),
                None => homebrew.remove(&id),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn homebrew(id: &str, ability: &str) -> Character {
        Character {
            id: id.to_string(),
            name: id.to_string(),
            character_type: CharacterType::Demon,
            edition: Edition::All,
            ability: ability.to_string(),
            provenance: Provenance::Homebrew,
            owner: None,
            details: Default::default(),
        }
    }

    #[test]
    fn test_bundled_roster() {
        let registry = InMemoryRegistry::bundled().unwrap();
        assert!(registry.official_count() > 70);
        let teller = registry.official("fortuneteller").unwrap();
        assert_eq!(teller.character_type, CharacterType::Townsfolk);
        assert_eq!(teller.edition, Edition::Base);
        assert!(registry.official("bootlegger").is_some());
    }

    #[test]
    fn test_roster_file_ids_are_normalized() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "Pit_Hag", "name": "Pit-Hag", "team": "minion", "edition": "base"}}]"#
        )
        .unwrap();
        let registry = InMemoryRegistry::from_roster_file(file.path()).unwrap();
        assert_eq!(registry.official("pithag").unwrap().name, "Pit-Hag");
    }

    #[test]
    fn test_replace_official() {
        let registry = InMemoryRegistry::with_official(vec![Character::official(
            "chef",
            "Chef",
            CharacterType::Townsfolk,
            Edition::Base,
            "",
        )]);
        registry.replace_official(vec![]);
        assert!(registry.official("chef").is_none());
    }

    #[test]
    fn test_upsert_conflict_writes_nothing() {
        let registry = InMemoryRegistry::new();
        let _ = registry
            .upsert_homebrew(ScriptId(1), &[homebrew("custom1", "first")])
            .unwrap();

        let result = registry.upsert_homebrew(
            ScriptId(2),
            &[homebrew("fresh", "x"), homebrew("custom1", "second")],
        );
        assert!(matches!(
            result,
            Err(ScriptError::HomebrewIdConflict { owner: ScriptId(1), claimant: ScriptId(2), .. })
        ));
        assert!(registry.homebrew("fresh", None).is_none());
        assert_eq!(registry.homebrew("custom1", None).unwrap().ability, "first");
    }

    #[test]
    fn test_owner_filter_and_updates() {
        let registry = InMemoryRegistry::new();
        let _ = registry.upsert_homebrew(ScriptId(1), &[homebrew("custom1", "v1")]).unwrap();
        let _ = registry.upsert_homebrew(ScriptId(1), &[homebrew("custom1", "v2")]).unwrap();

        assert_eq!(registry.homebrew("custom1", Some(ScriptId(1))).unwrap().ability, "v2");
        assert!(registry.homebrew("custom1", Some(ScriptId(2))).is_none());
        assert_eq!(registry.homebrew_for_script(ScriptId(1)).len(), 1);
    }

    #[test]
    fn test_rollback_restores_previous_state() {
        let registry = InMemoryRegistry::new();
        let _ = registry.upsert_homebrew(ScriptId(1), &[homebrew("kept", "old")]).unwrap();

        let undo = registry
            .upsert_homebrew(ScriptId(1), &[homebrew("kept", "new"), homebrew("added", "x")])
            .unwrap();
        assert!(!undo.is_empty());
        registry.rollback_homebrew(undo);

        assert_eq!(registry.homebrew("kept", None).unwrap().ability, "old");
        assert!(registry.homebrew("added", None).is_none());
    }
}
