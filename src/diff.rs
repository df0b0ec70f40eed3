//! Version-to-version roster comparison
//!
//! Rosters are compared by identifier only. Order does not matter and `_meta`
//! never takes part.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::content::{CharacterReference, VersionContent};

/// Ability recorded for references without an `ability` field
pub const UNKNOWN_ABILITY: &str = "UNKNOWN_ABILITY";

fn id_set(content: &VersionContent) -> HashSet<&str> {
    content.characters().map(|r| r.id.as_str()).collect()
}

/// Entries of `new` whose id does not appear in `old`
pub fn additions(old: &VersionContent, new: &VersionContent) -> Vec<CharacterReference> {
    let old_ids = id_set(old);
    new.characters()
        .filter(|r| !old_ids.contains(r.id.as_str()))
        .cloned()
        .collect()
}

/// Entries of `old` whose id does not appear in `new`
pub fn deletions(old: &VersionContent, new: &VersionContent) -> Vec<CharacterReference> {
    additions(new, old)
}

/// Ids kept in both versions whose ability text differs
///
/// Only `ability` is compared. Edits to other homebrew fields (reminders,
/// night order) are not reported.
pub fn changes(old: &VersionContent, new: &VersionContent) -> Vec<CharacterReference> {
    let mut old_abilities: HashMap<&str, &str> = HashMap::new();
    for reference in old.characters() {
        old_abilities
            .entry(reference.id.as_str())
            .or_insert_with(|| ability_of(reference));
    }

    let mut seen = HashSet::new();
    new.characters()
        .filter_map(|reference| {
            let before = old_abilities.get(reference.id.as_str())?;
            if !seen.insert(reference.id.as_str()) {
                return None;
            }
            (*before != ability_of(reference)).then(|| CharacterReference::minimal(&reference.id))
        })
        .collect()
}

fn ability_of(reference: &CharacterReference) -> &str {
    reference.str_field("ability").unwrap_or(UNKNOWN_ABILITY)
}

/// Everything that changed between two versions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionDiff {
    pub additions: Vec<CharacterReference>,
    pub deletions: Vec<CharacterReference>,
    pub changes: Vec<CharacterReference>,
}

impl VersionDiff {
    pub fn between(old: &VersionContent, new: &VersionContent) -> Self {
        Self {
            additions: additions(old, new),
            deletions: deletions(old, new),
            changes: changes(old, new),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.deletions.is_empty() && self.changes.is_empty()
    }
}
