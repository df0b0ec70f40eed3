//! Character Classification
//!
//! Works out, for one version's content:
//! - which references are official, homebrew, or unknown
//! - per-team character counts
//! - the minimum edition needed to run the script
//! - the overall homebrewiness
//!
//! Classification itself only reads the registry. Homebrew definitions found in
//! the content are returned as a batch in [`Classification::homebrew`] and
//! registered in one step by [`Classification::register`], so a failure later
//! in an upload never leaves half of them behind.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use tracing::debug;

use crate::character::{Character, Edition};
use crate::content::{CharacterReference, VersionContent};
use crate::error::{Result, ScriptError};
use crate::registry::{CharacterRegistry, HomebrewUndo};
use crate::remote::{released_or_empty, ReleasedRoleLookup};
use crate::script::{CharacterCounts, Homebrewiness, ScriptId};

/// Official character left out of the homebrew ratio
///
/// Scripts with homebrew rules list it, so it says nothing about whether the
/// roster itself is homebrew.
pub const BOOTLEGGER_ID: &str = "bootlegger";

// =============================================================================
// Classification Result
// =============================================================================

/// Outcome of classifying one version's content
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub counts: CharacterCounts,
    pub edition: Edition,
    pub homebrewiness: Homebrewiness,
    /// Minimal references nobody knows about
    pub unresolved: Vec<CharacterReference>,
    /// Homebrew characters defined by this content, pending registration
    pub homebrew: Vec<Character>,
}

impl Classification {
    /// Register the pending homebrew characters for `script`
    pub fn register(&self, registry: &dyn CharacterRegistry, script: ScriptId) -> Result<HomebrewUndo> {
        if self.homebrew.is_empty() {
            return Ok(HomebrewUndo::default());
        }
        registry.upsert_homebrew(script, &self.homebrew)
    }
}

// =============================================================================
// Classifier
// =============================================================================

/// Classifies content against a registry
pub struct Classifier<'a> {
    registry: &'a dyn CharacterRegistry,
    lookup: &'a dyn ReleasedRoleLookup,
}

#[derive(Default)]
struct Tally {
    total: usize,
    official: usize,
    homebrew: usize,
}

impl Tally {
    fn homebrewiness(&self) -> Homebrewiness {
        if self.total > 0 && self.homebrew == self.total {
            Homebrewiness::Homebrew
        } else if self.official == self.total {
            Homebrewiness::Official
        } else {
            Homebrewiness::Hybrid
        }
    }
}

impl<'a> Classifier<'a> {
    pub fn new(registry: &'a dyn CharacterRegistry, lookup: &'a dyn ReleasedRoleLookup) -> Self {
        Self { registry, lookup }
    }

    /// Classify `content` uploaded under `script`
    ///
    /// Fails with [`ScriptError::HomebrewIdConflict`] when the content redefines
    /// a homebrew character owned by another script.
    pub fn classify(&self, script: ScriptId, content: &VersionContent) -> Result<Classification> {
        let mut result = Classification::default();
        let mut tally = Tally::default();
        let mut released: Option<HashSet<String>> = None;

        for reference in content.characters() {
            let in_ratio = reference.id != BOOTLEGGER_ID;
            if in_ratio {
                tally.total += 1;
            }

            if let Some(character) = self.registry.official(&reference.id) {
                result.counts.record(character.character_type);
                result.edition = result.edition.max(character.edition);
                if in_ratio {
                    tally.official += 1;
                }
                continue;
            }

            if !in_ratio {
                continue;
            }

            if reference.is_minimal() {
                let released = released.get_or_insert_with(|| released_or_empty(self.lookup));
                if released.contains(&reference.id) {
                    // Released but not registered yet: official, edition unknown
                    debug!(id = %reference.id, "resolved via released role lookup");
                    tally.official += 1;
                    result.edition = Edition::MAX;
                } else if let Some(character) = self.registry.homebrew(&reference.id, None) {
                    result.counts.record(character.character_type);
                } else {
                    debug!(id = %reference.id, "unresolved character reference");
                    result.unresolved.push(reference.clone());
                    result.edition = Edition::MAX;
                }
                continue;
            }

            self.check_ownership(script, &reference.id)?;
            let character = Character::homebrew_from_reference(reference, script);
            result.counts.record(character.character_type);
            tally.homebrew += 1;
            match result.homebrew.iter_mut().find(|c| c.id == character.id) {
                Some(existing) => *existing = character,
                None => result.homebrew.push(character),
            }
        }

        result.homebrewiness = tally.homebrewiness();
        debug!(
            %script,
            total = tally.total,
            official = tally.official,
            homebrew = tally.homebrew,
            homebrewiness = ?result.homebrewiness,
            edition = ?result.edition,
            "classified content"
        );
        Ok(result)
    }

    /// Classify and register homebrew characters in one call
    pub fn classify_and_register(&self, script: ScriptId, content: &VersionContent) -> Result<Classification> {
        let classification = self.classify(script, content)?;
        // Committed: the caller has nothing left to fail on
        let _ = classification.register(self.registry, script)?;
        Ok(classification)
    }

    fn check_ownership(&self, script: ScriptId, id: &str) -> Result<()> {
        match self.registry.homebrew(id, None).and_then(|c| c.owner) {
            Some(owner) if owner != script => Err(ScriptError::HomebrewIdConflict {
                id: id.to_string(),
                owner,
                claimant: script,
            }),
            _ => Ok(()),
        }
    }
}

// =============================================================================
// Composition
// =============================================================================

/// Something unusual about a roster's make-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompositionWarning {
    NoDemon,
    TooFewCharacters(usize),
    TooManyCharacters(usize),
    NoTownsfolk,
    NoMinions,
}

impl fmt::Display for CompositionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompositionWarning::NoDemon => write!(f, "Script must contain at least one Demon"),
            CompositionWarning::TooFewCharacters(n) => {
                write!(f, "Script has very few characters ({} non-Traveller/Fabled)", n)
            }
            CompositionWarning::TooManyCharacters(n) => {
                write!(f, "Script has many characters ({} non-Traveller/Fabled)", n)
            }
            CompositionWarning::NoTownsfolk => write!(f, "No Townsfolk characters found"),
            CompositionWarning::NoMinions => write!(f, "No Minion characters found"),
        }
    }
}

impl CharacterCounts {
    /// Warnings about an unbalanced roster
    pub fn composition_warnings(&self) -> Vec<CompositionWarning> {
        let mut warnings = Vec::new();
        if self.demons == 0 {
            warnings.push(CompositionWarning::NoDemon);
        }
        let playable = self.playable();
        if playable < 5 {
            warnings.push(CompositionWarning::TooFewCharacters(playable));
        } else if playable > 25 {
            warnings.push(CompositionWarning::TooManyCharacters(playable));
        }
        if self.townsfolk == 0 {
            warnings.push(CompositionWarning::NoTownsfolk);
        }
        if self.minions == 0 {
            warnings.push(CompositionWarning::NoMinions);
        }
        warnings
    }
}
