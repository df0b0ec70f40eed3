//! Persistence of scripts, versions and tags
//!
//! The lifecycle manager reads through [`ScriptStore`] and writes by handing
//! it a [`ChangeSet`], which the store must apply atomically.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::error::{Result, ScriptError};
use crate::script::{Script, ScriptId, ScriptVersion, Tag, TagId};
use crate::version::VersionNumber;

/// Writes produced by one lifecycle operation
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    /// Script to create before anything else
    pub create_script: Option<Script>,
    /// New versions; a `(script, version)` key must not exist yet
    pub insert_versions: Vec<ScriptVersion>,
    /// Replacements for existing versions
    pub update_versions: Vec<ScriptVersion>,
    pub delete_versions: Vec<(ScriptId, VersionNumber)>,
    /// Script to delete together with all of its versions
    pub delete_script: Option<ScriptId>,
}

/// Storage of scripts and their versions
pub trait ScriptStore: Send + Sync {
    /// Reserve an id for a script about to be created
    fn allocate_script_id(&self) -> Result<ScriptId>;

    fn script(&self, id: ScriptId) -> Result<Option<Script>>;

    fn script_by_name(&self, name: &str) -> Result<Option<Script>>;

    /// All versions of a script, lowest version first
    fn versions(&self, script: ScriptId) -> Result<Vec<ScriptVersion>>;

    fn version(&self, script: ScriptId, version: &VersionNumber) -> Result<Option<ScriptVersion>>;

    /// The version flagged latest, if any
    fn latest(&self, script: ScriptId) -> Result<Option<ScriptVersion>> {
        Ok(self.versions(script)?.into_iter().find(|v| v.is_latest))
    }

    /// Apply every write in `changes`, or none of them
    fn commit(&self, changes: ChangeSet) -> Result<()>;
}

/// Read-only lookup of tags
pub trait TagStore: Send + Sync {
    fn tag(&self, id: TagId) -> Option<Tag>;
}

#[derive(Debug, Default)]
struct StoreState {
    next_id: u64,
    scripts: BTreeMap<ScriptId, Script>,
    versions: BTreeMap<ScriptId, BTreeMap<VersionNumber, ScriptVersion>>,
}

impl StoreState {
    /// Check that `changes` can be applied in full
    fn validate(&self, changes: &ChangeSet) -> Result<()> {
        if let Some(script) = &changes.create_script {
            if self.scripts.contains_key(&script.id) {
                return Err(ScriptError::Storage(format!("script {} already exists", script.id)));
            }
        }
        let known = |id: ScriptId| {
            self.scripts.contains_key(&id)
                || changes.create_script.as_ref().map(|s| s.id) == Some(id)
        };
        let stored = |id: ScriptId, version: &VersionNumber| {
            self.versions
                .get(&id)
                .map(|versions| versions.contains_key(version))
                .unwrap_or(false)
        };

        for version in &changes.insert_versions {
            if !known(version.script_id) {
                return Err(ScriptError::ScriptNotFound(version.script_id.to_string()));
            }
            if stored(version.script_id, &version.version) {
                return Err(ScriptError::DuplicateVersion {
                    script: version.script_id,
                    version: version.version.to_string(),
                });
            }
        }
        for version in &changes.update_versions {
            if !stored(version.script_id, &version.version) {
                return Err(ScriptError::VersionNotFound {
                    script: version.script_id,
                    version: version.version.to_string(),
                });
            }
        }
        for (script, version) in &changes.delete_versions {
            if !stored(*script, version) {
                return Err(ScriptError::VersionNotFound {
                    script: *script,
                    version: version.to_string(),
                });
            }
        }
        Ok(())
    }

    fn apply(&mut self, changes: ChangeSet) {
        if let Some(script) = changes.create_script {
            self.versions.entry(script.id).or_default();
            self.scripts.insert(script.id, script);
        }
        for (script, version) in changes.delete_versions {
            if let Some(versions) = self.versions.get_mut(&script) {
                versions.remove(&version);
            }
        }
        for version in changes.update_versions.into_iter().chain(changes.insert_versions) {
            self.versions
                .entry(version.script_id)
                .or_default()
                .insert(version.version.clone(), version);
        }
        if let Some(script) = changes.delete_script {
            self.scripts.remove(&script);
            self.versions.remove(&script);
        }
    }
}

/// Store held in memory behind one lock
#[derive(Debug, Default)]
pub struct InMemoryScriptStore {
    state: RwLock<StoreState>,
}

impl InMemoryScriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_count(&self) -> usize {
        self.state.read().unwrap_or_else(|e| e.into_inner()).scripts.len()
    }
}

impl ScriptStore for InMemoryScriptStore {
    fn allocate_script_id(&self) -> Result<ScriptId> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.next_id += 1;
        Ok(ScriptId(state.next_id))
    }

    fn script(&self, id: ScriptId) -> Result<Option<Script>> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        Ok(state.scripts.get(&id).cloned())
    }

    fn script_by_name(&self, name: &str) -> Result<Option<Script>> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        Ok(state.scripts.values().find(|s| s.name == name).cloned())
    }

    fn versions(&self, script: ScriptId) -> Result<Vec<ScriptVersion>> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        Ok(state
            .versions
            .get(&script)
            .map(|versions| versions.values().cloned().collect())
            .unwrap_or_default())
    }

    fn version(&self, script: ScriptId, version: &VersionNumber) -> Result<Option<ScriptVersion>> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        Ok(state
            .versions
            .get(&script)
            .and_then(|versions| versions.get(version))
            .cloned())
    }

    fn commit(&self, changes: ChangeSet) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.validate(&changes)?;
        state.apply(changes);
        Ok(())
    }
}

/// Fixed set of tags
#[derive(Debug, Default)]
pub struct InMemoryTagStore {
    tags: HashMap<TagId, Tag>,
}

impl InMemoryTagStore {
    pub fn new(tags: impl IntoIterator<Item = Tag>) -> Self {
        Self {
            tags: tags.into_iter().map(|t| (t.id, t)).collect(),
        }
    }
}

impl TagStore for InMemoryTagStore {
    fn tag(&self, id: TagId) -> Option<Tag> {
        self.tags.get(&id).cloned()
    }
}
