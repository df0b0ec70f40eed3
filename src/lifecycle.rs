//! Version Lifecycle Manager
//!
//! Owns every write to scripts and versions. Each operation runs under a
//! per-script lock and ends in one [`ChangeSet`] commit, so at most one
//! version of a script is ever flagged latest and it is always the highest.

use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::checksum::Checksum;
use crate::classify::{Classification, Classifier};
use crate::config::EngineConfig;
use crate::content::VersionContent;
use crate::diff::VersionDiff;
use crate::error::{Result, ScriptError};
use crate::registry::{CharacterRegistry, InMemoryRegistry};
use crate::remote::{HttpReleasedRoles, NoReleasedRoles, ReleasedRoleLookup};
use crate::script::{Script, ScriptId, ScriptType, ScriptVersion, TagId};
use crate::store::{ChangeSet, InMemoryScriptStore, InMemoryTagStore, ScriptStore, TagStore};
use crate::version::VersionNumber;

/// A version upload
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub script_name: String,
    pub version: VersionNumber,
    pub content: VersionContent,
    pub script_type: ScriptType,
    pub tags: BTreeSet<TagId>,
    /// Display author; falls back to the `_meta` author
    pub author: Option<String>,
    pub notes: Option<String>,
    pub pdf: Option<String>,
    /// Username of whoever uploads
    pub uploader: Option<String>,
    /// Do not bind the uploader as owner of a new script
    pub anonymous: bool,
}

impl UploadRequest {
    pub fn new(script_name: impl Into<String>, version: VersionNumber, content: VersionContent) -> Self {
        Self {
            script_name: script_name.into(),
            version,
            content,
            script_type: ScriptType::Full,
            tags: BTreeSet::new(),
            author: None,
            notes: None,
            pdf: None,
            uploader: None,
            anonymous: false,
        }
    }

    pub fn by(mut self, uploader: impl Into<String>) -> Self {
        self.uploader = Some(uploader.into());
        self
    }

    pub fn anonymously(mut self) -> Self {
        self.anonymous = true;
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = TagId>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }

    pub fn with_type(mut self, script_type: ScriptType) -> Self {
        self.script_type = script_type;
        self
    }
}

/// What a version deletion did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deletion {
    /// The version is gone; `promoted` became latest in its place
    VersionRemoved { promoted: Option<VersionNumber> },
    /// It was the last version, so the script went with it
    ScriptRemoved,
}

/// Orchestrates uploads and deletions of script versions
pub struct ScriptManager {
    store: Arc<dyn ScriptStore>,
    registry: Arc<dyn CharacterRegistry>,
    tags: Arc<dyn TagStore>,
    lookup: Arc<dyn ReleasedRoleLookup>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ScriptManager {
    pub fn new(
        store: Arc<dyn ScriptStore>,
        registry: Arc<dyn CharacterRegistry>,
        tags: Arc<dyn TagStore>,
    ) -> Self {
        Self {
            store,
            registry,
            tags,
            lookup: Arc::new(NoReleasedRoles),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Use `lookup` for characters missing from the registry
    pub fn with_lookup(mut self, lookup: Arc<dyn ReleasedRoleLookup>) -> Self {
        self.lookup = lookup;
        self
    }

    /// A manager over in-memory stores, wired from configuration
    pub fn in_memory(config: &EngineConfig, tags: InMemoryTagStore) -> Result<Self> {
        let registry = match &config.registry.roster_path {
            Some(path) => InMemoryRegistry::from_roster_file(path)?,
            None => InMemoryRegistry::bundled()?,
        };
        let manager = Self::new(
            Arc::new(InMemoryScriptStore::new()),
            Arc::new(registry),
            Arc::new(tags),
        );
        if !config.remote.enabled {
            return Ok(manager);
        }
        match HttpReleasedRoles::new(config.remote.roles_url.clone(), config.remote.timeout()) {
            Ok(lookup) => Ok(manager.with_lookup(Arc::new(lookup))),
            Err(e) => {
                tracing::warn!(error = %e, "released role lookup unavailable");
                Ok(manager)
            }
        }
    }

    pub fn store(&self) -> &dyn ScriptStore {
        self.store.as_ref()
    }

    pub fn registry(&self) -> &dyn CharacterRegistry {
        self.registry.as_ref()
    }

    /// Run `f` while holding the lock for the script called `name`
    fn with_script_lock<T>(&self, name: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(name.to_string()).or_default().clone()
        };
        let result = {
            let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
            f()
        };

        // Forget the lock once no other caller holds or waits on it
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        let ours = locks.get(name).is_some_and(|held| Arc::ptr_eq(held, &lock));
        if ours && Arc::strong_count(&lock) == 2 {
            locks.remove(name);
        }
        result
    }

    /// Like [`Self::with_script_lock`], for a script known by id
    fn with_script_lock_by_id<T>(&self, id: ScriptId, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let script = self
            .store
            .script(id)?
            .ok_or_else(|| ScriptError::ScriptNotFound(id.to_string()))?;
        self.with_script_lock(&script.name, f)
    }

    fn classifier(&self) -> Classifier<'_> {
        Classifier::new(self.registry.as_ref(), self.lookup.as_ref())
    }

    /// Upload a version of a script, creating the script on first upload
    ///
    /// Re-uploading an existing version only updates its author, notes, pdf
    /// and tags; its content must be identical.
    pub fn upload(&self, request: UploadRequest) -> Result<ScriptVersion> {
        let name = request.script_name.clone();
        self.with_script_lock(&name, || self.upload_locked(request))
    }

    fn upload_locked(&self, request: UploadRequest) -> Result<ScriptVersion> {
        let mut changes = ChangeSet::default();
        let script = match self.store.script_by_name(&request.script_name)? {
            Some(script) => {
                if !script.permits(request.uploader.as_deref()) {
                    return Err(ScriptError::OwnershipViolation {
                        script: script.id,
                        owner: script.owner.clone().unwrap_or_default(),
                    });
                }
                script
            }
            None => {
                let script = Script {
                    id: self.store.allocate_script_id()?,
                    name: request.script_name.clone(),
                    owner: if request.anonymous { None } else { request.uploader.clone() },
                };
                debug!(script = %script.id, name = %script.name, owner = ?script.owner, "creating script");
                changes.create_script = Some(script.clone());
                script
            }
        };

        let checksum = Checksum::of_content(&request.content);
        let author = request
            .author
            .clone()
            .or_else(|| request.content.author().map(String::from));

        if let Some(existing) = self.store.version(script.id, &request.version)? {
            return self.update_existing(existing, checksum, author, request, changes);
        }

        let current = self.current_latest(script.id)?;
        let (is_latest, inheritable_candidates) = match current {
            None => (true, BTreeSet::new()),
            Some(current) if request.version > current.version => {
                info!(
                    script = %script.id,
                    from = %current.version,
                    to = %request.version,
                    "promoting new latest version"
                );
                let candidates = current.tags.clone();
                let mut demoted = current;
                demoted.is_latest = false;
                changes.update_versions.push(demoted);
                (true, candidates)
            }
            Some(_) => (false, BTreeSet::new()),
        };

        let mut classification = self.classifier().classify(script.id, &request.content)?;
        if !is_latest {
            self.keep_unregistered_homebrew(&mut classification);
        }
        let tags = self.assign_tags(request.tags, &inheritable_candidates);

        let version = ScriptVersion {
            script_id: script.id,
            version: request.version,
            content: request.content,
            checksum,
            script_type: request.script_type,
            is_latest,
            homebrewiness: classification.homebrewiness,
            edition: classification.edition,
            counts: classification.counts,
            tags,
            author,
            notes: request.notes,
            pdf: request.pdf,
            created_at: Utc::now(),
        };
        changes.insert_versions.push(version.clone());

        self.commit_with_homebrew(&classification, script.id, changes)?;
        info!(version = %version.key(), latest = version.is_latest, homebrewiness = ?version.homebrewiness, "stored version");
        Ok(version)
    }

    fn update_existing(
        &self,
        mut existing: ScriptVersion,
        checksum: Checksum,
        author: Option<String>,
        request: UploadRequest,
        mut changes: ChangeSet,
    ) -> Result<ScriptVersion> {
        if existing.checksum != checksum {
            return Err(ScriptError::InvalidVersionOrdering {
                script: existing.script_id,
                version: existing.version.to_string(),
            });
        }
        if author.is_some() {
            existing.author = author;
        }
        if request.notes.is_some() {
            existing.notes = request.notes;
        }
        if request.pdf.is_some() {
            existing.pdf = request.pdf;
        }
        existing.tags = request.tags;

        changes.update_versions.push(existing.clone());
        self.store.commit(changes)?;
        debug!(version = %existing.key(), "updated version metadata");
        Ok(existing)
    }

    /// Register homebrew characters, then commit; undo the former if the latter fails
    fn commit_with_homebrew(&self, classification: &Classification, script: ScriptId, changes: ChangeSet) -> Result<()> {
        let undo = classification.register(self.registry.as_ref(), script)?;
        if let Err(e) = self.store.commit(changes) {
            self.registry.rollback_homebrew(undo);
            return Err(e);
        }
        Ok(())
    }

    /// Drop homebrew definitions that are already registered
    ///
    /// Used for versions that are not latest, so older rule text never
    /// replaces what the latest version registered.
    fn keep_unregistered_homebrew(&self, classification: &mut Classification) {
        classification
            .homebrew
            .retain(|character| self.registry.homebrew(&character.id, None).is_none());
    }

    /// The flagged latest version, or the highest one if no flag is set
    fn current_latest(&self, script: ScriptId) -> Result<Option<ScriptVersion>> {
        if let Some(latest) = self.store.latest(script)? {
            return Ok(Some(latest));
        }
        Ok(self.store.versions(script)?.into_iter().max_by(|a, b| a.version.cmp(&b.version)))
    }

    /// Requested tags plus inheritable tags of the demoted version
    fn assign_tags(&self, requested: BTreeSet<TagId>, candidates: &BTreeSet<TagId>) -> BTreeSet<TagId> {
        let mut tags = requested;
        for id in candidates {
            if tags.contains(id) {
                continue;
            }
            if let Some(tag) = self.tags.tag(*id) {
                if tag.inheritable {
                    debug!(tag = %tag.name, "inheriting tag");
                    tags.insert(*id);
                }
            }
        }
        tags
    }

    fn owned_script(&self, id: ScriptId, requester: Option<&str>) -> Result<Script> {
        let script = self
            .store
            .script(id)?
            .ok_or_else(|| ScriptError::ScriptNotFound(id.to_string()))?;
        if !script.permits(requester) {
            return Err(ScriptError::OwnershipViolation {
                script: script.id,
                owner: script.owner.clone().unwrap_or_default(),
            });
        }
        Ok(script)
    }

    /// Remove one version, promoting the next highest if it was latest
    pub fn delete_version(&self, id: ScriptId, version: &VersionNumber, requester: Option<&str>) -> Result<Deletion> {
        self.with_script_lock_by_id(id, || self.delete_version_locked(id, version, requester))
    }

    fn delete_version_locked(&self, id: ScriptId, version: &VersionNumber, requester: Option<&str>) -> Result<Deletion> {
        let script = self.owned_script(id, requester)?;

        let versions = self.store.versions(script.id)?;
        let target = versions
            .iter()
            .find(|v| v.version == *version)
            .ok_or_else(|| ScriptError::VersionNotFound {
                script: script.id,
                version: version.to_string(),
            })?;

        let mut changes = ChangeSet::default();
        let remaining: Vec<&ScriptVersion> = versions.iter().filter(|v| v.version != *version).collect();
        if remaining.is_empty() {
            changes.delete_script = Some(script.id);
            self.store.commit(changes)?;
            info!(script = %script.id, name = %script.name, "removed last version, script deleted");
            return Ok(Deletion::ScriptRemoved);
        }

        changes.delete_versions.push((script.id, version.clone()));
        let mut promoted = None;
        if target.is_latest {
            if let Some(next) = remaining.iter().max_by(|a, b| a.version.cmp(&b.version)) {
                let mut next = (*next).clone();
                next.is_latest = true;
                promoted = Some(next.version.clone());
                changes.update_versions.push(next);
            }
        }
        self.store.commit(changes)?;
        info!(script = %script.id, removed = %version, promoted = ?promoted.as_ref().map(|v| v.to_string()), "removed version");
        Ok(Deletion::VersionRemoved { promoted })
    }

    /// Remove every version and the script itself; returns how many versions went
    pub fn delete_all_versions(&self, id: ScriptId, requester: Option<&str>) -> Result<usize> {
        self.with_script_lock_by_id(id, || self.delete_all_versions_locked(id, requester))
    }

    fn delete_all_versions_locked(&self, id: ScriptId, requester: Option<&str>) -> Result<usize> {
        let script = self.owned_script(id, requester)?;

        let count = self.store.versions(script.id)?.len();
        self.store.commit(ChangeSet {
            delete_script: Some(script.id),
            ..Default::default()
        })?;
        info!(script = %script.id, name = %script.name, versions = count, "deleted script");
        Ok(count)
    }

    /// Re-flag latest so only the highest version carries it
    ///
    /// Returns the number of versions whose flag changed.
    pub fn repair_latest(&self, id: ScriptId) -> Result<usize> {
        self.with_script_lock_by_id(id, || self.repair_latest_locked(id))
    }

    fn repair_latest_locked(&self, id: ScriptId) -> Result<usize> {

        let versions = self.store.versions(id)?;
        let Some(highest) = versions.iter().map(|v| v.version.clone()).max() else {
            return Ok(0);
        };

        let fixed: Vec<ScriptVersion> = versions
            .into_iter()
            .filter(|v| v.is_latest != (v.version == highest))
            .map(|mut v| {
                v.is_latest = v.version == highest;
                v
            })
            .collect();
        let count = fixed.len();
        if count > 0 {
            self.store.commit(ChangeSet {
                update_versions: fixed,
                ..Default::default()
            })?;
            info!(script = %id, fixed = count, "repaired latest flags");
        }
        Ok(count)
    }

    /// Re-run classification on a stored version and refresh its derived fields
    pub fn reclassify(&self, id: ScriptId, version: &VersionNumber) -> Result<ScriptVersion> {
        self.with_script_lock_by_id(id, || self.reclassify_locked(id, version))
    }

    fn reclassify_locked(&self, id: ScriptId, version: &VersionNumber) -> Result<ScriptVersion> {

        let mut stored = self
            .store
            .version(id, version)?
            .ok_or_else(|| ScriptError::VersionNotFound {
                script: id,
                version: version.to_string(),
            })?;
        let mut classification = self.classifier().classify(id, &stored.content)?;
        if !stored.is_latest {
            self.keep_unregistered_homebrew(&mut classification);
        }
        if stored.homebrewiness != classification.homebrewiness {
            info!(
                version = %stored.key(),
                from = ?stored.homebrewiness,
                to = ?classification.homebrewiness,
                "homebrewiness changed"
            );
        }
        stored.homebrewiness = classification.homebrewiness;
        stored.edition = classification.edition;
        stored.counts = classification.counts;

        let changes = ChangeSet {
            update_versions: vec![stored.clone()],
            ..Default::default()
        };
        self.commit_with_homebrew(&classification, id, changes)?;
        Ok(stored)
    }

    /// Compare two stored versions of a script
    pub fn diff_versions(&self, id: ScriptId, old: &VersionNumber, new: &VersionNumber) -> Result<VersionDiff> {
        let fetch = |version: &VersionNumber| -> Result<ScriptVersion> {
            self.store
                .version(id, version)?
                .ok_or_else(|| ScriptError::VersionNotFound {
                    script: id,
                    version: version.to_string(),
                })
        };
        let old = fetch(old)?;
        let new = fetch(new)?;
        Ok(VersionDiff::between(&old.content, &new.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::normalize;
    use crate::script::{Homebrewiness, Tag};
    use serde_json::json;

    fn manager() -> ScriptManager {
        ScriptManager::new(
            Arc::new(InMemoryScriptStore::new()),
            Arc::new(InMemoryRegistry::bundled().unwrap()),
            Arc::new(InMemoryTagStore::new(vec![
                Tag { id: TagId(1), name: "Teensy".into(), public: true, inheritable: true },
                Tag { id: TagId(2), name: "Featured".into(), public: true, inheritable: false },
                Tag { id: TagId(3), name: "Beginner".into(), public: true, inheritable: true },
            ])),
        )
    }

    fn v(s: &str) -> VersionNumber {
        VersionNumber::parse(s).unwrap()
    }

    fn upload(name: &str, version: &str, raw: serde_json::Value) -> UploadRequest {
        UploadRequest::new(name, v(version), normalize(&raw).unwrap())
    }

    fn latest_versions(manager: &ScriptManager, id: ScriptId) -> Vec<String> {
        manager
            .store()
            .versions(id)
            .unwrap()
            .into_iter()
            .filter(|v| v.is_latest)
            .map(|v| v.version.to_string())
            .collect()
    }

    #[test]
    fn test_first_upload_is_latest_and_binds_owner() {
        let manager = manager();
        let stored = manager.upload(upload("Test", "1.0", json!(["chef", "imp"])).by("alice")).unwrap();
        assert!(stored.is_latest);
        let script = manager.store().script(stored.script_id).unwrap().unwrap();
        assert_eq!(script.owner.as_deref(), Some("alice"));
        assert_eq!(stored.counts.townsfolk, 1);
        assert_eq!(stored.homebrewiness, Homebrewiness::Official);
    }

    #[test]
    fn test_anonymous_upload_leaves_script_unowned() {
        let manager = manager();
        let stored = manager
            .upload(upload("Anon", "1.0", json!(["chef"])).by("alice").anonymously())
            .unwrap();
        let script = manager.store().script(stored.script_id).unwrap().unwrap();
        assert!(script.owner.is_none());
        manager.upload(upload("Anon", "2.0", json!(["chef", "imp"])).by("bob")).unwrap();
    }

    #[test]
    fn test_older_version_is_historical() {
        let manager = manager();
        let latest = manager.upload(upload("Test", "2.0", json!(["chef", "imp"]))).unwrap();
        let older = manager.upload(upload("Test", "1.5", json!(["chef"]))).unwrap();
        assert!(!older.is_latest);
        assert_eq!(latest_versions(&manager, latest.script_id), vec!["2.0.0"]);
    }

    #[test]
    fn test_non_owner_cannot_upload() {
        let manager = manager();
        manager.upload(upload("Owned", "1.0", json!(["chef"])).by("alice")).unwrap();
        let err = manager
            .upload(upload("Owned", "2.0", json!(["chef", "imp"])).by("bob"))
            .unwrap_err();
        assert!(matches!(err, ScriptError::OwnershipViolation { .. }));
        let err = manager.upload(upload("Owned", "2.0", json!(["chef"]))).unwrap_err();
        assert!(matches!(err, ScriptError::OwnershipViolation { .. }));
    }

    #[test]
    fn test_reupload_updates_metadata_only() {
        let manager = manager();
        let first = manager
            .upload(upload("Test", "1.0", json!(["chef"])).with_tags([TagId(2)]))
            .unwrap();
        manager.upload(upload("Test", "2.0", json!(["chef", "imp"]))).unwrap();

        let mut again = upload("Test", "1.0", json!(["chef"])).with_tags([TagId(3)]);
        again.notes = Some("now with notes".into());
        let updated = manager.upload(again).unwrap();
        assert_eq!(updated.notes.as_deref(), Some("now with notes"));
        assert_eq!(updated.tags, BTreeSet::from([TagId(3)]));
        assert!(!updated.is_latest);
        assert_eq!(updated.created_at, first.created_at);
    }

    #[test]
    fn test_same_version_different_content_rejected() {
        let manager = manager();
        manager.upload(upload("Test", "1.0", json!(["chef"]))).unwrap();
        let err = manager.upload(upload("Test", "1.0.0", json!(["chef", "imp"]))).unwrap_err();
        assert!(matches!(err, ScriptError::InvalidVersionOrdering { .. }));
    }

    #[test]
    fn test_only_inheritable_tags_survive_a_bump() {
        let manager = manager();
        manager
            .upload(upload("Tagged", "1.0", json!(["chef"])).with_tags([TagId(1), TagId(2)]))
            .unwrap();
        let bumped = manager.upload(upload("Tagged", "1.1", json!(["chef", "imp"]))).unwrap();
        assert_eq!(bumped.tags, BTreeSet::from([TagId(1)]));

        // A lower version never inherits
        let historical = manager.upload(upload("Tagged", "0.9", json!(["imp"]))).unwrap();
        assert!(historical.tags.is_empty());
    }

    #[test]
    fn test_author_falls_back_to_meta() {
        let manager = manager();
        let stored = manager
            .upload(upload("Meta", "1.0", json!([{"id": "_meta", "author": "X"}, "chef"])))
            .unwrap();
        assert_eq!(stored.author.as_deref(), Some("X"));
    }

    #[test]
    fn test_delete_latest_promotes_next_highest() {
        let manager = manager();
        let s = manager.upload(upload("Del", "1.0", json!(["chef"]))).unwrap().script_id;
        manager.upload(upload("Del", "3.0", json!(["chef", "imp", "spy"]))).unwrap();
        manager.upload(upload("Del", "2.0", json!(["chef", "imp"]))).unwrap();

        let outcome = manager.delete_version(s, &v("3.0"), None).unwrap();
        assert_eq!(outcome, Deletion::VersionRemoved { promoted: Some(v("2.0")) });
        assert_eq!(latest_versions(&manager, s), vec!["2.0.0"]);

        let outcome = manager.delete_version(s, &v("1.0"), None).unwrap();
        assert_eq!(outcome, Deletion::VersionRemoved { promoted: None });
        assert_eq!(latest_versions(&manager, s), vec!["2.0.0"]);

        assert_eq!(manager.delete_version(s, &v("2.0"), None).unwrap(), Deletion::ScriptRemoved);
        assert!(manager.store().script(s).unwrap().is_none());
    }

    #[test]
    fn test_delete_missing_version() {
        let manager = manager();
        let s = manager.upload(upload("Del", "1.0", json!(["chef"]))).unwrap().script_id;
        let err = manager.delete_version(s, &v("9.9"), None).unwrap_err();
        assert!(matches!(err, ScriptError::VersionNotFound { .. }));
        let err = manager.delete_version(ScriptId(404), &v("1.0"), None).unwrap_err();
        assert!(matches!(err, ScriptError::ScriptNotFound(_)));
    }

    #[test]
    fn test_delete_all_versions() {
        let manager = manager();
        let s = manager.upload(upload("All", "1.0", json!(["chef"])).by("alice")).unwrap().script_id;
        manager.upload(upload("All", "2.0", json!(["chef", "imp"])).by("alice")).unwrap();

        let err = manager.delete_all_versions(s, Some("bob")).unwrap_err();
        assert!(matches!(err, ScriptError::OwnershipViolation { .. }));

        assert_eq!(manager.delete_all_versions(s, Some("alice")).unwrap(), 2);
        assert!(manager.store().script(s).unwrap().is_none());
        assert!(manager.store().script_by_name("All").unwrap().is_none());
    }

    #[test]
    fn test_repair_latest() {
        let manager = manager();
        let s = manager.upload(upload("Drift", "1.0", json!(["chef"]))).unwrap().script_id;
        manager.upload(upload("Drift", "2.0", json!(["chef", "imp"]))).unwrap();

        // Corrupt the flags behind the manager's back
        let mut versions = manager.store().versions(s).unwrap();
        for version in &mut versions {
            version.is_latest = !version.is_latest;
        }
        manager
            .store()
            .commit(ChangeSet { update_versions: versions, ..Default::default() })
            .unwrap();

        assert_eq!(manager.repair_latest(s).unwrap(), 2);
        assert_eq!(latest_versions(&manager, s), vec!["2.0.0"]);
        assert_eq!(manager.repair_latest(s).unwrap(), 0);
    }

    #[test]
    fn test_reclassify_after_registry_learns_character() {
        let registry = Arc::new(InMemoryRegistry::new());
        let manager = ScriptManager::new(
            Arc::new(InMemoryScriptStore::new()),
            registry.clone(),
            Arc::new(InMemoryTagStore::default()),
        );
        let stored = manager.upload(upload("Later", "1.0", json!(["chef"]))).unwrap();
        assert_eq!(stored.homebrewiness, Homebrewiness::Hybrid);

        registry.replace_official(InMemoryRegistry::bundled().unwrap().official("chef"));
        let refreshed = manager.reclassify(stored.script_id, &v("1.0")).unwrap();
        assert_eq!(refreshed.homebrewiness, Homebrewiness::Official);
        assert_eq!(refreshed.counts.townsfolk, 1);
        assert_eq!(refreshed.content, stored.content);
    }

    #[test]
    fn test_diff_versions() {
        let manager = manager();
        let s = manager.upload(upload("Diff", "1.0", json!(["chef", "investigator"]))).unwrap().script_id;
        manager.upload(upload("Diff", "2.0", json!(["chef", "noble"]))).unwrap();
        let diff = manager.diff_versions(s, &v("1.0"), &v("2.0")).unwrap();
        assert_eq!(diff.additions[0].id, "noble");
        assert_eq!(diff.deletions[0].id, "investigator");
        assert!(manager.diff_versions(s, &v("1.0"), &v("5.0")).is_err());
    }

    fn brew(ability: &str) -> serde_json::Value {
        json!([{"id": "custom1", "name": "Custom", "team": "demon", "ability": ability}])
    }

    #[test]
    fn test_reclassify_old_version_keeps_newer_homebrew() {
        let manager = manager();
        let s = manager.upload(upload("Brew", "1.0", brew("old"))).unwrap().script_id;
        manager.upload(upload("Brew", "2.0", brew("new"))).unwrap();
        assert_eq!(manager.registry().homebrew("custom1", None).unwrap().ability, "new");

        let refreshed = manager.reclassify(s, &v("1.0")).unwrap();
        assert_eq!(refreshed.homebrewiness, Homebrewiness::Homebrew);
        assert_eq!(manager.registry().homebrew("custom1", None).unwrap().ability, "new");

        manager.reclassify(s, &v("2.0")).unwrap();
        assert_eq!(manager.registry().homebrew("custom1", None).unwrap().ability, "new");
    }

    #[test]
    fn test_historical_upload_keeps_newer_homebrew() {
        let manager = manager();
        manager.upload(upload("Brew", "2.0", brew("new"))).unwrap();
        let older = manager.upload(upload("Brew", "1.0", brew("old"))).unwrap();
        assert!(!older.is_latest);
        assert_eq!(manager.registry().homebrew("custom1", None).unwrap().ability, "new");
    }

    #[test]
    fn test_historical_upload_still_registers_unknown_homebrew() {
        let manager = manager();
        manager.upload(upload("Brew", "2.0", json!(["chef", "imp"]))).unwrap();
        let older = manager.upload(upload("Brew", "1.0", brew("old"))).unwrap();
        let custom = manager.registry().homebrew("custom1", None).unwrap();
        assert_eq!(custom.owner, Some(older.script_id));
    }

    #[test]
    fn test_script_locks_are_released() {
        let manager = manager();
        let s = manager.upload(upload("Short Lived", "1.0", json!(["chef"]))).unwrap().script_id;
        manager.upload(upload("Short Lived", "2.0", json!(["chef", "imp"]))).unwrap();
        assert!(manager.upload(upload("Short Lived", "2.0", json!(["imp"]))).is_err());
        assert!(manager.locks.lock().unwrap().is_empty());

        manager.delete_all_versions(s, None).unwrap();
        assert!(manager.locks.lock().unwrap().is_empty());
    }
}
