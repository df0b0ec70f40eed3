//! Blood on the Clocktower Script Engine
//!
//! Version lifecycle and content analysis for community-uploaded scripts.
//!
//! ## Features
//!
//! - **Content Normalization**: Legacy string entries and object entries become one canonical form
//! - **Lenient Versioning**: `"1"`, `"v1.2"` and full semver all order correctly
//! - **Latest Tracking**: Exactly one latest version per script, always the highest
//! - **Tag Inheritance**: Inheritable tags follow a script to its new latest version
//! - **Classification**: Character counts, minimum edition and homebrewiness
//! - **Homebrew Registry**: Homebrew ids are owned by the script that first defined them
//! - **Diffs & Similarity**: Additions, deletions, ability changes and a 0-100 overlap score
//!
//! ## Architecture
//!
//! ```text
//! raw JSON ──normalize──▶ VersionContent ──Classifier──▶ Classification
//!                              │                              │
//!                              ▼                              ▼
//!                        ScriptManager ──ChangeSet──▶ ScriptStore
//!                              │
//!                              └──upsert_homebrew──▶ CharacterRegistry
//! ```

pub mod character;
pub mod checksum;
pub mod classify;
pub mod config;
pub mod content;
pub mod diff;
pub mod error;
pub mod lifecycle;
pub mod registry;
pub mod remote;
pub mod script;
pub mod similarity;
pub mod store;
pub mod version;

pub use character::{Character, CharacterType, Edition, Provenance};
pub use checksum::Checksum;
pub use classify::{Classification, Classifier, CompositionWarning};
pub use config::EngineConfig;
pub use content::{normalize, CharacterReference, VersionContent};
pub use diff::{additions, changes, deletions, VersionDiff};
pub use error::{Result, ScriptError};
pub use lifecycle::{Deletion, ScriptManager, UploadRequest};
pub use registry::{CharacterRegistry, InMemoryRegistry};
pub use remote::{HttpReleasedRoles, NoReleasedRoles, ReleasedRoleLookup, StaticReleasedRoles};
pub use script::{CharacterCounts, Homebrewiness, Script, ScriptId, ScriptType, ScriptVersion, Tag, TagId};
pub use similarity::{rank_similar, similarity};
pub use store::{ChangeSet, InMemoryScriptStore, InMemoryTagStore, ScriptStore, TagStore};
pub use version::VersionNumber;
