//! Version content and its normalization
//!
//! Uploaded rosters arrive as JSON arrays mixing two historical encodings:
//! bare strings (`"imp"`) and objects (`{"id": "imp", ...}`). Both are
//! resolved once, here, into [`CharacterReference`]; nothing downstream looks
//! at the original shape again.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, ScriptError};

/// Reserved identifier of the metadata entry
pub const META_ID: &str = "_meta";

/// Canonicalize a character identifier
///
/// Strips `_` and `-` and lower-cases, so `"Fortune_Teller"`, `"fortune-teller"`
/// and `"fortuneteller"` collapse to one key. The literal `_meta` is kept.
pub fn normalize_id(id: &str) -> String {
    if id == META_ID {
        return id.to_string();
    }
    id.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// One entry of a raw upload, before normalization
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawEntry {
    /// Legacy encoding: the entry is just the identifier
    Legacy(String),
    /// Object encoding: must carry an `id` string
    Object(Map<String, Value>),
}

impl TryFrom<&Value> for RawEntry {
    type Error = ScriptError;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::String(id) => Ok(RawEntry::Legacy(id.clone())),
            Value::Object(map) => Ok(RawEntry::Object(map.clone())),
            other => Err(ScriptError::malformed(format!(
                "expected a string or an object, got {}",
                json_kind(other)
            ))),
        }
    }
}

impl RawEntry {
    /// Resolve into the canonical reference shape
    pub fn into_reference(self) -> Result<CharacterReference> {
        match self {
            RawEntry::Legacy(id) => Ok(CharacterReference::minimal(&id)),
            RawEntry::Object(mut fields) => {
                let id = match fields.remove("id") {
                    Some(Value::String(id)) => id,
                    Some(other) => {
                        return Err(ScriptError::malformed(format!(
                            "entry id must be a string, got {}",
                            json_kind(&other)
                        )))
                    }
                    None => return Err(ScriptError::malformed("entry is missing an id")),
                };
                Ok(CharacterReference {
                    id: normalize_id(&id),
                    fields,
                })
            }
        }
    }
}

/// A reference to a character inside a version's roster
///
/// A reference with no extra fields is *minimal* and points at a character
/// defined elsewhere. One with extra fields (`name`, `team`, `ability`, ...)
/// is a *full* definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterReference {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl CharacterReference {
    /// A minimal reference (identifier only)
    pub fn minimal(id: &str) -> Self {
        Self {
            id: normalize_id(id),
            fields: Map::new(),
        }
    }

    /// A full definition with the given extra fields
    pub fn with_fields(id: &str, fields: Map<String, Value>) -> Self {
        let mut fields = fields;
        fields.remove("id");
        Self {
            id: normalize_id(id),
            fields,
        }
    }

    pub fn is_meta(&self) -> bool {
        self.id == META_ID
    }

    pub fn is_minimal(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a string field
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Render back to JSON (`id` first)
    pub fn to_json(&self) -> Value {
        let mut map = Map::with_capacity(self.fields.len() + 1);
        map.insert("id".to_string(), Value::String(self.id.clone()));
        for (key, value) in &self.fields {
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map)
    }
}

/// Ordered roster of a version
///
/// Order is kept for display; diffing and similarity treat it as a set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionContent(Vec<CharacterReference>);

impl VersionContent {
    pub fn new(entries: Vec<CharacterReference>) -> Self {
        Self(entries)
    }

    pub fn entries(&self) -> &[CharacterReference] {
        &self.0
    }

    /// Entries other than `_meta`
    pub fn characters(&self) -> impl Iterator<Item = &CharacterReference> {
        self.0.iter().filter(|r| !r.is_meta())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The `_meta` entry, if present
    pub fn meta(&self) -> Option<&CharacterReference> {
        self.0.iter().find(|r| r.is_meta())
    }

    /// A string field of the `_meta` entry
    pub fn meta_field(&self, field: &str) -> Option<&str> {
        self.meta().and_then(|m| m.str_field(field))
    }

    pub fn author(&self) -> Option<&str> {
        self.meta_field("author")
    }

    pub fn name(&self) -> Option<&str> {
        self.meta_field("name")
    }

    pub fn to_json(&self) -> Value {
        Value::Array(self.0.iter().map(CharacterReference::to_json).collect())
    }
}

impl From<Vec<CharacterReference>> for VersionContent {
    fn from(entries: Vec<CharacterReference>) -> Self {
        Self(entries)
    }
}

/// Normalize raw uploaded content
///
/// The input must be a JSON array whose elements are strings or objects with a
/// string `id`. Anything else fails with [`ScriptError::MalformedContent`].
pub fn normalize(raw: &Value) -> Result<VersionContent> {
    let items = raw.as_array().ok_or_else(|| {
        ScriptError::malformed(format!("content must be a list, got {}", json_kind(raw)))
    })?;
    normalize_entries(items)
}

/// Normalize an already split list of raw entries
pub fn normalize_entries(items: &[Value]) -> Result<VersionContent> {
    items
        .iter()
        .enumerate()
        .map(|(position, item)| {
            RawEntry::try_from(item)
                .and_then(RawEntry::into_reference)
                .map_err(|e| match e {
                    ScriptError::MalformedContent(msg) => {
                        ScriptError::malformed(format!("entry {}: {}", position, msg))
                    }
                    other => other,
                })
        })
        .collect::<Result<Vec<_>>>()
        .map(VersionContent)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
