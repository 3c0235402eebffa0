//! Parsing of `fabric.mod.json` manifests into [`ModInfo`].
//!
//! Mod authors frequently ship manifests with raw newlines or tabs inside
//! string literals, which strict JSON rejects. Those characters are escaped
//! before parsing; everything else must be valid JSON.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};
use thiserror::Error;

/// Constraint recorded when a dependency value is neither a string nor an array.
const EMPTY_CONSTRAINT: &str = "";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("invalid manifest json: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("manifest is not a json object")]
    NotAnObject,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Metadata declared by a mod package.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModInfo {
    pub id: String,
    pub version: String,
    pub name: String,
    pub description: String,
    /// `client`, `server` or `*`.
    pub environment: String,
    pub authors: Vec<String>,
    /// Hard dependencies: mod id -> version constraint (not validated).
    pub depends: BTreeMap<String, String>,
    /// Soft dependencies. Never followed by the requirement closure.
    pub suggests: BTreeMap<String, String>,
    pub contact: BTreeMap<String, String>,
    /// Pretty-printed manifest, kept for display.
    pub raw_json: String,
}

impl ModInfo {
    /// Parse manifest bytes. `id` and `version` are mandatory.
    pub fn parse(bytes: &[u8]) -> Result<ModInfo, ManifestError> {
        let text = String::from_utf8_lossy(bytes);
        let sanitized = sanitize_string_literals(&text);
        let value: Value = serde_json::from_str(&sanitized)?;
        let obj = value.as_object().ok_or(ManifestError::NotAnObject)?;

        let id = match obj.get("id") {
            Some(Value::String(id)) if !id.trim().is_empty() => id.clone(),
            Some(Value::String(_)) => {
                return Err(ManifestError::InvalidField {
                    field: "id",
                    reason: "must not be empty".to_string(),
                });
            }
            Some(other) => {
                return Err(ManifestError::InvalidField {
                    field: "id",
                    reason: format!("expected string, found {}", type_name(other)),
                });
            }
            None => return Err(ManifestError::MissingField("id")),
        };

        let version = match obj.get("version") {
            Some(Value::String(version)) => version.clone(),
            Some(value @ Value::Object(_)) => {
                localized(value).ok_or_else(|| ManifestError::InvalidField {
                    field: "version",
                    reason: "localized version has no string value".to_string(),
                })?
            }
            Some(other) => other.to_string(),
            None => return Err(ManifestError::MissingField("version")),
        };

        let name = obj.get("name").and_then(localized).unwrap_or_else(|| id.clone());
        let description = obj
            .get("description")
            .and_then(localized)
            .unwrap_or_default();
        let environment = obj
            .get("environment")
            .and_then(Value::as_str)
            .unwrap_or("*")
            .to_string();

        let raw_json = serde_json::to_string_pretty(&value)?;

        Ok(ModInfo {
            authors: parse_authors(obj),
            depends: parse_dependencies(obj, "depends"),
            suggests: parse_dependencies(obj, "suggests"),
            contact: parse_contact(obj),
            id,
            version,
            name,
            description,
            environment,
            raw_json,
        })
    }

    /// Hard dependency ids in sorted order.
    pub fn dependency_ids(&self) -> impl Iterator<Item = &str> {
        self.depends.keys().map(String::as_str)
    }

    pub fn homepage(&self) -> Option<&str> {
        self.contact.get("homepage").map(String::as_str)
    }

    pub fn sources(&self) -> Option<&str> {
        self.contact.get("sources").map(String::as_str)
    }

    pub fn issues(&self) -> Option<&str> {
        self.contact.get("issues").map(String::as_str)
    }
}

/// Escape raw control characters that appear inside JSON string literals.
///
/// Newline, carriage return and tab become their escape sequences; other
/// control characters are dropped.
pub fn sanitize_string_literals(input: &str) -> String {
    static STRING_LITERAL_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r#"(?s)"(?:[^"\\]|\\.)*""#).unwrap());

    STRING_LITERAL_RE
        .replace_all(input, |caps: &Captures<'_>| {
            let literal = &caps[0];
            let mut cleaned = String::with_capacity(literal.len());
            for ch in literal.chars() {
                match ch {
                    '\n' => cleaned.push_str("\\n"),
                    '\r' => cleaned.push_str("\\r"),
                    '\t' => cleaned.push_str("\\t"),
                    c if c.is_control() && (c as u32) < 0x20 => {}
                    c => cleaned.push(c),
                }
            }
            cleaned
        })
        .into_owned()
}

/// Resolve a plain or localized (`{"en_us": ...}`) string value.
fn localized(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Object(map) => map
            .get("en_us")
            .or_else(|| map.values().next())
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

fn parse_authors(obj: &Map<String, Value>) -> Vec<String> {
    let Some(Value::Array(authors)) = obj.get("authors") else {
        return Vec::new();
    };
    authors
        .iter()
        .filter_map(|author| match author {
            Value::String(name) => Some(name.clone()),
            Value::Object(person) => person.get("name").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .collect()
}

fn parse_dependencies(obj: &Map<String, Value>, key: &str) -> BTreeMap<String, String> {
    let Some(Value::Object(deps)) = obj.get(key) else {
        return BTreeMap::new();
    };
    deps.iter()
        .map(|(mod_id, constraint)| {
            let constraint = match constraint {
                Value::String(text) => text.clone(),
                Value::Array(_) => constraint.to_string(),
                _ => EMPTY_CONSTRAINT.to_string(),
            };
            (mod_id.clone(), constraint)
        })
        .collect()
}

fn parse_contact(obj: &Map<String, Value>) -> BTreeMap<String, String> {
    let Some(Value::Object(contact)) = obj.get("contact") else {
        return BTreeMap::new();
    };
    contact
        .iter()
        .filter_map(|(key, value)| value.as_str().map(|text| (key.clone(), text.to_string())))
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
