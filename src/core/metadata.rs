//! Metadata for archive objects and properties.
//!
//! Metadata is stored as key-value pairs of strings and is used to
//! describe schemas, interpretations, geometry scopes and material
//! bindings. In the archive document it is written in the Alembic
//! `key=value;key2=value2` string form.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::fmt;

/// Metadata storage - insertion-ordered key-value pairs of strings.
///
/// Uses SmallVec optimization for common case of few entries.
#[derive(Clone, Default, PartialEq)]
pub struct MetaData {
    entries: SmallVec<[(String, String); 4]>,
}

impl MetaData {
    /// Schema title key.
    pub const SCHEMA_KEY: &'static str = "schema";

    /// Schema base type key.
    pub const SCHEMA_BASE_KEY: &'static str = "schemaBaseType";

    /// Schema object title key.
    pub const SCHEMA_OBJ_TITLE_KEY: &'static str = "schemaObjTitle";

    /// Interpretation key (e.g., "point", "normal", "box").
    pub const INTERPRETATION_KEY: &'static str = "interpretation";

    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata for a schema object: title, base type and object title.
    pub fn for_schema(schema: &str, base: Option<&str>, prop: &str) -> Self {
        let mut meta = Self::new();
        meta.set(Self::SCHEMA_KEY, schema);
        if let Some(base) = base {
            meta.set(Self::SCHEMA_BASE_KEY, base);
        }
        meta.set(Self::SCHEMA_OBJ_TITLE_KEY, format!("{}:{}", schema, prop));
        meta
    }

    /// Set a metadata value, replacing an existing entry in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();

        if let Some((_, v)) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            *v = value;
            return;
        }
        self.entries.push((key, value));
    }

    /// Get a metadata value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get schema title.
    pub fn schema(&self) -> Option<&str> {
        self.get(Self::SCHEMA_KEY)
    }

    /// Iterate over key-value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serialize to Alembic metadata string format.
    pub fn serialize(&self) -> String {
        let mut result = String::new();
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                result.push(';');
            }
            escape_into(&mut result, k);
            result.push('=');
            escape_into(&mut result, v);
        }
        result
    }

    /// Parse from Alembic metadata string format.
    ///
    /// Entries without an unescaped `=` or with an empty key are skipped.
    pub fn parse(s: &str) -> Self {
        let mut meta = Self::new();
        for part in split_unescaped(s, ';') {
            let Some(eq) = find_unescaped(part, '=') else {
                continue;
            };
            let key = unescape(&part[..eq]);
            if !key.is_empty() {
                meta.set(key, unescape(&part[eq + 1..]));
            }
        }
        meta
    }
}

impl fmt::Debug for MetaData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

impl Serialize for MetaData {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&MetaData::serialize(self))
    }
}

impl<'de> Deserialize<'de> for MetaData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(MetaData::parse(&s))
    }
}

/// Escape the separator characters of the metadata string form.
fn escape_into(out: &mut String, s: &str) {
    for c in s.chars() {
        if matches!(c, '\\' | ';' | '=') {
            out.push('\\');
        }
        out.push(c);
    }
}

fn unescape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => result.push(next),
                None => result.push(c),
            }
        } else {
            result.push(c);
        }
    }
    result
}

/// Byte offset of the first `sep` not preceded by an escaping backslash.
fn find_unescaped(s: &str, sep: char) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == sep {
            return Some(i);
        }
    }
    None
}

/// Split on every occurrence of `sep` not preceded by an escaping backslash.
fn split_unescaped(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == sep {
            parts.push(&s[start..i]);
            start = i + c.len_utf8();
        }
    }
    if start < s.len() {
        parts.push(&s[start..]);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_update() {
        let mut meta = MetaData::new();
        meta.set("key", "value1");
        meta.set("key", "value2");

        assert_eq!(meta.get("key"), Some("value2"));
        assert_eq!(meta.len(), 1);
    }

    #[test]
    fn test_schema_metadata() {
        let meta = MetaData::for_schema("AbcGeom_PolyMesh_v1", Some("AbcGeom_GeomBase_v1"), ".geom");
        assert_eq!(meta.schema(), Some("AbcGeom_PolyMesh_v1"));
        assert_eq!(
            meta.serialize(),
            "schema=AbcGeom_PolyMesh_v1;schemaBaseType=AbcGeom_GeomBase_v1;\
             schemaObjTitle=AbcGeom_PolyMesh_v1:.geom"
        );
    }

    #[test]
    fn test_metadata_parse() {
        let meta = MetaData::parse("schema=AbcGeom_FaceSet_v1;interpretation=box;broken");
        assert_eq!(meta.schema(), Some("AbcGeom_FaceSet_v1"));
        assert_eq!(meta.get("interpretation"), Some("box"));
        assert_eq!(meta.len(), 2);
    }

    #[test]
    fn test_metadata_escape() {
        let mut meta = MetaData::new();
        meta.set("key=with;special", "value=with;special\\");

        let parsed = MetaData::parse(&meta.serialize());
        assert_eq!(parsed.get("key=with;special"), Some("value=with;special\\"));
    }

    #[test]
    fn test_metadata_json_string() {
        let mut meta = MetaData::new();
        meta.set("geoScope", "fvr");
        let json = serde_json::to_string(&meta).unwrap();
        assert_eq!(json, r#""geoScope=fvr""#);
        let back: MetaData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, meta);
    }
}
