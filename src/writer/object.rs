//! Output object tree.

use serde::Serialize;

use crate::core::MetaData;

use super::property::OProperty;

/// Object for writing to archive.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OObject {
    /// Object name.
    pub name: String,
    /// Object metadata.
    #[serde(skip_serializing_if = "MetaData::is_empty")]
    pub meta_data: MetaData,
    /// Child objects.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OObject>,
    /// Properties.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<OProperty>,
}

impl OObject {
    /// Create a new object.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            meta_data: MetaData::new(),
            children: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Set metadata.
    pub fn with_meta_data(mut self, md: MetaData) -> Self {
        self.meta_data = md;
        self
    }

    /// Add a child object.
    pub fn add_child(&mut self, child: OObject) {
        self.children.push(child);
    }

    /// Add a property.
    pub fn add_property(&mut self, prop: OProperty) {
        self.properties.push(prop);
    }

    /// Find a direct child by name.
    pub fn child(&self, name: &str) -> Option<&OObject> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Find a top-level property by name.
    pub fn property(&self, name: &str) -> Option<&OProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Resolve a `/`-separated path of child names below this object.
    pub fn find(&self, path: &str) -> Option<&OObject> {
        path.split('/')
            .filter(|part| !part.is_empty())
            .try_fold(self, |obj, part| obj.child(part))
    }
}
