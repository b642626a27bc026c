//! Archive document.
//!
//! The decoded view of a written archive: archive metadata, the time
//! sampling table and the object tree, with every property expanded
//! back to one sample per index. Tests and tooling read archives
//! through it, and [`ArchiveDocument::to_json`] dumps it for debugging.

use std::path::Path;

use serde::Serialize;

use super::object::OObject;
use crate::core::{MetaData, TimeSampling};
use crate::ogawa::read_archive;
use crate::util::Result;

/// One row of the time sampling table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimeSamplingEntry {
    /// The sampling.
    pub sampling: TimeSampling,
    /// Largest stored sample count among properties using this sampling.
    pub max_samples: u32,
}

/// A complete archive as read back from disk.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ArchiveDocument {
    pub file_version: i32,
    pub library_version: i32,
    #[serde(skip_serializing_if = "MetaData::is_empty")]
    pub archive_metadata: MetaData,
    pub time_samplings: Vec<TimeSamplingEntry>,
    pub root: OObject,
}

impl ArchiveDocument {
    /// Read an archive from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        read_archive(path)
    }

    /// Get a time sampling by index.
    pub fn time_sampling(&self, index: u32) -> Option<&TimeSampling> {
        self.time_samplings.get(index as usize).map(|e| &e.sampling)
    }

    /// Resolve an absolute object path such as `/materials/red`.
    pub fn find(&self, path: &str) -> Option<&OObject> {
        self.root.find(path)
    }

    /// Pretty JSON dump of the whole document.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
