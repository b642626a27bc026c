//! Error types for the conversion pipeline and archive writer.

use std::path::PathBuf;
use thiserror::Error;

use crate::atlas::AddMeshError;

/// Main error type for objseq operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Manifest file does not exist or cannot be read
    #[error("Manifest could not be opened: {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Manifest is not a JSON document
    #[error("Manifest is not valid JSON: {0}")]
    ManifestParse(#[source] serde_json::Error),

    /// Required manifest field is absent or has the wrong JSON type
    #[error("File contains malformed {field} field")]
    MalformedField { field: &'static str },

    /// Manifest content violates a structural rule
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    /// Mesh parser rejected the frame file
    #[error("Failed to load mesh {path}: {message}")]
    MeshLoad { path: PathBuf, message: String },

    /// Frame file holds more than one shape
    #[error("Expected only one mesh per obj file, {path} contains {count} meshes")]
    MultipleMeshes { path: PathBuf, count: usize },

    /// Frame file holds no shape at all
    #[error("No mesh found in {0}")]
    NoMesh(PathBuf),

    /// A corner lacks a required attribute index
    #[error("Mesh {path} is missing {attribute} indices")]
    MissingAttribute { path: PathBuf, attribute: &'static str },

    /// Cross-array index points past the end of the target array
    #[error("{what} index {index} out of range (count: {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// Packed atlas would exceed the largest supported texture
    #[error("Atlas of {width}x{height} pixels exceeds the {max} pixel limit")]
    AtlasTooLarge { width: u64, height: u64, max: u32 },

    /// Atlas generator refused the mesh declaration
    #[error("Atlas mesh declaration failed: {0}")]
    Atlas(#[from] AddMeshError),

    /// Faces whose material id matches no declared material (strict mode)
    #[error("Object {object} frame {frame}: {count} face(s) have no declared material")]
    UnassignedFaces {
        object: String,
        frame: i64,
        count: usize,
    },

    /// Sample appended at a slot other than the property's next slot
    #[error("Property {property}: sample written to slot {actual}, next slot is {expected}")]
    SampleSlot {
        property: String,
        expected: u32,
        actual: u32,
    },

    /// Mesh sample arrays disagree in length with their declared scope
    #[error("Inconsistent mesh sample: {0}")]
    InconsistentSample(String),

    /// Archive is frozen (already persisted)
    #[error("Archive is frozen and cannot be modified")]
    Frozen,

    /// Archive file is not a readable Ogawa stream
    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    /// Archive JSON dump error
    #[error("Archive document error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid manifest error.
    pub fn invalid_manifest(msg: impl Into<String>) -> Self {
        Self::InvalidManifest(msg.into())
    }

    /// Create an invalid archive error.
    pub fn invalid_archive(msg: impl Into<String>) -> Self {
        Self::InvalidArchive(msg.into())
    }

    /// Create an out-of-range error for a cross-array dereference.
    pub fn out_of_range(what: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { what, index, len }
    }
}

/// Result type alias for objseq operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::MalformedField { field: "materials" };
        assert_eq!(e.to_string(), "File contains malformed materials field");

        let e = Error::out_of_range("normal", 7, 3);
        assert!(e.to_string().contains("7"));
        assert!(e.to_string().contains("3"));

        let e = Error::AtlasTooLarge { width: 20000, height: 8, max: 16384 };
        assert_eq!(e.to_string(), "Atlas of 20000x8 pixels exceeds the 16384 pixel limit");

        let e = Error::invalid_archive("bad magic");
        assert_eq!(e.to_string(), "Invalid archive: bad magic");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_from_atlas() {
        let err: Error = AddMeshError::IndexOutOfRange { index: 3, vertex_count: 3 }.into();
        assert!(matches!(err, Error::Atlas(_)));
        assert!(err.to_string().contains("IndexOutOfRange"));
    }
}
