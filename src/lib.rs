//! # objseq
//!
//! Converts keyframed OBJ mesh sequences (stop-motion style animation)
//! into one time-sampled scene archive: an animated PolyMesh per object
//! with generated UV atlases, per-material face sets and material
//! records.
//!
//! ## Modules
//!
//! - [`util`] - Errors, bounding boxes and math re-exports
//! - [`core`] - Time sampling, metadata and sample payloads
//! - [`writer`] - Archive object tree and schemas
//! - [`ogawa`] - Binary container encoding and decoding
//! - [`manifest`] - Sequence manifest loading and validation
//! - [`mesh`] - OBJ frame loading
//! - [`atlas`] - Chart generation and packing
//! - [`convert`] - The frame pipeline and archive driver
//!
//! ## Example
//!
//! ```ignore
//! use objseq::convert::{convert_manifest, ConvertOptions};
//!
//! convert_manifest("walk.json".as_ref(), "walk.abc".as_ref(), &ConvertOptions::default())?;
//! ```

pub mod util;
pub mod core;
pub mod writer;
pub mod ogawa;
pub mod manifest;
pub mod mesh;
pub mod atlas;
pub mod convert;

// Re-export commonly used types
pub use util::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{BBox3d, Error, Result};
    pub use crate::core::{GeometryScope, MetaData, SampleData, TimeSampling};
    pub use crate::writer::{ArchiveDocument, OArchive, OObject, OProperty};
    pub use crate::manifest::{Keyframe, Manifest, ObjectSpec};
    pub use crate::convert::{convert, convert_manifest, ConvertOptions, UnassignedFacePolicy, UnwrapMode};
}
