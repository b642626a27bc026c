//! Archive writer.
//!
//! Builds an Alembic object tree (objects, compound/array/scalar
//! properties, metadata and a time sampling table) and encodes it as an
//! Ogawa `.abc` file. [`ArchiveDocument`] reads one back.
//!
//! # Example
//!
//! ```ignore
//! use objseq::writer::{OArchive, OObject};
//!
//! let mut archive = OArchive::create("output.abc")?;
//! let root = OObject::new("ABC");
//! archive.write_archive(&root)?;
//! ```

mod archive;
mod document;
mod object;
mod property;
pub mod schema;

pub use archive::OArchive;
pub use document::{ArchiveDocument, TimeSamplingEntry};
pub use object::OObject;
pub use property::{OProperty, OPropertyData};
pub use schema::*;
