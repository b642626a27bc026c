//! Ogawa binary container.
//!
//! Ogawa is the binary layout of Alembic files (.abc): a tree of groups
//! whose leaves are data blocks. Offsets with the high bit set point at
//! data, the rest at groups, and offset 0 stands for an empty child.
//!
//! ## File Structure
//!
//! ```text
//! +------------------+
//! | Magic: "Ogawa"   |  5 bytes
//! +------------------+
//! | Frozen flag      |  1 byte (0x00 while writing, 0xFF when done)
//! +------------------+
//! | Version          |  2 bytes (u16 BE)
//! +------------------+
//! | Root Group Pos   |  8 bytes (u64 LE)
//! +------------------+
//! | ... Data ...     |
//! +------------------+
//! ```
//!
//! The root group holds the file version, the library version, the top
//! object, the archive metadata, the time sampling table and the
//! indexed metadata table, in that order.

mod format;
mod read_util;
mod reader;
mod stream;
mod write_util;
mod writer;

pub use format::*;
pub use read_util::{read_archive, PropertyHeader, ROOT_OBJECT_NAME};
pub use reader::{IArchive, IData, IGroup, IStreams};
pub use writer::{encode_archive, EncodedArchive};
