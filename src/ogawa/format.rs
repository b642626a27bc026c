//! Ogawa format constants and structures.

/// Magic bytes at the start of an Ogawa file.
pub const OGAWA_MAGIC: &[u8; 5] = b"Ogawa";

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Offset of the frozen flag in the header.
pub const FROZEN_OFFSET: usize = 5;

/// Offset of the big-endian version in the header.
pub const VERSION_OFFSET: usize = 6;

/// Offset of the root group position in the header.
pub const ROOT_POS_OFFSET: usize = 8;

/// Current Ogawa format version.
pub const CURRENT_VERSION: u16 = 1;

/// Frozen flag value once the archive is complete.
pub const FROZEN_FLAG: u8 = 0xFF;

/// Frozen flag value while the archive is being written.
pub const NOT_FROZEN_FLAG: u8 = 0x00;

/// Child offsets with the MSB set point at data, clear at a group.
pub const TYPE_FLAG_MASK: u64 = 1 << 63;

/// Mask to extract the actual offset from a child pointer.
pub const OFFSET_MASK: u64 = !(1 << 63);

/// Empty data marker: offset 0 with the data bit set.
/// Array dimensions use it when they follow from the data size.
pub const EMPTY_DATA: u64 = TYPE_FLAG_MASK;

/// Library version recorded in written archives (1.8.10).
pub const ALEMBIC_LIBRARY_VERSION: i32 = 10810;

/// Archive format version stored next to the library version.
pub const OGAWA_FILE_VERSION: i32 = 0;

/// Time-per-cycle value that marks acyclic sampling.
pub const ACYCLIC_TIME_PER_CYCLE: f64 = f64::MAX / 32.0;

/// Size of the content digest in front of every sample payload.
pub const DATA_KEY_SIZE: usize = 16;

/// Property headers: compound, scalar, array, scalar-like array.
pub(crate) const PTYPE_COMPOUND: u32 = 0;
pub(crate) const PTYPE_SCALAR: u32 = 1;
pub(crate) const PTYPE_ARRAY: u32 = 2;
pub(crate) const PTYPE_SCALAR_LIKE: u32 = 3;

/// Property info flags.
pub(crate) const INFO_HAS_TIME_SAMPLING: u32 = 0x0100;
pub(crate) const INFO_HAS_CHANGE_RANGE: u32 = 0x0200;
pub(crate) const INFO_HOMOGENOUS: u32 = 0x0400;
pub(crate) const INFO_CONSTANT: u32 = 0x0800;

/// Indexed metadata slot meaning "stored inline".
pub(crate) const INLINE_METADATA: u8 = 0xff;

/// Check if a child offset represents a group.
#[inline]
pub const fn is_group_offset(offset: u64) -> bool {
    (offset & TYPE_FLAG_MASK) == 0
}

/// Check if a child offset represents data.
#[inline]
pub const fn is_data_offset(offset: u64) -> bool {
    (offset & TYPE_FLAG_MASK) != 0
}

/// Extract the actual position from a child offset.
#[inline]
pub const fn extract_offset(offset: u64) -> u64 {
    offset & OFFSET_MASK
}

/// Create a group child offset.
#[inline]
pub const fn make_group_offset(pos: u64) -> u64 {
    pos & OFFSET_MASK
}

/// Create a data child offset.
#[inline]
pub const fn make_data_offset(pos: u64) -> u64 {
    pos | TYPE_FLAG_MASK
}
