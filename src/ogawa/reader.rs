//! Ogawa format reader implementation.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;

use super::format::*;
use crate::util::{Error, Result};

/// Memory-mapped archive bytes.
pub struct IStreams {
    mmap: Mmap,
    version: u16,
    frozen: bool,
}

impl IStreams {
    /// Open a file for reading with memory mapping.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let size = file.metadata()?.len();
        if size < HEADER_SIZE as u64 {
            return Err(Error::invalid_archive(format!("{} bytes is shorter than the header", size)));
        }

        // Safety: the file is opened read-only and the map is only read
        // through bounds-checked slices.
        let mmap = unsafe { Mmap::map(&file) }?;
        let (version, frozen) = Self::parse_header(&mmap)?;
        Ok(Self { mmap, version, frozen })
    }

    /// Parse and validate the Ogawa header.
    fn parse_header(data: &[u8]) -> Result<(u16, bool)> {
        if data.len() < HEADER_SIZE {
            return Err(Error::invalid_archive("truncated header"));
        }
        if &data[..OGAWA_MAGIC.len()] != OGAWA_MAGIC {
            return Err(Error::invalid_archive("missing Ogawa magic"));
        }
        let frozen = data[FROZEN_OFFSET] == FROZEN_FLAG;
        let version = u16::from_be_bytes([data[VERSION_OFFSET], data[VERSION_OFFSET + 1]]);
        Ok((version, frozen))
    }

    /// Check if the archive was finished by its writer.
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Get the format version.
    #[inline]
    pub fn version(&self) -> u16 {
        self.version
    }

    /// Get the root group position from the header.
    pub fn root_pos(&self) -> Result<u64> {
        self.read_u64(ROOT_POS_OFFSET as u64)
    }

    /// Borrow `len` bytes at `pos`.
    pub fn slice(&self, pos: u64, len: u64) -> Result<&[u8]> {
        let start = usize::try_from(pos).map_err(|_| Error::invalid_archive("offset out of range"))?;
        let len = usize::try_from(len).map_err(|_| Error::invalid_archive("length out of range"))?;
        start
            .checked_add(len)
            .and_then(|end| self.mmap.get(start..end))
            .ok_or_else(|| {
                Error::invalid_archive(format!(
                    "{} bytes at {} run past the end of the file ({} bytes)",
                    len,
                    start,
                    self.mmap.len()
                ))
            })
    }

    /// Read a u64 value at the given position.
    pub fn read_u64(&self, pos: u64) -> Result<u64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.slice(pos, 8)?);
        Ok(u64::from_le_bytes(buf))
    }
}

/// A group in the Ogawa hierarchy.
#[derive(Clone)]
pub struct IGroup {
    streams: Arc<IStreams>,
    child_offsets: Vec<u64>,
}

impl IGroup {
    /// Read the group at `pos`; position 0 is the empty group.
    pub fn new(streams: Arc<IStreams>, pos: u64) -> Result<Self> {
        let num_children = if pos == 0 { 0 } else { streams.read_u64(pos)? };
        // every child offset must lie inside the file
        streams.slice(pos + 8, num_children.saturating_mul(8))?;
        let child_offsets = (0..num_children)
            .map(|i| streams.read_u64(pos + 8 + i * 8))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { streams, child_offsets })
    }

    /// Number of children.
    #[inline]
    pub fn num_children(&self) -> u64 {
        self.child_offsets.len() as u64
    }

    fn child_offset(&self, index: u64) -> Result<u64> {
        self.child_offsets.get(index as usize).copied().ok_or_else(|| {
            Error::invalid_archive(format!("group has no child {} ({} children)", index, self.child_offsets.len()))
        })
    }

    /// Check whether a child is data.
    pub fn is_child_data(&self, index: u64) -> Result<bool> {
        Ok(is_data_offset(self.child_offset(index)?))
    }

    /// Open a child group.
    pub fn group(&self, index: u64) -> Result<IGroup> {
        let offset = self.child_offset(index)?;
        if !is_group_offset(offset) {
            return Err(Error::invalid_archive(format!("child {} is data, expected a group", index)));
        }
        IGroup::new(self.streams.clone(), extract_offset(offset))
    }

    /// Open a child data block.
    pub fn data(&self, index: u64) -> Result<IData> {
        let offset = self.child_offset(index)?;
        if !is_data_offset(offset) {
            return Err(Error::invalid_archive(format!("child {} is a group, expected data", index)));
        }
        IData::new(self.streams.clone(), extract_offset(offset))
    }
}

/// Data block in the Ogawa hierarchy.
pub struct IData {
    streams: Arc<IStreams>,
    pos: u64,
    size: u64,
}

impl IData {
    /// Read the data header at `pos`; position 0 is empty data.
    pub fn new(streams: Arc<IStreams>, pos: u64) -> Result<Self> {
        let size = if pos == 0 { 0 } else { streams.read_u64(pos)? };
        Ok(Self { streams, pos, size })
    }

    /// Get the size of the data in bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Borrow the data bytes.
    pub fn slice(&self) -> Result<&[u8]> {
        if self.size == 0 {
            return Ok(&[]);
        }
        self.streams.slice(self.pos + 8, self.size)
    }

    /// Read data as a string, up to the first NUL.
    pub fn read_string(&self) -> Result<String> {
        let bytes = self.slice()?;
        let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        String::from_utf8(bytes[..len].to_vec()).map_err(|e| Error::invalid_archive(e.to_string()))
    }
}

/// Ogawa archive reader.
pub struct IArchive {
    streams: Arc<IStreams>,
    root: IGroup,
}

impl IArchive {
    /// Open an archive file for reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let streams = Arc::new(IStreams::open(path)?);
        let root_pos = streams.root_pos()?;
        let root = IGroup::new(streams.clone(), root_pos)?;
        Ok(Self { streams, root })
    }

    /// Check if the archive was finished by its writer.
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.streams.is_frozen()
    }

    /// Get the format version.
    #[inline]
    pub fn version(&self) -> u16 {
        self.streams.version()
    }

    /// Get the root group.
    #[inline]
    pub fn root(&self) -> &IGroup {
        &self.root
    }
}
