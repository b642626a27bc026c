//! Ogawa writer stream.
//!
//! The archive is encoded into memory and handed to the filesystem in
//! one step, so positions are plain offsets into a growing buffer.

use std::io::{Cursor, Seek, SeekFrom, Write};

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

use crate::util::Result;

/// Output stream for writing Ogawa data.
pub struct OStream {
    writer: Cursor<Vec<u8>>,
}

impl OStream {
    /// Create an empty stream.
    pub fn new() -> Self {
        Self {
            writer: Cursor::new(Vec::with_capacity(64 * 1024)),
        }
    }

    /// Get the current write position.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.writer.position()
    }

    /// Write bytes and advance position.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        Ok(())
    }

    /// Write a u64 value (little-endian).
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.writer.write_u64::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write a u16 value (big-endian, header version only).
    pub fn write_u16_be(&mut self, value: u16) -> Result<()> {
        self.writer.write_u16::<BigEndian>(value)?;
        Ok(())
    }

    /// Write a u8 value.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.writer.write_u8(value)?;
        Ok(())
    }

    /// Seek to a position and return it.
    pub fn seek(&mut self, pos: u64) -> Result<u64> {
        Ok(self.writer.seek(SeekFrom::Start(pos))?)
    }

    /// Seek to end and return the position.
    pub fn seek_end(&mut self) -> Result<u64> {
        Ok(self.writer.seek(SeekFrom::End(0))?)
    }

    /// Take the encoded bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

impl Default for OStream {
    fn default() -> Self {
        Self::new()
    }
}
