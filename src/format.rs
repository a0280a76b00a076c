//! On-disk layout of a Quake PAK archive.
//!
//! ```text
//! offset  size  field
//! 0       4     magic "PACK"
//! 4       4     i32 directory offset
//! 8       4     i32 directory size (bytes)
//! ```
//!
//! The directory is a packed array of 64-byte records:
//!
//! ```text
//! 0       56    name, NUL padded, forward slashes
//! 56      4     i32 payload offset
//! 60      4     i32 payload size
//! ```
//!
//! All integers are little-endian. Fields are decoded at fixed offsets from a
//! byte buffer; nothing relies on struct layout.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::Error;

/// PAK header magic.
pub const MAGIC: [u8; 4] = *b"PACK";

/// Encoded header size in bytes.
pub const HEADER_SIZE: usize = 12;

/// Width of the NUL-padded name field.
pub const NAME_SIZE: usize = 56;

/// Encoded directory record size in bytes.
pub const ENTRY_SIZE: usize = NAME_SIZE + 4 + 4;

/// Archive header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PakHeader {
    pub dir_offset: i32,
    pub dir_size: i32,
}

impl PakHeader {
    /// Decode a header, checking the magic tag.
    ///
    /// `data` shorter than [`HEADER_SIZE`] is reported as
    /// [`Error::TruncatedHeader`].
    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        if data.len() < HEADER_SIZE {
            return Err(Error::TruncatedHeader {
                expected: HEADER_SIZE,
                actual: data.len(),
            });
        }

        let mut found = [0u8; 4];
        found.copy_from_slice(&data[0..4]);
        if found != MAGIC {
            return Err(Error::BadMagic { found });
        }

        Ok(Self {
            dir_offset: LittleEndian::read_i32(&data[4..8]),
            dir_size: LittleEndian::read_i32(&data[8..12]),
        })
    }

    /// Number of directory records.
    ///
    /// Integer division: a size that is not a multiple of [`ENTRY_SIZE`]
    /// drops the trailing partial record. Real archives may depend on this,
    /// so it is kept. A negative size yields zero.
    pub fn entry_count(&self) -> usize {
        if self.dir_size <= 0 {
            return 0;
        }
        self.dir_size as usize / ENTRY_SIZE
    }
}

/// One directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PakEntry {
    /// Stored name, cut at the first NUL of the fixed field.
    ///
    /// Bytes that are not valid UTF-8 become U+FFFD. Such names are kept for
    /// listing, but [`crate::PathResolver::resolve`] refuses them, so two
    /// distinct stored names never share a destination.
    pub name: String,
    /// Payload offset from the start of the archive.
    pub offset: i32,
    /// Payload length in bytes.
    pub size: i32,
}

impl PakEntry {
    /// Decode one directory record.
    pub fn from_record(data: &[u8; ENTRY_SIZE]) -> Self {
        let field = &data[..NAME_SIZE];
        let end = field.iter().position(|&b| b == 0).unwrap_or(NAME_SIZE);
        let name = String::from_utf8_lossy(&field[..end]).into_owned();

        Self {
            name,
            offset: LittleEndian::read_i32(&data[NAME_SIZE..NAME_SIZE + 4]),
            size: LittleEndian::read_i32(&data[NAME_SIZE + 4..ENTRY_SIZE]),
        }
    }

    /// Payload byte range, if both fields are non-negative and fit inside
    /// `archive_len`.
    pub fn byte_range(&self, archive_len: u64) -> Option<std::ops::Range<u64>> {
        if self.offset < 0 || self.size < 0 {
            return None;
        }
        let start = self.offset as u64;
        let end = start + self.size as u64;
        (end <= archive_len).then_some(start..end)
    }
}
