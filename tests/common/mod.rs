//! Builds synthetic PAK archives for tests.

#![allow(dead_code)]

use std::fs;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

pub const HEADER_SIZE: usize = 12;
pub const ENTRY_SIZE: usize = 64;

/// Encode a header with an arbitrary tag.
pub fn header(magic: &[u8; 4], dir_offset: i32, dir_size: i32) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_SIZE);
    out.extend_from_slice(magic);
    out.extend_from_slice(&dir_offset.to_le_bytes());
    out.extend_from_slice(&dir_size.to_le_bytes());
    out
}

/// Encode one directory record. `name` is cut to the 56-byte field.
pub fn record(name: &[u8], offset: i32, size: i32) -> Vec<u8> {
    let mut out = vec![0u8; ENTRY_SIZE];
    let n = name.len().min(56);
    out[..n].copy_from_slice(&name[..n]);
    out[56..60].copy_from_slice(&offset.to_le_bytes());
    out[60..64].copy_from_slice(&size.to_le_bytes());
    out
}

/// Header, directory right after it, then the payloads in order.
pub fn build_pak(files: &[(&str, &[u8])]) -> Vec<u8> {
    let dir_size = files.len() * ENTRY_SIZE;
    let mut out = header(b"PACK", HEADER_SIZE as i32, dir_size as i32);

    let mut offset = HEADER_SIZE + dir_size;
    for (name, content) in files {
        out.extend(record(name.as_bytes(), offset as i32, content.len() as i32));
        offset += content.len();
    }
    for (_, content) in files {
        out.extend_from_slice(content);
    }
    out
}

/// Payloads first, directory at the end, like id's own tools write it.
pub fn build_pak_trailing_dir(files: &[(&str, &[u8])]) -> Vec<u8> {
    let dir_size = files.len() * ENTRY_SIZE;
    let mut body = Vec::new();
    let mut records = Vec::new();
    for (name, content) in files {
        let offset = HEADER_SIZE + body.len();
        records.extend(record(name.as_bytes(), offset as i32, content.len() as i32));
        body.extend_from_slice(content);
    }

    let mut out = header(b"PACK", (HEADER_SIZE + body.len()) as i32, dir_size as i32);
    out.extend(body);
    out.extend(records);
    out
}

pub fn cursor(bytes: Vec<u8>) -> Cursor<Vec<u8>> {
    Cursor::new(bytes)
}

/// Write `bytes` to `dir/name` and return the path.
pub fn write_pak(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

/// Smallest useful archive: one entry `x.txt` holding `hello`.
pub fn hello_pak() -> Vec<u8> {
    let mut out = header(b"PACK", 12, 64);
    out.extend(record(b"x.txt", 76, 5));
    out.extend_from_slice(b"hello");
    out
}

/// Stream that claims to be `extra` bytes longer than it is.
pub struct PaddedLen {
    inner: Cursor<Vec<u8>>,
    extra: u64,
}

impl PaddedLen {
    pub fn new(bytes: Vec<u8>, extra: u64) -> Self {
        Self {
            inner: Cursor::new(bytes),
            extra,
        }
    }
}

impl Read for PaddedLen {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Seek for PaddedLen {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match pos {
            SeekFrom::End(0) => Ok(self.inner.seek(SeekFrom::End(0))? + self.extra),
            other => self.inner.seek(other),
        }
    }
}

/// Stream whose absolute seeks to `fail_at` return an error.
pub struct FailingSeek {
    inner: Cursor<Vec<u8>>,
    fail_at: u64,
}

impl FailingSeek {
    pub fn new(bytes: Vec<u8>, fail_at: u64) -> Self {
        Self {
            inner: Cursor::new(bytes),
            fail_at,
        }
    }
}

impl Read for FailingSeek {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Seek for FailingSeek {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match pos {
            SeekFrom::Start(n) if n == self.fail_at => {
                Err(io::Error::new(io::ErrorKind::Other, "device went away"))
            }
            other => self.inner.seek(other),
        }
    }
}
