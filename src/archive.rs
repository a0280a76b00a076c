//! Random-access reader for PAK archives.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::Error;
use crate::format::{PakEntry, PakHeader, ENTRY_SIZE, HEADER_SIZE};

/// An open PAK archive.
///
/// Owns the underlying stream; it is closed when the archive is dropped.
/// The directory is an immutable snapshot taken by [`Self::parse`]. Changes
/// made to the file afterwards are not detected.
///
/// # Example
///
/// ```no_run
/// use safe_unpak::PakArchive;
///
/// let mut archive = PakArchive::open("pak0.pak")?;
/// for entry in archive.parse()? {
///     println!("{} ({} bytes)", entry.name, entry.size);
/// }
/// let palette = archive.load_file("gfx/palette.lmp")?;
/// # Ok::<(), safe_unpak::Error>(())
/// ```
pub struct PakArchive<R> {
    reader: R,
    /// Total stream length, measured once at construction.
    len: u64,
    header: Option<PakHeader>,
    entries: Vec<PakEntry>,
}

impl PakArchive<BufReader<File>> {
    /// Open an archive file for reading. Does not parse it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::NotFound {
                path: path.display().to_string(),
            },
            _ => Error::Io(e),
        })?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> PakArchive<R> {
    /// Wrap any seekable reader.
    pub fn new(mut reader: R) -> Result<Self, Error> {
        let len = reader.seek(SeekFrom::End(0))?;
        Ok(Self {
            reader,
            len,
            header: None,
            entries: Vec::new(),
        })
    }

    /// Read the header and the whole directory table.
    ///
    /// Replaces any previously parsed directory. On failure the archive is
    /// left unparsed: [`Self::header`] is `None` and no entries remain.
    pub fn parse(&mut self) -> Result<&[PakEntry], Error> {
        let parsed = self
            .seek_directory()
            .and_then(|(header, dir)| Ok((header, dir.collect::<Result<Vec<_>, _>>()?)));

        match parsed {
            Ok((header, entries)) => {
                log::debug!(
                    "parsed {} directory entries from {}-byte archive",
                    entries.len(),
                    self.len
                );
                self.header = Some(header);
                self.entries = entries;
                Ok(&self.entries)
            }
            Err(e) => {
                self.header = None;
                self.entries.clear();
                Err(e)
            }
        }
    }

    /// Lazily iterate the directory table straight from the stream.
    ///
    /// Each call re-reads the header and starts over from the first record.
    /// Does not touch the parsed state.
    pub fn directory(&mut self) -> Result<Directory<'_, R>, Error> {
        self.seek_directory().map(|(_, dir)| dir)
    }

    fn seek_directory(&mut self) -> Result<(PakHeader, Directory<'_, R>), Error> {
        let header = self.read_header()?;

        if header.dir_offset < 0 || header.dir_size < 0 || header.dir_offset as u64 > self.len {
            return Err(Error::CorruptOffset {
                offset: header.dir_offset,
                size: header.dir_size,
                archive_len: self.len,
            });
        }

        self.reader.seek(SeekFrom::Start(header.dir_offset as u64))?;

        let dir = Directory {
            reader: &mut self.reader,
            index: 0,
            count: header.entry_count(),
        };
        Ok((header, dir))
    }

    fn read_header(&mut self) -> Result<PakHeader, Error> {
        self.reader.seek(SeekFrom::Start(0))?;
        let mut buf = [0u8; HEADER_SIZE];
        let n = read_full(&mut self.reader, &mut buf)?;
        PakHeader::from_bytes(&buf[..n])
    }

    /// Read the payload of `entry` into a freshly allocated buffer.
    ///
    /// Bounds are checked against the archive length before anything is
    /// allocated, so a bogus size cannot trigger a huge allocation.
    pub fn read_entry(&mut self, entry: &PakEntry) -> Result<Vec<u8>, Error> {
        let range = entry
            .byte_range(self.len)
            .ok_or_else(|| Error::OutOfBounds {
                entry: entry.name.clone(),
                offset: entry.offset,
                size: entry.size,
                archive_len: self.len,
            })?;

        self.reader
            .seek(SeekFrom::Start(range.start))
            .map_err(|source| Error::SeekFailed {
                entry: entry.name.clone(),
                offset: range.start,
                source,
            })?;

        let expected = range.end - range.start;
        let mut buf = Vec::with_capacity(expected as usize);
        let actual = (&mut self.reader).take(expected).read_to_end(&mut buf)? as u64;
        if actual < expected {
            return Err(Error::ShortRead {
                entry: entry.name.clone(),
                expected,
                actual,
            });
        }

        Ok(buf)
    }

    /// Read the payload of the entry at `index` in directory order.
    pub fn read_entry_at(&mut self, index: usize) -> Result<Vec<u8>, Error> {
        let entry = self
            .entries
            .get(index)
            .cloned()
            .ok_or_else(|| Error::EntryNotFound {
                entry: format!("#{index}"),
            })?;
        self.read_entry(&entry)
    }

    /// Look up a file by name and read it, parsing the directory first if
    /// no parse has succeeded yet.
    pub fn load_file(&mut self, name: &str) -> Result<Vec<u8>, Error> {
        if self.header.is_none() {
            self.parse()?;
        }
        let entry = self
            .find_by_name(name)
            .cloned()
            .ok_or_else(|| Error::EntryNotFound {
                entry: name.to_string(),
            })?;
        self.read_entry(&entry)
    }
}

impl<R> PakArchive<R> {
    /// Find an entry by its exact stored name. Case-sensitive, no
    /// normalization of separators.
    pub fn find_by_name(&self, name: &str) -> Option<&PakEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Parsed entries in directory order. Empty until [`Self::parse`] runs.
    pub fn entries(&self) -> &[PakEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Header from the most recent successful parse.
    pub fn header(&self) -> Option<PakHeader> {
        self.header
    }

    /// Total archive length in bytes.
    pub fn archive_len(&self) -> u64 {
        self.len
    }
}

/// Lazy iterator over directory records, created by
/// [`PakArchive::directory`].
///
/// Stops after the first error.
pub struct Directory<'a, R> {
    reader: &'a mut R,
    index: usize,
    count: usize,
}

impl<R: Read> Iterator for Directory<'_, R> {
    type Item = Result<PakEntry, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.count {
            return None;
        }

        let mut record = [0u8; ENTRY_SIZE];
        let result = match read_full(&mut *self.reader, &mut record) {
            Ok(ENTRY_SIZE) => Ok(PakEntry::from_record(&record)),
            Ok(_) => Err(Error::TruncatedDirectory {
                index: self.index,
                count: self.count,
            }),
            Err(e) => Err(Error::Io(e)),
        };

        self.index = match result {
            Ok(_) => self.index + 1,
            Err(_) => self.count,
        };
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.count - self.index))
    }
}

/// Fill `buf` as far as the stream allows. Returns the number of bytes read,
/// which is less than `buf.len()` only at end of stream.
fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
