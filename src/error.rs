use std::io;

use thiserror::Error;

/// Errors that can occur while reading or extracting a PAK archive.
///
/// Open and parse failures are fatal for the whole run. Everything that goes
/// wrong with a single entry is collected in [`crate::Report::failures`]
/// instead of aborting the extraction.
///
/// This enum is marked `#[non_exhaustive]`; always include a catch-all arm
/// when matching.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The archive file does not exist.
    #[error("archive '{path}' not found")]
    NotFound { path: String },

    /// The header tag is not `PACK`.
    #[error("bad magic {found:?}: not a PACK archive")]
    BadMagic { found: [u8; 4] },

    /// Fewer bytes than a full header are available.
    #[error("archive header truncated: need {expected} bytes, got {actual}")]
    TruncatedHeader { expected: usize, actual: usize },

    /// A directory record came up short.
    #[error("directory table truncated at record {index} of {count}")]
    TruncatedDirectory { index: usize, count: usize },

    /// The directory table location lies outside the archive.
    #[error("directory table at offset {offset} (size {size}) lies outside the {archive_len}-byte archive")]
    CorruptOffset {
        offset: i32,
        size: i32,
        archive_len: u64,
    },

    /// Entry payload extends past the end of the archive.
    #[error("entry '{entry}' spans {size} bytes at offset {offset}, beyond the {archive_len}-byte archive")]
    OutOfBounds {
        entry: String,
        offset: i32,
        size: i32,
        archive_len: u64,
    },

    /// Fewer payload bytes were read than the directory declared.
    #[error("entry '{entry}': read {actual} of {expected} bytes")]
    ShortRead {
        entry: String,
        expected: u64,
        actual: u64,
    },

    #[error("entry '{entry}': seek to offset {offset} failed: {source}")]
    SeekFailed {
        entry: String,
        offset: u64,
        #[source]
        source: io::Error,
    },

    /// No directory entry has this exact name.
    #[error("entry '{entry}' not found in archive")]
    EntryNotFound { entry: String },

    /// Entry name would escape the extraction root, or is otherwise unusable.
    #[error("unsafe path '{entry}': {reason}")]
    UnsafePath { entry: String, reason: String },

    #[error("path '{entry}' is too long: {len} bytes (limit: {limit})")]
    PathTooLong {
        entry: String,
        len: usize,
        limit: usize,
    },

    #[error("permission denied: '{path}'")]
    PermissionDenied {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A path that must be a directory exists as something else.
    #[error("'{path}' exists and is not a directory")]
    NotADirectory { path: String },

    /// File already exists and the overwrite policy is `Error`.
    #[error("file '{entry}' already exists")]
    AlreadyExists { entry: String },

    /// Destination directory does not exist.
    #[error("destination directory '{path}' does not exist")]
    DestinationNotFound { path: String },

    #[error("file '{entry}' is {} (limit: {})", format_bytes(*.size), format_bytes(*.limit))]
    FileTooLarge { entry: String, limit: u64, size: u64 },

    #[error("extraction would write {}, exceeding the {} limit", format_bytes(*.would_be), format_bytes(*.limit))]
    TotalSizeExceeded { limit: u64, would_be: u64 },

    #[error("entry {attempted} would exceed the {limit} file limit")]
    FileCountExceeded { limit: usize, attempted: usize },

    #[error("path '{entry}' has {depth} directory levels (limit: {limit})")]
    PathTooDeep {
        entry: String,
        depth: usize,
        limit: usize,
    },

    /// Path jail error.
    #[error("path validation error: {0}")]
    Jail(#[from] path_jail::JailError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Classify an I/O failure that happened while touching `path` on the
    /// output side.
    pub(crate) fn from_output(path: &std::path::Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                path: path.display().to_string(),
                source,
            },
            _ => Self::Io(source),
        }
    }

    /// True for errors that describe a damaged container rather than a
    /// problem with one entry or with the output side.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::BadMagic { .. }
                | Self::TruncatedHeader { .. }
                | Self::TruncatedDirectory { .. }
                | Self::CorruptOffset { .. }
        )
    }
}

/// Format bytes in human-readable form (e.g., "1.5 MB").
pub(crate) fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
