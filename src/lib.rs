//! Secure extraction of Quake `.pak` archives.
//!
//! A PAK file is a 12-byte header, a flat directory of 64-byte records, and
//! the uncompressed payloads they point at. This crate parses that layout
//! defensively and writes entries out under a destination directory, refusing
//! names that would escape it and payloads that run past the end of the file.
//!
//! ```no_run
//! // Extract next to the archive
//! let report = safe_unpak::extract_file("id1/pak0.pak")?;
//! println!("{} files, {} failed", report.files_extracted, report.entries_failed());
//! # Ok::<(), safe_unpak::Error>(())
//! ```

mod archive;
mod error;
mod extractor;
pub mod format;
mod limits;
mod materialize;
mod path;
mod verify;

use std::path::Path;

pub use archive::{Directory, PakArchive};
pub use error::Error;
pub use extractor::{EntryFailure, Extractor, OverwritePolicy, Progress, Report};
pub use format::{PakEntry, PakHeader};
pub use limits::Limits;
pub use materialize::{DirStatus, FsMaterializer, Materialize};
pub use path::{
    archive_root, split_directory, PathResolver, ResolvedPath, MAX_COMPONENT_LEN, MAX_PATH_LEN,
    MAX_RESOLVED_LEN,
};
pub use verify::{verify, verify_file, VerifyReport};

/// Extract an archive into the directory that contains it, with default
/// settings.
pub fn extract_file<P: AsRef<Path>>(archive_path: P) -> Result<Report, Error> {
    let archive_path = archive_path.as_ref();
    let archive = PakArchive::open(archive_path)?;
    Extractor::new(archive_root(archive_path))?.extract(archive)
}

/// Extract an archive into `destination` with default settings, creating the
/// destination if needed.
pub fn extract_file_to<P: AsRef<Path>, F: AsRef<Path>>(
    destination: P,
    archive_path: F,
) -> Result<Report, Error> {
    Extractor::new_or_create(destination)?.extract_file(archive_path)
}

/// Parse an archive's directory without extracting anything.
pub fn list_entries<P: AsRef<Path>>(archive_path: P) -> Result<Vec<PakEntry>, Error> {
    let mut archive = PakArchive::open(archive_path)?;
    Ok(archive.parse()?.to_vec())
}
