//! Directory creation for extracted entries.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::Error;

/// Outcome of [`Materialize::ensure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirStatus {
    /// The directory (and possibly some ancestors) was created.
    Created,
    /// The directory was already there. Nothing was touched.
    Existed,
}

/// Makes sure a directory exists before entries are written into it.
///
/// Implementations must be idempotent: asking for an existing directory is
/// not an error. Any other failure is returned, never swallowed.
pub trait Materialize: Send + Sync {
    fn ensure(&self, path: &Path) -> Result<DirStatus, Error>;
}

/// Creates directories on the real filesystem, including missing ancestors.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsMaterializer;

impl Materialize for FsMaterializer {
    fn ensure(&self, path: &Path) -> Result<DirStatus, Error> {
        match fs::metadata(path) {
            Ok(m) if m.is_dir() => return Ok(DirStatus::Existed),
            Ok(_) => {
                return Err(Error::NotADirectory {
                    path: path.display().to_string(),
                })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::from_output(path, e)),
        }

        match fs::create_dir_all(path) {
            Ok(()) => Ok(DirStatus::Created),
            // An ancestor exists as a regular file
            Err(_) if path.ancestors().skip(1).any(|a| a.is_file()) => {
                Err(Error::NotADirectory {
                    path: path.display().to_string(),
                })
            }
            Err(e) => Err(Error::from_output(path, e)),
        }
    }
}
