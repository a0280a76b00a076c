//! Read-only integrity check.

use std::io::{Read, Seek};
use std::path::Path;

use crate::archive::PakArchive;
use crate::error::Error;
use crate::extractor::EntryFailure;
use crate::path::{archive_root, PathResolver};

#[derive(Debug, Default)]
pub struct VerifyReport {
    pub entries_verified: usize,
    pub bytes_verified: u64,
    pub failures: Vec<EntryFailure>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Check that every entry of an archive file has a safe name and a payload
/// that can be read in full. Nothing is written.
pub fn verify_file<P: AsRef<Path>>(path: P) -> Result<VerifyReport, Error> {
    let path = path.as_ref();
    let archive = PakArchive::open(path)?;
    let resolver = PathResolver::new(archive_root(path))?;
    verify(archive, &resolver)
}

/// Verify an already opened archive. Names are checked against `resolver`.
pub fn verify<R: Read + Seek>(
    mut archive: PakArchive<R>,
    resolver: &PathResolver,
) -> Result<VerifyReport, Error> {
    let entries = archive.parse()?.to_vec();
    let mut report = VerifyReport::default();

    for (index, entry) in entries.iter().enumerate() {
        let checked = resolver
            .resolve(&entry.name)
            .and_then(|_| archive.read_entry(entry));

        match checked {
            Ok(data) => {
                report.entries_verified += 1;
                report.bytes_verified += data.len() as u64;
            }
            Err(error) => {
                log::warn!("{}: {}", entry.name, error);
                report.failures.push(EntryFailure {
                    index,
                    entry: entry.name.clone(),
                    error,
                });
            }
        }
    }

    Ok(report)
}
