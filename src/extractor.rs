use std::fs;
use std::io::{self, Read, Seek, Write};
use std::path::Path;

use crate::archive::PakArchive;
use crate::error::{format_bytes, Error};
use crate::format::PakEntry;
use crate::limits::Limits;
use crate::materialize::{DirStatus, FsMaterializer, Materialize};
use crate::path::PathResolver;

/// What to do when a file already exists at the extraction path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverwritePolicy {
    /// Record an [`Error::AlreadyExists`] failure for the entry.
    Error,
    /// Leave the existing file alone and count the entry as skipped.
    Skip,
    /// Truncate and rewrite. Symlinks are removed first so the write cannot
    /// follow them. Running the same extraction twice yields the same tree.
    #[default]
    Overwrite,
}

/// Passed to the [`Extractor::on_progress`] callback before each entry.
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    pub entry_index: usize,
    pub total_entries: usize,
    pub entry_name: &'a str,
}

/// An entry that could not be extracted.
#[derive(Debug)]
pub struct EntryFailure {
    /// Position in the directory table.
    pub index: usize,
    pub entry: String,
    pub error: Error,
}

/// Outcome of an extraction run.
#[derive(Debug, Default)]
pub struct Report {
    /// Directory entries seen, including skipped and failed ones.
    pub entries_total: usize,
    pub files_extracted: usize,
    pub dirs_created: usize,
    pub bytes_written: u64,
    /// Entries left out by a filter or by [`OverwritePolicy::Skip`].
    pub entries_skipped: usize,
    /// Per-entry failures, in directory order.
    pub failures: Vec<EntryFailure>,
}

impl Report {
    pub fn entries_failed(&self) -> usize {
        self.failures.len()
    }

    /// True when no entry failed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

type EntryFilter = Box<dyn Fn(&PakEntry) -> bool + Send + Sync>;
type ProgressFn = Box<dyn Fn(&Progress) + Send + Sync>;

/// Extracts PAK archives into a destination directory.
///
/// Entries are processed in directory order. A failure on one entry is
/// logged, recorded in [`Report::failures`] and extraction moves on to the
/// next; only open and parse errors abort the run.
///
/// # Example
///
/// ```no_run
/// use safe_unpak::{Extractor, Limits};
///
/// let report = Extractor::new_or_create("/tmp/id1")?
///     .limits(Limits { max_single_file: 64 * 1024 * 1024, ..Default::default() })
///     .include_glob(&["maps/*.bsp"])
///     .extract_file("pak0.pak")?;
///
/// for failure in &report.failures {
///     eprintln!("{}: {}", failure.entry, failure.error);
/// }
/// # Ok::<(), safe_unpak::Error>(())
/// ```
pub struct Extractor {
    resolver: PathResolver,
    materializer: Box<dyn Materialize>,
    limits: Limits,
    overwrite: OverwritePolicy,
    filters: Vec<EntryFilter>,
    progress: Option<ProgressFn>,
}

impl Extractor {
    /// Create an extractor for the given destination directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DestinationNotFound`] if the destination doesn't exist.
    /// Use [`Self::new_or_create`] to create it automatically.
    pub fn new<P: AsRef<Path>>(destination: P) -> Result<Self, Error> {
        Self::new_impl(destination.as_ref(), false)
    }

    /// Create an extractor, creating the destination directory if it doesn't
    /// exist.
    pub fn new_or_create<P: AsRef<Path>>(destination: P) -> Result<Self, Error> {
        Self::new_impl(destination.as_ref(), true)
    }

    fn new_impl(destination: &Path, create: bool) -> Result<Self, Error> {
        if !destination.exists() {
            if create {
                fs::create_dir_all(destination)
                    .map_err(|e| Error::from_output(destination, e))?;
            } else {
                return Err(Error::DestinationNotFound {
                    path: destination.to_string_lossy().to_string(),
                });
            }
        }

        Ok(Self {
            resolver: PathResolver::new(destination)?,
            materializer: Box::new(FsMaterializer),
            limits: Limits::default(),
            overwrite: OverwritePolicy::default(),
            filters: Vec::new(),
            progress: None,
        })
    }

    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn overwrite(mut self, policy: OverwritePolicy) -> Self {
        self.overwrite = policy;
        self
    }

    /// Replace the directory creation backend.
    pub fn materializer<M: Materialize + 'static>(mut self, materializer: M) -> Self {
        self.materializer = Box::new(materializer);
        self
    }

    /// Only extract entries for which `f` returns true. Filters stack: an
    /// entry must pass all of them.
    pub fn filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&PakEntry) -> bool + Send + Sync + 'static,
    {
        self.filters.push(Box::new(f));
        self
    }

    /// Only extract entries whose stored name is one of `names`.
    pub fn only<S: AsRef<str>>(self, names: &[S]) -> Self {
        let names: Vec<String> = names.iter().map(|s| s.as_ref().to_string()).collect();
        self.filter(move |e| names.iter().any(|n| *n == e.name))
    }

    /// Only extract entries matching at least one glob pattern.
    pub fn include_glob<S: AsRef<str>>(self, patterns: &[S]) -> Self {
        let patterns: Vec<String> = patterns.iter().map(|s| s.as_ref().to_string()).collect();
        self.filter(move |e| patterns.iter().any(|p| glob_match::glob_match(p, &e.name)))
    }

    /// Skip entries matching any glob pattern.
    pub fn exclude_glob<S: AsRef<str>>(self, patterns: &[S]) -> Self {
        let patterns: Vec<String> = patterns.iter().map(|s| s.as_ref().to_string()).collect();
        self.filter(move |e| !patterns.iter().any(|p| glob_match::glob_match(p, &e.name)))
    }

    pub fn on_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(&Progress) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(f));
        self
    }

    /// Extract from an archive file path.
    pub fn extract_file<P: AsRef<Path>>(&self, path: P) -> Result<Report, Error> {
        self.extract(PakArchive::open(path)?)
    }

    /// Parse `archive` and extract every entry.
    ///
    /// The archive is consumed and its stream closed when this returns.
    pub fn extract<R: Read + Seek>(&self, mut archive: PakArchive<R>) -> Result<Report, Error> {
        let entries = archive.parse()?.to_vec();
        let total_entries = entries.len();
        let mut report = Report {
            entries_total: total_entries,
            ..Report::default()
        };

        for (index, entry) in entries.iter().enumerate() {
            if !self.filters.iter().all(|f| f(entry)) {
                report.entries_skipped += 1;
                continue;
            }

            if let Some(ref progress) = self.progress {
                progress(&Progress {
                    entry_index: index,
                    total_entries,
                    entry_name: &entry.name,
                });
            }

            if let Err(error) = self.extract_entry(&mut archive, entry, &mut report) {
                log::warn!("{}: {}", entry.name, error);
                report.failures.push(EntryFailure {
                    index,
                    entry: entry.name.clone(),
                    error,
                });
            }
        }

        Ok(report)
    }

    fn extract_entry<R: Read + Seek>(
        &self,
        archive: &mut PakArchive<R>,
        entry: &PakEntry,
        report: &mut Report,
    ) -> Result<(), Error> {
        // 1. Limits, on declared sizes, before anything is read
        self.check_limits(entry, report)?;

        // 2. Destination (rejects traversal before any allocation)
        let resolved = self.resolver.resolve(&entry.name)?;

        // 3. Payload
        let data = archive.read_entry(entry)?;

        // 4. Parent directory
        if self.materializer.ensure(&resolved.parent)? == DirStatus::Created {
            log::info!("mkdir {}", resolved.parent.display());
            report.dirs_created += 1;
        }

        // 5. Write
        let Some(mut outfile) = self.open_for_write(&resolved.path, report)? else {
            log::info!("skipping {} (file exists)", resolved.path.display());
            return Ok(());
        };
        outfile
            .write_all(&data)
            .map_err(|e| Error::from_output(&resolved.path, e))?;

        log::info!(
            "extracted {} ({})",
            resolved.path.display(),
            format_bytes(data.len() as u64)
        );
        report.bytes_written += data.len() as u64;
        report.files_extracted += 1;
        Ok(())
    }

    fn check_limits(&self, entry: &PakEntry, report: &Report) -> Result<(), Error> {
        let depth = entry
            .name
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .count();
        if depth > self.limits.max_path_depth {
            return Err(Error::PathTooDeep {
                entry: entry.name.clone(),
                depth,
                limit: self.limits.max_path_depth,
            });
        }

        if report.files_extracted >= self.limits.max_file_count {
            return Err(Error::FileCountExceeded {
                limit: self.limits.max_file_count,
                attempted: report.files_extracted + 1,
            });
        }

        // Negative sizes are left for the bounds check in read_entry
        let size = entry.size.max(0) as u64;
        if size > self.limits.max_single_file {
            return Err(Error::FileTooLarge {
                entry: entry.name.clone(),
                limit: self.limits.max_single_file,
                size,
            });
        }

        let would_be = report.bytes_written + size;
        if would_be > self.limits.max_total_bytes {
            return Err(Error::TotalSizeExceeded {
                limit: self.limits.max_total_bytes,
                would_be,
            });
        }

        Ok(())
    }

    /// Open a file for writing based on the overwrite policy.
    /// Returns None if the file should be skipped.
    fn open_for_write(&self, path: &Path, report: &mut Report) -> Result<Option<fs::File>, Error> {
        match self.overwrite {
            OverwritePolicy::Error => {
                // create_new(true) is atomic: fails if file exists (no TOCTOU)
                match fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(path)
                {
                    Ok(f) => Ok(Some(f)),
                    Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                        Err(Error::AlreadyExists {
                            entry: path.display().to_string(),
                        })
                    }
                    Err(e) => Err(Error::from_output(path, e)),
                }
            }
            OverwritePolicy::Skip => {
                match fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(path)
                {
                    Ok(f) => Ok(Some(f)),
                    Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                        report.entries_skipped += 1;
                        Ok(None)
                    }
                    Err(e) => Err(Error::from_output(path, e)),
                }
            }
            OverwritePolicy::Overwrite => {
                if let Ok(m) = fs::symlink_metadata(path) {
                    if m.file_type().is_symlink() {
                        fs::remove_file(path).map_err(|e| Error::from_output(path, e))?;
                    }
                }
                fs::File::create(path)
                    .map(Some)
                    .map_err(|e| Error::from_output(path, e))
            }
        }
    }
}
