//! Mapping stored entry names onto the filesystem.
//!
//! Stored names are relative and use `/` separators. Resolution validates the
//! name, then joins it under the extraction root using host separators.

use std::path::{Component, Path, PathBuf};

use path_jail::Jail;

use crate::error::Error;

/// Longest stored name accepted by [`PathResolver::resolve`], and the width
/// [`split_directory`] truncates its directory part to.
pub const MAX_PATH_LEN: usize = 1024;

/// Longest single path component accepted.
pub const MAX_COMPONENT_LEN: usize = 255;

/// Longest joined destination path accepted.
pub const MAX_RESOLVED_LEN: usize = 4096;

/// Destination of one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// File to write.
    pub path: PathBuf,
    /// Directory that must exist before writing. Equals the root for
    /// top-level entries.
    pub parent: PathBuf,
}

/// Split a stored name at its last `/` into `(directory, base_name)`.
///
/// With no `/` the directory part is empty. The directory part is cut to at
/// most [`MAX_PATH_LEN`] bytes, backing off to the previous UTF-8 character
/// boundary.
///
/// ```
/// use safe_unpak::split_directory;
///
/// assert_eq!(split_directory("maps/e1m1.bsp"), ("maps", "e1m1.bsp"));
/// assert_eq!(split_directory("default.cfg"), ("", "default.cfg"));
/// ```
pub fn split_directory(name: &str) -> (&str, &str) {
    let (dir, base) = match name.rfind('/') {
        Some(i) => (&name[..i], &name[i + 1..]),
        None => ("", name),
    };
    (truncate_to_boundary(dir, MAX_PATH_LEN), base)
}

fn truncate_to_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Default extraction root for an archive: the directory that contains it,
/// or `.` when the path has no directory component.
pub fn archive_root(archive_path: &Path) -> PathBuf {
    match archive_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Resolves entry names into destinations under a fixed root.
pub struct PathResolver {
    root: PathBuf,
    jail: Jail,
}

impl PathResolver {
    /// The root must already exist.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, Error> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(Error::DestinationNotFound {
                path: root.display().to_string(),
            });
        }
        let jail = Jail::new(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            jail,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate `name` and compute its destination.
    pub fn resolve(&self, name: &str) -> Result<ResolvedPath, Error> {
        validate_name(name)?;

        // Jail may resolve symlinks, so its result is only used as a check.
        // The destination is built from the root as given.
        self.jail.join(name).map_err(|e| Error::UnsafePath {
            entry: name.to_string(),
            reason: e.to_string(),
        })?;

        let (dir, _) = split_directory(name);
        let path = join_segments(&self.root, name);
        let parent = join_segments(&self.root, dir);

        let len = path.as_os_str().len();
        if len > MAX_RESOLVED_LEN {
            return Err(Error::PathTooLong {
                entry: name.to_string(),
                len,
                limit: MAX_RESOLVED_LEN,
            });
        }

        Ok(ResolvedPath { path, parent })
    }
}

fn join_segments(root: &Path, name: &str) -> PathBuf {
    let mut out = root.to_path_buf();
    for segment in name.split('/').filter(|s| !s.is_empty() && *s != ".") {
        out.push(segment);
    }
    out
}

/// Syntactic checks on a stored name.
fn validate_name(name: &str) -> Result<(), Error> {
    let unsafe_path = |reason: &str| Error::UnsafePath {
        entry: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(unsafe_path("empty filename"));
    }

    // Includes NUL
    if name.chars().any(|c| c.is_control()) {
        return Err(unsafe_path("contains control characters"));
    }

    // Windows separator could bypass the '/' based checks below
    if name.contains('\\') {
        return Err(unsafe_path("contains backslash"));
    }

    if name.starts_with('/') {
        return Err(unsafe_path("absolute path"));
    }

    if name.split('/').any(|segment| segment == "..") {
        return Err(unsafe_path("parent directory traversal"));
    }

    // Would resolve to a directory, not a file
    if matches!(name.rsplit('/').next(), Some("" | ".")) {
        return Err(unsafe_path("no file name"));
    }

    // Marks bytes that were not valid UTF-8 in the stored name
    if name.contains(char::REPLACEMENT_CHARACTER) {
        return Err(unsafe_path("name is not valid UTF-8"));
    }

    if Path::new(name)
        .components()
        .any(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
        || name.as_bytes().get(1) == Some(&b':')
    {
        return Err(unsafe_path("drive or root prefix"));
    }

    if name.len() > MAX_PATH_LEN {
        return Err(Error::PathTooLong {
            entry: name.to_string(),
            len: name.len(),
            limit: MAX_PATH_LEN,
        });
    }

    if let Some(component) = name.split('/').find(|c| c.len() > MAX_COMPONENT_LEN) {
        return Err(Error::PathTooLong {
            entry: name.to_string(),
            len: component.len(),
            limit: MAX_COMPONENT_LEN,
        });
    }

    Ok(())
}
