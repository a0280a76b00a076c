/// Caps applied while extracting.
///
/// PAK entries are stored uncompressed, so the declared size is the number
/// of bytes that will be written. Limits are checked against it before the
/// payload is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum bytes written across all entries.
    pub max_total_bytes: u64,
    /// Maximum number of files written.
    pub max_file_count: usize,
    /// Maximum size of a single entry.
    pub max_single_file: u64,
    /// Maximum number of path components in an entry name.
    pub max_path_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_total_bytes: 4 * 1024 * 1024 * 1024, // 4 GB
            max_file_count: 100_000,
            max_single_file: 1024 * 1024 * 1024, // 1 GB
            max_path_depth: 32,
        }
    }
}
