//! safe_unpak CLI - Secure Quake PAK extraction
//!
//! # Examples
//!
//! ```bash
//! # Extract next to the archive
//! safe_unpak id1/pak0.pak
//!
//! # Extract somewhere else, only maps
//! safe_unpak id1/pak0.pak -d /tmp/out --include "maps/*.bsp"
//!
//! # List contents without extracting
//! safe_unpak id1/pak0.pak --list
//!
//! # Generate shell completions
//! safe_unpak --completions bash > ~/.bash_completion.d/safe_unpak
//! ```

use clap::{CommandFactory, Parser, ValueEnum};
use clap_complete::{generate, Shell};
use safe_unpak::{archive_root, Error, Extractor, Limits, OverwritePolicy, Report};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "safe_unpak",
    about = "Secure Quake PAK extraction - blocks path traversal and out-of-bounds entries",
    version,
    after_help = "EXAMPLES:
    safe_unpak id1/pak0.pak
    safe_unpak id1/pak0.pak -d /tmp/out --include 'maps/*.bsp'
    safe_unpak id1/pak0.pak --list"
)]
struct Cli {
    /// PAK archive to extract
    archive: Option<PathBuf>,

    /// Destination directory (default: the archive's own directory)
    #[arg(short, long)]
    dest: Option<PathBuf>,

    /// List contents without extracting
    #[arg(short, long)]
    list: bool,

    /// Check every entry's name and bounds without extracting
    #[arg(long)]
    verify: bool,

    /// Generate shell completions for the specified shell
    #[arg(long, value_enum)]
    completions: Option<Shell>,

    /// Maximum total size to extract (e.g., 100M, 1G)
    #[arg(long, value_parser = parse_size)]
    max_size: Option<u64>,

    /// Maximum number of files to extract
    #[arg(long)]
    max_files: Option<usize>,

    /// Maximum size of a single file (e.g., 50M)
    #[arg(long, value_parser = parse_size)]
    max_single_file: Option<u64>,

    /// Maximum directory depth
    #[arg(long)]
    max_depth: Option<usize>,

    /// Extract only files matching glob patterns (can be repeated)
    #[arg(long = "include", value_name = "PATTERN")]
    include_patterns: Vec<String>,

    /// Exclude files matching glob patterns (can be repeated)
    #[arg(long = "exclude", value_name = "PATTERN")]
    exclude_patterns: Vec<String>,

    /// Extract only specific entries by stored name (can be repeated)
    #[arg(long = "only", value_name = "NAME")]
    only_files: Vec<String>,

    /// What to do if file already exists
    #[arg(long, value_enum, default_value_t = OverwriteMode::Overwrite)]
    overwrite: OverwriteMode,

    /// Quiet mode - only show errors
    #[arg(short, long)]
    quiet: bool,

    /// Verbose mode - show progress for each entry
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OverwriteMode {
    /// Fail the entry if the file exists
    Error,
    /// Skip existing files
    Skip,
    /// Overwrite existing files
    Overwrite,
}

fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim().to_uppercase();
    let (num, multiplier) = if s.ends_with("G") || s.ends_with("GB") {
        let num_str = s.trim_end_matches("GB").trim_end_matches('G');
        (num_str, 1024 * 1024 * 1024)
    } else if s.ends_with("M") || s.ends_with("MB") {
        let num_str = s.trim_end_matches("MB").trim_end_matches('M');
        (num_str, 1024 * 1024)
    } else if s.ends_with("K") || s.ends_with("KB") {
        let num_str = s.trim_end_matches("KB").trim_end_matches('K');
        (num_str, 1024)
    } else {
        (s.as_str(), 1)
    };

    let n = num
        .parse::<u64>()
        .map_err(|_| format!("Invalid size: {}", s))?;
    n.checked_mul(multiplier)
        .ok_or_else(|| format!("Size too large: {}", s))
}

fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        log::LevelFilter::Warn
    } else if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false)
        .parse_default_env()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Handle completions generation
    if let Some(shell) = cli.completions {
        generate(shell, &mut Cli::command(), "safe_unpak", &mut io::stdout());
        return ExitCode::SUCCESS;
    }

    let Some(archive) = cli.archive.clone() else {
        eprintln!("Usage: safe_unpak <ARCHIVE> [OPTIONS]");
        eprintln!("Try 'safe_unpak --help' for more information.");
        return ExitCode::from(2);
    };

    init_logging(&cli);

    match run(&cli, &archive) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", format_error(&e));
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every entry went through cleanly.
fn run(cli: &Cli, archive: &Path) -> Result<bool, Error> {
    if cli.list {
        list_archive(archive, cli.quiet)?;
        return Ok(true);
    }

    if cli.verify {
        return verify_archive(archive, cli.quiet);
    }

    let limits = Limits {
        max_total_bytes: cli.max_size.unwrap_or(Limits::default().max_total_bytes),
        max_file_count: cli.max_files.unwrap_or(Limits::default().max_file_count),
        max_single_file: cli
            .max_single_file
            .unwrap_or(Limits::default().max_single_file),
        max_path_depth: cli.max_depth.unwrap_or(Limits::default().max_path_depth),
    };

    let overwrite = match cli.overwrite {
        OverwriteMode::Error => OverwritePolicy::Error,
        OverwriteMode::Skip => OverwritePolicy::Skip,
        OverwriteMode::Overwrite => OverwritePolicy::Overwrite,
    };

    let dest = cli
        .dest
        .clone()
        .unwrap_or_else(|| archive_root(archive));

    let mut extractor = Extractor::new_or_create(&dest)?
        .limits(limits)
        .overwrite(overwrite);

    // Apply filters
    if !cli.only_files.is_empty() {
        extractor = extractor.only(&cli.only_files);
    }
    if !cli.include_patterns.is_empty() {
        extractor = extractor.include_glob(&cli.include_patterns);
    }
    if !cli.exclude_patterns.is_empty() {
        extractor = extractor.exclude_glob(&cli.exclude_patterns);
    }

    if cli.verbose {
        extractor = extractor.on_progress(|p| {
            println!(
                "[{}/{}] {}",
                p.entry_index + 1,
                p.total_entries,
                p.entry_name
            );
        });
    }

    let report = extractor.extract_file(archive)?;

    if !cli.quiet {
        print_summary(&report, &dest);
    }

    Ok(report.is_complete())
}

fn print_summary(report: &Report, dest: &Path) {
    println!(
        "Extracted {} of {} files ({}) to {}",
        report.files_extracted,
        report.entries_total,
        format_bytes(report.bytes_written),
        dest.display()
    );
    if report.entries_skipped > 0 {
        println!("Skipped {} entries", report.entries_skipped);
    }
    if !report.failures.is_empty() {
        println!("Failed {} entries:", report.failures.len());
        for failure in &report.failures {
            println!("  [{}] {}: {}", failure.index, failure.entry, format_error(&failure.error));
        }
    }
}

fn list_archive(path: &Path, quiet: bool) -> Result<(), Error> {
    let entries = safe_unpak::list_entries(path)?;

    if !quiet {
        println!("{} entries in {}:", entries.len(), path.display());
        println!();
    }

    let mut total_size = 0u64;
    for entry in &entries {
        println!(
            "{:>10}  {:>10}  {}",
            format_bytes(entry.size.max(0) as u64),
            entry.offset,
            entry.name
        );
        total_size += entry.size.max(0) as u64;
    }

    if !quiet {
        println!();
        println!(
            "Total: {} files, {}",
            entries.len(),
            format_bytes(total_size)
        );
    }

    Ok(())
}

fn verify_archive(path: &Path, quiet: bool) -> Result<bool, Error> {
    if !quiet {
        println!("Verifying {}...", path.display());
    }

    let report = safe_unpak::verify_file(path)?;

    if !quiet {
        println!(
            "✓ Verified {} entries ({})",
            report.entries_verified,
            format_bytes(report.bytes_verified)
        );
    }
    for failure in &report.failures {
        println!("✗ [{}] {}: {}", failure.index, failure.entry, format_error(&failure.error));
    }

    Ok(report.is_ok())
}

fn format_bytes(bytes: u64) -> String {
    if bytes >= 1024 * 1024 * 1024 {
        format!("{:.1}G", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    } else if bytes >= 1024 * 1024 {
        format!("{:.1}M", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1}K", bytes as f64 / 1024.0)
    } else {
        format!("{}B", bytes)
    }
}

fn format_error(e: &Error) -> String {
    match e {
        Error::UnsafePath { entry, reason } => {
            format!("Path traversal blocked in '{}': {}", entry, reason)
        }
        Error::BadMagic { .. } => "Not a PAK archive (bad magic)".to_string(),
        Error::OutOfBounds {
            entry,
            offset,
            size,
            archive_len,
        } => {
            format!(
                "Entry '{}' ({} bytes at {}) runs past the end of the {} archive",
                entry,
                size,
                offset,
                format_bytes(*archive_len)
            )
        }
        Error::FileTooLarge { entry, size, limit } => {
            format!(
                "File '{}' too large: {} (limit: {})",
                entry,
                format_bytes(*size),
                format_bytes(*limit)
            )
        }
        Error::FileCountExceeded { limit, .. } => {
            format!("Too many files (limit: {})", limit)
        }
        Error::AlreadyExists { entry } => {
            format!("File already exists: {}", entry)
        }
        _ => e.to_string(),
    }
}
