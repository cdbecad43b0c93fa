//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    pkg_version: &'static str,
    config_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                pkg_version: env!("CARGO_PKG_VERSION"),
                config_filename: format!(".{pkg}.toml"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// `name/version`, stamped into digest metadata.
    pub fn generator_version(&self) -> String {
        format!("{}/{}", self.pkg_name, self.pkg_version)
    }

    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }
}

// ---- Digest run defaults ----

/// Defaults for a digest run when neither options nor config set a value.
pub struct DigestDefaults;

impl DigestDefaults {
    pub const MAX_FILES: usize = 5000;
    pub const MAX_TOKENS: usize = 16_000;
    /// Scanner ceiling is `max_files * SCAN_ENTRY_MULTIPLIER`.
    pub const SCAN_ENTRY_MULTIPLIER: usize = 10;
    /// Scan progress is forwarded to the caller at most once per interval.
    pub const SCAN_PROGRESS_INTERVAL: Duration = Duration::from_millis(250);
    /// Memory reported in progress events is resampled at most once per interval.
    pub const MEMORY_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);
    pub const TRUNCATION_MAX_ITERATIONS: usize = 6;
    /// Truncation stops shrinking once content is at or below this many chars.
    pub const TRUNCATION_MIN_CHARS: usize = 128;
    /// Lower bound on the per-iteration shrink ratio.
    pub const TRUNCATION_MIN_RATIO: f64 = 0.1;
    /// Lines kept in the placeholder emitted once the budget is exhausted.
    pub const EXHAUSTED_PLACEHOLDER_LINES: usize = 50;
    pub const TRUNCATION_MARKER: &'static str = "[[TRUNCATED]]";
    pub const TOKEN_ADAPTER: &'static str = "heuristic";
    /// Analyzer warns once a single string reaches this share of the budget.
    pub const BUDGET_WARN_RATIO: f64 = 0.9;
}

// ---- Content ----

/// Content reading and classification thresholds.
pub struct ContentConsts;

impl ContentConsts {
    /// Files larger than this are skipped (bytes). 10 MB.
    pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
    /// Files larger than this are read with a chunked reader (bytes). 1 MB.
    pub const STREAM_THRESHOLD: u64 = 1024 * 1024;
    /// Chunk size for the chunked reader (bytes). 64 KB.
    pub const READ_CHUNK_SIZE: usize = 64 * 1024;
    /// Leading bytes inspected for binary detection.
    pub const BINARY_SNIFF_BYTES: usize = 8 * 1024;
    /// Share of control bytes in the sniff window above which a file is binary.
    pub const BINARY_CONTROL_RATIO: f64 = 0.3;
}

// ---- Notebooks ----

pub struct NotebookConsts;

impl NotebookConsts {
    /// Non-text outputs above this decoded size are replaced by a placeholder (bytes). 200 KB.
    pub const NON_TEXT_OUTPUT_MAX_BYTES: usize = 200 * 1024;
    pub const CELL_SEPARATOR: &'static str = "\n\n";
    pub const UNPARSEABLE_PLACEHOLDER: &'static str =
        "[[Notebook could not be parsed: unable to parse notebook JSON]]";
}

// ---- Hashing ----

/// Hashing I/O thresholds and buffer sizes.
pub struct HashingConsts;

impl HashingConsts {
    /// File size above which hashing uses memory-mapped I/O (bytes). 100 MB.
    pub const HASH_MMAP_THRESHOLD: u64 = 100 * 1024 * 1024;
    /// Chunk size for reading files below mmap threshold (bytes). 1 MB.
    pub const HASH_READ_CHUNK_SIZE: usize = 1024 * 1024;
}

// ---- Token cache ----

/// Entries kept in the process-wide token cache before it is cleared.
pub const TOKEN_CACHE_CAPACITY: usize = 10_000;

// ---- Walk ----

/// Version-control directories the scanner never descends into.
pub const VCS_DIRS: [&str; 3] = [".git", ".hg", ".svn"];
