//! Public and internal types for the repodigest API and pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::pipeline::cancel::CancellationToken;
use crate::utils::config::{ContentConsts, DigestDefaults, NotebookConsts};

/// What to do with files classified as binary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BinaryPolicy {
    /// Leave the file out of the digest.
    #[default]
    Skip,
    /// Embed the raw bytes base64-encoded.
    Base64,
    /// Emit a fixed placeholder line instead of the bytes.
    Placeholder,
}

/// Rendered output format.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
    /// One JSON record per line: metadata, summary, each file, statistics.
    Ndjson,
    Text,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutputFormat::Markdown => "markdown",
            OutputFormat::Json => "json",
            OutputFormat::Ndjson => "ndjson",
            OutputFormat::Text => "text",
        };
        f.write_str(s)
    }
}

/// Kind of node produced by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
    /// A symlink that was not followed.
    Symlink,
}

/// One entry discovered by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanNode {
    /// Absolute path.
    pub path: PathBuf,
    /// Path relative to the workspace root, forward slashes.
    pub rel_path: String,
    pub kind: NodeKind,
    /// True when the entry itself is a symlink (followed or not).
    pub is_symlink: bool,
}

/// A filtered-in file slated for processing. Lives for one run only.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub absolute_path: PathBuf,
    pub relative_path: String,
    pub source_node: ScanNode,
}

/// Per-cell and per-output counts for a processed notebook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotebookStats {
    pub code_cells: usize,
    pub markdown_cells: usize,
    pub raw_cells: usize,
    pub outputs: OutputCounts,
}

/// Notebook outputs split by how they were rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputCounts {
    pub text: usize,
    pub non_text: usize,
    pub skipped: usize,
}

/// Optional per-file metadata. Only populated when the run asks for metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<usize>,
    /// Blake3 hex digest of the raw bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notebook: Option<NotebookStats>,
}

/// The durable unit of digest output. Immutable once placed into a [`DigestResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedFileContent {
    pub path: PathBuf,
    pub relative_path: String,
    pub tokens: usize,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_id: Option<String>,
    pub encoding: String,
    pub truncated: bool,
    pub redacted: bool,
    pub metadata: FileMetadata,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

/// Run-level header, created once when the run completes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestMetadata {
    /// RFC 3339 timestamp of when the run started.
    pub started_at: String,
    /// RFC 3339 timestamp of when the result was assembled.
    pub generated_at: String,
    pub workspace_root: String,
    /// Candidates left after filtering, before the file-count cap.
    pub total_files: usize,
    pub included_files: usize,
    /// Candidates that did not make it into `files` (cap, binary skip, failure).
    pub skipped_files: usize,
    pub total_tokens: usize,
    pub max_tokens: usize,
    pub processing_time_ms: u64,
    pub redaction_applied: bool,
    pub generator_version: String,
}

/// Table-of-contents row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TocEntry {
    pub path: String,
    pub tokens: usize,
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestSummary {
    pub total_files: usize,
    pub total_tokens: usize,
    pub truncated_files: usize,
    /// One row per file, sorted by path.
    pub table_of_contents: Vec<TocEntry>,
    /// Deduplicated run warnings.
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestContent {
    pub files: Vec<ProcessedFileContent>,
    pub summary: DigestSummary,
    pub metadata: DigestMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestStatistics {
    pub files_processed: usize,
    pub total_tokens: usize,
    pub processing_time_ms: u64,
    /// Deduplicated, encounter order.
    pub warnings: Vec<String>,
    /// Every per-file error, encounter order, not deduplicated.
    pub errors: Vec<String>,
}

/// Top-level aggregate handed to the caller. Never mutated after the pipeline returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestResult {
    pub content: DigestContent,
    pub statistics: DigestStatistics,
    pub redaction_applied: bool,
    pub truncation_applied: bool,
}

/// Pipeline phase reported through the progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Scanning,
    Processing,
    /// Emitted once per file right before its token analysis.
    Analyzing,
    Generating,
    Formatting,
    Complete,
}

/// Snapshot passed to the caller's progress callback.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub phase: Phase,
    pub files_processed: usize,
    pub total_files: usize,
    pub tokens_processed: usize,
    pub current_file: Option<String>,
    pub time_elapsed_ms: u64,
    pub estimated_time_remaining_ms: Option<u64>,
    /// Resident set size of this process, in bytes.
    pub memory_usage: Option<u64>,
}

/// Caller-supplied progress callback. Panics inside it are swallowed by the pipeline.
pub type ProgressCallback = Arc<dyn Fn(&Progress) + Send + Sync>;

/// Per-call options for [`generate_digest`](crate::generate_digest).
#[derive(Clone)]
pub struct DigestOptions {
    /// Restrict the digest to these files or directories (absolute or root-relative).
    /// Empty means the whole workspace.
    pub selected_files: Vec<PathBuf>,
    /// Host workspace folders; the first one is a fallback workspace root.
    pub workspace_folders: Vec<PathBuf>,
    pub output_format: OutputFormat,
    pub max_files: Option<usize>,
    pub max_tokens: Option<usize>,
    pub include_metadata: bool,
    pub apply_redaction: bool,
    /// Force redaction off regardless of `apply_redaction`.
    pub redaction_override: bool,
    pub on_progress: Option<ProgressCallback>,
    pub cancel: Option<CancellationToken>,
}

impl Default for DigestOptions {
    fn default() -> Self {
        Self {
            selected_files: Vec::new(),
            workspace_folders: Vec::new(),
            output_format: OutputFormat::default(),
            max_files: None,
            max_tokens: None,
            include_metadata: true,
            apply_redaction: false,
            redaction_override: false,
            on_progress: None,
            cancel: None,
        }
    }
}

impl fmt::Debug for DigestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestOptions")
            .field("selected_files", &self.selected_files)
            .field("workspace_folders", &self.workspace_folders)
            .field("output_format", &self.output_format)
            .field("max_files", &self.max_files)
            .field("max_tokens", &self.max_tokens)
            .field("include_metadata", &self.include_metadata)
            .field("apply_redaction", &self.apply_redaction)
            .field("redaction_override", &self.redaction_override)
            .field("on_progress", &self.on_progress.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

/// Validated configuration snapshot. Loaded from `.repodigest.toml` (CLI) or built in code (lib).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    /// Glob patterns a file must match to be included. Empty means everything.
    pub include_patterns: Vec<String>,
    /// Glob patterns that exclude a file.
    pub exclude_patterns: Vec<String>,
    pub use_gitignore: bool,
    pub follow_symlinks: bool,
    pub max_files: Option<usize>,
    pub max_depth: Option<usize>,
    pub max_tokens: Option<usize>,
    /// Files above this size (bytes) are skipped.
    pub max_file_size: u64,
    /// Files above this size (bytes) are read in chunks.
    pub stream_threshold: u64,
    pub binary_policy: BinaryPolicy,
    pub output_format: OutputFormat,
    pub workspace_root: Option<PathBuf>,
    pub include_code_cells: bool,
    pub include_markdown_cells: bool,
    pub include_outputs: bool,
    pub include_non_text_outputs: bool,
    pub non_text_output_max_bytes: usize,
    /// When false, notebook markdown cells are flattened to plain text.
    pub preserve_notebook_formatting: bool,
    /// Joins flattened notebook cells.
    pub notebook_cell_separator: String,
    /// Token adapter preference list, first available wins.
    pub token_adapters: Vec<String>,
    /// Worker count for per-file processing. 1 keeps budget bookkeeping strictly sequential.
    pub concurrency: usize,
    pub redact: bool,
    pub detect_language: bool,
    pub truncation_max_iterations: usize,
    /// Walk with jwalk instead of walkdir.
    pub parallel_walk: bool,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            use_gitignore: true,
            follow_symlinks: false,
            max_files: None,
            max_depth: None,
            max_tokens: None,
            max_file_size: ContentConsts::MAX_FILE_SIZE,
            stream_threshold: ContentConsts::STREAM_THRESHOLD,
            binary_policy: BinaryPolicy::default(),
            output_format: OutputFormat::default(),
            workspace_root: None,
            include_code_cells: true,
            include_markdown_cells: true,
            include_outputs: true,
            include_non_text_outputs: false,
            non_text_output_max_bytes: NotebookConsts::NON_TEXT_OUTPUT_MAX_BYTES,
            preserve_notebook_formatting: true,
            notebook_cell_separator: NotebookConsts::CELL_SEPARATOR.to_string(),
            token_adapters: vec![DigestDefaults::TOKEN_ADAPTER.to_string()],
            concurrency: 1,
            redact: false,
            detect_language: true,
            truncation_max_iterations: DigestDefaults::TRUNCATION_MAX_ITERATIONS,
            parallel_walk: false,
        }
    }
}
