use clap::Parser;
use std::path::PathBuf;

use crate::types::{BinaryPolicy, OutputFormat};

struct DefaultArgs;

impl DefaultArgs {
    pub const DIR: &'static str = ".";
}

/// Turn a source tree into a token-budgeted digest.
#[derive(Clone, Debug, Parser)]
#[command(name = "repodigest", version)]
#[command(about = "Digest a directory into markdown, JSON, NDJSON or text within a token budget.")]
pub struct Cli {
    /// Workspace directory. Default: current directory.
    #[arg(value_name = "DIR", default_value = DefaultArgs::DIR)]
    pub dir: PathBuf,

    /// Only these files or directories (relative to DIR, or absolute).
    #[arg(long, short = 's', num_args = 1..)]
    pub select: Vec<PathBuf>,

    /// Output format. Default: from `.repodigest.toml`, else markdown.
    #[arg(long, short = 'F', value_enum)]
    pub format: Option<OutputFormat>,

    /// Write the digest here instead of stdout.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Maximum number of files in the digest.
    #[arg(long)]
    pub max_files: Option<usize>,

    /// Token budget for all file contents together.
    #[arg(long, short = 't')]
    pub max_tokens: Option<usize>,

    /// Include patterns (glob syntax). Can specify multiple: -i 'src/**' '*.md'
    #[arg(long, short = 'i', num_args = 1..)]
    pub include: Vec<String>,

    /// Exclude patterns (glob syntax). Can specify multiple: -e pattern1 pattern2 pattern3
    #[arg(long, short = 'e', num_args = 1..)]
    pub exclude: Vec<String>,

    /// Do not apply .gitignore rules.
    #[arg(long)]
    pub no_gitignore: bool,

    /// Follow symbolic links.
    #[arg(long, short = 'f', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub follow_symlinks: Option<bool>,

    /// What to do with binary files.
    #[arg(long, value_enum)]
    pub binary: Option<BinaryPolicy>,

    /// Redact likely secrets (keys, tokens, passwords).
    #[arg(long, short = 'r')]
    pub redact: bool,

    /// Leave the metadata block and per-file metadata out.
    #[arg(long)]
    pub no_metadata: bool,

    /// Worker threads for per-file processing.
    #[arg(long, short = 'j')]
    pub concurrency: Option<usize>,

    /// Verbose output and a progress bar on stderr.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}

impl Cli {
    pub fn is_verbose(&self) -> bool {
        self.verbose.unwrap_or(false)
    }
}
