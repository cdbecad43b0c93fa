//! Engine module: leaf processors (content, notebooks, tokens) and the command line

pub mod arg_parser;
pub mod cli;
pub mod content;
pub mod hashing;
pub mod language;
pub mod notebook;
pub mod progress;
pub mod redact;
pub mod tokens;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::Cli;
pub use cli::handle_run;
pub use content::{ContentOptions, ContentProcessor, FileProcessor, ProcessedContent};
pub use hashing::checksum_file;
pub use notebook::{NotebookOptions, NotebookProcessor, ProcessedNotebook};
pub use tokens::{TokenAdapter, TokenAnalysis, TokenAnalyzer, TokenBudget};
pub use tools::path_relative_to;
