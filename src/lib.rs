//! repodigest: turn a source tree into a token-budgeted digest.
//!
//! A run scans the workspace, filters with globs and `.gitignore`, orders files by priority,
//! reads and normalizes them (text, notebooks, binaries), fits them into a token budget, and
//! returns a [`DigestResult`] that [`format::render`] turns into markdown, JSON, NDJSON or text.

pub mod engine;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use error::{DigestError, Outcome};
pub use format::{Formatter, FormatterOptions, SectionTemplates};
pub use pipeline::{CancellationToken, DigestGenerator};
pub use utils::settings::{ConfigurationService, StaticConfigService, TomlConfigService};

use log::debug;

/// Generate a digest with `config` and the default services.
///
/// ```ignore
/// let result = repodigest::generate_digest(
///     repodigest::DigestConfig { workspace_root: Some("my-repo".into()), ..Default::default() },
///     repodigest::DigestOptions { max_tokens: Some(8_000), ..Default::default() },
/// )?;
/// println!("{} files, {} tokens", result.statistics.files_processed, result.statistics.total_tokens);
/// ```
pub fn generate_digest(config: DigestConfig, options: DigestOptions) -> Outcome<DigestResult> {
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_string().to_uppercase(),
        config
    );
    DigestGenerator::from_config(config).generate_digest(options)
}

/// Generate and render in the format named by `options.output_format`.
pub fn generate_and_render(
    config: DigestConfig,
    options: DigestOptions,
    formatter_options: FormatterOptions,
) -> Outcome<(DigestResult, String)> {
    let format = options.output_format;
    let result = generate_digest(config, options)?;
    let rendered = format::render(&result, format, formatter_options)?;
    Ok((result, rendered))
}
