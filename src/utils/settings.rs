//! Configuration loading: `.repodigest.toml` in the workspace directory, or a config built in code.
//!
//! The pipeline only sees the [`ConfigurationService`] trait; the CLI layers the file first and
//! its own flags on top, library callers usually hand over a [`StaticConfigService`].

use anyhow::{Context, Result, bail};
use globset::Glob;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::types::{BinaryPolicy, DigestConfig, OutputFormat};
use crate::utils::config::PackagePaths;

/// Source of the validated configuration snapshot for a run.
pub trait ConfigurationService: Send + Sync {
    fn load_config(&self) -> Result<DigestConfig>;
}

/// Hands out a fixed, in-memory config.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigService {
    config: DigestConfig,
}

impl StaticConfigService {
    pub fn new(config: DigestConfig) -> Self {
        Self { config }
    }
}

impl ConfigurationService for StaticConfigService {
    fn load_config(&self) -> Result<DigestConfig> {
        self.config.validate()?;
        Ok(self.config.clone())
    }
}

/// Reads `.repodigest.toml` from `dir`. A missing file yields defaults; an unparsable one is an error.
#[derive(Debug, Clone)]
pub struct TomlConfigService {
    dir: PathBuf,
}

impl TomlConfigService {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ConfigurationService for TomlConfigService {
    fn load_config(&self) -> Result<DigestConfig> {
        let mut config = DigestConfig::default();
        if let Some(file) = load_repodigest_toml(&self.dir)? {
            apply_file_to_config(&file, &mut config);
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RepodigestToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    gitignore: Option<bool>,
    follow_symlinks: Option<bool>,
    max_files: Option<usize>,
    max_depth: Option<usize>,
    max_tokens: Option<usize>,
    max_file_size: Option<u64>,
    stream_threshold: Option<u64>,
    binary_policy: Option<BinaryPolicy>,
    format: Option<OutputFormat>,
    workspace_root: Option<String>,
    include_code_cells: Option<bool>,
    include_markdown_cells: Option<bool>,
    include_outputs: Option<bool>,
    include_non_text_outputs: Option<bool>,
    non_text_output_max_bytes: Option<usize>,
    preserve_notebook_formatting: Option<bool>,
    notebook_cell_separator: Option<String>,
    token_adapters: Option<Vec<String>>,
    concurrency: Option<usize>,
    redact: Option<bool>,
    detect_language: Option<bool>,
    truncation_max_iterations: Option<usize>,
    parallel_walk: Option<bool>,
}

/// Load `.repodigest.toml` from `dir` if present. `Ok(None)` when the file is missing.
pub(crate) fn load_repodigest_toml(dir: &Path) -> Result<Option<RepodigestToml>> {
    let path = dir.join(PackagePaths::get().config_filename());
    if !path.is_file() {
        return Ok(None);
    }
    let s = std::fs::read_to_string(&path)
        .with_context(|| format!("read config {}", path.display()))?;
    let parsed = toml::from_str(&s).with_context(|| format!("parse config {}", path.display()))?;
    log::debug!("Loaded {}", path.display());
    Ok(Some(parsed))
}

/// Overwrite config field from file when present.
macro_rules! apply_file_opt {
    ($section:expr, $config:expr, $file_field:ident => $config_field:ident) => {
        if let Some(v) = $section.$file_field.clone() {
            $config.$config_field = v;
        }
    };
}

/// Apply file config onto `config` (only fields present in the file). Call before applying CLI flags.
pub(crate) fn apply_file_to_config(file: &RepodigestToml, config: &mut DigestConfig) {
    let s = &file.settings;
    apply_file_opt!(s, config, include => include_patterns);
    apply_file_opt!(s, config, exclude => exclude_patterns);
    apply_file_opt!(s, config, gitignore => use_gitignore);
    apply_file_opt!(s, config, follow_symlinks => follow_symlinks);
    if s.max_files.is_some() {
        config.max_files = s.max_files;
    }
    if s.max_depth.is_some() {
        config.max_depth = s.max_depth;
    }
    if s.max_tokens.is_some() {
        config.max_tokens = s.max_tokens;
    }
    apply_file_opt!(s, config, max_file_size => max_file_size);
    apply_file_opt!(s, config, stream_threshold => stream_threshold);
    apply_file_opt!(s, config, binary_policy => binary_policy);
    apply_file_opt!(s, config, format => output_format);
    if let Some(ref root) = s.workspace_root {
        config.workspace_root = Some(PathBuf::from(root));
    }
    apply_file_opt!(s, config, include_code_cells => include_code_cells);
    apply_file_opt!(s, config, include_markdown_cells => include_markdown_cells);
    apply_file_opt!(s, config, include_outputs => include_outputs);
    apply_file_opt!(s, config, include_non_text_outputs => include_non_text_outputs);
    apply_file_opt!(s, config, non_text_output_max_bytes => non_text_output_max_bytes);
    apply_file_opt!(s, config, preserve_notebook_formatting => preserve_notebook_formatting);
    apply_file_opt!(s, config, notebook_cell_separator => notebook_cell_separator);
    apply_file_opt!(s, config, token_adapters => token_adapters);
    apply_file_opt!(s, config, concurrency => concurrency);
    apply_file_opt!(s, config, redact => redact);
    apply_file_opt!(s, config, detect_language => detect_language);
    apply_file_opt!(s, config, truncation_max_iterations => truncation_max_iterations);
    apply_file_opt!(s, config, parallel_walk => parallel_walk);
}

impl DigestConfig {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_files == Some(0) {
            bail!("max_files must be at least 1");
        }
        if self.max_tokens == Some(0) {
            bail!("max_tokens must be at least 1");
        }
        if self.concurrency == 0 {
            bail!("concurrency must be at least 1");
        }
        if self.token_adapters.is_empty() {
            bail!("token_adapters must name at least one adapter");
        }
        if self.truncation_max_iterations == 0 {
            bail!("truncation_max_iterations must be at least 1");
        }
        for pattern in self.include_patterns.iter().chain(&self.exclude_patterns) {
            Glob::new(pattern).with_context(|| format!("invalid glob pattern {pattern:?}"))?;
        }
        Ok(())
    }
}
