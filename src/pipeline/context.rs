//! Run configuration snapshot: resolved once per run, read-only afterwards.

use anyhow::{Context, Result};
use log::debug;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::engine::tools::{check_root_and_canonicalize, normalize_rel, path_relative_to, path_to_rel_string};
use crate::types::{BinaryPolicy, DigestConfig, DigestOptions};
use crate::utils::config::DigestDefaults;

use super::cancel::CancellationToken;

/// Everything a run needs, derived from config and options.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub config: DigestConfig,
    /// Canonical workspace root.
    pub workspace_root: PathBuf,
    pub max_files: usize,
    pub max_tokens: usize,
    pub binary_policy: BinaryPolicy,
    pub include_metadata: bool,
    pub should_redact: bool,
    /// Normalized root-relative selection; `None` means everything.
    pub selection: Option<HashSet<String>>,
    pub cancel: Option<CancellationToken>,
}

impl PipelineContext {
    /// Resolve the root, limits and flags for one run.
    ///
    /// Root: config value, else an absolute selected path, else the first workspace folder,
    /// else the current directory.
    pub fn resolve(config: DigestConfig, options: &DigestOptions) -> Result<Self> {
        let root = resolve_workspace_root(&config, options)?;
        let workspace_root = check_root_and_canonicalize(&root)?;

        let max_files = options
            .max_files
            .or(config.max_files)
            .unwrap_or(DigestDefaults::MAX_FILES)
            .max(1);
        let max_tokens = options
            .max_tokens
            .or(config.max_tokens)
            .unwrap_or(DigestDefaults::MAX_TOKENS)
            .max(1);
        let should_redact = !options.redaction_override && (options.apply_redaction || config.redact);
        let selection = normalize_selection(&options.selected_files, &workspace_root);

        debug!(
            "Context: root={} max_files={} max_tokens={} redact={} selection={}",
            workspace_root.display(),
            max_files,
            max_tokens,
            should_redact,
            selection.as_ref().map_or(0, HashSet::len)
        );

        Ok(Self {
            binary_policy: config.binary_policy,
            include_metadata: options.include_metadata,
            config,
            workspace_root,
            max_files,
            max_tokens,
            should_redact,
            selection,
            cancel: options.cancel.clone(),
        })
    }

    /// True when `rel_path` is selected, or lies under a selected directory.
    pub fn is_selected(&self, rel_path: &str) -> bool {
        let Some(selection) = &self.selection else {
            return true;
        };
        if selection.contains(rel_path) {
            return true;
        }
        let mut prefix = rel_path;
        while let Some((parent, _)) = prefix.rsplit_once('/') {
            if selection.contains(parent) {
                return true;
            }
            prefix = parent;
        }
        false
    }
}

fn resolve_workspace_root(config: &DigestConfig, options: &DigestOptions) -> Result<PathBuf> {
    if let Some(root) = &config.workspace_root {
        return Ok(root.clone());
    }
    if let Some(abs) = options.selected_files.iter().find(|p| p.is_absolute()) {
        let dir = if abs.is_dir() {
            abs.clone()
        } else {
            abs.parent().map(Path::to_path_buf).unwrap_or_else(|| abs.clone())
        };
        return Ok(dir);
    }
    if let Some(folder) = options.workspace_folders.first() {
        return Ok(folder.clone());
    }
    std::env::current_dir().context("resolve current directory")
}

/// Map selected paths (absolute or relative) to normalized root-relative strings.
/// Absolute paths outside the root are dropped. An empty selection means no filtering.
fn normalize_selection(selected: &[PathBuf], root: &Path) -> Option<HashSet<String>> {
    if selected.is_empty() {
        return None;
    }
    let set: HashSet<String> = selected
        .iter()
        .filter_map(|p| {
            if p.is_absolute() {
                let canonical = p.canonicalize().unwrap_or_else(|_| p.clone());
                path_relative_to(&canonical, root).map(|rel| normalize_rel(&path_to_rel_string(&rel)))
            } else {
                Some(normalize_rel(&path_to_rel_string(p)))
            }
        })
        .collect();
    // The root itself selects everything.
    if set.contains("") {
        return None;
    }
    Some(set)
}
