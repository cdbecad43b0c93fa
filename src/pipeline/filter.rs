//! Per-path inclusion decisions: include/exclude globs, gitignore rules, symlink policy.
//!
//! Patterns are matched against the root-relative path with forward slashes. A bare pattern
//! matches at any depth (`target` also matches `a/target` and everything under it); a leading
//! `/` anchors it to the root. `*` and `?` never match `/`; use `**` to cross directories.
//! Nested `.gitignore` files apply to their own subtree, deeper files taking precedence.

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::Match;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use log::{debug, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::engine::tools::{is_os_hidden_file, path_relative_to, path_to_rel_string};

#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub use_gitignore: bool,
    pub follow_symlinks: bool,
}

/// Why a path was kept or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterReason {
    Included,
    ExcludedByPattern,
    NotMatchedByInclude,
    Gitignored,
    Symlink,
    OsHidden,
    OutsideRoot,
}

impl FilterReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterReason::Included => "included",
            FilterReason::ExcludedByPattern => "excluded-by-pattern",
            FilterReason::NotMatchedByInclude => "not-matched-by-include",
            FilterReason::Gitignored => "gitignored",
            FilterReason::Symlink => "symlink",
            FilterReason::OsHidden => "os-hidden",
            FilterReason::OutsideRoot => "outside-root",
        }
    }
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilterDecision {
    pub included: bool,
    pub reason: FilterReason,
}

impl FilterDecision {
    fn of(reason: FilterReason) -> Self {
        Self {
            included: reason == FilterReason::Included,
            reason,
        }
    }
}

/// Expand a user pattern into the globs it stands for.
fn glob_variants(pattern: &str) -> Vec<String> {
    let trimmed = pattern.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }
    if let Some(anchored) = trimmed.strip_prefix('/') {
        return vec![anchored.to_string(), format!("{anchored}/**")];
    }
    let mut out = vec![trimmed.to_string(), format!("{trimmed}/**")];
    if !trimmed.starts_with("**/") {
        out.push(format!("**/{trimmed}"));
        out.push(format!("**/{trimmed}/**"));
    }
    out
}

/// Compile patterns into one set. `None` for an empty list.
pub fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>> {
    let variants: Vec<String> = patterns.iter().flat_map(|p| glob_variants(p)).collect();
    if variants.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in &variants {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern {:?}", pattern))?;
        builder.add(glob);
    }
    Ok(Some(builder.build().context("compile glob set")?))
}

/// Filter bound to one workspace root.
#[derive(Debug)]
pub struct FilterService {
    root: PathBuf,
    options: FilterOptions,
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl FilterService {
    /// Compile the pattern lists. Fails on a malformed glob.
    pub fn new(root: &Path, options: FilterOptions) -> Result<Self> {
        let include = build_globset(&options.include_patterns).context("include patterns")?;
        let exclude = build_globset(&options.exclude_patterns).context("exclude patterns")?;
        Ok(Self {
            root: root.to_path_buf(),
            options,
            include,
            exclude,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Decide every path. Keys are the paths as given.
    pub fn batch_filter(&self, paths: &[PathBuf]) -> HashMap<PathBuf, FilterDecision> {
        let matchers = if self.options.use_gitignore {
            self.load_gitignores(paths)
        } else {
            HashMap::new()
        };
        paths
            .par_iter()
            .map(|path| (path.clone(), self.decide(path, &matchers)))
            .collect()
    }

    /// Decide a single path.
    pub fn filter(&self, path: &Path) -> FilterDecision {
        let matchers = if self.options.use_gitignore {
            self.load_gitignores(std::slice::from_ref(&path.to_path_buf()))
        } else {
            HashMap::new()
        };
        self.decide(path, &matchers)
    }

    fn decide(&self, path: &Path, gitignores: &HashMap<PathBuf, Gitignore>) -> FilterDecision {
        let Some(rel) = path_relative_to(path, &self.root).filter(|r| !r.as_os_str().is_empty()) else {
            return FilterDecision::of(FilterReason::OutsideRoot);
        };
        let is_symlink = std::fs::symlink_metadata(path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        if is_symlink && !self.options.follow_symlinks {
            return FilterDecision::of(FilterReason::Symlink);
        }
        if is_os_hidden_file(path) {
            return FilterDecision::of(FilterReason::OsHidden);
        }
        let rel_str = path_to_rel_string(&rel);
        if self.exclude.as_ref().is_some_and(|set| set.is_match(&rel_str)) {
            return FilterDecision::of(FilterReason::ExcludedByPattern);
        }
        if self.include.as_ref().is_some_and(|set| !set.is_match(&rel_str)) {
            return FilterDecision::of(FilterReason::NotMatchedByInclude);
        }
        if self.is_gitignored(path, gitignores) {
            return FilterDecision::of(FilterReason::Gitignored);
        }
        FilterDecision::of(FilterReason::Included)
    }

    /// Deepest `.gitignore` with an opinion wins.
    fn is_gitignored(&self, path: &Path, gitignores: &HashMap<PathBuf, Gitignore>) -> bool {
        let is_dir = path.is_dir();
        let mut dir = path.parent();
        while let Some(d) = dir {
            if !d.starts_with(&self.root) {
                break;
            }
            if let Some(gi) = gitignores.get(d) {
                match gi.matched_path_or_any_parents(path, is_dir) {
                    Match::Ignore(_) => return true,
                    Match::Whitelist(_) => return false,
                    Match::None => {}
                }
            }
            dir = d.parent();
        }
        false
    }

    /// Build a matcher for every directory between the root and each path that has a `.gitignore`.
    fn load_gitignores(&self, paths: &[PathBuf]) -> HashMap<PathBuf, Gitignore> {
        let mut dirs = BTreeSet::new();
        for path in paths {
            let mut dir = path.parent();
            while let Some(d) = dir {
                if !d.starts_with(&self.root) || !dirs.insert(d.to_path_buf()) {
                    break;
                }
                dir = d.parent();
            }
        }
        let mut out = HashMap::new();
        for dir in dirs {
            let file = dir.join(".gitignore");
            if !file.is_file() {
                continue;
            }
            let mut builder = GitignoreBuilder::new(&dir);
            if let Some(err) = builder.add(&file) {
                warn!("Partially invalid {}: {}", file.display(), err);
            }
            match builder.build() {
                Ok(gi) => {
                    debug!("Loaded {} ({} rules)", file.display(), gi.num_ignores() + gi.num_whitelists());
                    out.insert(dir, gi);
                }
                Err(err) => warn!("Ignoring {}: {}", file.display(), err),
            }
        }
        out
    }
}
