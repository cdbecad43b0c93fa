//! Workspace scanner: walks the root with walkdir (serial) or jwalk (parallel) and yields
//! file/directory/symlink nodes. VCS directories are never entered. Walk errors are recorded
//! as skipped paths rather than aborting, except for the root itself.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};

use crate::engine::tools::{check_root_and_canonicalize, has_vcs_component, is_vcs_dir_name, path_relative_to, path_to_rel_string};
use crate::error::Outcome;
use crate::types::{NodeKind, ScanNode};

use super::cancel::{CancellationToken, check_cancelled};

/// Scan progress: `(processed, total, current_path)`. `total` is unknown during a walk.
pub type ScanProgressFn<'a> = &'a mut dyn FnMut(usize, Option<usize>, Option<&Path>);

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Stop after this many nodes (safety ceiling).
    pub max_entries: usize,
    pub max_depth: Option<usize>,
    pub follow_symlinks: bool,
    /// Use jwalk's parallel walker.
    pub parallel_walk: bool,
    pub cancel: Option<CancellationToken>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_entries: usize::MAX,
            max_depth: None,
            follow_symlinks: false,
            parallel_walk: false,
            cancel: None,
        }
    }
}

/// What a scan produced.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Nodes in walk order (sorted by file name within a directory).
    pub nodes: Vec<ScanNode>,
    /// Paths the walker could not read, with the error message.
    pub skipped: Vec<(PathBuf, String)>,
    /// True when `max_entries` cut the walk short.
    pub truncated: bool,
}

impl ScanReport {
    pub fn files(&self) -> impl Iterator<Item = &ScanNode> {
        self.nodes.iter().filter(|n| n.kind == NodeKind::File)
    }
}

/// One result from a directory walk: either an entry or an error with optional path.
pub enum WalkOutcome {
    Ok { path: PathBuf, is_dir: bool, is_symlink: bool },
    Err { msg: String, path: Option<PathBuf> },
}

/// Convert a jwalk result into [`WalkOutcome`].
pub fn to_outcome_jwalk(r: std::result::Result<jwalk::DirEntry<((), ())>, jwalk::Error>) -> WalkOutcome {
    match r {
        Ok(entry) => WalkOutcome::Ok {
            is_dir: entry.file_type().is_dir(),
            is_symlink: entry.path_is_symlink(),
            path: entry.path(),
        },
        Err(err) => WalkOutcome::Err {
            msg: format!("{}", err),
            path: err.path().map(PathBuf::from),
        },
    }
}

/// Convert a walkdir result into [`WalkOutcome`].
pub fn to_outcome_walkdir(r: std::result::Result<walkdir::DirEntry, walkdir::Error>) -> WalkOutcome {
    match r {
        Ok(entry) => WalkOutcome::Ok {
            is_dir: entry.file_type().is_dir(),
            is_symlink: entry.path_is_symlink(),
            path: entry.into_path(),
        },
        Err(err) => WalkOutcome::Err {
            msg: format!("{}", err),
            path: err.path().map(PathBuf::from),
        },
    }
}

fn jwalk_iter(root: &Path, options: &ScanOptions) -> Box<dyn Iterator<Item = WalkOutcome>> {
    use jwalk::Parallelism;
    use std::time::Duration;
    let mut walk = jwalk::WalkDir::new(root)
        .follow_links(options.follow_symlinks)
        .sort(true)
        .skip_hidden(false)
        .parallelism(Parallelism::RayonDefaultPool {
            busy_timeout: Duration::from_secs(60),
        })
        .process_read_dir(|_, _, _, children| {
            children.retain(|child| {
                child.as_ref().map_or(true, |e| {
                    !(e.file_type().is_dir() && e.file_name().to_str().is_some_and(is_vcs_dir_name))
                })
            });
        });
    if let Some(depth) = options.max_depth {
        walk = walk.max_depth(depth);
    }
    Box::new(walk.into_iter().map(to_outcome_jwalk))
}

fn walkdir_iter(root: &Path, options: &ScanOptions) -> Box<dyn Iterator<Item = WalkOutcome>> {
    let mut walk = walkdir::WalkDir::new(root)
        .follow_links(options.follow_symlinks)
        .sort_by_file_name();
    if let Some(depth) = options.max_depth {
        walk = walk.max_depth(depth);
    }
    Box::new(
        walk.into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !(e.file_type().is_dir() && e.file_name().to_str().is_some_and(is_vcs_dir_name))
            })
            .map(to_outcome_walkdir),
    )
}

/// Walks a workspace root.
#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
}

impl Scanner {
    /// Canonicalizes `root`; fails when it is missing or not a directory.
    pub fn new(root: &Path) -> Result<Self> {
        let root = check_root_and_canonicalize(root).context("scanner root")?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the root. The root itself is not emitted.
    ///
    /// Cancellation is checked before every entry. Progress counts are monotonically
    /// non-decreasing.
    pub fn scan(&self, options: &ScanOptions, mut on_progress: Option<ScanProgressFn<'_>>) -> Outcome<ScanReport> {
        check_cancelled(options.cancel.as_ref())?;
        let iter = match options.parallel_walk {
            true => jwalk_iter(&self.root, options),
            false => walkdir_iter(&self.root, options),
        };

        let mut report = ScanReport::default();
        let mut last_path: Option<PathBuf> = None;
        for outcome in iter {
            check_cancelled(options.cancel.as_ref())?;
            match outcome {
                WalkOutcome::Ok { path, is_dir, is_symlink } => {
                    let Some(rel) = path_relative_to(&path, &self.root) else {
                        continue;
                    };
                    if rel.as_os_str().is_empty() || has_vcs_component(&rel) {
                        continue;
                    }
                    if report.nodes.len() >= options.max_entries {
                        debug!("Scan stopped at {} entries", options.max_entries);
                        report.truncated = true;
                        break;
                    }
                    let kind = if is_dir {
                        NodeKind::Directory
                    } else if is_symlink && !options.follow_symlinks {
                        NodeKind::Symlink
                    } else {
                        NodeKind::File
                    };
                    report.nodes.push(ScanNode {
                        rel_path: path_to_rel_string(&rel),
                        path: path.clone(),
                        kind,
                        is_symlink,
                    });
                    if let Some(cb) = on_progress.as_mut() {
                        cb(report.nodes.len(), None, Some(&path));
                    }
                    last_path = Some(path);
                }
                WalkOutcome::Err { msg, path } => {
                    if path.as_deref() == Some(self.root.as_path()) {
                        return Err(crate::error::DigestError::Scan(anyhow::anyhow!(
                            "cannot read workspace root: {}",
                            msg
                        )));
                    }
                    let to_push = path.unwrap_or_else(|| {
                        PathBuf::from(format!(
                            "<no-path, last was {}>",
                            last_path
                                .as_ref()
                                .map(|p| p.display().to_string())
                                .unwrap_or_else(|| "<none>".to_string())
                        ))
                    });
                    warn!("Skipping {}: {}", to_push.display(), msg);
                    report.skipped.push((to_push, msg));
                }
            }
        }
        let processed = report.nodes.len();
        if let Some(cb) = on_progress.as_mut() {
            cb(processed, Some(processed), None);
        }
        debug!(
            "Scan of {} done: {} nodes, {} skipped",
            self.root.display(),
            processed,
            report.skipped.len()
        );
        Ok(report)
    }
}
