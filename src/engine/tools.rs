//! Path and filter utilities

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

use crate::utils::config::VCS_DIRS;

/// Convert absolute path to relative path from base
pub fn path_relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    path.strip_prefix(base).ok().map(|p| p.to_path_buf())
}

/// Relative path as a forward-slash string (stable across platforms, used as the digest key).
pub fn path_to_rel_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Normalize a user-supplied relative path: forward slashes, no leading `./`, no trailing `/`.
pub fn normalize_rel(path: &str) -> String {
    let mut s = path.replace('\\', "/");
    while let Some(rest) = s.strip_prefix("./") {
        s = rest.to_string();
    }
    let trimmed = s.trim_end_matches('/');
    if trimmed == "." {
        String::new()
    } else {
        trimmed.to_string()
    }
}

/// Check if a file should be excluded based on OS-specific hidden files
pub fn is_os_hidden_file(path: &Path) -> bool {
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        match name {
            // macOS
            ".DS_Store" | ".AppleDouble" | ".LSOverride" => true,
            // Windows
            "Thumbs.db" | "ehthumbs.db" | "Desktop.ini" | "$RECYCLE.BIN" => true,
            // Linux
            ".directory" => true,
            _ => {
                // macOS resource fork files start with ._, trash dirs with .Trash-
                name.starts_with("._") || name.starts_with(".Trash-")
            }
        }
    } else {
        false
    }
}

/// True for `.git`, `.hg`, `.svn`.
pub fn is_vcs_dir_name(name: &str) -> bool {
    VCS_DIRS.contains(&name)
}

/// True when any component of `rel` is a VCS directory.
pub fn has_vcs_component(rel: &Path) -> bool {
    rel.components()
        .any(|c| c.as_os_str().to_str().is_some_and(is_vcs_dir_name))
}

/// `.ipynb`, case-insensitive.
pub fn is_notebook(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("ipynb"))
}

/// Canonicalize the workspace root and make sure it is a directory.
pub fn check_root_and_canonicalize(path: &Path) -> Result<PathBuf> {
    let root = path
        .canonicalize()
        .with_context(|| format!("canonicalize workspace root {}", path.display()))?;
    if !root.is_dir() {
        bail!("workspace root is not a directory: {}", root.display());
    }
    Ok(root)
}

/// First `n` lines of `content`, joined with `\n`.
pub fn first_lines(content: &str, n: usize) -> String {
    content.lines().take(n).collect::<Vec<_>>().join("\n")
}

/// Prefix of `content` holding at most `max_chars` chars (never splits a char).
pub fn take_chars(content: &str, max_chars: usize) -> &str {
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}
