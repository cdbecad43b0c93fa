//! Candidate ordering: manifests and build configs first, tests last.

use crate::types::Candidate;

pub const SCORE_MANIFEST: u32 = 100;
pub const SCORE_BUILD_CONFIG: u32 = 80;
pub const SCORE_DOCS: u32 = 60;
pub const SCORE_CONFIG: u32 = 40;
pub const SCORE_DEFAULT: u32 = 20;
pub const SCORE_TEST: u32 = 10;

const MANIFESTS: [&str; 3] = ["package.json", "yarn.lock", "pnpm-lock.yaml"];
const BUILD_TOOLS: [&str; 5] = ["tsconfig", "webpack", "rollup", "babel", "vite"];
const CONFIG_EXTENSIONS: [&str; 7] = [".json", ".yaml", ".yml", ".toml", ".ini", ".cfg", ".conf"];

/// Priority of a path. Checked in score order: manifests, build configs, docs, config, tests.
///
/// Only the config rule looks past the file name: anything under a `config` directory counts.
pub fn priority_score(rel_path: &str) -> u32 {
    let lower = rel_path.to_ascii_lowercase();
    let mut parts = lower.rsplit('/');
    let name = parts.next().unwrap_or(&lower);

    if MANIFESTS.contains(&name) {
        return SCORE_MANIFEST;
    }
    if is_build_config(name) {
        return SCORE_BUILD_CONFIG;
    }
    if name.starts_with("readme") || name.ends_with(".md") || name.ends_with(".markdown") {
        return SCORE_DOCS;
    }
    if name.starts_with(".env")
        || name.contains("config")
        || (name.starts_with('.') && name.ends_with("rc"))
        || CONFIG_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
        || parts.any(|dir| dir == "config" || dir == "configs")
    {
        return SCORE_CONFIG;
    }
    if name.contains(".test.") || name.contains(".spec.") {
        return SCORE_TEST;
    }
    SCORE_DEFAULT
}

/// `tsconfig*.json`, `webpack.config.js`, `vite.config.ts`, `.babelrc`, ...
fn is_build_config(name: &str) -> bool {
    if name.starts_with("tsconfig") || name.starts_with(".babelrc") {
        return true;
    }
    BUILD_TOOLS
        .iter()
        .any(|tool| name.starts_with(tool) && name.contains("config"))
}

/// Score descending, then relative path ascending.
pub fn sort_by_priority(candidates: &mut [Candidate]) {
    candidates.sort_by_cached_key(|c| (std::cmp::Reverse(priority_score(&c.relative_path)), c.relative_path.clone()));
}
