//! Token estimation against a pluggable adapter, with a process-wide cache and budget warnings.
//!
//! Adapters are picked from a preference list; names that do not resolve are skipped and the
//! `heuristic` adapter is the final fallback. [`TokenAnalyzer::estimate`] is that same heuristic
//! exposed as a free-standing fast path.

use anyhow::{Result, bail};
use log::{debug, warn};
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex};

use crate::utils::config::{DigestDefaults, TOKEN_CACHE_CAPACITY};

/// A token-counting strategy.
pub trait TokenAdapter: Send + Sync {
    fn name(&self) -> &str;
    fn count(&self, content: &str) -> Result<usize>;
}

/// ceil(chars / 4). Cheap and stable; the default.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicAdapter;

impl TokenAdapter for HeuristicAdapter {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn count(&self, content: &str) -> Result<usize> {
        Ok(TokenAnalyzer::estimate(content))
    }
}

static WORD_PIECES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+|[^\w\s]").expect("valid regex literal"));

/// Word/punctuation split; long identifiers cost one token per four chars.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordAdapter;

impl TokenAdapter for WordAdapter {
    fn name(&self) -> &str {
        "words"
    }

    fn count(&self, content: &str) -> Result<usize> {
        Ok(WORD_PIECES
            .find_iter(content)
            .map(|m| m.as_str().chars().count().div_ceil(4).max(1))
            .sum())
    }
}

/// Resolve a built-in adapter by name.
pub fn builtin_adapter(name: &str) -> Option<Arc<dyn TokenAdapter>> {
    match name.trim().to_ascii_lowercase().as_str() {
        "heuristic" | "chars" => Some(Arc::new(HeuristicAdapter)),
        "words" => Some(Arc::new(WordAdapter)),
        _ => None,
    }
}

/// Budget descriptor for a single analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBudget {
    pub limit: usize,
    /// Warn once tokens reach `limit * warn_ratio` (ignored when `warn_at` is set).
    pub warn_ratio: f64,
    pub warn_at: Option<usize>,
    /// When false, overshoot only produces a warning.
    pub fail_on_exceed: bool,
}

impl TokenBudget {
    /// Warning-only budget, the pipeline default.
    pub fn warn_only(limit: usize) -> Self {
        Self {
            limit,
            warn_ratio: DigestDefaults::BUDGET_WARN_RATIO,
            warn_at: None,
            fail_on_exceed: false,
        }
    }

    fn warn_threshold(&self) -> usize {
        self.warn_at
            .unwrap_or_else(|| (self.limit as f64 * self.warn_ratio).ceil() as usize)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    pub budget: Option<TokenBudget>,
    /// Bypass the cache for both lookup and store (truncation retries).
    pub skip_cache: bool,
}

/// Result of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAnalysis {
    pub tokens: usize,
    pub adapter: String,
    pub cache_hit: bool,
    pub exceeded_budget: bool,
    pub warnings: Vec<String>,
    pub budget: Option<TokenBudget>,
}

type CacheKey = [u8; 32];
type CacheSlot = Arc<Mutex<Option<usize>>>;

/// Process-wide cache. The outer lock only hands out per-key slots; counting happens
/// under the slot lock so two callers never compute the same key twice.
static TOKEN_CACHE: LazyLock<Mutex<HashMap<CacheKey, CacheSlot>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn cache_key(adapter: &str, content: &str) -> CacheKey {
    let mut hasher = blake3::Hasher::new();
    hasher.update(adapter.as_bytes());
    hasher.update(&[0]);
    hasher.update(content.as_bytes());
    *hasher.finalize().as_bytes()
}

fn cache_slot(key: CacheKey) -> CacheSlot {
    let mut cache = TOKEN_CACHE.lock().unwrap_or_else(|e| e.into_inner());
    if cache.len() >= TOKEN_CACHE_CAPACITY && !cache.contains_key(&key) {
        debug!("Token cache full ({} entries), clearing", cache.len());
        cache.clear();
    }
    Arc::clone(cache.entry(key).or_default())
}

/// Token counter bound to one adapter.
#[derive(Clone)]
pub struct TokenAnalyzer {
    adapter: Arc<dyn TokenAdapter>,
}

impl std::fmt::Debug for TokenAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAnalyzer")
            .field("adapter", &self.adapter.name())
            .finish()
    }
}

impl Default for TokenAnalyzer {
    fn default() -> Self {
        Self::with_adapter(Arc::new(HeuristicAdapter))
    }
}

impl TokenAnalyzer {
    /// Pick the first resolvable adapter in `preferences`, falling back to `heuristic`.
    pub fn from_preferences(preferences: &[String]) -> Self {
        for name in preferences {
            match builtin_adapter(name) {
                Some(adapter) => {
                    debug!("Token adapter: {}", adapter.name());
                    return Self::with_adapter(adapter);
                }
                None => warn!("Unknown token adapter {:?}, trying next", name),
            }
        }
        debug!("No preferred token adapter available, using heuristic");
        Self::default()
    }

    pub fn with_adapter(adapter: Arc<dyn TokenAdapter>) -> Self {
        Self { adapter }
    }

    pub fn adapter_name(&self) -> &str {
        self.adapter.name()
    }

    /// Fast heuristic usable without an analyzer: ceil(chars / 4).
    pub fn estimate(content: &str) -> usize {
        content.chars().count().div_ceil(4)
    }

    /// Count tokens in `content`, consulting the cache unless `skip_cache`.
    /// With a non-failing budget, overshoot is reported in `warnings` and never errors.
    pub fn analyze(&self, content: &str, options: &AnalyzeOptions) -> Result<TokenAnalysis> {
        let adapter = self.adapter.name().to_string();
        let (tokens, cache_hit) = if options.skip_cache {
            (self.adapter.count(content)?, false)
        } else {
            let slot = cache_slot(cache_key(&adapter, content));
            let mut guard = slot.lock().unwrap_or_else(|e| e.into_inner());
            match *guard {
                Some(tokens) => (tokens, true),
                None => {
                    let tokens = self.adapter.count(content)?;
                    *guard = Some(tokens);
                    (tokens, false)
                }
            }
        };

        let mut warnings = Vec::new();
        let mut exceeded_budget = false;
        if let Some(budget) = options.budget {
            if tokens > budget.limit {
                exceeded_budget = true;
                if budget.fail_on_exceed {
                    bail!(
                        "token count {} exceeds budget of {}",
                        tokens,
                        budget.limit
                    );
                }
                warnings.push(format!(
                    "Token count {} exceeds budget of {}.",
                    tokens, budget.limit
                ));
            } else if tokens >= budget.warn_threshold() && tokens > 0 {
                warnings.push(format!(
                    "Token count {} is approaching the budget of {}.",
                    tokens, budget.limit
                ));
            }
        }

        Ok(TokenAnalysis {
            tokens,
            adapter,
            cache_hit,
            exceeded_budget,
            warnings,
            budget: options.budget,
        })
    }

    /// Drop every cached count.
    pub fn clear_cache() {
        TOKEN_CACHE
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}
