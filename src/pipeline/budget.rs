//! Run-wide token budget and per-file truncation.
//!
//! The ledger is owned by one run. [`enforce_budget`] holds its lock from the remaining-budget
//! check through the commit, so concurrent files can never both claim the same allowance.

use std::sync::Mutex;

use crate::engine::tokens::{AnalyzeOptions, TokenAnalysis, TokenAnalyzer};
use crate::engine::tools::{first_lines, take_chars};
use crate::error::{DigestError, Outcome};
use crate::utils::config::DigestDefaults;

use super::cancel::{CancellationToken, check_cancelled};

/// Running token total for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetLedger {
    max_tokens: usize,
    used: usize,
}

impl BudgetLedger {
    pub fn new(max_tokens: usize) -> Self {
        Self { max_tokens, used: 0 }
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn remaining(&self) -> usize {
        self.max_tokens.saturating_sub(self.used)
    }

    fn commit(&mut self, tokens: usize) {
        self.used = self.used.saturating_add(tokens);
    }
}

/// Knobs of the shrink loop.
#[derive(Debug, Clone)]
pub struct TruncationSettings {
    pub max_iterations: usize,
    pub min_chars: usize,
    pub min_ratio: f64,
    pub placeholder_lines: usize,
}

impl Default for TruncationSettings {
    fn default() -> Self {
        Self {
            max_iterations: DigestDefaults::TRUNCATION_MAX_ITERATIONS,
            min_chars: DigestDefaults::TRUNCATION_MIN_CHARS,
            min_ratio: DigestDefaults::TRUNCATION_MIN_RATIO,
            placeholder_lines: DigestDefaults::EXHAUSTED_PLACEHOLDER_LINES,
        }
    }
}

/// What a file may emit.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetDecision {
    pub content: String,
    pub tokens: usize,
    pub truncated: bool,
    pub warnings: Vec<String>,
}

/// Fit one file into what is left of the budget and commit its tokens.
///
/// `analysis` is the full-content analysis. Errors are either [`DigestError::Cancelled`] or a
/// failed re-analysis during truncation.
pub fn enforce_budget(
    ledger: &Mutex<BudgetLedger>,
    rel_path: &str,
    content: &str,
    analysis: &TokenAnalysis,
    analyzer: &TokenAnalyzer,
    settings: &TruncationSettings,
    cancel: Option<&CancellationToken>,
) -> Outcome<BudgetDecision> {
    check_cancelled(cancel)?;
    let mut ledger = ledger.lock().unwrap_or_else(|e| e.into_inner());
    let remaining = ledger.remaining();

    if remaining == 0 {
        let mut placeholder = first_lines(content, settings.placeholder_lines);
        placeholder.push_str(&format!(
            "\n\n{} {}: token budget exhausted (0 tokens remaining), showing the first {} lines only.",
            DigestDefaults::TRUNCATION_MARKER,
            rel_path,
            settings.placeholder_lines
        ));
        return Ok(BudgetDecision {
            content: placeholder,
            tokens: 0,
            truncated: true,
            warnings: vec![format!(
                "{}: token budget exhausted, content replaced with a placeholder.",
                rel_path
            )],
        });
    }

    if analysis.tokens <= remaining {
        ledger.commit(analysis.tokens);
        return Ok(BudgetDecision {
            content: content.to_string(),
            tokens: analysis.tokens,
            truncated: analysis.exceeded_budget,
            warnings: analysis
                .warnings
                .iter()
                .map(|w| format!("{}: {}", rel_path, w))
                .collect(),
        });
    }

    let (shrunk, estimate) = shrink_to_fit(content, analysis.tokens, remaining, analyzer, settings, cancel)?;
    let tokens = estimate.min(remaining);
    ledger.commit(tokens);
    let mut out = shrunk;
    out.push_str(&format!(
        "\n\n{} {}: truncated to fit the remaining budget of {} tokens.",
        DigestDefaults::TRUNCATION_MARKER,
        rel_path,
        remaining
    ));
    Ok(BudgetDecision {
        content: out,
        tokens,
        truncated: true,
        warnings: vec![format!(
            "{}: truncated from {} to {} tokens to fit the budget.",
            rel_path, analysis.tokens, tokens
        )],
    })
}

/// Bounded shrink loop. Returns the shrunk text and its last estimate.
fn shrink_to_fit(
    content: &str,
    mut estimate: usize,
    remaining: usize,
    analyzer: &TokenAnalyzer,
    settings: &TruncationSettings,
    cancel: Option<&CancellationToken>,
) -> Outcome<(String, usize)> {
    let retry = AnalyzeOptions {
        budget: None,
        skip_cache: true,
    };
    let mut current = content.to_string();
    for _ in 0..settings.max_iterations {
        check_cancelled(cancel)?;
        let chars = current.chars().count();
        if estimate <= remaining || chars <= settings.min_chars {
            break;
        }
        let ratio = (remaining as f64 / estimate.max(1) as f64).max(settings.min_ratio);
        let keep = ((chars as f64 * ratio).floor() as usize).min(chars - 1);
        current = take_chars(&current, keep).to_string();
        estimate = analyzer
            .analyze(&current, &retry)
            .map_err(DigestError::Other)?
            .tokens;
    }
    Ok((current, estimate))
}
