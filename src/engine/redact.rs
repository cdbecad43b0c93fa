//! Best-effort secret redaction. A regex pass, not a guarantee.

use regex::Regex;
use std::sync::LazyLock;

pub const REDACTED: &str = "[REDACTED]";

struct Rule {
    pattern: Regex,
    /// Replacement; `$key` keeps the captured key in `key = value` rules.
    replacement: &'static str,
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule {
            pattern: Regex::new(
                r"(?s)-----BEGIN [A-Z ]*PRIVATE KEY-----.*?-----END [A-Z ]*PRIVATE KEY-----",
            )
            .expect("valid regex literal"),
            replacement: REDACTED,
        },
        Rule {
            pattern: Regex::new(r"\b(?:AKIA|ASIA)[0-9A-Z]{16}\b").expect("valid regex literal"),
            replacement: REDACTED,
        },
        Rule {
            pattern: Regex::new(r"\bgh[pousr]_[A-Za-z0-9]{36,}\b").expect("valid regex literal"),
            replacement: REDACTED,
        },
        Rule {
            pattern: Regex::new(r"\bxox[abprs]-[A-Za-z0-9-]{10,}\b").expect("valid regex literal"),
            replacement: REDACTED,
        },
        Rule {
            pattern: Regex::new(r"(?i)\bbearer\s+[A-Za-z0-9\-._~+/]{16,}=*")
                .expect("valid regex literal"),
            replacement: "Bearer [REDACTED]",
        },
        Rule {
            pattern: Regex::new(
                r#"(?i)(?P<key>\b[\w.-]*(?:password|passwd|secret|token|api[_-]?key|access[_-]?key)\b["']?\s*[:=]\s*)["']?[^\s"',;]{4,}["']?"#,
            )
            .expect("valid regex literal"),
            replacement: "${key}[REDACTED]",
        },
    ]
});

/// Redact known secret shapes. Returns the new text and the number of replacements.
pub fn redact(content: &str) -> (String, usize) {
    let mut out = content.to_string();
    let mut count = 0;
    for rule in RULES.iter() {
        let hits = rule.pattern.find_iter(&out).count();
        if hits > 0 {
            count += hits;
            out = rule
                .pattern
                .replace_all(&out, rule.replacement)
                .into_owned();
        }
    }
    (out, count)
}
