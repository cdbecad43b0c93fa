//! `{{dotted.path}}` interpolation over a JSON variable bag.
//!
//! Rendering is total: unknown paths and `null` become an empty string, strings are inserted
//! as-is, numbers and booleans via `to_string`, objects and arrays as pretty JSON. An unclosed
//! `{{` is emitted literally. [`validate_template`] is the strict counterpart.

use anyhow::{Result, bail};
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::types::{DigestResult, ProcessedFileContent};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Value at `path` (`a.b.0.c`), indexing arrays by number.
pub fn lookup<'a>(bag: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(bag, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Text inserted for a looked-up value.
pub fn value_to_string(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(v @ (Value::Object(_) | Value::Array(_))) => {
            serde_json::to_string_pretty(v).unwrap_or_default()
        }
    }
}

/// Substitute every placeholder. Never fails.
pub fn render_template(template: &str, bag: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + OPEN.len()..];
        match after.find(CLOSE) {
            Some(end) => {
                let key = after[..end].trim();
                out.push_str(&value_to_string(lookup(bag, key)));
                rest = &after[end + CLOSE.len()..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        })
}

/// Check placeholder syntax, then dry-run against an empty bag.
pub fn validate_template(template: &str) -> Result<()> {
    let mut rest = template;
    let mut offset = 0;
    while let Some(start) = rest.find(OPEN) {
        let after = &rest[start + OPEN.len()..];
        let Some(end) = after.find(CLOSE) else {
            bail!("unclosed placeholder at byte {}", offset + start);
        };
        let key = after[..end].trim();
        if key.is_empty() {
            bail!("empty placeholder at byte {}", offset + start);
        }
        if key.contains(OPEN) || !is_valid_key(key) {
            bail!("invalid placeholder {:?} at byte {}", key, offset + start);
        }
        let consumed = start + OPEN.len() + end + CLOSE.len();
        offset += consumed;
        rest = &rest[consumed..];
    }
    render_template(template, &Value::Object(Map::new()));
    Ok(())
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Bag for document-level sections: `metadata`, `summary`, `statistics`, `view`.
pub fn document_bag(result: &DigestResult) -> Value {
    let meta = &result.content.metadata;
    json!({
        "metadata": to_value(meta),
        "summary": to_value(&result.content.summary),
        "statistics": to_value(&result.statistics),
        "view": {
            "title": format!("Digest of {}", meta.workspace_root),
            "fileCount": result.content.files.len(),
            "tokenSummary": format!("{} / {} tokens", meta.total_tokens, meta.max_tokens),
            "redactionApplied": result.redaction_applied,
            "truncationApplied": result.truncation_applied,
            "errorCount": result.statistics.errors.len(),
            "warningCount": result.statistics.warnings.len(),
        },
    })
}

/// Document bag plus `file` and a per-file `view`.
pub fn file_bag(result: &DigestResult, file: &ProcessedFileContent) -> Value {
    let mut bag = document_bag(result);
    if let Value::Object(map) = &mut bag {
        map.insert("file".to_string(), to_value(file));
        if let Some(Value::Object(view)) = map.get_mut("view") {
            view.insert("path".to_string(), Value::String(file.relative_path.clone()));
            view.insert(
                "language".to_string(),
                Value::String(file.language_id.clone().unwrap_or_default()),
            );
            view.insert(
                "tokenLabel".to_string(),
                Value::String(if file.truncated {
                    format!("{} tokens (truncated)", file.tokens)
                } else {
                    format!("{} tokens", file.tokens)
                }),
            );
        }
    }
    bag
}
