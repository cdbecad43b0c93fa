//! Jupyter notebook flattening.
//!
//! Code and markdown cells are joined into one text with a configurable separator. Text
//! outputs are inlined; non-text outputs (images and the like) are embedded as data URIs only
//! when enabled and under the byte ceiling, otherwise replaced by a placeholder and counted as
//! skipped. HTML outputs lose event-handler attributes and script blocks. Invalid JSON never
//! errors: the result is a fixed placeholder plus a warning.

use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;
use std::path::Path;
use std::sync::LazyLock;

use crate::types::{DigestConfig, NotebookStats};
use crate::utils::config::NotebookConsts;

#[derive(Debug, Clone)]
pub struct NotebookOptions {
    pub include_code_cells: bool,
    pub include_markdown_cells: bool,
    pub include_outputs: bool,
    pub include_non_text_outputs: bool,
    /// Decoded-size ceiling for embedded non-text outputs.
    pub non_text_output_max_bytes: usize,
    pub cell_separator: String,
    /// When false, markdown cells are rendered as plain text.
    pub preserve_formatting: bool,
}

impl Default for NotebookOptions {
    fn default() -> Self {
        Self {
            include_code_cells: true,
            include_markdown_cells: true,
            include_outputs: true,
            include_non_text_outputs: false,
            non_text_output_max_bytes: NotebookConsts::NON_TEXT_OUTPUT_MAX_BYTES,
            cell_separator: NotebookConsts::CELL_SEPARATOR.to_string(),
            preserve_formatting: true,
        }
    }
}

impl NotebookOptions {
    pub fn from_config(config: &DigestConfig) -> Self {
        Self {
            include_code_cells: config.include_code_cells,
            include_markdown_cells: config.include_markdown_cells,
            include_outputs: config.include_outputs,
            include_non_text_outputs: config.include_non_text_outputs,
            non_text_output_max_bytes: config.non_text_output_max_bytes,
            cell_separator: config.notebook_cell_separator.clone(),
            preserve_formatting: config.preserve_notebook_formatting,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessedNotebook {
    pub content: String,
    pub stats: NotebookStats,
    pub warnings: Vec<String>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NotebookProcessor;

impl NotebookProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Read and flatten the notebook at `path`. Only I/O failures are errors.
    pub fn process_notebook(&self, path: &Path, options: &NotebookOptions) -> Result<ProcessedNotebook> {
        let raw = std::fs::read(path).with_context(|| format!("read notebook {}", path.display()))?;
        let text = String::from_utf8_lossy(&raw);
        Ok(self.process_str(&text, options))
    }

    /// Flatten notebook JSON already in memory.
    pub fn process_str(&self, json: &str, options: &NotebookOptions) -> ProcessedNotebook {
        let doc: Value = match serde_json::from_str(json) {
            Ok(v) => v,
            Err(e) => {
                return ProcessedNotebook {
                    content: NotebookConsts::UNPARSEABLE_PLACEHOLDER.to_string(),
                    stats: NotebookStats::default(),
                    warnings: vec![format!("unable to parse notebook JSON ({e})")],
                };
            }
        };

        let mut out = ProcessedNotebook::default();
        let Some(cells) = doc.get("cells").and_then(Value::as_array) else {
            out.content = NotebookConsts::UNPARSEABLE_PLACEHOLDER.to_string();
            out.warnings
                .push("unable to parse notebook JSON (missing \"cells\" array)".to_string());
            return out;
        };
        let language = notebook_language(&doc);

        let mut sections = Vec::new();
        for (idx, cell) in cells.iter().enumerate() {
            let cell_type = cell.get("cell_type").and_then(Value::as_str).unwrap_or("");
            let source = joined_text(cell.get("source"));
            match cell_type {
                "code" => {
                    out.stats.code_cells += 1;
                    if !options.include_code_cells {
                        continue;
                    }
                    let mut section = format!("```{}\n{}\n```", language, source.trim_end());
                    if options.include_outputs {
                        let outputs = cell
                            .get("outputs")
                            .and_then(Value::as_array)
                            .map(Vec::as_slice)
                            .unwrap_or_default();
                        for output in outputs {
                            if let Some(rendered) = render_output(output, options, &mut out.stats) {
                                section.push_str("\n\n");
                                section.push_str(&rendered);
                            }
                        }
                    }
                    sections.push(section);
                }
                "markdown" => {
                    out.stats.markdown_cells += 1;
                    if !options.include_markdown_cells {
                        continue;
                    }
                    let body = if options.preserve_formatting {
                        source.trim_end().to_string()
                    } else {
                        markdown_to_plain(&source)
                    };
                    if !body.trim().is_empty() {
                        sections.push(body);
                    }
                }
                "raw" => {
                    out.stats.raw_cells += 1;
                    if options.include_code_cells && !source.trim().is_empty() {
                        sections.push(source.trim_end().to_string());
                    }
                }
                other => out
                    .warnings
                    .push(format!("cell {} has unknown type {:?}, skipped", idx, other)),
            }
        }
        out.content = sections.join(&options.cell_separator);
        out
    }
}

/// `source`/`text` fields are either a string or a list of lines.
fn joined_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(parts)) => parts.iter().filter_map(Value::as_str).collect(),
        _ => String::new(),
    }
}

fn notebook_language(doc: &Value) -> String {
    let meta = doc.get("metadata");
    meta.and_then(|m| m.pointer("/language_info/name"))
        .or_else(|| meta.and_then(|m| m.pointer("/kernelspec/language")))
        .and_then(Value::as_str)
        .unwrap_or("python")
        .to_string()
}

fn render_output(output: &Value, options: &NotebookOptions, stats: &mut NotebookStats) -> Option<String> {
    match output.get("output_type").and_then(Value::as_str)? {
        "stream" => {
            let text = joined_text(output.get("text"));
            if text.trim().is_empty() {
                return None;
            }
            stats.outputs.text += 1;
            Some(format!("Output:\n```\n{}\n```", text.trim_end()))
        }
        "error" => {
            stats.outputs.text += 1;
            let ename = output.get("ename").and_then(Value::as_str).unwrap_or("Error");
            let evalue = output.get("evalue").and_then(Value::as_str).unwrap_or("");
            Some(format!("Error:\n```\n{}: {}\n```", ename, evalue))
        }
        "execute_result" | "display_data" => {
            let data = output.get("data")?.as_object()?;
            if let Some((mime, payload)) = data.iter().find(|(mime, _)| is_non_text_mime(mime)) {
                return Some(render_non_text(mime, &joined_text(Some(payload)), options, stats));
            }
            if let Some(html) = data.get("text/html") {
                stats.outputs.text += 1;
                let clean = sanitize_html(&joined_text(Some(html)));
                return Some(format!("Output:\n```html\n{}\n```", clean.trim_end()));
            }
            if let Some(json) = data.get("application/json") {
                stats.outputs.text += 1;
                let pretty = serde_json::to_string_pretty(json).unwrap_or_default();
                return Some(format!("Output:\n```json\n{}\n```", pretty));
            }
            let text = data
                .get("text/markdown")
                .or_else(|| data.get("text/plain"))
                .map(|v| joined_text(Some(v)))?;
            stats.outputs.text += 1;
            Some(format!("Output:\n```\n{}\n```", text.trim_end()))
        }
        _ => None,
    }
}

fn is_non_text_mime(mime: &str) -> bool {
    mime.starts_with("image/") || mime.starts_with("audio/") || mime.starts_with("video/") || mime == "application/pdf"
}

fn render_non_text(mime: &str, payload: &str, options: &NotebookOptions, stats: &mut NotebookStats) -> String {
    stats.outputs.non_text += 1;
    // SVG is stored as markup, everything else as base64.
    let (data, bytes) = if mime == "image/svg+xml" {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode(payload.as_bytes());
        (encoded, payload.len())
    } else {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = compact.len() / 4 * 3;
        (compact, bytes)
    };
    if !options.include_non_text_outputs {
        stats.outputs.skipped += 1;
        return format!("[[non-text output omitted: {}, {} bytes]]", mime, bytes);
    }
    if bytes > options.non_text_output_max_bytes {
        stats.outputs.skipped += 1;
        return format!(
            "[[non-text output truncated: {}, {} bytes exceeds the {} byte limit]]",
            mime, bytes, options.non_text_output_max_bytes
        );
    }
    format!("![{} output](data:{};base64,{})", mime, mime, data)
}

static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid regex literal")
});
static EVENT_HANDLER_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\s+on[a-z]+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#).expect("valid regex literal")
});
static JS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(href|src)\s*=\s*(["']?)\s*javascript:[^"'\s>]*"#).expect("valid regex literal")
});

/// Strip script blocks, `on*=` handler attributes, and `javascript:` URLs.
pub fn sanitize_html(html: &str) -> String {
    let no_scripts = SCRIPT_BLOCK.replace_all(html, "");
    let no_handlers = EVENT_HANDLER_ATTR.replace_all(&no_scripts, "");
    JS_URL.replace_all(&no_handlers, "$1=$2#").into_owned()
}

static MD_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)\s]+)[^)]*\)").expect("valid regex literal"));
static MD_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)\s]+)[^)]*\)").expect("valid regex literal"));
static MD_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s{0,3}#{1,6}\s+").expect("valid regex literal"));
static MD_STRONG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*|__([^_]+)__").expect("valid regex literal"));
static MD_EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*\s][^*]*)\*|\b_([^_\s][^_]*)_\b").expect("valid regex literal"));
static MD_STRIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"~~([^~]+)~~").expect("valid regex literal"));
static MD_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("valid regex literal"));

/// Plain-text rendering of a markdown cell: no emphasis markers, links as `text (url)`.
pub fn markdown_to_plain(markdown: &str) -> String {
    let s = MD_IMAGE.replace_all(markdown, "$1 ($2)");
    let s = MD_LINK.replace_all(&s, "$1 ($2)");
    let s = MD_HEADING.replace_all(&s, "");
    let s = MD_STRONG.replace_all(&s, "$1$2");
    let s = MD_EMPHASIS.replace_all(&s, "$1$2");
    let s = MD_STRIKE.replace_all(&s, "$1");
    let s = MD_CODE.replace_all(&s, "$1");
    s.trim_end().to_string()
}
