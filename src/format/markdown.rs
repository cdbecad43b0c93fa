//! Markdown digest: metadata list, summary table, file tree, fenced file blocks.

use crate::engine::language::fence_language;
use crate::types::{DigestResult, ProcessedFileContent};

use super::template::{document_bag, file_bag};
use super::tree::render_tree;
use super::{Formatter, FormatterOptions, templated};

#[derive(Debug, Clone, Default)]
pub struct MarkdownFormatter {
    options: FormatterOptions,
}

impl MarkdownFormatter {
    pub fn new(options: FormatterOptions) -> Self {
        Self { options }
    }
}

/// A fence longer than any backtick run in `content`, at least three.
fn fence_for(content: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in content.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

impl Formatter for MarkdownFormatter {
    fn options(&self) -> &FormatterOptions {
        &self.options
    }

    fn build_header(&self, result: &DigestResult) -> String {
        templated(
            self.options.templates.header.as_ref(),
            || document_bag(result),
            || {
                let meta = &result.content.metadata;
                let mut s = String::from("# Repository Digest\n");
                if self.options.include_metadata {
                    s.push('\n');
                    s.push_str(&format!("- **Workspace:** `{}`\n", meta.workspace_root));
                    s.push_str(&format!("- **Generated:** {}\n", meta.generated_at));
                    s.push_str(&format!(
                        "- **Files:** {} included of {} ({} skipped)\n",
                        meta.included_files, meta.total_files, meta.skipped_files
                    ));
                    s.push_str(&format!(
                        "- **Tokens:** {} / {}\n",
                        meta.total_tokens, meta.max_tokens
                    ));
                    if meta.redaction_applied {
                        s.push_str("- **Redaction:** applied\n");
                    }
                }
                s
            },
        )
    }

    fn build_summary(&self, result: &DigestResult) -> String {
        templated(
            self.options.templates.summary.as_ref(),
            || document_bag(result),
            || {
                let summary = &result.content.summary;
                let mut s = String::from("## Summary\n\n");
                s.push_str("|File|Tokens|Truncated|\n");
                s.push_str("|---|---:|:---:|\n");
                for entry in &summary.table_of_contents {
                    s.push_str(&format!(
                        "|`{}`|{}|{}|\n",
                        entry.path,
                        entry.tokens,
                        if entry.truncated { "yes" } else { "" }
                    ));
                }
                s.push_str(&format!(
                    "|**Total ({} files)**|{}|{}|\n",
                    summary.total_files, summary.total_tokens, summary.truncated_files
                ));
                if !summary.notes.is_empty() {
                    s.push_str("\n### Notes\n\n");
                    for note in &summary.notes {
                        s.push_str(&format!("- {}\n", note));
                    }
                }
                s
            },
        )
    }

    fn build_file_tree(&self, result: &DigestResult) -> String {
        if !self.options.include_tree || result.content.files.is_empty() {
            return String::new();
        }
        templated(
            self.options.templates.file_tree.as_ref(),
            || document_bag(result),
            || {
                let tree = render_tree(".", &result.content.summary.table_of_contents, self.options.tree_tokens);
                format!("## File Tree\n\n```\n{}\n```\n", tree)
            },
        )
    }

    fn build_file_content(&self, file: &ProcessedFileContent, result: &DigestResult) -> String {
        templated(
            self.options.templates.file.as_ref(),
            || file_bag(result, file),
            || {
                let mut s = format!("## {}\n\n", file.relative_path);
                let mut facts = vec![format!("{} tokens", file.tokens)];
                if let Some(lang) = &file.language_id {
                    facts.push(lang.clone());
                }
                if file.encoding != "utf-8" {
                    facts.push(file.encoding.clone());
                }
                if file.truncated {
                    facts.push("truncated".to_string());
                }
                if file.redacted {
                    facts.push("redacted".to_string());
                }
                s.push_str(&format!("_{}_\n\n", facts.join(" · ")));
                let fence = fence_for(&file.content);
                s.push_str(&format!(
                    "{}{}\n{}\n{}\n",
                    fence,
                    fence_language(file.language_id.as_deref()),
                    file.content.trim_end_matches('\n'),
                    fence
                ));
                s
            },
        )
    }

    fn build_footer(&self, result: &DigestResult) -> String {
        templated(
            self.options.templates.footer.as_ref(),
            || document_bag(result),
            || {
                let stats = &result.statistics;
                let mut s = String::from("---\n\n");
                if !stats.errors.is_empty() {
                    s.push_str("### Errors\n\n");
                    for err in &stats.errors {
                        s.push_str(&format!("- {}\n", err));
                    }
                    s.push('\n');
                }
                s.push_str(&format!(
                    "_Generated by {} in {} ms._\n",
                    result.content.metadata.generator_version, stats.processing_time_ms
                ));
                s
            },
        )
    }
}
