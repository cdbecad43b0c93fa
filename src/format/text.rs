//! Plain-text digest with underlined headings and delimited file bodies.

use crate::types::{DigestResult, ProcessedFileContent};

use super::template::{document_bag, file_bag};
use super::tree::render_tree;
use super::{Formatter, FormatterOptions, templated};

const RULE_WIDTH: usize = 80;

#[derive(Debug, Clone, Default)]
pub struct TextFormatter {
    options: FormatterOptions,
}

impl TextFormatter {
    pub fn new(options: FormatterOptions) -> Self {
        Self { options }
    }
}

fn heading(title: &str, underline: char) -> String {
    format!("{}\n{}\n", title, underline.to_string().repeat(title.chars().count()))
}

impl Formatter for TextFormatter {
    fn options(&self) -> &FormatterOptions {
        &self.options
    }

    fn build_header(&self, result: &DigestResult) -> String {
        templated(self.options.templates.header.as_ref(), || document_bag(result), || {
            let meta = &result.content.metadata;
            let mut s = heading("REPOSITORY DIGEST", '=');
            if self.options.include_metadata {
                s.push_str(&format!("Workspace: {}\n", meta.workspace_root));
                s.push_str(&format!("Generated: {}\n", meta.generated_at));
                s.push_str(&format!(
                    "Files:     {} included of {} ({} skipped)\n",
                    meta.included_files, meta.total_files, meta.skipped_files
                ));
                s.push_str(&format!("Tokens:    {} / {}\n", meta.total_tokens, meta.max_tokens));
                if meta.redaction_applied {
                    s.push_str("Redaction: applied\n");
                }
            }
            s
        })
    }

    fn build_summary(&self, result: &DigestResult) -> String {
        templated(self.options.templates.summary.as_ref(), || document_bag(result), || {
            let summary = &result.content.summary;
            let mut s = heading("Summary", '-');
            s.push_str(&format!(
                "{} files, {} tokens, {} truncated\n",
                summary.total_files, summary.total_tokens, summary.truncated_files
            ));
            for note in &summary.notes {
                s.push_str(&format!("  * {}\n", note));
            }
            s
        })
    }

    fn build_file_tree(&self, result: &DigestResult) -> String {
        if !self.options.include_tree || result.content.files.is_empty() {
            return String::new();
        }
        templated(self.options.templates.file_tree.as_ref(), || document_bag(result), || {
            let mut s = heading("Files", '-');
            s.push_str(&render_tree(".", &result.content.summary.table_of_contents, self.options.tree_tokens));
            s.push('\n');
            s
        })
    }

    fn build_file_content(&self, file: &ProcessedFileContent, result: &DigestResult) -> String {
        templated(self.options.templates.file.as_ref(), || file_bag(result, file), || {
            let rule = "=".repeat(RULE_WIDTH);
            let mut s = format!("{}\nFILE: {}\n", rule, file.relative_path);
            s.push_str(&format!(
                "TOKENS: {}{}\n",
                file.tokens,
                if file.truncated { " (truncated)" } else { "" }
            ));
            s.push_str(&format!("{}\n", rule));
            s.push_str(file.content.trim_end_matches('\n'));
            s.push('\n');
            s
        })
    }

    fn build_footer(&self, result: &DigestResult) -> String {
        templated(self.options.templates.footer.as_ref(), || document_bag(result), || {
            let stats = &result.statistics;
            let mut s = "-".repeat(RULE_WIDTH);
            s.push('\n');
            for err in &stats.errors {
                s.push_str(&format!("ERROR: {}\n", err));
            }
            s.push_str(&format!(
                "Generated by {} in {} ms.\n",
                result.content.metadata.generator_version, stats.processing_time_ms
            ));
            s
        })
    }
}
