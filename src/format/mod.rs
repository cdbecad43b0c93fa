//! Rendering a [`DigestResult`] into markdown, JSON, NDJSON or plain text.
//!
//! Every formatter builds the same sections (header, summary, file tree, one block per file,
//! footer). [`Formatter::finalize`] joins the non-empty ones in document order. A section with
//! a template in [`SectionTemplates`] is rendered from the template instead of the built-in
//! layout.

pub mod json;
pub mod markdown;
pub mod template;
pub mod text;
pub mod tree;

use anyhow::{Context, Result};

use crate::types::{DigestResult, OutputFormat, ProcessedFileContent};

pub use json::{JsonFormatter, NdjsonFormatter};
pub use markdown::MarkdownFormatter;
pub use template::{render_template, validate_template};
pub use text::TextFormatter;

/// Per-section template overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionTemplates {
    pub header: Option<String>,
    pub summary: Option<String>,
    pub file_tree: Option<String>,
    pub file: Option<String>,
    pub footer: Option<String>,
}

impl SectionTemplates {
    /// Validate every template that is set.
    pub fn validate(&self) -> Result<()> {
        let named = [
            ("header", &self.header),
            ("summary", &self.summary),
            ("file_tree", &self.file_tree),
            ("file", &self.file),
            ("footer", &self.footer),
        ];
        for (name, template) in named {
            if let Some(t) = template {
                validate_template(t).with_context(|| format!("{} template", name))?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FormatterOptions {
    /// Joins non-empty sections in [`Formatter::finalize`].
    pub section_separator: String,
    /// Show the metadata block in the header.
    pub include_metadata: bool,
    pub include_tree: bool,
    /// Token counts next to tree entries.
    pub tree_tokens: bool,
    pub templates: SectionTemplates,
}

impl Default for FormatterOptions {
    fn default() -> Self {
        Self {
            section_separator: "\n\n".to_string(),
            include_metadata: true,
            include_tree: true,
            tree_tokens: true,
            templates: SectionTemplates::default(),
        }
    }
}

/// Section builders plus document assembly.
pub trait Formatter {
    fn options(&self) -> &FormatterOptions;

    fn build_header(&self, result: &DigestResult) -> String;
    fn build_summary(&self, result: &DigestResult) -> String;
    fn build_file_tree(&self, result: &DigestResult) -> String;
    fn build_file_content(&self, file: &ProcessedFileContent, result: &DigestResult) -> String;
    fn build_footer(&self, result: &DigestResult) -> String;

    /// Header, summary, tree, files, footer; empty sections skipped. Pure: same input, same bytes.
    fn finalize(&self, result: &DigestResult) -> Result<String> {
        let sections = std::iter::once(self.build_header(result))
            .chain(std::iter::once(self.build_summary(result)))
            .chain(std::iter::once(self.build_file_tree(result)))
            .chain(
                result
                    .content
                    .files
                    .iter()
                    .map(|f| self.build_file_content(f, result)),
            )
            .chain(std::iter::once(self.build_footer(result)))
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>();
        let mut doc = sections.join(&self.options().section_separator);
        if !doc.is_empty() && !doc.ends_with('\n') {
            doc.push('\n');
        }
        Ok(doc)
    }
}

/// Template output when one is configured, otherwise the built-in rendering.
pub(crate) fn templated(template: Option<&String>, bag: impl FnOnce() -> serde_json::Value, builtin: impl FnOnce() -> String) -> String {
    match template {
        Some(t) => render_template(t, &bag()),
        None => builtin(),
    }
}

/// Formatter for `format`.
pub fn formatter_for(format: OutputFormat, options: FormatterOptions) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Markdown => Box::new(MarkdownFormatter::new(options)),
        OutputFormat::Json => Box::new(JsonFormatter::pretty(options)),
        OutputFormat::Ndjson => Box::new(NdjsonFormatter::new(options)),
        OutputFormat::Text => Box::new(TextFormatter::new(options)),
    }
}

/// Validate the templates, then render.
pub fn render(result: &DigestResult, format: OutputFormat, options: FormatterOptions) -> Result<String> {
    options.templates.validate()?;
    formatter_for(format, options).finalize(result)
}
