//! JSON (whole document) and NDJSON (one typed record per line) output.

use anyhow::Result;
use serde::Serialize;

use crate::types::{DigestResult, ProcessedFileContent};

use super::template::{document_bag, file_bag};
use super::{Formatter, FormatterOptions, templated};

/// Bumped when a record layout changes.
pub const SCHEMA_VERSION: u32 = 1;

fn to_json<T: Serialize>(value: &T, pretty: bool) -> String {
    let out = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    out.unwrap_or_default()
}

#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    options: FormatterOptions,
    pretty: bool,
}

impl JsonFormatter {
    pub fn pretty(options: FormatterOptions) -> Self {
        Self { options, pretty: true }
    }

    pub fn compact(options: FormatterOptions) -> Self {
        Self { options, pretty: false }
    }
}

impl Formatter for JsonFormatter {
    fn options(&self) -> &FormatterOptions {
        &self.options
    }

    fn build_header(&self, result: &DigestResult) -> String {
        templated(self.options.templates.header.as_ref(), || document_bag(result), || {
            to_json(&result.content.metadata, self.pretty)
        })
    }

    fn build_summary(&self, result: &DigestResult) -> String {
        templated(self.options.templates.summary.as_ref(), || document_bag(result), || {
            to_json(&result.content.summary, self.pretty)
        })
    }

    fn build_file_tree(&self, result: &DigestResult) -> String {
        templated(self.options.templates.file_tree.as_ref(), || document_bag(result), || {
            to_json(&result.content.summary.table_of_contents, self.pretty)
        })
    }

    fn build_file_content(&self, file: &ProcessedFileContent, result: &DigestResult) -> String {
        templated(self.options.templates.file.as_ref(), || file_bag(result, file), || {
            to_json(file, self.pretty)
        })
    }

    fn build_footer(&self, result: &DigestResult) -> String {
        templated(self.options.templates.footer.as_ref(), || document_bag(result), || {
            to_json(&result.statistics, self.pretty)
        })
    }

    /// The whole result as one JSON document; section templates do not apply.
    fn finalize(&self, result: &DigestResult) -> Result<String> {
        let mut out = if self.pretty {
            serde_json::to_string_pretty(result)?
        } else {
            serde_json::to_string(result)?
        };
        out.push('\n');
        Ok(out)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Record<'a, T: Serialize> {
    #[serde(rename = "type")]
    ty: &'static str,
    schema_version: u32,
    #[serde(flatten)]
    body: &'a T,
}

fn record<T: Serialize>(ty: &'static str, body: &T) -> Result<String> {
    Ok(serde_json::to_string(&Record {
        ty,
        schema_version: SCHEMA_VERSION,
        body,
    })?)
}

/// Lines: `metadata`, `summary`, one `file` per file, `statistics`.
#[derive(Debug, Clone, Default)]
pub struct NdjsonFormatter {
    options: FormatterOptions,
}

impl NdjsonFormatter {
    pub fn new(options: FormatterOptions) -> Self {
        Self { options }
    }
}

impl Formatter for NdjsonFormatter {
    fn options(&self) -> &FormatterOptions {
        &self.options
    }

    fn build_header(&self, result: &DigestResult) -> String {
        record("metadata", &result.content.metadata).unwrap_or_default()
    }

    fn build_summary(&self, result: &DigestResult) -> String {
        record("summary", &result.content.summary).unwrap_or_default()
    }

    /// Covered by the summary record's table of contents.
    fn build_file_tree(&self, _result: &DigestResult) -> String {
        String::new()
    }

    fn build_file_content(&self, file: &ProcessedFileContent, _result: &DigestResult) -> String {
        record("file", file).unwrap_or_default()
    }

    fn build_footer(&self, result: &DigestResult) -> String {
        record("statistics", &result.statistics).unwrap_or_default()
    }

    fn finalize(&self, result: &DigestResult) -> Result<String> {
        let mut out = String::new();
        out.push_str(&record("metadata", &result.content.metadata)?);
        out.push('\n');
        out.push_str(&record("summary", &result.content.summary)?);
        out.push('\n');
        for file in &result.content.files {
            out.push_str(&record("file", file)?);
            out.push('\n');
        }
        out.push_str(&record("statistics", &result.statistics)?);
        out.push('\n');
        Ok(out)
    }
}
