//! Final assembly of a run: files sorted by path, summary, metadata, statistics.
//! Each builder checks its invariants before returning.

use anyhow::{Result, bail, ensure};
use std::collections::HashSet;
use std::path::Path;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::types::{
    DigestContent, DigestMetadata, DigestResult, DigestStatistics, DigestSummary,
    ProcessedFileContent, TocEntry,
};
use crate::utils::config::PackagePaths;

/// Current UTC time as RFC 3339.
pub fn now_rfc3339() -> String {
    format_rfc3339(OffsetDateTime::now_utc())
}

pub fn format_rfc3339(at: OffsetDateTime) -> String {
    at.format(&Rfc3339)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}

/// Drop repeats, keeping first-seen order.
pub fn dedupe(items: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|w| seen.insert(w.as_str()))
        .cloned()
        .collect()
}

/// Sort by relative path and reject duplicates.
pub fn sort_files(mut files: Vec<ProcessedFileContent>) -> Result<Vec<ProcessedFileContent>> {
    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    if let Some(pair) = files
        .windows(2)
        .find(|w| w[0].relative_path == w[1].relative_path)
    {
        bail!("duplicate file in digest: {}", pair[0].relative_path);
    }
    Ok(files)
}

/// Summary over already-sorted files. Notes are the deduplicated warnings.
pub fn build_summary(files: &[ProcessedFileContent], warnings: &[String]) -> Result<DigestSummary> {
    let table_of_contents: Vec<TocEntry> = files
        .iter()
        .map(|f| TocEntry {
            path: f.relative_path.clone(),
            tokens: f.tokens,
            truncated: f.truncated,
        })
        .collect();
    ensure!(
        table_of_contents.len() == files.len(),
        "table of contents has {} entries for {} files",
        table_of_contents.len(),
        files.len()
    );
    ensure!(
        table_of_contents.windows(2).all(|w| w[0].path < w[1].path),
        "table of contents is not sorted by path"
    );
    Ok(DigestSummary {
        total_files: files.len(),
        total_tokens: files.iter().map(|f| f.tokens).sum(),
        truncated_files: files.iter().filter(|f| f.truncated).count(),
        table_of_contents,
        notes: dedupe(warnings),
    })
}

/// Inputs for [`build_metadata`] that are not derivable from the files.
#[derive(Debug, Clone)]
pub struct RunFacts<'a> {
    pub started_at: OffsetDateTime,
    pub workspace_root: &'a Path,
    /// Candidates after filtering, before the count cap.
    pub total_candidates: usize,
    pub max_tokens: usize,
    pub processing_time_ms: u64,
    pub redaction_applied: bool,
}

pub fn build_metadata(files: &[ProcessedFileContent], facts: &RunFacts<'_>) -> DigestMetadata {
    let included = files.len();
    DigestMetadata {
        started_at: format_rfc3339(facts.started_at),
        generated_at: now_rfc3339(),
        workspace_root: facts.workspace_root.display().to_string(),
        total_files: facts.total_candidates,
        included_files: included,
        skipped_files: facts.total_candidates.saturating_sub(included),
        total_tokens: files.iter().map(|f| f.tokens).sum(),
        max_tokens: facts.max_tokens,
        processing_time_ms: facts.processing_time_ms,
        redaction_applied: facts.redaction_applied,
        generator_version: PackagePaths::get().generator_version(),
    }
}

/// Warnings are deduplicated; errors are kept as encountered.
pub fn build_statistics(
    files: &[ProcessedFileContent],
    processing_time_ms: u64,
    warnings: &[String],
    errors: Vec<String>,
) -> DigestStatistics {
    DigestStatistics {
        files_processed: files.len(),
        total_tokens: files.iter().map(|f| f.tokens).sum(),
        processing_time_ms,
        warnings: dedupe(warnings),
        errors,
    }
}

/// Assemble the result and cross-check the pieces.
pub fn build_result(
    files: Vec<ProcessedFileContent>,
    summary: DigestSummary,
    metadata: DigestMetadata,
    statistics: DigestStatistics,
    truncation_applied: bool,
) -> Result<DigestResult> {
    ensure!(
        statistics.files_processed == files.len(),
        "statistics count {} does not match {} files",
        statistics.files_processed,
        files.len()
    );
    ensure!(
        summary.table_of_contents.len() == files.len(),
        "summary does not cover every file"
    );
    let redaction_applied = metadata.redaction_applied;
    Ok(DigestResult {
        content: DigestContent {
            files,
            summary,
            metadata,
        },
        statistics,
        redaction_applied,
        truncation_applied,
    })
}
