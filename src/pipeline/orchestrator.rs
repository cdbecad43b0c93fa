//! Main orchestrator: config → context → scan → filter → priority → process → aggregate.
//!
//! Per-file failures are folded into the result; only configuration, scan and cancellation
//! fail the run. Partial results are never returned.

use log::{debug, info, warn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use time::OffsetDateTime;

use crate::engine::content::{ContentOptions, ContentProcessor, FileProcessor};
use crate::engine::notebook::{NotebookOptions, NotebookProcessor};
use crate::engine::redact::redact;
use crate::engine::tokens::{AnalyzeOptions, TokenAnalyzer, TokenBudget};
use crate::engine::tools::is_notebook;
use crate::error::{DigestError, Outcome};
use crate::types::{Candidate, DigestConfig, DigestOptions, DigestResult, Phase, ProcessedFileContent};
use crate::utils::config::DigestDefaults;
use crate::utils::settings::{ConfigurationService, StaticConfigService};

use super::aggregate::{self, RunFacts};
use super::budget::{BudgetLedger, TruncationSettings, enforce_budget};
use super::cancel::check_cancelled;
use super::context::PipelineContext;
use super::error_handler::{
    ErrorContext, ErrorReporter, ErrorStage, LogReporter, classify_error, log_skipped_paths,
    report_best_effort,
};
use super::filter::{FilterOptions, FilterService};
use super::pool::{Task, run_bounded};
use super::priority::sort_by_priority;
use super::progress::{ProgressEmitter, Throttle};
use super::scan::{ScanOptions, Scanner};
use super::telemetry::{LogTelemetry, Telemetry, TelemetryEvent};

/// Composes the leaf services into a digest run. Cheap to clone; holds no per-run state.
#[derive(Clone)]
pub struct DigestGenerator {
    config_service: Arc<dyn ConfigurationService>,
    processor: Arc<dyn FileProcessor>,
    notebook: NotebookProcessor,
    /// `None`: chosen per run from the config's adapter preferences.
    analyzer: Option<TokenAnalyzer>,
    reporter: Arc<dyn ErrorReporter>,
    telemetry: Arc<dyn Telemetry>,
}

impl DigestGenerator {
    pub fn new(config_service: Arc<dyn ConfigurationService>) -> Self {
        Self {
            config_service,
            processor: Arc::new(ContentProcessor::new()),
            notebook: NotebookProcessor::new(),
            analyzer: None,
            reporter: Arc::new(LogReporter),
            telemetry: Arc::new(LogTelemetry),
        }
    }

    /// Generator over a fixed config.
    pub fn from_config(config: DigestConfig) -> Self {
        Self::new(Arc::new(StaticConfigService::new(config)))
    }

    pub fn with_processor(mut self, processor: Arc<dyn FileProcessor>) -> Self {
        self.processor = processor;
        self
    }

    pub fn with_analyzer(mut self, analyzer: TokenAnalyzer) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Run the whole pipeline once.
    pub fn generate_digest(&self, options: DigestOptions) -> Outcome<DigestResult> {
        let started = Instant::now();
        let started_at = OffsetDateTime::now_utc();
        self.telemetry.record(TelemetryEvent::DigestStarted);

        let result = self.run(&options, started, started_at);
        match &result {
            Ok(digest) => {
                self.telemetry.record(TelemetryEvent::DigestCompleted {
                    duration: started.elapsed(),
                    files: digest.content.files.len(),
                    tokens: digest.statistics.total_tokens,
                    truncated: digest.truncation_applied,
                });
            }
            Err(err) => {
                self.telemetry.record(TelemetryEvent::DigestFailed {
                    duration: started.elapsed(),
                    cancelled: err.is_cancelled(),
                    message: err.to_string(),
                });
            }
        }
        result
    }

    fn run(&self, options: &DigestOptions, started: Instant, started_at: OffsetDateTime) -> Outcome<DigestResult> {
        let cancel = options.cancel.as_ref();
        check_cancelled(cancel)?;

        let config = self.config_service.load_config().map_err(DigestError::Config)?;
        let ctx = PipelineContext::resolve(config, options).map_err(DigestError::Config)?;
        check_cancelled(cancel)?;
        let emitter = ProgressEmitter::new(options.on_progress.clone(), started);

        // Phase 1: scan
        emitter.emit(Phase::Scanning, 0, 0, 0, None);
        let scanner = Scanner::new(&ctx.workspace_root).map_err(DigestError::Scan)?;
        let scan_options = ScanOptions {
            max_entries: ctx.max_files.saturating_mul(DigestDefaults::SCAN_ENTRY_MULTIPLIER),
            max_depth: ctx.config.max_depth,
            follow_symlinks: ctx.config.follow_symlinks,
            parallel_walk: ctx.config.parallel_walk,
            cancel: ctx.cancel.clone(),
        };
        let throttle = Throttle::new(DigestDefaults::SCAN_PROGRESS_INTERVAL);
        let mut on_scan = |processed: usize, _total: Option<usize>, path: Option<&std::path::Path>| {
            if emitter.is_active() && throttle.ready() {
                let current = path.map(|p| p.display().to_string());
                emitter.emit(Phase::Scanning, processed, 0, 0, current.as_deref());
            }
        };
        let report = scanner.scan(&scan_options, Some(&mut on_scan))?;
        log_skipped_paths(&report.skipped, false);
        check_cancelled(cancel)?;

        // Phase 2: filter + select
        let filter = FilterService::new(
            &ctx.workspace_root,
            FilterOptions {
                include_patterns: ctx.config.include_patterns.clone(),
                exclude_patterns: ctx.config.exclude_patterns.clone(),
                use_gitignore: ctx.config.use_gitignore,
                follow_symlinks: ctx.config.follow_symlinks,
            },
        )
        .map_err(DigestError::Config)?;
        let file_nodes: Vec<_> = report.files().cloned().collect();
        let paths: Vec<_> = file_nodes.iter().map(|n| n.path.clone()).collect();
        let decisions = filter.batch_filter(&paths);
        check_cancelled(cancel)?;

        let mut candidates: Vec<Candidate> = file_nodes
            .into_iter()
            .filter(|node| decisions.get(&node.path).is_some_and(|d| d.included))
            .filter(|node| ctx.is_selected(&node.rel_path))
            .map(|node| Candidate {
                absolute_path: node.path.clone(),
                relative_path: node.rel_path.clone(),
                source_node: node,
            })
            .collect();
        debug!(
            "{} of {} scanned files are candidates",
            candidates.len(),
            paths.len()
        );

        // Phase 3: priority + count cap
        sort_by_priority(&mut candidates);
        let total_candidates = candidates.len();
        let mut warnings = Vec::new();
        let mut truncation_applied = report.truncated;
        if candidates.len() > ctx.max_files {
            candidates.truncate(ctx.max_files);
            truncation_applied = true;
            warnings.push(format!(
                "Only the first {} of {} files were included (max files).",
                ctx.max_files, total_candidates
            ));
        }
        if report.truncated {
            warnings.push(format!(
                "Scan stopped after {} entries; some files were not considered.",
                scan_options.max_entries
            ));
        }

        // Phase 4: process
        let total = candidates.len();
        emitter.emit(Phase::Processing, 0, total, 0, None);
        let state = Arc::new(RunState {
            content_options: ContentOptions::from_config(&ctx.config, ctx.binary_policy, ctx.include_metadata),
            notebook_options: NotebookOptions::from_config(&ctx.config),
            truncation: TruncationSettings {
                max_iterations: ctx.config.truncation_max_iterations,
                ..TruncationSettings::default()
            },
            analyzer: self
                .analyzer
                .clone()
                .unwrap_or_else(|| TokenAnalyzer::from_preferences(&ctx.config.token_adapters)),
            processor: Arc::clone(&self.processor),
            notebook: self.notebook,
            reporter: Arc::clone(&self.reporter),
            ledger: Mutex::new(BudgetLedger::new(ctx.max_tokens)),
            accumulator: Mutex::new(Accumulator::default()),
            done: AtomicUsize::new(0),
            total,
            emitter,
            ctx,
        });

        let tasks: Vec<Task<(), DigestError>> = candidates
            .into_iter()
            .map(|candidate| {
                let state = Arc::clone(&state);
                Box::new(move || state.process_candidate(&candidate)) as Task<(), DigestError>
            })
            .collect();
        run_bounded(tasks, state.ctx.config.concurrency)?;
        check_cancelled(cancel)?;

        // Phase 5: aggregate
        let tokens_used = lock(&state.ledger).used();
        state.emitter.emit(Phase::Generating, total, total, tokens_used, None);
        let acc = std::mem::take(&mut *lock(&state.accumulator));
        warnings.extend(acc.warnings);
        let files = aggregate::sort_files(acc.files)?;
        truncation_applied |= files.iter().any(|f| f.truncated);
        let processing_time_ms = started.elapsed().as_millis() as u64;
        let summary = aggregate::build_summary(&files, &warnings)?;
        let metadata = aggregate::build_metadata(
            &files,
            &RunFacts {
                started_at,
                workspace_root: &state.ctx.workspace_root,
                total_candidates,
                max_tokens: state.ctx.max_tokens,
                processing_time_ms,
                redaction_applied: state.ctx.should_redact,
            },
        );
        let statistics = aggregate::build_statistics(&files, processing_time_ms, &warnings, acc.errors);
        check_cancelled(cancel)?;

        state.emitter.emit(Phase::Formatting, total, total, tokens_used, None);
        let result = aggregate::build_result(files, summary, metadata, statistics, truncation_applied)?;
        state.emitter.emit(Phase::Complete, total, total, tokens_used, None);

        info!(
            "Digest: {} files, {} tokens, {} errors in {} ms",
            result.statistics.files_processed,
            result.statistics.total_tokens,
            result.statistics.errors.len(),
            result.statistics.processing_time_ms
        );
        Ok(result)
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Default)]
struct Accumulator {
    files: Vec<ProcessedFileContent>,
    warnings: Vec<String>,
    errors: Vec<String>,
}

/// Everything one run's worker tasks share.
struct RunState {
    ctx: PipelineContext,
    content_options: ContentOptions,
    notebook_options: NotebookOptions,
    truncation: TruncationSettings,
    analyzer: TokenAnalyzer,
    processor: Arc<dyn FileProcessor>,
    notebook: NotebookProcessor,
    reporter: Arc<dyn ErrorReporter>,
    ledger: Mutex<BudgetLedger>,
    accumulator: Mutex<Accumulator>,
    done: AtomicUsize,
    total: usize,
    emitter: ProgressEmitter,
}

impl RunState {
    /// Process, analyze, budget and record one candidate. Only cancellation is returned as `Err`.
    fn process_candidate(&self, candidate: &Candidate) -> Outcome<()> {
        let cancel = self.ctx.cancel.as_ref();
        let rel = candidate.relative_path.as_str();
        check_cancelled(cancel)?;

        let processed = match self.processor.process_file(&candidate.absolute_path, &self.content_options) {
            Ok(p) => p,
            Err(err) => {
                self.record_failure(rel, ErrorStage::Content, err);
                return self.finish_one(rel);
            }
        };
        check_cancelled(cancel)?;

        let mut warnings: Vec<String> = processed
            .warnings
            .iter()
            .map(|w| format!("{}: {}", rel, w))
            .collect();
        if processed.skipped {
            debug!("{} left out ({})", rel, processed.encoding);
            lock(&self.accumulator).warnings.extend(warnings);
            return self.finish_one(rel);
        }

        let mut content = processed.content;
        let mut metadata = processed.metadata;
        if is_notebook(&candidate.absolute_path) && !processed.is_binary {
            let notebook = self.notebook.process_str(&content, &self.notebook_options);
            warnings.extend(notebook.warnings.iter().map(|w| format!("{}: {}", rel, w)));
            content = notebook.content;
            if self.ctx.include_metadata {
                metadata.lines = Some(content.lines().count());
                metadata.notebook = Some(notebook.stats);
            }
        }
        check_cancelled(cancel)?;

        let tokens_so_far = lock(&self.ledger).used();
        self.emitter.emit(
            Phase::Analyzing,
            self.done.load(Ordering::Relaxed),
            self.total,
            tokens_so_far,
            Some(rel),
        );
        let analyze_options = AnalyzeOptions {
            budget: Some(TokenBudget::warn_only(self.ctx.max_tokens)),
            skip_cache: false,
        };
        let analysis = match self.analyzer.analyze(&content, &analyze_options) {
            Ok(a) => a,
            Err(err) => {
                self.record_failure(rel, ErrorStage::Analyze, err);
                return self.finish_one(rel);
            }
        };
        check_cancelled(cancel)?;

        let decision = match enforce_budget(
            &self.ledger,
            rel,
            &content,
            &analysis,
            &self.analyzer,
            &self.truncation,
            cancel,
        ) {
            Ok(d) => d,
            Err(DigestError::Cancelled) => return Err(DigestError::Cancelled),
            Err(err) => {
                self.record_failure(rel, ErrorStage::Analyze, anyhow::Error::new(err));
                return self.finish_one(rel);
            }
        };
        warnings.extend(decision.warnings);

        let (content, redacted) = if self.ctx.should_redact {
            let (text, hits) = redact(&decision.content);
            (text, hits > 0)
        } else {
            (decision.content, false)
        };

        let file = ProcessedFileContent {
            path: candidate.absolute_path.clone(),
            relative_path: candidate.relative_path.clone(),
            tokens: decision.tokens,
            content,
            language_id: processed.language_id,
            encoding: processed.encoding,
            truncated: decision.truncated,
            redacted,
            metadata,
            warnings: warnings.clone(),
            errors: Vec::new(),
        };
        {
            let mut acc = lock(&self.accumulator);
            acc.warnings.extend(warnings);
            acc.files.push(file);
        }
        self.finish_one(rel)
    }

    fn record_failure(&self, rel: &str, stage: ErrorStage, err: anyhow::Error) {
        let message = match stage {
            ErrorStage::Content => format!("{}: failed to process content ({:#}).", rel, err),
            ErrorStage::Analyze => format!("{}: failed to analyze tokens ({:#}).", rel, err),
        };
        warn!("{}", message);
        lock(&self.accumulator).errors.push(message);
        let context = ErrorContext {
            stage,
            relative_path: rel.to_string(),
            kind: classify_error(&err, stage),
        };
        report_best_effort(self.reporter.as_ref(), &err, &context);
    }

    fn finish_one(&self, rel: &str) -> Outcome<()> {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        let tokens = lock(&self.ledger).used();
        self.emitter.emit(Phase::Processing, done, self.total, tokens, Some(rel));
        check_cancelled(self.ctx.cancel.as_ref())
    }
}
