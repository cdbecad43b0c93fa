use repodigest::engine::tokens::AnalyzeOptions;
use repodigest::engine::{TokenAnalyzer, TokenBudget};
use repodigest::pipeline::filter::build_globset;
use repodigest::pipeline::progress::{ProgressEmitter, Throttle};
use repodigest::pipeline::{
    BudgetLedger, FilterOptions, FilterReason, FilterService, PipelineContext, ScanOptions,
    Scanner, Task, TruncationSettings, enforce_budget, run_bounded,
};
use repodigest::{
    CancellationToken, DigestConfig, DigestError, DigestOptions, NodeKind, Phase, Progress,
    ProgressCallback,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Temp workspace with a canonical root (the filter compares against canonical paths).
fn workspace(files: &[(&str, &str)]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    for (rel, body) in files {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, body).unwrap();
    }
    (dir, root)
}

// --- scanner ---

#[test]
fn test_scan_sorted_and_skips_vcs() {
    let (_dir, root) = workspace(&[
        ("a.txt", "a"),
        ("src/lib.rs", "lib"),
        ("src/deep/x.rs", "x"),
        (".git/HEAD", "ref"),
        (".github/ci.yml", "ci"),
    ]);
    let report = Scanner::new(&root)
        .unwrap()
        .scan(&ScanOptions::default(), None)
        .unwrap();
    let files: Vec<&str> = report.files().map(|n| n.rel_path.as_str()).collect();
    assert_eq!(
        files,
        vec![".github/ci.yml", "a.txt", "src/deep/x.rs", "src/lib.rs"]
    );
    assert!(report.nodes.iter().all(|n| !n.rel_path.starts_with(".git/")));
    assert!(report.nodes.iter().all(|n| n.rel_path != ".git"));
    assert!(
        report
            .nodes
            .iter()
            .any(|n| n.rel_path == "src/deep" && n.kind == NodeKind::Directory)
    );
    assert!(!report.truncated);
    assert!(report.skipped.is_empty());
}

#[test]
fn test_scan_parallel_walk_finds_same_files() {
    let (_dir, root) = workspace(&[
        ("a.txt", "a"),
        ("src/lib.rs", "lib"),
        ("src/deep/x.rs", "x"),
        (".git/HEAD", "ref"),
    ]);
    let scanner = Scanner::new(&root).unwrap();
    let sequential = scanner.scan(&ScanOptions::default(), None).unwrap();
    let parallel = scanner
        .scan(
            &ScanOptions {
                parallel_walk: true,
                ..Default::default()
            },
            None,
        )
        .unwrap();
    let mut a: Vec<_> = sequential.files().map(|n| n.rel_path.clone()).collect();
    let mut b: Vec<_> = parallel.files().map(|n| n.rel_path.clone()).collect();
    a.sort();
    b.sort();
    assert_eq!(a, b);
}

#[test]
fn test_scan_max_depth() {
    let (_dir, root) = workspace(&[("a.txt", "a"), ("src/lib.rs", "lib")]);
    let report = Scanner::new(&root)
        .unwrap()
        .scan(
            &ScanOptions {
                max_depth: Some(1),
                ..Default::default()
            },
            None,
        )
        .unwrap();
    let files: Vec<&str> = report.files().map(|n| n.rel_path.as_str()).collect();
    assert_eq!(files, vec!["a.txt"]);
}

#[test]
fn test_scan_max_entries_truncates() {
    let (_dir, root) = workspace(&[("a.txt", "a"), ("b.txt", "b"), ("c.txt", "c")]);
    let report = Scanner::new(&root)
        .unwrap()
        .scan(
            &ScanOptions {
                max_entries: 2,
                ..Default::default()
            },
            None,
        )
        .unwrap();
    assert_eq!(report.nodes.len(), 2);
    assert!(report.truncated);
}

#[test]
fn test_scan_progress_is_monotonic() {
    let (_dir, root) = workspace(&[("a.txt", "a"), ("b/c.txt", "c"), ("b/d.txt", "d")]);
    let mut seen: Vec<(usize, Option<usize>)> = Vec::new();
    let mut on_progress = |n: usize, total: Option<usize>, _path: Option<&Path>| seen.push((n, total));
    let report = Scanner::new(&root)
        .unwrap()
        .scan(&ScanOptions::default(), Some(&mut on_progress))
        .unwrap();
    assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));
    let n = report.nodes.len();
    assert_eq!(seen.last(), Some(&(n, Some(n))));
}

#[test]
fn test_scan_cancelled() {
    let (_dir, root) = workspace(&[("a.txt", "a")]);
    let token = CancellationToken::new();
    token.cancel();
    let result = Scanner::new(&root).unwrap().scan(
        &ScanOptions {
            cancel: Some(token),
            ..Default::default()
        },
        None,
    );
    assert!(matches!(result, Err(DigestError::Cancelled)));
}

#[test]
fn test_scanner_rejects_missing_root() {
    let dir = TempDir::new().unwrap();
    assert!(Scanner::new(&dir.path().join("missing")).is_err());
    let (_dir, root) = workspace(&[("file.txt", "x")]);
    assert!(Scanner::new(&root.join("file.txt")).is_err());
}

#[cfg(unix)]
#[test]
fn test_scan_marks_unfollowed_symlinks() {
    let (_dir, root) = workspace(&[("real/a.txt", "a")]);
    std::os::unix::fs::symlink(root.join("real"), root.join("link")).unwrap();
    let report = Scanner::new(&root)
        .unwrap()
        .scan(&ScanOptions::default(), None)
        .unwrap();
    let link = report.nodes.iter().find(|n| n.rel_path == "link").unwrap();
    assert_eq!(link.kind, NodeKind::Symlink);
    assert!(link.is_symlink);
    assert!(!report.nodes.iter().any(|n| n.rel_path == "link/a.txt"));

    let followed = Scanner::new(&root)
        .unwrap()
        .scan(
            &ScanOptions {
                follow_symlinks: true,
                ..Default::default()
            },
            None,
        )
        .unwrap();
    assert!(followed.files().any(|n| n.rel_path == "link/a.txt"));
}

// --- filter ---

fn filter(root: &Path, options: FilterOptions) -> FilterService {
    FilterService::new(root, options).unwrap()
}

#[test]
fn test_build_globset_empty_is_none() {
    assert!(build_globset(&[]).unwrap().is_none());
    assert!(build_globset(&["[".to_string()]).is_err());
}

#[test]
fn test_exclude_pattern_matches_at_any_depth() {
    let (_dir, root) = workspace(&[]);
    let f = filter(
        &root,
        FilterOptions {
            exclude_patterns: vec!["target".to_string(), "*.log".to_string()],
            ..Default::default()
        },
    );
    assert_eq!(
        f.filter(&root.join("target/debug/x")).reason,
        FilterReason::ExcludedByPattern
    );
    assert_eq!(
        f.filter(&root.join("crates/a/target/y.rs")).reason,
        FilterReason::ExcludedByPattern
    );
    assert_eq!(
        f.filter(&root.join("logs/today.log")).reason,
        FilterReason::ExcludedByPattern
    );
    assert!(f.filter(&root.join("src/target.rs")).included);
}

#[test]
fn test_anchored_pattern_only_matches_at_root() {
    let (_dir, root) = workspace(&[]);
    let f = filter(
        &root,
        FilterOptions {
            exclude_patterns: vec!["/build".to_string()],
            ..Default::default()
        },
    );
    assert!(!f.filter(&root.join("build/out.js")).included);
    assert!(f.filter(&root.join("src/build/keep.js")).included);
}

#[test]
fn test_star_does_not_cross_directories() {
    let (_dir, root) = workspace(&[]);
    let f = filter(
        &root,
        FilterOptions {
            exclude_patterns: vec!["/src/*.rs".to_string(), "docs/*.md".to_string()],
            ..Default::default()
        },
    );
    assert!(!f.filter(&root.join("src/lib.rs")).included);
    assert!(f.filter(&root.join("src/a/b.rs")).included);
    assert!(f.filter(&root.join("src/deep/nested/x.rs")).included);
    assert!(!f.filter(&root.join("docs/intro.md")).included);
    assert!(!f.filter(&root.join("site/docs/intro.md")).included);
    assert!(f.filter(&root.join("docs/api/ref.md")).included);
}

#[test]
fn test_double_star_crosses_directories() {
    let (_dir, root) = workspace(&[]);
    let f = filter(
        &root,
        FilterOptions {
            exclude_patterns: vec!["/src/**/*.rs".to_string()],
            ..Default::default()
        },
    );
    assert!(!f.filter(&root.join("src/lib.rs")).included);
    assert!(!f.filter(&root.join("src/a/b.rs")).included);
    assert!(f.filter(&root.join("lib/src/a.rs")).included);
}

#[test]
fn test_include_patterns() {
    let (_dir, root) = workspace(&[]);
    let f = filter(
        &root,
        FilterOptions {
            include_patterns: vec!["src".to_string()],
            exclude_patterns: vec!["src/gen".to_string()],
            ..Default::default()
        },
    );
    assert!(f.filter(&root.join("src/lib.rs")).included);
    assert_eq!(
        f.filter(&root.join("README.md")).reason,
        FilterReason::NotMatchedByInclude
    );
    // Exclude wins over include.
    assert_eq!(
        f.filter(&root.join("src/gen/out.rs")).reason,
        FilterReason::ExcludedByPattern
    );
}

#[test]
fn test_nested_gitignore_and_whitelist() {
    let (_dir, root) = workspace(&[
        (".gitignore", "*.log\n!keep.log\nbuild/\n"),
        ("sub/.gitignore", "secret.txt\n!x.log\n"),
        ("a.log", ""),
        ("keep.log", ""),
        ("build/out.js", ""),
        ("secret.txt", ""),
        ("sub/secret.txt", ""),
        ("sub/x.log", ""),
        ("sub/y.log", ""),
    ]);
    let f = filter(
        &root,
        FilterOptions {
            use_gitignore: true,
            ..Default::default()
        },
    );
    let paths: Vec<PathBuf> = [
        "a.log",
        "keep.log",
        "build/out.js",
        "secret.txt",
        "sub/secret.txt",
        "sub/x.log",
        "sub/y.log",
    ]
    .iter()
    .map(|r| root.join(r))
    .collect();
    let decisions = f.batch_filter(&paths);
    let included = |rel: &str| decisions[&root.join(rel)].included;
    assert!(!included("a.log"));
    assert!(included("keep.log"));
    assert!(!included("build/out.js"));
    assert!(included("secret.txt"));
    assert!(!included("sub/secret.txt"));
    assert!(included("sub/x.log"));
    assert!(!included("sub/y.log"));
    assert_eq!(
        decisions[&root.join("a.log")].reason,
        FilterReason::Gitignored
    );
}

#[test]
fn test_gitignore_disabled() {
    let (_dir, root) = workspace(&[(".gitignore", "*.log\n"), ("a.log", "")]);
    let f = filter(&root, FilterOptions::default());
    assert!(f.filter(&root.join("a.log")).included);
}

#[test]
fn test_os_hidden_and_outside_root() {
    let (_dir, root) = workspace(&[(".DS_Store", "")]);
    let f = filter(&root, FilterOptions::default());
    assert_eq!(
        f.filter(&root.join(".DS_Store")).reason,
        FilterReason::OsHidden
    );
    assert_eq!(
        f.filter(Path::new("/definitely/elsewhere.rs")).reason,
        FilterReason::OutsideRoot
    );
    assert_eq!(f.filter(&root).reason, FilterReason::OutsideRoot);
}

#[cfg(unix)]
#[test]
fn test_symlink_policy() {
    let (_dir, root) = workspace(&[("real.txt", "r")]);
    std::os::unix::fs::symlink(root.join("real.txt"), root.join("alias.txt")).unwrap();
    let strict = filter(&root, FilterOptions::default());
    assert_eq!(
        strict.filter(&root.join("alias.txt")).reason,
        FilterReason::Symlink
    );
    let follow = filter(
        &root,
        FilterOptions {
            follow_symlinks: true,
            ..Default::default()
        },
    );
    assert!(follow.filter(&root.join("alias.txt")).included);
}

#[test]
fn test_filter_reason_codes() {
    assert_eq!(FilterReason::ExcludedByPattern.to_string(), "excluded-by-pattern");
    assert_eq!(FilterReason::NotMatchedByInclude.as_str(), "not-matched-by-include");
    assert_eq!(
        serde_json::to_string(&FilterReason::OsHidden).unwrap(),
        "\"os-hidden\""
    );
}

// --- run_bounded ---

#[test]
fn test_pool_keeps_input_order() {
    let tasks: Vec<Task<usize, anyhow::Error>> = (0..16)
        .map(|i: usize| {
            Box::new(move || {
                std::thread::sleep(Duration::from_millis(((16 - i) % 5) as u64));
                Ok(i * 10)
            }) as Task<usize, anyhow::Error>
        })
        .collect();
    let out = run_bounded(tasks, 4).unwrap();
    assert_eq!(out, (0..16).map(|i| i * 10).collect::<Vec<_>>());
}

#[test]
fn test_pool_respects_limit() {
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let tasks: Vec<Task<(), anyhow::Error>> = (0..12)
        .map(|_| {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            Box::new(move || {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(5));
                active.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }) as Task<(), anyhow::Error>
        })
        .collect();
    run_bounded(tasks, 3).unwrap();
    assert!(peak.load(Ordering::SeqCst) <= 3);
}

#[test]
fn test_pool_limit_one_runs_inline() {
    let caller = std::thread::current().id();
    let tasks: Vec<Task<bool, anyhow::Error>> = (0..3)
        .map(|_| {
            Box::new(move || Ok(std::thread::current().id() == caller)) as Task<bool, anyhow::Error>
        })
        .collect();
    assert_eq!(run_bounded(tasks, 1).unwrap(), vec![true, true, true]);
}

#[test]
fn test_pool_first_error_wins() {
    let tasks: Vec<Task<usize, DigestError>> = (0..6)
        .map(|i: usize| {
            Box::new(move || {
                if i == 2 {
                    return Err(DigestError::Cancelled);
                }
                Ok(i)
            }) as Task<usize, DigestError>
        })
        .collect();
    assert!(matches!(run_bounded(tasks, 3), Err(DigestError::Cancelled)));
}

#[test]
fn test_pool_panic_becomes_error() {
    for limit in [1, 2] {
        let tasks: Vec<Task<usize, anyhow::Error>> = vec![
            Box::new(|| Ok(1usize)) as Task<usize, anyhow::Error>,
            Box::new(|| -> anyhow::Result<usize> { panic!("boom") }),
            Box::new(|| Ok(3)),
        ];
        let err = run_bounded(tasks, limit).unwrap_err();
        assert_eq!(err.to_string(), "worker task 1 panicked", "limit {limit}");
    }
}

#[test]
fn test_pool_inline_panic_stops_later_tasks() {
    let ran = Arc::new(AtomicUsize::new(0));
    let after = Arc::clone(&ran);
    let tasks: Vec<Task<(), DigestError>> = vec![
        Box::new(|| -> Result<(), DigestError> { panic!("boom") }) as Task<(), DigestError>,
        Box::new(move || {
            after.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }),
    ];
    let err = run_bounded(tasks, 1).unwrap_err();
    assert!(matches!(err, DigestError::Other(_)));
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[test]
fn test_pool_empty() {
    let tasks: Vec<Task<(), anyhow::Error>> = Vec::new();
    assert!(run_bounded(tasks, 4).unwrap().is_empty());
}

// --- budget ---

fn analyze(content: &str, max_tokens: usize) -> repodigest::engine::TokenAnalysis {
    TokenAnalyzer::default()
        .analyze(
            content,
            &AnalyzeOptions {
                budget: Some(TokenBudget::warn_only(max_tokens)),
                skip_cache: true,
            },
        )
        .unwrap()
}

fn enforce(
    ledger: &Mutex<BudgetLedger>,
    rel: &str,
    content: &str,
    cancel: Option<&CancellationToken>,
) -> Result<repodigest::pipeline::BudgetDecision, DigestError> {
    let max = ledger.lock().unwrap().max_tokens();
    enforce_budget(
        ledger,
        rel,
        content,
        &analyze(content, max),
        &TokenAnalyzer::default(),
        &TruncationSettings::default(),
        cancel,
    )
}

#[test]
fn test_budget_accepts_when_it_fits() {
    let ledger = Mutex::new(BudgetLedger::new(100));
    let d = enforce(&ledger, "a.rs", &"a".repeat(40), None).unwrap();
    assert_eq!(d.tokens, 10);
    assert!(!d.truncated);
    assert_eq!(d.content, "a".repeat(40));
    assert!(d.warnings.is_empty());
    assert_eq!(ledger.lock().unwrap().used(), 10);
}

#[test]
fn test_budget_truncates_to_remaining() {
    let ledger = Mutex::new(BudgetLedger::new(20));
    let d = enforce(&ledger, "big.rs", &"a".repeat(240), None).unwrap();
    assert!(d.truncated);
    assert_eq!(d.tokens, 20);
    assert!(d.content.starts_with(&"a".repeat(79)));
    assert!(!d.content.starts_with(&"a".repeat(80)));
    assert!(d.content.contains("[[TRUNCATED]] big.rs"));
    assert_eq!(
        d.warnings,
        vec!["big.rs: truncated from 60 to 20 tokens to fit the budget.".to_string()]
    );
    assert_eq!(ledger.lock().unwrap().remaining(), 0);
}

#[test]
fn test_budget_short_content_is_capped_not_shrunk() {
    // 100 chars is under the shrink floor, so tokens are clamped to what is left.
    let ledger = Mutex::new(BudgetLedger::new(5));
    let d = enforce(&ledger, "s.rs", &"b".repeat(100), None).unwrap();
    assert!(d.truncated);
    assert_eq!(d.tokens, 5);
    assert!(d.content.starts_with(&"b".repeat(100)));
}

#[test]
fn test_budget_exhausted_placeholder() {
    let ledger = Mutex::new(BudgetLedger::new(10));
    enforce(&ledger, "first.rs", &"a".repeat(40), None).unwrap();
    let body: String = (0..80).map(|i| format!("line {i}\n")).collect();
    let d = enforce(&ledger, "x.rs", &body, None).unwrap();
    assert_eq!(d.tokens, 0);
    assert!(d.truncated);
    assert!(d.content.starts_with("line 0\nline 1\n"));
    assert!(d.content.contains("line 49\n\n[[TRUNCATED]]"));
    assert!(!d.content.contains("line 50"));
    assert_eq!(
        d.warnings,
        vec!["x.rs: token budget exhausted, content replaced with a placeholder.".to_string()]
    );
}

#[test]
fn test_budget_cancelled() {
    let ledger = Mutex::new(BudgetLedger::new(10));
    let token = CancellationToken::new();
    token.cancel();
    let result = enforce(&ledger, "a.rs", "abc", Some(&token));
    assert!(matches!(result, Err(DigestError::Cancelled)));
    assert_eq!(ledger.lock().unwrap().used(), 0);
}

#[test]
fn test_budget_concurrent_commits_never_overshoot() {
    let ledger = Arc::new(Mutex::new(BudgetLedger::new(35)));
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let ledger = Arc::clone(&ledger);
            std::thread::spawn(move || {
                enforce(&ledger, &format!("f{i}.rs"), &"a".repeat(40), None)
                    .unwrap()
                    .tokens
            })
        })
        .collect();
    let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(total, 35);
    assert_eq!(ledger.lock().unwrap().used(), 35);
}

// --- progress ---

#[test]
fn test_throttle_allows_first_then_waits() {
    let throttle = Throttle::new(Duration::from_secs(3600));
    assert!(throttle.ready());
    assert!(!throttle.ready());
    let open = Throttle::new(Duration::ZERO);
    assert!(open.ready());
    assert!(open.ready());
}

#[test]
fn test_per_file_events_reuse_memory_sample() {
    let seen: Arc<Mutex<Vec<Progress>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let callback: ProgressCallback = Arc::new(move |p: &Progress| sink.lock().unwrap().push(p.clone()));
    let emitter =
        ProgressEmitter::with_memory_interval(Some(callback), Instant::now(), Duration::from_secs(3600));
    for i in 0..20 {
        emitter.emit(Phase::Analyzing, i, 20, 0, Some("a.rs"));
        emitter.emit(Phase::Processing, i + 1, 20, 0, Some("a.rs"));
    }
    emitter.emit(Phase::Generating, 20, 20, 0, None);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 41);
    let first = seen[0].memory_usage;
    assert!(seen.iter().all(|p| p.memory_usage == first));
    assert_eq!(seen.last().unwrap().phase, Phase::Generating);
}

// --- context ---

#[test]
fn test_context_defaults_and_overrides() {
    let (_dir, root) = workspace(&[]);
    let config = DigestConfig {
        workspace_root: Some(root.clone()),
        max_tokens: Some(500),
        ..Default::default()
    };
    let ctx = PipelineContext::resolve(config.clone(), &DigestOptions::default()).unwrap();
    assert_eq!(ctx.workspace_root, root);
    assert_eq!(ctx.max_files, 5000);
    assert_eq!(ctx.max_tokens, 500);
    assert!(ctx.selection.is_none());

    let options = DigestOptions {
        max_files: Some(3),
        max_tokens: Some(42),
        ..Default::default()
    };
    let ctx = PipelineContext::resolve(config, &options).unwrap();
    assert_eq!(ctx.max_files, 3);
    assert_eq!(ctx.max_tokens, 42);
}

#[test]
fn test_context_redaction_flags() {
    let (_dir, root) = workspace(&[]);
    let config = DigestConfig {
        workspace_root: Some(root),
        ..Default::default()
    };
    let resolve = |redact_cfg: bool, apply: bool, override_off: bool| {
        let config = DigestConfig {
            redact: redact_cfg,
            ..config.clone()
        };
        let options = DigestOptions {
            apply_redaction: apply,
            redaction_override: override_off,
            ..Default::default()
        };
        PipelineContext::resolve(config, &options).unwrap().should_redact
    };
    assert!(!resolve(false, false, false));
    assert!(resolve(false, true, false));
    assert!(resolve(true, false, false));
    assert!(!resolve(true, true, true));
}

#[test]
fn test_context_selection() {
    let (_dir, root) = workspace(&[("src/a.rs", "")]);
    let options = DigestOptions {
        selected_files: vec![PathBuf::from("./src/"), root.join("README.md")],
        ..Default::default()
    };
    let config = DigestConfig {
        workspace_root: Some(root.clone()),
        ..Default::default()
    };
    let ctx = PipelineContext::resolve(config.clone(), &options).unwrap();
    assert!(ctx.is_selected("src/a.rs"));
    assert!(ctx.is_selected("src/deep/b.rs"));
    assert!(ctx.is_selected("README.md"));
    assert!(!ctx.is_selected("lib/x.rs"));
    assert!(!ctx.is_selected("srcx/a.rs"));

    let everything = DigestOptions {
        selected_files: vec![PathBuf::from(".")],
        ..Default::default()
    };
    let ctx = PipelineContext::resolve(config, &everything).unwrap();
    assert!(ctx.selection.is_none());
}

#[test]
fn test_context_root_from_workspace_folder() {
    let (_dir, root) = workspace(&[]);
    let options = DigestOptions {
        workspace_folders: vec![root.clone()],
        ..Default::default()
    };
    let ctx = PipelineContext::resolve(DigestConfig::default(), &options).unwrap();
    assert_eq!(ctx.workspace_root, root);
}

#[test]
fn test_context_missing_root_is_error() {
    let dir = TempDir::new().unwrap();
    let config = DigestConfig {
        workspace_root: Some(dir.path().join("missing")),
        ..Default::default()
    };
    assert!(PipelineContext::resolve(config, &DigestOptions::default()).is_err());
}
