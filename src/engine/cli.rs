//! CLI command handler: load config, layer flags on top, run the pipeline, write the digest.

use anyhow::{Context, Result, bail};
use log::{debug, info, warn};
use std::io::Write;

use crate::engine::arg_parser::Cli;
use crate::engine::progress::{bar_callback, create_counter, finish_bar};
use crate::format::{FormatterOptions, render};
use crate::pipeline::cancel::CancellationToken;
use crate::pipeline::orchestrator::DigestGenerator;
use crate::types::{DigestConfig, DigestOptions};
use crate::utils::settings::{ConfigurationService, TomlConfigService};
use crate::utils::setup_logging;

/// CLI flags win over `.repodigest.toml`.
fn apply_cli_to_config(cli: &Cli, config: &mut DigestConfig) {
    if !cli.include.is_empty() {
        config.include_patterns = cli.include.clone();
    }
    config.exclude_patterns.extend(cli.exclude.iter().cloned());
    if cli.no_gitignore {
        config.use_gitignore = false;
    }
    if let Some(follow) = cli.follow_symlinks {
        config.follow_symlinks = follow;
    }
    if let Some(policy) = cli.binary {
        config.binary_policy = policy;
    }
    if let Some(format) = cli.format {
        config.output_format = format;
    }
    if let Some(n) = cli.concurrency {
        config.concurrency = n;
    }
    if cli.redact {
        config.redact = true;
    }
    config.workspace_root = Some(match config.workspace_root.take() {
        Some(root) if root.is_relative() => cli.dir.join(root),
        Some(root) => root,
        None => cli.dir.clone(),
    });
}

/// Trip `token` on Ctrl+C. Failure to install the handler is not fatal.
fn install_ctrlc(token: &CancellationToken) {
    let token = token.clone();
    if let Err(e) = ctrlc::set_handler(move || token.cancel()) {
        warn!("Could not install Ctrl+C handler: {}", e);
    }
}

/// Build the digest for `cli.dir` and write it to stdout or `--output`.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let verbose = cli.is_verbose();
    setup_logging(verbose);

    let mut config = TomlConfigService::new(&cli.dir).load_config()?;
    apply_cli_to_config(cli, &mut config);
    config.validate()?;
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        config
    );
    let format = config.output_format;

    let cancel = CancellationToken::new();
    install_ctrlc(&cancel);
    let bar = verbose.then(|| create_counter("Scanning"));

    let options = DigestOptions {
        selected_files: cli.select.clone(),
        output_format: format,
        max_files: cli.max_files,
        max_tokens: cli.max_tokens,
        include_metadata: !cli.no_metadata,
        apply_redaction: cli.redact,
        on_progress: bar.as_ref().map(bar_callback),
        cancel: Some(cancel),
        ..Default::default()
    };

    let outcome = DigestGenerator::from_config(config).generate_digest(options);
    if let Some(bar) = &bar {
        finish_bar(bar);
    }
    let result = match outcome {
        Ok(result) => result,
        Err(e) if e.is_cancelled() => bail!("Cancelled, nothing written."),
        Err(e) => return Err(e.into()),
    };

    let rendered = render(
        &result,
        format,
        FormatterOptions {
            include_metadata: !cli.no_metadata,
            ..Default::default()
        },
    )?;

    match &cli.output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("write digest to {}", path.display()))?;
            info!("Wrote {} ({} bytes)", path.display(), rendered.len());
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            out.write_all(rendered.as_bytes())?;
            out.flush()?;
        }
    }

    if result.truncation_applied {
        info!(
            "Digest truncated to fit limits ({} files, {} / {} tokens)",
            result.statistics.files_processed,
            result.statistics.total_tokens,
            result.content.metadata.max_tokens
        );
    }
    Ok(())
}
