//! repodigest CLI: digest a directory into a token-budgeted document.

use anyhow::Result;
use clap::Parser;
use repodigest::engine::arg_parser::Cli;
use repodigest::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    // RUST_LOG and friends may live in .env.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
