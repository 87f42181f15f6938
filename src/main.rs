use clap::Parser;
use pipe_backup::backup::config::GlobalConfig;
use pipe_backup::backup::executor::Executor;
use pipe_backup::backup::registry::Registry;
use pipe_backup::backup::result_error::result::Result;
use pipe_backup::backup::shell::{CommandRunner, DryRunRunner, ShellRunner};
use std::path::PathBuf;
use std::process::exit;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Turns a backup config into shell pipelines and runs them
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Location of config file
    #[arg(short, long)]
    config: PathBuf,

    /// Stop after verifying every job
    #[arg(long)]
    verify_only: bool,

    /// Verify, then log every job's command without running it
    #[arg(long, conflicts_with = "verify_only")]
    dry_run: bool,
}

fn run(args: &Args) -> Result<()> {
    let config = GlobalConfig::from_path(&args.config)?;
    let mut executor = Executor::load(&config, &Registry::builtin())?;

    if args.verify_only {
        return executor.verify_all();
    }

    let runner: &dyn CommandRunner = if args.dry_run {
        &DryRunRunner
    } else {
        &ShellRunner
    };
    let report = executor.run(runner)?;
    info!(
        "{} job(s) finished, {} failed",
        report.outcomes.len(),
        report.failed().count()
    );
    report.into_result()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        error!("{e}");
        exit(1);
    }
}
