//! # pipe-backup
//!
//! Compiles a declarative backup configuration into shell pipelines and runs
//! them, one job per configured folder set.
//!
//! ## Features
//!
//! - **Composable steps**: tar, pbzip2/pigz compression, gpg encryption and signing
//! - **Remote destinations**: local half piped over ssh into the remote half
//! - **Cloud mirroring**: optional `gsutil` copy of the written backup
//! - **Fail fast**: every job is verified before any job runs
//! - **Parallel jobs**: bounded worker pool with per-job compression thread budgets
//!
//! ## Quick Start
//!
//! ```no_run
//! use pipe_backup::backup::config::GlobalConfig;
//! use pipe_backup::backup::executor::Executor;
//! use pipe_backup::backup::registry::Registry;
//! use pipe_backup::backup::shell::ShellRunner;
//!
//! let config = GlobalConfig::from_path("backup.yml")?;
//! let mut executor = Executor::load(&config, &Registry::builtin())?;
//! let report = executor.run(&ShellRunner)?;
//! report.into_result()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backup;
