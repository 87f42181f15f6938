//! Runs every configured folder job.
//!
//! A run goes load → verify every job → execute. Verification is sequential
//! and any failure aborts the run before a single job executes. Execution is
//! sequential when `parallel_jobs` is 1, otherwise it happens on a rayon pool
//! of that size and a failing job does not stop its siblings.
//!
//! There is no timeout: a hung external process keeps its worker busy.

use crate::backup::available_cores;
use crate::backup::config::{ConnectionConfig, ExecutionConfig, GlobalConfig};
use crate::backup::folder_job::FolderJob;
use crate::backup::operation::OperationKind;
use crate::backup::pipeline::Pipeline;
use crate::backup::registry::{Registry, PIPELINE_KEY_FIELD};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::{convert_error_vec, Result};
use crate::backup::result_error::WithMsg;
use crate::backup::shell::CommandRunner;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug)]
pub struct JobOutcome {
    pub job_name: Arc<str>,
    pub result: Result<()>,
}

/// Outcome of every executed job, in configuration order.
#[derive(Debug, Default)]
pub struct ExecutionReport {
    pub outcomes: Vec<JobOutcome>,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &JobOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    /// Collapses every job error into one.
    pub fn into_result(self) -> Result<()> {
        convert_error_vec(
            self.outcomes
                .into_iter()
                .filter_map(|o| o.result.err())
                .collect(),
        )
    }
}

#[derive(Debug)]
pub struct Executor {
    execution: ExecutionConfig,
    pipelines: BTreeMap<Arc<str>, Arc<Pipeline>>,
    jobs: Vec<FolderJob>,
    available_cores: usize,
}

impl Executor {
    pub fn load(config: &GlobalConfig, registry: &Registry) -> Result<Self> {
        let pipelines = config
            .pipelines
            .iter()
            .map(|(name, pipeline_config)| {
                let pipeline = match registry.resolve(pipeline_config, config, PIPELINE_KEY_FIELD) {
                    Ok(OperationKind::Pipeline(pipeline)) => Ok((name.clone(), pipeline)),
                    Ok(other) => Err(Error::configuration(format!(
                        "Expected a pipeline, got {other:?}"
                    ))),
                    Err(e) => Err(e),
                };
                pipeline.with_msg(format!("Loading pipeline {name:?} failed"))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        let connections: BTreeMap<Arc<str>, Arc<ConnectionConfig>> = config
            .connection
            .iter()
            .map(|(name, connection)| (name.clone(), Arc::new(connection.clone())))
            .collect();

        let jobs = config
            .folders
            .iter()
            .map(|job_config| FolderJob::new(job_config.clone(), &pipelines, &connections))
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Loaded {} pipeline(s) and {} job(s)",
            pipelines.len(),
            jobs.len()
        );

        Ok(Self {
            execution: config.execution.clone(),
            pipelines,
            jobs,
            available_cores: available_cores(),
        })
    }

    /// Overrides the detected core count used for thread budgets.
    pub fn with_available_cores(mut self, cores: usize) -> Self {
        self.available_cores = cores.max(1);
        self
    }

    pub fn jobs(&self) -> &[FolderJob] {
        &self.jobs
    }

    pub fn pipeline(&self, name: &str) -> Option<&Arc<Pipeline>> {
        self.pipelines.get(name)
    }

    pub fn parallel_jobs(&self) -> usize {
        self.execution.parallel_jobs.max(1)
    }

    /// Compression threads each job gets when jobs run in parallel.
    pub fn compress_thread_budget(&self) -> usize {
        self.available_cores.div_ceil(self.parallel_jobs())
    }

    pub fn verify_all(&self) -> Result<()> {
        for job in &self.jobs {
            job.verify()?;
        }
        info!("Verification done for {} job(s)", self.jobs.len());
        Ok(())
    }

    pub fn execute(&mut self, runner: &dyn CommandRunner) -> Result<ExecutionReport> {
        let parallel_jobs = self.parallel_jobs();
        if parallel_jobs == 1 {
            return self.execute_serial(runner);
        }

        let budget = self.compress_thread_budget();
        info!(
            "Running {} job(s), {parallel_jobs} at a time, {budget} compression thread(s) each",
            self.jobs.len()
        );
        for job in &mut self.jobs {
            job.set_compress_threads(Some(budget));
        }

        let pool = ThreadPoolBuilder::new().num_threads(parallel_jobs).build()?;
        let jobs = &self.jobs;
        let outcomes: Vec<JobOutcome> = pool.install(|| {
            jobs.par_iter()
                .map(|job| {
                    let result = job.execute(runner);
                    if let Err(e) = &result {
                        error!("{e}");
                    }
                    JobOutcome {
                        job_name: job.name().clone(),
                        result,
                    }
                })
                .collect()
        });

        Ok(ExecutionReport { outcomes })
    }

    fn execute_serial(&self, runner: &dyn CommandRunner) -> Result<ExecutionReport> {
        let mut report = ExecutionReport::default();
        for job in &self.jobs {
            job.execute(runner)?;
            report.outcomes.push(JobOutcome {
                job_name: job.name().clone(),
                result: Ok(()),
            });
        }
        Ok(report)
    }

    /// Verifies every job, then executes them.
    pub fn run(&mut self, runner: &dyn CommandRunner) -> Result<ExecutionReport> {
        self.verify_all()?;
        self.execute(runner)
    }
}
