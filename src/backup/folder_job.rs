use crate::backup::config::{ConnectionConfig, FolderJobConfig};
use crate::backup::context::Context;
use crate::backup::pipeline::Pipeline;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use crate::backup::shell::CommandRunner;
use getset::{CopyGetters, Getters, Setters};
use sanitize_filename::sanitize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One folder set bound to a pipeline and a connection.
#[derive(Debug, Getters, CopyGetters, Setters)]
pub struct FolderJob {
    #[getset(get = "pub")]
    config: FolderJobConfig,
    #[getset(get = "pub")]
    name: Arc<str>,
    #[getset(get = "pub")]
    pipeline: Arc<Pipeline>,
    #[getset(get = "pub")]
    connection: Option<Arc<ConnectionConfig>>,
    /// Thread budget for compression steps, only set for parallel runs.
    #[getset(get_copy = "pub", set = "pub")]
    compress_threads: Option<usize>,
}

impl FolderJob {
    pub fn new(
        config: FolderJobConfig,
        pipelines: &BTreeMap<Arc<str>, Arc<Pipeline>>,
        connections: &BTreeMap<Arc<str>, Arc<ConnectionConfig>>,
    ) -> Result<Self> {
        let pipeline = pipelines
            .get(config.pipeline.as_str())
            .cloned()
            .ok_or_else(|| Error::configuration(format!("Unknown pipeline {:?}", config.pipeline)))?;
        let connection = config
            .connection
            .as_deref()
            .map(|name| {
                connections
                    .get(name)
                    .cloned()
                    .ok_or_else(|| Error::configuration(format!("Unknown connection {name:?}")))
            })
            .transpose()?;
        let name = config
            .file_name
            .clone()
            .unwrap_or_else(|| Self::sanitize_folder_name(&config.folders))
            .into();

        Ok(Self {
            config,
            name,
            pipeline,
            connection,
            compress_threads: None,
        })
    }

    /// Turns a folder list into something usable as a file name.
    pub fn sanitize_folder_name(folders: &str) -> String {
        sanitize(
            folders
                .replace('/', "SLASH")
                .replace('\0', "NULL")
                .replace(' ', "SPACE"),
        )
    }

    pub fn create_context(&self) -> Context {
        Context::builder()
            .folders(self.config.folders.as_str())
            .maybe_connection(self.connection.clone())
            .file_name(self.name.clone())
            .pipeline_extensions(self.pipeline.generate_extensions())
            .maybe_compress_threads(self.compress_threads)
            .build()
    }

    /// Runs the pipeline's pre-flight checks and builds the command once.
    pub fn verify(&self) -> Result<()> {
        self.command()
            .map(|_| ())
            .with_msg(format!("Verification of job {:?} failed", self.name))
    }

    pub fn command(&self) -> Result<String> {
        self.pipeline.forward(&mut self.create_context())
    }

    pub fn execute(&self, runner: &dyn CommandRunner) -> Result<()> {
        let command = self.command()?;
        runner
            .run(&self.name, &command)
            .with_msg(format!("Job {:?} failed", self.name))
    }
}
