use crate::backup::available_cores;
use crate::backup::config::{GlobalConfig, OperationConfig};
use crate::backup::context::Context;
use crate::backup::file_ext::FileExtProvider;
use crate::backup::operation::{Operation, OperationKind};
use crate::backup::registry::Registry;
use crate::backup::result_error::result::Result;
use crate::backup::shell::assert_command_exists;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, skip_serializing_none, DisplayFromStr, PickFirst};
use std::sync::Arc;
use validator::Validate;

/// Default compression level (balance of speed vs size)
static DEFAULT_COMPRESSION_LEVEL: u32 = 6;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompressAlgorithm {
    /// Parallel bzip2 through `pbzip2`
    #[display("bzip")]
    Bzip,
    /// Parallel gzip through `pigz`
    #[display("gzip")]
    Gzip,
}

impl CompressAlgorithm {
    pub fn tool(&self) -> &'static str {
        match self {
            CompressAlgorithm::Bzip => "pbzip2",
            CompressAlgorithm::Gzip => "pigz",
        }
    }

    pub fn file_ext(&self) -> &'static str {
        match self {
            CompressAlgorithm::Bzip => "bz",
            CompressAlgorithm::Gzip => "gz",
        }
    }
}

/// Configuration of the `compress` step
#[skip_serializing_none]
#[serde_as]
#[derive(Clone, Serialize, Deserialize, Debug, Validate)]
#[serde(deny_unknown_fields)]
pub struct CompressConfig {
    /// Which parallel compressor to pipe through
    pub algorithm: CompressAlgorithm,

    /// Compression level (1-9), 6 when unset.
    ///
    /// Accepts both `9` and the quoted `'9'`.
    #[validate(range(min = 1, max = 9))]
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub level: Option<u32>,

    /// Number of compression threads
    ///
    /// When unset the job's thread budget is used, falling back to every
    /// available core.
    #[validate(range(min = 1))]
    #[serde(default)]
    pub threads: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct CompressOperation {
    config: CompressConfig,
}

impl From<CompressConfig> for CompressOperation {
    fn from(config: CompressConfig) -> Self {
        Self { config }
    }
}

impl CompressOperation {
    pub const KIND: &'static str = "compress";

    pub fn from_config(
        config: &OperationConfig,
        _global_config: &GlobalConfig,
        _registry: &Registry,
    ) -> Result<OperationKind> {
        Ok(Self::from(config.parse::<CompressConfig>(Self::KIND)?).into())
    }

    pub fn algorithm(&self) -> CompressAlgorithm {
        self.config.algorithm
    }

    pub fn level(&self) -> u32 {
        self.config.level.unwrap_or(DEFAULT_COMPRESSION_LEVEL)
    }

    /// Explicit config wins, then the context hint, then every core.
    pub fn threads(&self, context: &Context) -> usize {
        self.config
            .threads
            .or(context.compress_threads)
            .unwrap_or_else(available_cores)
    }
}

impl FileExtProvider for CompressOperation {
    fn file_ext(&self) -> Option<Arc<str>> {
        Some(self.config.algorithm.file_ext().into())
    }
}

impl Operation for CompressOperation {
    fn verify(&self, _context: &Context) -> Result<()> {
        assert_command_exists(self.config.algorithm.tool())
    }

    fn forward(&self, context: &mut Context) -> Result<String> {
        let level = self.level();
        let threads = self.threads(context);
        tracing::debug!(
            "Compressing with {} level={level}, threads={threads}",
            self.config.algorithm
        );

        Ok(match self.config.algorithm {
            CompressAlgorithm::Bzip => format!("pbzip2 -p{threads} --to-stdout -{level}"),
            CompressAlgorithm::Gzip => {
                format!("pigz -i -b 1024 -p {threads} --to-stdout -{level}")
            }
        })
    }

    fn backward(&self, context: &mut Context) -> Result<String> {
        let threads = self.threads(context);
        Ok(match self.config.algorithm {
            CompressAlgorithm::Bzip => format!("pbzip2 -d -p{threads} --to-stdout"),
            CompressAlgorithm::Gzip => format!("pigz -d -p {threads} --to-stdout"),
        })
    }
}
