//! Composition of operations into one shell command.
//!
//! Local operations are chained with pipes, remote operations with `&&`, and
//! the [`Transport`] stitches both halves together. A command pipeline has no
//! transport and only runs its local half.

use crate::backup::config::{GlobalConfig, OperationConfig};
use crate::backup::context::Context;
use crate::backup::file_ext::{join_file_ext, FileExtProvider};
use crate::backup::operation::{Operation, OperationKind};
use crate::backup::registry::{Registry, OPERATION_KEY_FIELD};
use crate::backup::result_error::result::Result;
use crate::backup::result_error::{WithDebugObjectAndFnName, WithMsg};
use crate::backup::transport::Transport;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use validator::Validate;

static LOCAL_SEPARATOR: &str = " | ";
static REMOTE_SEPARATOR: &str = " && ";

#[derive(Clone, Serialize, Deserialize, Debug, Validate)]
#[serde(deny_unknown_fields)]
pub struct BackupPipelineConfig {
    /// How the local output reaches the destination host
    pub connection: Transport,

    /// Steps piped together on this machine, first one produces the stream
    #[validate(length(min = 1))]
    pub local: Vec<OperationConfig>,

    /// Steps run on the destination host, chained with `&&`
    #[serde(default)]
    pub remote: Vec<OperationConfig>,
}

#[derive(Clone, Serialize, Deserialize, Debug, Validate)]
#[serde(deny_unknown_fields)]
pub struct CommandPipelineConfig {
    #[validate(length(min = 1))]
    pub local: Vec<OperationConfig>,

    /// Accepted for symmetry with `pipeline`, then dropped with a warning
    #[serde(default)]
    pub remote: Vec<OperationConfig>,
}

#[derive(Debug)]
pub struct Pipeline {
    local_operations: Vec<OperationKind>,
    remote_operations: Vec<OperationKind>,
    transport: Option<Transport>,
}

fn resolve_all(
    configs: &[OperationConfig],
    global_config: &GlobalConfig,
    registry: &Registry,
) -> Result<Vec<OperationKind>> {
    configs
        .iter()
        .enumerate()
        .map(|(i, config)| {
            registry
                .resolve(config, global_config, OPERATION_KEY_FIELD)
                .with_msg(format!("Step #{} is invalid", i + 1))
        })
        .collect()
}

impl Pipeline {
    pub const BACKUP_KIND: &'static str = "pipeline";
    pub const COMMAND_KIND: &'static str = "command";

    pub fn new(
        local_operations: Vec<OperationKind>,
        remote_operations: Vec<OperationKind>,
        transport: Option<Transport>,
    ) -> Self {
        Self {
            local_operations,
            remote_operations,
            transport,
        }
    }

    pub fn backup_from_config(
        config: &OperationConfig,
        global_config: &GlobalConfig,
        registry: &Registry,
    ) -> Result<OperationKind> {
        let config: BackupPipelineConfig = config.parse(Self::BACKUP_KIND)?;
        let local = resolve_all(&config.local, global_config, registry)
            .with_msg("Local operations are invalid")?;
        let remote = resolve_all(&config.remote, global_config, registry)
            .with_msg("Remote operations are invalid")?;
        Ok(Arc::new(Self::new(local, remote, Some(config.connection))).into())
    }

    pub fn command_from_config(
        config: &OperationConfig,
        global_config: &GlobalConfig,
        registry: &Registry,
    ) -> Result<OperationKind> {
        let config: CommandPipelineConfig = config.parse(Self::COMMAND_KIND)?;
        let local = resolve_all(&config.local, global_config, registry)
            .with_msg("Local operations are invalid")?;
        let remote = resolve_all(&config.remote, global_config, registry)
            .with_msg("Remote operations are invalid")?;
        if !remote.is_empty() {
            warn!(
                "Command pipeline ignores its {} remote operation(s)",
                remote.len()
            );
        }
        Ok(Arc::new(Self::new(local, Vec::new(), None)).into())
    }

    pub fn local_operations(&self) -> &[OperationKind] {
        &self.local_operations
    }

    pub fn remote_operations(&self) -> &[OperationKind] {
        &self.remote_operations
    }

    pub fn transport(&self) -> Option<Transport> {
        self.transport
    }

    /// File name suffix made of the local operations' extensions, e.g.
    /// `.tar.gz`.
    pub fn generate_extensions(&self) -> String {
        join_file_ext(&self.local_operations)
    }

    /// Verifies local then remote operations, stopping at the first failure.
    pub fn verify(&self, context: &Context) -> Result<()> {
        self.local_operations
            .iter()
            .chain(self.remote_operations.iter())
            .try_for_each(|op| {
                op.verify(context)
                    .with_debug_object_and_fn_name(op.clone(), "verify")
            })
    }

    pub fn forward(&self, context: &mut Context) -> Result<String> {
        self.verify(context)?;

        let local = self
            .local_operations
            .iter()
            .map(|op| op.forward(context))
            .collect::<Result<Vec<_>>>()?
            .join(LOCAL_SEPARATOR);

        match self.transport {
            Some(transport) => {
                let remote = self
                    .remote_operations
                    .iter()
                    .map(|op| op.forward(context))
                    .collect::<Result<Vec<_>>>()?
                    .join(REMOTE_SEPARATOR);
                transport.wrap(context, &local, &remote)
            }
            None => Ok(local),
        }
    }

    /// Undoes the local half, last operation first.
    ///
    /// Steps are joined in reverse declaration order, so `tar | gzip | gpg`
    /// yields `gpg --decrypt | pigz -d ...` and fails on the `tar` step.
    pub fn backward(&self, context: &mut Context) -> Result<String> {
        Ok(self
            .local_operations
            .iter()
            .rev()
            .map(|op| op.backward(context))
            .collect::<Result<Vec<_>>>()?
            .join(LOCAL_SEPARATOR))
    }
}

impl FileExtProvider for Pipeline {
    fn file_ext(&self) -> Option<Arc<str>> {
        None
    }
}

impl Operation for Pipeline {
    fn verify(&self, context: &Context) -> Result<()> {
        Pipeline::verify(self, context)
    }

    fn forward(&self, context: &mut Context) -> Result<String> {
        Pipeline::forward(self, context)
    }

    fn backward(&self, context: &mut Context) -> Result<String> {
        Pipeline::backward(self, context)
    }
}
