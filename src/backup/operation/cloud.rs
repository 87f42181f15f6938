use crate::backup::config::{GlobalConfig, OperationConfig};
use crate::backup::context::Context;
use crate::backup::file_ext::FileExtProvider;
use crate::backup::operation::{Operation, OperationKind};
use crate::backup::registry::Registry;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Supported cloud storage. Only Google Cloud Storage for now.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CloudKind {
    Gcloud,
}

#[derive(Clone, Serialize, Deserialize, Debug, Validate)]
#[serde(deny_unknown_fields)]
pub struct PushToCloudConfig {
    /// Wait for the upload instead of detaching it.
    pub sync: bool,

    /// Bucket URL handed to the copy tool, e.g. `gs://bucket/backups/`
    #[validate(length(min = 1))]
    pub target: String,

    /// Storage provider, written as `type` in the config
    #[serde(rename = "type")]
    pub kind: CloudKind,
}

/// Copies the file written by a previous `save backup` step to cloud storage.
#[derive(Clone, Debug)]
pub struct PushToCloud {
    config: PushToCloudConfig,
}

impl From<PushToCloudConfig> for PushToCloud {
    fn from(config: PushToCloudConfig) -> Self {
        Self { config }
    }
}

impl PushToCloud {
    pub const KIND: &'static str = "push to cloud";

    pub fn from_config(
        config: &OperationConfig,
        _global_config: &GlobalConfig,
        _registry: &Registry,
    ) -> Result<OperationKind> {
        Ok(Self::from(config.parse::<PushToCloudConfig>(Self::KIND)?).into())
    }

    fn copy_command(&self, file_path: &str) -> String {
        match self.config.kind {
            CloudKind::Gcloud => format!("gsutil cp {file_path} {}", self.config.target),
        }
    }

    fn detached(command: &str, file_path: &str) -> String {
        format!(r#"bash -c "nohup {command} > {file_path}.upload.log 2>&1 &""#)
    }
}

impl FileExtProvider for PushToCloud {
    fn file_ext(&self) -> Option<Arc<str>> {
        None
    }
}

impl Operation for PushToCloud {
    fn forward(&self, context: &mut Context) -> Result<String> {
        let file_path = context.remote_dest_file_path()?;
        let command = self.copy_command(file_path);
        if self.config.sync {
            Ok(command)
        } else {
            Ok(Self::detached(&command, file_path))
        }
    }

    fn backward(&self, _context: &mut Context) -> Result<String> {
        Err(Error::NotImplemented {
            operation: Self::KIND,
        })
    }
}
