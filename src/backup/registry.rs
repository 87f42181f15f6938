//! Lookup table from operation kind strings to their constructors.

use crate::backup::config::{GlobalConfig, OperationConfig};
use crate::backup::operation::archive::TarOperation;
use crate::backup::operation::cloud::PushToCloud;
use crate::backup::operation::compress::CompressOperation;
use crate::backup::operation::destination::{SaveBackup, SyncOperation};
use crate::backup::operation::gpg::{GpgEncrypt, GpgSign};
use crate::backup::operation::OperationKind;
use crate::backup::pipeline::Pipeline;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use itertools::Itertools;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Field naming the kind of a pipeline step.
pub static OPERATION_KEY_FIELD: &str = "operation";
/// Field naming the kind of a top level pipeline.
pub static PIPELINE_KEY_FIELD: &str = "type";

/// Builds an operation from its config, the key field already removed.
pub type OperationConstructor =
    fn(&OperationConfig, &GlobalConfig, &Registry) -> Result<OperationKind>;

static BUILTIN: &[(&str, OperationConstructor)] = &[
    (TarOperation::KIND, TarOperation::from_config),
    (CompressOperation::KIND, CompressOperation::from_config),
    (GpgEncrypt::KIND, GpgEncrypt::from_config),
    (GpgSign::KIND, GpgSign::from_config),
    (SyncOperation::KIND, SyncOperation::from_config),
    (SaveBackup::KIND, SaveBackup::from_config),
    (PushToCloud::KIND, PushToCloud::from_config),
    (Pipeline::BACKUP_KIND, Pipeline::backup_from_config),
    (Pipeline::COMMAND_KIND, Pipeline::command_from_config),
];

#[derive(Clone, Default)]
pub struct Registry {
    constructors: HashMap<Arc<str>, OperationConstructor>,
}

impl Debug for Registry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_set()
            .entries(self.constructors.keys().sorted())
            .finish()
    }
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in operation kind.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (kind, constructor) in BUILTIN {
            registry.register(*kind, *constructor);
        }
        registry
    }

    /// Last registration of a kind wins.
    pub fn register<S: Into<Arc<str>>>(
        &mut self,
        kind: S,
        constructor: OperationConstructor,
    ) -> &mut Self {
        self.constructors.insert(kind.into(), constructor);
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Builds the operation named by `config[key_field]`.
    pub fn resolve(
        &self,
        config: &OperationConfig,
        global_config: &GlobalConfig,
        key_field: &str,
    ) -> Result<OperationKind> {
        let kind = config.kind(key_field)?;
        let constructor = self
            .constructors
            .get(kind)
            .ok_or_else(|| Error::UnknownOperationKind(kind.into()))?;
        constructor(&config.without(key_field), global_config, self)
            .with_msg(format!("Loading {kind:?} operation failed"))
    }
}
