//! Pipeline steps. Each one turns its config plus the job [`Context`] into a
//! shell command fragment.

pub mod archive;
pub mod cloud;
pub mod compress;
pub mod destination;
pub mod gpg;

use crate::backup::context::Context;
use crate::backup::file_ext::FileExtProvider;
use crate::backup::operation::archive::TarOperation;
use crate::backup::operation::cloud::PushToCloud;
use crate::backup::operation::compress::CompressOperation;
use crate::backup::operation::destination::{SaveBackup, SyncOperation};
use crate::backup::operation::gpg::{GpgEncrypt, GpgSign};
use crate::backup::pipeline::Pipeline;
use crate::backup::result_error::result::Result;
use derive_more::From;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use validator::Validate;

pub trait Operation: FileExtProvider + Debug + Send + Sync {
    /// Best-effort pre-flight check, run before any command is built.
    fn verify(&self, _context: &Context) -> Result<()> {
        Ok(())
    }

    fn forward(&self, context: &mut Context) -> Result<String>;

    /// Command undoing [`Operation::forward`], or
    /// [`Error::NotImplemented`](crate::backup::result_error::error::Error::NotImplemented).
    fn backward(&self, context: &mut Context) -> Result<String>;
}

#[derive(Clone, Debug, From)]
pub enum OperationKind {
    Archive(TarOperation),
    Compress(CompressOperation),
    Encrypt(GpgEncrypt),
    Sign(GpgSign),
    Sync(SyncOperation),
    WriteDestination(SaveBackup),
    PushToCloud(PushToCloud),
    Pipeline(Arc<Pipeline>),
}

impl OperationKind {
    fn inner(&self) -> &dyn Operation {
        match self {
            OperationKind::Archive(op) => op,
            OperationKind::Compress(op) => op,
            OperationKind::Encrypt(op) => op,
            OperationKind::Sign(op) => op,
            OperationKind::Sync(op) => op,
            OperationKind::WriteDestination(op) => op,
            OperationKind::PushToCloud(op) => op,
            OperationKind::Pipeline(op) => op.as_ref(),
        }
    }
}

impl FileExtProvider for OperationKind {
    fn file_ext(&self) -> Option<Arc<str>> {
        self.inner().file_ext()
    }
}

impl Operation for OperationKind {
    fn verify(&self, context: &Context) -> Result<()> {
        self.inner().verify(context)
    }

    fn forward(&self, context: &mut Context) -> Result<String> {
        self.inner().forward(context)
    }

    fn backward(&self, context: &mut Context) -> Result<String> {
        self.inner().backward(context)
    }
}

/// Typed config of operations that take no options.
#[derive(Clone, Default, Serialize, Deserialize, Debug, Validate)]
#[serde(deny_unknown_fields)]
pub struct EmptyConfig {}
