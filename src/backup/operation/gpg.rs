//! Encryption and signing through the `gpg` binary.
//!
//! Both steps need the configured key in the local keyring. Verification
//! pushes a trivial payload through the real command to prove it is there.

use crate::backup::config::{GlobalConfig, OperationConfig};
use crate::backup::context::Context;
use crate::backup::file_ext::FileExtProvider;
use crate::backup::operation::{Operation, OperationKind};
use crate::backup::registry::Registry;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::shell::{assert_command_exists, run_script};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::sync::Arc;
use validator::Validate;

static GPG: &str = "gpg";
static SMOKE_TEST_PAYLOAD: &str = "foo bar";

#[skip_serializing_none]
#[derive(Clone, Serialize, Deserialize, Debug, Validate, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GpgKeyConfig {
    /// Key id, fingerprint or user id known to the local keyring
    #[validate(length(min = 1))]
    pub key: String,

    /// Keyring directory passed as `--homedir`
    ///
    /// gpg falls back to `$GNUPGHOME` or `~/.gnupg` when unset.
    #[validate(length(min = 1))]
    #[serde(default)]
    pub homedir: Option<String>,
}

impl GpgKeyConfig {
    pub fn new<S: Into<String>>(key: S) -> Self {
        Self {
            key: key.into(),
            homedir: None,
        }
    }

    pub fn with_homedir<S: Into<String>>(mut self, homedir: S) -> Self {
        self.homedir = Some(homedir.into());
        self
    }

    /// `gpg`, plus `--homedir` when one is configured.
    fn program(&self) -> String {
        match &self.homedir {
            Some(homedir) => format!("{GPG} --homedir {homedir}"),
            None => GPG.to_string(),
        }
    }

    fn verify_with(&self, command: &str) -> Result<()> {
        assert_command_exists(GPG)?;
        run_script(&format!("echo {SMOKE_TEST_PAYLOAD} | {command}"))
            .map(|_| ())
            .map_err(|e| match e {
                Error::CommandFailed { stderr, .. } => Error::configuration(format!(
                    "Couldn't use key {:?}: {}",
                    self.key,
                    stderr.trim()
                )),
                e => e,
            })
    }
}

#[derive(Clone, Debug)]
pub struct GpgEncrypt {
    config: GpgKeyConfig,
}

impl From<GpgKeyConfig> for GpgEncrypt {
    fn from(config: GpgKeyConfig) -> Self {
        Self { config }
    }
}

impl GpgEncrypt {
    pub const KIND: &'static str = "gpg encrypt";

    pub fn new<S: Into<String>>(key: S) -> Self {
        GpgKeyConfig::new(key).into()
    }

    pub fn from_config(
        config: &OperationConfig,
        _global_config: &GlobalConfig,
        _registry: &Registry,
    ) -> Result<OperationKind> {
        Ok(Self {
            config: config.parse(Self::KIND)?,
        }
        .into())
    }

    fn command(&self) -> String {
        format!(
            "{} --encrypt --recipient {} --compress-algo none",
            self.config.program(),
            self.config.key
        )
    }
}

impl FileExtProvider for GpgEncrypt {
    fn file_ext(&self) -> Option<Arc<str>> {
        Some("enc".into())
    }
}

impl Operation for GpgEncrypt {
    fn verify(&self, _context: &Context) -> Result<()> {
        self.config.verify_with(&self.command())
    }

    fn forward(&self, _context: &mut Context) -> Result<String> {
        Ok(self.command())
    }

    fn backward(&self, _context: &mut Context) -> Result<String> {
        Ok(format!("{} --decrypt", self.config.program()))
    }
}

#[derive(Clone, Debug)]
pub struct GpgSign {
    config: GpgKeyConfig,
}

impl From<GpgKeyConfig> for GpgSign {
    fn from(config: GpgKeyConfig) -> Self {
        Self { config }
    }
}

impl GpgSign {
    pub const KIND: &'static str = "gpg sign";

    pub fn new<S: Into<String>>(key: S) -> Self {
        GpgKeyConfig::new(key).into()
    }

    pub fn from_config(
        config: &OperationConfig,
        _global_config: &GlobalConfig,
        _registry: &Registry,
    ) -> Result<OperationKind> {
        Ok(Self {
            config: config.parse(Self::KIND)?,
        }
        .into())
    }

    fn command(&self) -> String {
        format!(
            "{} --sign --local-user {} --compress-algo none",
            self.config.program(),
            self.config.key
        )
    }
}

impl FileExtProvider for GpgSign {
    fn file_ext(&self) -> Option<Arc<str>> {
        Some("sign".into())
    }
}

impl Operation for GpgSign {
    fn verify(&self, _context: &Context) -> Result<()> {
        self.config.verify_with(&self.command())
    }

    fn forward(&self, _context: &mut Context) -> Result<String> {
        Ok(self.command())
    }

    /// `gpg --decrypt` checks the signature and emits the signed payload.
    fn backward(&self, _context: &mut Context) -> Result<String> {
        Ok(format!("{} --decrypt", self.config.program()))
    }
}
