//! Steps that run on the destination side of the transport.

use crate::backup::config::{GlobalConfig, OperationConfig};
use crate::backup::context::Context;
use crate::backup::file_ext::FileExtProvider;
use crate::backup::operation::{EmptyConfig, Operation, OperationKind};
use crate::backup::registry::Registry;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use itertools::Itertools;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};
use validator::Validate;

static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();

fn placeholder() -> &'static Regex {
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{|\}\}|\{([^{}]*)\}").expect("placeholder regex must compile")
    })
}

/// Flushes file system buffers.
#[derive(Clone, Debug, Default)]
pub struct SyncOperation;

impl SyncOperation {
    pub const KIND: &'static str = "sync";

    pub fn from_config(
        config: &OperationConfig,
        _global_config: &GlobalConfig,
        _registry: &Registry,
    ) -> Result<OperationKind> {
        config.parse::<EmptyConfig>(Self::KIND)?;
        Ok(Self.into())
    }
}

impl FileExtProvider for SyncOperation {
    fn file_ext(&self) -> Option<Arc<str>> {
        None
    }
}

impl Operation for SyncOperation {
    fn forward(&self, _context: &mut Context) -> Result<String> {
        Ok("sync".into())
    }

    fn backward(&self, _context: &mut Context) -> Result<String> {
        Err(Error::NotImplemented {
            operation: Self::KIND,
        })
    }
}

/// Destination path template.
///
/// Accepts the `{dest_folder}`, `{dest_filename}`, `{date}` and
/// `{extensions}` placeholders; `{{` and `}}` produce literal braces.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct DestFileTemplate(String);

impl DestFileTemplate {
    pub const FIELDS: [&'static str; 4] = ["dest_folder", "dest_filename", "date", "extensions"];

    pub fn new<S: Into<String>>(template: S) -> Result<Self> {
        let template = Self(template.into());
        template.check()?;
        Ok(template)
    }

    fn check(&self) -> Result<()> {
        let unknown: BTreeSet<_> = placeholder()
            .captures_iter(&self.0)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .filter(|name| !Self::FIELDS.iter().any(|field| field == name))
            .collect();

        if unknown.is_empty() {
            Ok(())
        } else {
            Err(Error::configuration(format!(
                "Unknown placeholders in dest_file {:?}: {}",
                self.0,
                unknown.iter().join(", ")
            )))
        }
    }

    /// `values` follows the order of [`DestFileTemplate::FIELDS`].
    pub fn render(&self, values: [&str; 4]) -> String {
        placeholder()
            .replace_all(&self.0, |c: &Captures| match c.get(1) {
                Some(name) => Self::FIELDS
                    .iter()
                    .position(|field| *field == name.as_str())
                    .map(|i| values[i].to_string())
                    .unwrap_or_else(|| c[0].to_string()),
                None if &c[0] == "{{" => "{".to_string(),
                None => "}".to_string(),
            })
            .into_owned()
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, Validate)]
#[serde(deny_unknown_fields)]
pub struct SaveBackupConfig {
    /// Destination path template, see [`DestFileTemplate`]
    pub dest_file: DestFileTemplate,
}

/// Writes the incoming stream to the resolved destination file and records
/// its path in the context for later steps.
#[derive(Clone, Debug)]
pub struct SaveBackup {
    dest_file: DestFileTemplate,
}

impl SaveBackup {
    pub const KIND: &'static str = "save backup";

    pub fn new(dest_file: DestFileTemplate) -> Self {
        Self { dest_file }
    }

    pub fn from_config(
        config: &OperationConfig,
        _global_config: &GlobalConfig,
        _registry: &Registry,
    ) -> Result<OperationKind> {
        let config: SaveBackupConfig = config.parse(Self::KIND)?;
        config.dest_file.check()?;
        Ok(Self::new(config.dest_file).into())
    }

    pub fn dest_file_path(&self, context: &Context) -> Result<String> {
        let connection = context.connection()?;
        Ok(self.dest_file.render([
            &connection.dest_folder,
            &context.file_name,
            &context.date(),
            &context.pipeline_extensions,
        ]))
    }
}

impl FileExtProvider for SaveBackup {
    fn file_ext(&self) -> Option<Arc<str>> {
        None
    }
}

impl Operation for SaveBackup {
    fn forward(&self, context: &mut Context) -> Result<String> {
        let path = self.dest_file_path(context)?;
        let command = format!("cat > {path}");
        context.set_remote_dest_file_path(path);
        Ok(command)
    }

    fn backward(&self, _context: &mut Context) -> Result<String> {
        Err(Error::NotImplemented {
            operation: Self::KIND,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::operation::tests::context;

    #[test]
    fn test_sync() {
        let mut ctx = context("/a");
        assert_eq!(SyncOperation.forward(&mut ctx).unwrap(), "sync");
        assert!(SyncOperation.backward(&mut ctx).is_err());
        assert!(SyncOperation.file_ext().is_none());
    }

    #[test]
    fn test_template_render() {
        let template =
            DestFileTemplate::new("{dest_folder}/{dest_filename}-{date}{extensions}").unwrap();
        assert_eq!(
            template.render(["/data", "docs", "today", ".tar.gz"]),
            "/data/docs-today.tar.gz"
        );
    }

    #[test]
    fn test_template_escaped_braces() {
        let template = DestFileTemplate::new("{{x}}/{dest_filename}").unwrap();
        assert_eq!(template.render(["", "docs", "", ""]), "{x}/docs");
    }

    #[test]
    fn test_template_unknown_placeholder() {
        let err = DestFileTemplate::new("{dest_folder}/{host}/{user}").unwrap_err();
        assert!(err.is_configuration_error());
        let msg = err.to_string();
        assert!(msg.contains("host") && msg.contains("user"));
    }

    #[test]
    fn test_forward_records_dest_path() {
        let save = SaveBackup::new(
            DestFileTemplate::new("{dest_folder}/{dest_filename}.{date}{extensions}").unwrap(),
        );
        let mut ctx = context("/a");
        ctx.pipeline_extensions = ".tar.gz".into();

        assert_eq!(
            save.forward(&mut ctx).unwrap(),
            "cat > /data/docs.2024-03-01T12h30m05s_0000.tar.gz"
        );
        assert_eq!(
            ctx.remote_dest_file_path().unwrap(),
            "/data/docs.2024-03-01T12h30m05s_0000.tar.gz"
        );
    }

    #[test]
    fn test_forward_needs_connection() {
        let save = SaveBackup::new(DestFileTemplate::new("{dest_folder}/x").unwrap());
        let mut ctx = context("/a");
        ctx.connection = None;
        assert!(save.forward(&mut ctx).unwrap_err().is_configuration_error());
    }

    #[test]
    fn test_from_config_rejects_bad_template() {
        let config: OperationConfig = serde_yml::from_str("dest_file: '{nope}'").unwrap();
        let err = SaveBackup::from_config(&config, &GlobalConfig::default(), &Registry::new())
            .unwrap_err();
        assert!(err.is_configuration_error());
    }
}
