use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use crate::backup::validate::{validate_connections, validate_non_blank, validate_valid_file_name};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use serde_yml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use validator::Validate;

/// The whole backup document: connections, pipelines and the folder jobs
/// binding them together.
#[derive(Clone, Default, Serialize, Deserialize, Debug, Validate)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Named ssh destinations
    #[validate(custom(function = validate_connections))]
    pub connection: BTreeMap<Arc<str>, ConnectionConfig>,

    #[serde(default)]
    #[validate(nested)]
    pub execution: ExecutionConfig,

    /// Named pipelines, each keyed by its `type`
    pub pipelines: BTreeMap<Arc<str>, OperationConfig>,

    /// One backup job per entry
    #[validate(nested)]
    pub folders: Vec<FolderJobConfig>,
}

impl GlobalConfig {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let config: GlobalConfig = serde_yml::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        File::open(path)
            .map_err(Error::from)
            .and_then(Self::from_reader)
            .with_msg(format!("Load config failed: {path:?}"))
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, Validate, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Host name or address handed to `ssh`
    #[validate(length(min = 1))]
    pub host: String,

    /// Login user on `host`
    #[validate(length(min = 1))]
    pub remote_user: String,

    /// Remote directory the `{dest_folder}` placeholder expands to
    #[validate(length(min = 1))]
    pub dest_folder: String,
}

#[derive(Clone, Serialize, Deserialize, Debug, Validate)]
#[serde(deny_unknown_fields)]
pub struct ExecutionConfig {
    /// How many folder jobs may run at once. `1` runs them in order.
    #[serde(default = "default_parallel_jobs", alias = "parralel_jobs")]
    #[validate(range(min = 1))]
    pub parallel_jobs: usize,
}

fn default_parallel_jobs() -> usize {
    1
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            parallel_jobs: default_parallel_jobs(),
        }
    }
}

#[skip_serializing_none]
#[derive(Clone, Serialize, Deserialize, Debug, Validate)]
#[serde(deny_unknown_fields)]
pub struct FolderJobConfig {
    /// Space separated path globs, handed to the shell as-is.
    ///
    /// Each glob must match something on disk when the job is verified.
    #[validate(custom(function = validate_non_blank))]
    pub folders: String,

    /// Name of an entry under `connection`. Only needed by pipelines with a
    /// remote half.
    #[serde(default)]
    pub connection: Option<String>,

    /// Name of an entry under `pipelines`.
    pub pipeline: String,

    /// Base name of the produced backup file, without extensions.
    ///
    /// Derived from `folders` when unset.
    #[serde(default)]
    #[validate(custom(function = validate_valid_file_name))]
    pub file_name: Option<String>,
}

/// Raw key/value configuration of a single operation.
///
/// Each operation kind deserializes its own typed view of it.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct OperationConfig(Mapping);

impl From<Mapping> for OperationConfig {
    fn from(value: Mapping) -> Self {
        Self(value)
    }
}

impl OperationConfig {
    pub fn kind(&self, key_field: &str) -> Result<&str> {
        self.0
            .get(key_field)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::configuration(format!(
                    "Operation config is missing string field {key_field:?}"
                ))
            })
    }

    pub fn without(&self, key_field: &str) -> Self {
        let mut mapping = self.0.clone();
        mapping.remove(key_field);
        Self(mapping)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Deserializes and validates the typed config of `kind`.
    pub fn parse<T: DeserializeOwned + Validate>(&self, kind: &str) -> Result<T> {
        let parsed: T = serde_yml::from_value(Value::Mapping(self.0.clone())).map_err(|e| {
            Error::configuration(format!("Invalid {kind:?} operation config: {e}"))
        })?;
        parsed.validate().map_err(|e| {
            Error::configuration(format!("Invalid {kind:?} operation config: {e}"))
        })?;
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
connection:
  nas:
    host: nas.local
    remote_user: backup
    dest_folder: /data
execution:
  parallel_jobs: 2
pipelines:
  default:
    type: pipeline
    connection: ssh
    local:
      - operation: tar
      - operation: compress
        algorithm: gzip
    remote:
      - operation: save backup
        dest_file: "{dest_folder}/{dest_filename}{extensions}"
folders:
  - folders: /home/user/docs
    connection: nas
    pipeline: default
  - folders: /etc
    connection: nas
    pipeline: default
    file_name: etc
"#;

    #[test]
    fn test_parse_sample() {
        let config = GlobalConfig::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(config.execution.parallel_jobs, 2);
        assert_eq!(config.folders.len(), 2);
        assert_eq!(config.folders[1].file_name.as_deref(), Some("etc"));
        assert_eq!(config.connection["nas"].host, "nas.local");
        assert_eq!(
            config.pipelines["default"].kind("type").unwrap(),
            "pipeline"
        );
    }

    #[test]
    fn test_execution_defaults_and_alias() {
        let execution: ExecutionConfig = serde_yml::from_str("{}").unwrap();
        assert_eq!(execution.parallel_jobs, 1);

        let execution: ExecutionConfig = serde_yml::from_str("parralel_jobs: 4").unwrap();
        assert_eq!(execution.parallel_jobs, 4);
    }

    #[test]
    fn test_zero_parallel_jobs_rejected() {
        let config = SAMPLE.replace("parallel_jobs: 2", "parallel_jobs: 0");
        let err = GlobalConfig::from_reader(config.as_bytes()).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_unsanitized_file_name_rejected() {
        let config = SAMPLE.replace("file_name: etc", "file_name: a/b");
        let err = GlobalConfig::from_reader(config.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::ValidationError(_)));
    }

    #[test]
    fn test_blank_folders_rejected() {
        let config = SAMPLE.replace("folders: /etc", "folders: '   '");
        let err = GlobalConfig::from_reader(config.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::ValidationError(_)));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let config = SAMPLE.replace("execution:", "executor:");
        assert!(GlobalConfig::from_reader(config.as_bytes()).is_err());
    }

    #[test]
    fn test_operation_config_kind_and_without() {
        let config: OperationConfig =
            serde_yml::from_str("operation: compress\nalgorithm: gzip").unwrap();
        assert_eq!(config.kind("operation").unwrap(), "compress");
        assert!(config.kind("type").is_err());

        let stripped = config.without("operation");
        assert!(stripped.get("operation").is_none());
        assert!(stripped.get("algorithm").is_some());
    }

    #[test]
    fn test_from_path_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = GlobalConfig::from_path(dir.path().join("missing.yml")).unwrap_err();
        assert!(err.to_string().contains("Load config failed"));
    }
}
