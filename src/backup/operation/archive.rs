use crate::backup::config::{GlobalConfig, OperationConfig};
use crate::backup::context::Context;
use crate::backup::file_ext::FileExtProvider;
use crate::backup::operation::{EmptyConfig, Operation, OperationKind};
use crate::backup::registry::Registry;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::shell::{assert_command_exists, run_script};
use itertools::Itertools;
use std::sync::Arc;

/// Streams the job's folders to stdout as a tar archive.
#[derive(Clone, Debug, Default)]
pub struct TarOperation;

impl TarOperation {
    pub const KIND: &'static str = "tar";

    pub fn from_config(
        config: &OperationConfig,
        _global_config: &GlobalConfig,
        _registry: &Registry,
    ) -> Result<OperationKind> {
        config.parse::<EmptyConfig>(Self::KIND)?;
        Ok(Self.into())
    }

    /// Prints every glob that matches nothing to stderr, exits non-zero if any.
    fn verification_script(folders: &str) -> String {
        format!(
            r#"missing=0
for glob in {folders}; do
  if ! stat -t "${{glob}}" >/dev/null 2>&1; then
    echo "${{glob}}" >&2
    missing=1
  fi
done
exit ${{missing}}
"#
        )
    }
}

impl FileExtProvider for TarOperation {
    fn file_ext(&self) -> Option<Arc<str>> {
        Some("tar".into())
    }
}

impl Operation for TarOperation {
    fn verify(&self, context: &Context) -> Result<()> {
        assert_command_exists("tar")?;
        if context.folders.split_whitespace().next().is_none() {
            return Err(Error::configuration("No folders to archive"));
        }
        match run_script(&Self::verification_script(&context.folders)) {
            Ok(_) => Ok(()),
            Err(Error::CommandFailed { stderr, .. }) => Err(Error::configuration(format!(
                "Referenced paths do not exist: {}",
                stderr.lines().filter(|l| !l.is_empty()).join(", ")
            ))),
            Err(e) => Err(e),
        }
    }

    fn forward(&self, context: &mut Context) -> Result<String> {
        Ok(format!("tar -c --to-stdout {}", context.folders.trim()))
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
    use tempfile::NamedTempFile;

    #[test]
    fn test_forward() {
        let mut ctx = context("/a /b");
        assert_eq!(
            TarOperation.forward(&mut ctx).unwrap(),
            "tar -c --to-stdout /a /b"
        );
    }

    #[test]
    fn test_forward_keeps_globs() {
        let mut ctx = context("/home/foo*");
        assert_eq!(
            TarOperation.forward(&mut ctx).unwrap(),
            "tar -c --to-stdout /home/foo*"
        );
    }

    #[test]
    fn test_verify_existing_paths() {
        let file = NamedTempFile::new().unwrap();
        let file2 = NamedTempFile::new().unwrap();
        let folders = format!("{} {}", file.path().display(), file2.path().display());
        TarOperation.verify(&context(&folders)).unwrap();
    }

    #[test]
    fn test_verify_glob() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("foo1"), "x").unwrap();
        std::fs::write(dir.path().join("foo2"), "x").unwrap();
        let folders = format!("{}/foo*", dir.path().display());
        TarOperation.verify(&context(&folders)).unwrap();
    }

    #[test]
    fn test_verify_lists_every_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = NamedTempFile::new().unwrap();
        let missing1 = dir.path().join("missing-1");
        let missing2 = dir.path().join("missing-2");
        let folders = format!(
            "{} {} {}",
            missing1.display(),
            file.path().display(),
            missing2.display()
        );

        let err = TarOperation.verify(&context(&folders)).unwrap_err();
        assert!(err.is_configuration_error());
        let msg = err.to_string();
        assert!(msg.contains(&missing1.display().to_string()));
        assert!(msg.contains(&missing2.display().to_string()));
        assert!(!msg.contains(&file.path().display().to_string()));
    }

    #[test]
    fn test_verify_rejects_blank_folders() {
        for folders in ["", "   ", " \t "] {
            let err = TarOperation.verify(&context(folders)).unwrap_err();
            assert!(err.is_configuration_error(), "{folders:?}: {err}");
        }
    }

    #[test]
    fn test_backward_not_implemented() {
        let err = TarOperation.backward(&mut context("/a")).unwrap_err();
        assert!(matches!(err, Error::NotImplemented { operation: "tar" }));
    }

    #[test]
    fn test_rejects_options() {
        let config: OperationConfig = serde_yml::from_str("level: 3").unwrap();
        let err = TarOperation::from_config(&config, &GlobalConfig::default(), &Registry::new())
            .unwrap_err();
        assert!(err.is_configuration_error());
    }
}
