//! Thin layer over the external processes this crate arranges.

use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use std::io::Write;
use std::process::{Command, Output, Stdio};
use tempfile::NamedTempFile;
use tracing::{debug, info};

static SHELL: &str = "bash";

/// Fails with a configuration error when `tool` is not on the `PATH`.
pub fn assert_command_exists(tool: &str) -> Result<()> {
    let found = Command::new("which")
        .arg(tool)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false);

    if found {
        Ok(())
    } else {
        Err(Error::configuration(format!("Command does not exist: {tool}")))
    }
}

/// Writes `script` to a scratch file and runs it with bash, blocking until
/// the whole process tree exits.
pub fn run_script(script: &str) -> Result<Output> {
    let mut file = NamedTempFile::new()?;
    file.write_all(script.as_bytes())?;
    file.flush()?;

    debug!("Running script {:?}", file.path());
    let output = Command::new(SHELL)
        .arg(file.path())
        .stdin(Stdio::null())
        .output()?;

    if output.status.success() {
        Ok(output)
    } else {
        Err(Error::CommandFailed {
            command: script.into(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Executes the composite command produced for one job.
pub trait CommandRunner: Send + Sync {
    fn run(&self, job_name: &str, command: &str) -> Result<()>;
}

/// Runs every command for real.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, job_name: &str, command: &str) -> Result<()> {
        info!("[{job_name}] running: {command}");
        run_script(command).map(|_| ())
    }
}

/// Only logs what would be run.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunRunner;

impl CommandRunner for DryRunRunner {
    fn run(&self, job_name: &str, command: &str) -> Result<()> {
        info!("[{job_name}] dry run: {command}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_command_exists() {
        assert!(assert_command_exists("sh").is_ok());
        let err = assert_command_exists("surely-not-an-installed-tool-42").unwrap_err();
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("surely-not-an-installed-tool-42"));
    }

    #[test]
    fn test_run_script_success() {
        let output = run_script("echo foo bar").unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "foo bar");
    }

    #[test]
    fn test_run_script_failure() {
        let err = run_script("echo broken >&2; exit 3").unwrap_err();
        match err {
            Error::CommandFailed { status, stderr, .. } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr.trim(), "broken");
            }
            e => panic!("Expected CommandFailed, got {e}"),
        }
    }

    #[test]
    fn test_runners() {
        assert!(ShellRunner.run("job", "true").is_ok());
        assert!(ShellRunner.run("job", "false").is_err());
        assert!(DryRunRunner.run("job", "false").is_ok());
    }
}
