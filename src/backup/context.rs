//! Per-job state threaded through a single pipeline invocation.
//!
//! A [`Context`] is built fresh for every job and every phase. Operations read
//! the fixed fields and may fill in [`Context::remote_dest_file_path`], which
//! is then visible to every operation forwarded after them.

use crate::backup::config::ConnectionConfig;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use bon::Builder;
use chrono::{DateTime, Utc};
use std::sync::Arc;

static TIME_FORMAT: &str = "%Y-%m-%dT%Hh%Mm%Ss%z";

#[derive(Clone, Debug, Builder)]
pub struct Context {
    /// Space separated path globs of the job.
    #[builder(into)]
    pub folders: Arc<str>,
    pub connection: Option<Arc<ConnectionConfig>>,
    /// Base name of the backup file on the destination.
    #[builder(into)]
    pub file_name: Arc<str>,
    /// Joined extensions of the job pipeline's local operations, e.g. `.tar.gz`.
    #[builder(into, default = Arc::<str>::from(""))]
    pub pipeline_extensions: Arc<str>,
    pub compress_threads: Option<usize>,
    #[builder(default = Utc::now())]
    pub date_time: DateTime<Utc>,
    #[builder(skip)]
    remote_dest_file_path: Option<Arc<str>>,
}

impl Context {
    pub fn connection(&self) -> Result<&ConnectionConfig> {
        self.connection.as_deref().ok_or_else(|| {
            Error::configuration(format!(
                "Job {:?} needs a connection but none is configured",
                self.file_name
            ))
        })
    }

    /// Timestamp usable inside a file name.
    pub fn date(&self) -> String {
        self.date_time
            .format(TIME_FORMAT)
            .to_string()
            .replace('+', "_")
    }

    pub fn remote_dest_file_path(&self) -> Result<&str> {
        self.remote_dest_file_path.as_deref().ok_or_else(|| {
            Error::configuration(
                "Destination file path is not known yet, a \"save backup\" step must run first",
            )
        })
    }

    pub fn set_remote_dest_file_path<S: Into<Arc<str>>>(&mut self, path: S) {
        self.remote_dest_file_path = Some(path.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn context() -> Context {
        Context::builder()
            .folders("/a /b")
            .file_name("job")
            .date_time(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap())
            .build()
    }

    #[test]
    fn test_date_format() {
        assert_eq!(context().date(), "2024-03-01T12h30m05s_0000");
    }

    #[test]
    fn test_missing_connection() {
        let err = context().connection().unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_remote_dest_file_path() {
        let mut ctx = context();
        assert!(ctx.remote_dest_file_path().is_err());
        ctx.set_remote_dest_file_path("/data/job.tar");
        assert_eq!(ctx.remote_dest_file_path().unwrap(), "/data/job.tar");
    }
}
