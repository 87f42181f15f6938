use crate::backup::context::Context;
use crate::backup::result_error::result::Result;
use serde::{Deserialize, Serialize};

/// Carries the local half of a pipeline to the remote half.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// Pipe into `ssh <user>@<host> '<remote>'`
    Ssh,
}

impl Transport {
    pub fn wrap(&self, context: &Context, local: &str, remote: &str) -> Result<String> {
        let connection = context.connection()?;
        match self {
            Transport::Ssh => Ok(format!(
                "{local} | ssh {}@{} '{remote}'",
                connection.remote_user, connection.host
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::operation::tests::context;

    #[test]
    fn test_ssh_wrap() {
        let ctx = context("/a");
        assert_eq!(
            Transport::Ssh.wrap(&ctx, "tar -c --to-stdout /a", "cat > /data/x && sync").unwrap(),
            "tar -c --to-stdout /a | ssh jb@nas 'cat > /data/x && sync'"
        );
    }

    #[test]
    fn test_ssh_wrap_needs_connection() {
        let mut ctx = context("/a");
        ctx.connection = None;
        assert!(Transport::Ssh.wrap(&ctx, "a", "b").is_err());
    }

    #[test]
    fn test_only_ssh_deserializes() {
        assert_eq!(serde_yml::from_str::<Transport>("ssh").unwrap(), Transport::Ssh);
        assert!(serde_yml::from_str::<Transport>("rsync").is_err());
    }
}
