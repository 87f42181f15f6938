//! Validation functions for configuration values.

use crate::backup::config::ConnectionConfig;
use itertools::Itertools;
use sanitize_filename::{is_sanitized, sanitize};
use validator::{Validate, ValidationError};

use std::collections::BTreeMap;
use std::sync::Arc;

pub fn validate_valid_file_name<S: AsRef<str>>(name: S) -> Result<(), ValidationError> {
    let name = name.as_ref();
    if name.is_empty() || !is_sanitized(name) {
        return Err(ValidationError::new("InvalidFileName").with_message(
            format!("Invalid file name, try sanitizing like {:?}", sanitize(name)).into(),
        ));
    }

    Ok(())
}

/// Rejects a folder list holding no path at all.
pub fn validate_non_blank<S: AsRef<str>>(value: S) -> Result<(), ValidationError> {
    if value.as_ref().trim().is_empty() {
        return Err(ValidationError::new("Blank").with_message("Must not be blank".into()));
    }

    Ok(())
}

pub fn validate_connections(
    connections: &BTreeMap<Arc<str>, ConnectionConfig>,
) -> Result<(), ValidationError> {
    let invalid = connections
        .iter()
        .filter_map(|(name, connection)| {
            connection
                .validate()
                .err()
                .map(|e| format!("{name}: {e}"))
        })
        .collect_vec();

    if invalid.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new("InvalidConnection")
            .with_message(invalid.join("; ").into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_file_name() {
        assert!(validate_valid_file_name("home-backup").is_ok());
        assert!(validate_valid_file_name("home/backup").is_err());
        assert!(validate_valid_file_name("").is_err());
    }

    #[test]
    fn test_non_blank() {
        assert!(validate_non_blank("/home /etc").is_ok());
        assert!(validate_non_blank("").is_err());
        assert!(validate_non_blank(" \t\n").is_err());
    }

    #[test]
    fn test_connections() {
        let mut connections = BTreeMap::new();
        connections.insert(
            Arc::from("nas"),
            ConnectionConfig {
                host: "nas".into(),
                remote_user: "backup".into(),
                dest_folder: "/data".into(),
            },
        );
        assert!(validate_connections(&connections).is_ok());

        connections.insert(
            Arc::from("broken"),
            ConnectionConfig {
                host: "".into(),
                remote_user: "backup".into(),
                dest_folder: "/data".into(),
            },
        );
        let err = validate_connections(&connections).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }
}
