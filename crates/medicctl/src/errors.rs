//! Exit codes for medicctl
//!
//! Stable across releases so scripts can branch on them.

use medic_common::{MedicError, Severity};

/// Exit code for success
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code for general errors
pub const EXIT_GENERAL_ERROR: i32 = 1;

/// Checks ran to completion and found error or critical issues
pub const EXIT_ISSUES_DETECTED: i32 = 2;

/// Exit code for invalid command line usage
pub const EXIT_USAGE: i32 = 64;

/// Exit code when the configuration cannot be read or parsed
pub const EXIT_CONFIG_ERROR: i32 = 78;

/// Map a failed invocation to an exit code
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    let config_error = err.chain().any(|cause| {
        cause
            .downcast_ref::<MedicError>()
            .is_some_and(MedicError::is_config_error)
    });
    if config_error {
        EXIT_CONFIG_ERROR
    } else {
        EXIT_GENERAL_ERROR
    }
}

/// Warnings still exit 0; error and critical report issues
pub fn exit_code_for_severity(severity: Severity) -> i32 {
    if severity >= Severity::Error {
        EXIT_ISSUES_DETECTED
    } else {
        EXIT_SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use std::path::PathBuf;

    #[test]
    fn test_config_errors_map_to_78() {
        let result: Result<(), MedicError> = Err(MedicError::ConfigRead {
            path: PathBuf::from("/nope/config.toml"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
        let err = result.context("Failed to load configuration").unwrap_err();
        assert_eq!(exit_code_for(&err), EXIT_CONFIG_ERROR);
    }

    #[test]
    fn test_other_errors_are_general() {
        let err = anyhow::anyhow!("boom");
        assert_eq!(exit_code_for(&err), EXIT_GENERAL_ERROR);
    }

    #[test]
    fn test_severity_exit_codes() {
        assert_eq!(exit_code_for_severity(Severity::Ok), EXIT_SUCCESS);
        assert_eq!(exit_code_for_severity(Severity::Warning), EXIT_SUCCESS);
        assert_eq!(exit_code_for_severity(Severity::Error), EXIT_ISSUES_DETECTED);
        assert_eq!(exit_code_for_severity(Severity::Critical), EXIT_ISSUES_DETECTED);
    }
}
