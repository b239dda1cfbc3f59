//! CLI exit codes for scripting and automation.
//!
//! Responsibilities:
//! - Define structured exit codes that scripts can use to distinguish error types.
//! - Map ClientError variants to appropriate exit codes.
//!
//! Does NOT handle:
//! - Error message formatting (handled by anyhow Display).
//!
//! Invariants:
//! - Exit codes 1-9 are reserved for specific error categories.
//! - Exit code 130 is reserved for SIGINT (Unix standard: 128 + SIGINT).

use splunk_jobs::ClientError;

/// Structured exit codes for splunk-jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Command completed successfully.
    Success = 0,

    /// Unhandled or generic failure.
    GeneralError = 1,

    /// Missing or rejected credentials.
    AuthenticationFailed = 2,

    /// Network, TLS, or DNS failure. Scripts may retry.
    ConnectionError = 3,

    /// The job does not exist (or no longer exists).
    NotFound = 4,

    /// Invalid SPL or a rejected option. Retrying the same input will not help.
    ValidationError = 5,

    /// Insufficient privileges.
    PermissionDenied = 6,

    /// HTTP 429 after retries.
    RateLimited = 7,

    /// HTTP 502/503/504 after retries.
    ServiceUnavailable = 8,

    /// A wait ran past its deadline, or results were requested too early.
    NotReady = 9,

    /// SIGINT/Ctrl+C (128 + 2).
    Interrupted = 130,
}

impl ExitCode {
    /// Convert the exit code to an i32 for use with std::process::exit().
    pub const fn as_i32(self) -> i32 {
        self as u8 as i32
    }
}

impl From<&ClientError> for ExitCode {
    fn from(err: &ClientError) -> Self {
        match err {
            ClientError::AuthFailed(_) => ExitCode::AuthenticationFailed,
            ClientError::ApiError { status: 401, .. } => ExitCode::AuthenticationFailed,

            ClientError::InvalidUrl(_) => ExitCode::ConnectionError,
            ClientError::StreamInterrupted(_) => ExitCode::ConnectionError,
            ClientError::HttpError(e) => {
                if e.is_connect() || e.is_timeout() {
                    ExitCode::ConnectionError
                } else {
                    ExitCode::GeneralError
                }
            }

            ClientError::JobNotFound { .. } => ExitCode::NotFound,
            ClientError::ApiError { status: 404, .. } => ExitCode::NotFound,

            ClientError::Validation { .. } => ExitCode::ValidationError,
            ClientError::SearchSyntax { .. } => ExitCode::ValidationError,
            ClientError::ApiError { status: 400, .. } => ExitCode::ValidationError,

            ClientError::ApiError { status: 403, .. } => ExitCode::PermissionDenied,
            ClientError::ApiError { status: 429, .. } => ExitCode::RateLimited,
            ClientError::ApiError {
                status: 502..=504, ..
            } => ExitCode::ServiceUnavailable,

            ClientError::OperationTimeout { .. } => ExitCode::NotReady,
            ClientError::JobNotDone { .. } => ExitCode::NotReady,

            ClientError::MaxRetriesExceeded(_, inner) => Self::from(inner.as_ref()),

            ClientError::ApiError { .. }
            | ClientError::InvalidResponse(_)
            | ClientError::Parse { .. } => ExitCode::GeneralError,
        }
    }
}

/// Extension trait for anyhow::Error to extract exit codes.
pub trait ExitCodeExt {
    /// Returns ExitCode::GeneralError if no ClientError is in the chain.
    fn exit_code(&self) -> ExitCode;
}

impl ExitCodeExt for anyhow::Error {
    fn exit_code(&self) -> ExitCode {
        self.chain()
            .find_map(|cause| cause.downcast_ref::<ClientError>())
            .map(ExitCode::from)
            .unwrap_or(ExitCode::GeneralError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn api_error(status: u16) -> ClientError {
        ClientError::ApiError {
            status,
            url: "https://localhost:8089/services/search/jobs".to_string(),
            message: "error".to_string(),
            request_id: None,
        }
    }

    #[test]
    fn test_exit_code_as_i32() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::NotReady.as_i32(), 9);
        assert_eq!(ExitCode::Interrupted.as_i32(), 130);
    }

    #[test]
    fn test_job_errors() {
        let not_found = ClientError::JobNotFound {
            sid: "1.2".to_string(),
        };
        assert_eq!(ExitCode::from(&not_found), ExitCode::NotFound);

        let syntax = ClientError::SearchSyntax {
            message: "Unknown search command 'foo'.".to_string(),
        };
        assert_eq!(ExitCode::from(&syntax), ExitCode::ValidationError);

        let timeout = ClientError::OperationTimeout {
            operation: "results",
            timeout: Duration::from_secs(5),
        };
        assert_eq!(ExitCode::from(&timeout), ExitCode::NotReady);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ExitCode::from(&api_error(401)), ExitCode::AuthenticationFailed);
        assert_eq!(ExitCode::from(&api_error(403)), ExitCode::PermissionDenied);
        assert_eq!(ExitCode::from(&api_error(429)), ExitCode::RateLimited);
        assert_eq!(ExitCode::from(&api_error(503)), ExitCode::ServiceUnavailable);
        assert_eq!(ExitCode::from(&api_error(500)), ExitCode::GeneralError);
    }

    #[test]
    fn test_max_retries_uses_inner_error() {
        let err = ClientError::MaxRetriesExceeded(4, Box::new(api_error(504)));
        assert_eq!(ExitCode::from(&err), ExitCode::ServiceUnavailable);
    }

    #[test]
    fn test_anyhow_chain() {
        let err = anyhow::Error::new(api_error(404)).context("fetching job");
        assert_eq!(err.exit_code(), ExitCode::NotFound);
        assert_eq!(anyhow::anyhow!("plain").exit_code(), ExitCode::GeneralError);
    }
}
