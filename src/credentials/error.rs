//! Credential error types.

use thiserror::Error;

/// Errors that can occur while establishing credentials.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Required credentials are missing.
    #[error("Missing credentials: {message}")]
    Missing {
        /// Which credentials are missing.
        message: String,
    },

    /// Credentials or their parameters are malformed.
    #[error("Invalid credentials: {message}")]
    Invalid {
        /// Why they are invalid.
        message: String,
    },

    /// Credentials have expired.
    #[error("Expired credentials")]
    Expired,

    /// A provider failed to load credentials.
    #[error("Failed to load credentials from {provider}: {message}")]
    LoadFailed {
        /// The provider that failed.
        provider: String,
        /// Details about the failure.
        message: String,
    },

    /// STS refused the role exchange.
    #[error("AssumeRole for {role_arn} failed: {code} - {message}")]
    AssumeRoleFailed {
        /// The role that was requested.
        role_arn: String,
        /// STS error code (e.g. "AccessDenied").
        code: String,
        /// STS error message.
        message: String,
    },

    /// The STS endpoint could not be reached.
    #[error("STS transport error: {message}")]
    Transport {
        /// Details about the failure.
        message: String,
    },
}
