//! Error types for the multi-tenant SES dispatch crate.
//!
//! Every failure surfaced by the router, the MIME builder or the mail provider
//! is a [`SesError`]. Callers branch on [`SesError::kind`] rather than on
//! message text:
//!
//! - [`ErrorKind::InvalidArgument`] - rejected before any network call
//! - [`ErrorKind::Credential`] - base identity or role exchange failed
//! - [`ErrorKind::TenantNotFound`] - the tenant id is well-formed but unknown
//! - [`ErrorKind::EmptyBody`] - neither a text nor an HTML body was supplied
//! - [`ErrorKind::Provider`] - SES rejected the send, or the call to it failed
//! - [`ErrorKind::Encoding`] - MIME assembly failed (a defect, not transient)
//!
//! # Examples
//!
//! ```rust
//! use integrations_aws_ses_router::error::{ErrorKind, SesError};
//!
//! fn describe(error: &SesError) -> &'static str {
//!     match error.kind() {
//!         ErrorKind::TenantNotFound => "unknown tenant",
//!         ErrorKind::Provider => "provider failure",
//!         _ => "other",
//!     }
//! }
//!
//! let error = SesError::TenantNotFound { tenant_id: "GS".to_string() };
//! assert_eq!(describe(&error), "unknown tenant");
//! ```

mod mapping;

pub use mapping::{parse_error_response, parse_sts_error_response, AwsErrorResponse};
pub(crate) use mapping::unknown_provider_error;

use crate::credentials::CredentialError;
use thiserror::Error;

/// Result type alias for dispatch operations.
pub type SesResult<T> = Result<T, SesError>;

/// Closed classification of [`SesError`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An argument was empty or malformed.
    InvalidArgument,
    /// Credential resolution failed during registration.
    Credential,
    /// A send referenced an unregistered tenant.
    TenantNotFound,
    /// Both the text and HTML bodies were empty.
    EmptyBody,
    /// The remote mail provider rejected or failed the call.
    Provider,
    /// Internal MIME assembly failure.
    Encoding,
}

/// Top-level error type for tenant registration and email dispatch.
#[derive(Debug, Error)]
pub enum SesError {
    /// An argument was empty or malformed.
    ///
    /// Always detected before any network call is made.
    #[error("Invalid argument `{field}`: {message}")]
    InvalidArgument {
        /// Name of the offending argument.
        field: String,
        /// Why it was rejected.
        message: String,
    },

    /// Credential resolution failed.
    ///
    /// Registration has no effect on the registry when this is returned.
    #[error("Credential error{}: {source}", tenant_suffix(.tenant_id))]
    Credential {
        /// Tenant being registered, when known.
        tenant_id: Option<String>,
        /// The underlying credential failure.
        #[source]
        source: CredentialError,
    },

    /// The tenant id is not registered.
    #[error("Tenant not found: {tenant_id}")]
    TenantNotFound {
        /// The unknown tenant id.
        tenant_id: String,
    },

    /// Both the text and HTML bodies were empty.
    #[error("Email body must not be empty")]
    EmptyBody,

    /// SES rejected the request.
    #[error("Provider error: {code} - {message}")]
    Provider {
        /// Machine-readable error code (e.g. "MessageRejected").
        code: String,
        /// Human-readable message from the provider.
        message: String,
        /// AWS request id, for support cases.
        request_id: Option<String>,
        /// HTTP status of the failed call.
        status: Option<u16>,
    },

    /// The request never produced a provider response.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the failure.
        message: String,
        /// Underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A request could not be serialized or a response decoded.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the failure.
        message: String,
    },

    /// MIME assembly failed.
    #[error("Encoding error: {message}")]
    Encoding {
        /// Description of the failure.
        message: String,
    },
}

fn tenant_suffix(tenant_id: &Option<String>) -> String {
    match tenant_id {
        Some(id) => format!(" for tenant {}", id),
        None => String::new(),
    }
}

impl SesError {
    /// Shorthand for [`SesError::InvalidArgument`].
    pub fn invalid_argument(field: impl Into<String>, message: impl Into<String>) -> Self {
        SesError::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Classify this error.
    ///
    /// Transport and serialization failures happen while talking to the
    /// provider and classify as [`ErrorKind::Provider`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            SesError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            SesError::Credential { .. } => ErrorKind::Credential,
            SesError::TenantNotFound { .. } => ErrorKind::TenantNotFound,
            SesError::EmptyBody => ErrorKind::EmptyBody,
            SesError::Provider { .. }
            | SesError::Transport { .. }
            | SesError::Serialization { .. } => ErrorKind::Provider,
            SesError::Encoding { .. } => ErrorKind::Encoding,
        }
    }

    /// Returns the provider error code if available.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use integrations_aws_ses_router::error::SesError;
    ///
    /// let error = SesError::Provider {
    ///     code: "MessageRejected".to_string(),
    ///     message: "Email address is not verified".to_string(),
    ///     request_id: None,
    ///     status: Some(400),
    /// };
    /// assert_eq!(error.error_code(), Some("MessageRejected"));
    /// ```
    pub fn error_code(&self) -> Option<&str> {
        match self {
            SesError::Provider { code, .. } => Some(code.as_str()),
            SesError::Credential {
                source: CredentialError::AssumeRoleFailed { code, .. },
                ..
            } => Some(code.as_str()),
            _ => None,
        }
    }

    /// Returns the AWS request id if available.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            SesError::Provider { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }

    /// Returns the tenant id this error refers to, if any.
    pub fn tenant_id(&self) -> Option<&str> {
        match self {
            SesError::TenantNotFound { tenant_id } => Some(tenant_id.as_str()),
            SesError::Credential { tenant_id, .. } => tenant_id.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn with_tenant(self, tenant: &str) -> Self {
        match self {
            SesError::Credential { source, .. } => SesError::Credential {
                tenant_id: Some(tenant.to_string()),
                source,
            },
            other => other,
        }
    }
}

impl From<CredentialError> for SesError {
    fn from(source: CredentialError) -> Self {
        SesError::Credential {
            tenant_id: None,
            source,
        }
    }
}

impl From<serde_json::Error> for SesError {
    fn from(err: serde_json::Error) -> Self {
        SesError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Failure of a batch registration.
///
/// Batches stop at the first failing tenant. Tenants registered before the
/// failure stay registered and are listed in `registered`.
#[derive(Debug, Error)]
#[error("Registration of tenant {failed_tenant} failed: {source}")]
pub struct BatchRegistrationError {
    /// The tenant whose registration failed.
    pub failed_tenant: String,
    /// Tenants from the same batch that were registered before the failure.
    pub registered: Vec<String>,
    /// Why the failing tenant was rejected.
    #[source]
    pub source: SesError,
}

impl BatchRegistrationError {
    /// Classification of the underlying failure.
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}
