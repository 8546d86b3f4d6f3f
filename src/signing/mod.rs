//! AWS Signature Version 4 request signing.
//!
//! Both the STS role exchange and SES sends are signed here; the service
//! name (`sts` or `ses`) and region are fixed per [`RequestSigner`].

pub mod canonical;
pub mod v4;

pub use v4::{derive_signing_key, sha256_hex, RequestSigner, AWS_ALGORITHM};

use thiserror::Error;

/// Service name for SES v2.
pub const SES_SERVICE: &str = "ses";

/// Service name for STS.
pub const STS_SERVICE: &str = "sts";

/// Errors raised while signing a request.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The request URL cannot be signed.
    #[error("Invalid URL: {message}")]
    InvalidUrl {
        /// Details.
        message: String,
    },

    /// A signature component could not be produced.
    #[error("Signing failed: {message}")]
    SigningFailed {
        /// Details.
        message: String,
    },
}

impl From<SigningError> for crate::error::SesError {
    fn from(err: SigningError) -> Self {
        crate::error::SesError::Transport {
            message: "Failed to sign request".to_string(),
            source: Some(Box::new(err)),
        }
    }
}
