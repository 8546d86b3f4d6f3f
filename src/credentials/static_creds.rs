//! Fixed credentials.

use super::{AwsCredentials, CredentialProvider};
use crate::credentials::error::CredentialError;
use async_trait::async_trait;

/// Provider that always returns the same credentials.
///
/// Used to inject a known base identity, and throughout the tests.
///
/// ```
/// use integrations_aws_ses_router::credentials::{AwsCredentials, StaticCredentialProvider};
///
/// let provider = StaticCredentialProvider::new(AwsCredentials::new("AKID", "SECRET"));
/// ```
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    credentials: AwsCredentials,
}

impl StaticCredentialProvider {
    /// Wrap `credentials`.
    pub fn new(credentials: AwsCredentials) -> Self {
        Self { credentials }
    }

    /// Shorthand for long-lived access keys.
    pub fn from_keys(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        Self::new(AwsCredentials::new(access_key_id, secret_access_key))
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn credentials(&self) -> Result<AwsCredentials, CredentialError> {
        if self.credentials.is_expired() {
            return Err(CredentialError::Expired);
        }
        Ok(self.credentials.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
