//! Environment variable credentials provider.

use super::{AwsCredentials, CredentialProvider};
use crate::credentials::error::CredentialError;
use async_trait::async_trait;
use std::env;

/// Access key id variable.
pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
/// Secret access key variable.
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
/// Optional session token variable.
pub const AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";

/// Reads `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and, if set,
/// `AWS_SESSION_TOKEN`.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentCredentialProvider;

impl EnvironmentCredentialProvider {
    /// Create a new environment credentials provider.
    pub fn new() -> Self {
        Self
    }

    fn required(name: &str) -> Result<String, CredentialError> {
        let value = env::var(name).map_err(|e| match e {
            env::VarError::NotPresent => CredentialError::Missing {
                message: format!("{} environment variable not set", name),
            },
            env::VarError::NotUnicode(_) => CredentialError::LoadFailed {
                provider: "environment".to_string(),
                message: format!("{} is not valid UTF-8", name),
            },
        })?;

        if value.is_empty() {
            return Err(CredentialError::Invalid {
                message: format!("{} is empty", name),
            });
        }

        Ok(value)
    }
}

#[async_trait]
impl CredentialProvider for EnvironmentCredentialProvider {
    async fn credentials(&self) -> Result<AwsCredentials, CredentialError> {
        let access_key_id = Self::required(AWS_ACCESS_KEY_ID)?;
        let secret_access_key = Self::required(AWS_SECRET_ACCESS_KEY)?;

        let credentials = AwsCredentials::new(access_key_id, secret_access_key);

        match env::var(AWS_SESSION_TOKEN).ok().filter(|s| !s.is_empty()) {
            Some(token) => Ok(credentials.with_session_token(token)),
            None => Ok(credentials),
        }
    }

    fn name(&self) -> &'static str {
        "environment"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test so the process environment is not mutated concurrently.
    #[tokio::test]
    async fn test_environment_provider() {
        let saved: Vec<_> = [AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, AWS_SESSION_TOKEN]
            .iter()
            .map(|k| (*k, env::var(k).ok()))
            .collect();

        env::remove_var(AWS_ACCESS_KEY_ID);
        env::remove_var(AWS_SECRET_ACCESS_KEY);
        env::remove_var(AWS_SESSION_TOKEN);
        let provider = EnvironmentCredentialProvider::new();
        assert!(matches!(
            provider.credentials().await,
            Err(CredentialError::Missing { .. })
        ));

        env::set_var(AWS_ACCESS_KEY_ID, "");
        env::set_var(AWS_SECRET_ACCESS_KEY, "SECRET");
        assert!(matches!(
            provider.credentials().await,
            Err(CredentialError::Invalid { .. })
        ));

        env::set_var(AWS_ACCESS_KEY_ID, "AKID");
        env::set_var(AWS_SESSION_TOKEN, "TOKEN");
        let creds = provider.credentials().await.unwrap();
        assert_eq!(creds.access_key_id(), "AKID");
        assert_eq!(creds.secret_access_key(), "SECRET");
        assert_eq!(creds.session_token(), Some("TOKEN"));

        for (key, value) in saved {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}
