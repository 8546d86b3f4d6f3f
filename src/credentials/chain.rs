//! Ordered fallback across credential providers.

use super::{AwsCredentials, CredentialProvider};
use crate::credentials::error::CredentialError;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Tries each provider in insertion order; the first success wins.
///
/// When every provider fails, the last provider's error is returned.
///
/// ```
/// use integrations_aws_ses_router::credentials::{
///     ChainCredentialProvider, EnvironmentCredentialProvider, StaticCredentialProvider,
/// };
///
/// let chain = ChainCredentialProvider::new()
///     .with_provider(EnvironmentCredentialProvider::new())
///     .with_provider(StaticCredentialProvider::from_keys("AKID", "SECRET"));
/// assert_eq!(chain.len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct ChainCredentialProvider {
    providers: Vec<Arc<dyn CredentialProvider>>,
}

impl ChainCredentialProvider {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider.
    pub fn with_provider<P>(mut self, provider: P) -> Self
    where
        P: CredentialProvider + 'static,
    {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Append a shared provider.
    pub fn with_arc_provider(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Number of providers in the chain.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// `true` if no provider has been added.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait]
impl CredentialProvider for ChainCredentialProvider {
    async fn credentials(&self) -> Result<AwsCredentials, CredentialError> {
        let mut last_error = None;

        for provider in &self.providers {
            match provider.credentials().await {
                Ok(credentials) => {
                    debug!(provider = provider.name(), "Resolved base credentials");
                    return Ok(credentials);
                }
                Err(e) => {
                    debug!(provider = provider.name(), error = %e, "Credential provider failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CredentialError::Missing {
            message: "No credential providers configured in chain".to_string(),
        }))
    }

    fn name(&self) -> &'static str {
        "chain"
    }
}

impl fmt::Debug for ChainCredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.providers.iter().map(|p| p.name()).collect();
        f.debug_struct("ChainCredentialProvider")
            .field("providers", &names)
            .finish()
    }
}
