//! In-memory mail provider and resolver.

use crate::credentials::CredentialError;
use crate::error::{SesError, SesResult};
use crate::provider::MailProvider;
use crate::resolver::CredentialResolver;
use crate::types::{RawEmail, SimpleEmail, TenantAccountConfig};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// [`MailProvider`] that records every message and returns sequential ids.
#[derive(Debug, Default)]
pub struct MockMailProvider {
    id_prefix: String,
    next_id: AtomicUsize,
    simple: Mutex<Vec<SimpleEmail>>,
    raw: Mutex<Vec<RawEmail>>,
    failure: Option<(String, String)>,
}

impl MockMailProvider {
    /// Create a provider whose message ids are `{id_prefix}-{n}`.
    pub fn new(id_prefix: impl Into<String>) -> Self {
        Self {
            id_prefix: id_prefix.into(),
            ..Self::default()
        }
    }

    /// Make every send fail with a provider error carrying `code`.
    pub fn with_failure(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.failure = Some((code.into(), message.into()));
        self
    }

    /// Simple messages sent so far.
    pub fn sent_simple(&self) -> Vec<SimpleEmail> {
        self.simple.lock().clone()
    }

    /// Raw messages sent so far.
    pub fn sent_raw(&self) -> Vec<RawEmail> {
        self.raw.lock().clone()
    }

    /// Number of send attempts, failed ones included.
    pub fn send_count(&self) -> usize {
        self.next_id.load(Ordering::SeqCst)
    }

    fn outcome(&self) -> SesResult<String> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some((code, message)) => Err(SesError::Provider {
                code: code.clone(),
                message: message.clone(),
                request_id: None,
                status: Some(400),
            }),
            None => Ok(format!("{}-{}", self.id_prefix, n)),
        }
    }
}

#[async_trait]
impl MailProvider for MockMailProvider {
    async fn send_simple(&self, email: &SimpleEmail) -> SesResult<String> {
        self.simple.lock().push(email.clone());
        self.outcome()
    }

    async fn send_raw(&self, email: &RawEmail) -> SesResult<String> {
        self.raw.lock().push(email.clone());
        self.outcome()
    }
}

/// [`CredentialResolver`] handing out a fresh [`MockMailProvider`] per call.
///
/// Providers are keyed by role ARN and use it as their id prefix.
#[derive(Debug, Default)]
pub struct MockResolver {
    failing_roles: HashSet<String>,
    resolved: Mutex<Vec<(String, Arc<MockMailProvider>)>>,
    calls: AtomicUsize,
}

impl MockResolver {
    /// Create a resolver that accepts every role.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail resolution of `role_arn` with an `AccessDenied` role exchange.
    pub fn fail_for_role(mut self, role_arn: impl Into<String>) -> Self {
        self.failing_roles.insert(role_arn.into());
        self
    }

    /// Number of `resolve` calls, failed ones included.
    pub fn resolve_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent provider resolved for `role_arn`.
    pub fn provider_for_role(&self, role_arn: &str) -> Option<Arc<MockMailProvider>> {
        self.resolved
            .lock()
            .iter()
            .rev()
            .find(|(role, _)| role == role_arn)
            .map(|(_, provider)| provider.clone())
    }
}

#[async_trait]
impl CredentialResolver for MockResolver {
    async fn resolve(&self, config: &TenantAccountConfig) -> SesResult<Arc<dyn MailProvider>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_roles.contains(&config.role_arn) {
            return Err(CredentialError::AssumeRoleFailed {
                role_arn: config.role_arn.clone(),
                code: "AccessDenied".to_string(),
                message: "mock resolver rejects this role".to_string(),
            }
            .into());
        }

        let provider = Arc::new(MockMailProvider::new(config.role_arn.as_str()));
        self.resolved
            .lock()
            .push((config.role_arn.clone(), provider.clone()));
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn email() -> SimpleEmail {
        SimpleEmail {
            from: "a@example.com".to_string(),
            to: vec!["b@example.com".to_string()],
            subject: "s".to_string(),
            text: "t".to_string(),
            html: "t".to_string(),
        }
    }

    #[tokio::test]
    async fn test_mock_provider_records_and_numbers() {
        let provider = MockMailProvider::new("role");
        assert_eq!(provider.send_simple(&email()).await.unwrap(), "role-0");
        assert_eq!(provider.send_simple(&email()).await.unwrap(), "role-1");
        assert_eq!(provider.sent_simple().len(), 2);
        assert!(provider.sent_raw().is_empty());
    }

    #[tokio::test]
    async fn test_mock_provider_failure() {
        let provider = MockMailProvider::new("role").with_failure("MessageRejected", "no");
        let error = provider.send_simple(&email()).await.unwrap_err();
        assert_eq!(error.error_code(), Some("MessageRejected"));
        assert_eq!(provider.send_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_resolver() {
        let resolver = MockResolver::new().fail_for_role("bad");

        let config = TenantAccountConfig::new("good", "eu-west-1", "a@example.com");
        assert!(resolver.resolve(&config).await.is_ok());
        assert!(resolver.provider_for_role("good").is_some());

        let config = TenantAccountConfig::new("bad", "eu-west-1", "a@example.com");
        let error = resolver.resolve(&config).await.err().unwrap();
        assert_eq!(error.kind(), ErrorKind::Credential);
        assert_eq!(resolver.resolve_count(), 2);
    }
}
