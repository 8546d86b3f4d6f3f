//! Resolution of a tenant configuration into a credential-scoped client.

use crate::config::RouterConfig;
use crate::credentials::{
    AssumeRoleCredentialProvider, CachedCredentialProvider, CredentialError, CredentialProvider,
    DefaultCredentialProvider,
};
use crate::error::SesResult;
use crate::provider::{MailProvider, SesMailClient};
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::types::TenantAccountConfig;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns a tenant configuration into a client that sends as that tenant.
///
/// The returned client is shared by every send for the tenant and must stay
/// usable for the life of the process.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    /// Resolve `config` into a mail client.
    ///
    /// # Errors
    ///
    /// A [`SesError::Credential`](crate::error::SesError::Credential) when
    /// the base identity or the role exchange cannot be established.
    async fn resolve(&self, config: &TenantAccountConfig) -> SesResult<Arc<dyn MailProvider>>;
}

/// Resolver that assumes each tenant's role with STS.
///
/// One base identity is shared by all tenants; each tenant gets its own
/// cached assumed-role credentials, refreshed ahead of expiry, and its own
/// [`SesMailClient`]. All clients share one HTTP connection pool.
#[derive(Clone)]
pub struct AssumeRoleResolver {
    base: Arc<dyn CredentialProvider>,
    transport: Arc<dyn HttpTransport>,
    config: RouterConfig,
}

impl AssumeRoleResolver {
    /// Create a resolver using [`DefaultCredentialProvider`] as the base
    /// identity and a `reqwest` transport built from `config`.
    pub fn new(config: RouterConfig) -> SesResult<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Ok(Self::with_transport(
            Arc::new(DefaultCredentialProvider::new()),
            transport,
            config,
        ))
    }

    /// Create a resolver from explicit parts.
    pub fn with_transport(
        base: Arc<dyn CredentialProvider>,
        transport: Arc<dyn HttpTransport>,
        config: RouterConfig,
    ) -> Self {
        Self {
            base,
            transport,
            config,
        }
    }

    /// Replace the base identity.
    pub fn with_base_provider(mut self, base: Arc<dyn CredentialProvider>) -> Self {
        self.base = base;
        self
    }

    /// The shared configuration.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }
}

#[async_trait]
impl CredentialResolver for AssumeRoleResolver {
    async fn resolve(&self, config: &TenantAccountConfig) -> SesResult<Arc<dyn MailProvider>> {
        validate_region(&config.region)?;
        validate_role_arn(&config.role_arn)?;

        let assume_role = AssumeRoleCredentialProvider::new(
            self.base.clone(),
            self.transport.clone(),
            config.role_arn.as_str(),
            config.region.as_str(),
            self.config.sts_endpoint_for(&config.region),
        )
        .with_session_name(self.config.role_session_name.as_str())
        .with_duration(self.config.assume_role_duration);

        let credentials = CachedCredentialProvider::new(assume_role)
            .with_refresh_buffer(self.config.credential_refresh_buffer);

        // Fail registration now rather than on the first send.
        if let Err(e) = credentials.credentials().await {
            warn!(
                role_arn = %config.role_arn,
                region = %config.region,
                error = %e,
                "Role exchange failed"
            );
            return Err(e.into());
        }

        debug!(
            role_arn = %config.role_arn,
            region = %config.region,
            "Resolved tenant client"
        );

        Ok(Arc::new(SesMailClient::with_transport(
            config.region.as_str(),
            Arc::new(credentials),
            self.transport.clone(),
            &self.config,
        )))
    }
}

impl fmt::Debug for AssumeRoleResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssumeRoleResolver")
            .field("base", &self.base.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn validate_region(region: &str) -> Result<(), CredentialError> {
    let valid = !region.is_empty()
        && region
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

    if valid {
        Ok(())
    } else {
        Err(CredentialError::Invalid {
            message: format!("Invalid region {:?}", region),
        })
    }
}

fn validate_role_arn(role_arn: &str) -> Result<(), CredentialError> {
    let mut parts = role_arn.splitn(6, ':');
    let valid = parts.next() == Some("arn")
        && parts.next().map_or(false, |partition| !partition.is_empty())
        && parts.next() == Some("iam")
        && parts.next() == Some("")
        && parts.next().map_or(false, |account| !account.is_empty())
        && parts.next().map_or(false, |resource| {
            resource.len() > "role/".len() && resource.starts_with("role/")
        });

    if valid {
        Ok(())
    } else {
        Err(CredentialError::Invalid {
            message: format!("Invalid role ARN {:?}", role_arn),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredentialProvider;
    use crate::error::{ErrorKind, SesError};
    use crate::transport::{HttpResponse, MockHttpTransport};
    use crate::types::SimpleEmail;
    use http::HeaderMap;
    use rstest::rstest;

    const ROLE: &str = "arn:aws:iam::123456789012:role/tenant-mailer";

    const ASSUMED: &str = r#"<AssumeRoleResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <AssumeRoleResult>
    <Credentials>
      <AccessKeyId>ASIATENANTKEY</AccessKeyId>
      <SecretAccessKey>tenantsecret</SecretAccessKey>
      <SessionToken>tenanttoken</SessionToken>
      <Expiration>2031-07-15T23:28:33Z</Expiration>
    </Credentials>
  </AssumeRoleResult>
</AssumeRoleResponse>"#;

    fn respond(status: u16, body: &'static str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HeaderMap::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    fn resolver(transport: MockHttpTransport) -> AssumeRoleResolver {
        AssumeRoleResolver::with_transport(
            Arc::new(StaticCredentialProvider::from_keys("AKIDBASE", "BASESECRET")),
            Arc::new(transport),
            RouterConfig::default(),
        )
    }

    #[rstest]
    #[case("us-east-1", true)]
    #[case("ap-southeast-1", true)]
    #[case("", false)]
    #[case("US-EAST-1", false)]
    #[case("us east 1", false)]
    fn test_validate_region(#[case] region: &str, #[case] valid: bool) {
        assert_eq!(validate_region(region).is_ok(), valid);
    }

    #[rstest]
    #[case(ROLE, true)]
    #[case("arn:aws-cn:iam::123456789012:role/path/mailer", true)]
    #[case("tenant-mailer", false)]
    #[case("arn:aws:iam::123456789012:user/mailer", false)]
    #[case("arn:aws:iam::123456789012:role/", false)]
    #[case("arn:aws:s3:::bucket", false)]
    fn test_validate_role_arn(#[case] arn: &str, #[case] valid: bool) {
        assert_eq!(validate_role_arn(arn).is_ok(), valid);
    }

    #[tokio::test]
    async fn test_resolve_uses_assumed_credentials() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .withf(|request| request.url.host_str() == Some("sts.eu-west-1.amazonaws.com"))
            .times(1)
            .returning(|_| Ok(respond(200, ASSUMED)));
        transport
            .expect_send()
            .withf(|request| {
                request.url.host_str() == Some("email.eu-west-1.amazonaws.com")
                    && request
                        .headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map_or(false, |v| v.contains("ASIATENANTKEY/"))
                    && request
                        .headers
                        .get("x-amz-security-token")
                        .map_or(false, |v| v == "tenanttoken")
            })
            .times(2)
            .returning(|_| Ok(respond(200, r#"{"MessageId":"m-1"}"#)));

        let config = TenantAccountConfig::new(ROLE, "eu-west-1", "noreply@tenant.example");
        let client = resolver(transport).resolve(&config).await.unwrap();

        let email = SimpleEmail {
            from: "noreply@tenant.example".to_string(),
            to: vec!["user@example.com".to_string()],
            subject: "s".to_string(),
            text: "b".to_string(),
            html: "b".to_string(),
        };
        // Second send reuses the cached role credentials.
        assert_eq!(client.send_simple(&email).await.unwrap(), "m-1");
        assert_eq!(client.send_simple(&email).await.unwrap(), "m-1");
    }

    #[tokio::test]
    async fn test_resolve_role_denied() {
        let mut transport = MockHttpTransport::new();
        transport.expect_send().times(1).returning(|_| {
            Ok(respond(
                403,
                "<ErrorResponse><Error><Code>AccessDenied</Code>\
                 <Message>denied</Message></Error></ErrorResponse>",
            ))
        });

        let config = TenantAccountConfig::new(ROLE, "eu-west-1", "noreply@tenant.example");
        let error = resolver(transport).resolve(&config).await.err().unwrap();
        assert_eq!(error.kind(), ErrorKind::Credential);
        assert_eq!(error.error_code(), Some("AccessDenied"));
    }

    #[tokio::test]
    async fn test_resolve_invalid_region_makes_no_call() {
        let mut transport = MockHttpTransport::new();
        transport.expect_send().times(0);

        let config = TenantAccountConfig::new(ROLE, "Mars-1", "noreply@tenant.example");
        let error = resolver(transport).resolve(&config).await.err().unwrap();
        assert!(matches!(
            error,
            SesError::Credential {
                source: CredentialError::Invalid { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_resolve_sts_endpoint_override() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .withf(|request| request.url.as_str() == "http://localhost:4566/")
            .times(1)
            .returning(|_| Ok(respond(200, ASSUMED)));

        let config = RouterConfig::builder()
            .sts_endpoint("http://localhost:4566")
            .build()
            .unwrap();
        let resolver = AssumeRoleResolver::with_transport(
            Arc::new(StaticCredentialProvider::from_keys("AKIDBASE", "BASESECRET")),
            Arc::new(transport),
            config,
        );

        let tenant = TenantAccountConfig::new(ROLE, "us-east-1", "noreply@tenant.example");
        assert!(resolver.resolve(&tenant).await.is_ok());
    }
}
