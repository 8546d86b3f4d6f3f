//! STS `AssumeRole` exchange.

use super::{AwsCredentials, CredentialProvider};
use crate::credentials::error::CredentialError;
use crate::error::parse_sts_error_response;
use crate::signing::{RequestSigner, STS_SERVICE};
use crate::transport::{HttpRequest, HttpTransport};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::header::{HeaderValue, CONTENT_TYPE};
use http::Method;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::{form_urlencoded, Url};

const STS_API_VERSION: &str = "2011-06-15";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssumeRoleResponse {
    assume_role_result: AssumeRoleResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssumeRoleResult {
    credentials: StsCredentials,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StsCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
    expiration: String,
}

impl fmt::Debug for StsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("expiration", &self.expiration)
            .finish_non_exhaustive()
    }
}

/// Exchanges a base identity for temporary credentials scoped to one role.
///
/// Every call performs a fresh exchange; wrap it in a
/// [`CachedCredentialProvider`](super::CachedCredentialProvider) to reuse the
/// credentials until shortly before they expire.
#[derive(Clone)]
pub struct AssumeRoleCredentialProvider {
    base: Arc<dyn CredentialProvider>,
    transport: Arc<dyn HttpTransport>,
    role_arn: String,
    endpoint: String,
    session_name: String,
    duration: Duration,
    signer: RequestSigner,
}

impl AssumeRoleCredentialProvider {
    /// Create a provider assuming `role_arn` in `region`, signing the STS call
    /// with credentials from `base`.
    pub fn new(
        base: Arc<dyn CredentialProvider>,
        transport: Arc<dyn HttpTransport>,
        role_arn: impl Into<String>,
        region: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            base,
            transport,
            role_arn: role_arn.into(),
            endpoint: endpoint.into(),
            session_name: crate::config::DEFAULT_ROLE_SESSION_NAME.to_string(),
            duration: crate::config::DEFAULT_ASSUME_ROLE_DURATION,
            signer: RequestSigner::new(region, STS_SERVICE),
        }
    }

    /// Set the `RoleSessionName`.
    pub fn with_session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = name.into();
        self
    }

    /// Set the requested `DurationSeconds`.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// The role being assumed.
    pub fn role_arn(&self) -> &str {
        &self.role_arn
    }

    /// The STS region.
    pub fn region(&self) -> &str {
        self.signer.region()
    }

    fn build_request(&self) -> Result<HttpRequest, CredentialError> {
        let url = Url::parse(&format!("{}/", self.endpoint.trim_end_matches('/'))).map_err(|e| {
            CredentialError::Invalid {
                message: format!("STS endpoint {:?}: {}", self.endpoint, e),
            }
        })?;

        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("Action", "AssumeRole")
            .append_pair("Version", STS_API_VERSION)
            .append_pair("RoleArn", &self.role_arn)
            .append_pair("RoleSessionName", &self.session_name)
            .append_pair("DurationSeconds", &self.duration.as_secs().to_string())
            .finish();

        Ok(HttpRequest::new(Method::POST, url)
            .with_header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded; charset=utf-8"),
            )
            .with_body(body))
    }

    fn failure(&self, code: impl Into<String>, message: impl Into<String>) -> CredentialError {
        CredentialError::AssumeRoleFailed {
            role_arn: self.role_arn.clone(),
            code: code.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for AssumeRoleCredentialProvider {
    async fn credentials(&self) -> Result<AwsCredentials, CredentialError> {
        let base = self.base.credentials().await?;

        let mut request = self.build_request()?;
        self.signer
            .sign(&mut request, &base, &Utc::now())
            .map_err(|e| CredentialError::Invalid {
                message: e.to_string(),
            })?;

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| CredentialError::Transport {
                message: e.to_string(),
            })?;

        if !response.is_success() {
            let body = response.body_str();
            let error = match parse_sts_error_response(&body) {
                Ok(parsed) => self.failure(parsed.error_type, parsed.message),
                Err(_) => self.failure(format!("HTTP{}", response.status), body.into_owned()),
            };
            warn!(
                role_arn = %self.role_arn,
                status = response.status,
                error = %error,
                "AssumeRole rejected"
            );
            return Err(error);
        }

        let parsed: AssumeRoleResponse = quick_xml::de::from_str(&response.body_str())
            .map_err(|e| self.failure("MalformedResponse", e.to_string()))?;
        let creds = parsed.assume_role_result.credentials;

        let expiration = DateTime::parse_from_rfc3339(&creds.expiration)
            .map_err(|e| {
                self.failure(
                    "MalformedResponse",
                    format!("Expiration {:?}: {}", creds.expiration, e),
                )
            })?
            .with_timezone(&Utc);

        debug!(
            role_arn = %self.role_arn,
            region = self.signer.region(),
            expiration = %expiration,
            "Assumed role"
        );

        Ok(AwsCredentials::new(creds.access_key_id, creds.secret_access_key)
            .with_session_token(creds.session_token)
            .with_expiration(expiration))
    }

    fn name(&self) -> &'static str {
        "assume-role"
    }
}

impl fmt::Debug for AssumeRoleCredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssumeRoleCredentialProvider")
            .field("base", &self.base.name())
            .field("role_arn", &self.role_arn)
            .field("region", &self.signer.region())
            .field("endpoint", &self.endpoint)
            .field("session_name", &self.session_name)
            .field("duration", &self.duration)
            .finish()
    }
}
