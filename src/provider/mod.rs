//! The remote mail provider.
//!
//! [`MailProvider`] is what a tenant's client looks like to the router.
//! [`SesMailClient`] implements it against the SES v2 `SendEmail` API.

use crate::config::RouterConfig;
use crate::credentials::CredentialProvider;
use crate::error::{parse_error_response, unknown_provider_error, SesError, SesResult};
use crate::signing::{RequestSigner, SES_SERVICE};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
use crate::types::{RawEmail, SendEmailRequest, SendEmailResponse, SimpleEmail};
use async_trait::async_trait;
use chrono::Utc;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::Method;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

const SEND_EMAIL_PATH: &str = "/v2/email/outbound-emails";

/// Sends mail on behalf of one identity.
///
/// Implementations are shared across tasks and must be safe for concurrent
/// use. Errors are returned as-is; nothing is retried.
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Send a structured message; returns the provider message id.
    async fn send_simple(&self, email: &SimpleEmail) -> SesResult<String>;

    /// Send a fully formed MIME message; returns the provider message id.
    async fn send_raw(&self, email: &RawEmail) -> SesResult<String>;
}

/// SES v2 client bound to one region and one set of credentials.
#[derive(Clone)]
pub struct SesMailClient {
    transport: Arc<dyn HttpTransport>,
    credentials: Arc<dyn CredentialProvider>,
    signer: RequestSigner,
    endpoint: String,
}

impl SesMailClient {
    /// Create a client with its own HTTP transport.
    ///
    /// This is the single-tenant path: pass the host's default identity as
    /// `credentials` and no role exchange takes place.
    ///
    /// ```no_run
    /// use integrations_aws_ses_router::config::RouterConfig;
    /// use integrations_aws_ses_router::credentials::DefaultCredentialProvider;
    /// use integrations_aws_ses_router::provider::{MailProvider, SesMailClient};
    /// use integrations_aws_ses_router::types::SimpleEmail;
    /// use std::sync::Arc;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = SesMailClient::new(
    ///     "eu-west-1",
    ///     Arc::new(DefaultCredentialProvider::new()),
    ///     &RouterConfig::default(),
    /// )?;
    ///
    /// let message_id = client
    ///     .send_simple(&SimpleEmail {
    ///         from: "noreply@example.com".to_string(),
    ///         to: vec!["user@example.com".to_string()],
    ///         subject: "Hello".to_string(),
    ///         text: "Hi".to_string(),
    ///         html: "Hi".to_string(),
    ///     })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(
        region: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
        config: &RouterConfig,
    ) -> SesResult<Self> {
        let transport = Arc::new(ReqwestTransport::new(config)?);
        Ok(Self::with_transport(region, credentials, transport, config))
    }

    /// Create a client sharing an existing transport.
    pub fn with_transport(
        region: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
        transport: Arc<dyn HttpTransport>,
        config: &RouterConfig,
    ) -> Self {
        let region = region.into();
        Self {
            transport,
            credentials,
            endpoint: config.ses_endpoint_for(&region),
            signer: RequestSigner::new(region, SES_SERVICE),
        }
    }

    /// The SES region.
    pub fn region(&self) -> &str {
        self.signer.region()
    }

    /// The SES endpoint requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send_email(&self, request: &SendEmailRequest) -> SesResult<String> {
        let url = Url::parse(&format!("{}{}", self.endpoint, SEND_EMAIL_PATH)).map_err(|e| {
            SesError::Transport {
                message: format!("Invalid SES endpoint {:?}", self.endpoint),
                source: Some(Box::new(e)),
            }
        })?;
        let body = serde_json::to_vec(request)?;

        let credentials = self.credentials.credentials().await?;

        let mut http_request = HttpRequest::new(Method::POST, url)
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(body);
        self.signer
            .sign(&mut http_request, &credentials, &Utc::now())?;

        let response = self.transport.send(http_request).await?;

        if !response.is_success() {
            let error = decode_error(&response);
            warn!(
                region = self.region(),
                status = response.status,
                code = error.error_code().unwrap_or_default(),
                request_id = error.request_id().unwrap_or_default(),
                "SES rejected send"
            );
            return Err(error);
        }

        let decoded: SendEmailResponse = serde_json::from_slice(&response.body)?;
        Ok(decoded.message_id)
    }
}

fn decode_error(response: &HttpResponse) -> SesError {
    let request_id = response.request_id();

    match parse_error_response(&response.body_str()) {
        Ok(parsed) => {
            let parsed = parsed.with_header_error_type(response.header("x-amzn-errortype"));
            if parsed.error_type.is_empty() {
                let request_id = parsed.request_id.as_deref().or(request_id);
                unknown_provider_error(response.status, parsed.message.as_bytes(), request_id)
            } else {
                parsed.into_provider_error(response.status, request_id)
            }
        }
        Err(_) => unknown_provider_error(response.status, &response.body, request_id),
    }
}

#[async_trait]
impl MailProvider for SesMailClient {
    async fn send_simple(&self, email: &SimpleEmail) -> SesResult<String> {
        debug!(
            region = self.region(),
            recipients = email.to.len(),
            "Sending simple email"
        );
        self.send_email(&SendEmailRequest::from(email)).await
    }

    async fn send_raw(&self, email: &RawEmail) -> SesResult<String> {
        debug!(
            region = self.region(),
            recipients = email.to.len(),
            size = email.data.len(),
            "Sending raw email"
        );
        self.send_email(&SendEmailRequest::from(email)).await
    }
}

impl fmt::Debug for SesMailClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SesMailClient")
            .field("region", &self.signer.region())
            .field("endpoint", &self.endpoint)
            .field("credentials", &self.credentials.name())
            .finish_non_exhaustive()
    }
}
