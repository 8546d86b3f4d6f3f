//! Router configuration.
//!
//! [`RouterConfig`] carries the transport and credential settings shared by
//! every tenant client the router creates:
//!
//! - request and connect timeouts for the HTTP client
//! - endpoint overrides for SES and STS (LocalStack, tests)
//! - the STS role session name and requested credential lifetime
//! - how early temporary credentials are refreshed
//!
//! Per-tenant settings live in [`TenantAccountConfig`](crate::types::TenantAccountConfig).

use std::time::Duration;
use url::Url;

pub mod error;

pub use error::ConfigError;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default STS role session name.
pub const DEFAULT_ROLE_SESSION_NAME: &str = "ses-router";

/// Default lifetime requested for assumed-role credentials.
pub const DEFAULT_ASSUME_ROLE_DURATION: Duration = Duration::from_secs(3600);

/// Default refresh buffer for temporary credentials.
pub const DEFAULT_REFRESH_BUFFER: Duration = Duration::from_secs(300);

const MIN_ASSUME_ROLE_SECS: u64 = 900;
const MAX_ASSUME_ROLE_SECS: u64 = 43_200;

/// Environment variable for the request timeout, in seconds.
pub const ENV_TIMEOUT_SECS: &str = "SES_ROUTER_TIMEOUT_SECS";
/// Environment variable for the SES endpoint override.
pub const ENV_SES_ENDPOINT: &str = "SES_ROUTER_SES_ENDPOINT";
/// Environment variable for the STS endpoint override.
pub const ENV_STS_ENDPOINT: &str = "SES_ROUTER_STS_ENDPOINT";
/// Environment variable for the STS role session name.
pub const ENV_ROLE_SESSION_NAME: &str = "SES_ROUTER_ROLE_SESSION_NAME";

/// Settings shared by all tenant clients.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Total timeout for one HTTP request.
    pub timeout: Duration,
    /// Timeout for establishing a connection.
    pub connect_timeout: Duration,
    /// SES endpoint override; `https://email.{region}.amazonaws.com` when unset.
    pub ses_endpoint: Option<String>,
    /// STS endpoint override; `https://sts.{region}.amazonaws.com` when unset.
    pub sts_endpoint: Option<String>,
    /// `RoleSessionName` sent with every AssumeRole call.
    pub role_session_name: String,
    /// Requested lifetime of assumed-role credentials.
    pub assume_role_duration: Duration,
    /// Refresh temporary credentials this long before they expire.
    pub credential_refresh_buffer: Duration,
    /// User-Agent header for outgoing requests.
    pub user_agent: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            ses_endpoint: None,
            sts_endpoint: None,
            role_session_name: DEFAULT_ROLE_SESSION_NAME.to_string(),
            assume_role_duration: DEFAULT_ASSUME_ROLE_DURATION,
            credential_refresh_buffer: DEFAULT_REFRESH_BUFFER,
            user_agent: default_user_agent(),
        }
    }
}

fn default_user_agent() -> String {
    format!("integrations-aws-ses-router/{}", env!("CARGO_PKG_VERSION"))
}

impl RouterConfig {
    /// Start a builder with default values.
    pub fn builder() -> RouterConfigBuilder {
        RouterConfigBuilder::default()
    }

    /// Build a configuration from `SES_ROUTER_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::Environment {
                variable: ENV_TIMEOUT_SECS.to_string(),
                message: format!("expected a number of seconds, got {:?}", raw),
            })?;
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(endpoint) = lookup(ENV_SES_ENDPOINT) {
            builder = builder.ses_endpoint(endpoint);
        }
        if let Some(endpoint) = lookup(ENV_STS_ENDPOINT) {
            builder = builder.sts_endpoint(endpoint);
        }
        if let Some(name) = lookup(ENV_ROLE_SESSION_NAME) {
            builder = builder.role_session_name(name);
        }

        builder.build()
    }

    /// SES endpoint for `region`.
    pub fn ses_endpoint_for(&self, region: &str) -> String {
        self.ses_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://email.{}.amazonaws.com", region))
    }

    /// STS endpoint for `region`.
    pub fn sts_endpoint_for(&self, region: &str) -> String {
        self.sts_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://sts.{}.amazonaws.com", region))
    }
}

/// Builder for [`RouterConfig`].
#[derive(Debug, Default)]
pub struct RouterConfigBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    ses_endpoint: Option<String>,
    sts_endpoint: Option<String>,
    role_session_name: Option<String>,
    assume_role_duration: Option<Duration>,
    credential_refresh_buffer: Option<Duration>,
    user_agent: Option<String>,
}

impl RouterConfigBuilder {
    /// Total request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Send SES requests to `endpoint` instead of the regional default.
    pub fn ses_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.ses_endpoint = Some(endpoint.into());
        self
    }

    /// Send STS requests to `endpoint` instead of the regional default.
    pub fn sts_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.sts_endpoint = Some(endpoint.into());
        self
    }

    /// Role session name used for AssumeRole.
    pub fn role_session_name(mut self, name: impl Into<String>) -> Self {
        self.role_session_name = Some(name.into());
        self
    }

    /// Requested lifetime of assumed-role credentials (15 minutes to 12 hours).
    pub fn assume_role_duration(mut self, duration: Duration) -> Self {
        self.assume_role_duration = Some(duration);
        self
    }

    /// How long before expiry temporary credentials are refreshed.
    pub fn credential_refresh_buffer(mut self, buffer: Duration) -> Self {
        self.credential_refresh_buffer = Some(buffer);
        self
    }

    /// User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Validate and build.
    pub fn build(self) -> Result<RouterConfig, ConfigError> {
        let defaults = RouterConfig::default();

        let timeout = self.timeout.unwrap_or(defaults.timeout);
        if timeout.is_zero() {
            return Err(invalid("timeout", "must be greater than zero"));
        }

        let connect_timeout = self.connect_timeout.unwrap_or(defaults.connect_timeout);
        if connect_timeout.is_zero() {
            return Err(invalid("connect_timeout", "must be greater than zero"));
        }

        for (field, endpoint) in [
            ("ses_endpoint", &self.ses_endpoint),
            ("sts_endpoint", &self.sts_endpoint),
        ] {
            if let Some(endpoint) = endpoint {
                validate_endpoint(field, endpoint)?;
            }
        }

        let role_session_name = self
            .role_session_name
            .unwrap_or(defaults.role_session_name);
        validate_session_name(&role_session_name)?;

        let assume_role_duration = self
            .assume_role_duration
            .unwrap_or(defaults.assume_role_duration);
        let secs = assume_role_duration.as_secs();
        if !(MIN_ASSUME_ROLE_SECS..=MAX_ASSUME_ROLE_SECS).contains(&secs) {
            return Err(invalid(
                "assume_role_duration",
                format!(
                    "must be between {} and {} seconds, got {}",
                    MIN_ASSUME_ROLE_SECS, MAX_ASSUME_ROLE_SECS, secs
                ),
            ));
        }

        let credential_refresh_buffer = self
            .credential_refresh_buffer
            .unwrap_or(defaults.credential_refresh_buffer);
        if credential_refresh_buffer >= assume_role_duration {
            return Err(invalid(
                "credential_refresh_buffer",
                "must be shorter than assume_role_duration",
            ));
        }

        Ok(RouterConfig {
            timeout,
            connect_timeout,
            ses_endpoint: self.ses_endpoint.map(trim_trailing_slash),
            sts_endpoint: self.sts_endpoint.map(trim_trailing_slash),
            role_session_name,
            assume_role_duration,
            credential_refresh_buffer,
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
        })
    }
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        message: message.into(),
    }
}

fn trim_trailing_slash(endpoint: String) -> String {
    endpoint.trim_end_matches('/').to_string()
}

fn validate_endpoint(field: &str, endpoint: &str) -> Result<(), ConfigError> {
    let url = Url::parse(endpoint).map_err(|e| invalid(field, e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(field, format!("unsupported scheme {:?}", other))),
    }
    if url.host_str().is_none() {
        return Err(invalid(field, "missing host"));
    }
    Ok(())
}

// STS accepts 2-64 characters from [\w+=,.@-].
fn validate_session_name(name: &str) -> Result<(), ConfigError> {
    if !(2..=64).contains(&name.len()) {
        return Err(invalid("role_session_name", "must be 2 to 64 characters"));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || "_+=,.@-".contains(c);
    if !name.chars().all(allowed) {
        return Err(invalid(
            "role_session_name",
            format!("contains characters outside [\\w+=,.@-]: {:?}", name),
        ));
    }
    Ok(())
}
