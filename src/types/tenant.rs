//! Tenant account configuration.

use crate::error::{SesError, SesResult};
use serde::{Deserialize, Serialize};

/// Region used by [`TenantAccountConfig::with_default_region`].
pub const DEFAULT_REGION: &str = "ap-southeast-1";

/// Where and as whom a tenant sends mail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantAccountConfig {
    /// IAM role assumed for this tenant's sends.
    pub role_arn: String,
    /// SES region.
    pub region: String,
    /// `From` address for every message sent as this tenant.
    pub default_sender: String,
}

impl TenantAccountConfig {
    /// Create a configuration.
    pub fn new(
        role_arn: impl Into<String>,
        region: impl Into<String>,
        default_sender: impl Into<String>,
    ) -> Self {
        Self {
            role_arn: role_arn.into(),
            region: region.into(),
            default_sender: default_sender.into(),
        }
    }

    /// Create a configuration in [`DEFAULT_REGION`].
    pub fn with_default_region(
        role_arn: impl Into<String>,
        default_sender: impl Into<String>,
    ) -> Self {
        Self::new(role_arn, DEFAULT_REGION, default_sender)
    }

    /// Check that every field is present and the sender is an address.
    ///
    /// # Errors
    ///
    /// [`SesError::InvalidArgument`] naming the first offending field.
    pub fn validate(&self) -> SesResult<()> {
        if self.role_arn.trim().is_empty() {
            return Err(SesError::invalid_argument("role_arn", "must not be empty"));
        }
        if self.region.trim().is_empty() {
            return Err(SesError::invalid_argument("region", "must not be empty"));
        }
        if self.default_sender.trim().is_empty() {
            return Err(SesError::invalid_argument(
                "default_sender",
                "must not be empty",
            ));
        }
        validate_email_address(&self.default_sender)
            .map_err(|message| SesError::invalid_argument("default_sender", message))
    }
}

/// Validate a mailbox: `user@example.com` or `Name <user@example.com>`.
///
/// ```
/// use integrations_aws_ses_router::types::validate_email_address;
///
/// assert!(validate_email_address("noreply@example.com").is_ok());
/// assert!(validate_email_address("Billing <billing@example.com>").is_ok());
/// assert!(validate_email_address("not-an-address").is_err());
/// ```
pub fn validate_email_address(mailbox: &str) -> Result<(), String> {
    if mailbox.chars().any(|c| c.is_control()) {
        return Err("mailbox contains control characters".to_string());
    }

    let address = match (mailbox.rfind('<'), mailbox.ends_with('>')) {
        (Some(open), true) => &mailbox[open + 1..mailbox.len() - 1],
        (None, false) => mailbox,
        _ => return Err("unbalanced angle brackets".to_string()),
    };

    if address.len() > 254 {
        return Err("address too long (max 254 characters)".to_string());
    }
    if address.chars().any(char::is_whitespace) {
        return Err("address contains whitespace".to_string());
    }

    let (local, domain) = match address.split_once('@') {
        Some((local, domain)) if !domain.contains('@') => (local, domain),
        _ => return Err("address must contain exactly one @".to_string()),
    };

    if local.is_empty() || local.len() > 64 {
        return Err("local part must be 1-64 characters".to_string());
    }
    if domain.is_empty()
        || domain.starts_with('.')
        || domain.ends_with('.')
        || domain.contains("..")
    {
        return Err("invalid domain".to_string());
    }

    Ok(())
}
