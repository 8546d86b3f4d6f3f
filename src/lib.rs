//! Multi-tenant email dispatch through AWS SES.
//!
//! A [`TenantRouter`] maps opaque tenant ids to SES clients that each run
//! under their own assumed IAM role, so one tenant can never send with
//! another's permissions or sender address. Sends are either structured
//! (`send_simple`) or raw multipart MIME built by [`mime::build_raw`]
//! (`send_rich`, with attachments).
//!
//! # Features
//!
//! - Per-tenant STS `AssumeRole` credentials, cached and refreshed before
//!   expiry
//! - Registry safe for concurrent registration, lookup and send; the lock is
//!   never held across a network call
//! - `multipart/mixed` + `multipart/alternative` MIME with base64 attachments
//! - AWS Signature V4 signing with no AWS SDK dependency
//! - Closed error taxonomy ([`ErrorKind`])
//!
//! # Example
//!
//! ```no_run
//! use integrations_aws_ses_router::{
//!     AssumeRoleResolver, EmailAttachment, RouterConfig, TenantAccountConfig, TenantRouter,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = AssumeRoleResolver::new(RouterConfig::default())?;
//! let router = TenantRouter::with_tenants(
//!     Arc::new(resolver),
//!     vec![(
//!         "GS".to_string(),
//!         TenantAccountConfig::with_default_region(
//!             "arn:aws:iam::123456789012:role/gs-mailer",
//!             "noreply@gs.example.com",
//!         ),
//!     )],
//! )
//! .await?;
//!
//! router
//!     .send_rich(
//!         "GS",
//!         &["customer@example.com".to_string()],
//!         "Monthly report",
//!         "Your report is attached.",
//!         "",
//!         &[EmailAttachment::from_filename("report.csv", b"a,b\n1,2\n".to_vec())],
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod credentials;
mod dispatch;
pub mod error;
pub mod mime;
pub mod mocks;
pub mod provider;
pub mod resolver;
pub mod router;
pub mod signing;
pub mod transport;
pub mod types;

pub use config::{ConfigError, RouterConfig, RouterConfigBuilder};
pub use credentials::{AwsCredentials, CredentialError, CredentialProvider};
pub use error::{BatchRegistrationError, ErrorKind, SesError, SesResult};
pub use provider::{MailProvider, SesMailClient};
pub use resolver::{AssumeRoleResolver, CredentialResolver};
pub use router::{TenantRouter, TenantSender};
pub use types::{EmailAttachment, FileContentType, TenantAccountConfig};
