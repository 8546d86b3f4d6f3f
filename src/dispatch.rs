//! Send operations on [`TenantRouter`].

use crate::error::{SesError, SesResult};
use crate::mime::build_raw;
use crate::router::TenantRouter;
use crate::types::{validate_email_address, EmailAttachment, RawEmail, SimpleEmail};
use tracing::{debug, info, warn};

impl TenantRouter {
    /// Send a structured message as `tenant_id`.
    ///
    /// `body` is used as both the text and the HTML content and is forwarded
    /// as given, including when empty. The message is sent from the tenant's
    /// default sender.
    ///
    /// # Errors
    ///
    /// - [`SesError::TenantNotFound`] if the tenant is not registered; no
    ///   request is made.
    /// - [`SesError::InvalidArgument`] for an empty or malformed recipient.
    /// - Provider and transport errors, unchanged.
    pub async fn send_simple(
        &self,
        tenant_id: &str,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> SesResult<String> {
        let sender = self.sender(tenant_id)?;

        if recipient.trim().is_empty() {
            return Err(SesError::invalid_argument("recipient", "must not be empty"));
        }
        validate_email_address(recipient)
            .map_err(|message| SesError::invalid_argument("recipient", message))?;

        let email = SimpleEmail {
            from: sender.default_sender().to_string(),
            to: vec![recipient.to_string()],
            subject: subject.to_string(),
            text: body.to_string(),
            html: body.to_string(),
        };

        let message_id = sender.client().send_simple(&email).await.map_err(|e| {
            warn!(tenant_id, error = %e, "Simple send failed");
            e
        })?;

        info!(tenant_id, recipients = 1, message_id = %message_id, "Sent simple email");
        Ok(message_id)
    }

    /// Send a multipart message with attachments as `tenant_id`.
    ///
    /// The MIME message is assembled with [`build_raw`] using the tenant's
    /// default sender and forwarded as a raw send. An empty `html_body` is
    /// replaced by the escaped text body.
    ///
    /// # Errors
    ///
    /// - [`SesError::TenantNotFound`] if the tenant is not registered.
    /// - Any error of [`build_raw`]; nothing is sent.
    /// - Provider and transport errors, unchanged.
    pub async fn send_rich(
        &self,
        tenant_id: &str,
        recipients: &[String],
        subject: &str,
        text_body: &str,
        html_body: &str,
        attachments: &[EmailAttachment],
    ) -> SesResult<String> {
        let sender = self.sender(tenant_id)?;

        let data = build_raw(
            recipients,
            subject,
            text_body,
            html_body,
            attachments,
            sender.default_sender(),
        )?;

        debug!(
            tenant_id,
            size = data.len(),
            attachments = attachments.len(),
            "Built MIME message"
        );

        let email = RawEmail {
            from: sender.default_sender().to_string(),
            to: recipients.to_vec(),
            data,
        };

        let message_id = sender.client().send_raw(&email).await.map_err(|e| {
            warn!(tenant_id, error = %e, "Raw send failed");
            e
        })?;

        info!(
            tenant_id,
            recipients = recipients.len(),
            attachments = attachments.len(),
            message_id = %message_id,
            "Sent raw email"
        );
        Ok(message_id)
    }
}
