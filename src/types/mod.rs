//! Value types: tenant configuration, attachments and outbound messages.

mod attachment;
mod email;
mod tenant;

pub use attachment::{EmailAttachment, FileContentType};
pub use email::{
    Body, Content, Destination, EmailContent, Message, RawEmail, RawMessage, SendEmailRequest,
    SendEmailResponse, SimpleEmail,
};
pub use tenant::{validate_email_address, TenantAccountConfig, DEFAULT_REGION};
