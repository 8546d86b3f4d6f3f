//! Outbound email values and their SES v2 wire form.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize, Serializer};

/// A structured message sent through the provider's simple-send operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleEmail {
    /// `From` address.
    pub from: String,
    /// Recipients.
    pub to: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub text: String,
    /// HTML body.
    pub html: String,
}

/// A fully formed MIME message sent through the raw-send operation.
#[derive(Clone, PartialEq, Eq)]
pub struct RawEmail {
    /// Envelope sender.
    pub from: String,
    /// Envelope recipients.
    pub to: Vec<String>,
    /// The serialized MIME message.
    pub data: Vec<u8>,
}

impl std::fmt::Debug for RawEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawEmail")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("size", &self.data.len())
            .finish()
    }
}

/// `SendEmail` request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SendEmailRequest {
    /// Sender address.
    pub from_email_address: String,
    /// Recipients.
    pub destination: Destination,
    /// Message content.
    pub content: EmailContent,
}

/// Recipient list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Destination {
    /// `To` recipients.
    pub to_addresses: Vec<String>,
}

/// Either a structured or a raw message.
#[derive(Debug, Clone, Serialize)]
pub enum EmailContent {
    /// Provider-rendered message.
    Simple(Message),
    /// Caller-built MIME message.
    Raw(RawMessage),
}

/// Structured message content.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Message {
    /// Subject line.
    pub subject: Content,
    /// Text and HTML bodies.
    pub body: Body,
}

/// Message bodies.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Body {
    /// Plain-text body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Content>,
    /// HTML body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<Content>,
}

/// A string with its charset.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Content {
    /// The text.
    pub data: String,
    /// Always `UTF-8`.
    pub charset: &'static str,
}

impl Content {
    /// UTF-8 content.
    pub fn utf8(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            charset: "UTF-8",
        }
    }
}

/// Raw MIME bytes, base64-encoded on the wire.
#[derive(Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawMessage {
    /// The MIME message.
    #[serde(serialize_with = "serialize_base64")]
    pub data: Vec<u8>,
}

impl std::fmt::Debug for RawMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawMessage")
            .field("size", &self.data.len())
            .finish()
    }
}

fn serialize_base64<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(data))
}

/// `SendEmail` response body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SendEmailResponse {
    /// Message id assigned by SES.
    pub message_id: String,
}

impl From<&SimpleEmail> for SendEmailRequest {
    fn from(email: &SimpleEmail) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| Content::utf8(s));
        SendEmailRequest {
            from_email_address: email.from.clone(),
            destination: Destination {
                to_addresses: email.to.clone(),
            },
            content: EmailContent::Simple(Message {
                subject: Content::utf8(email.subject.as_str()),
                body: Body {
                    text: non_empty(&email.text),
                    html: non_empty(&email.html),
                },
            }),
        }
    }
}

impl From<&RawEmail> for SendEmailRequest {
    fn from(email: &RawEmail) -> Self {
        SendEmailRequest {
            from_email_address: email.from.clone(),
            destination: Destination {
                to_addresses: email.to.clone(),
            },
            content: EmailContent::Raw(RawMessage {
                data: email.data.clone(),
            }),
        }
    }
}
