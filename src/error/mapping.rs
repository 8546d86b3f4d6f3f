//! Decoding of AWS error bodies into [`SesError`] values.
//!
//! SES v2 answers with JSON:
//!
//! ```json
//! {
//!   "__type": "MessageRejected",
//!   "message": "Email address is not verified",
//!   "requestId": "abc-123-def-456"
//! }
//! ```
//!
//! STS answers with the Query API XML envelope:
//!
//! ```xml
//! <ErrorResponse>
//!   <Error><Type>Sender</Type><Code>AccessDenied</Code><Message>...</Message></Error>
//!   <RequestId>...</RequestId>
//! </ErrorResponse>
//! ```

use super::SesError;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

/// AWS error response structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AwsErrorResponse {
    /// The AWS error code, namespace prefix stripped.
    ///
    /// SES v2 usually carries the code in the `x-amzn-ErrorType` header and
    /// leaves this empty; see [`AwsErrorResponse::with_header_error_type`].
    #[serde(alias = "__type", alias = "Type", alias = "code", alias = "Code", default)]
    pub error_type: String,

    /// Human-readable error message.
    #[serde(alias = "Message", default)]
    pub message: String,

    /// AWS request id.
    #[serde(
        alias = "requestId",
        alias = "RequestId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub request_id: Option<String>,
}

impl AwsErrorResponse {
    /// Fill the error type from the `x-amzn-ErrorType` header when the body
    /// did not carry one.
    pub fn with_header_error_type(mut self, header: Option<&str>) -> Self {
        if self.error_type.is_empty() {
            if let Some(value) = header {
                self.error_type = normalize_error_type(value);
            }
        }
        self
    }

    /// Convert into a [`SesError::Provider`], preferring the request id from
    /// the response headers when the body has none.
    pub fn into_provider_error(self, status: u16, header_request_id: Option<&str>) -> SesError {
        SesError::Provider {
            code: self.error_type,
            message: self.message,
            request_id: self
                .request_id
                .or_else(|| header_request_id.map(|s| s.to_string())),
            status: Some(status),
        }
    }
}

/// Parse an SES v2 JSON error body.
///
/// Namespace prefixes such as `com.amazon.coral.service#MessageRejected`
/// are stripped from the error type.
///
/// # Examples
///
/// ```rust
/// use integrations_aws_ses_router::error::parse_error_response;
///
/// let json = r#"{"__type": "com.amazon.coral.service#MessageRejected", "message": "Invalid"}"#;
/// let error = parse_error_response(json).unwrap();
/// assert_eq!(error.error_type, "MessageRejected");
/// ```
pub fn parse_error_response(body: &str) -> Result<AwsErrorResponse, SesError> {
    let mut response: AwsErrorResponse = serde_json::from_str(body)?;
    response.error_type = normalize_error_type(&response.error_type);
    Ok(response)
}

/// Strip the namespace prefix and the `:http://internal...` suffix AWS
/// attaches to error types.
fn normalize_error_type(raw: &str) -> String {
    let without_suffix = raw.split(':').next().unwrap_or(raw);
    match without_suffix.rfind('#') {
        Some(hash_pos) => without_suffix[hash_pos + 1..].to_string(),
        None => without_suffix.to_string(),
    }
}

/// Parse an STS XML error body.
pub fn parse_sts_error_response(body: &str) -> Result<AwsErrorResponse, SesError> {
    let mut reader = Reader::from_str(body);
    reader.trim_text(true);

    let mut code = String::new();
    let mut message = String::new();
    let mut request_id = None;
    let mut current_element = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                current_element = String::from_utf8_lossy(e.name().as_ref()).to_string();
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                match current_element.as_str() {
                    "Code" => code = text,
                    "Message" => message = text,
                    "RequestId" => request_id = Some(text),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current_element.clear(),
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SesError::Serialization {
                    message: format!("Failed to parse STS error response: {}", e),
                })
            }
            _ => {}
        }
    }

    if code.is_empty() {
        return Err(SesError::Serialization {
            message: "STS error response has no Code element".to_string(),
        });
    }

    Ok(AwsErrorResponse {
        error_type: code,
        message,
        request_id,
    })
}

/// Build a provider error for an unsuccessful SES response whose body could
/// not be decoded.
pub(crate) fn unknown_provider_error(
    status: u16,
    body: &[u8],
    request_id: Option<&str>,
) -> SesError {
    let code = match status {
        400 => "BadRequest",
        403 => "AccessDenied",
        404 => "NotFound",
        429 => "TooManyRequests",
        500..=599 => "InternalFailure",
        _ => "Unknown",
    };

    SesError::Provider {
        code: code.to_string(),
        message: String::from_utf8_lossy(body).into_owned(),
        request_id: request_id.map(|s| s.to_string()),
        status: Some(status),
    }
}
