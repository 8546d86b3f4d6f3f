//! Multipart MIME assembly for raw sends.
//!
//! [`build_raw`] produces this structure:
//!
//! ```text
//! From / To / Subject / MIME-Version / Content-Type: multipart/mixed
//! +- multipart/alternative
//! |  +- text/plain; charset=UTF-8
//! |  +- text/html; charset=UTF-8
//! +- attachment 1 (base64)
//! +- attachment N (base64)
//! ```
//!
//! Lines end in CRLF and never exceed 998 characters. Text parts are
//! quoted-printable; attachments are base64 wrapped at 76 columns.

use crate::error::{SesError, SesResult};
use crate::types::{validate_email_address, EmailAttachment};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::RngCore;
use std::borrow::Cow;

const CRLF: &[u8] = b"\r\n";

/// Random bytes per boundary.
const BOUNDARY_ENTROPY_BYTES: usize = 24;

/// Base64 output line length.
const BASE64_LINE_LEN: usize = 76;

/// Raw UTF-8 bytes per RFC 2047 encoded word; keeps each word under 75 chars.
const ENCODED_WORD_MAX_BYTES: usize = 45;

/// Hard RFC 5322 line limit, CRLF excluded.
const MAX_LINE_LEN: usize = 998;

/// Header lines longer than this are folded.
const FOLD_AT: usize = 78;

/// RFC 2231 `attr-char` complement.
const RFC2231_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Build a complete `multipart/mixed` message.
///
/// An empty `html_body` is replaced by the HTML-escaped `text_body` inside
/// `<pre>`, so the message always carries both alternatives. The buffer is
/// returned whole or not at all.
///
/// # Errors
///
/// - [`SesError::EmptyBody`] if both bodies are empty
/// - [`SesError::InvalidArgument`] for an empty sender, no recipients, or a
///   malformed recipient address
/// - [`SesError::Encoding`] if a header value contains CR or LF, or a
///   header line cannot be kept within 998 characters
///
/// # Example
///
/// ```
/// use integrations_aws_ses_router::mime::build_raw;
/// use integrations_aws_ses_router::types::{EmailAttachment, FileContentType};
///
/// let raw = build_raw(
///     &["user@example.com".to_string()],
///     "Invoice",
///     "Your invoice is attached.",
///     "",
///     &[EmailAttachment::new("invoice.pdf", FileContentType::Pdf, b"%PDF".to_vec())],
///     "billing@tenant.example",
/// )
/// .unwrap();
///
/// let text = String::from_utf8(raw).unwrap();
/// assert!(text.starts_with("From: billing@tenant.example\r\nTo: user@example.com\r\n"));
/// assert!(text.contains("<pre>Your invoice is attached.</pre>"));
/// ```
pub fn build_raw(
    recipients: &[String],
    subject: &str,
    text_body: &str,
    html_body: &str,
    attachments: &[EmailAttachment],
    sender: &str,
) -> SesResult<Vec<u8>> {
    if text_body.is_empty() && html_body.is_empty() {
        return Err(SesError::EmptyBody);
    }
    if sender.trim().is_empty() {
        return Err(SesError::invalid_argument("sender", "must not be empty"));
    }
    if recipients.is_empty() {
        return Err(SesError::invalid_argument(
            "recipients",
            "at least one recipient is required",
        ));
    }
    for recipient in recipients {
        validate_email_address(recipient).map_err(|message| {
            SesError::invalid_argument("recipients", format!("{:?}: {}", recipient, message))
        })?;
    }

    let html_body: Cow<'_, str> = if html_body.is_empty() {
        Cow::Owned(format!("<pre>{}</pre>", escape_html(text_body)))
    } else {
        Cow::Borrowed(html_body)
    };

    let bodies = [text_body, html_body.as_ref()];
    let mixed = generate_boundary(&bodies);
    let alternative = loop {
        let candidate = generate_boundary(&bodies);
        if candidate != mixed {
            break candidate;
        }
    };

    let attachment_bytes: usize = attachments.iter().map(|a| a.data.len() * 4 / 3 + 256).sum();
    let mut out = Vec::with_capacity(text_body.len() + html_body.len() + attachment_bytes + 1024);

    write_header(&mut out, "From", sender)?;
    write_folded_header(&mut out, "To", &fold_address_list(recipients))?;
    write_folded_header(&mut out, "Subject", &encode_header("Subject", subject)?)?;
    write_header(&mut out, "MIME-Version", "1.0")?;
    write_header(
        &mut out,
        "Content-Type",
        &format!("multipart/mixed; boundary={}", mixed),
    )?;
    out.extend_from_slice(CRLF);

    // multipart/alternative: plain text first, HTML last
    open_part(&mut out, &mixed);
    write_header(
        &mut out,
        "Content-Type",
        &format!("multipart/alternative; boundary={}", alternative),
    )?;
    out.extend_from_slice(CRLF);

    open_part(&mut out, &alternative);
    write_text_part(&mut out, "text/plain; charset=UTF-8", text_body)?;

    open_part(&mut out, &alternative);
    write_text_part(&mut out, "text/html; charset=UTF-8", &html_body)?;

    close_multipart(&mut out, &alternative);
    out.extend_from_slice(CRLF);

    for attachment in attachments {
        open_part(&mut out, &mixed);
        write_attachment(&mut out, attachment)?;
        out.extend_from_slice(CRLF);
    }

    close_multipart(&mut out, &mixed);

    Ok(out)
}

/// Escape `& < > " '` the way HTML text content requires.
///
/// ```
/// use integrations_aws_ses_router::mime::escape_html;
///
/// assert_eq!(
///     escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
///     "&lt;a href=&#34;x&#34;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
/// );
/// ```
pub fn escape_html(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }

    let mut escaped = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// Random boundary that occurs in none of `bodies`.
///
/// The `_` keeps it outside the base64 alphabet, so attachment parts can
/// never contain it either.
pub(crate) fn generate_boundary(bodies: &[&str]) -> String {
    let mut rng = rand::thread_rng();
    let mut bytes = [0u8; BOUNDARY_ENTROPY_BYTES];
    loop {
        rng.fill_bytes(&mut bytes);
        let boundary = format!("----_Part_{}", hex::encode(bytes));
        if !bodies.iter().any(|body| body.contains(boundary.as_str())) {
            return boundary;
        }
    }
}

fn open_part(out: &mut Vec<u8>, boundary: &str) {
    out.extend_from_slice(b"--");
    out.extend_from_slice(boundary.as_bytes());
    out.extend_from_slice(CRLF);
}

fn close_multipart(out: &mut Vec<u8>, boundary: &str) {
    out.extend_from_slice(b"--");
    out.extend_from_slice(boundary.as_bytes());
    out.extend_from_slice(b"--");
    out.extend_from_slice(CRLF);
}

fn write_header(out: &mut Vec<u8>, name: &str, value: &str) -> SesResult<()> {
    if value.contains(['\r', '\n']) {
        return Err(SesError::Encoding {
            message: format!("{} header contains a line break", name),
        });
    }
    write_folded_header(out, name, value)
}

/// Write a header whose line breaks, if any, are folding produced by
/// [`encode_header`] or [`fold_address_list`].
fn write_folded_header(out: &mut Vec<u8>, name: &str, value: &str) -> SesResult<()> {
    let first_line = value.split("\r\n").next().unwrap_or_default();
    let too_long = name.len() + 2 + first_line.len() > MAX_LINE_LEN
        || value.split("\r\n").skip(1).any(|line| line.len() > MAX_LINE_LEN);
    if too_long {
        return Err(SesError::Encoding {
            message: format!("{} header exceeds {} characters", name, MAX_LINE_LEN),
        });
    }

    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b": ");
    out.extend_from_slice(value.as_bytes());
    out.extend_from_slice(CRLF);
    Ok(())
}

/// Comma-joined addresses, one per line once the header passes 78 columns.
fn fold_address_list(addresses: &[String]) -> String {
    let joined = addresses.join(",");
    if "To: ".len() + joined.len() <= FOLD_AT {
        joined
    } else {
        addresses.join(",\r\n ")
    }
}

/// Short printable ASCII passes through; anything else becomes RFC 2047
/// `B` encoded words, split on character boundaries and folded.
fn encode_header<'a>(name: &str, value: &'a str) -> SesResult<Cow<'a, str>> {
    if value.contains(['\r', '\n']) {
        return Err(SesError::Encoding {
            message: format!("{} header contains a line break", name),
        });
    }
    let printable = value.chars().all(|c| c.is_ascii() && !c.is_ascii_control());
    if printable && name.len() + 2 + value.len() <= FOLD_AT {
        return Ok(Cow::Borrowed(value));
    }

    let mut words = Vec::new();
    let mut chunk = String::new();
    for c in value.chars() {
        if chunk.len() + c.len_utf8() > ENCODED_WORD_MAX_BYTES {
            words.push(format!("=?UTF-8?B?{}?=", BASE64.encode(chunk.as_bytes())));
            chunk.clear();
        }
        chunk.push(c);
    }
    if !chunk.is_empty() {
        words.push(format!("=?UTF-8?B?{}?=", BASE64.encode(chunk.as_bytes())));
    }

    Ok(Cow::Owned(words.join("\r\n ")))
}

/// A text alternative, quoted-printable so 8-bit content and long lines
/// stay within the 7-bit line limits.
fn write_text_part(out: &mut Vec<u8>, content_type: &str, body: &str) -> SesResult<()> {
    write_header(out, "Content-Type", content_type)?;
    write_header(out, "Content-Transfer-Encoding", "quoted-printable")?;
    out.extend_from_slice(CRLF);
    out.extend_from_slice(&quoted_printable::encode(body.as_bytes()));
    out.extend_from_slice(CRLF);
    Ok(())
}

fn write_attachment(out: &mut Vec<u8>, attachment: &EmailAttachment) -> SesResult<()> {
    write_header(out, "Content-Type", attachment.content_type.as_str())?;
    write_header(
        out,
        "Content-Disposition",
        &content_disposition(&attachment.filename)?,
    )?;
    write_header(out, "Content-Transfer-Encoding", "base64")?;
    out.extend_from_slice(CRLF);

    let encoded = BASE64.encode(&attachment.data);
    let mut lines = encoded.as_bytes().chunks(BASE64_LINE_LEN).peekable();
    while let Some(line) = lines.next() {
        out.extend_from_slice(line);
        if lines.peek().is_some() {
            out.extend_from_slice(CRLF);
        }
    }
    Ok(())
}

/// `attachment; filename="..."`, or the RFC 2231 form for non-ASCII names.
fn content_disposition(filename: &str) -> SesResult<String> {
    if filename.chars().any(|c| c.is_control()) {
        return Err(SesError::Encoding {
            message: format!("attachment filename {:?} contains control characters", filename),
        });
    }

    if filename.is_ascii() {
        let quoted = filename.replace('\\', "\\\\").replace('"', "\\\"");
        Ok(format!("attachment; filename=\"{}\"", quoted))
    } else {
        Ok(format!(
            "attachment; filename*=UTF-8''{}",
            utf8_percent_encode(filename, RFC2231_SET)
        ))
    }
}
