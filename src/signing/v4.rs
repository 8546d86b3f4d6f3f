//! Signature Version 4 computation.
//!
//! Reference: <https://docs.aws.amazon.com/IAM/latest/UserGuide/reference_aws-signing.html>

use super::canonical::{canonical_headers, canonical_query_string, normalize_uri_path, uri_encode};
use super::SigningError;
use crate::credentials::AwsCredentials;
use crate::transport::HttpRequest;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use http::header::{HeaderValue, AUTHORIZATION, HOST};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Signature algorithm identifier.
pub const AWS_ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, SigningError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| SigningError::SigningFailed {
        message: format!("HMAC key rejected: {}", e),
    })?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Derive the signing key: HMAC chain over date, region, service and
/// `aws4_request`, seeded with `"AWS4" + secret`.
pub fn derive_signing_key(
    secret_key: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, SigningError> {
    let k_date = hmac_sha256(format!("AWS4{}", secret_key).as_bytes(), date_stamp.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

/// `YYYYMMDDTHHMMSSZ`.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

/// `YYYYMMDD`.
pub fn format_date_stamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%d").to_string()
}

/// `{date}/{region}/{service}/aws4_request`.
pub fn credential_scope(date_stamp: &str, region: &str, service: &str) -> String {
    format!("{}/{}/{}/aws4_request", date_stamp, region, service)
}

/// Signs requests for one region and service.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    region: String,
    service: String,
}

impl RequestSigner {
    /// Create a signer for `service` in `region`.
    pub fn new(region: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            service: service.into(),
        }
    }

    /// The signing region.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// The signing service name.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Add `host`, `x-amz-date`, `x-amz-content-sha256`, the session token
    /// if any, and `authorization` to `request`.
    pub fn sign(
        &self,
        request: &mut HttpRequest,
        credentials: &AwsCredentials,
        timestamp: &DateTime<Utc>,
    ) -> Result<(), SigningError> {
        let host = match (request.url.host_str(), request.url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(SigningError::InvalidUrl {
                    message: format!("no host in {}", request.url),
                })
            }
        };

        let amz_date = format_datetime(timestamp);
        let date_stamp = format_date_stamp(timestamp);
        let payload_hash = sha256_hex(&request.body);

        request.headers.insert(HOST, header_value("host", &host)?);
        request
            .headers
            .insert("x-amz-date", header_value("x-amz-date", &amz_date)?);
        request.headers.insert(
            "x-amz-content-sha256",
            header_value("x-amz-content-sha256", &payload_hash)?,
        );
        if let Some(token) = credentials.session_token() {
            let mut value = header_value("x-amz-security-token", token)?;
            value.set_sensitive(true);
            request.headers.insert("x-amz-security-token", value);
        }

        let canonical_uri = uri_encode(&normalize_uri_path(request.url.path()), false);
        let query_pairs: Vec<(String, String)> = request
            .url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let canonical_query =
            canonical_query_string(query_pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        let (canonical_headers, signed_headers) = canonical_headers(&request.headers);

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            request.method.as_str(),
            canonical_uri,
            canonical_query,
            canonical_headers,
            signed_headers,
            payload_hash
        );

        let scope = credential_scope(&date_stamp, &self.region, &self.service);
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            AWS_ALGORITHM,
            amz_date,
            scope,
            sha256_hex(canonical_request.as_bytes())
        );

        let signing_key = derive_signing_key(
            credentials.secret_access_key(),
            &date_stamp,
            &self.region,
            &self.service,
        )?;
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes())?);

        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            AWS_ALGORITHM,
            credentials.access_key_id(),
            scope,
            signed_headers,
            signature
        );
        let mut value = header_value("authorization", &authorization)?;
        value.set_sensitive(true);
        request.headers.insert(AUTHORIZATION, value);

        Ok(())
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, SigningError> {
    HeaderValue::from_str(value).map_err(|_| SigningError::SigningFailed {
        message: format!("value for {} is not a valid header", name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use http::Method;
    use url::Url;

    #[test]
    fn test_sha256_hex_empty() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_derive_signing_key_reference_vector() {
        let key = derive_signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        )
        .unwrap();
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn test_format_timestamps() {
        let dt = Utc.with_ymd_and_hms(2023, 12, 15, 10, 30, 45).unwrap();
        assert_eq!(format_datetime(&dt), "20231215T103045Z");
        assert_eq!(format_date_stamp(&dt), "20231215");
        assert_eq!(
            credential_scope("20231215", "eu-west-1", "sts"),
            "20231215/eu-west-1/sts/aws4_request"
        );
    }

    fn ses_request() -> HttpRequest {
        HttpRequest::new(
            Method::POST,
            Url::parse("https://email.us-east-1.amazonaws.com/v2/email/outbound-emails").unwrap(),
        )
        .with_header(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        )
        .with_body(b"{}".to_vec())
    }

    #[test]
    fn test_sign_adds_headers() {
        let signer = RequestSigner::new("us-east-1", "ses");
        let credentials = AwsCredentials::new("AKIDEXAMPLE", "SECRET");
        let timestamp = Utc.with_ymd_and_hms(2023, 12, 15, 10, 30, 45).unwrap();

        let mut request = ses_request();
        signer.sign(&mut request, &credentials, &timestamp).unwrap();

        assert_eq!(
            request.headers.get("host").unwrap(),
            "email.us-east-1.amazonaws.com"
        );
        assert_eq!(request.headers.get("x-amz-date").unwrap(), "20231215T103045Z");
        assert!(request.headers.get("x-amz-security-token").is_none());

        let auth = request.headers.get("authorization").unwrap().to_str().unwrap();
        assert!(auth.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20231215/us-east-1/ses/aws4_request"
        ));
        assert!(auth.contains("SignedHeaders=content-type;host;x-amz-content-sha256;x-amz-date"));
    }

    #[test]
    fn test_sign_is_deterministic_and_body_sensitive() {
        let signer = RequestSigner::new("us-east-1", "ses");
        let credentials = AwsCredentials::new("AKIDEXAMPLE", "SECRET");
        let timestamp = Utc.with_ymd_and_hms(2023, 12, 15, 10, 30, 45).unwrap();

        let mut a = ses_request();
        let mut b = ses_request();
        let mut c = ses_request().with_body(b"{\"x\":1}".to_vec());
        signer.sign(&mut a, &credentials, &timestamp).unwrap();
        signer.sign(&mut b, &credentials, &timestamp).unwrap();
        signer.sign(&mut c, &credentials, &timestamp).unwrap();

        assert_eq!(a.headers.get("authorization"), b.headers.get("authorization"));
        assert_ne!(a.headers.get("authorization"), c.headers.get("authorization"));
    }

    #[test]
    fn test_sign_with_session_token_and_port() {
        let signer = RequestSigner::new("us-east-1", "sts");
        let credentials = AwsCredentials::new("ASIAEXAMPLE", "SECRET").with_session_token("TOKEN");
        let mut request = HttpRequest::new(
            Method::POST,
            Url::parse("http://127.0.0.1:4566/").unwrap(),
        );

        signer.sign(&mut request, &credentials, &Utc::now()).unwrap();

        assert_eq!(request.headers.get("host").unwrap(), "127.0.0.1:4566");
        assert_eq!(request.headers.get("x-amz-security-token").unwrap(), "TOKEN");
        let auth = request.headers.get("authorization").unwrap().to_str().unwrap();
        assert!(auth.contains("x-amz-security-token"));
    }
}
