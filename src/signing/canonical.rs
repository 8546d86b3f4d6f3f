//! Canonical request pieces for Signature Version 4.

use http::HeaderMap;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::collections::BTreeMap;

/// Unreserved characters plus `/` stay literal in paths.
const URI_PATH_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Only unreserved characters stay literal in query components.
const QUERY_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode per RFC 3986; `encode_slash` is set for query components.
pub fn uri_encode(input: &str, encode_slash: bool) -> String {
    let set = if encode_slash { QUERY_SET } else { URI_PATH_SET };
    utf8_percent_encode(input, set).to_string()
}

/// Remove empty, `.` and `..` segments. An empty path becomes `/`.
pub fn normalize_uri_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut result = format!("/{}", segments.join("/"));
    if path.ends_with('/') && result.len() > 1 {
        result.push('/');
    }
    result
}

/// Encoded query pairs sorted by key, then value.
pub fn canonical_query_string<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut encoded: Vec<(String, String)> = pairs
        .into_iter()
        .map(|(k, v)| (uri_encode(k, true), uri_encode(v, true)))
        .collect();
    encoded.sort();

    encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Canonical header block and the `SignedHeaders` list.
///
/// Only headers accepted by [`should_sign_header`] are included.
pub fn canonical_headers(headers: &HeaderMap) -> (String, String) {
    let mut by_name: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for (name, value) in headers {
        let name = name.as_str().to_ascii_lowercase();
        if !should_sign_header(&name) {
            continue;
        }
        let value = value
            .to_str()
            .unwrap_or_default()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        by_name.entry(name).or_default().push(value);
    }

    let canonical = by_name
        .iter()
        .map(|(name, values)| format!("{}:{}\n", name, values.join(",")))
        .collect::<String>();
    let signed = by_name.keys().map(String::as_str).collect::<Vec<_>>().join(";");

    (canonical, signed)
}

/// `host`, `content-type` and all `x-amz-*` headers are signed.
pub fn should_sign_header(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name == "host" || name == "content-type" || name.starts_with("x-amz-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_encode() {
        assert_eq!(uri_encode("/v2/email/outbound-emails", false), "/v2/email/outbound-emails");
        assert_eq!(uri_encode("/a b", false), "/a%20b");
        assert_eq!(uri_encode("arn:aws:iam::1:role/x", true), "arn%3Aaws%3Aiam%3A%3A1%3Arole%2Fx");
    }

    #[test]
    fn test_normalize_uri_path() {
        assert_eq!(normalize_uri_path(""), "/");
        assert_eq!(normalize_uri_path("/"), "/");
        assert_eq!(normalize_uri_path("/foo//bar"), "/foo/bar");
        assert_eq!(normalize_uri_path("/foo/../bar"), "/bar");
        assert_eq!(normalize_uri_path("/foo/bar/"), "/foo/bar/");
    }

    #[test]
    fn test_canonical_query_string_sorted() {
        let pairs = vec![("Version", "2011-06-15"), ("Action", "AssumeRole")];
        assert_eq!(
            canonical_query_string(pairs),
            "Action=AssumeRole&Version=2011-06-15"
        );
        assert_eq!(canonical_query_string(Vec::new()), "");
    }

    #[test]
    fn test_canonical_headers_filters_and_sorts() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Amz-Date", "20231215T103045Z".parse().unwrap());
        headers.insert("Host", "  email.us-east-1.amazonaws.com ".parse().unwrap());
        headers.insert("User-Agent", "test".parse().unwrap());
        headers.insert("Content-Type", "application/json".parse().unwrap());

        let (canonical, signed) = canonical_headers(&headers);

        assert_eq!(
            canonical,
            "content-type:application/json\n\
             host:email.us-east-1.amazonaws.com\n\
             x-amz-date:20231215T103045Z\n"
        );
        assert_eq!(signed, "content-type;host;x-amz-date");
    }
}
