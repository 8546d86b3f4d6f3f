//! Integration tests for MIME assembly, checked with an independent parser.

use integrations_aws_ses_router::mime::build_raw;
use integrations_aws_ses_router::{EmailAttachment, ErrorKind, FileContentType};
use mailparse::{parse_mail, MailHeaderMap, ParsedMail};
use std::collections::HashSet;

fn recipients() -> Vec<String> {
    vec!["a@example.com".to_string(), "b@example.com".to_string()]
}

fn body_of(part: &ParsedMail<'_>) -> String {
    let body = part.get_body().unwrap();
    match body.strip_suffix("\r\n") {
        Some(stripped) => stripped.to_string(),
        None => body,
    }
}

fn attachments() -> Vec<EmailAttachment> {
    let binary: Vec<u8> = (0..=255u8).cycle().take(3000).collect();
    vec![
        EmailAttachment::new("report.pdf", FileContentType::Pdf, binary),
        EmailAttachment::from_filename("data.csv", b"id,name\n1,alpha\n".to_vec()),
    ]
}

#[test]
fn test_round_trip_structure() {
    let attachments = attachments();
    let raw = build_raw(
        &recipients(),
        "Quarterly report",
        "Plain text body",
        "<p>HTML body</p>",
        &attachments,
        "reports@tenant.example",
    )
    .unwrap();

    let mail = parse_mail(&raw).unwrap();
    assert_eq!(mail.ctype.mimetype, "multipart/mixed");
    assert_eq!(
        mail.headers.get_first_value("From").as_deref(),
        Some("reports@tenant.example")
    );
    assert_eq!(
        mail.headers.get_first_value("To").as_deref(),
        Some("a@example.com,b@example.com")
    );
    assert_eq!(
        mail.headers.get_first_value("Subject").as_deref(),
        Some("Quarterly report")
    );
    assert_eq!(mail.subparts.len(), 1 + attachments.len());

    let alternative = &mail.subparts[0];
    assert_eq!(alternative.ctype.mimetype, "multipart/alternative");
    assert_eq!(alternative.subparts.len(), 2);
    assert_eq!(alternative.subparts[0].ctype.mimetype, "text/plain");
    assert_eq!(alternative.subparts[0].ctype.charset.to_lowercase(), "utf-8");
    assert_eq!(body_of(&alternative.subparts[0]), "Plain text body");
    assert_eq!(alternative.subparts[1].ctype.mimetype, "text/html");
    assert_eq!(body_of(&alternative.subparts[1]), "<p>HTML body</p>");

    for (part, expected) in mail.subparts[1..].iter().zip(&attachments) {
        assert_eq!(part.ctype.mimetype, expected.content_type.as_str());
        let disposition = part.get_content_disposition();
        assert_eq!(
            disposition.params.get("filename").map(String::as_str),
            Some(expected.filename.as_str())
        );
        assert_eq!(part.get_body_raw().unwrap(), expected.data);
    }
}

#[test]
fn test_round_trip_html_fallback() {
    let raw = build_raw(
        &recipients(),
        "Fallback",
        "1 < 2 & \"quotes\"",
        "",
        &[],
        "noreply@tenant.example",
    )
    .unwrap();

    let mail = parse_mail(&raw).unwrap();
    let alternative = &mail.subparts[0];
    assert_eq!(body_of(&alternative.subparts[0]), "1 < 2 & \"quotes\"");
    assert_eq!(
        body_of(&alternative.subparts[1]),
        "<pre>1 &lt; 2 &amp; &#34;quotes&#34;</pre>"
    );
}

#[test]
fn test_round_trip_non_ascii() {
    let raw = build_raw(
        &recipients(),
        "Résumé ✓",
        "Grüße aus Zürich",
        "<p>Grüße</p>",
        &[],
        "noreply@tenant.example",
    )
    .unwrap();

    let mail = parse_mail(&raw).unwrap();
    assert_eq!(
        mail.headers.get_first_value("Subject").as_deref(),
        Some("Résumé ✓")
    );
    assert_eq!(body_of(&mail.subparts[0].subparts[0]), "Grüße aus Zürich");
}

#[test]
fn test_long_lines_stay_within_limit() {
    let subject = "x".repeat(1200);
    let text = format!("{} end", "a".repeat(3000));
    let html = format!("<p>{}</p>", "ü".repeat(1500));
    let many: Vec<String> = (0..80).map(|i| format!("user{}@example.com", i)).collect();

    let raw = build_raw(&many, &subject, &text, &html, &[], "noreply@tenant.example").unwrap();

    let longest = raw
        .split(|b| *b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line).len())
        .max()
        .unwrap();
    assert!(longest <= 998, "longest line is {} characters", longest);
    assert!(raw.is_ascii());

    let mail = parse_mail(&raw).unwrap();
    assert_eq!(mail.headers.get_first_value("Subject"), Some(subject));
    let to = mail.headers.get_first_value("To").unwrap();
    assert_eq!(
        to.split(',').map(str::trim).collect::<Vec<_>>(),
        many.iter().map(String::as_str).collect::<Vec<_>>()
    );

    let alternative = &mail.subparts[0];
    assert_eq!(
        alternative.subparts[0]
            .headers
            .get_first_value("Content-Transfer-Encoding")
            .as_deref(),
        Some("quoted-printable")
    );
    assert_eq!(body_of(&alternative.subparts[0]), text);
    assert_eq!(body_of(&alternative.subparts[1]), html);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_boundaries_are_distinct() {
    let handles: Vec<_> = (0..1000)
        .map(|_| {
            tokio::spawn(async {
                let raw = build_raw(
                    &["user@example.com".to_string()],
                    "Same",
                    "Same text",
                    "<p>Same html</p>",
                    &[],
                    "noreply@tenant.example",
                )
                .unwrap();
                let mail = parse_mail(&raw).unwrap();
                let mixed = mail.ctype.params["boundary"].clone();
                let alternative = mail.subparts[0].ctype.params["boundary"].clone();
                (mixed, alternative)
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        let (mixed, alternative) = handle.await.unwrap();
        assert_ne!(mixed, alternative);
        assert!(seen.insert(mixed));
        assert!(seen.insert(alternative));
    }
    assert_eq!(seen.len(), 2000);
}

#[test]
fn test_empty_body_rejected() {
    let error = build_raw(
        &recipients(),
        "Nothing",
        "",
        "",
        &attachments(),
        "noreply@tenant.example",
    )
    .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::EmptyBody);
}

#[test]
fn test_header_injection_rejected() {
    let error = build_raw(
        &recipients(),
        "Hi\r\nBcc: victim@example.com",
        "body",
        "",
        &[],
        "noreply@tenant.example",
    )
    .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Encoding);
}
