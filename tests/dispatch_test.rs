//! End-to-end dispatch: STS role exchange followed by an SES v2 send.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use integrations_aws_ses_router::credentials::StaticCredentialProvider;
use integrations_aws_ses_router::mocks::{MockResponse, MockTransport};
use integrations_aws_ses_router::types::SimpleEmail;
use integrations_aws_ses_router::{
    AssumeRoleResolver, EmailAttachment, ErrorKind, MailProvider, RouterConfig, SesMailClient,
    TenantAccountConfig, TenantRouter,
};
use mailparse::parse_mail;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ROLE_A: &str = "arn:aws:iam::111111111111:role/tenant-a-mailer";
const ROLE_B: &str = "arn:aws:iam::222222222222:role/tenant-b-mailer";

fn base_identity() -> Arc<StaticCredentialProvider> {
    Arc::new(StaticCredentialProvider::from_keys("AKIDBASE", "BASESECRET"))
}

fn resolver_with(transport: Arc<MockTransport>) -> AssumeRoleResolver {
    AssumeRoleResolver::with_transport(base_identity(), transport, RouterConfig::default())
}

fn authorization(request: &integrations_aws_ses_router::transport::HttpRequest) -> String {
    request
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn test_send_signed_with_tenant_role() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::assumed_role("ASIATENANTA", "secret-a", "token-a"),
        MockResponse::assumed_role("ASIATENANTB", "secret-b", "token-b"),
        MockResponse::message_id("msg-a"),
    ]));
    let router = TenantRouter::new(Arc::new(resolver_with(transport.clone())));

    router
        .register("A", TenantAccountConfig::new(ROLE_A, "eu-west-1", "a@a.example"))
        .await
        .unwrap();
    router
        .register("B", TenantAccountConfig::new(ROLE_B, "us-east-1", "b@b.example"))
        .await
        .unwrap();

    let id = router
        .send_simple("A", "user@example.com", "Hello", "Body")
        .await
        .unwrap();
    assert_eq!(id, "msg-a");

    let requests = transport.requests();
    assert_eq!(requests.len(), 3);

    let sts_a = &requests[0];
    assert_eq!(sts_a.url.as_str(), "https://sts.eu-west-1.amazonaws.com/");
    assert!(sts_a.body_str().contains("RoleArn=arn%3Aaws%3Aiam%3A%3A111111111111"));
    assert!(authorization(sts_a).contains("Credential=AKIDBASE/"));

    let ses = &requests[2];
    assert_eq!(
        ses.url.as_str(),
        "https://email.eu-west-1.amazonaws.com/v2/email/outbound-emails"
    );
    assert!(authorization(ses).contains("Credential=ASIATENANTA/"));
    assert!(authorization(ses).contains("/eu-west-1/ses/aws4_request"));
    assert_eq!(ses.headers.get("x-amz-security-token").unwrap(), "token-a");

    let body: Value = serde_json::from_slice(&ses.body).unwrap();
    assert_eq!(body["FromEmailAddress"], "a@a.example");
    assert_eq!(body["Destination"]["ToAddresses"], json!(["user@example.com"]));
    assert_eq!(body["Content"]["Simple"]["Subject"]["Data"], "Hello");
    assert_eq!(body["Content"]["Simple"]["Body"]["Text"]["Data"], "Body");
    assert_eq!(body["Content"]["Simple"]["Body"]["Html"]["Data"], "Body");
}

#[tokio::test]
async fn test_ghost_tenant_makes_no_request() {
    let transport = Arc::new(MockTransport::new());
    let router = TenantRouter::new(Arc::new(resolver_with(transport.clone())));

    let error = router
        .send_simple("ghost", "user@example.com", "Hello", "Body")
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::TenantNotFound);
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_role_denied_fails_registration() {
    let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::error(
        403,
        "<ErrorResponse><Error><Type>Sender</Type><Code>AccessDenied</Code>\
         <Message>User is not authorized to perform: sts:AssumeRole</Message>\
         </Error></ErrorResponse>",
    )]));
    let router = TenantRouter::new(Arc::new(resolver_with(transport)));

    let error = router
        .register("A", TenantAccountConfig::new(ROLE_A, "eu-west-1", "a@a.example"))
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Credential);
    assert_eq!(error.error_code(), Some("AccessDenied"));
    assert_eq!(error.tenant_id(), Some("A"));
    assert!(router.is_empty());
}

#[tokio::test]
async fn test_provider_rejection_surfaces_unchanged() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::assumed_role("ASIATENANTA", "secret-a", "token-a"),
        MockResponse::error(400, r#"{"message":"Email address is not verified."}"#)
            .with_header("x-amzn-ErrorType", "MessageRejected")
            .with_header("x-amzn-RequestId", "req-123"),
    ]));
    let router = TenantRouter::new(Arc::new(resolver_with(transport.clone())));
    router
        .register("A", TenantAccountConfig::new(ROLE_A, "eu-west-1", "a@a.example"))
        .await
        .unwrap();

    let error = router
        .send_rich(
            "A",
            &["user@example.com".to_string()],
            "Report",
            "text",
            "",
            &[],
        )
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Provider);
    assert_eq!(error.error_code(), Some("MessageRejected"));
    assert_eq!(error.request_id(), Some("req-123"));
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn test_single_tenant_client() {
    let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::message_id(
        "direct-1",
    )]));
    let client = SesMailClient::with_transport(
        "ap-southeast-1",
        base_identity(),
        transport.clone(),
        &RouterConfig::default(),
    );

    let id = client
        .send_simple(&SimpleEmail {
            from: "noreply@example.com".to_string(),
            to: vec!["user@example.com".to_string()],
            subject: "Hi".to_string(),
            text: "Hi".to_string(),
            html: "Hi".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(id, "direct-1");
    let request = transport.last_request().unwrap();
    assert!(authorization(&request).contains("Credential=AKIDBASE/"));
    assert!(request.headers.get("x-amz-security-token").is_none());
}

#[tokio::test]
async fn test_end_to_end_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("Action=AssumeRole"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<AssumeRoleResponse><AssumeRoleResult><Credentials>\
             <AccessKeyId>ASIAWIRE</AccessKeyId>\
             <SecretAccessKey>wiresecret</SecretAccessKey>\
             <SessionToken>wiretoken</SessionToken>\
             <Expiration>2099-01-01T00:00:00Z</Expiration>\
             </Credentials></AssumeRoleResult></AssumeRoleResponse>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v2/email/outbound-emails"))
        .and(header("x-amz-security-token", "wiretoken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"MessageId": "wire-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = RouterConfig::builder()
        .sts_endpoint(server.uri())
        .ses_endpoint(server.uri())
        .build()
        .unwrap();
    let resolver = AssumeRoleResolver::new(config)
        .unwrap()
        .with_base_provider(base_identity());

    let router = TenantRouter::with_tenants(
        Arc::new(resolver),
        vec![(
            "GS".to_string(),
            TenantAccountConfig::with_default_region(ROLE_A, "noreply@gs.example"),
        )],
    )
    .await
    .unwrap();

    let attachment = EmailAttachment::from_filename("invoice.pdf", b"%PDF-1.7 test".to_vec());
    let id = router
        .send_rich(
            "GS",
            &["customer@example.com".to_string()],
            "Invoice",
            "Your invoice",
            "<p>Your invoice</p>",
            &[attachment],
        )
        .await
        .unwrap();
    assert_eq!(id, "wire-1");

    let requests = server.received_requests().await.unwrap();
    let send = requests
        .iter()
        .find(|r| r.url.path() == "/v2/email/outbound-emails")
        .unwrap();
    let body: Value = serde_json::from_slice(&send.body).unwrap();
    let raw = BASE64
        .decode(body["Content"]["Raw"]["Data"].as_str().unwrap())
        .unwrap();

    let mail = parse_mail(&raw).unwrap();
    assert_eq!(mail.ctype.mimetype, "multipart/mixed");
    assert_eq!(mail.subparts.len(), 2);
    assert_eq!(mail.subparts[1].ctype.mimetype, "application/pdf");
    assert_eq!(mail.subparts[1].get_body_raw().unwrap(), b"%PDF-1.7 test");
}
