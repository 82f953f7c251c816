use storefront_api::{
    config::EmailConfig,
    email::{
        EmailMessage, EmailSender, HttpEmailClient, HttpNewsletterClient, NewsletterClient,
        NewsletterError,
    },
};
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn config_for(server: &MockServer) -> EmailConfig {
    EmailConfig {
        api_url: server.uri(),
        api_key: "em_test".to_string(),
        from_address: "orders@example.com".to_string(),
        admin_address: "admin@example.com".to_string(),
        newsletter_api_url: server.uri(),
        newsletter_api_key: "nl_test".to_string(),
    }
}

fn message() -> EmailMessage {
    EmailMessage {
        to: "customer@example.com".to_string(),
        from: "orders@example.com".to_string(),
        subject: "Order confirmation".to_string(),
        html_body: "<p>Thanks!</p>".to_string(),
    }
}

#[tokio::test]
async fn email_client_posts_the_message_with_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/send"))
        .and(header("authorization", "Bearer em_test"))
        .and(body_partial_json(serde_json::json!({
            "to": "customer@example.com",
            "subject": "Order confirmation",
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpEmailClient::new(&config_for(&server));
    client.send(&message()).await.expect("send should succeed");
}

#[tokio::test]
async fn email_client_surfaces_api_rejections() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/send"))
        .respond_with(ResponseTemplate::new(422).set_body_string("bad recipient"))
        .mount(&server)
        .await;

    let client = HttpEmailClient::new(&config_for(&server));
    let err = client.send(&message()).await.expect_err("should fail");
    assert!(err.to_string().contains("422"));
}

#[tokio::test]
async fn newsletter_client_maps_status_codes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/subscribers"))
        .and(body_partial_json(serde_json::json!({
            "email": "dup@example.com"
        })))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/subscribers"))
        .and(body_partial_json(serde_json::json!({
            "email": "new@example.com"
        })))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let client = HttpNewsletterClient::new(&config_for(&server));

    client
        .subscribe("new@example.com", Some("Reader"))
        .await
        .expect("subscribe should succeed");

    let err = client
        .subscribe("dup@example.com", None)
        .await
        .expect_err("duplicate should fail");
    assert!(matches!(err, NewsletterError::AlreadySubscribed));
}
