//! Отправка писем через мок почтового API.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use event_forms::config::EmailConfig;
use event_forms::services::mailer::{MailError, Mailer, TransactionalEmail};

fn mailer(server: &MockServer) -> Mailer {
    Mailer::new(EmailConfig {
        api_url: server.uri(),
        api_key: Some("re_test_key".to_string()),
        from: "EventForm+ <noreply@example.com>".to_string(),
        support_to: "support@example.com".to_string(),
        timeout_seconds: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn support_email_goes_to_support_inbox() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(header("authorization", "Bearer re_test_key"))
        .and(body_partial_json(json!({
            "to": ["support@example.com"],
            "subject": "[EventForm+ Support] Export is empty",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "email_1"})))
        .expect(1)
        .mount(&server)
        .await;

    mailer(&server)
        .send_support(Some("ana@example.com"), "Export is empty", "<b>help</b>")
        .await
        .unwrap();
}

#[tokio::test]
async fn welcome_email_is_addressed_to_the_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(body_partial_json(json!({
            "to": ["ana@example.com"],
            "subject": "Welcome to EventForm+!",
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let welcome = TransactionalEmail::Welcome {
        name: "Ana".to_string(),
    };
    mailer(&server)
        .send_transactional("ana@example.com", welcome, "https://eventform.example")
        .await
        .unwrap();
}

#[tokio::test]
async fn provider_errors_open_the_circuit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(3)
        .mount(&server)
        .await;

    let mailer = mailer(&server);
    for _ in 0..3 {
        let err = mailer
            .send_support(None, "Help", "It broke")
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::Rejected { status: 500, .. }));
    }

    // Четвертый запрос до провайдера не доходит
    let err = mailer
        .send_support(None, "Help", "It broke")
        .await
        .unwrap_err();
    assert!(matches!(err, MailError::CircuitOpen));
}
