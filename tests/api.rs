//! HTTP-тесты API поверх хранилища в памяти.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use event_forms::{
    app,
    config::Config,
    models::{Plan, Subscription, SubscriptionStatus},
    store::InMemoryEventStore,
    AppState,
};

struct TestApp {
    router: Router,
    store: Arc<InMemoryEventStore>,
}

struct TestResponse {
    status: StatusCode,
    headers: axum::http::HeaderMap,
    body: Vec<u8>,
}

impl TestResponse {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    fn text(&self) -> String {
        String::from_utf8(self.body.clone()).unwrap()
    }
}

impl TestApp {
    fn new() -> Self {
        let store = Arc::new(InMemoryEventStore::new());
        let state = AppState::new(store.clone(), Config::development()).unwrap();
        Self {
            router: app(state),
            store,
        }
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    async fn register_and_login(&self, email: &str) -> (String, String) {
        let registered = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({"email": email, "name": "Organizer", "password": "correct-horse"})),
            )
            .await;
        assert_eq!(registered.status, StatusCode::CREATED);

        let login = self
            .call(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({"email": email, "password": "correct-horse"})),
            )
            .await;
        assert_eq!(login.status, StatusCode::OK);
        let body = login.json();
        (
            body["token"].as_str().unwrap().to_string(),
            body["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    async fn create_meetup(&self, token: &str) -> Value {
        let created = self
            .call(
                Method::POST,
                "/api/events",
                Some(token),
                Some(json!({
                    "title": "Rust Meetup",
                    "description": "Monthly meetup",
                    "primaryColor": "#7c3aed",
                    "eventDate": "2025-06-20",
                    "sections": [
                        {
                            "title": "Dados",
                            "fields": [
                                {"type": "text", "label": "Nome completo", "required": true},
                                {"type": "email", "label": "E-mail", "required": true},
                                {
                                    "type": "checkbox",
                                    "label": "Interesses",
                                    "options": ["Rust", "Go"]
                                }
                            ]
                        },
                        {
                            "title": "Extra",
                            "fields": [
                                {"type": "date", "label": "Nascimento"}
                            ]
                        }
                    ]
                })),
            )
            .await;
        assert_eq!(created.status, StatusCode::CREATED, "{}", created.text());
        created.json()
    }
}

fn field_id(form: &Value, section: usize, field: usize) -> String {
    form["sections"][section]["fields"][field]["id"]
        .as_str()
        .unwrap()
        .to_string()
}

fn submission(form: &Value, name: &str, email: &str) -> Value {
    json!({
        "formData": {
            field_id(form, 0, 0): name,
            field_id(form, 0, 1): email,
            field_id(form, 0, 2): ["Rust", "Go"],
            field_id(form, 1, 0): "1990-05-17",
        }
    })
}

#[tokio::test]
async fn health_and_banner() {
    let app = TestApp::new();

    let health = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.text(), "OK");

    let banner = app.call(Method::GET, "/", None, None).await;
    assert!(banner.text().contains("EventForm+"));
}

#[tokio::test]
async fn register_and_login() {
    let app = TestApp::new();
    let (token, _) = app.register_and_login("ana@example.com").await;
    assert!(!token.is_empty());

    let duplicate = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({"email": "ANA@example.com", "name": "Ana", "password": "another-one"})),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);

    let invalid = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({"email": "not-an-email", "name": "Ana", "password": "short"})),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    let wrong = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": "ana@example.com", "password": "wrong-password"})),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.json()["error"], "invalid email or password");
}

#[tokio::test]
async fn event_form_is_created_in_order() {
    let app = TestApp::new();
    let (token, user_id) = app.register_and_login("ana@example.com").await;
    let form = app.create_meetup(&token).await;

    assert_eq!(form["title"], "Rust Meetup");
    assert_eq!(form["user_id"], user_id.as_str());
    assert_eq!(form["sections"][0]["order_index"], 0);
    assert_eq!(form["sections"][1]["order_index"], 1);
    assert_eq!(form["sections"][0]["fields"][2]["order_index"], 2);
    assert_eq!(form["sections"][0]["fields"][2]["type"], "checkbox");

    let listed = app.call(Method::GET, "/api/events", Some(&token), None).await;
    assert_eq!(listed.status, StatusCode::OK);
    let events = listed.json();
    assert_eq!(events.as_array().unwrap().len(), 1);
    assert_eq!(events[0]["responses"], 0);

    let rejected = app
        .call(
            Method::POST,
            "/api/events",
            Some(&token),
            Some(json!({
                "title": "Broken",
                "sections": [{"title": "S", "fields": [{"type": "select", "label": "Size"}]}]
            })),
        )
        .await;
    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn submissions_are_validated() {
    let app = TestApp::new();
    let (token, _) = app.register_and_login("ana@example.com").await;
    let form = app.create_meetup(&token).await;
    let event_id = form["id"].as_str().unwrap();
    let uri = format!("/api/events/{}/responses", event_id);

    let invalid = app
        .call(
            Method::POST,
            &uri,
            None,
            Some(json!({
                "formData": {
                    field_id(&form, 0, 1): "nope",
                    field_id(&form, 0, 2): ["Python"],
                    "00000000-0000-0000-0000-000000000000": "stray",
                }
            })),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::UNPROCESSABLE_ENTITY);
    let body = invalid.json();
    let fields = body["fields"].as_object().unwrap();
    assert_eq!(fields.len(), 4);
    assert_eq!(fields[&field_id(&form, 0, 0)], "this field is required");

    let accepted = app
        .call(
            Method::POST,
            &uri,
            None,
            Some(submission(&form, "Ana Souza", "ana@example.com")),
        )
        .await;
    assert_eq!(accepted.status, StatusCode::CREATED);
    let response = accepted.json();
    assert_eq!(response["respondent_name"], "Ana Souza");
    assert_eq!(response["checked_in"], false);
    assert_eq!(response["answers"][field_id(&form, 0, 2)], json!(["Rust", "Go"]));

    let missing = app
        .call(
            Method::POST,
            "/api/events/7d1c4b8e-5f0a-4a7e-9c41-2b1f0f7b9a10/responses",
            None,
            Some(json!({"formData": {}})),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn organizer_workflow() {
    let app = TestApp::new();
    let (token, _) = app.register_and_login("ana@example.com").await;
    let form = app.create_meetup(&token).await;
    let event_id = form["id"].as_str().unwrap().to_string();
    let base = format!("/api/events/{}", event_id);

    let mut ids = Vec::new();
    for (name, email) in [("Ana Souza", "ana@example.com"), ("Bruno Lima", "bruno@example.com")] {
        let created = app
            .call(
                Method::POST,
                &format!("{}/responses", base),
                None,
                Some(submission(&form, name, email)),
            )
            .await;
        assert_eq!(created.status, StatusCode::CREATED);
        ids.push(created.json()["id"].as_str().unwrap().to_string());
    }

    // Список с поиском по имени
    let searched = app
        .call(Method::GET, &format!("{}/responses?search=bruno", base), Some(&token), None)
        .await;
    assert_eq!(searched.status, StatusCode::OK);
    let found = searched.json();
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["respondent_name"], "Bruno Lima");

    // Карточка ответа
    let detail = app
        .call(Method::GET, &format!("{}/responses/{}", base, ids[0]), Some(&token), None)
        .await;
    assert_eq!(detail.status, StatusCode::OK);
    let detail = detail.json();
    assert_eq!(detail["sections"][0]["fields"][2]["value"], "Rust, Go");
    assert_eq!(detail["sections"][1]["fields"][0]["value"], "17/05/1990");

    // Check-in идемпотентен
    let first = app
        .call(Method::POST, &format!("{}/check-in/{}", base, ids[0]), Some(&token), None)
        .await;
    assert_eq!(first.status, StatusCode::OK);
    let first = first.json();
    assert_eq!(first["checked_in"], true);
    let again = app
        .call(Method::POST, &format!("{}/check-in/{}", base, ids[0]), Some(&token), None)
        .await
        .json();
    assert_eq!(again["checked_in_at"], first["checked_in_at"]);

    let check_in = app
        .call(Method::GET, &format!("{}/check-in?search=ana", base), Some(&token), None)
        .await
        .json();
    assert_eq!(check_in["summary"]["total"], 2);
    assert_eq!(check_in["summary"]["completed"], 1);
    assert_eq!(check_in["responses"].as_array().unwrap().len(), 1);

    // Дашборд
    let dashboard = app
        .call(Method::GET, &format!("{}/dashboard?period=7", base), Some(&token), None)
        .await;
    assert_eq!(dashboard.status, StatusCode::OK);
    let stats = dashboard.json();
    assert_eq!(stats["period"], "7");
    assert_eq!(stats["total_responses"], 2);
    assert_eq!(stats["today_responses"], 2);
    assert_eq!(stats["responses_by_hour"].as_array().unwrap().len(), 24);
    assert_eq!(stats["check_in"]["percentage"], 50.0);

    let bad_period = app
        .call(Method::GET, &format!("{}/dashboard?period=week", base), Some(&token), None)
        .await;
    assert_eq!(bad_period.status, StatusCode::BAD_REQUEST);

    // CSV
    let export = app
        .call(Method::GET, &format!("{}/export", base), Some(&token), None)
        .await;
    assert_eq!(export.status, StatusCode::OK);
    assert_eq!(
        export.headers[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    assert_eq!(
        export.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Rust Meetup_responses.csv\"; \
         filename*=UTF-8''Rust%20Meetup_responses.csv"
    );
    let csv = export.text();
    assert!(csv.starts_with('\u{feff}'));
    let lines: Vec<&str> = csv.trim_start_matches('\u{feff}').split('\n').collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with(r#""Respondent Name","Submission Date","Dados - Nome completo""#));
    assert!(lines.iter().any(|l| l.contains(r#""Rust; Go""#)));

    // Удаление ответа и события
    let deleted = app
        .call(Method::DELETE, &format!("{}/responses/{}", base, ids[1]), Some(&token), None)
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    let gone = app
        .call(Method::GET, &format!("{}/responses/{}", base, ids[1]), Some(&token), None)
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);

    let removed = app.call(Method::DELETE, &base, Some(&token), None).await;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);
    let after = app.call(Method::GET, &base, None, None).await;
    assert_eq!(after.status, StatusCode::NOT_FOUND);
    let responses = app
        .call(Method::GET, &format!("{}/responses", base), Some(&token), None)
        .await;
    assert_eq!(responses.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn only_the_owner_sees_responses() {
    let app = TestApp::new();
    let (owner, _) = app.register_and_login("ana@example.com").await;
    let (stranger, _) = app.register_and_login("eve@example.com").await;
    let form = app.create_meetup(&owner).await;
    let base = format!("/api/events/{}", form["id"].as_str().unwrap());

    app.call(
        Method::POST,
        &format!("{}/responses", base),
        None,
        Some(submission(&form, "Ana Souza", "ana@example.com")),
    )
    .await;

    // Публичная схема формы без ответов
    let public = app.call(Method::GET, &base, None, None).await;
    assert_eq!(public.status, StatusCode::OK);
    assert!(public.json().get("responses").is_none());

    let anonymous = app
        .call(Method::GET, &format!("{}?includeResponses=true", base), None, None)
        .await;
    assert_eq!(anonymous.status, StatusCode::FORBIDDEN);

    let owned = app
        .call(Method::GET, &format!("{}?includeResponses=true", base), Some(&owner), None)
        .await;
    assert_eq!(owned.json()["responses"].as_array().unwrap().len(), 1);

    for path in ["dashboard", "export", "responses", "check-in"] {
        let forbidden = app
            .call(Method::GET, &format!("{}/{}", base, path), Some(&stranger), None)
            .await;
        assert_eq!(forbidden.status, StatusCode::FORBIDDEN, "{}", path);

        let unauthenticated = app
            .call(Method::GET, &format!("{}/{}", base, path), None, None)
            .await;
        assert_eq!(unauthenticated.status, StatusCode::UNAUTHORIZED, "{}", path);
    }

    let bad_token = app
        .call(Method::GET, "/api/events", Some("garbage"), None)
        .await;
    assert_eq!(bad_token.status, StatusCode::UNAUTHORIZED);

    let delete = app.call(Method::DELETE, &base, Some(&stranger), None).await;
    assert_eq!(delete.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn subscription_defaults_to_free() {
    let app = TestApp::new();
    let (token, user_id) = app.register_and_login("ana@example.com").await;

    let free = app.call(Method::GET, "/api/subscription", Some(&token), None).await;
    assert_eq!(free.status, StatusCode::OK);
    assert_eq!(free.json()["plan"], "free");
    assert_eq!(free.json()["status"], "active");

    app.store.put_subscription(Subscription {
        id: Some(uuid::Uuid::new_v4()),
        user_id: user_id.parse().unwrap(),
        plan: Plan::Pro,
        status: SubscriptionStatus::PastDue,
        current_period_end: None,
    });
    let pro = app.call(Method::GET, "/api/subscription", Some(&token), None).await;
    assert_eq!(pro.json()["plan"], "pro");
    assert_eq!(pro.json()["status"], "past_due");
}

#[tokio::test]
async fn support_goes_only_to_the_support_inbox() {
    let app = TestApp::new();
    let response = app
        .call(
            Method::POST,
            "/api/support",
            None,
            Some(json!({"subject": "Help", "message": "Form is broken"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);

    let redirected = app
        .call(
            Method::POST,
            "/api/support",
            None,
            Some(json!({"subject": "Hi", "message": "spam", "to": "victim@example.com"})),
        )
        .await;
    assert_eq!(redirected.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn transactional_emails_require_login_and_ownership() {
    let app = TestApp::new();
    let anonymous = app
        .call(Method::POST, "/api/emails", None, Some(json!({"type": "welcome"})))
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let (owner, _) = app.register_and_login("ana@example.com").await;
    let (stranger, _) = app.register_and_login("eve@example.com").await;
    let form = app.create_meetup(&owner).await;

    let reminder = json!({"type": "event_reminder", "data": {"eventId": form["id"]}});
    let foreign = app
        .call(Method::POST, "/api/emails", Some(&stranger), Some(reminder.clone()))
        .await;
    assert_eq!(foreign.status, StatusCode::FORBIDDEN);

    // Авторизация пройдена, дальше упираемся в отсутствие ключа почтового API
    let own = app
        .call(Method::POST, "/api/emails", Some(&owner), Some(reminder))
        .await;
    assert_eq!(own.status, StatusCode::SERVICE_UNAVAILABLE);

    let custom_recipient = app
        .call(
            Method::POST,
            "/api/emails",
            Some(&owner),
            Some(json!({"type": "welcome_to", "data": {"email": "victim@example.com"}})),
        )
        .await;
    assert_eq!(custom_recipient.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn oversized_period_is_rejected() {
    let app = TestApp::new();
    let (token, _) = app.register_and_login("ana@example.com").await;
    let form = app.create_meetup(&token).await;
    let base = format!("/api/events/{}", form["id"].as_str().unwrap());
    app.call(
        Method::POST,
        &format!("{}/responses", base),
        None,
        Some(submission(&form, "Ana Souza", "ana@example.com")),
    )
    .await;

    for path in ["dashboard", "responses", "export"] {
        let uri = format!("{}/{}?period={}", base, path, u32::MAX);
        let response = app.call(Method::GET, &uri, Some(&token), None).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", path);
    }

    let longest = app
        .call(Method::GET, &format!("{}/dashboard?period=36500", base), Some(&token), None)
        .await;
    assert_eq!(longest.status, StatusCode::OK);
    assert_eq!(longest.json()["total_responses"], 1);
}

#[tokio::test]
async fn boolean_answer_is_accepted_for_text_field() {
    let app = TestApp::new();
    let (token, _) = app.register_and_login("ana@example.com").await;
    let form = app.create_meetup(&token).await;

    let mut body = submission(&form, "ignored", "ana@example.com");
    body["formData"][field_id(&form, 0, 0)] = json!(true);
    let created = app
        .call(
            Method::POST,
            &format!("/api/events/{}/responses", form["id"].as_str().unwrap()),
            None,
            Some(body),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.text());
    let response = created.json();
    assert_eq!(response["respondent_name"], "true");
    assert_eq!(response["answers"][field_id(&form, 0, 0)], "true");
}
