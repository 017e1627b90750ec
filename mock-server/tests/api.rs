use axum::http::{self, Request, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine};
use http_body_util::BodyExt;
use mock_server::{app, app_with_state, MockState, API_TOKEN, API_USER, ERR_BAD_LOGIN, ERR_INVALID_METHOD};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn auth_header(user: &str, token: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{token}")))
}

fn form_request(method: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/2.0/?method={method}"))
        .header(http::header::AUTHORIZATION, auth_header(API_USER, API_TOKEN))
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body.to_string())
        .unwrap()
}

// --- auth ---

#[tokio::test]
async fn missing_credentials_return_401() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/2.0/?method=uber.method_list")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(&body_bytes(resp).await[..], b"Unauthorized");
}

#[tokio::test]
async fn wrong_token_returns_401() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/2.0/?method=uber.method_list")
                .header(http::header::AUTHORIZATION, auth_header(API_USER, "nope"))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- dispatch ---

#[tokio::test]
async fn method_list_succeeds() {
    let resp = app().oneshot(form_request("uber.method_list", "")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let envelope = body_json(resp).await;
    assert_eq!(envelope["status"], true);
    assert!(envelope["data"].get("client.get").is_some());
}

#[tokio::test]
async fn unknown_method_is_envelope_failure() {
    let resp = app().oneshot(form_request("client.explode", "")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let envelope = body_json(resp).await;
    assert_eq!(envelope["status"], false);
    assert_eq!(envelope["error_code"], ERR_INVALID_METHOD);
}

#[tokio::test]
async fn get_is_not_routed() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/api/2.0/?method=uber.method_list")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

// --- check_login ---

#[tokio::test]
async fn check_login_returns_client_id() {
    let resp = app()
        .oneshot(form_request("uber.check_login", "login=jdoe&pass=hunter2"))
        .await
        .unwrap();

    let envelope = body_json(resp).await;
    assert_eq!(envelope["status"], true);
    assert_eq!(envelope["data"]["client_id"], "1001");
}

#[tokio::test]
async fn check_login_with_bad_password_fails() {
    let resp = app()
        .oneshot(form_request("uber.check_login", "login=jdoe&pass="))
        .await
        .unwrap();

    let envelope = body_json(resp).await;
    assert_eq!(envelope["status"], false);
    assert_eq!(envelope["error_code"], ERR_BAD_LOGIN);
}

// --- client.get / client.update ---

#[tokio::test]
async fn get_client_includes_metadata_only_when_asked() {
    let with = body_json(app().oneshot(form_request("client.get", "client_id=1001&metadata=1")).await.unwrap()).await;
    assert_eq!(with["data"]["metadata"]["keystone_tenant_id"], "tenant-a");

    let without = body_json(app().oneshot(form_request("client.get", "client_id=1001&metadata=0")).await.unwrap()).await;
    assert_eq!(without["data"]["first"], "Jane");
    assert!(without["data"].get("metadata").is_none());
}

#[tokio::test]
async fn update_then_get_sees_new_metadata() {
    use tower::Service;

    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request("client.update", "client_id=1001&meta_keystone_tenant_id=foo&company=Acme"))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["data"], true);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request("client.get", "client_id=1001&metadata=1"))
        .await
        .unwrap();
    let envelope = body_json(resp).await;
    assert_eq!(envelope["data"]["metadata"]["keystone_tenant_id"], "foo");
    assert_eq!(envelope["data"]["company"], "Acme");
}

#[tokio::test]
async fn update_unknown_client_fails() {
    let envelope = body_json(app().oneshot(form_request("client.update", "client_id=9&first=X")).await.unwrap()).await;
    assert_eq!(envelope["status"], false);
}

// --- documents ---

#[tokio::test]
async fn invoice_get_returns_pdf() {
    let resp = app().oneshot(form_request("client.invoice_get", "invoice_id=77")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        resp.headers()[http::header::CONTENT_DISPOSITION],
        "inline; filename=invoice-77.pdf"
    );
    assert!(body_bytes(resp).await.starts_with(b"%PDF"));
}

// --- request decoding ---

#[tokio::test]
async fn json_bodies_are_accepted_and_recorded() {
    let state = MockState::seeded().shared();
    let resp = app_with_state(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/2.0/?method=client.get")
                .header(http::header::AUTHORIZATION, auth_header(API_USER, API_TOKEN))
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(r#"{"client_id":1001,"metadata":1}"#.to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    let envelope = body_json(resp).await;
    assert_eq!(envelope["data"]["clientid"], "1001");

    let state = state.read().await;
    assert_eq!(state.calls.len(), 1);
    assert_eq!(state.calls[0].method, "client.get");
    assert_eq!(state.calls[0].param("metadata"), Some("1"));
    assert_eq!(state.calls[0].content_type.as_deref(), Some("application/json"));
}

#[tokio::test]
async fn malformed_json_body_returns_400() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/2.0/?method=client.get")
                .header(http::header::AUTHORIZATION, auth_header(API_USER, API_TOKEN))
                .header(http::header::CONTENT_TYPE, "application/json")
                .body("{not json".to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
