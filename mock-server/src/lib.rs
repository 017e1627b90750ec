use std::{collections::BTreeMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};

pub const API_USER: &str = "admin";
pub const API_TOKEN: &str = "secret-token";

pub const ERR_BAD_LOGIN: i64 = 1;
pub const ERR_INVALID_CLIENT: i64 = 2;
pub const ERR_INVALID_METHOD: i64 = 3;

/// One customer account in the in-memory billing system.
#[derive(Clone, Debug)]
pub struct Account {
    pub client_id: String,
    pub login: String,
    pub password: String,
    pub fields: BTreeMap<String, String>,
    pub metadata: BTreeMap<String, String>,
}

/// A method call as the server decoded it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: String,
    pub params: Vec<(String, String)>,
    pub content_type: Option<String>,
}

impl RecordedCall {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug)]
pub struct MockState {
    pub api_user: String,
    pub api_token: String,
    pub accounts: BTreeMap<String, Account>,
    pub calls: Vec<RecordedCall>,
}

impl MockState {
    /// `admin` / `secret-token`, with client `1001` (login `jdoe`, password
    /// `hunter2`) whose `keystone_tenant_id` metadata is `tenant-a`.
    pub fn seeded() -> Self {
        let account = Account {
            client_id: "1001".to_string(),
            login: "jdoe".to_string(),
            password: "hunter2".to_string(),
            fields: BTreeMap::from([
                ("first".to_string(), "Jane".to_string()),
                ("last".to_string(), "Doe".to_string()),
                ("company".to_string(), "Example Corp".to_string()),
                ("email".to_string(), "jdoe@example.com".to_string()),
            ]),
            metadata: BTreeMap::from([("keystone_tenant_id".to_string(), "tenant-a".to_string())]),
        };
        Self {
            api_user: API_USER.to_string(),
            api_token: API_TOKEN.to_string(),
            accounts: BTreeMap::from([(account.client_id.clone(), account)]),
            calls: Vec::new(),
        }
    }

    pub fn shared(self) -> SharedState {
        Arc::new(RwLock::new(self))
    }
}

pub type SharedState = Arc<RwLock<MockState>>;

#[derive(Deserialize)]
struct MethodQuery {
    method: Option<String>,
}

pub fn app() -> Router {
    app_with_state(MockState::seeded().shared())
}

pub fn app_with_state(state: SharedState) -> Router {
    Router::new()
        .route("/api/2.0/", post(api))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, MockState::seeded().shared()).await
}

pub async fn run_with_state(listener: TcpListener, state: SharedState) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock Ubersmith API listening");
    }
    axum::serve(listener, app_with_state(state)).await
}

async fn api(
    State(state): State<SharedState>,
    Query(query): Query<MethodQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut state = state.write().await;
    if !authorized(&headers, &state) {
        return (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Basic realm=\"Ubersmith API\"")],
            "Unauthorized",
        )
            .into_response();
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let params = match decode_params(content_type.as_deref(), &body) {
        Some(params) => params,
        None => return (StatusCode::BAD_REQUEST, "malformed request body").into_response(),
    };

    let Some(method) = query.method else {
        return failure(ERR_INVALID_METHOD, "No method specified.");
    };
    debug!(%method, params = params.len(), "api call");
    state.calls.push(RecordedCall {
        method: method.clone(),
        params: params.clone(),
        content_type,
    });

    let lookup = |name: &str| {
        params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    };

    match method.as_str() {
        "uber.method_list" => success(json!({
            "uber.check_login": "Check a client login and password",
            "uber.method_list": "List available API methods",
            "client.get": "Retrieve a client",
            "client.update": "Update a client",
            "client.invoice_get": "Retrieve an invoice document",
        })),
        "uber.check_login" => {
            let login = lookup("login").unwrap_or_default();
            let pass = lookup("pass").unwrap_or_default();
            match state
                .accounts
                .values()
                .find(|account| account.login == login && account.password == pass)
            {
                Some(account) => success(json!({
                    "client_id": account.client_id,
                    "login": account.login,
                    "type": "client",
                })),
                None => failure(ERR_BAD_LOGIN, "Invalid login or password."),
            }
        }
        "client.get" => {
            let id = lookup("client_id").unwrap_or_default();
            let Some(account) = state.accounts.get(&id) else {
                return failure(ERR_INVALID_CLIENT, "Invalid client_id specified.");
            };
            let mut data: Map<String, Value> = account
                .fields
                .iter()
                .map(|(key, value)| (key.clone(), Value::String(value.clone())))
                .collect();
            data.insert("clientid".to_string(), json!(account.client_id));
            data.insert("login".to_string(), json!(account.login));
            if lookup("metadata").as_deref() == Some("1") {
                data.insert("metadata".to_string(), json!(account.metadata));
            }
            success(Value::Object(data))
        }
        "client.update" => {
            let id = lookup("client_id").unwrap_or_default();
            let Some(account) = state.accounts.get_mut(&id) else {
                return failure(ERR_INVALID_CLIENT, "Invalid client_id specified.");
            };
            for (key, value) in params.iter().filter(|(key, _)| key != "client_id") {
                match key.strip_prefix("meta_") {
                    Some(meta) => account.metadata.insert(meta.to_string(), value.clone()),
                    None => account.fields.insert(key.clone(), value.clone()),
                };
            }
            success(json!(true))
        }
        "client.invoice_get" => {
            let invoice = lookup("invoice_id").unwrap_or_else(|| "0".to_string());
            // `pad_bytes` inflates the document for size tests.
            let pad = lookup("pad_bytes").and_then(|raw| raw.parse::<usize>().ok()).unwrap_or(0);
            let mut body = format!("%PDF-1.4\n% mock invoice {invoice}\n").into_bytes();
            body.resize(body.len() + pad, b' ');
            body.extend_from_slice(b"\n%%EOF\n");
            (
                [
                    (header::CONTENT_TYPE, "application/pdf".to_string()),
                    (header::CONTENT_DISPOSITION, format!("inline; filename=invoice-{invoice}.pdf")),
                ],
                body,
            )
                .into_response()
        }
        _ => failure(ERR_INVALID_METHOD, "Invalid method specified."),
    }
}

fn authorized(headers: &HeaderMap, state: &MockState) -> bool {
    let Some(encoded) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Basic "))
    else {
        return false;
    };
    let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
        return false;
    };
    decoded == format!("{}:{}", state.api_user, state.api_token).into_bytes()
}

/// Form bodies are decoded as-is; JSON bodies must be an object and have
/// their scalar values stringified the way a form would carry them.
fn decode_params(content_type: Option<&str>, body: &[u8]) -> Option<Vec<(String, String)>> {
    let is_json = content_type.is_some_and(|ct| ct.starts_with("application/json"));
    if !is_json {
        return Some(url::form_urlencoded::parse(body).into_owned().collect());
    }
    let object: Map<String, Value> = serde_json::from_slice(body).ok()?;
    Some(
        object
            .into_iter()
            .map(|(key, value)| {
                let text = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, text)
            })
            .collect(),
    )
}

fn success(data: Value) -> Response {
    Json(json!({
        "status": true,
        "error_code": null,
        "error_message": "",
        "data": data,
    }))
    .into_response()
}

fn failure(code: i64, message: &str) -> Response {
    Json(json!({
        "status": false,
        "error_code": code,
        "error_message": message,
        "data": "",
    }))
    .into_response()
}
