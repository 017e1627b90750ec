//! Request builder, response parser and blocking caller for the Ubersmith API.
//!
//! # Design
//! `UbersmithClient` holds an immutable `ClientConfig` and a `Transport`.
//! Each operation has a `build_*` method that produces the `HttpRequest` it
//! would send, and `parse_response` turns any `HttpResponse` into the call
//! outcome. `call` and friends are `build`, `Transport::execute`, `parse`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use tracing::{debug, warn};
use url::form_urlencoded;

use crate::config::{ClientConfig, RequestFormat};
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::http::{HttpRequest, HttpResponse};
use crate::params::{ParamValue, Params};
use crate::transport::{Transport, UreqTransport};

pub const API_PATH: &str = "/api/2.0/";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Non-JSON content returned by methods such as invoice or graph downloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub content_type: Option<String>,
    pub filename: Option<String>,
    pub body: Vec<u8>,
}

/// Outcome of `call_payload`.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The `data` field of a successful JSON envelope.
    Data(Value),
    Document(Document),
}

/// Synchronous client for the Ubersmith v2.0 API.
///
/// Immutable after construction; share it by reference across threads.
#[derive(Debug, Clone)]
pub struct UbersmithClient<T = UreqTransport> {
    config: ClientConfig,
    transport: T,
}

impl UbersmithClient<UreqTransport> {
    pub fn new(base_url: &str, username: &str, api_token: &str) -> Self {
        Self::from_config(ClientConfig::new(base_url, username, api_token))
    }

    pub fn from_config(config: ClientConfig) -> Self {
        let transport = UreqTransport::new(&config);
        Self { config, transport }
    }
}

impl<T> UbersmithClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url()
    }

    /// `{base_url}/api/2.0/?method={method}` plus `&format=` when configured.
    pub fn endpoint(&self, method: &str) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("method", method);
        if let Some(format) = self.config.format() {
            query.append_pair("format", format);
        }
        format!("{}{API_PATH}?{}", self.config.base_url(), query.finish())
    }

    /// `Basic base64(username:token)`
    pub fn authorization(&self) -> String {
        let credentials = format!("{}:{}", self.config.username(), self.config.api_token());
        format!("Basic {}", STANDARD.encode(credentials))
    }

    fn base_headers(&self, content_type: &str) -> Vec<(String, String)> {
        let mut headers = vec![
            ("authorization".to_string(), self.authorization()),
            ("content-type".to_string(), content_type.to_string()),
            ("user-agent".to_string(), self.config.user_agent().to_string()),
        ];
        if let Some(user) = self.config.orig_user() {
            headers.push(("x-ubersmith-orig-user".to_string(), user.to_string()));
        }
        if let Some(ip) = self.config.orig_ip() {
            headers.push(("x-ubersmith-orig-ip".to_string(), ip.to_string()));
        }
        headers
    }

    pub fn build_call(&self, method: &str, params: &Params) -> HttpRequest {
        let url = self.endpoint(method);
        debug!(%url, params = ?params.names().collect::<Vec<_>>(), "building call");

        let (content_type, body) = match self.config.request_format() {
            RequestFormat::Form => (FORM_CONTENT_TYPE, params.to_form()),
            RequestFormat::Json => (JSON_CONTENT_TYPE, params.to_json().to_string()),
        };
        HttpRequest {
            url,
            headers: self.base_headers(content_type),
            body: body.into_bytes(),
        }
    }

    /// Request with a caller-encoded body. `Authorization` in
    /// `extra_headers` is ignored. Any other extra header that names a
    /// default (`Content-Type`, `User-Agent`, `X-Ubersmith-Orig-*`) replaces
    /// it; the rest are appended.
    pub fn build_call_raw(
        &self,
        method: &str,
        body: impl Into<Vec<u8>>,
        extra_headers: &[(String, String)],
    ) -> HttpRequest {
        let url = self.endpoint(method);
        debug!(%url, "building raw call");

        let mut headers = self.base_headers(FORM_CONTENT_TYPE);
        let defaults: Vec<String> = headers.iter().map(|(name, _)| name.clone()).collect();
        for (name, value) in extra_headers {
            if name.eq_ignore_ascii_case("authorization") {
                warn!(method, "ignoring caller-supplied Authorization header");
                continue;
            }
            if defaults.iter().any(|default| default.eq_ignore_ascii_case(name)) {
                headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
            }
            headers.push((name.clone(), value.clone()));
        }
        HttpRequest {
            url,
            headers,
            body: body.into(),
        }
    }

    pub fn build_check_login(&self, login: &str, password: &str) -> HttpRequest {
        self.build_call(
            "uber.check_login",
            &Params::new().with("login", login).with("pass", password),
        )
    }

    pub fn build_get_client(&self, client_id: impl Into<ParamValue>, metadata: bool) -> HttpRequest {
        self.build_call(
            "client.get",
            &Params::new()
                .with("client_id", client_id)
                .with("metadata", i64::from(metadata)),
        )
    }

    /// `client_id` always comes first; a `client_id` inside `fields` is
    /// ignored.
    pub fn build_update_client(&self, client_id: impl Into<ParamValue>, fields: Params) -> HttpRequest {
        let mut params = Params::new().with("client_id", client_id);
        for (name, value) in fields {
            if name == "client_id" {
                warn!("ignoring client_id inside update fields");
                continue;
            }
            params.insert(name, value);
        }
        self.build_call("client.update", &params)
    }

    /// Turn a response into `data` or an error.
    ///
    /// A parseable envelope decides the outcome, except that a non-2xx
    /// response only counts when its envelope reports failure. Anything else
    /// is `Error::Http` (non-2xx) or `Error::Decode` (2xx).
    pub fn parse_response(&self, response: HttpResponse) -> Result<Value> {
        match Envelope::from_slice(&response.body) {
            Ok(envelope) if response.is_success() || !envelope.is_success() => {
                Ok(envelope.into_result()?)
            }
            Ok(_) => Err(http_error(response)),
            Err(_) if !response.is_success() => Err(http_error(response)),
            Err(err) => Err(Error::Decode(err)),
        }
    }

    /// JSON responses are unwrapped like `parse_response`; any other content
    /// type is returned as a `Document`.
    pub fn parse_payload(&self, response: HttpResponse) -> Result<Payload> {
        if !response.is_success() {
            return self.parse_response(response).map(Payload::Data);
        }
        match response.content_type() {
            Some(content_type) if content_type != JSON_CONTENT_TYPE => {
                let filename = response.content_filename();
                Ok(Payload::Document(Document {
                    content_type: Some(content_type),
                    filename,
                    body: response.body,
                }))
            }
            _ => self.parse_response(response).map(Payload::Data),
        }
    }
}

impl<T: Transport> UbersmithClient<T> {
    /// Invoke `method` with form-encoded (or JSON) `params`.
    pub fn call(&self, method: &str, params: &Params) -> Result<Value> {
        let response = self.transport.execute(self.build_call(method, params))?;
        self.parse_response(response)
    }

    /// Invoke `method` with a body the caller already encoded.
    pub fn call_raw(
        &self,
        method: &str,
        body: impl Into<Vec<u8>>,
        extra_headers: &[(String, String)],
    ) -> Result<Value> {
        let response = self
            .transport
            .execute(self.build_call_raw(method, body, extra_headers))?;
        self.parse_response(response)
    }

    /// Like `call`, but non-JSON answers come back as a `Document`.
    pub fn call_payload(&self, method: &str, params: &Params) -> Result<Payload> {
        let response = self.transport.execute(self.build_call(method, params))?;
        self.parse_payload(response)
    }

    pub fn check_login(&self, login: &str, password: &str) -> Result<Value> {
        let response = self.transport.execute(self.build_check_login(login, password))?;
        self.parse_response(response)
    }

    pub fn get_client(&self, client_id: impl Into<ParamValue>, metadata: bool) -> Result<Value> {
        let response = self.transport.execute(self.build_get_client(client_id, metadata))?;
        self.parse_response(response)
    }

    pub fn update_client(&self, client_id: impl Into<ParamValue>, fields: Params) -> Result<Value> {
        let response = self.transport.execute(self.build_update_client(client_id, fields))?;
        self.parse_response(response)
    }
}

fn http_error(response: HttpResponse) -> Error {
    Error::Http {
        status: response.status,
        body: String::from_utf8_lossy(&response.body).into_owned(),
    }
}
