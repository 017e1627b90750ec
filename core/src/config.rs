//! Client configuration.
//!
//! A `ClientConfig` is fixed once the client is built; the `with_*` methods
//! consume and return the config so all settings happen up front.

use std::fmt;
use std::time::Duration;

use crate::error::ConfigError;

pub const ENV_URL: &str = "UBERSMITH_URL";
pub const ENV_USERNAME: &str = "UBERSMITH_USERNAME";
pub const ENV_API_TOKEN: &str = "UBERSMITH_API_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "UBERSMITH_TIMEOUT_SECS";

/// How `call` encodes parameters in the request body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestFormat {
    /// `application/x-www-form-urlencoded`
    #[default]
    Form,
    /// `application/json`
    Json,
}

#[derive(Clone)]
pub struct ClientConfig {
    base_url: String,
    username: String,
    api_token: String,
    timeout: Option<Duration>,
    user_agent: String,
    format: Option<String>,
    request_format: RequestFormat,
    orig_user: Option<String>,
    orig_ip: Option<String>,
}

impl ClientConfig {
    /// Trailing slashes are stripped from `base_url`; credentials are kept
    /// verbatim.
    pub fn new(base_url: &str, username: &str, api_token: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            api_token: api_token.to_string(),
            timeout: None,
            user_agent: default_user_agent(),
            format: None,
            request_format: RequestFormat::default(),
            orig_user: None,
            orig_ip: None,
        }
    }

    /// Read `UBERSMITH_URL`, `UBERSMITH_USERNAME`, `UBERSMITH_API_TOKEN` and
    /// the optional `UBERSMITH_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// `from_env` over an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));
        let mut config = Self::new(&required(ENV_URL)?, &required(ENV_USERNAME)?, &required(ENV_API_TOKEN)?);

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: ENV_TIMEOUT_SECS,
                value: raw.clone(),
                reason: "expected a whole number of seconds",
            })?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    name: ENV_TIMEOUT_SECS,
                    value: raw,
                    reason: "must be greater than zero",
                });
            }
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Response `format` query option (e.g. `json`, `xml`).
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_request_format(mut self, request_format: RequestFormat) -> Self {
        self.request_format = request_format;
        self
    }

    /// Audit header naming the end user the call is made on behalf of.
    pub fn with_orig_user(mut self, orig_user: impl Into<String>) -> Self {
        self.orig_user = Some(orig_user.into());
        self
    }

    /// Audit header carrying the end user's IP address.
    pub fn with_orig_ip(mut self, orig_ip: impl Into<String>) -> Self {
        self.orig_ip = Some(orig_ip.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn api_token(&self) -> &str {
        &self.api_token
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    pub fn request_format(&self) -> RequestFormat {
        self.request_format
    }

    pub fn orig_user(&self) -> Option<&str> {
        self.orig_user.as_deref()
    }

    pub fn orig_ip(&self) -> Option<&str> {
        self.orig_ip.as_deref()
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("api_token", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .field("format", &self.format)
            .field("request_format", &self.request_format)
            .field("orig_user", &self.orig_user)
            .field("orig_ip", &self.orig_ip)
            .finish()
    }
}

fn default_user_agent() -> String {
    format!("Ubersmith API Client Rust/{}", env!("CARGO_PKG_VERSION"))
}
