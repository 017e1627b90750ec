//! Blocking client for the Ubersmith billing API (v2.0).
//!
//! # Overview
//! A method call is a POST to `{base_url}/api/2.0/?method={name}` with HTTP
//! Basic credentials and form-encoded parameters. Every JSON answer is an
//! envelope `{status, data, error_code, error_message}`: a truthy `status`
//! yields `data`, a falsy one an [`ApiError`].
//!
//! ```no_run
//! use ubersmith_core::{Params, UbersmithClient};
//!
//! let client = UbersmithClient::new("https://billing.example.com", "admin", "token");
//! let account = client.get_client(1001, true)?;
//! client.update_client(1001, Params::new().with("meta_keystone_tenant_id", "foo"))?;
//! # Ok::<(), ubersmith_core::Error>(())
//! ```
//!
//! # Design
//! - `UbersmithClient` is immutable after construction and holds no state
//!   between calls.
//! - Requests are built as plain data (`build_*`) and responses parsed from
//!   plain data (`parse_response`), so the I/O boundary is the `Transport`
//!   trait alone.
//! - [`Error::Api`] is the only variant meaning "the server said no".

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod params;
pub mod transport;

pub use client::{Document, Payload, UbersmithClient};
pub use config::{ClientConfig, RequestFormat};
pub use envelope::Envelope;
pub use error::{ApiError, ConfigError, Error, Result, TransportError};
pub use http::{HttpRequest, HttpResponse};
pub use params::{ParamValue, Params};
pub use transport::{Transport, UreqTransport};
