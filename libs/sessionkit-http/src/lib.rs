#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Transport engine for the `sessionkit` client framework.
//!
//! The framework talks to the network only through the [`Transport`] trait:
//! one fully built request in, one response with an unread body out. This
//! crate provides that seam plus a production implementation,
//! [`HttpClient`], built on hyper with:
//! - TLS via rustls (HTTPS only by default)
//! - Connection pooling
//! - A per-request timeout
//! - Default headers (User-Agent and caller supplied)
//! - Transparent response decompression (gzip, brotli, deflate)
//! - A request buffer that fails fast when full
//!
//! Retries, redirects and session handling are intentionally absent here;
//! session policy lives one layer up.
//!
//! # Example
//!
//! ```ignore
//! use sessionkit_http::{HttpClient, Transport, read_body_limited};
//!
//! let client = HttpClient::builder().user_agent("my-app/1.0").build()?;
//! let request = http::Request::get("https://example.com/api").body(bytes::Bytes::new())?;
//! let response = client.send(request).await?;
//! let body = read_body_limited(response, 1024 * 1024).await?;
//! ```

mod builder;
mod client;
mod config;
mod error;
mod layers;
mod response;
mod tls;
mod transport;

pub use builder::HttpClientBuilder;
pub use client::HttpClient;
pub use config::{
    DEFAULT_MAX_BODY_SIZE, DEFAULT_USER_AGENT, HttpClientConfig, TlsRootConfig, TransportSecurity,
};
pub use error::{HttpError, InvalidUriKind};
pub use layers::{DefaultHeadersLayer, DefaultHeadersService};
pub use response::{
    ERROR_BODY_PREVIEW_LIMIT, ResponseBody, body_from_bytes, content_type, read_body_limited,
    read_body_preview,
};
pub use transport::Transport;
