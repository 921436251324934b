#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Session-aware typed HTTP client framework.
//!
//! A [`Client`] executes typed [`Operation`]s against one service and keeps
//! the per-client session state for them:
//!
//! - **Status**: a value of the caller's [`Status`] type, created lazily by
//!   a status initializer operation, shared by all session-dependent
//!   operations and resettable at any time.
//! - **Authentication**: an authenticator operation that marks the status
//!   authenticated, optional storage of the credentials that worked, and a
//!   single automatic re-authentication plus retry when the service reports
//!   the session expired.
//! - **Content**: response bodies are decoded by a [`BodyParser`] chosen by
//!   the operation, with media type and charset fallbacks handled once in
//!   [`content::parse_body`].
//!
//! The wire is reached only through the [`Transport`] trait from
//! `sessionkit-http`, which also provides the default hyper based
//! transport.
//!
//! # Example
//!
//! ```ignore
//! use sessionkit::{Client, Exchange, Json, Session};
//!
//! let client = Client::<MySession, BasicCredentials>::builder(base_uri)
//!     .status_initializer(Exchange::<MySession, (), MySession>::get(Json::new()).path("session").build())
//!     .authenticator(Login::new())
//!     .build()?;
//!
//! client.authenticate(BasicCredentials::new("ann", "pw")).await?;
//! let orders = client.execute(&list_orders, &()).await?;
//! ```

mod auth;
mod client;
mod config;
pub mod content;
mod credentials;
mod error;
pub mod operation;
mod status;

pub use auth::AuthPolicy;
pub use client::{Client, ClientBuilder};
pub use config::{ClientConfig, ENV_PREFIX};
pub use content::{BodyParser, BodyProducer, ContentType, Form, Json, Text, Xml};
pub use credentials::{BasicCredentials, SecretString};
pub use error::{ClientError, ContentError};
pub use operation::{
    Classification, Exchange, ExchangeBuilder, Operation, OperationContext, ResponseClassifier,
    Session,
};
pub use status::{Status, StatusCell};

pub use sessionkit_http::{HttpClient, HttpClientBuilder, HttpClientConfig, HttpError, Transport};
