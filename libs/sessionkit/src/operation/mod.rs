//! The operation contract.
//!
//! An [`Operation`] is one logical remote call: typed parameters in, typed
//! output out. It is stateless and reusable, so a single value can be
//! executed any number of times, concurrently, by a
//! [`Client`](crate::Client). Whether it needs a session is declared once
//! through [`Operation::session`]; the client resolves the status (and
//! authentication) before handing it an [`OperationContext`].
//!
//! Most HTTP operations are built from strategies with
//! [`Exchange::builder`]. Anything else, such as a login that stores a
//! token in the status, implements [`Operation`] directly and usually
//! delegates the wire work to an inner [`Exchange`].

mod classify;
mod exchange;
pub(crate) mod uri;

pub use classify::{
    Classification, CredentialsClassifier, ResponseClassifier, SessionClassifier,
    StandardClassifier,
};
pub use exchange::{Exchange, ExchangeBuilder, Scope};
pub use uri::{append_query, resolve_uri};

use crate::error::ClientError;
use async_trait::async_trait;
use sessionkit_http::Transport;
use std::sync::Arc;
use url::Url;

/// How much session state an operation needs before it can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Session {
    /// Needs only the client.
    #[default]
    Independent,
    /// Needs an initialized status.
    Status,
    /// Needs an initialized, authenticated status; renewed once on expiry.
    Authenticated,
}

impl Session {
    #[must_use]
    pub fn requires_status(self) -> bool {
        !matches!(self, Session::Independent)
    }
}

/// Everything an operation may use while it runs.
pub struct OperationContext<'a, S> {
    transport: &'a dyn Transport,
    base_uri: &'a Url,
    max_body_size: usize,
    status: Option<Arc<S>>,
}

impl<'a, S> OperationContext<'a, S> {
    #[must_use]
    pub fn new(transport: &'a dyn Transport, base_uri: &'a Url, max_body_size: usize) -> Self {
        Self {
            transport,
            base_uri,
            max_body_size,
            status: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: Option<Arc<S>>) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn transport(&self) -> &'a dyn Transport {
        self.transport
    }

    #[must_use]
    pub fn base_uri(&self) -> &'a Url {
        self.base_uri
    }

    /// Largest response body an operation should read.
    #[must_use]
    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    #[must_use]
    pub fn status(&self) -> Option<&Arc<S>> {
        self.status.as_ref()
    }

    /// The resolved status, for session-dependent work.
    ///
    /// # Errors
    /// Returns [`ClientError::StatusNotInitialized`] when there is none.
    pub fn require_status(&self) -> Result<&Arc<S>, ClientError> {
        self.status.as_ref().ok_or(ClientError::StatusNotInitialized)
    }
}

impl<S> std::fmt::Debug for OperationContext<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationContext")
            .field("base_uri", &self.base_uri.as_str())
            .field("max_body_size", &self.max_body_size)
            .field("has_status", &self.status.is_some())
            .finish_non_exhaustive()
    }
}

/// A typed remote call.
///
/// `S` is the client's status type. Implementations must not keep
/// per-call state in `self`.
#[async_trait]
pub trait Operation<S>: Send + Sync
where
    S: Send + Sync + 'static,
{
    type Params: Send + Sync;
    type Output: Send;

    fn session(&self) -> Session {
        Session::Independent
    }

    /// Run the call.
    ///
    /// Session-dependent operations receive the status through `cx`;
    /// independent ones get a context without it.
    async fn execute(
        &self,
        params: &Self::Params,
        cx: &OperationContext<'_, S>,
    ) -> Result<Self::Output, ClientError>;
}

#[async_trait]
impl<S, O> Operation<S> for Arc<O>
where
    S: Send + Sync + 'static,
    O: Operation<S> + ?Sized,
{
    type Params = O::Params;
    type Output = O::Output;

    fn session(&self) -> Session {
        (**self).session()
    }

    async fn execute(
        &self,
        params: &Self::Params,
        cx: &OperationContext<'_, S>,
    ) -> Result<Self::Output, ClientError> {
        (**self).execute(params, cx).await
    }
}
