//! Authentication policy, credential storage and the type-erased lifecycle
//! operations a [`Client`](crate::Client) is configured with.

use crate::error::ClientError;
use crate::operation::{Operation, OperationContext};
use crate::status::Status;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// How a client treats credentials after a successful authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthPolicy {
    /// Keep the last successful credentials for later renewal.
    pub store_credentials: bool,
    /// Re-authenticate once with stored credentials when a session expires.
    pub auto_renew: bool,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            store_credentials: true,
            auto_renew: true,
        }
    }
}

/// Holds at most one set of credentials. The lock is never held across an await.
pub(crate) struct CredentialStore<C> {
    stored: Mutex<Option<C>>,
}

impl<C: Clone> CredentialStore<C> {
    pub(crate) fn new() -> Self {
        Self {
            stored: Mutex::new(None),
        }
    }

    pub(crate) fn get(&self) -> Option<C> {
        self.stored.lock().clone()
    }

    pub(crate) fn store(&self, credentials: C) {
        *self.stored.lock() = Some(credentials);
    }

    /// Returns whether anything was stored.
    pub(crate) fn clear(&self) -> bool {
        self.stored.lock().take().is_some()
    }

    pub(crate) fn is_stored(&self) -> bool {
        self.stored.lock().is_some()
    }
}

/// The status initializer with its operation type erased.
#[async_trait]
pub(crate) trait InitializeStatus<S>: Send + Sync {
    async fn initialize(&self, cx: &OperationContext<'_, S>) -> Result<S, ClientError>;
}

pub(crate) struct StatusInitializer<O>(pub(crate) O);

#[async_trait]
impl<S, O> InitializeStatus<S> for StatusInitializer<O>
where
    S: Status,
    O: Operation<S, Params = ()>,
    O::Output: Into<Option<S>>,
{
    async fn initialize(&self, cx: &OperationContext<'_, S>) -> Result<S, ClientError> {
        let output = self.0.execute(&(), cx).await?;
        output.into().ok_or(ClientError::EmptyStatus)
    }
}

/// The authentication operation with its type erased. Its output is discarded.
#[async_trait]
pub(crate) trait Authenticate<S, C>: Send + Sync {
    async fn authenticate(
        &self,
        credentials: &C,
        cx: &OperationContext<'_, S>,
    ) -> Result<(), ClientError>;
}

pub(crate) struct Authenticator<O>(pub(crate) O);

#[async_trait]
impl<S, C, O> Authenticate<S, C> for Authenticator<O>
where
    S: Status,
    C: Send + Sync + 'static,
    O: Operation<S, Params = C>,
{
    async fn authenticate(
        &self,
        credentials: &C,
        cx: &OperationContext<'_, S>,
    ) -> Result<(), ClientError> {
        self.0.execute(credentials, cx).await.map(drop)
    }
}
