use crate::auth::{
    AuthPolicy, Authenticate, Authenticator, CredentialStore, InitializeStatus, StatusInitializer,
};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::operation::uri::normalize_base;
use crate::operation::{Operation, OperationContext, Session};
use crate::status::{Status, StatusCell};
use sessionkit_http::{HttpClientBuilder, HttpClientConfig, Transport};
use std::sync::Arc;
use tokio::sync::Mutex;
use url::Url;

struct ClientInner<S, C> {
    transport: Arc<dyn Transport>,
    base_uri: Url,
    max_body_size: usize,
    policy: AuthPolicy,
    status: StatusCell<S>,
    credentials: CredentialStore<C>,
    // single-flight for authentication started by `ensure_authenticated`
    auth_lock: Mutex<()>,
    initializer: Option<Arc<dyn InitializeStatus<S>>>,
    authenticator: Option<Arc<dyn Authenticate<S, C>>>,
}

/// Entry point for executing operations against one service.
///
/// A client owns the transport, the base URI, at most one [`Status`] and at
/// most one set of stored credentials `C`. It is cheap to clone; clones
/// share all of that.
///
/// Every call runs on the caller's task: nothing is spawned, and the only
/// waiting besides network I/O is on the status lock (initialize, set,
/// reset) and the authentication lock.
///
/// ```ignore
/// let client = Client::<MySession, BasicCredentials>::builder(base_uri)
///     .status_initializer(open_session)
///     .authenticator(login)
///     .build()?;
///
/// client.authenticate(BasicCredentials::new("ann", "pw")).await?;
/// let profile = client.execute(&get_profile, &()).await?;
/// ```
pub struct Client<S = (), C = ()> {
    inner: Arc<ClientInner<S, C>>,
}

impl<S, C> Clone for Client<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, C> std::fmt::Debug for Client<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_uri", &self.inner.base_uri.as_str())
            .field("policy", &self.inner.policy)
            .field("status", &self.inner.status)
            .finish_non_exhaustive()
    }
}

impl<S, C> Client<S, C>
where
    S: Status,
    C: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn builder(base_uri: Url) -> ClientBuilder<S, C> {
        ClientBuilder::new(base_uri)
    }

    #[must_use]
    pub fn base_uri(&self) -> &Url {
        &self.inner.base_uri
    }

    #[must_use]
    pub fn policy(&self) -> AuthPolicy {
        self.inner.policy
    }

    fn context(&self, status: Option<Arc<S>>) -> OperationContext<'_, S> {
        OperationContext::new(
            self.inner.transport.as_ref(),
            &self.inner.base_uri,
            self.inner.max_body_size,
        )
        .with_status(status)
    }

    /// Execute `operation` with `params`.
    ///
    /// Depending on [`Operation::session`]:
    /// - independent operations run directly
    /// - status operations run after [`ensure_initialized`](Self::ensure_initialized)
    /// - authenticated operations run after
    ///   [`ensure_authenticated`](Self::ensure_authenticated); if the service
    ///   reports the session expired, the status's authentication is reset
    ///   and, when auto-renew is on and credentials are stored, the client
    ///   authenticates once more and retries the operation exactly once
    ///
    /// # Errors
    /// Whatever the operation or the lifecycle steps before it report.
    pub async fn execute<O>(&self, operation: &O, params: &O::Params) -> Result<O::Output, ClientError>
    where
        O: Operation<S> + ?Sized,
    {
        match operation.session() {
            Session::Independent => operation.execute(params, &self.context(None)).await,
            Session::Status => {
                let status = self.ensure_initialized().await?;
                operation.execute(params, &self.context(Some(status))).await
            }
            Session::Authenticated => self.execute_authenticated(operation, params).await,
        }
    }

    async fn execute_authenticated<O>(
        &self,
        operation: &O,
        params: &O::Params,
    ) -> Result<O::Output, ClientError>
    where
        O: Operation<S> + ?Sized,
    {
        if !self.ensure_authenticated().await? {
            return Err(ClientError::AuthenticationRequired(
                "status is not authenticated after authentication".to_owned(),
            ));
        }

        let status = self.ensure_initialized().await?;
        let err = match operation
            .execute(params, &self.context(Some(Arc::clone(&status))))
            .await
        {
            Err(err) if err.is_authentication_expired() => err,
            other => return other,
        };

        status.reset_authentication();
        if !self.inner.policy.auto_renew || !self.has_stored_credentials() {
            tracing::debug!(
                auto_renew = self.inner.policy.auto_renew,
                "session expired; not renewing"
            );
            return Err(err);
        }

        tracing::warn!("session expired; re-authenticating with stored credentials");
        self.authenticate_stored().await?;

        let status = self.ensure_initialized().await?;
        operation.execute(params, &self.context(Some(status))).await
    }

    /// The current status, if one has been initialized. Never blocks.
    #[must_use]
    pub fn get_status(&self) -> Option<Arc<S>> {
        self.inner.status.get()
    }

    /// Number of statuses installed over the client's lifetime.
    #[must_use]
    pub fn status_epoch(&self) -> u64 {
        self.inner.status.epoch()
    }

    /// Return the status, running the status initializer if there is none.
    ///
    /// Concurrent callers share one initialization. On failure nothing is
    /// cached and the next call tries again.
    ///
    /// # Errors
    /// - [`ClientError::Config`] if no initializer is configured
    /// - [`ClientError::EmptyStatus`] if the initializer produced nothing
    /// - any error of the initializer itself
    pub async fn ensure_initialized(&self) -> Result<Arc<S>, ClientError> {
        self.inner
            .status
            .get_or_try_init(|| async {
                let Some(initializer) = &self.inner.initializer else {
                    return Err(ClientError::Config(
                        "no status initializer configured".to_owned(),
                    ));
                };
                tracing::debug!("initializing status");
                let status = initializer.initialize(&self.context(None)).await?;
                tracing::info!("status initialized");
                Ok(status)
            })
            .await
    }

    /// Replace the status. Stored credentials are kept.
    pub async fn set_status(&self, status: S) -> Arc<S> {
        self.inner.status.set(status).await
    }

    /// Discard the status; the next session-dependent call initializes a
    /// fresh one. Stored credentials are kept.
    pub async fn reset_status(&self) {
        if self.inner.status.reset().await {
            tracing::debug!("status reset");
        }
    }

    #[must_use]
    pub fn has_stored_credentials(&self) -> bool {
        self.inner.credentials.is_stored()
    }

    pub fn clear_stored_credentials(&self) {
        self.inner.credentials.clear();
    }

    /// Authenticate with `credentials`.
    ///
    /// Ensures a status first, then runs the authentication operation
    /// against it. On success the credentials are stored if the policy says
    /// so. If the service rejects them, any stored credentials are dropped.
    ///
    /// # Errors
    /// - [`ClientError::Config`] if no authentication operation is configured
    /// - [`ClientError::CredentialsInvalid`] if the credentials were refused
    /// - any error of status initialization or the operation
    pub async fn authenticate(&self, credentials: C) -> Result<(), ClientError> {
        let Some(authenticator) = &self.inner.authenticator else {
            return Err(ClientError::Config(
                "no authentication operation configured".to_owned(),
            ));
        };
        let status = self.ensure_initialized().await?;

        match authenticator
            .authenticate(&credentials, &self.context(Some(Arc::clone(&status))))
            .await
        {
            Ok(()) => {
                if self.inner.policy.store_credentials {
                    self.inner.credentials.store(credentials);
                }
                tracing::info!(
                    authenticated = status.is_authenticated(),
                    "authentication succeeded"
                );
                Ok(())
            }
            Err(err) if err.is_credentials_invalid() => {
                if self.inner.credentials.clear() {
                    tracing::warn!("credentials rejected; stored credentials discarded");
                } else {
                    tracing::warn!("credentials rejected");
                }
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Authenticate with the stored credentials.
    ///
    /// # Errors
    /// [`ClientError::CredentialsNotStored`] if nothing is stored, otherwise
    /// as [`authenticate`](Self::authenticate).
    pub async fn authenticate_stored(&self) -> Result<(), ClientError> {
        let credentials = self
            .inner
            .credentials
            .get()
            .ok_or(ClientError::CredentialsNotStored)?;
        self.authenticate(credentials).await
    }

    /// Make sure the status is authenticated, using stored credentials if
    /// it is not. Returns the authenticated state afterwards.
    ///
    /// Concurrent callers on an unauthenticated status trigger a single
    /// authentication.
    ///
    /// # Errors
    /// [`ClientError::CredentialsNotStored`] if authentication is needed
    /// and nothing is stored, otherwise as
    /// [`authenticate_stored`](Self::authenticate_stored).
    pub async fn ensure_authenticated(&self) -> Result<bool, ClientError> {
        if self.ensure_initialized().await?.is_authenticated() {
            return Ok(true);
        }

        let _guard = self.inner.auth_lock.lock().await;
        if !self.ensure_initialized().await?.is_authenticated() {
            self.authenticate_stored().await?;
        }
        Ok(self
            .get_status()
            .is_some_and(|status| status.is_authenticated()))
    }

    /// Drop the authentication of the current status and the stored
    /// credentials. The status itself stays.
    pub fn logout(&self) {
        if let Some(status) = self.get_status() {
            status.reset_authentication();
        }
        if self.inner.credentials.clear() {
            tracing::debug!("stored credentials cleared");
        }
        tracing::info!("logged out");
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder<S, C> {
    base_uri: Url,
    transport: Option<Arc<dyn Transport>>,
    http: HttpClientConfig,
    max_body_size: Option<usize>,
    policy: AuthPolicy,
    initializer: Option<Arc<dyn InitializeStatus<S>>>,
    authenticator: Option<Arc<dyn Authenticate<S, C>>>,
}

impl<S, C> ClientBuilder<S, C>
where
    S: Status,
    C: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(base_uri: Url) -> Self {
        Self {
            base_uri,
            transport: None,
            http: HttpClientConfig::default(),
            max_body_size: None,
            policy: AuthPolicy::default(),
            initializer: None,
            authenticator: None,
        }
    }

    /// Start from a loaded configuration.
    ///
    /// # Errors
    /// Returns [`ClientError::Config`] if the configuration does not validate.
    pub fn from_config(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let policy = config.policy();
        let Some(base_uri) = config.base_uri else {
            return Err(ClientError::Config("base_uri is required".to_owned()));
        };
        Ok(Self {
            policy,
            http: config.http,
            ..Self::new(base_uri)
        })
    }

    /// Use `transport` instead of building an [`HttpClient`](sessionkit_http::HttpClient).
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Settings for the built-in transport. Ignored when a transport is given.
    #[must_use]
    pub fn http_config(mut self, config: HttpClientConfig) -> Self {
        self.http = config;
        self
    }

    /// Largest response body operations read. Defaults to `http.max_body_size`.
    #[must_use]
    pub fn max_body_size(mut self, limit: usize) -> Self {
        self.max_body_size = Some(limit);
        self
    }

    #[must_use]
    pub fn store_credentials(mut self, store: bool) -> Self {
        self.policy.store_credentials = store;
        self
    }

    #[must_use]
    pub fn auto_renew(mut self, renew: bool) -> Self {
        self.policy.auto_renew = renew;
        self
    }

    /// The operation that produces a fresh status. Its output may be `S`
    /// or `Option<S>`; an empty result is reported as
    /// [`ClientError::EmptyStatus`].
    #[must_use]
    pub fn status_initializer<O>(mut self, operation: O) -> Self
    where
        O: Operation<S, Params = ()> + 'static,
        O::Output: Into<Option<S>>,
    {
        self.initializer = Some(Arc::new(StatusInitializer(operation)));
        self
    }

    /// The operation that authenticates the status with credentials `C`.
    /// It is expected to leave the status authenticated on success and to
    /// report refused credentials as [`ClientError::CredentialsInvalid`].
    #[must_use]
    pub fn authenticator<O>(mut self, operation: O) -> Self
    where
        O: Operation<S, Params = C> + 'static,
    {
        self.authenticator = Some(Arc::new(Authenticator(operation)));
        self
    }

    /// Build the client. Without an explicit transport this builds an
    /// [`HttpClient`](sessionkit_http::HttpClient) and must run inside a
    /// tokio runtime.
    ///
    /// # Errors
    /// - [`ClientError::InvalidUri`] if the base URI cannot serve as a base
    /// - [`ClientError::Config`] for a zero body limit
    /// - [`ClientError::Transport`] if the HTTP client cannot be built
    pub fn build(self) -> Result<Client<S, C>, ClientError> {
        let base_uri = normalize_base(self.base_uri)?;
        let max_body_size = self.max_body_size.unwrap_or(self.http.max_body_size);
        if max_body_size == 0 {
            return Err(ClientError::Config(
                "max_body_size must be greater than zero".to_owned(),
            ));
        }

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpClientBuilder::with_config(self.http).build()?),
        };

        tracing::debug!(base_uri = %base_uri, policy = ?self.policy, "client built");
        Ok(Client {
            inner: Arc::new(ClientInner {
                transport,
                base_uri,
                max_body_size,
                policy: self.policy,
                status: StatusCell::new(),
                credentials: CredentialStore::new(),
                auth_lock: Mutex::new(()),
                initializer: self.initializer,
                authenticator: self.authenticator,
            }),
        })
    }
}

impl<S, C> std::fmt::Debug for ClientBuilder<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("base_uri", &self.base_uri.as_str())
            .field("policy", &self.policy)
            .field("has_transport", &self.transport.is_some())
            .field("has_initializer", &self.initializer.is_some())
            .field("has_authenticator", &self.authenticator.is_some())
            .finish_non_exhaustive()
    }
}
