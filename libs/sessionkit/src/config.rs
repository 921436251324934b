use crate::auth::AuthPolicy;
use crate::error::ClientError;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use sessionkit_http::HttpClientConfig;
use std::path::Path;
use url::Url;

/// Prefix of environment variables read by [`ClientConfig::load`].
pub const ENV_PREFIX: &str = "SESSIONKIT_";

/// Declarative client configuration.
///
/// ```yaml
/// base_uri: https://api.example.com/v2/
/// auto_renew: true
/// http:
///   request_timeout: 10s
///   user_agent: my-app/1.0
/// ```
///
/// Environment overrides use the `SESSIONKIT_` prefix with `__` between
/// nesting levels, e.g. `SESSIONKIT_HTTP__REQUEST_TIMEOUT=5s`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Base URI every operation URI is resolved against. Required.
    pub base_uri: Option<Url>,
    pub store_credentials: bool,
    pub auto_renew: bool,
    /// Transport settings; `http.max_body_size` also caps parsed responses.
    pub http: HttpClientConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let policy = AuthPolicy::default();
        Self {
            base_uri: None,
            store_credentials: policy.store_credentials,
            auto_renew: policy.auto_renew,
            http: HttpClientConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults, then the YAML file at `path` if given, then `SESSIONKIT_*`
    /// environment variables.
    ///
    /// # Errors
    /// Returns [`ClientError::Config`] if a source cannot be read or the
    /// merged result is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ClientError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file_exact(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(&figment)
    }

    /// Extract and validate from an arbitrary figment.
    ///
    /// # Errors
    /// Returns [`ClientError::Config`] on extraction or validation failure.
    pub fn from_figment(figment: &Figment) -> Result<Self, ClientError> {
        let config: Self = figment
            .extract()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns [`ClientError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ClientError> {
        let Some(base_uri) = &self.base_uri else {
            return Err(ClientError::Config("base_uri is required".to_owned()));
        };
        if base_uri.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "base_uri '{base_uri}' cannot be used as a base URI"
            )));
        }
        if self.http.max_body_size == 0 {
            return Err(ClientError::Config(
                "http.max_body_size must be greater than zero".to_owned(),
            ));
        }
        if self.http.request_timeout.is_zero() {
            return Err(ClientError::Config(
                "http.request_timeout must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn policy(&self) -> AuthPolicy {
        AuthPolicy {
            store_credentials: self.store_credentials,
            auto_renew: self.auto_renew,
        }
    }
}
