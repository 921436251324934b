use http::StatusCode;
use sessionkit_http::HttpError;
use thiserror::Error;

/// Failures while negotiating, decoding or encoding a message body.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentError {
    /// The parser or producer does not handle this media type.
    #[error("unsupported media type '{0}'")]
    UnsupportedMediaType(String),

    /// The charset label is unknown or cannot be used for encoding.
    #[error("unsupported charset '{0}'")]
    UnsupportedCharset(String),

    /// A charset-dependent encoding was requested without a charset.
    #[error("content type '{0}' declares no charset")]
    MissingCharset(String),

    /// The format decoder rejected the body.
    #[error("failed to decode {media_type} body: {reason}")]
    Decode { media_type: String, reason: String },

    /// The format encoder rejected the value.
    #[error("failed to encode {media_type} body: {reason}")]
    Encode { media_type: String, reason: String },
}

/// Every failure a client call can surface.
///
/// Raw transport and parser errors never leave an operation unwrapped; they
/// arrive here as [`ClientError::Transport`] and [`ClientError::Content`].
///
/// The authentication variants form two families, matched by
/// [`is_authentication_required`](Self::is_authentication_required) and
/// [`is_authentication_failed`](Self::is_authentication_failed):
///
/// | family   | variants |
/// |----------|----------|
/// | required | `AuthenticationRequired`, `AuthenticationExpired`, `CredentialsNotStored` |
/// | failed   | `AuthenticationFailed`, `CredentialsInvalid` |
///
/// `AuthenticationExpired` is the only error that triggers the one-shot
/// re-authentication in [`Client::execute`](crate::Client::execute).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// Building, sending or reading the exchange failed at transport level.
    #[error("transport failure: {0}")]
    Transport(#[from] HttpError),

    /// The target URI could not be resolved against the base URI.
    #[error("invalid URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// The service answered with a non-2xx status.
    #[error("HTTP {status}: {body_preview}")]
    ResponseStatus {
        status: StatusCode,
        body_preview: String,
        content_type: Option<String>,
    },

    /// No parser/producer accepts the declared media type.
    #[error("unsupported content type '{0}'")]
    UnsupportedContentType(String),

    /// The body could not be decoded or encoded.
    #[error("body processing failed: {0}")]
    Content(ContentError),

    /// An authenticated exchange was attempted without an authenticated status.
    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    /// The service invalidated a previously valid session.
    #[error("authentication expired: {0}")]
    AuthenticationExpired(String),

    /// `authenticate_stored` was called with nothing stored.
    #[error("authentication required: no credentials stored")]
    CredentialsNotStored,

    /// An authentication attempt failed.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The service rejected the supplied credentials.
    #[error("authentication failed: credentials rejected: {0}")]
    CredentialsInvalid(String),

    /// A session-dependent operation ran without a resolved status.
    #[error("status has not been initialized")]
    StatusNotInitialized,

    /// The status initializer completed without producing a status.
    #[error("status initializer produced no status")]
    EmptyStatus,

    /// The client is misconfigured.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<ContentError> for ClientError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::UnsupportedMediaType(media_type) => {
                ClientError::UnsupportedContentType(media_type)
            }
            other => ClientError::Content(other),
        }
    }
}

impl ClientError {
    /// "Never authenticated", "expired" or "nothing stored to authenticate with".
    #[must_use]
    pub fn is_authentication_required(&self) -> bool {
        matches!(
            self,
            ClientError::AuthenticationRequired(_)
                | ClientError::AuthenticationExpired(_)
                | ClientError::CredentialsNotStored
        )
    }

    #[must_use]
    pub fn is_authentication_expired(&self) -> bool {
        matches!(self, ClientError::AuthenticationExpired(_))
    }

    /// The authentication attempt itself failed.
    #[must_use]
    pub fn is_authentication_failed(&self) -> bool {
        matches!(
            self,
            ClientError::AuthenticationFailed(_) | ClientError::CredentialsInvalid(_)
        )
    }

    #[must_use]
    pub fn is_credentials_invalid(&self) -> bool {
        matches!(self, ClientError::CredentialsInvalid(_))
    }

    /// HTTP status of a [`ClientError::ResponseStatus`].
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::ResponseStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
