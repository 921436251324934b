use crate::error::HttpError;
use crate::response::ResponseBody;
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};

/// The narrow request/response seam the client framework talks through.
///
/// An implementation sends one fully built request and hands back the
/// response with its body still unread. All HTTP statuses, including 4xx
/// and 5xx, are returned as `Ok`; `Err` is reserved for failures where no
/// usable response exists (connect, TLS, timeout, invalid URL, ...).
///
/// The response owns the connection: dropping it, on success or on any
/// error path, releases the connection.
///
/// [`HttpClient`](crate::HttpClient) is the production implementation.
/// Tests and alternative stacks can implement this trait directly and build
/// bodies with [`body_from_bytes`](crate::body_from_bytes).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return the response head plus a body stream.
    ///
    /// # Errors
    /// Returns [`HttpError`] for transport-level failures.
    async fn send(&self, request: Request<Bytes>) -> Result<Response<ResponseBody>, HttpError>;
}

#[async_trait]
impl<T> Transport for std::sync::Arc<T>
where
    T: Transport + ?Sized,
{
    async fn send(&self, request: Request<Bytes>) -> Result<Response<ResponseBody>, HttpError> {
        (**self).send(request).await
    }
}
