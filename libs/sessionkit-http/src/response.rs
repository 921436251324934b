use crate::error::HttpError;
use bytes::Bytes;
use http::{HeaderMap, Response};
use http_body_util::{BodyExt, Full};

/// Maximum body preview size for error messages (8KB).
///
/// Non-2xx bodies are read at most this far when building an error.
pub const ERROR_BODY_PREVIEW_LIMIT: usize = 8 * 1024;

/// Type-erased response body stream.
///
/// Holds either the raw connection body or a transparently decompressed one.
/// Dropping the body (or the response owning it) releases the underlying
/// connection back to the pool.
pub type ResponseBody =
    http_body_util::combinators::BoxBody<Bytes, Box<dyn std::error::Error + Send + Sync>>;

/// Build a [`ResponseBody`] from an in-memory buffer.
///
/// Intended for custom [`Transport`](crate::Transport) implementations and
/// test doubles.
#[must_use]
pub fn body_from_bytes(bytes: impl Into<Bytes>) -> ResponseBody {
    Full::new(bytes.into())
        .map_err(|never| match never {})
        .boxed()
}

/// Raw `Content-Type` header value, if present and valid ASCII.
#[must_use]
pub fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
}

/// Read the whole body of `response`, failing once more than `limit` bytes
/// have been seen.
///
/// The limit applies to decompressed bytes, so a small compressed payload
/// that inflates past the limit is rejected.
///
/// # Errors
/// Returns [`HttpError::BodyTooLarge`] if the limit is exceeded and
/// [`HttpError::Transport`] if the body stream fails.
pub async fn read_body_limited(
    response: Response<ResponseBody>,
    limit: usize,
) -> Result<Bytes, HttpError> {
    let (_parts, body) = response.into_parts();
    read_limited(body, limit).await
}

/// Read at most `limit` bytes for an error preview.
///
/// Never fails on size: an oversized body yields a marker string.
///
/// # Errors
/// Returns [`HttpError::Transport`] if the body stream fails.
pub async fn read_body_preview(body: ResponseBody, limit: usize) -> Result<String, HttpError> {
    match read_limited(body, limit).await {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(HttpError::BodyTooLarge { .. }) => Ok("<body too large for preview>".to_owned()),
        Err(e) => Err(e),
    }
}

async fn read_limited(body: ResponseBody, limit: usize) -> Result<Bytes, HttpError> {
    let mut collected = Vec::new();
    let mut body = std::pin::pin!(body);

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(HttpError::Transport)?;
        if let Some(chunk) = frame.data_ref() {
            if collected.len() + chunk.len() > limit {
                return Err(HttpError::BodyTooLarge {
                    limit,
                    actual: collected.len() + chunk.len(),
                });
            }
            collected.extend_from_slice(chunk);
        }
    }

    Ok(Bytes::from(collected))
}
