use super::{ContentType, DEFAULT_CHARSET, resolve_charset};
use crate::error::ContentError;
use bytes::Bytes;

/// Encodes a request value of type `V` as text of some media type.
pub trait BodyProducer<V: ?Sized>: Send + Sync {
    /// Used when the operation does not pin a content type itself.
    fn default_content_type(&self) -> ContentType;

    /// Whether `media_type` (lowercase, no parameters) can be produced.
    fn supports_media_type(&self, media_type: &str) -> bool;

    /// Text formats need a charset to turn their output into bytes.
    fn requires_charset(&self) -> bool {
        true
    }

    /// Encode `value` as text.
    ///
    /// # Errors
    /// Returns [`ContentError::Encode`] when the value cannot be represented.
    fn encode(&self, content_type: &ContentType, value: &V) -> Result<String, ContentError>;
}

/// Encode `value` into request bytes plus the `Content-Type` to send.
///
/// `explicit` overrides the producer's default content type. The result is
/// encoded with the content type's charset; a producer that requires a
/// charset fails when none is declared instead of guessing one.
///
/// # Errors
/// - [`ContentError::UnsupportedMediaType`] if the producer rejects the media type
/// - [`ContentError::MissingCharset`] if a required charset is absent
/// - [`ContentError::UnsupportedCharset`] if the charset is unknown or cannot encode
/// - [`ContentError::Encode`] if the value has characters the charset cannot represent
pub fn produce_body<V, P>(
    producer: &P,
    explicit: Option<&ContentType>,
    value: &V,
) -> Result<(Bytes, ContentType), ContentError>
where
    V: ?Sized,
    P: BodyProducer<V> + ?Sized,
{
    let content_type = explicit
        .cloned()
        .unwrap_or_else(|| producer.default_content_type());

    if !producer.supports_media_type(content_type.media_type()) {
        return Err(ContentError::UnsupportedMediaType(
            content_type.media_type().to_owned(),
        ));
    }

    let charset = match content_type.charset() {
        Some(charset) => charset,
        None if producer.requires_charset() => {
            return Err(ContentError::MissingCharset(content_type.to_string()));
        }
        None => DEFAULT_CHARSET,
    };
    let encoding = resolve_charset(charset)?;

    let text = producer.encode(&content_type, value)?;
    let (bytes, used, unmappable) = encoding.encode(&text);
    // encoding_rs only encodes to ASCII-compatible charsets; UTF-16 falls back to UTF-8
    if used != encoding {
        return Err(ContentError::UnsupportedCharset(charset.to_owned()));
    }
    if unmappable {
        return Err(ContentError::Encode {
            media_type: content_type.media_type().to_owned(),
            reason: format!("value contains characters not representable in {charset}"),
        });
    }

    Ok((Bytes::from(bytes.into_owned()), content_type))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::content::{Form, Json, Text};
    use serde::Serialize;

    #[derive(Serialize)]
    struct Login<'a> {
        user: &'a str,
    }

    #[test]
    fn uses_default_content_type() {
        let (bytes, ct) = produce_body(&Json::new(), None, &Login { user: "ann" }).unwrap();
        assert_eq!(&bytes[..], br#"{"user":"ann"}"#);
        assert_eq!(ct, ContentType::json());
    }

    #[test]
    fn explicit_content_type_wins() {
        let explicit = ContentType::new("application/vnd.api+json").with_charset("utf-8");
        let (_, ct) = produce_body(&Json::new(), Some(&explicit), &Login { user: "ann" }).unwrap();
        assert_eq!(ct, explicit);
    }

    #[test]
    fn missing_charset_fails_fast() {
        let explicit = ContentType::new("text/plain");
        let result = produce_body(&Text::new(), Some(&explicit), "hello");
        assert!(matches!(result, Err(ContentError::MissingCharset(ref ct)) if ct == "text/plain"));
    }

    #[test]
    fn unsupported_media_type() {
        let explicit = ContentType::json();
        let result = produce_body(&Form::new(), Some(&explicit), &[("a", "b")]);
        assert!(matches!(result, Err(ContentError::UnsupportedMediaType(_))));
    }

    #[test]
    fn encodes_with_declared_charset() {
        let explicit = ContentType::text().with_charset("ISO-8859-1");
        let (bytes, _) = produce_body(&Text::new(), Some(&explicit), "café").unwrap();
        assert_eq!(&bytes[..], b"caf\xe9");
    }

    #[test]
    fn unrepresentable_characters_fail() {
        let explicit = ContentType::text().with_charset("ISO-8859-1");
        let result = produce_body(&Text::new(), Some(&explicit), "snow ☃");
        assert!(matches!(result, Err(ContentError::Encode { .. })));
    }

    #[test]
    fn utf16_is_not_an_output_charset() {
        let explicit = ContentType::text().with_charset("UTF-16LE");
        let result = produce_body(&Text::new(), Some(&explicit), "x");
        assert!(matches!(result, Err(ContentError::UnsupportedCharset(_))));
    }
}
