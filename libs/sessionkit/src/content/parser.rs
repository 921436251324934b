use super::{ContentType, DEFAULT_CHARSET, resolve_charset};
use crate::error::ContentError;
use std::sync::Arc;

/// Decodes response text of a family of media types into `T`.
pub trait BodyParser<T>: Send + Sync {
    /// Assumed when the response declares no content type. Its media type
    /// is also sent as the default `Accept` header.
    fn default_content_type(&self) -> ContentType;

    /// Whether `media_type` (lowercase, no parameters) can be decoded.
    fn supports_media_type(&self, media_type: &str) -> bool;

    /// Decode already charset-decoded text.
    ///
    /// # Errors
    /// Returns [`ContentError::Decode`] when the text is malformed for the format.
    fn decode(&self, content_type: &ContentType, text: &str) -> Result<T, ContentError>;
}

impl<T, P> BodyParser<T> for Arc<P>
where
    P: BodyParser<T> + ?Sized,
{
    fn default_content_type(&self) -> ContentType {
        (**self).default_content_type()
    }

    fn supports_media_type(&self, media_type: &str) -> bool {
        (**self).supports_media_type(media_type)
    }

    fn decode(&self, content_type: &ContentType, text: &str) -> Result<T, ContentError> {
        (**self).decode(content_type, text)
    }
}

/// Decode a response body with `parser`.
///
/// The effective content type is the declared one, or the parser's default
/// when the response declares none. Its charset falls back to the parser's
/// default charset and finally to UTF-8. An empty body yields `None`
/// without consulting the format.
///
/// # Errors
/// - [`ContentError::UnsupportedMediaType`] if the declared value is
///   malformed or the parser does not accept its media type
/// - [`ContentError::UnsupportedCharset`] for an unknown charset label
/// - whatever the parser's `decode` reports
pub fn parse_body<T, P>(
    parser: &P,
    declared: Option<&str>,
    body: &[u8],
) -> Result<Option<T>, ContentError>
where
    P: BodyParser<T> + ?Sized,
{
    let fallback = parser.default_content_type();
    let content_type = match declared.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => ContentType::parse(raw)?,
        None => fallback.clone(),
    };

    if !parser.supports_media_type(content_type.media_type()) {
        return Err(ContentError::UnsupportedMediaType(
            content_type.media_type().to_owned(),
        ));
    }

    let content_type = match content_type.charset() {
        Some(_) => content_type,
        None => {
            let charset = fallback.charset().unwrap_or(DEFAULT_CHARSET).to_owned();
            content_type.with_charset(charset)
        }
    };

    if body.is_empty() {
        return Ok(None);
    }

    let charset = content_type.charset().unwrap_or(DEFAULT_CHARSET);
    let encoding = resolve_charset(charset)?;
    let (text, had_errors) = encoding.decode_with_bom_removal(body);
    if had_errors {
        tracing::debug!(
            charset,
            media_type = content_type.media_type(),
            "response body contained malformed sequences; replaced"
        );
    }

    parser.decode(&content_type, &text).map(Some)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::content::{Json, Text};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        name: String,
    }

    #[test]
    fn missing_content_type_falls_back_to_parser_default() {
        let item: Option<Item> = parse_body(&Json::new(), None, br#"{"name":"a"}"#).unwrap();
        assert_eq!(item, Some(Item { name: "a".into() }));

        let item: Option<Item> = parse_body(&Json::new(), Some("  "), br#"{"name":"b"}"#).unwrap();
        assert_eq!(item, Some(Item { name: "b".into() }));
    }

    #[test]
    fn unsupported_media_type_is_rejected_before_decoding() {
        let result: Result<Option<Item>, _> =
            parse_body(&Json::new(), Some("image/png"), br#"{"name":"a"}"#);
        assert!(matches!(
            result,
            Err(ContentError::UnsupportedMediaType(ref m)) if m == "image/png"
        ));
    }

    #[test]
    fn malformed_content_type_is_unsupported() {
        let result: Result<Option<String>, _> = parse_body(&Text::new(), Some("???"), b"x");
        assert!(matches!(result, Err(ContentError::UnsupportedMediaType(_))));
    }

    #[test]
    fn empty_body_is_none() {
        let item: Option<Item> = parse_body(&Json::new(), Some("application/json"), b"").unwrap();
        assert_eq!(item, None);
    }

    #[test]
    fn declared_charset_is_used() {
        // "café" in ISO-8859-1
        let body = b"caf\xe9";
        let text: Option<String> =
            parse_body(&Text::new(), Some("text/plain; charset=ISO-8859-1"), body).unwrap();
        assert_eq!(text.as_deref(), Some("café"));
    }

    #[test]
    fn missing_charset_defaults_to_parser_charset() {
        let text: Option<String> =
            parse_body(&Text::new(), Some("text/plain"), "café".as_bytes()).unwrap();
        assert_eq!(text.as_deref(), Some("café"));
    }

    #[test]
    fn missing_content_type_uses_parser_default_charset() {
        let latin1 = Text::with_default(ContentType::text().with_charset("ISO-8859-1"));
        let text: Option<String> = parse_body(&latin1, None, b"caf\xe9").unwrap();
        assert_eq!(text.as_deref(), Some("café"));
    }

    #[test]
    fn declared_type_without_charset_uses_parser_default_charset() {
        let latin1 = Text::with_default(ContentType::text().with_charset("ISO-8859-1"));
        let text: Option<String> = parse_body(&latin1, Some("text/plain"), b"caf\xe9").unwrap();
        assert_eq!(text.as_deref(), Some("café"));
    }

    #[test]
    fn unknown_charset_is_reported() {
        let result: Result<Option<String>, _> =
            parse_body(&Text::new(), Some("text/plain; charset=x-unknown"), b"abc");
        assert!(matches!(result, Err(ContentError::UnsupportedCharset(_))));
    }

    #[test]
    fn utf8_bom_is_stripped() {
        let text: Option<String> =
            parse_body(&Text::new(), None, b"\xef\xbb\xbfhello").unwrap();
        assert_eq!(text.as_deref(), Some("hello"));
    }

    #[test]
    fn works_through_shared_parser() {
        let parser: Arc<dyn BodyParser<String>> = Arc::new(Text::new());
        let text = parse_body(&parser, None, b"shared").unwrap();
        assert_eq!(text.as_deref(), Some("shared"));
    }
}
