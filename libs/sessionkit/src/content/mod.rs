//! Content negotiation: media types, charsets and body formats.
//!
//! A [`BodyParser`] turns a response body into a typed value and a
//! [`BodyProducer`] does the reverse for request bodies. Both declare a
//! default [`ContentType`] and which media types they accept;
//! [`parse_body`] and [`produce_body`] apply the fallback and charset rules
//! around them so individual formats only deal with text.

mod formats;
mod parser;
mod producer;

pub use formats::{Form, Json, Text, Xml};
pub use parser::{BodyParser, parse_body};
pub use producer::{BodyProducer, produce_body};

use crate::error::ContentError;
use encoding_rs::Encoding;
use std::fmt;

/// Charset used whenever neither the message nor the format declares one.
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// A media type with an optional charset, e.g. `application/json; charset=UTF-8`.
///
/// The media type is stored lowercased without parameters; other parameters
/// of a parsed header value are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    media_type: String,
    charset: Option<String>,
}

impl ContentType {
    /// Content type without a charset.
    #[must_use]
    pub fn new(media_type: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into().to_ascii_lowercase(),
            charset: None,
        }
    }

    /// Same media type with the given charset.
    #[must_use]
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Same media type with the charset removed.
    #[must_use]
    pub fn without_charset(mut self) -> Self {
        self.charset = None;
        self
    }

    /// `application/json; charset=UTF-8`
    #[must_use]
    pub fn json() -> Self {
        Self::new(mime::APPLICATION_JSON.essence_str()).with_charset(DEFAULT_CHARSET)
    }

    /// `application/xml; charset=UTF-8`
    #[must_use]
    pub fn xml() -> Self {
        Self::new("application/xml").with_charset(DEFAULT_CHARSET)
    }

    /// `application/x-www-form-urlencoded; charset=UTF-8`
    #[must_use]
    pub fn form() -> Self {
        Self::new(mime::APPLICATION_WWW_FORM_URLENCODED.essence_str()).with_charset(DEFAULT_CHARSET)
    }

    /// `text/plain; charset=UTF-8`
    #[must_use]
    pub fn text() -> Self {
        Self::new(mime::TEXT_PLAIN.essence_str()).with_charset(DEFAULT_CHARSET)
    }

    /// Parse a `Content-Type` header value.
    ///
    /// The media type and the charset label come back lowercased; other
    /// parameters are dropped.
    ///
    /// # Errors
    /// Returns [`ContentError::UnsupportedMediaType`] if the value is not a
    /// syntactically valid media type.
    pub fn parse(raw: &str) -> Result<Self, ContentError> {
        let parsed: mime::Mime = raw
            .trim()
            .parse()
            .map_err(|_| ContentError::UnsupportedMediaType(raw.to_owned()))?;

        Ok(Self {
            media_type: parsed.essence_str().to_owned(),
            charset: parsed
                .get_param(mime::CHARSET)
                .map(|name| name.as_str().to_owned()),
        })
    }

    #[must_use]
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    /// Whether the media type uses the given structured syntax suffix
    /// (`application/problem+json` has suffix `json`).
    #[must_use]
    pub fn has_suffix(&self, suffix: &str) -> bool {
        has_suffix(&self.media_type, suffix)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.charset {
            Some(charset) => write!(f, "{}; charset={charset}", self.media_type),
            None => f.write_str(&self.media_type),
        }
    }
}

impl std::str::FromStr for ContentType {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

pub(crate) fn has_suffix(media_type: &str, suffix: &str) -> bool {
    media_type
        .rsplit_once('+')
        .is_some_and(|(_, s)| s.eq_ignore_ascii_case(suffix))
}

/// Look up an encoding by its charset label (`utf-8`, `ISO-8859-1`, ...).
///
/// # Errors
/// Returns [`ContentError::UnsupportedCharset`] for unknown labels.
pub fn resolve_charset(label: &str) -> Result<&'static Encoding, ContentError> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| ContentError::UnsupportedCharset(label.to_owned()))
}
