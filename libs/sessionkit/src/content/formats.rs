//! Built-in text formats. Each one is both a [`BodyParser`] and a
//! [`BodyProducer`] and can be given a different default content type.

use super::{BodyParser, BodyProducer, ContentType, has_suffix};
use crate::error::ContentError;
use serde::Serialize;
use serde::de::DeserializeOwned;

fn decode_error(content_type: &ContentType, err: impl std::fmt::Display) -> ContentError {
    ContentError::Decode {
        media_type: content_type.media_type().to_owned(),
        reason: err.to_string(),
    }
}

fn encode_error(content_type: &ContentType, err: impl std::fmt::Display) -> ContentError {
    ContentError::Encode {
        media_type: content_type.media_type().to_owned(),
        reason: err.to_string(),
    }
}

macro_rules! format_defaults {
    ($name:ident, $default:expr) => {
        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self {
                    default: $default,
                }
            }

            /// Use `content_type` as the default instead.
            #[must_use]
            pub fn with_default(content_type: ContentType) -> Self {
                Self {
                    default: content_type,
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

/// JSON via `serde_json`: `application/json` and any `+json` type.
#[derive(Debug, Clone)]
pub struct Json {
    default: ContentType,
}

format_defaults!(Json, ContentType::json());

fn is_json(media_type: &str) -> bool {
    media_type == mime::APPLICATION_JSON.essence_str() || has_suffix(media_type, "json")
}

impl<T: DeserializeOwned> BodyParser<T> for Json {
    fn default_content_type(&self) -> ContentType {
        self.default.clone()
    }

    fn supports_media_type(&self, media_type: &str) -> bool {
        is_json(media_type)
    }

    fn decode(&self, content_type: &ContentType, text: &str) -> Result<T, ContentError> {
        serde_json::from_str(text).map_err(|e| decode_error(content_type, e))
    }
}

impl<V: Serialize + ?Sized> BodyProducer<V> for Json {
    fn default_content_type(&self) -> ContentType {
        self.default.clone()
    }

    fn supports_media_type(&self, media_type: &str) -> bool {
        is_json(media_type)
    }

    fn encode(&self, content_type: &ContentType, value: &V) -> Result<String, ContentError> {
        serde_json::to_string(value).map_err(|e| encode_error(content_type, e))
    }
}

/// XML via `quick-xml`'s serde support: `application/xml`, `text/xml` and
/// any `+xml` type.
#[derive(Debug, Clone)]
pub struct Xml {
    default: ContentType,
}

format_defaults!(Xml, ContentType::xml());

fn is_xml(media_type: &str) -> bool {
    matches!(media_type, "application/xml" | "text/xml") || has_suffix(media_type, "xml")
}

impl<T: DeserializeOwned> BodyParser<T> for Xml {
    fn default_content_type(&self) -> ContentType {
        self.default.clone()
    }

    fn supports_media_type(&self, media_type: &str) -> bool {
        is_xml(media_type)
    }

    fn decode(&self, content_type: &ContentType, text: &str) -> Result<T, ContentError> {
        quick_xml::de::from_str(text).map_err(|e| decode_error(content_type, e))
    }
}

impl<V: Serialize + ?Sized> BodyProducer<V> for Xml {
    fn default_content_type(&self) -> ContentType {
        self.default.clone()
    }

    fn supports_media_type(&self, media_type: &str) -> bool {
        is_xml(media_type)
    }

    fn encode(&self, content_type: &ContentType, value: &V) -> Result<String, ContentError> {
        quick_xml::se::to_string(value).map_err(|e| encode_error(content_type, e))
    }
}

/// `application/x-www-form-urlencoded` via `serde_urlencoded`.
///
/// Any serde value that flattens to key/value pairs works: structs, maps
/// and slices of pairs.
#[derive(Debug, Clone)]
pub struct Form {
    default: ContentType,
}

format_defaults!(Form, ContentType::form());

fn is_form(media_type: &str) -> bool {
    media_type == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str()
}

impl<T: DeserializeOwned> BodyParser<T> for Form {
    fn default_content_type(&self) -> ContentType {
        self.default.clone()
    }

    fn supports_media_type(&self, media_type: &str) -> bool {
        is_form(media_type)
    }

    fn decode(&self, content_type: &ContentType, text: &str) -> Result<T, ContentError> {
        serde_urlencoded::from_str(text).map_err(|e| decode_error(content_type, e))
    }
}

impl<V: Serialize + ?Sized> BodyProducer<V> for Form {
    fn default_content_type(&self) -> ContentType {
        self.default.clone()
    }

    fn supports_media_type(&self, media_type: &str) -> bool {
        is_form(media_type)
    }

    fn encode(&self, content_type: &ContentType, value: &V) -> Result<String, ContentError> {
        serde_urlencoded::to_string(value).map_err(|e| encode_error(content_type, e))
    }
}

/// Any `text/*` body, passed through as a `String`.
#[derive(Debug, Clone)]
pub struct Text {
    default: ContentType,
}

format_defaults!(Text, ContentType::text());

fn is_text(media_type: &str) -> bool {
    media_type.starts_with("text/")
}

impl BodyParser<String> for Text {
    fn default_content_type(&self) -> ContentType {
        self.default.clone()
    }

    fn supports_media_type(&self, media_type: &str) -> bool {
        is_text(media_type)
    }

    fn decode(&self, _content_type: &ContentType, text: &str) -> Result<String, ContentError> {
        Ok(text.to_owned())
    }
}

impl BodyProducer<str> for Text {
    fn default_content_type(&self) -> ContentType {
        self.default.clone()
    }

    fn supports_media_type(&self, media_type: &str) -> bool {
        is_text(media_type)
    }

    fn encode(&self, _content_type: &ContentType, value: &str) -> Result<String, ContentError> {
        Ok(value.to_owned())
    }
}

impl BodyProducer<String> for Text {
    fn default_content_type(&self) -> ContentType {
        self.default.clone()
    }

    fn supports_media_type(&self, media_type: &str) -> bool {
        is_text(media_type)
    }

    fn encode(&self, _content_type: &ContentType, value: &String) -> Result<String, ContentError> {
        Ok(value.clone())
    }
}
