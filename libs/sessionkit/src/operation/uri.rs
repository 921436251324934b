use crate::error::ClientError;
use url::Url;

/// Resolve `reference` against `base` the RFC 3986 way.
///
/// An absolute reference replaces the base, `/path` keeps only the base's
/// scheme and authority, and `sub/path` is appended to a base path ending
/// in `/`.
///
/// # Errors
/// Returns [`ClientError::InvalidUri`] if the reference cannot be resolved.
pub fn resolve_uri(base: &Url, reference: &str) -> Result<Url, ClientError> {
    base.join(reference).map_err(|e| ClientError::InvalidUri {
        uri: reference.to_owned(),
        reason: e.to_string(),
    })
}

/// Append `pairs` to the query of `url`, after any pairs already present.
pub fn append_query<K, V>(url: &mut Url, pairs: &[(K, V)])
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if pairs.is_empty() {
        return;
    }
    let mut query = url.query_pairs_mut();
    for (key, value) in pairs {
        query.append_pair(key.as_ref(), value.as_ref());
    }
}

/// Make sure `base` is usable as a base URI and its path ends in `/`, so
/// relative references extend the path instead of replacing its last segment.
pub(crate) fn normalize_base(mut base: Url) -> Result<Url, ClientError> {
    if base.cannot_be_a_base() {
        return Err(ClientError::InvalidUri {
            uri: base.to_string(),
            reason: "cannot be used as a base URI".to_owned(),
        });
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.set_query(None);
    base.set_fragment(None);
    Ok(base)
}
