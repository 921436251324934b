use http::{HeaderMap, StatusCode};

/// What a response means for the session, decided before its body is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Parse the body as the operation's output.
    Success,
    /// The call needs authentication that was never established.
    Rejected,
    /// A previously valid session is no longer accepted.
    Expired,
    /// The credentials of an authentication call were refused.
    CredentialsRejected,
    /// Any other failure; reported with the status and a body preview.
    Failure,
}

/// Maps a response status line and headers to a [`Classification`].
///
/// Services that signal expiry differently (a 403, a custom header, a 440)
/// plug in their own implementation. Plain functions and closures work too.
pub trait ResponseClassifier: Send + Sync {
    fn classify(&self, status: StatusCode, headers: &HeaderMap) -> Classification;
}

impl<F> ResponseClassifier for F
where
    F: Fn(StatusCode, &HeaderMap) -> Classification + Send + Sync,
{
    fn classify(&self, status: StatusCode, headers: &HeaderMap) -> Classification {
        self(status, headers)
    }
}

/// 2xx is success, 401 means authentication is required.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardClassifier;

impl ResponseClassifier for StandardClassifier {
    fn classify(&self, status: StatusCode, _headers: &HeaderMap) -> Classification {
        match status {
            s if s.is_success() => Classification::Success,
            StatusCode::UNAUTHORIZED => Classification::Rejected,
            _ => Classification::Failure,
        }
    }
}

/// For authenticated calls: a 401 means the session expired.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionClassifier;

impl ResponseClassifier for SessionClassifier {
    fn classify(&self, status: StatusCode, _headers: &HeaderMap) -> Classification {
        match status {
            s if s.is_success() => Classification::Success,
            StatusCode::UNAUTHORIZED => Classification::Expired,
            _ => Classification::Failure,
        }
    }
}

/// For authentication calls: 401 and 403 mean the credentials are wrong.
#[derive(Debug, Clone, Copy, Default)]
pub struct CredentialsClassifier;

impl ResponseClassifier for CredentialsClassifier {
    fn classify(&self, status: StatusCode, _headers: &HeaderMap) -> Classification {
        match status {
            s if s.is_success() => Classification::Success,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Classification::CredentialsRejected
            }
            _ => Classification::Failure,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn classify(c: &dyn ResponseClassifier, status: u16) -> Classification {
        c.classify(StatusCode::from_u16(status).unwrap(), &HeaderMap::new())
    }

    #[test]
    fn standard() {
        assert_eq!(classify(&StandardClassifier, 200), Classification::Success);
        assert_eq!(classify(&StandardClassifier, 204), Classification::Success);
        assert_eq!(classify(&StandardClassifier, 401), Classification::Rejected);
        assert_eq!(classify(&StandardClassifier, 403), Classification::Failure);
        assert_eq!(classify(&StandardClassifier, 302), Classification::Failure);
    }

    #[test]
    fn session() {
        assert_eq!(classify(&SessionClassifier, 201), Classification::Success);
        assert_eq!(classify(&SessionClassifier, 401), Classification::Expired);
        assert_eq!(classify(&SessionClassifier, 500), Classification::Failure);
    }

    #[test]
    fn credentials() {
        assert_eq!(
            classify(&CredentialsClassifier, 401),
            Classification::CredentialsRejected
        );
        assert_eq!(
            classify(&CredentialsClassifier, 403),
            Classification::CredentialsRejected
        );
        assert_eq!(classify(&CredentialsClassifier, 503), Classification::Failure);
    }

    #[test]
    fn closures_classify() {
        let expires_on_440 = |status: StatusCode, _: &HeaderMap| {
            if status.as_u16() == 440 {
                Classification::Expired
            } else {
                StandardClassifier.classify(status, &HeaderMap::new())
            }
        };
        assert_eq!(classify(&expires_on_440, 440), Classification::Expired);
        assert_eq!(classify(&expires_on_440, 200), Classification::Success);
    }
}
