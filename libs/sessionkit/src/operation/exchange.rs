use super::classify::{
    Classification, ResponseClassifier, SessionClassifier, StandardClassifier,
};
use super::uri::{append_query, resolve_uri};
use super::{Operation, OperationContext, Session};
use crate::content::{BodyParser, BodyProducer, ContentType, Form, parse_body, produce_body};
use crate::error::ClientError;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Response, StatusCode, Uri};
use sessionkit_http::{
    ERROR_BODY_PREVIEW_LIMIT, HttpError, ResponseBody, content_type, read_body_limited,
    read_body_preview,
};
use std::sync::Arc;

/// What request-building strategies see: the call's parameters and, for
/// session-dependent exchanges, the resolved status.
pub struct Scope<'a, S, P> {
    params: &'a P,
    status: Option<&'a S>,
}

impl<'a, S, P> Scope<'a, S, P> {
    #[must_use]
    pub fn params(&self) -> &'a P {
        self.params
    }

    #[must_use]
    pub fn status(&self) -> Option<&'a S> {
        self.status
    }

    /// # Errors
    /// Returns [`ClientError::StatusNotInitialized`] when there is no status.
    pub fn require_status(&self) -> Result<&'a S, ClientError> {
        self.status.ok_or(ClientError::StatusNotInitialized)
    }
}

type UriFn<S, P> = Box<dyn Fn(&Scope<'_, S, P>) -> Result<String, ClientError> + Send + Sync>;
type PairsFn<S, P> = Box<dyn Fn(&Scope<'_, S, P>) -> Vec<(String, String)> + Send + Sync>;
type HeadersFn<S, P> = Box<
    dyn Fn(&Scope<'_, S, P>) -> Result<Vec<(HeaderName, HeaderValue)>, ClientError> + Send + Sync,
>;
type BodyFn<S, P> =
    Box<dyn Fn(&Scope<'_, S, P>) -> Result<(Bytes, ContentType), ClientError> + Send + Sync>;
type SuccessFn<S, P, T> =
    Box<dyn Fn(&Scope<'_, S, P>, Option<&T>) -> Result<(), ClientError> + Send + Sync>;

/// A generic HTTP operation assembled from strategies.
///
/// `S` is the status type, `P` the parameters and `T` what the parser
/// produces. The output is `Option<T>`: `None` for an empty response body.
///
/// Request assembly:
/// - the URI strategy's result is resolved against the client base URI
/// - GET, DELETE and HEAD send the parameters as query pairs
/// - POST, PUT and PATCH without an explicit body send them as a
///   `application/x-www-form-urlencoded; charset=UTF-8` body; with an
///   explicit body they go to the query
/// - header strategies are applied in the order they were added
/// - `Accept` defaults to the parser's media type
///
/// ```ignore
/// let get_user = Exchange::<Session, u64, User>::get(Json::new())
///     .session(Session::Authenticated)
///     .uri(|scope| format!("users/{}", scope.params()))
///     .headers(|scope| Ok(vec![bearer(scope.require_status()?)?]))
///     .build();
/// let user = client.execute(&get_user, &42).await?;
/// ```
pub struct Exchange<S, P, T> {
    method: Method,
    session: Session,
    uri: UriFn<S, P>,
    params: Option<PairsFn<S, P>>,
    headers: Vec<HeadersFn<S, P>>,
    body: Option<BodyFn<S, P>>,
    parser: Arc<dyn BodyParser<T>>,
    classifier: Arc<dyn ResponseClassifier>,
    on_success: Option<SuccessFn<S, P, T>>,
}

impl<S, P, T> Exchange<S, P, T> {
    #[must_use]
    pub fn builder(method: Method, parser: impl BodyParser<T> + 'static) -> ExchangeBuilder<S, P, T> {
        ExchangeBuilder {
            method,
            session: Session::Independent,
            uri: None,
            params: None,
            headers: Vec::new(),
            body: None,
            parser: Arc::new(parser),
            classifier: None,
            on_success: None,
        }
    }

    #[must_use]
    pub fn get(parser: impl BodyParser<T> + 'static) -> ExchangeBuilder<S, P, T> {
        Self::builder(Method::GET, parser)
    }

    #[must_use]
    pub fn post(parser: impl BodyParser<T> + 'static) -> ExchangeBuilder<S, P, T> {
        Self::builder(Method::POST, parser)
    }

    #[must_use]
    pub fn put(parser: impl BodyParser<T> + 'static) -> ExchangeBuilder<S, P, T> {
        Self::builder(Method::PUT, parser)
    }

    #[must_use]
    pub fn patch(parser: impl BodyParser<T> + 'static) -> ExchangeBuilder<S, P, T> {
        Self::builder(Method::PATCH, parser)
    }

    #[must_use]
    pub fn delete(parser: impl BodyParser<T> + 'static) -> ExchangeBuilder<S, P, T> {
        Self::builder(Method::DELETE, parser)
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    fn scope<'a>(
        &self,
        params: &'a P,
        cx: &'a OperationContext<'_, S>,
    ) -> Result<Scope<'a, S, P>, ClientError> {
        let status = if self.session.requires_status() {
            Some(&**cx.require_status()?)
        } else {
            cx.status().map(|status| &**status)
        };
        Ok(Scope { params, status })
    }

    fn build_request(
        &self,
        params: &P,
        cx: &OperationContext<'_, S>,
    ) -> Result<Request<Bytes>, ClientError> {
        let scope = self.scope(params, cx)?;
        let mut url = resolve_uri(cx.base_uri(), &(self.uri)(&scope)?)?;
        let pairs = self
            .params
            .as_ref()
            .map(|strategy| strategy(&scope))
            .unwrap_or_default();

        let (body, body_type) = match &self.body {
            Some(produce) => {
                append_query(&mut url, &pairs);
                let (bytes, content_type) = produce(&scope)?;
                (bytes, Some(content_type))
            }
            None if sends_form(&self.method) && !pairs.is_empty() => {
                let (bytes, content_type) = produce_body(&Form::new(), None, &pairs)?;
                (bytes, Some(content_type))
            }
            None => {
                append_query(&mut url, &pairs);
                (Bytes::new(), None)
            }
        };

        let mut headers = HeaderMap::new();
        for strategy in &self.headers {
            for (name, value) in strategy(&scope)? {
                headers.append(name, value);
            }
        }
        if !headers.contains_key(ACCEPT) {
            let accept = HeaderValue::from_str(self.parser.default_content_type().media_type())
                .map_err(HttpError::from)?;
            headers.insert(ACCEPT, accept);
        }
        if let Some(body_type) = body_type
            && !headers.contains_key(CONTENT_TYPE)
        {
            let value = HeaderValue::from_str(&body_type.to_string()).map_err(HttpError::from)?;
            headers.insert(CONTENT_TYPE, value);
        }

        let uri: Uri = url.as_str().parse().map_err(|e: http::uri::InvalidUri| {
            ClientError::InvalidUri {
                uri: url.to_string(),
                reason: e.to_string(),
            }
        })?;

        let mut request = Request::new(body);
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = uri;
        *request.headers_mut() = headers;
        Ok(request)
    }

    async fn read_response(
        &self,
        response: Response<ResponseBody>,
        limit: usize,
    ) -> Result<Option<T>, ClientError> {
        let status = response.status();
        let classification = self.classifier.classify(status, response.headers());

        if classification == Classification::Success {
            let declared = declared_content_type(response.headers())?;
            let body = read_body_limited(response, limit).await?;
            return Ok(parse_body(
                self.parser.as_ref(),
                declared.as_deref(),
                &body,
            )?);
        }

        let declared = content_type(response.headers()).map(str::to_owned);
        let preview =
            read_body_preview(response.into_body(), limit.min(ERROR_BODY_PREVIEW_LIMIT)).await?;
        tracing::debug!(%status, ?classification, "exchange failed");
        Err(failure(classification, status, preview, declared))
    }
}

/// A `Content-Type` header that is present but not readable text counts as
/// an unsupported content type, not as a missing one.
fn declared_content_type(headers: &HeaderMap) -> Result<Option<String>, ClientError> {
    let Some(value) = headers.get(CONTENT_TYPE) else {
        return Ok(None);
    };
    match value.to_str() {
        Ok(raw) => Ok(Some(raw.to_owned())),
        Err(_) => Err(ClientError::UnsupportedContentType(
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        )),
    }
}

fn sends_form(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

fn failure(
    classification: Classification,
    status: StatusCode,
    body_preview: String,
    content_type: Option<String>,
) -> ClientError {
    match classification {
        Classification::Rejected => ClientError::AuthenticationRequired(status.to_string()),
        Classification::Expired => ClientError::AuthenticationExpired(status.to_string()),
        Classification::CredentialsRejected => ClientError::CredentialsInvalid(status.to_string()),
        Classification::Success | Classification::Failure => ClientError::ResponseStatus {
            status,
            body_preview,
            content_type,
        },
    }
}

#[async_trait]
impl<S, P, T> Operation<S> for Exchange<S, P, T>
where
    S: Send + Sync + 'static,
    P: Send + Sync + 'static,
    T: Send + 'static,
{
    type Params = P;
    type Output = Option<T>;

    fn session(&self) -> Session {
        self.session
    }

    async fn execute(
        &self,
        params: &P,
        cx: &OperationContext<'_, S>,
    ) -> Result<Option<T>, ClientError> {
        let request = self.build_request(params, cx)?;
        tracing::debug!(method = %request.method(), path = request.uri().path(), "sending request");

        let response = cx.transport().send(request).await?;
        let output = self.read_response(response, cx.max_body_size()).await?;

        if let Some(hook) = &self.on_success {
            hook(&self.scope(params, cx)?, output.as_ref())?;
        }
        Ok(output)
    }
}

impl<S, P, T> std::fmt::Debug for Exchange<S, P, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exchange")
            .field("method", &self.method)
            .field("session", &self.session)
            .field("headers", &self.headers.len())
            .field("has_body", &self.body.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Exchange`]. Obtained from [`Exchange::builder`] or one of
/// the per-method shortcuts.
pub struct ExchangeBuilder<S, P, T> {
    method: Method,
    session: Session,
    uri: Option<UriFn<S, P>>,
    params: Option<PairsFn<S, P>>,
    headers: Vec<HeadersFn<S, P>>,
    body: Option<BodyFn<S, P>>,
    parser: Arc<dyn BodyParser<T>>,
    classifier: Option<Arc<dyn ResponseClassifier>>,
    on_success: Option<SuccessFn<S, P, T>>,
}

impl<S, P, T> ExchangeBuilder<S, P, T> {
    /// Declare the session requirement. Defaults to [`Session::Independent`].
    #[must_use]
    pub fn session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    /// Fixed URI reference, resolved against the base URI.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.uri = Some(Box::new(move |_| Ok(path.clone())));
        self
    }

    /// URI reference computed per call.
    #[must_use]
    pub fn uri<F>(mut self, uri: F) -> Self
    where
        F: Fn(&Scope<'_, S, P>) -> String + Send + Sync + 'static,
    {
        self.uri = Some(Box::new(move |scope| Ok(uri(scope))));
        self
    }

    /// Fallible variant of [`uri`](Self::uri).
    #[must_use]
    pub fn try_uri<F>(mut self, uri: F) -> Self
    where
        F: Fn(&Scope<'_, S, P>) -> Result<String, ClientError> + Send + Sync + 'static,
    {
        self.uri = Some(Box::new(uri));
        self
    }

    /// Parameter pairs, sent as query or form depending on the method.
    #[must_use]
    pub fn params<F>(mut self, params: F) -> Self
    where
        F: Fn(&Scope<'_, S, P>) -> Vec<(String, String)> + Send + Sync + 'static,
    {
        self.params = Some(Box::new(params));
        self
    }

    /// A fixed header.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers
            .push(Box::new(move |_| Ok(vec![(name.clone(), value.clone())])));
        self
    }

    /// Headers computed per call, e.g. a session token taken from the status.
    #[must_use]
    pub fn headers<F>(mut self, headers: F) -> Self
    where
        F: Fn(&Scope<'_, S, P>) -> Result<Vec<(HeaderName, HeaderValue)>, ClientError>
            + Send
            + Sync
            + 'static,
    {
        self.headers.push(Box::new(headers));
        self
    }

    /// Request body produced by `producer` with its default content type.
    #[must_use]
    pub fn body<B, V, F>(self, producer: B, value: F) -> Self
    where
        B: BodyProducer<V> + 'static,
        F: Fn(&Scope<'_, S, P>) -> V + Send + Sync + 'static,
    {
        self.body_with(producer, None, value)
    }

    /// Request body with an explicit content type.
    #[must_use]
    pub fn body_as<B, V, F>(self, producer: B, content_type: ContentType, value: F) -> Self
    where
        B: BodyProducer<V> + 'static,
        F: Fn(&Scope<'_, S, P>) -> V + Send + Sync + 'static,
    {
        self.body_with(producer, Some(content_type), value)
    }

    fn body_with<B, V, F>(mut self, producer: B, content_type: Option<ContentType>, value: F) -> Self
    where
        B: BodyProducer<V> + 'static,
        F: Fn(&Scope<'_, S, P>) -> V + Send + Sync + 'static,
    {
        self.body = Some(Box::new(move |scope| {
            let value = value(scope);
            Ok(produce_body(&producer, content_type.as_ref(), &value)?)
        }));
        self
    }

    /// Override how responses are classified.
    #[must_use]
    pub fn classifier(mut self, classifier: impl ResponseClassifier + 'static) -> Self {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    /// Called with the parsed output after a successful response, before
    /// the exchange returns. An error from the hook becomes the result.
    #[must_use]
    pub fn on_success<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Scope<'_, S, P>, Option<&T>) -> Result<(), ClientError> + Send + Sync + 'static,
    {
        self.on_success = Some(Box::new(hook));
        self
    }

    /// Finish the exchange. Without a URI strategy the base URI itself is used;
    /// without a classifier, authenticated exchanges use [`SessionClassifier`]
    /// and all others [`StandardClassifier`].
    #[must_use]
    pub fn build(self) -> Exchange<S, P, T> {
        let classifier = self.classifier.unwrap_or_else(|| match self.session {
            Session::Authenticated => Arc::new(SessionClassifier),
            Session::Independent | Session::Status => Arc::new(StandardClassifier),
        });
        Exchange {
            method: self.method,
            session: self.session,
            uri: self.uri.unwrap_or_else(|| Box::new(|_| Ok(String::new()))),
            params: self.params,
            headers: self.headers,
            body: self.body,
            parser: self.parser,
            classifier,
            on_success: self.on_success,
        }
    }
}
