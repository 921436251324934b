//! Full stack: `Client` + `Exchange` operations + the hyper transport
//! against a mock service with a session/login/token protocol.

use http::{HeaderName, HeaderValue};
use httpmock::prelude::*;
use parking_lot::Mutex;
use serde::Deserialize;
use sessionkit::operation::CredentialsClassifier;
use sessionkit::{
    BasicCredentials, Client, ClientError, Exchange, HttpClientConfig, HttpError, Json, Session,
    Status, Text,
};
use url::Url;

#[derive(Debug, Deserialize)]
struct WebSession {
    id: String,
    #[serde(skip)]
    token: Mutex<Option<String>>,
}

impl Status for WebSession {
    fn is_authenticated(&self) -> bool {
        self.token.lock().is_some()
    }

    fn reset_authentication(&self) {
        *self.token.lock() = None;
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Item {
    id: u32,
}

fn session_header(session: &WebSession) -> Result<(HeaderName, HeaderValue), ClientError> {
    let value = HeaderValue::from_str(&session.id).map_err(HttpError::from)?;
    Ok((HeaderName::from_static("x-session"), value))
}

fn client_for(server: &MockServer) -> Client<WebSession, BasicCredentials> {
    let open_session = Exchange::<WebSession, (), WebSession>::post(Json::new())
        .path("session")
        .build();

    let login = Exchange::<WebSession, BasicCredentials, TokenResponse>::post(Json::new())
        .session(Session::Status)
        .path("login")
        .classifier(CredentialsClassifier)
        .params(|scope| scope.params().to_params("username", "password"))
        .headers(|scope| Ok(vec![session_header(scope.require_status()?)?]))
        .on_success(|scope, response| {
            let response = response
                .ok_or_else(|| ClientError::AuthenticationFailed("login returned no token".into()))?;
            *scope.require_status()?.token.lock() = Some(response.token.clone());
            Ok(())
        })
        .build();

    Client::<WebSession, BasicCredentials>::builder(Url::parse(&server.url("/api")).unwrap())
        .http_config(HttpClientConfig::for_testing())
        .status_initializer(open_session)
        .authenticator(login)
        .build()
        .unwrap()
}

fn list_items() -> Exchange<WebSession, (), Vec<Item>> {
    Exchange::<WebSession, (), Vec<Item>>::get(Json::new())
        .session(Session::Authenticated)
        .path("items")
        .headers(|scope| {
            let session = scope.require_status()?;
            let token = session
                .token
                .lock()
                .clone()
                .ok_or_else(|| ClientError::AuthenticationRequired("no token".into()))?;
            let bearer =
                HeaderValue::from_str(&format!("Bearer {token}")).map_err(HttpError::from)?;
            Ok(vec![(http::header::AUTHORIZATION, bearer)])
        })
        .build()
}

#[tokio::test]
async fn login_fetch_and_renew_on_expiry() {
    let server = MockServer::start();
    let session = server.mock(|when, then| {
        when.method(POST).path("/api/session");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"id":"s-1"}"#);
    });
    let login = server.mock(|when, then| {
        when.method(POST)
            .path("/api/login")
            .header("x-session", "s-1")
            .header("content-type", "application/x-www-form-urlencoded; charset=UTF-8")
            .body("username=ann&password=pw");
        then.status(200)
            .header("content-type", "application/json; charset=utf-8")
            .body(r#"{"token":"tok-1"}"#);
    });
    let items = server.mock(|when, then| {
        when.method(GET)
            .path("/api/items")
            .header("authorization", "Bearer tok-1")
            .header("accept", "application/json");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"[{"id":1},{"id":2}]"#);
    });
    let stale = server.mock(|when, then| {
        when.method(GET)
            .path("/api/items")
            .header("authorization", "Bearer stale");
        then.status(401).body("token expired");
    });

    let client = client_for(&server);
    client
        .authenticate(BasicCredentials::new("ann", "pw"))
        .await
        .unwrap();
    assert!(client.has_stored_credentials());

    let op = list_items();
    let first = client.execute(&op, &()).await.unwrap();
    assert_eq!(first, Some(vec![Item { id: 1 }, Item { id: 2 }]));

    // the service forgets the token
    *client.get_status().unwrap().token.lock() = Some("stale".to_owned());

    let second = client.execute(&op, &()).await.unwrap();
    assert_eq!(second.map(|v| v.len()), Some(2));

    assert_eq!(session.calls(), 1);
    assert_eq!(login.calls(), 2);
    assert_eq!(stale.calls(), 1);
    assert_eq!(items.calls(), 2);
}

#[tokio::test]
async fn rejected_login_is_credentials_invalid() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/session");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"id":"s-9"}"#);
    });
    let login = server.mock(|when, then| {
        when.method(POST).path("/api/login");
        then.status(403).body("nope");
    });

    let client = client_for(&server);
    let err = client
        .authenticate(BasicCredentials::new("ann", "wrong"))
        .await
        .unwrap_err();

    assert!(err.is_credentials_invalid(), "{err}");
    assert!(!client.has_stored_credentials());
    assert!(!client.get_status().unwrap().is_authenticated());
    login.assert_calls(1);
}

#[tokio::test]
async fn unexpected_media_type_is_reported() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/logo");
        then.status(200)
            .header("content-type", "image/png")
            .body(vec![0x89, b'P', b'N', b'G']);
    });

    let client = client_for(&server);
    let logo = Exchange::<WebSession, (), String>::get(Text::new())
        .path("logo")
        .build();

    let err = client.execute(&logo, &()).await.unwrap_err();
    assert!(matches!(err, ClientError::UnsupportedContentType(ref m) if m == "image/png"));
}

#[tokio::test]
async fn server_error_keeps_status_and_preview() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/health").query_param("deep", "true");
        then.status(500)
            .header("content-type", "text/plain")
            .body("database unavailable");
    });

    let client = client_for(&server);
    let health = Exchange::<WebSession, bool, String>::get(Text::new())
        .path("/health")
        .params(|scope| vec![("deep".to_owned(), scope.params().to_string())])
        .build();

    let err = client.execute(&health, &true).await.unwrap_err();
    assert_eq!(err.status(), Some(http::StatusCode::INTERNAL_SERVER_ERROR));
    match err {
        ClientError::ResponseStatus { body_preview, .. } => {
            assert_eq!(body_preview, "database unavailable");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(client.get_status().is_none());
}

#[tokio::test]
async fn plain_text_with_declared_charset() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/motd");
        then.status(200)
            .header("content-type", "text/plain; charset=ISO-8859-1")
            .body(b"caf\xe9".to_vec());
    });

    let client = client_for(&server);
    let motd = Exchange::<WebSession, (), String>::get(Text::new())
        .path("motd")
        .build();

    let text = client.execute(&motd, &()).await.unwrap();
    assert_eq!(text.as_deref(), Some("café"));
}
