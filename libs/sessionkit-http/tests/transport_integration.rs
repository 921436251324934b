//! End-to-end checks of `HttpClient` through the `Transport` trait object.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::Request;
use httpmock::prelude::*;
use sessionkit_http::{
    HttpClientBuilder, HttpClientConfig, HttpError, Transport, read_body_limited,
};

fn testing_transport() -> Arc<dyn Transport> {
    Arc::new(
        HttpClientBuilder::with_config(HttpClientConfig::for_testing())
            .build()
            .unwrap(),
    )
}

#[tokio::test]
async fn works_behind_trait_object() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(GET).path("/items").query_param("page", "2");
        then.status(200)
            .header("content-type", "text/plain")
            .body("two");
    });

    let transport = testing_transport();
    let request = Request::get(server.url("/items?page=2"))
        .body(Bytes::new())
        .unwrap();
    let response = transport.send(request).await.unwrap();

    assert_eq!(
        sessionkit_http::content_type(response.headers()),
        Some("text/plain")
    );
    let body = read_body_limited(response, 64).await.unwrap();
    assert_eq!(&body[..], b"two");
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(GET).path("/slow");
        then.status(200).delay(Duration::from_millis(500));
    });

    let client = HttpClientBuilder::with_config(HttpClientConfig::for_testing())
        .timeout(Duration::from_millis(50))
        .build()
        .unwrap();
    let request = Request::get(server.url("/slow")).body(Bytes::new()).unwrap();

    let result = client.send(request).await;
    assert!(matches!(result, Err(HttpError::Timeout(d)) if d == Duration::from_millis(50)));
}

#[tokio::test]
async fn concurrent_requests_share_one_client() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET).path("/ping");
        then.status(204);
    });

    let transport = testing_transport();
    let mut handles = Vec::new();
    for _ in 0..8 {
        let transport = Arc::clone(&transport);
        let url = server.url("/ping");
        handles.push(tokio::spawn(async move {
            let request = Request::get(url).body(Bytes::new()).unwrap();
            transport.send(request).await.map(|r| r.status())
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), http::StatusCode::NO_CONTENT);
    }
    m.assert_calls(8);
}
