//! Unit tests for the transport pool against a local wiremock server

use httpr_errors::Error;
use httpr_tls::TlsSettings;
use httpr_transport::{empty_body, full_body, Transport, TransportConfig};
use hyper::body::Incoming;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport_with(config: TransportConfig) -> Transport {
    let settings = TlsSettings::default();
    let tls = settings.build().unwrap();
    Transport::new(config, tls, settings.fingerprint(), None)
}

fn authority(server: &MockServer) -> (String, u16) {
    let uri = url::Url::parse(&server.uri()).unwrap();
    (
        uri.host_str().unwrap().to_string(),
        uri.port_or_known_default().unwrap(),
    )
}

async fn collect(body: Incoming) -> Vec<u8> {
    use http_body_util::BodyExt;
    body.collect().await.unwrap().to_bytes().to_vec()
}

#[tokio::test]
async fn test_simple_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hello"))
        .respond_with(ResponseTemplate::new(200).set_body_string("world"))
        .mount(&server)
        .await;

    let transport = transport_with(TransportConfig::default());
    let (host, port) = authority(&server);
    let deadline = Instant::now() + Duration::from_secs(5);

    let mut conn = transport.checkout("http", &host, port, deadline).await.unwrap();
    assert!(!conn.is_reused());

    let request = http::Request::builder()
        .method(http::Method::GET)
        .uri(format!("{}/hello", server.uri()))
        .body(empty_body())
        .unwrap();
    let response = conn.send_request(request).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(collect(response.into_body()).await, b"world");
    conn.release();
}

#[tokio::test]
async fn test_connection_reuse_after_clean_release() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let transport = transport_with(TransportConfig::default());
    let (host, port) = authority(&server);
    let deadline = Instant::now() + Duration::from_secs(5);

    {
        let mut conn = transport.checkout("http", &host, port, deadline).await.unwrap();
        let request = http::Request::builder()
            .uri(server.uri())
            .body(empty_body())
            .unwrap();
        let response = conn.send_request(request).await.unwrap();
        let _ = collect(response.into_body()).await;
        conn.release();
    }
    assert_eq!(transport.idle_count(), 1);

    let conn = transport.checkout("http", &host, port, deadline).await.unwrap();
    assert!(conn.is_reused());
}

#[tokio::test]
async fn test_broken_connection_not_returned() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let transport = transport_with(TransportConfig::default());
    let (host, port) = authority(&server);
    let deadline = Instant::now() + Duration::from_secs(5);

    {
        let mut conn = transport.checkout("http", &host, port, deadline).await.unwrap();
        conn.mark_broken();
    }
    assert_eq!(transport.idle_count(), 0);
}

#[tokio::test]
async fn test_post_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/echo"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let transport = transport_with(TransportConfig::default());
    let (host, port) = authority(&server);
    let deadline = Instant::now() + Duration::from_secs(5);

    let mut conn = transport.checkout("http", &host, port, deadline).await.unwrap();
    let request = http::Request::builder()
        .method(http::Method::POST)
        .uri(format!("{}/echo", server.uri()))
        .body(full_body(bytes::Bytes::from_static(b"payload")))
        .unwrap();
    let response = conn.send_request(request).await.unwrap();
    assert_eq!(response.status(), 201);
}

#[tokio::test]
async fn test_pool_timeout_when_capacity_saturated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let config = TransportConfig {
        max_connections_per_host: 1,
        ..TransportConfig::default()
    };
    let transport = transport_with(config);
    let (host, port) = authority(&server);
    let deadline = Instant::now() + Duration::from_secs(5);

    // Hold the only slot while a second checkout waits
    let _held = transport.checkout("http", &host, port, deadline).await.unwrap();
    let short_deadline = Instant::now() + Duration::from_millis(50);
    let err = transport
        .checkout("http", &host, port, short_deadline)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PoolTimeout(_)));
}
