//! Unit tests for the public client surface

use httpr::{Auth, Client, Error};
use std::collections::HashMap;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Blocking-client tests drive wiremock from a dedicated runtime so the
/// client's own runtime never nests
fn server_with_200() -> (tokio::runtime::Runtime, MockServer) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let server = runtime.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;
        server
    });
    (runtime, server)
}

#[test]
fn test_sync_get_round_trip() {
    let (runtime, server) = server_with_200();
    let client = Client::new().unwrap();

    let response = client
        .get(format!("{}/anything", server.uri()))
        .param("x", "aaa")
        .param("y", "bbb")
        .header("X-Test", "test")
        .send()
        .unwrap();

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.text(), "ok");
    assert_eq!(&response.content()[..], b"ok");

    let requests = runtime.block_on(server.received_requests()).unwrap();
    assert_eq!(requests[0].url.query(), Some("x=aaa&y=bbb"));
    assert_eq!(requests[0].headers.get("x-test").unwrap(), "test");
}

#[test]
fn test_invalid_method_rejected_at_send() {
    let client = Client::new().unwrap();
    let err = client
        .request("INVALID", "http://example.com/")
        .send()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidMethod(_)));
    assert_eq!(err.to_string(), "Unsupported HTTP method: INVALID");
}

#[test]
fn test_invalid_url_rejected_at_send() {
    let client = Client::new().unwrap();
    let err = client.get("not-a-valid-url").send().unwrap_err();
    assert!(err.is_request_error());
}

#[test]
fn test_two_bodies_rejected() {
    let client = Client::new().unwrap();
    let err = client
        .post("http://example.com/")
        .content(&b"raw"[..])
        .json(&serde_json::json!({"a": 1}))
        .send()
        .unwrap_err();
    assert!(matches!(err, Error::LocalProtocol(_)));
}

#[test]
fn test_client_setters_round_trip() {
    let client = Client::new().unwrap();
    client.set_auth("user", Some("password"));
    client.set_headers([("X-Test", "TesT")]);
    client.set_cookies([("ccc", "ddd"), ("cccc", "dddd")]);
    client.set_params([("x", "aaa"), ("y", "bbb")]);
    client.set_timeout(Duration::from_secs(20));

    assert_eq!(
        client.auth(),
        Some(Auth::Basic {
            username: "user".to_string(),
            password: Some("password".to_string()),
        })
    );
    // Header keys are lowercased, values verbatim
    let mut expected = HashMap::new();
    expected.insert("x-test".to_string(), "TesT".to_string());
    assert_eq!(client.headers(), expected);
    assert_eq!(client.cookies().len(), 2);
    assert_eq!(client.params().len(), 2);
    assert_eq!(client.timeout(), Duration::from_secs(20));
}

#[test]
fn test_header_view_mutations_reach_the_wire() {
    let (runtime, server) = server_with_200();
    let client = Client::new().unwrap();

    let mut headers = client.headers();
    headers.insert("X-New", "v");
    let response = client.get(server.uri()).send().unwrap();
    assert_eq!(response.status_code(), 200);

    let mut headers = client.headers();
    headers.remove("X-New");
    client.get(server.uri()).send().unwrap();

    let requests = runtime.block_on(server.received_requests()).unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].headers.get("x-new").unwrap(), "v");
    assert!(requests[1].headers.get("x-new").is_none());
}

#[test]
fn test_case_insensitive_header_view() {
    let client = Client::builder()
        .headers([("X-Custom", "value")])
        .build()
        .unwrap();
    let headers = client.headers();
    assert_eq!(headers.get("x-custom"), Some("value"));
    assert_eq!(headers.get("X-CUSTOM"), Some("value"));
    assert!(headers.contains_key("X-Custom"));
}

#[test]
fn test_streaming_blocking_lifecycle() {
    let (_runtime, server) = server_with_200();
    let client = Client::new().unwrap();

    let mut response = client.get(server.uri()).stream().unwrap();
    assert_eq!(response.status_code(), 200);
    assert!(!response.is_closed());
    assert!(!response.is_consumed());

    let chunks: Vec<_> = response.iter_bytes().collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(chunks.concat(), b"ok");
    assert!(response.is_consumed());

    let err = response.chunk().unwrap_err();
    assert!(matches!(err, Error::StreamConsumed));
}

#[test]
fn test_streaming_close_then_read_errors() {
    let (_runtime, server) = server_with_200();
    let client = Client::new().unwrap();

    let mut response = client.get(server.uri()).stream().unwrap();
    response.close();
    assert!(response.is_closed());
    assert!(matches!(response.read().unwrap_err(), Error::StreamClosed));
}

#[test]
fn test_one_shot_get() {
    let (_runtime, server) = server_with_200();
    let response = httpr::get(format!("{}/anything", server.uri()))
        .param("k", "v")
        .send()
        .unwrap();
    assert_eq!(response.status_code(), 200);
}

#[test]
fn test_raise_for_status() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let server = runtime.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        server
    });

    let client = Client::new().unwrap();
    let response = client
        .get(format!("{}/missing", server.uri()))
        .send()
        .unwrap();
    assert_eq!(response.status_code(), 404);
    let err = response.raise_for_status().unwrap_err();
    assert!(err.is_status_error());
}

mod async_client {
    use super::*;
    use futures::StreamExt;
    use httpr::AsyncClient;

    #[tokio::test]
    async fn test_async_get() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("async ok"))
            .mount(&server)
            .await;

        let client = AsyncClient::new().unwrap();
        let response = client.get(server.uri()).send().await.unwrap();
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.text(), "async ok");
    }

    #[tokio::test]
    async fn test_async_post_json_echoes_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = AsyncClient::new().unwrap();
        let response = client
            .post(server.uri())
            .json(&serde_json::json!({"key1": "value1"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status_code(), 200);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(
            requests[0].headers.get("content-type").unwrap(),
            "application/json"
        );
        assert_eq!(requests[0].body, br#"{"key1":"value1"}"#);
    }

    #[tokio::test]
    async fn test_async_json_body_with_cbor_accept_sends_cbor() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = AsyncClient::new().unwrap();
        let payload = serde_json::json!({"name": "httpr", "numbers": [1, 2, 3]});
        client
            .post(server.uri())
            .header("Accept", "application/cbor")
            .json(&payload)
            .send()
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(
            requests[0].headers.get("content-type").unwrap(),
            "application/cbor"
        );
        let decoded = httpr_codec::cbor_view(&requests[0].body).unwrap();
        assert_eq!(decoded, payload);
    }

    #[tokio::test]
    async fn test_async_streaming_iteration() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("first\nsecond\nlast"))
            .mount(&server)
            .await;

        let client = AsyncClient::new().unwrap();
        let mut response = client.get(server.uri()).stream().await.unwrap();
        let lines: Vec<String> = response
            .iter_lines()
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(lines, vec!["first", "second", "last"]);
        assert!(response.is_consumed());
    }

    #[tokio::test]
    async fn test_async_timeout_hierarchy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let client = AsyncClient::builder()
            .timeout(Duration::from_millis(50))
            .build_async()
            .unwrap();
        let err = client.get(server.uri()).send().await.unwrap_err();
        assert!(err.is_timeout());
        assert!(err.is_transport_error());
        assert!(err.is_request_error());
    }
}
