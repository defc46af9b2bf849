/// Integration tests for body codecs: CBOR transparency and content
/// encodings

#[cfg(test)]
mod encoding_integration {
    use crate::test_helpers::test_runtime;
    use httpr::Client;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_cbor_response_transparent_via_json_view() {
        // Scenario 4: application/cbor body read through response.json()
        let runtime = test_runtime();
        let payload = json!({"a": 1});
        let body = httpr_codec::cbor::encode(&payload).unwrap();

        let server = runtime.block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header("content-type", "application/cbor")
                        .set_body_bytes(body.clone()),
                )
                .mount(&server)
                .await;
            server
        });

        let client = Client::new().unwrap();
        let response = client.get(server.uri()).send().unwrap();

        assert_eq!(response.json().unwrap(), payload);
        assert_eq!(response.cbor().unwrap(), payload);
    }

    #[test]
    fn test_cbor_view_on_json_response_fails() {
        let runtime = test_runtime();
        let server = runtime.block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header("content-type", "application/json")
                        .set_body_string(r#"{"a":1}"#),
                )
                .mount(&server)
                .await;
            server
        });

        let client = Client::new().unwrap();
        let response = client.get(server.uri()).send().unwrap();
        assert_eq!(response.json().unwrap(), serde_json::json!({"a": 1}));
        assert!(response.cbor().is_err());
    }

    #[test]
    fn test_gzip_response_transparently_decoded() {
        let runtime = test_runtime();
        let compressed = {
            use std::io::Write;
            let mut encoder =
                flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(b"the payload").unwrap();
            encoder.finish().unwrap()
        };

        let server = runtime.block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header("content-encoding", "gzip")
                        .set_body_bytes(compressed.clone()),
                )
                .mount(&server)
                .await;
            server
        });

        let client = Client::new().unwrap();
        let response = client.get(server.uri()).send().unwrap();
        assert_eq!(&response.content()[..], b"the payload");
        assert_eq!(response.text(), "the payload");
    }

    #[test]
    fn test_charset_applied_to_text() {
        let runtime = test_runtime();
        let latin1_body: Vec<u8> = vec![0xe9, 0x74, 0xe9]; // "été"
        let server = runtime.block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header("content-type", "text/plain; charset=iso-8859-1")
                        .set_body_bytes(latin1_body.clone()),
                )
                .mount(&server)
                .await;
            server
        });

        let client = Client::new().unwrap();
        let response = client.get(server.uri()).send().unwrap();
        assert_eq!(response.text(), "été");
    }

    #[test]
    fn test_accept_encoding_advertised() {
        let runtime = test_runtime();
        let server = crate::test_helpers::server_with_body(&runtime, "ok");
        let client = Client::new().unwrap();

        client.get(server.uri()).send().unwrap();

        let requests = crate::test_helpers::received(&runtime, &server);
        assert_eq!(
            requests[0].headers.get("accept-encoding").unwrap(),
            "gzip, deflate, br"
        );
    }
}
