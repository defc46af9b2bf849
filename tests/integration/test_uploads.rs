/// Integration tests for request body kinds on the wire

#[cfg(test)]
mod upload_integration {
    use crate::test_helpers::{received, test_runtime};
    use httpr::{Client, Error};
    use std::io::Write;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn post_server(runtime: &tokio::runtime::Runtime) -> MockServer {
        runtime.block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200))
                .mount(&server)
                .await;
            server
        })
    }

    #[test]
    fn test_raw_content_sent_verbatim() {
        let runtime = test_runtime();
        let server = post_server(&runtime);
        let client = Client::new().unwrap();

        client
            .post(server.uri())
            .content(&b"test content"[..])
            .send()
            .unwrap();

        let requests = received(&runtime, &server);
        assert_eq!(requests[0].body, b"test content");
        assert!(requests[0].headers.get("content-type").is_none());
    }

    #[test]
    fn test_form_body_percent_encoded_in_order() {
        let runtime = test_runtime();
        let server = post_server(&runtime);
        let client = Client::new().unwrap();

        client
            .post(server.uri())
            .form([("key1", "value1"), ("key2", "value 2")])
            .send()
            .unwrap();

        let requests = received(&runtime, &server);
        assert_eq!(
            requests[0].headers.get("content-type").unwrap(),
            "application/x-www-form-urlencoded"
        );
        assert_eq!(requests[0].body, b"key1=value1&key2=value+2");
    }

    #[test]
    fn test_json_body_and_content_type() {
        let runtime = test_runtime();
        let server = post_server(&runtime);
        let client = Client::new().unwrap();

        client
            .post(server.uri())
            .json(&serde_json::json!({"key1": "value1", "key2": "value2"}))
            .send()
            .unwrap();

        let requests = received(&runtime, &server);
        assert_eq!(
            requests[0].headers.get("content-type").unwrap(),
            "application/json"
        );
        let parsed: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(parsed["key1"], "value1");
    }

    #[test]
    fn test_cbor_body_and_content_type() {
        let runtime = test_runtime();
        let server = post_server(&runtime);
        let client = Client::new().unwrap();

        let payload = serde_json::json!({"binary": true, "n": 3});
        client.post(server.uri()).cbor(&payload).send().unwrap();

        let requests = received(&runtime, &server);
        assert_eq!(
            requests[0].headers.get("content-type").unwrap(),
            "application/cbor"
        );
        assert_eq!(httpr_codec::cbor_view(&requests[0].body).unwrap(), payload);
    }

    #[test]
    fn test_multipart_files_streamed_with_boundary() {
        let runtime = test_runtime();
        let server = post_server(&runtime);
        let client = Client::new().unwrap();

        let mut file1 = tempfile::NamedTempFile::new().unwrap();
        write!(file1, "aaa111").unwrap();
        let mut file2 = tempfile::NamedTempFile::new().unwrap();
        write!(file2, "bbb222").unwrap();

        client
            .post(server.uri())
            .files([("file1", file1.path()), ("file2", file2.path())])
            .send()
            .unwrap();

        let requests = received(&runtime, &server);
        let content_type = requests[0]
            .headers
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(content_type.starts_with("multipart/form-data; boundary="));

        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"file1\""));
        assert!(body.contains("aaa111"));
        assert!(body.contains("name=\"file2\""));
        assert!(body.contains("bbb222"));
    }

    #[test]
    fn test_missing_upload_file_is_request_error() {
        let runtime = test_runtime();
        let server = post_server(&runtime);
        let client = Client::new().unwrap();

        let err = client
            .post(server.uri())
            .files([("file", "/nonexistent/file/path.txt")])
            .send()
            .unwrap_err();
        assert!(err.is_request_error());
    }

    #[test]
    fn test_multipart_cannot_follow_307() {
        let runtime = test_runtime();
        let server = runtime.block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(307).insert_header("location", "/again"))
                .mount(&server)
                .await;
            server
        });
        let client = Client::new().unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "payload").unwrap();

        let err = client
            .post(server.uri())
            .files([("file", file.path())])
            .send()
            .unwrap_err();
        assert!(matches!(err, Error::LocalProtocol(_)));
    }
}
