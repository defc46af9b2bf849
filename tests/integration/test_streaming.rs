/// Integration tests for streaming response consumption

#[cfg(test)]
mod streaming_integration {
    use crate::test_helpers::{server_with_body, test_runtime};
    use httpr::{Client, Error};

    #[test]
    fn test_stream_headers_available_before_body() {
        let runtime = test_runtime();
        let server = server_with_body(&runtime, "streamed body");
        let client = Client::new().unwrap();

        let response = client.get(server.uri()).stream().unwrap();
        assert_eq!(response.status_code(), 200);
        assert!(response.headers().get("content-length").is_some());
        assert!(!response.is_closed());
        assert!(!response.is_consumed());
    }

    #[test]
    fn test_stream_iter_bytes_collects_whole_body() {
        let runtime = test_runtime();
        let server = server_with_body(&runtime, "streamed body");
        let client = Client::new().unwrap();

        let mut response = client.get(server.uri()).stream().unwrap();
        let chunks: Vec<_> = response
            .iter_bytes()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(chunks.concat(), b"streamed body");
        assert!(response.is_consumed());
    }

    #[test]
    fn test_stream_iter_text() {
        let runtime = test_runtime();
        let server = server_with_body(&runtime, "héllo wörld");
        let client = Client::new().unwrap();

        let mut response = client.get(server.uri()).stream().unwrap();
        let text: String = response
            .iter_text()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
            .concat();
        assert_eq!(text, "héllo wörld");
    }

    #[test]
    fn test_stream_iter_lines() {
        let runtime = test_runtime();
        let server = server_with_body(&runtime, "alpha\r\nbeta\ngamma");
        let client = Client::new().unwrap();

        let mut response = client.get(server.uri()).stream().unwrap();
        let lines: Vec<String> = response
            .iter_lines()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(lines, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_stream_read_drains_remaining_body() {
        let runtime = test_runtime();
        let server = server_with_body(&runtime, "whole body at once");
        let client = Client::new().unwrap();

        let mut response = client.get(server.uri()).stream().unwrap();
        let content = response.read().unwrap();
        assert_eq!(&content[..], b"whole body at once");
        assert!(response.is_consumed());
    }

    #[test]
    fn test_second_iteration_raises_stream_consumed() {
        let runtime = test_runtime();
        let server = server_with_body(&runtime, "once only");
        let client = Client::new().unwrap();

        let mut response = client.get(server.uri()).stream().unwrap();
        response.read().unwrap();

        let errors: Vec<_> = response.iter_bytes().collect();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], Err(Error::StreamConsumed)));
    }

    #[test]
    fn test_close_then_iterate_raises_stream_closed() {
        let runtime = test_runtime();
        let server = server_with_body(&runtime, "never read");
        let client = Client::new().unwrap();

        let mut response = client.get(server.uri()).stream().unwrap();
        response.close();
        assert!(response.is_closed());
        assert!(matches!(response.chunk().unwrap_err(), Error::StreamClosed));
    }

    #[test]
    fn test_stream_with_params_and_headers() {
        let runtime = test_runtime();
        let server = server_with_body(&runtime, "ok");
        let client = Client::new().unwrap();

        let mut response = client
            .get(server.uri())
            .param("key", "value")
            .header("X-Custom-Header", "custom-value")
            .stream()
            .unwrap();
        assert_eq!(response.status_code(), 200);
        let content = response.read().unwrap();
        assert_eq!(&content[..], b"ok");

        let requests = crate::test_helpers::received(&runtime, &server);
        assert_eq!(requests[0].url.query(), Some("key=value"));
        assert_eq!(
            requests[0].headers.get("x-custom-header").unwrap(),
            "custom-value"
        );
    }

    #[test]
    fn test_stream_invalid_method_rejected() {
        let client = Client::new().unwrap();
        let err = client
            .request("INVALID", "http://example.com/")
            .stream()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidMethod(_)));
    }
}
