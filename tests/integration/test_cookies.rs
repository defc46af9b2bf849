/// Integration tests for cookie jar behaviour across requests

#[cfg(test)]
mod cookie_integration {
    use crate::test_helpers::{received, test_runtime};
    use httpr::Client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cookie_server(runtime: &tokio::runtime::Runtime) -> MockServer {
        runtime.block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/set"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header("set-cookie", "session=abc123; Path=/"),
                )
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/read"))
                .respond_with(ResponseTemplate::new(200))
                .mount(&server)
                .await;
            server
        })
    }

    #[test]
    fn test_received_cookies_sent_on_next_request() {
        let runtime = test_runtime();
        let server = cookie_server(&runtime);
        let client = Client::new().unwrap();

        client.get(format!("{}/set", server.uri())).send().unwrap();
        client.get(format!("{}/read", server.uri())).send().unwrap();

        let requests = received(&runtime, &server);
        let read = requests.iter().find(|r| r.url.path() == "/read").unwrap();
        assert_eq!(read.headers.get("cookie").unwrap(), "session=abc123");
    }

    #[test]
    fn test_jar_disabled_drops_received_cookies() {
        let runtime = test_runtime();
        let server = cookie_server(&runtime);
        let client = Client::builder().cookie_store(false).build().unwrap();

        client.get(format!("{}/set", server.uri())).send().unwrap();
        client.get(format!("{}/read", server.uri())).send().unwrap();

        let requests = received(&runtime, &server);
        let read = requests.iter().find(|r| r.url.path() == "/read").unwrap();
        assert!(read.headers.get("cookie").is_none());
    }

    #[test]
    fn test_request_cookie_overrides_jar_value() {
        let runtime = test_runtime();
        let server = cookie_server(&runtime);
        let client = Client::new().unwrap();

        client.get(format!("{}/set", server.uri())).send().unwrap();
        client
            .get(format!("{}/read", server.uri()))
            .cookie("session", "override")
            .send()
            .unwrap();

        let requests = received(&runtime, &server);
        let read = requests.iter().find(|r| r.url.path() == "/read").unwrap();
        assert_eq!(read.headers.get("cookie").unwrap(), "session=override");
    }

    #[test]
    fn test_get_cookie_lookup() {
        let runtime = test_runtime();
        let server = cookie_server(&runtime);
        let client = Client::new().unwrap();

        client.get(format!("{}/set", server.uri())).send().unwrap();
        assert_eq!(
            client.get_cookie("session").unwrap(),
            Some("abc123".to_string())
        );
        assert_eq!(client.get_cookie("missing").unwrap(), None);
    }

    #[test]
    fn test_default_cookies_sent_without_jar_entry() {
        let runtime = test_runtime();
        let server = cookie_server(&runtime);
        let client = Client::builder()
            .cookies([("preset", "1")])
            .build()
            .unwrap();

        client.get(format!("{}/read", server.uri())).send().unwrap();

        let requests = received(&runtime, &server);
        assert_eq!(requests[0].headers.get("cookie").unwrap(), "preset=1");
    }
}
