/// Integration tests for redirect policy

#[cfg(test)]
mod redirect_integration {
    use crate::test_helpers::{received, test_runtime};
    use httpr::{Client, Error};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn redirect_chain(
        runtime: &tokio::runtime::Runtime,
        hops: u32,
        status: u16,
    ) -> MockServer {
        runtime.block_on(async {
            let server = MockServer::start().await;
            for hop in 1..=hops {
                let target = if hop == hops {
                    "/landing".to_string()
                } else {
                    format!("/hop/{}", hop + 1)
                };
                Mock::given(method("GET"))
                    .and(path(format!("/hop/{}", hop)))
                    .respond_with(
                        ResponseTemplate::new(status).insert_header("location", target.as_str()),
                    )
                    .mount(&server)
                    .await;
            }
            Mock::given(method("GET"))
                .and(path("/landing"))
                .respond_with(ResponseTemplate::new(200).set_body_string("landed"))
                .mount(&server)
                .await;
            server
        })
    }

    #[test]
    fn test_follow_redirects_to_landing() {
        let runtime = test_runtime();
        let server = redirect_chain(&runtime, 3, 302);
        let client = Client::new().unwrap();

        let response = client
            .get(format!("{}/hop/1", server.uri()))
            .send()
            .unwrap();

        assert_eq!(response.status_code(), 200);
        assert!(response.url().path().ends_with("/landing"));
        assert_eq!(response.history().len(), 3);
        assert_eq!(response.text(), "landed");
    }

    #[test]
    fn test_redirect_budget_enforced() {
        // Scenario 2: five hops with a budget of two
        let runtime = test_runtime();
        let server = redirect_chain(&runtime, 5, 302);
        let client = Client::builder().max_redirects(2).build().unwrap();

        let err = client
            .get(format!("{}/hop/1", server.uri()))
            .send()
            .unwrap_err();
        assert!(matches!(err, Error::TooManyRedirects(2)));
    }

    #[test]
    fn test_disabled_redirects_return_response_as_is() {
        let runtime = test_runtime();
        let server = redirect_chain(&runtime, 1, 302);
        let client = Client::builder().follow_redirects(false).build().unwrap();

        let response = client
            .get(format!("{}/hop/1", server.uri()))
            .send()
            .unwrap();
        assert_eq!(response.status_code(), 302);
        assert!(response.headers().get("location").is_some());
    }

    #[test]
    fn test_post_301_becomes_get_without_body() {
        let runtime = test_runtime();
        let server = runtime.block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/submit"))
                .respond_with(ResponseTemplate::new(301).insert_header("location", "/landing"))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/landing"))
                .respond_with(ResponseTemplate::new(200))
                .mount(&server)
                .await;
            server
        });

        let client = Client::new().unwrap();
        let response = client
            .post(format!("{}/submit", server.uri()))
            .content(&b"payload"[..])
            .send()
            .unwrap();
        assert_eq!(response.status_code(), 200);

        let requests = received(&runtime, &server);
        let landing = requests.iter().find(|r| r.url.path() == "/landing").unwrap();
        assert_eq!(landing.method.as_str(), "GET");
        assert!(landing.body.is_empty());
    }

    #[test]
    fn test_307_preserves_method_and_body() {
        let runtime = test_runtime();
        let server = runtime.block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/submit"))
                .respond_with(ResponseTemplate::new(307).insert_header("location", "/landing"))
                .mount(&server)
                .await;
            Mock::given(method("POST"))
                .and(path("/landing"))
                .respond_with(ResponseTemplate::new(200))
                .mount(&server)
                .await;
            server
        });

        let client = Client::new().unwrap();
        let response = client
            .post(format!("{}/submit", server.uri()))
            .content(&b"payload"[..])
            .send()
            .unwrap();
        assert_eq!(response.status_code(), 200);

        let requests = received(&runtime, &server);
        let landing = requests.iter().find(|r| r.url.path() == "/landing").unwrap();
        assert_eq!(landing.method.as_str(), "POST");
        assert_eq!(landing.body, b"payload");
    }

    #[test]
    fn test_referer_added_on_hops() {
        let runtime = test_runtime();
        let server = redirect_chain(&runtime, 1, 302);
        let client = Client::new().unwrap();

        client.get(format!("{}/hop/1", server.uri())).send().unwrap();

        let requests = received(&runtime, &server);
        let landing = requests.iter().find(|r| r.url.path() == "/landing").unwrap();
        let referer = landing.headers.get("referer").unwrap();
        assert!(referer.to_str().unwrap().ends_with("/hop/1"));
    }

    #[test]
    fn test_referer_suppressed_when_disabled() {
        let runtime = test_runtime();
        let server = redirect_chain(&runtime, 1, 302);
        let client = Client::builder().referer(false).build().unwrap();

        client.get(format!("{}/hop/1", server.uri())).send().unwrap();

        let requests = received(&runtime, &server);
        let landing = requests.iter().find(|r| r.url.path() == "/landing").unwrap();
        assert!(landing.headers.get("referer").is_none());
    }
}
