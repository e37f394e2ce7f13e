//! REST transport integration tests
//!
//! Exercises the transport against a local mock server:
//! - deadline handling (in-flight requests aborted, timeout surfaced
//!   distinctly from other I/O failure)
//! - caller-initiated cancellation
//! - non-2xx responses returned as data, not raised
//! - header assembly (authorization, source IP, cookies)
//! - redirect chasing for the headless flow variant

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mobile_connect::transport::{
    RequestOptions, RestAuthentication, RestClient, RestClientConfig, TransportError,
};

fn client_with_timeout(timeout: Duration) -> RestClient {
    RestClient::with_config(RestClientConfig {
        request_timeout: timeout,
        ..RestClientConfig::default()
    })
    .expect("client should build")
}

fn endpoint(server: &MockServer, path: &str) -> Url {
    Url::parse(&format!("{}{path}", server.uri())).expect("valid test URL")
}

#[tokio::test]
async fn test_slow_server_yields_timeout_not_io_error() {
    // GIVEN: a server that responds slower than the configured deadline
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let client = client_with_timeout(Duration::from_millis(200));

    // WHEN: the request runs past the deadline
    let result = client
        .get(endpoint(&server, "/slow"), RequestOptions::default())
        .await;

    // THEN: the failure is a timeout, distinguishable from other I/O faults
    match result {
        Err(TransportError::Timeout { timeout, .. }) => {
            assert_eq!(timeout, Duration::from_millis(200));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cancellation_aborts_in_flight_request() {
    // GIVEN: a slow server and a cancellation token
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let client = client_with_timeout(Duration::from_secs(30));
    let cancel = CancellationToken::new();

    // WHEN: the caller cancels while the request is in flight
    let request = client.get(
        endpoint(&server, "/slow"),
        RequestOptions {
            cancel: Some(&cancel),
            ..RequestOptions::default()
        },
    );
    tokio::pin!(request);

    let result = tokio::select! {
        result = &mut request => result,
        () = tokio::time::sleep(Duration::from_millis(100)) => {
            cancel.cancel();
            request.await
        }
    };

    // THEN: the failure is reported as cancellation
    assert!(matches!(result, Err(TransportError::Cancelled { .. })));
}

#[tokio::test]
async fn test_non_2xx_response_is_returned_not_raised() {
    // GIVEN: an endpoint answering 401
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/protected"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    let client = client_with_timeout(Duration::from_secs(5));

    // WHEN: the request completes
    let response = client
        .get(endpoint(&server, "/protected"), RequestOptions::default())
        .await
        .expect("a received response is never an error");

    // THEN: status code and body are observable on the response
    assert_eq!(response.status_code().as_u16(), 401);
    assert_eq!(response.content(), "unauthorized");
}

#[tokio::test]
async fn test_basic_auth_source_ip_and_cookies_are_attached() {
    // GIVEN: an endpoint that requires the assembled headers
    let server = MockServer::start().await;
    let credentials = STANDARD.encode("client-1:secret-1");

    Mock::given(method("GET"))
        .and(path("/discovery"))
        .and(header("authorization", format!("Basic {credentials}")))
        .and(header("x-source-ip", "192.0.2.1"))
        .and(header("cookie", "a=1; b=2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;

    let client = client_with_timeout(Duration::from_secs(5));
    let auth = RestAuthentication::basic("client-1", "secret-1");
    let cookies = vec![
        ("a".to_string(), "1".to_string()),
        ("b".to_string(), "2".to_string()),
    ];

    // WHEN: the request carries auth, source IP, and cookies
    let response = client
        .get(
            endpoint(&server, "/discovery"),
            RequestOptions {
                auth: Some(&auth),
                source_ip: Some("192.0.2.1"),
                cookies: &cookies,
                cancel: None,
            },
        )
        .await
        .expect("request should succeed");

    // THEN: the mock only matches when every header was present
    assert_eq!(response.status_code().as_u16(), 200);
}

#[tokio::test]
async fn test_form_post_encodes_body() {
    // GIVEN: a token endpoint expecting URL-encoded form fields
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=abc-123"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"access_token":"t"}"#))
        .mount(&server)
        .await;

    let client = client_with_timeout(Duration::from_secs(5));
    let form = vec![
        ("grant_type".to_string(), "authorization_code".to_string()),
        ("code".to_string(), "abc-123".to_string()),
    ];

    // WHEN / THEN: the form body matches the mock's expectations
    let response = client
        .post_form_data(endpoint(&server, "/token"), &form, RequestOptions::default())
        .await
        .expect("request should succeed");
    assert_eq!(response.status_code().as_u16(), 200);
}

#[tokio::test]
async fn test_redirect_chain_returns_target_with_query_intact() {
    // GIVEN: a 3-hop redirect chain ending at the registered callback
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/start"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/hop1"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hop1"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/hop2"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hop2"))
        .respond_with(ResponseTemplate::new(302).insert_header(
            "location",
            "https://app.example/callback?code=abc&state=s1",
        ))
        .mount(&server)
        .await;

    let client = client_with_timeout(Duration::from_secs(5));
    let expected = Url::parse("https://app.example/callback").unwrap();

    // WHEN: the chain is chased
    let resolved = client
        .get_final_redirect(endpoint(&server, "/start"), &expected, None)
        .await
        .expect("chain should resolve");

    // THEN: the matching location is returned verbatim, query string intact,
    // without being dereferenced (the callback host does not exist here)
    assert_eq!(
        resolved.as_str(),
        "https://app.example/callback?code=abc&state=s1"
    );
}

#[tokio::test]
async fn test_redirect_loop_fails_after_hop_bound() {
    // GIVEN: two endpoints redirecting to each other forever
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/loop-a"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop-b"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/loop-b"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop-a"))
        .mount(&server)
        .await;

    let client = RestClient::with_config(RestClientConfig {
        request_timeout: Duration::from_secs(5),
        max_redirects: 4,
        ..RestClientConfig::default()
    })
    .expect("client should build");
    let expected = Url::parse("https://app.example/callback").unwrap();

    // WHEN / THEN: the chase gives up at the configured hop bound
    let result = client
        .get_final_redirect(endpoint(&server, "/loop-a"), &expected, None)
        .await;
    assert!(matches!(
        result,
        Err(TransportError::TooManyRedirects { max: 4, .. })
    ));
}

#[tokio::test]
async fn test_non_redirect_response_fails_target_not_reached() {
    // GIVEN: a chain terminating in a plain 200 before the callback host
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/start"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/dead-end"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dead-end"))
        .respond_with(ResponseTemplate::new(200).set_body_string("login page"))
        .mount(&server)
        .await;

    let client = client_with_timeout(Duration::from_secs(5));
    let expected = Url::parse("https://app.example/callback").unwrap();

    // WHEN / THEN: the chase reports the target as unreachable
    let result = client
        .get_final_redirect(endpoint(&server, "/start"), &expected, None)
        .await;
    assert!(matches!(
        result,
        Err(TransportError::TargetNotReached { .. })
    ));
}
