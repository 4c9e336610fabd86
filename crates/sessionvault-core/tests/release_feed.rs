//! Integration tests for the release feed and update gate.

use std::time::Duration;

use sessionvault_core::{check_for_update, ReleaseFeed};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

fn feed(server: &MockServer) -> ReleaseFeed {
    ReleaseFeed::new(
        format!("{}/repos/acme/app/releases/latest", server.uri()),
        Duration::from_secs(5),
    )
    .expect("build release feed")
}

#[tokio::test]
async fn test_newer_release_prompts() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/app/releases/latest"))
        .and(header("accept", "application/vnd.github+json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"tag_name":"v1.10.0","html_url":"https://example.org/r/1.10.0","body":"notes"}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let feed = feed(&server);
    let decision = check_for_update("1.9.0", || feed.fetch_latest()).await;

    assert!(decision.should_prompt);
    assert_eq!(decision.latest_version.as_deref(), Some("1.10.0"));
    assert_eq!(decision.url.as_deref(), Some("https://example.org/r/1.10.0"));
}

#[tokio::test]
async fn test_not_found_does_not_prompt() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let feed = feed(&server);
    assert!(feed.fetch_latest().await.is_err());

    let decision = check_for_update("1.0.0", || feed.fetch_latest()).await;
    assert!(!decision.should_prompt);
    assert_eq!(decision.latest_version, None);
}

#[tokio::test]
async fn test_malformed_descriptor_does_not_prompt() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"name":"no tag"}"#))
        .mount(&server)
        .await;

    let feed = feed(&server);
    let decision = check_for_update("1.0.0", || feed.fetch_latest()).await;
    assert!(!decision.should_prompt);
    assert_eq!(decision.url, None);
}
